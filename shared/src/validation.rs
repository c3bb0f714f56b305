//! Validation utilities for the School Food Supply platform

use chrono::Weekday;
use rust_decimal::Decimal;

use crate::models::WeekdayConfig;
use crate::types::SupplyWeek;

// ============================================================================
// Calendar Validations
// ============================================================================

/// Validate that all flagged weekdays fall on Monday through Friday
pub fn validate_weekday_config(config: &WeekdayConfig) -> Result<(), &'static str> {
    for weekday in [Weekday::Sat, Weekday::Sun] {
        if config.is_util(weekday) || config.is_supply(weekday) || config.is_consumption(weekday) {
            return Err("Weekday configuration must only flag Monday through Friday");
        }
    }
    Ok(())
}

/// Validate a calendar year against the acceptable bounds
pub fn validate_year(year: i32, min_year: i32, max_year: i32) -> Result<(), &'static str> {
    if year < min_year || year > max_year {
        return Err("Year out of acceptable bounds");
    }
    Ok(())
}

/// Validate a month index (1-12)
pub fn validate_month(month: u32) -> Result<(), &'static str> {
    if !(1..=12).contains(&month) {
        return Err("Month must be between 1 and 12");
    }
    Ok(())
}

// ============================================================================
// Requirement Workflow Validations
// ============================================================================

/// Validate a product group identifier
pub fn validate_product_group(group: &str) -> Result<(), &'static str> {
    if group.trim().is_empty() {
        return Err("Product group is required");
    }
    Ok(())
}

/// Validate a supply week key in "NN/YYYY" form
pub fn validate_supply_week(week: &str) -> Result<(), &'static str> {
    week.parse::<SupplyWeek>()
        .map(|_| ())
        .map_err(|_| "Supply week must use the NN/YYYY format")
}

// ============================================================================
// Consolidation Validations
// ============================================================================

/// Validate a generic product conversion factor
pub fn validate_conversion_factor(factor: Decimal) -> Result<(), &'static str> {
    if factor <= Decimal::ZERO {
        return Err("Conversion factor must be positive");
    }
    Ok(())
}

/// Validate an operator-entered override quantity
pub fn validate_override_quantity(quantity: Decimal) -> Result<(), &'static str> {
    if quantity < Decimal::ZERO {
        return Err("Override quantity cannot be negative");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_weekday_config_rejects_weekends() {
        let mut config = WeekdayConfig::default();
        assert!(validate_weekday_config(&config).is_ok());

        config.consumption_days[5] = true; // Saturday
        assert!(validate_weekday_config(&config).is_err());
    }

    #[test]
    fn test_supply_week_format() {
        assert!(validate_supply_week("03/2025").is_ok());
        assert!(validate_supply_week("3-2025").is_err());
        assert!(validate_supply_week("54/2025").is_err());
        assert!(validate_supply_week("").is_err());
    }

    #[test]
    fn test_conversion_factor_must_be_positive() {
        assert!(validate_conversion_factor(Decimal::from(6)).is_ok());
        assert!(validate_conversion_factor(Decimal::ZERO).is_err());
        assert!(validate_conversion_factor(Decimal::from(-1)).is_err());
    }
}

//! Calendar tests for the School Food Supply platform
//!
//! Feature: school-food-supply
//! Tests for consumption-week labeling including Property 1: Week Label
//! Consistency and Property 2: Idempotent Clearing

use std::collections::BTreeMap;

use chrono::{Datelike, NaiveDate};
use proptest::prelude::*;

use shared::{consumption_week_label, week_outcomes, CalendarDay, WeekOutcome, WeekdayConfig};

/// Build every day of a year from a weekday configuration
fn build_year_days(year: i32, config: &WeekdayConfig) -> Vec<CalendarDay> {
    let mut days = Vec::new();
    let mut date = NaiveDate::from_ymd_opt(year, 1, 1).unwrap();
    while date.year() == year {
        days.push(CalendarDay::new(date, config));
        date = date.succ_opt().unwrap();
    }
    days
}

/// Apply recalculation outcomes to the days, as the service's per-group
/// update does
fn apply_outcomes(days: &mut [CalendarDay], outcomes: &[WeekOutcome]) {
    let by_week: BTreeMap<(i32, u32), &WeekOutcome> = outcomes
        .iter()
        .map(|o| ((o.week_year, o.week_number), o))
        .collect();

    for day in days {
        let outcome = by_week[&(day.week_year, day.week_number)];
        day.consumption_week_label = outcome.label.clone();
        day.consumption_week_start = outcome.start;
        day.consumption_week_end = outcome.end;
    }
}

fn weekday_config(util: [bool; 5], supply: [bool; 5], consumption: [bool; 5]) -> WeekdayConfig {
    let extend = |m: [bool; 5]| [m[0], m[1], m[2], m[3], m[4], false, false];
    WeekdayConfig {
        util_days: extend(util),
        supply_days: extend(supply),
        consumption_days: extend(consumption),
    }
}

// ============================================================================
// Property 1: Week Label Consistency
// ============================================================================
// For any year and weekday configuration, every ISO week containing at least
// one consumption-flagged day carries an identical label on all its days,
// built from the earliest and latest flagged dates in the group.

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// Property 1: Week Label Consistency
    #[test]
    fn property_1_week_label_consistency(
        year in 2001i32..2099,
        util in any::<[bool; 5]>(),
        supply in any::<[bool; 5]>(),
        consumption in any::<[bool; 5]>(),
    ) {
        let config = weekday_config(util, supply, consumption);
        let mut days = build_year_days(year, &config);
        let outcomes = week_outcomes(&days);
        apply_outcomes(&mut days, &outcomes);

        let mut groups: BTreeMap<(i32, u32), Vec<&CalendarDay>> = BTreeMap::new();
        for day in &days {
            groups.entry((day.week_year, day.week_number)).or_default().push(day);
        }

        for group in groups.values() {
            let consumption_dates: Vec<NaiveDate> = group
                .iter()
                .filter(|d| d.is_consumption_day)
                .map(|d| d.date)
                .collect();

            if consumption_dates.is_empty() {
                for day in group {
                    prop_assert_eq!(day.consumption_week_label.as_deref(), None);
                    prop_assert_eq!(day.consumption_week_start, None);
                    prop_assert_eq!(day.consumption_week_end, None);
                }
            } else {
                let start = *consumption_dates.iter().min().unwrap();
                let end = *consumption_dates.iter().max().unwrap();
                let expected = consumption_week_label(start, end);
                for day in group {
                    prop_assert_eq!(day.consumption_week_label.as_deref(), Some(expected.as_str()));
                    prop_assert_eq!(day.consumption_week_start, Some(start));
                    prop_assert_eq!(day.consumption_week_end, Some(end));
                }
            }
        }
    }

    /// Property 2: Idempotent Clearing
    /// A week without consumption days is cleared even if previously labeled
    #[test]
    fn property_2_idempotent_clearing(
        year in 2001i32..2099,
        util in any::<[bool; 5]>(),
        supply in any::<[bool; 5]>(),
    ) {
        // No consumption weekday flagged at all
        let config = weekday_config(util, supply, [false; 5]);
        let mut days = build_year_days(year, &config);

        // Simulate stale labels from an earlier configuration
        for day in &mut days {
            day.consumption_week_label = Some("(01/01 a 05/01/25)".to_string());
            day.consumption_week_start = NaiveDate::from_ymd_opt(2025, 1, 1);
            day.consumption_week_end = NaiveDate::from_ymd_opt(2025, 1, 5);
        }

        let outcomes = week_outcomes(&days);
        prop_assert!(outcomes.iter().all(|o| o.clears()));

        apply_outcomes(&mut days, &outcomes);
        for day in &days {
            prop_assert_eq!(day.consumption_week_label.as_deref(), None);
            prop_assert_eq!(day.consumption_week_start, None);
            prop_assert_eq!(day.consumption_week_end, None);
        }
    }

    /// Recalculation is stable: applying the outcomes twice changes nothing
    #[test]
    fn property_recalculation_is_idempotent(
        year in 2001i32..2099,
        consumption in any::<[bool; 5]>(),
    ) {
        let config = weekday_config([true; 5], [true; 5], consumption);
        let mut days = build_year_days(year, &config);

        let first = week_outcomes(&days);
        apply_outcomes(&mut days, &first);
        let labeled_once: Vec<Option<String>> =
            days.iter().map(|d| d.consumption_week_label.clone()).collect();

        let second = week_outcomes(&days);
        apply_outcomes(&mut days, &second);
        let labeled_twice: Vec<Option<String>> =
            days.iter().map(|d| d.consumption_week_label.clone()).collect();

        prop_assert_eq!(labeled_once, labeled_twice);
    }
}

// ============================================================================
// Unit Tests for Week Labeling
// ============================================================================

#[test]
fn test_label_format_day_month_to_day_month_year() {
    let start = NaiveDate::from_ymd_opt(2025, 2, 10).unwrap();
    let end = NaiveDate::from_ymd_opt(2025, 2, 14).unwrap();

    assert_eq!(consumption_week_label(start, end), "(10/02 a 14/02/25)");
}

#[test]
fn test_label_single_consumption_day() {
    // One flagged day: the label collapses to that day on both ends
    let start = NaiveDate::from_ymd_opt(2025, 3, 5).unwrap();

    assert_eq!(consumption_week_label(start, start), "(05/03 a 05/03/25)");
}

#[test]
fn test_label_ignores_unflagged_week_boundaries() {
    let config = weekday_config(
        [true; 5],
        [true; 5],
        [false, true, true, true, false], // Tue-Thu only
    );
    // Week of 2025-02-10 (Monday)
    let days: Vec<CalendarDay> = (10..=14)
        .map(|d| CalendarDay::new(NaiveDate::from_ymd_opt(2025, 2, d).unwrap(), &config))
        .collect();

    let outcomes = week_outcomes(&days);
    assert_eq!(outcomes.len(), 1);
    assert_eq!(outcomes[0].label.as_deref(), Some("(11/02 a 13/02/25)"));
    assert_eq!(
        outcomes[0].start,
        NaiveDate::from_ymd_opt(2025, 2, 11)
    );
    assert_eq!(
        outcomes[0].end,
        NaiveDate::from_ymd_opt(2025, 2, 13)
    );
}

#[test]
fn test_weekend_days_never_flagged() {
    let days = build_year_days(2025, &WeekdayConfig::default());

    for day in days {
        if matches!(day.date.weekday(), chrono::Weekday::Sat | chrono::Weekday::Sun) {
            assert!(!day.is_util_day);
            assert!(!day.is_supply_day);
            assert!(!day.is_consumption_day);
        }
    }
}

#[test]
fn test_iso_week_fields_follow_chrono() {
    // 2024-12-30 belongs to ISO week 1 of 2025
    let day = CalendarDay::new(
        NaiveDate::from_ymd_opt(2024, 12, 30).unwrap(),
        &WeekdayConfig::default(),
    );

    assert_eq!(day.year, 2024);
    assert_eq!(day.week_number, 1);
    assert_eq!(day.week_year, 2025);
}

#[test]
fn test_consistency_warning_when_no_util_or_supply() {
    let config = weekday_config([false; 5], [false; 5], [true; 5]);
    let days: Vec<CalendarDay> = (10..=14)
        .map(|d| CalendarDay::new(NaiveDate::from_ymd_opt(2025, 2, d).unwrap(), &config))
        .collect();

    let outcomes = week_outcomes(&days);
    assert!(outcomes[0].consistency_warning);

    // With supply days present the warning goes away
    let config = weekday_config([false; 5], [true; 5], [true; 5]);
    let days: Vec<CalendarDay> = (10..=14)
        .map(|d| CalendarDay::new(NaiveDate::from_ymd_opt(2025, 2, d).unwrap(), &config))
        .collect();

    let outcomes = week_outcomes(&days);
    assert!(!outcomes[0].consistency_warning);
}

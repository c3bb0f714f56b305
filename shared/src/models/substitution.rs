//! Substitution and consolidation models
//!
//! A substitution group maps many origin-product order lines, one per
//! school, onto a single generic commercial product. The group is computed
//! on read and persisted only as denormalized fields on the member lines.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::types::SupplyWeek;

/// Composite key of an origin substitution group
///
/// Spans every requirement line sharing the origin product and week pair
/// across all schools. An explicit key type, not a concatenated string.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OriginGroupKey {
    pub origin_product_code: String,
    pub supply_week: SupplyWeek,
    pub consumption_week: String,
}

impl OriginGroupKey {
    pub fn new(
        origin_product_code: impl Into<String>,
        supply_week: SupplyWeek,
        consumption_week: impl Into<String>,
    ) -> Self {
        Self {
            origin_product_code: origin_product_code.into(),
            supply_week,
            consumption_week: consumption_week.into(),
        }
    }
}

/// One school's member line inside an origin substitution group
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubstitutionMember {
    pub school_id: Uuid,
    /// Originally requested origin quantity
    pub requested_quantity: Decimal,
    /// Quantity persisted when a substitution was last recorded, if that
    /// record still exists
    pub substitution_quantity: Option<Decimal>,
    /// Operator-entered quantity, highest precedence
    pub override_quantity: Option<Decimal>,
}

impl SubstitutionMember {
    /// Effective origin quantity for this school
    ///
    /// Precedence: override > stored substitution > requested, evaluated
    /// independently per school.
    pub fn effective_quantity(&self) -> Decimal {
        self.override_quantity
            .or(self.substitution_quantity)
            .unwrap_or(self.requested_quantity)
    }
}

/// Sum of the per-school effective origin quantities
pub fn consolidated_quantity(members: &[SubstitutionMember]) -> Decimal {
    members.iter().map(|m| m.effective_quantity()).sum()
}

/// Generic purchase quantity for a consolidated origin quantity
///
/// Always ceilings: under-provisioning due to fractional packaging units
/// must never happen. The result is a pure function of the current
/// per-school effective quantities and the conversion factor; it is never
/// edited directly.
pub fn generic_quantity(consolidated: Decimal, conversion_factor: Decimal) -> Decimal {
    (consolidated / conversion_factor).ceil()
}

/// Origin-period line considered for replication across meal periods
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReplicationSource {
    pub line_id: Uuid,
    pub frequency: Option<Decimal>,
}

impl ReplicationSource {
    /// Lines with a zero or empty origin-period frequency are untouched
    pub fn is_replicable(&self) -> bool {
        matches!(self.frequency, Some(f) if f > Decimal::ZERO)
    }
}

/// Filter the sources that replication will actually copy
pub fn replicable_sources(sources: &[ReplicationSource]) -> Vec<&ReplicationSource> {
    sources.iter().filter(|s| s.is_replicable()).collect()
}

/// Derived line quantity from its frequency and per-capita factor
pub fn derived_quantity(frequency: Decimal, per_capita: Decimal) -> Decimal {
    frequency * per_capita
}

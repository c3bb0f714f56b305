//! Product models

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A purchasable commercial product that origin products consolidate into
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenericProduct {
    pub id: Uuid,
    pub code: String,
    pub description: String,
    /// Origin units covered by one generic unit; must be positive
    pub conversion_factor: Decimal,
}

impl GenericProduct {
    pub fn is_valid(&self) -> bool {
        self.conversion_factor > Decimal::ZERO
    }
}

//! School models

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A school participating in the supply network
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct School {
    pub id: Uuid,
    pub code: String,
    pub name: String,
    /// Schools with an active daily record qualify for the average
    /// recalculation batch
    pub has_active_daily_record: bool,
}

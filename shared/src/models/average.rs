//! Average recalculation models

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Month activation entry governing which historical months feed the
/// per-school consumption averages
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AverageConfig {
    pub year: i32,
    pub month: u32,
    pub active: bool,
}

/// One school that failed during a recalculation batch
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchoolFailure {
    pub school_id: Uuid,
    pub error: String,
}

/// Outcome of an average recalculation batch
///
/// Per-school failures are collected, never fatal to the batch; the counts
/// distinguish "nothing to do" (total = 0) from partial failure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RecalculationSummary {
    pub total: usize,
    pub success: usize,
    pub failures: Vec<SchoolFailure>,
}

impl RecalculationSummary {
    pub fn record_success(&mut self) {
        self.total += 1;
        self.success += 1;
    }

    pub fn record_failure(&mut self, school_id: Uuid, error: impl Into<String>) {
        self.total += 1;
        self.failures.push(SchoolFailure {
            school_id,
            error: error.into(),
        });
    }

    /// Collect per-school outcomes into a summary
    pub fn from_outcomes<I>(outcomes: I) -> Self
    where
        I: IntoIterator<Item = (Uuid, Result<(), String>)>,
    {
        let mut summary = Self::default();
        for (school_id, outcome) in outcomes {
            match outcome {
                Ok(()) => summary.record_success(),
                Err(error) => summary.record_failure(school_id, error),
            }
        }
        summary
    }
}

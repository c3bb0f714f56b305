//! Common types used across the platform

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Supported languages
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    #[default]
    Portuguese,
    English,
}

impl Language {
    pub fn code(&self) -> &'static str {
        match self {
            Language::Portuguese => "pt",
            Language::English => "en",
        }
    }
}

/// A week-of-year key in "NN/YYYY" form, e.g. "03/2025"
///
/// Supply weeks are stored and exchanged in this textual form; this type
/// keeps the parsing in one place instead of ad-hoc string splitting.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(try_from = "String", into = "String")]
pub struct SupplyWeek {
    pub week: u32,
    pub year: i32,
}

/// Error parsing a "NN/YYYY" week key
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid week key '{0}', expected NN/YYYY")]
pub struct ParseSupplyWeekError(pub String);

impl SupplyWeek {
    /// Create a week key
    /// Returns None if the week number is outside 1-53
    pub fn new(week: u32, year: i32) -> Option<Self> {
        if (1..=53).contains(&week) {
            Some(Self { week, year })
        } else {
            None
        }
    }
}

impl fmt::Display for SupplyWeek {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}/{}", self.week, self.year)
    }
}

impl FromStr for SupplyWeek {
    type Err = ParseSupplyWeekError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (week, year) = s
            .split_once('/')
            .ok_or_else(|| ParseSupplyWeekError(s.to_string()))?;
        let week: u32 = week
            .parse()
            .map_err(|_| ParseSupplyWeekError(s.to_string()))?;
        let year: i32 = year
            .parse()
            .map_err(|_| ParseSupplyWeekError(s.to_string()))?;
        SupplyWeek::new(week, year).ok_or_else(|| ParseSupplyWeekError(s.to_string()))
    }
}

impl TryFrom<String> for SupplyWeek {
    type Error = ParseSupplyWeekError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<SupplyWeek> for String {
    fn from(week: SupplyWeek) -> Self {
        week.to_string()
    }
}

/// Date range for queries
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DateRange {
    pub start: chrono::NaiveDate,
    pub end: chrono::NaiveDate,
}

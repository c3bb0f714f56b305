//! Calendar models and consumption-week computation

use std::collections::BTreeMap;

use chrono::{Datelike, NaiveDate, Weekday};
use serde::{Deserialize, Serialize};

/// Weekday configuration driving the three calendar flags
///
/// Index 0 = Monday, 1 = Tuesday, ..., 6 = Sunday. Only Monday through
/// Friday may be flagged; the supply flag is intentionally independent of
/// the consumption flag because supply happens the week before consumption.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeekdayConfig {
    pub util_days: [bool; 7],
    pub supply_days: [bool; 7],
    pub consumption_days: [bool; 7],
}

impl WeekdayConfig {
    /// Build a configuration from explicit weekday lists
    pub fn from_weekdays(util: &[Weekday], supply: &[Weekday], consumption: &[Weekday]) -> Self {
        Self {
            util_days: weekday_set(util),
            supply_days: weekday_set(supply),
            consumption_days: weekday_set(consumption),
        }
    }

    pub fn is_util(&self, weekday: Weekday) -> bool {
        self.util_days[weekday.num_days_from_monday() as usize]
    }

    pub fn is_supply(&self, weekday: Weekday) -> bool {
        self.supply_days[weekday.num_days_from_monday() as usize]
    }

    pub fn is_consumption(&self, weekday: Weekday) -> bool {
        self.consumption_days[weekday.num_days_from_monday() as usize]
    }
}

impl Default for WeekdayConfig {
    /// Monday through Friday for all three flags
    fn default() -> Self {
        let weekdays = [true, true, true, true, true, false, false];
        Self {
            util_days: weekdays,
            supply_days: weekdays,
            consumption_days: weekdays,
        }
    }
}

fn weekday_set(weekdays: &[Weekday]) -> [bool; 7] {
    let mut set = [false; 7];
    for weekday in weekdays {
        set[weekday.num_days_from_monday() as usize] = true;
    }
    set
}

/// One calendar day with its flags and derived consumption-week fields
///
/// The label is derived, never authoritative: it is recomputed whenever any
/// day's consumption flag changes within its ISO week. Every day sharing
/// (week_number, week_year) carries an identical label, and a week with no
/// consumption day carries no label at all.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CalendarDay {
    pub date: NaiveDate,
    pub year: i32,
    pub week_number: u32,
    pub week_year: i32,
    pub is_util_day: bool,
    pub is_supply_day: bool,
    pub is_consumption_day: bool,
    pub consumption_week_label: Option<String>,
    pub consumption_week_start: Option<NaiveDate>,
    pub consumption_week_end: Option<NaiveDate>,
}

impl CalendarDay {
    /// Create a day with flags taken from the weekday configuration
    pub fn new(date: NaiveDate, config: &WeekdayConfig) -> Self {
        let iso = date.iso_week();
        let weekday = date.weekday();
        Self {
            date,
            year: date.year(),
            week_number: iso.week(),
            week_year: iso.year(),
            is_util_day: config.is_util(weekday),
            is_supply_day: config.is_supply(weekday),
            is_consumption_day: config.is_consumption(weekday),
            consumption_week_label: None,
            consumption_week_start: None,
            consumption_week_end: None,
        }
    }
}

/// A holiday entry
///
/// A holiday date is neither util nor supply regardless of the weekday
/// configuration. Holidays are first-class rows but are not consulted by
/// consumption-week recalculation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Holiday {
    pub date: NaiveDate,
    pub description: String,
}

/// Recalculation outcome for one (week_number, week_year) group
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WeekOutcome {
    pub week_year: i32,
    pub week_number: u32,
    /// None clears the label on every day of the group
    pub label: Option<String>,
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
    /// The group has consumption days but no util or supply day
    pub consistency_warning: bool,
}

impl WeekOutcome {
    pub fn clears(&self) -> bool {
        self.label.is_none()
    }
}

/// Format the consumption-week label from its first and last consumption day
///
/// Example: 2025-02-10 .. 2025-02-14 becomes "(10/02 a 14/02/25)".
pub fn consumption_week_label(start: NaiveDate, end: NaiveDate) -> String {
    format!("({} a {})", start.format("%d/%m"), end.format("%d/%m/%y"))
}

/// Compute per-week recalculation outcomes for a set of calendar days
///
/// Days are grouped by (week_year, week_number). A group without any
/// consumption-flagged day yields a clearing outcome; otherwise the label is
/// built from the earliest and latest dates flagged consumption in the
/// group, not from the week's calendar boundaries.
pub fn week_outcomes(days: &[CalendarDay]) -> Vec<WeekOutcome> {
    let mut groups: BTreeMap<(i32, u32), Vec<&CalendarDay>> = BTreeMap::new();
    for day in days {
        groups
            .entry((day.week_year, day.week_number))
            .or_default()
            .push(day);
    }

    groups
        .into_iter()
        .map(|((week_year, week_number), group)| {
            let consumption_dates: Vec<NaiveDate> = group
                .iter()
                .filter(|d| d.is_consumption_day)
                .map(|d| d.date)
                .collect();

            match (consumption_dates.iter().min(), consumption_dates.iter().max()) {
                (Some(&start), Some(&end)) => {
                    let has_supply_or_util = group
                        .iter()
                        .any(|d| d.is_util_day || d.is_supply_day);
                    WeekOutcome {
                        week_year,
                        week_number,
                        label: Some(consumption_week_label(start, end)),
                        start: Some(start),
                        end: Some(end),
                        consistency_warning: !has_supply_or_util,
                    }
                }
                _ => WeekOutcome {
                    week_year,
                    week_number,
                    label: None,
                    start: None,
                    end: None,
                    consistency_warning: false,
                },
            }
        })
        .collect()
}

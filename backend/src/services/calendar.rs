//! Calendar service for supply/consumption week management

use chrono::{Datelike, NaiveDate};
use serde::Serialize;
use sqlx::PgPool;

use crate::config::CalendarConfig;
use crate::error::{AppError, AppResult};
use shared::{week_outcomes, CalendarDay, DateRange, Holiday, WeekdayConfig};
use shared::{validate_weekday_config, validate_year};

/// Calendar service managing the per-year day table
#[derive(Clone)]
pub struct CalendarService {
    db: PgPool,
    config: CalendarConfig,
}

/// Database row for a calendar day
#[derive(Debug, sqlx::FromRow)]
struct CalendarDayRow {
    date: NaiveDate,
    year: i32,
    week_number: i32,
    week_year: i32,
    is_util_day: bool,
    is_supply_day: bool,
    is_consumption_day: bool,
    consumption_week_label: Option<String>,
    consumption_week_start: Option<NaiveDate>,
    consumption_week_end: Option<NaiveDate>,
}

impl From<CalendarDayRow> for CalendarDay {
    fn from(row: CalendarDayRow) -> Self {
        CalendarDay {
            date: row.date,
            year: row.year,
            week_number: row.week_number as u32,
            week_year: row.week_year,
            is_util_day: row.is_util_day,
            is_supply_day: row.is_supply_day,
            is_consumption_day: row.is_consumption_day,
            consumption_week_label: row.consumption_week_label,
            consumption_week_start: row.consumption_week_start,
            consumption_week_end: row.consumption_week_end,
        }
    }
}

/// Result of building a year's day table
#[derive(Debug, Serialize)]
pub struct BuildYearOutcome {
    pub days_created: u64,
}

/// Result of a consumption-week recalculation
#[derive(Debug, Serialize)]
pub struct RecalculateWeeksOutcome {
    pub weeks_updated: u64,
    pub weeks_cleared: u64,
}

impl CalendarService {
    /// Create a new CalendarService instance
    pub fn new(db: PgPool, config: CalendarConfig) -> Self {
        Self { db, config }
    }

    /// Populate one calendar day per date of the year
    ///
    /// Flags come from the weekday configuration; derived consumption-week
    /// fields are left for [`recalculate_consumption_weeks`]. Re-running for
    /// an existing year refreshes the flags without duplicating rows.
    ///
    /// [`recalculate_consumption_weeks`]: CalendarService::recalculate_consumption_weeks
    pub async fn build_year(
        &self,
        year: i32,
        weekday_config: &WeekdayConfig,
    ) -> AppResult<BuildYearOutcome> {
        self.validate_year(year)?;
        validate_weekday_config(weekday_config).map_err(|message| AppError::Validation {
            field: "weekday_config".to_string(),
            message: message.to_string(),
            message_pt: "A configuração de dias da semana deve usar apenas segunda a sexta"
                .to_string(),
        })?;

        let first = NaiveDate::from_ymd_opt(year, 1, 1)
            .ok_or_else(|| AppError::ValidationError(format!("Invalid year {}", year)))?;

        let mut tx = self.db.begin().await?;
        let mut days_created = 0u64;

        let mut date = first;
        while date.year() == year {
            let day = CalendarDay::new(date, weekday_config);
            sqlx::query(
                r#"
                INSERT INTO calendar_days (date, year, week_number, week_year, is_util_day, is_supply_day, is_consumption_day)
                VALUES ($1, $2, $3, $4, $5, $6, $7)
                ON CONFLICT (date) DO UPDATE
                SET is_util_day = EXCLUDED.is_util_day,
                    is_supply_day = EXCLUDED.is_supply_day,
                    is_consumption_day = EXCLUDED.is_consumption_day
                "#,
            )
            .bind(day.date)
            .bind(day.year)
            .bind(day.week_number as i32)
            .bind(day.week_year)
            .bind(day.is_util_day)
            .bind(day.is_supply_day)
            .bind(day.is_consumption_day)
            .execute(&mut *tx)
            .await?;

            days_created += 1;
            date = match date.succ_opt() {
                Some(next) => next,
                None => break,
            };
        }

        tx.commit().await?;

        Ok(BuildYearOutcome { days_created })
    }

    /// Recompute the consumption-week label of every week in the year
    ///
    /// Days are grouped by (week_number, week_year); a group without any
    /// consumption day has its label and boundaries cleared, even if
    /// previously set. Each group's write is scoped independently, so a
    /// failure never leaves another group half-labeled.
    pub async fn recalculate_consumption_weeks(
        &self,
        year: i32,
    ) -> AppResult<RecalculateWeeksOutcome> {
        self.validate_year(year)?;

        let rows = sqlx::query_as::<_, CalendarDayRow>(
            r#"
            SELECT date, year, week_number, week_year, is_util_day, is_supply_day,
                   is_consumption_day, consumption_week_label, consumption_week_start,
                   consumption_week_end
            FROM calendar_days
            WHERE year = $1
            "#,
        )
        .bind(year)
        .fetch_all(&self.db)
        .await?;

        let days: Vec<CalendarDay> = rows.into_iter().map(|r| r.into()).collect();

        let mut weeks_updated = 0u64;
        let mut weeks_cleared = 0u64;

        for outcome in week_outcomes(&days) {
            if outcome.consistency_warning {
                tracing::warn!(
                    week_number = outcome.week_number,
                    week_year = outcome.week_year,
                    "Week has consumption days but no util or supply day"
                );
            }

            sqlx::query(
                r#"
                UPDATE calendar_days
                SET consumption_week_label = $1,
                    consumption_week_start = $2,
                    consumption_week_end = $3
                WHERE year = $4 AND week_year = $5 AND week_number = $6
                "#,
            )
            .bind(&outcome.label)
            .bind(outcome.start)
            .bind(outcome.end)
            .bind(year)
            .bind(outcome.week_year)
            .bind(outcome.week_number as i32)
            .execute(&self.db)
            .await?;

            if outcome.clears() {
                weeks_cleared += 1;
            } else {
                weeks_updated += 1;
            }
        }

        Ok(RecalculateWeeksOutcome {
            weeks_updated,
            weeks_cleared,
        })
    }

    /// Flip one day's consumption flag and recompute its week group
    ///
    /// The day's week is the only group touched; the label invariant holds
    /// without a whole-year recalculation.
    pub async fn set_consumption_flag(&self, date: NaiveDate, flag: bool) -> AppResult<()> {
        let mut tx = self.db.begin().await?;

        let week = sqlx::query_as::<_, (i32, i32)>(
            r#"
            UPDATE calendar_days
            SET is_consumption_day = $2
            WHERE date = $1
            RETURNING week_year, week_number
            "#,
        )
        .bind(date)
        .bind(flag)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| AppError::NotFound("Calendar day".to_string()))?;

        let rows = sqlx::query_as::<_, CalendarDayRow>(
            r#"
            SELECT date, year, week_number, week_year, is_util_day, is_supply_day,
                   is_consumption_day, consumption_week_label, consumption_week_start,
                   consumption_week_end
            FROM calendar_days
            WHERE week_year = $1 AND week_number = $2
            "#,
        )
        .bind(week.0)
        .bind(week.1)
        .fetch_all(&mut *tx)
        .await?;

        let days: Vec<CalendarDay> = rows.into_iter().map(|r| r.into()).collect();

        for outcome in week_outcomes(&days) {
            sqlx::query(
                r#"
                UPDATE calendar_days
                SET consumption_week_label = $1,
                    consumption_week_start = $2,
                    consumption_week_end = $3
                WHERE week_year = $4 AND week_number = $5
                "#,
            )
            .bind(&outcome.label)
            .bind(outcome.start)
            .bind(outcome.end)
            .bind(outcome.week_year)
            .bind(outcome.week_number as i32)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        Ok(())
    }

    /// Record a holiday
    ///
    /// The date becomes neither util nor supply regardless of the weekday
    /// configuration. Holidays are first-class rows; consumption-week
    /// recalculation does not consult them.
    pub async fn set_holiday(&self, date: NaiveDate, description: &str) -> AppResult<()> {
        if description.trim().is_empty() {
            return Err(AppError::Validation {
                field: "description".to_string(),
                message: "Holiday description is required".to_string(),
                message_pt: "A descrição do feriado é obrigatória".to_string(),
            });
        }

        let mut tx = self.db.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO holidays (date, description)
            VALUES ($1, $2)
            ON CONFLICT (date) DO UPDATE SET description = EXCLUDED.description
            "#,
        )
        .bind(date)
        .bind(description)
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            "UPDATE calendar_days SET is_util_day = FALSE, is_supply_day = FALSE WHERE date = $1",
        )
        .bind(date)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(())
    }

    /// Remove a holiday, restoring util/supply flags from the weekday
    /// configuration
    pub async fn remove_holiday(
        &self,
        date: NaiveDate,
        weekday_config: &WeekdayConfig,
    ) -> AppResult<()> {
        let mut tx = self.db.begin().await?;

        let deleted = sqlx::query("DELETE FROM holidays WHERE date = $1")
            .bind(date)
            .execute(&mut *tx)
            .await?;

        if deleted.rows_affected() == 0 {
            return Err(AppError::NotFound("Holiday".to_string()));
        }

        let weekday = date.weekday();
        sqlx::query("UPDATE calendar_days SET is_util_day = $2, is_supply_day = $3 WHERE date = $1")
            .bind(date)
            .bind(weekday_config.is_util(weekday))
            .bind(weekday_config.is_supply(weekday))
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        Ok(())
    }

    /// Holidays recorded inside a date range
    pub async fn holidays(&self, range: &DateRange) -> AppResult<Vec<Holiday>> {
        let rows = sqlx::query_as::<_, (NaiveDate, String)>(
            "SELECT date, description FROM holidays WHERE date BETWEEN $1 AND $2 ORDER BY date",
        )
        .bind(range.start)
        .bind(range.end)
        .fetch_all(&self.db)
        .await?;

        Ok(rows
            .into_iter()
            .map(|(date, description)| Holiday { date, description })
            .collect())
    }

    fn validate_year(&self, year: i32) -> AppResult<()> {
        validate_year(year, self.config.min_year, self.config.max_year).map_err(|message| {
            AppError::Validation {
                field: "year".to_string(),
                message: message.to_string(),
                message_pt: format!(
                    "O ano deve estar entre {} e {}",
                    self.config.min_year, self.config.max_year
                ),
            }
        })
    }
}

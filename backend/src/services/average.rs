//! Average recalculation service
//!
//! Orchestrates the external stored procedure that recomputes historical
//! per-school consumption averages. The service only drives invocation and
//! failure aggregation; the statistics live in the database.

use chrono::{Datelike, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use shared::{validate_month, AverageConfig, RecalculationSummary, School};

/// Average recalculation service
#[derive(Clone)]
pub struct AverageService {
    db: PgPool,
}

impl AverageService {
    /// Create a new AverageService instance
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Recompute per-school averages
    ///
    /// Scope is one school or, when omitted, every school with an active
    /// daily record. Month activation is a prerequisite lookup passed to the
    /// stored procedure, not a gate enforced here. A failing school is
    /// recorded and the batch continues; the summary reports successes and
    /// failures side by side.
    pub async fn recalculate(&self, scope: Option<Uuid>) -> AppResult<RecalculationSummary> {
        let schools: Vec<School> = match scope {
            Some(school_id) => {
                let school = self
                    .school(school_id)
                    .await?
                    .ok_or_else(|| AppError::NotFound("School".to_string()))?;
                vec![school]
            }
            None => self.schools_with_active_daily_record().await?,
        };

        let year = Utc::now().year();
        let months = self.active_months(year).await?;
        let month_params: Vec<i32> = months.iter().map(|m| *m as i32).collect();

        let mut summary = RecalculationSummary::default();

        for school in &schools {
            let result = sqlx::query("SELECT recalcular_media_escola($1, $2)")
                .bind(school.id)
                .bind(&month_params)
                .execute(&self.db)
                .await;

            match result {
                Ok(_) => summary.record_success(),
                Err(e) => {
                    tracing::error!(
                        school = %school.code,
                        error = %e,
                        "Average recalculation failed"
                    );
                    summary.record_failure(school.id, e.to_string());
                }
            }
        }

        tracing::info!(
            total = summary.total,
            success = summary.success,
            failures = summary.failures.len(),
            "Average recalculation batch finished"
        );

        Ok(summary)
    }

    /// Activate or deactivate a month for average computation
    pub async fn set_month_active(&self, year: i32, month: u32, active: bool) -> AppResult<()> {
        validate_month(month).map_err(|message| AppError::Validation {
            field: "month".to_string(),
            message: message.to_string(),
            message_pt: "O mês deve estar entre 1 e 12".to_string(),
        })?;

        sqlx::query(
            r#"
            INSERT INTO average_config (year, month, active)
            VALUES ($1, $2, $3)
            ON CONFLICT (year, month) DO UPDATE SET active = EXCLUDED.active
            "#,
        )
        .bind(year)
        .bind(month as i32)
        .bind(active)
        .execute(&self.db)
        .await?;

        Ok(())
    }

    /// Months active for average computation in a year
    pub async fn active_months(&self, year: i32) -> AppResult<Vec<u32>> {
        let months = sqlx::query_scalar::<_, i32>(
            "SELECT month FROM average_config WHERE year = $1 AND active = TRUE ORDER BY month",
        )
        .bind(year)
        .fetch_all(&self.db)
        .await?;

        Ok(months.into_iter().map(|m| m as u32).collect())
    }

    async fn school(&self, school_id: Uuid) -> AppResult<Option<School>> {
        let row = sqlx::query_as::<_, (Uuid, String, String, bool)>(
            "SELECT id, code, name, has_active_daily_record FROM schools WHERE id = $1",
        )
        .bind(school_id)
        .fetch_optional(&self.db)
        .await?;

        Ok(row.map(|(id, code, name, has_active_daily_record)| School {
            id,
            code,
            name,
            has_active_daily_record,
        }))
    }

    async fn schools_with_active_daily_record(&self) -> AppResult<Vec<School>> {
        let rows = sqlx::query_as::<_, (Uuid, String, String, bool)>(
            r#"
            SELECT id, code, name, has_active_daily_record
            FROM schools
            WHERE has_active_daily_record = TRUE
            ORDER BY code
            "#,
        )
        .fetch_all(&self.db)
        .await?;

        Ok(rows
            .into_iter()
            .map(|(id, code, name, has_active_daily_record)| School {
                id,
                code,
                name,
                has_active_daily_record,
            })
            .collect())
    }

    /// Month activation entries for a year
    pub async fn month_config(&self, year: i32) -> AppResult<Vec<AverageConfig>> {
        let rows = sqlx::query_as::<_, (i32, i32, bool)>(
            "SELECT year, month, active FROM average_config WHERE year = $1 ORDER BY month",
        )
        .bind(year)
        .fetch_all(&self.db)
        .await?;

        Ok(rows
            .into_iter()
            .map(|(year, month, active)| AverageConfig {
                year,
                month: month as u32,
                active,
            })
            .collect())
    }
}

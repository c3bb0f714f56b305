//! Requirement workflow service
//!
//! Routes requirement lines through the approval workflow. The transition
//! tables and carry-forward steps live in the shared crate; this service
//! applies them to the row store, one transaction per logical scope.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use shared::{
    validate_product_group, AdjustmentSlots, MealPeriod, ReleaseAction, RequirementLine,
    RequirementStatus, ReturnAction, SupplyWeek,
};

/// Requirement workflow service
#[derive(Clone)]
pub struct RequirementService {
    db: PgPool,
}

/// Scope of a workflow operation: one school's product group and period,
/// optionally narrowed to a single supply week
#[derive(Debug, Clone, Deserialize)]
pub struct RequirementScope {
    pub school_id: Uuid,
    pub product_group: String,
    pub period: MealPeriod,
    pub week_filter: Option<SupplyWeek>,
}

/// Result of a workflow transition over a scope
///
/// A scope matching zero rows is not an error; it reports zero affected
/// rows and no status.
#[derive(Debug, Serialize)]
pub struct AdvanceOutcome {
    pub rows_affected: u64,
    pub new_status: Option<RequirementStatus>,
}

/// Database row for a requirement line
#[derive(Debug, sqlx::FromRow)]
struct RequirementLineRow {
    id: Uuid,
    school_id: Uuid,
    product_id: Uuid,
    origin_product_code: String,
    product_group: String,
    period: String,
    status: String,
    frequency: Option<Decimal>,
    per_capita: Option<Decimal>,
    quantity: Decimal,
    supply_week: String,
    consumption_week: String,
    base_quantity: Option<Decimal>,
    nutrition_quantity: Option<Decimal>,
    coordination_quantity: Option<Decimal>,
    logistics_quantity: Option<Decimal>,
    confirmation_quantity: Option<Decimal>,
    generic_product_id: Option<Uuid>,
    substitution_quantity: Option<Decimal>,
    override_quantity: Option<Decimal>,
    generic_quantity: Option<Decimal>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<RequirementLineRow> for RequirementLine {
    type Error = AppError;

    fn try_from(row: RequirementLineRow) -> Result<Self, Self::Error> {
        let status = RequirementStatus::from_str(&row.status)
            .ok_or_else(|| AppError::Internal(format!("Unknown status '{}'", row.status)))?;
        let period = MealPeriod::from_str(&row.period)
            .ok_or_else(|| AppError::Internal(format!("Unknown period '{}'", row.period)))?;

        Ok(RequirementLine {
            id: row.id,
            school_id: row.school_id,
            product_id: row.product_id,
            origin_product_code: row.origin_product_code,
            product_group: row.product_group,
            period,
            status,
            frequency: row.frequency,
            per_capita: row.per_capita,
            quantity: row.quantity,
            supply_week: row.supply_week,
            consumption_week: row.consumption_week,
            adjustments: AdjustmentSlots {
                base: row.base_quantity,
                nutrition: row.nutrition_quantity,
                coordination: row.coordination_quantity,
                logistics: row.logistics_quantity,
                conf_nutrition: row.confirmation_quantity,
            },
            generic_product_id: row.generic_product_id,
            substitution_quantity: row.substitution_quantity,
            override_quantity: row.override_quantity,
            generic_quantity: row.generic_quantity,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

impl RequirementService {
    /// Create a new RequirementService instance
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Advance every line in the scope through the action's transition table
    ///
    /// Two steps inside one transaction:
    /// 1. Carry-forward: lines entering the action's editing stage copy the
    ///    latest non-null upstream adjustment into that stage's slot, only
    ///    when the slot is still empty. A repeated call never clobbers a
    ///    manual edit.
    /// 2. Transition: each allowed from-status moves to its single
    ///    to-status.
    ///
    /// The carry-forward completes before any status changes, so the copy
    /// never runs against an already-moved status. Transitions are strictly
    /// monotonic; see [`send_back`] for the reverse operation.
    ///
    /// [`send_back`]: RequirementService::send_back
    pub async fn advance(
        &self,
        scope: &RequirementScope,
        action: ReleaseAction,
    ) -> AppResult<AdvanceOutcome> {
        validate_scope(scope)?;
        let week_filter = scope.week_filter.as_ref().map(|w| w.to_string());

        let mut tx = self.db.begin().await?;

        for step in action.carry_steps() {
            let upstream = step
                .upstream
                .iter()
                .map(|stage| stage.column())
                .collect::<Vec<_>>()
                .join(", ");
            let entering: Vec<String> = step
                .entering
                .iter()
                .map(|status| status.as_str().to_string())
                .collect();

            // Column names come from the static stage table, never from input
            let sql = format!(
                r#"
                UPDATE requirement_lines
                SET {slot} = COALESCE({slot}, {upstream}), updated_at = NOW()
                WHERE school_id = $1 AND product_group = $2 AND period = $3
                  AND ($4::text IS NULL OR supply_week = $4)
                  AND status = ANY($5)
                "#,
                slot = step.slot.column(),
                upstream = upstream,
            );

            sqlx::query(&sql)
                .bind(scope.school_id)
                .bind(&scope.product_group)
                .bind(scope.period.as_str())
                .bind(&week_filter)
                .bind(&entering)
                .execute(&mut *tx)
                .await?;
        }

        let mut rows_affected = 0u64;
        let mut new_status = None;

        for (from, to) in action.transitions() {
            let result = sqlx::query(
                r#"
                UPDATE requirement_lines
                SET status = $1, updated_at = NOW()
                WHERE status = $2
                  AND school_id = $3 AND product_group = $4 AND period = $5
                  AND ($6::text IS NULL OR supply_week = $6)
                "#,
            )
            .bind(to.as_str())
            .bind(from.as_str())
            .bind(scope.school_id)
            .bind(&scope.product_group)
            .bind(scope.period.as_str())
            .bind(&week_filter)
            .execute(&mut *tx)
            .await?;

            if result.rows_affected() > 0 {
                rows_affected += result.rows_affected();
                new_status = Some(*to);
            }
        }

        tx.commit().await?;

        tracing::debug!(
            action = action.as_str(),
            rows_affected,
            "Workflow scope advanced"
        );

        Ok(AdvanceOutcome {
            rows_affected,
            new_status,
        })
    }

    /// Send every line in the scope back one stage
    ///
    /// Explicitly distinct from [`advance`]: each role's return has its own
    /// transition table and never touches adjustment slots.
    ///
    /// [`advance`]: RequirementService::advance
    pub async fn send_back(
        &self,
        scope: &RequirementScope,
        action: ReturnAction,
    ) -> AppResult<AdvanceOutcome> {
        validate_scope(scope)?;
        let week_filter = scope.week_filter.as_ref().map(|w| w.to_string());

        let mut tx = self.db.begin().await?;

        let mut rows_affected = 0u64;
        let mut new_status = None;

        for (from, to) in action.transitions() {
            let result = sqlx::query(
                r#"
                UPDATE requirement_lines
                SET status = $1, updated_at = NOW()
                WHERE status = $2
                  AND school_id = $3 AND product_group = $4 AND period = $5
                  AND ($6::text IS NULL OR supply_week = $6)
                "#,
            )
            .bind(to.as_str())
            .bind(from.as_str())
            .bind(scope.school_id)
            .bind(&scope.product_group)
            .bind(scope.period.as_str())
            .bind(&week_filter)
            .execute(&mut *tx)
            .await?;

            if result.rows_affected() > 0 {
                rows_affected += result.rows_affected();
                new_status = Some(*to);
            }
        }

        tx.commit().await?;

        Ok(AdvanceOutcome {
            rows_affected,
            new_status,
        })
    }

    /// List the requirement lines in a scope
    pub async fn lines_for_scope(
        &self,
        scope: &RequirementScope,
    ) -> AppResult<Vec<RequirementLine>> {
        validate_scope(scope)?;
        let week_filter = scope.week_filter.as_ref().map(|w| w.to_string());

        let rows = sqlx::query_as::<_, RequirementLineRow>(
            r#"
            SELECT id, school_id, product_id, origin_product_code, product_group, period,
                   status, frequency, per_capita, quantity, supply_week, consumption_week,
                   base_quantity, nutrition_quantity, coordination_quantity,
                   logistics_quantity, confirmation_quantity, generic_product_id,
                   substitution_quantity, override_quantity, generic_quantity,
                   created_at, updated_at
            FROM requirement_lines
            WHERE school_id = $1 AND product_group = $2 AND period = $3
              AND ($4::text IS NULL OR supply_week = $4)
            ORDER BY origin_product_code, supply_week
            "#,
        )
        .bind(scope.school_id)
        .bind(&scope.product_group)
        .bind(scope.period.as_str())
        .bind(&week_filter)
        .fetch_all(&self.db)
        .await?;

        rows.into_iter().map(|row| row.try_into()).collect()
    }
}

/// Reject an incomplete scope before any row is touched
fn validate_scope(scope: &RequirementScope) -> AppResult<()> {
    validate_product_group(&scope.product_group).map_err(|message| AppError::Validation {
        field: "product_group".to_string(),
        message: message.to_string(),
        message_pt: "O grupo de produtos é obrigatório".to_string(),
    })
}

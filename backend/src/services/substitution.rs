//! Substitution and consolidation service
//!
//! Maps the origin-product order lines of every school sharing a supply and
//! consumption week onto one generic commercial product. The consolidated
//! group is computed on read; denormalized fields on the member lines are
//! persisted only when an operator selects a generic product or edits an
//! origin quantity.

use std::collections::HashSet;

use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use shared::{
    consolidated_quantity, generic_quantity, replicable_sources, validate_conversion_factor,
    validate_override_quantity, GenericProduct, MealPeriod, OriginGroupKey, ReplicationSource,
    SubstitutionMember,
};

/// Substitution service for consolidation across schools
#[derive(Clone)]
pub struct SubstitutionService {
    db: PgPool,
}

/// Database row for a group member line
#[derive(Debug, sqlx::FromRow)]
struct MemberRow {
    school_id: Uuid,
    quantity: Decimal,
    substitution_quantity: Option<Decimal>,
    override_quantity: Option<Decimal>,
}

impl From<MemberRow> for SubstitutionMember {
    fn from(row: MemberRow) -> Self {
        SubstitutionMember {
            school_id: row.school_id,
            requested_quantity: row.quantity,
            substitution_quantity: row.substitution_quantity,
            override_quantity: row.override_quantity,
        }
    }
}

/// Result of selecting a generic product for a group
#[derive(Debug, Serialize)]
pub struct GenericSelectionOutcome {
    pub generic_quantity: Decimal,
    pub lines_updated: u64,
}

/// Result of an override edit
#[derive(Debug, Serialize)]
pub struct OverrideOutcome {
    /// None when the group has no generic product selected yet
    pub generic_quantity: Option<Decimal>,
}

/// Result of replicating frequencies across meal periods
#[derive(Debug, Serialize)]
pub struct ReplicationOutcome {
    pub lines_updated: u64,
}

/// Per-school view of a consolidation group
#[derive(Debug, Serialize)]
pub struct MemberSummary {
    pub school_id: Uuid,
    pub requested_quantity: Decimal,
    pub substitution_quantity: Option<Decimal>,
    pub override_quantity: Option<Decimal>,
    pub effective_quantity: Decimal,
}

/// Read model of one origin substitution group
#[derive(Debug, Serialize)]
pub struct GroupSummary {
    pub members: Vec<MemberSummary>,
    pub consolidated_quantity: Decimal,
    pub generic_product_id: Option<Uuid>,
    pub generic_product_code: Option<String>,
    pub conversion_factor: Option<Decimal>,
    pub generic_quantity: Option<Decimal>,
}

impl SubstitutionService {
    /// Create a new SubstitutionService instance
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Member lines of a group, one per school
    pub async fn members(&self, key: &OriginGroupKey) -> AppResult<Vec<SubstitutionMember>> {
        let rows = self.member_rows(&self.db, key).await?;
        Ok(rows.into_iter().map(|r| r.into()).collect())
    }

    /// Consolidated origin quantity of the group
    ///
    /// Sum of the per-school effective quantities, with override > stored
    /// substitution > requested precedence evaluated independently per
    /// school.
    pub async fn consolidated_origin_quantity(&self, key: &OriginGroupKey) -> AppResult<Decimal> {
        let members = self.members(key).await?;
        Ok(consolidated_quantity(&members))
    }

    /// Select the generic product for every member line of the group
    ///
    /// Snapshots each school's effective quantity into its substitution
    /// slot, then recomputes the consolidated generic quantity. The generic
    /// quantity is never edited directly; it is always recomputed from the
    /// per-school effective quantities and the conversion factor.
    pub async fn select_generic(
        &self,
        key: &OriginGroupKey,
        generic_product_id: Uuid,
    ) -> AppResult<GenericSelectionOutcome> {
        let product = sqlx::query_as::<_, (Uuid, String, String, Decimal)>(
            "SELECT id, code, description, conversion_factor FROM generic_products WHERE id = $1",
        )
        .bind(generic_product_id)
        .fetch_optional(&self.db)
        .await?
        .map(|(id, code, description, conversion_factor)| GenericProduct {
            id,
            code,
            description,
            conversion_factor,
        })
        .ok_or_else(|| AppError::NotFound("Generic product".to_string()))?;

        validate_conversion_factor(product.conversion_factor).map_err(|message| {
            AppError::Validation {
                field: "conversion_factor".to_string(),
                message: message.to_string(),
                message_pt: "O fator de conversão deve ser positivo".to_string(),
            }
        })?;
        let factor = product.conversion_factor;

        let mut tx = self.db.begin().await?;

        let updated = sqlx::query(
            r#"
            UPDATE requirement_lines
            SET generic_product_id = $1,
                substitution_quantity = COALESCE(override_quantity, substitution_quantity, quantity),
                updated_at = NOW()
            WHERE origin_product_code = $2 AND supply_week = $3 AND consumption_week = $4
            "#,
        )
        .bind(generic_product_id)
        .bind(&key.origin_product_code)
        .bind(key.supply_week.to_string())
        .bind(&key.consumption_week)
        .execute(&mut *tx)
        .await?;

        let members: Vec<SubstitutionMember> = self
            .member_rows(&mut *tx, key)
            .await?
            .into_iter()
            .map(|r| r.into())
            .collect();

        let consolidated = consolidated_quantity(&members);
        let generic = generic_quantity(consolidated, factor);

        self.persist_generic_quantity(&mut *tx, key, generic).await?;

        tx.commit().await?;

        Ok(GenericSelectionOutcome {
            generic_quantity: generic,
            lines_updated: updated.rows_affected(),
        })
    }

    /// Record an operator-entered per-school quantity
    ///
    /// The override takes precedence over any stored substitution value and
    /// triggers the generic-quantity recalculation. Concurrent overrides for
    /// the same school resolve last-write-wins at the row level; a single
    /// logistics operator per group is assumed.
    pub async fn set_override(
        &self,
        key: &OriginGroupKey,
        school_id: Uuid,
        quantity: Decimal,
    ) -> AppResult<OverrideOutcome> {
        validate_override_quantity(quantity).map_err(|message| AppError::Validation {
            field: "quantity".to_string(),
            message: message.to_string(),
            message_pt: "A quantidade não pode ser negativa".to_string(),
        })?;

        self.write_override(key, school_id, Some(quantity)).await
    }

    /// Drop an operator override so the precedence chain falls back to the
    /// stored substitution or requested quantity
    pub async fn clear_override(
        &self,
        key: &OriginGroupKey,
        school_id: Uuid,
    ) -> AppResult<OverrideOutcome> {
        self.write_override(key, school_id, None).await
    }

    /// Read model of the group: member quantities plus consolidated totals
    pub async fn group_summary(&self, key: &OriginGroupKey) -> AppResult<GroupSummary> {
        let members: Vec<SubstitutionMember> = self.members(key).await?;

        let generic = sqlx::query_as::<_, (Option<Uuid>, Option<String>, Option<Decimal>, Option<Decimal>)>(
            r#"
            SELECT rl.generic_product_id, gp.code, gp.conversion_factor, rl.generic_quantity
            FROM requirement_lines rl
            LEFT JOIN generic_products gp ON gp.id = rl.generic_product_id
            WHERE rl.origin_product_code = $1 AND rl.supply_week = $2 AND rl.consumption_week = $3
            LIMIT 1
            "#,
        )
        .bind(&key.origin_product_code)
        .bind(key.supply_week.to_string())
        .bind(&key.consumption_week)
        .fetch_optional(&self.db)
        .await?;

        let (generic_product_id, generic_product_code, conversion_factor, generic_qty) =
            generic.unwrap_or((None, None, None, None));

        let member_summaries = members
            .iter()
            .map(|m| MemberSummary {
                school_id: m.school_id,
                requested_quantity: m.requested_quantity,
                substitution_quantity: m.substitution_quantity,
                override_quantity: m.override_quantity,
                effective_quantity: m.effective_quantity(),
            })
            .collect();

        Ok(GroupSummary {
            members: member_summaries,
            consolidated_quantity: consolidated_quantity(&members),
            generic_product_id,
            generic_product_code,
            conversion_factor,
            generic_quantity: generic_qty,
        })
    }

    /// Copy each line's origin-period frequency to the destination periods
    ///
    /// Lines with a zero or empty origin-period frequency are untouched.
    /// Every affected destination line gets its derived quantity recomputed
    /// from the copied frequency and its own per-capita factor. A request
    /// that matches nothing reports zero updated lines; an invalid
    /// destination set is rejected before any row is touched.
    pub async fn replicate_across_periods(
        &self,
        origin_period: MealPeriod,
        destination_periods: &[MealPeriod],
        line_ids: &[Uuid],
    ) -> AppResult<ReplicationOutcome> {
        if destination_periods.is_empty() {
            return Err(AppError::Validation {
                field: "destination_periods".to_string(),
                message: "At least one destination period is required".to_string(),
                message_pt: "Informe ao menos um período de destino".to_string(),
            });
        }
        if destination_periods.contains(&origin_period) {
            return Err(AppError::Validation {
                field: "destination_periods".to_string(),
                message: "The origin period cannot be a destination".to_string(),
                message_pt: "O período de origem não pode ser destino".to_string(),
            });
        }
        if line_ids.is_empty() {
            return Ok(ReplicationOutcome { lines_updated: 0 });
        }

        let rows = sqlx::query_as::<_, ReplicationRow>(
            r#"
            SELECT id, school_id, product_id, supply_week, consumption_week, frequency
            FROM requirement_lines
            WHERE id = ANY($1) AND period = $2
            "#,
        )
        .bind(line_ids)
        .bind(origin_period.as_str())
        .fetch_all(&self.db)
        .await?;

        let sources: Vec<ReplicationSource> = rows
            .iter()
            .map(|r| ReplicationSource {
                line_id: r.id,
                frequency: r.frequency,
            })
            .collect();
        let replicable: HashSet<Uuid> = replicable_sources(&sources)
            .iter()
            .map(|s| s.line_id)
            .collect();

        let mut tx = self.db.begin().await?;
        let mut lines_updated = 0u64;

        for row in rows.iter().filter(|r| replicable.contains(&r.id)) {
            let frequency = row.frequency.unwrap_or(Decimal::ZERO);
            for destination in destination_periods {
                let result = sqlx::query(
                    r#"
                    UPDATE requirement_lines
                    SET frequency = $1,
                        quantity = CASE WHEN per_capita IS NOT NULL
                                        THEN $1 * per_capita
                                        ELSE quantity END,
                        updated_at = NOW()
                    WHERE school_id = $2 AND product_id = $3
                      AND supply_week = $4 AND consumption_week = $5
                      AND period = $6
                    "#,
                )
                .bind(frequency)
                .bind(row.school_id)
                .bind(row.product_id)
                .bind(&row.supply_week)
                .bind(&row.consumption_week)
                .bind(destination.as_str())
                .execute(&mut *tx)
                .await?;

                lines_updated += result.rows_affected();
            }
        }

        tx.commit().await?;

        Ok(ReplicationOutcome { lines_updated })
    }

    async fn member_rows<'e, E>(&self, executor: E, key: &OriginGroupKey) -> AppResult<Vec<MemberRow>>
    where
        E: sqlx::Executor<'e, Database = sqlx::Postgres>,
    {
        let rows = sqlx::query_as::<_, MemberRow>(
            r#"
            SELECT school_id, quantity, substitution_quantity, override_quantity
            FROM requirement_lines
            WHERE origin_product_code = $1 AND supply_week = $2 AND consumption_week = $3
            "#,
        )
        .bind(&key.origin_product_code)
        .bind(key.supply_week.to_string())
        .bind(&key.consumption_week)
        .fetch_all(executor)
        .await?;

        Ok(rows)
    }

    async fn persist_generic_quantity<'e, E>(
        &self,
        executor: E,
        key: &OriginGroupKey,
        generic: Decimal,
    ) -> AppResult<()>
    where
        E: sqlx::Executor<'e, Database = sqlx::Postgres>,
    {
        sqlx::query(
            r#"
            UPDATE requirement_lines
            SET generic_quantity = $1, updated_at = NOW()
            WHERE origin_product_code = $2 AND supply_week = $3 AND consumption_week = $4
            "#,
        )
        .bind(generic)
        .bind(&key.origin_product_code)
        .bind(key.supply_week.to_string())
        .bind(&key.consumption_week)
        .execute(executor)
        .await?;

        Ok(())
    }

    async fn write_override(
        &self,
        key: &OriginGroupKey,
        school_id: Uuid,
        quantity: Option<Decimal>,
    ) -> AppResult<OverrideOutcome> {
        let mut tx = self.db.begin().await?;

        let updated = sqlx::query(
            r#"
            UPDATE requirement_lines
            SET override_quantity = $1, updated_at = NOW()
            WHERE origin_product_code = $2 AND supply_week = $3 AND consumption_week = $4
              AND school_id = $5
            "#,
        )
        .bind(quantity)
        .bind(&key.origin_product_code)
        .bind(key.supply_week.to_string())
        .bind(&key.consumption_week)
        .bind(school_id)
        .execute(&mut *tx)
        .await?;

        if updated.rows_affected() == 0 {
            return Err(AppError::NotFound("Requirement line".to_string()));
        }

        let factor = sqlx::query_scalar::<_, Decimal>(
            r#"
            SELECT gp.conversion_factor
            FROM requirement_lines rl
            JOIN generic_products gp ON gp.id = rl.generic_product_id
            WHERE rl.origin_product_code = $1 AND rl.supply_week = $2
              AND rl.consumption_week = $3
            LIMIT 1
            "#,
        )
        .bind(&key.origin_product_code)
        .bind(key.supply_week.to_string())
        .bind(&key.consumption_week)
        .fetch_optional(&mut *tx)
        .await?;

        let generic = match factor {
            Some(factor) => {
                let members: Vec<SubstitutionMember> = self
                    .member_rows(&mut *tx, key)
                    .await?
                    .into_iter()
                    .map(|r| r.into())
                    .collect();
                let generic = generic_quantity(consolidated_quantity(&members), factor);
                self.persist_generic_quantity(&mut *tx, key, generic).await?;
                Some(generic)
            }
            None => None,
        };

        tx.commit().await?;

        Ok(OverrideOutcome {
            generic_quantity: generic,
        })
    }
}

/// Database row for a replication source line
#[derive(Debug, sqlx::FromRow)]
struct ReplicationRow {
    id: Uuid,
    school_id: Uuid,
    product_id: Uuid,
    supply_week: String,
    consumption_week: String,
    frequency: Option<Decimal>,
}

//! Requirement line models and approval workflow tables

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Workflow status of a requirement line
///
/// Stored as the literal codes used by the row store. The progression is
/// linear with one branch at the start: NEC -> {NEC NUTRI, NEC COORD} ->
/// NEC LOG -> CONF NUTRI -> CONF COORD -> CONF. A line holds exactly one
/// status at a time and is never deleted, only transitioned or voided.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RequirementStatus {
    #[serde(rename = "NEC")]
    Nec,
    #[serde(rename = "NEC NUTRI")]
    NecNutri,
    #[serde(rename = "NEC COORD")]
    NecCoord,
    #[serde(rename = "NEC LOG")]
    NecLog,
    #[serde(rename = "CONF NUTRI")]
    ConfNutri,
    #[serde(rename = "CONF COORD")]
    ConfCoord,
    #[serde(rename = "CONF")]
    Conf,
}

impl RequirementStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RequirementStatus::Nec => "NEC",
            RequirementStatus::NecNutri => "NEC NUTRI",
            RequirementStatus::NecCoord => "NEC COORD",
            RequirementStatus::NecLog => "NEC LOG",
            RequirementStatus::ConfNutri => "CONF NUTRI",
            RequirementStatus::ConfCoord => "CONF COORD",
            RequirementStatus::Conf => "CONF",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "NEC" => Some(RequirementStatus::Nec),
            "NEC NUTRI" => Some(RequirementStatus::NecNutri),
            "NEC COORD" => Some(RequirementStatus::NecCoord),
            "NEC LOG" => Some(RequirementStatus::NecLog),
            "CONF NUTRI" => Some(RequirementStatus::ConfNutri),
            "CONF COORD" => Some(RequirementStatus::ConfCoord),
            "CONF" => Some(RequirementStatus::Conf),
            _ => None,
        }
    }

    /// A confirmed line accepts no further transitions
    pub fn is_terminal(&self) -> bool {
        matches!(self, RequirementStatus::Conf)
    }
}

/// Meal period a requirement line belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MealPeriod {
    Morning,
    Afternoon,
    Evening,
    FullTime,
}

impl MealPeriod {
    pub fn as_str(&self) -> &'static str {
        match self {
            MealPeriod::Morning => "morning",
            MealPeriod::Afternoon => "afternoon",
            MealPeriod::Evening => "evening",
            MealPeriod::FullTime => "full_time",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "morning" => Some(MealPeriod::Morning),
            "afternoon" => Some(MealPeriod::Afternoon),
            "evening" => Some(MealPeriod::Evening),
            "full_time" => Some(MealPeriod::FullTime),
            _ => None,
        }
    }
}

/// Per-stage adjustment slot of a requirement line
///
/// Slots are append-only: a populated slot is never blindly overwritten, a
/// downstream stage copies the latest non-null upstream value into its own
/// slot exactly once, on the transition that enters that stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdjustmentStage {
    Base,
    Nutrition,
    Coordination,
    Logistics,
    ConfNutrition,
}

impl AdjustmentStage {
    /// Column holding this stage's quantity in the row store
    pub fn column(&self) -> &'static str {
        match self {
            AdjustmentStage::Base => "base_quantity",
            AdjustmentStage::Nutrition => "nutrition_quantity",
            AdjustmentStage::Coordination => "coordination_quantity",
            AdjustmentStage::Logistics => "logistics_quantity",
            AdjustmentStage::ConfNutrition => "confirmation_quantity",
        }
    }
}

/// The adjustment slots of one requirement line
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AdjustmentSlots {
    pub base: Option<Decimal>,
    pub nutrition: Option<Decimal>,
    pub coordination: Option<Decimal>,
    pub logistics: Option<Decimal>,
    pub conf_nutrition: Option<Decimal>,
}

impl AdjustmentSlots {
    pub fn get(&self, stage: AdjustmentStage) -> Option<Decimal> {
        match stage {
            AdjustmentStage::Base => self.base,
            AdjustmentStage::Nutrition => self.nutrition,
            AdjustmentStage::Coordination => self.coordination,
            AdjustmentStage::Logistics => self.logistics,
            AdjustmentStage::ConfNutrition => self.conf_nutrition,
        }
    }

    pub fn set(&mut self, stage: AdjustmentStage, value: Option<Decimal>) {
        match stage {
            AdjustmentStage::Base => self.base = value,
            AdjustmentStage::Nutrition => self.nutrition = value,
            AdjustmentStage::Coordination => self.coordination = value,
            AdjustmentStage::Logistics => self.logistics = value,
            AdjustmentStage::ConfNutrition => self.conf_nutrition = value,
        }
    }

    /// First non-null slot in the given upstream order
    pub fn latest(&self, stages: &[AdjustmentStage]) -> Option<Decimal> {
        stages.iter().find_map(|stage| self.get(*stage))
    }

    /// Apply one carry step, filling the target slot only if it is empty
    ///
    /// Returns true when the slot was populated by this call, so a repeated
    /// call is a no-op and a prior manual edit is never clobbered.
    pub fn apply_carry(&mut self, step: &CarryStep) -> bool {
        if self.get(step.slot).is_some() {
            return false;
        }
        match self.latest(step.upstream) {
            Some(value) => {
                self.set(step.slot, Some(value));
                true
            }
            None => false,
        }
    }
}

/// Copy-if-empty merge of a downstream slot with its upstream value
pub fn carry_forward(current: Option<Decimal>, upstream: Option<Decimal>) -> Option<Decimal> {
    current.or(upstream)
}

/// One carry-forward step of a release action
///
/// Lines whose status is in `entering` copy the latest non-null value among
/// the `upstream` slots into `slot`, only when `slot` is still empty.
#[derive(Debug, Clone, Copy)]
pub struct CarryStep {
    pub entering: &'static [RequirementStatus],
    pub slot: AdjustmentStage,
    pub upstream: &'static [AdjustmentStage],
}

/// Forward workflow action, gated by the acting role
///
/// Each action owns an explicit transition table mapping every allowed
/// from-status to exactly one to-status. Transitions are strictly monotonic;
/// sending a line back is a separate operation with its own tables, never an
/// exception path here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReleaseAction {
    Nutrition,
    Coordination,
    Logistics,
}

impl ReleaseAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReleaseAction::Nutrition => "nutrition_release",
            ReleaseAction::Coordination => "coordination_release",
            ReleaseAction::Logistics => "logistics_release",
        }
    }

    /// Allowed (from, to) status pairs for this action
    pub fn transitions(&self) -> &'static [(RequirementStatus, RequirementStatus)] {
        use RequirementStatus::*;
        match self {
            ReleaseAction::Nutrition => &[(Nec, NecNutri), (NecLog, ConfNutri)],
            ReleaseAction::Coordination => {
                &[(Nec, NecCoord), (NecNutri, NecCoord), (ConfNutri, ConfCoord)]
            }
            ReleaseAction::Logistics => &[(NecCoord, NecLog), (ConfCoord, Conf)],
        }
    }

    /// To-status for a given from-status, None when the action does not
    /// apply to lines in that status
    pub fn transition(&self, from: RequirementStatus) -> Option<RequirementStatus> {
        self.transitions()
            .iter()
            .find(|(f, _)| *f == from)
            .map(|(_, to)| *to)
    }

    /// Carry-forward steps executed before the status transition
    pub fn carry_steps(&self) -> &'static [CarryStep] {
        use AdjustmentStage::*;
        match self {
            ReleaseAction::Nutrition => &[
                CarryStep {
                    entering: &[RequirementStatus::Nec],
                    slot: Nutrition,
                    upstream: &[Base],
                },
                CarryStep {
                    entering: &[RequirementStatus::NecLog],
                    slot: ConfNutrition,
                    upstream: &[Logistics, Coordination, Nutrition, Base],
                },
            ],
            ReleaseAction::Coordination => &[CarryStep {
                entering: &[RequirementStatus::Nec, RequirementStatus::NecNutri],
                slot: Coordination,
                upstream: &[Nutrition, Base],
            }],
            ReleaseAction::Logistics => &[CarryStep {
                entering: &[RequirementStatus::NecCoord],
                slot: Logistics,
                upstream: &[Coordination, Nutrition, Base],
            }],
        }
    }
}

/// Reverse workflow action, explicitly distinct from the release actions
///
/// Each role's return undoes its own release, stepping back to the
/// immediately preceding stage. Returns never touch adjustment slots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReturnAction {
    Nutrition,
    Coordination,
    Logistics,
}

impl ReturnAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReturnAction::Nutrition => "nutrition_return",
            ReturnAction::Coordination => "coordination_return",
            ReturnAction::Logistics => "logistics_return",
        }
    }

    /// Allowed (from, to) status pairs for this action
    pub fn transitions(&self) -> &'static [(RequirementStatus, RequirementStatus)] {
        use RequirementStatus::*;
        match self {
            ReturnAction::Nutrition => &[(NecNutri, Nec), (ConfNutri, NecLog)],
            ReturnAction::Coordination => &[(NecCoord, NecNutri), (ConfCoord, ConfNutri)],
            ReturnAction::Logistics => &[(NecLog, NecCoord), (Conf, ConfCoord)],
        }
    }

    /// To-status for a given from-status, None when the action does not
    /// apply to lines in that status
    pub fn transition(&self, from: RequirementStatus) -> Option<RequirementStatus> {
        self.transitions()
            .iter()
            .find(|(f, _)| *f == from)
            .map(|(_, to)| *to)
    }
}

/// One school/product/period order-quantity record moving through the
/// approval workflow
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequirementLine {
    pub id: Uuid,
    pub school_id: Uuid,
    pub product_id: Uuid,
    pub origin_product_code: String,
    pub product_group: String,
    pub period: MealPeriod,
    pub status: RequirementStatus,
    /// Weekly consumption frequency; feeds the derived quantity
    pub frequency: Option<Decimal>,
    /// Per-capita factor supplied by an external collaborator
    pub per_capita: Option<Decimal>,
    /// Originally requested quantity
    pub quantity: Decimal,
    pub supply_week: String,
    pub consumption_week: String,
    #[serde(flatten)]
    pub adjustments: AdjustmentSlots,
    /// Generic product selected by logistics, if any
    pub generic_product_id: Option<Uuid>,
    /// Quantity snapshot persisted when the substitution was recorded
    pub substitution_quantity: Option<Decimal>,
    /// Operator-entered per-school quantity, highest precedence
    pub override_quantity: Option<Decimal>,
    /// Denormalized consolidated generic quantity, recomputed on every edit
    pub generic_quantity: Option<Decimal>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

//! Bottleneck analysis, pipeline stages, and the team's active plan.
//!
//! Everything here is pure planning over snapshots: given skill levels and
//! bank contents, rank what the team should train, expand it into ordered
//! gather/craft/fight stages, and track plan progress. Dead ends (no
//! recipe, no monster, empty team) are valid no-op results, never errors.

mod bottleneck;
mod pipeline;
mod plan;

pub use bottleneck::{SkillAverage, team_bottleneck};
pub use pipeline::{PipelineStage, assign_to_stage, build_pipeline_stages};
pub use plan::{
    ActivePlan, MaterialNeed, MaterialSource, PlanProgress, PlanStatus, build_active_plan,
    should_complete, should_deposit, update_progress,
};

/// A stage or craft is considered well-stocked when the bank holds at least
/// this many recipes' worth of a material.
pub(crate) const BANK_STOCK_MULTIPLIER: u32 = 5;

/// Crafts per planning batch; sizes material needs and craft goals.
pub(crate) const CRAFT_BATCH: u32 = 5;

/// An agent carrying at least this many needed units should bank them.
pub(crate) const DEPOSIT_BATCH_THRESHOLD: u32 = 10;

/// Recursion bound for material-chain walking.
pub(crate) const MAX_MATERIAL_DEPTH: u32 = 10;

/// Score multiplier favoring the stage an agent already works.
pub(crate) const PREVIOUS_STAGE_DISCOUNT: f64 = 0.7;

//! Goal coordination and planning engine for the agent fleet.
//!
//! This crate wires the shared board, the reservation ledger, the bottleneck
//! pipeline, the fight simulator, and the coordinator into the per-agent
//! decision loop. Consumers build one [`Coordinator`] per fleet and one
//! [`Agent`] per character, then spawn each agent's `run` loop.
//!
//! Modules are organized by responsibility:
//! - [`board`] owns the live shared board and hands out deep-copy snapshots
//! - [`ledger`] tracks per-agent claims against shared bank stock
//! - [`planner`] ranks team skills and expands them into pipeline stages
//! - [`simulator`] memoizes win-rate simulations and searches for bosses
//! - [`coordinator`] assigns non-overlapping goals across the team
//! - [`agent`] is the per-character decision loop and failure recovery
pub mod agent;
pub mod board;
pub mod coordinator;
pub mod ledger;
pub mod planner;
pub mod simulator;

pub use agent::{Agent, AgentBuilder, AgentError, Recovery, error_recovery};
pub use board::Board;
pub use coordinator::{Coordinator, CoordinatorConfig};
pub use ledger::ReservationLedger;
pub use planner::{
    ActivePlan, MaterialNeed, MaterialSource, PipelineStage, PlanProgress, PlanStatus,
    SkillAverage, assign_to_stage, build_active_plan, build_pipeline_stages, should_complete,
    should_deposit, team_bottleneck, update_progress,
};
pub use simulator::FightSimulator;

//! Domain model shared by every Caravan crate.
//!
//! This crate defines the data the fleet reasons about (goals, character
//! snapshots, world entities) plus the trait seams behind which the game
//! API, world knowledge, equipment advice, and fallback strategies live.
//! It contains no I/O; implementations plug in from `caravan-api-http` and
//! the client composition root.
//!
//! Modules are organized by responsibility:
//! - [`goal`] is the closed goal sum type consumed once per agent tick
//! - [`state`] models one character's authoritative snapshot
//! - [`board`] holds the shared latest-state projections agents publish
//! - [`world`] models static game content and the [`WorldKnowledge`] seam
//! - [`api`] is the game API seam and its numeric error taxonomy
//! - [`advisor`] and [`strategy`] are the remaining injection points
pub mod advisor;
pub mod api;
pub mod board;
pub mod goal;
pub mod state;
pub mod strategy;
pub mod world;

pub use advisor::{Activity, EquipmentAdvisor, GearSwap};
pub use api::{ApiError, ApiResult, Cooldown, FightOutcome, GameApi, SimulationResult, codes};
pub use board::{BankBoardState, BoardSnapshot, CharacterBoardState, MarketOrder};
pub use goal::Goal;
pub use state::{CharacterState, EquipSlot, ItemStack, Skill, SkillProgress, TaskKind, TaskState};
pub use strategy::{IdleStrategy, Strategy};
pub use world::{
    DropEntry, Item, ItemEffect, MapContent, MapTile, Monster, NpcListing, Recipe, RecipeMaterial,
    ResourceNode, WorldKnowledge,
};

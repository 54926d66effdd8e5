//! Fallback strategy seam.
//!
//! When pipeline coordination is disabled, fails to produce a stage, or the
//! team is unknown, the coordinator (or the agent directly, if it has no
//! coordinator) asks a [`Strategy`] for a goal. Different implementations
//! can train a rotation, grind a single skill, or serve scripted fixtures
//! in tests.

use async_trait::async_trait;

use crate::board::BoardSnapshot;
use crate::goal::Goal;
use crate::state::CharacterState;

#[async_trait]
pub trait Strategy: Send + Sync {
    /// Decide a goal for the named character from its current state and the
    /// latest board snapshot. Must not block on network I/O beyond the
    /// snapshot it was handed; planning-level dead ends return `Idle`, not
    /// errors.
    async fn decide(&self, name: &str, state: &CharacterState, board: &BoardSnapshot) -> Goal;
}

/// Strategy that always idles. Useful as a fixture and as the terminal
/// fallback when nothing better is configured.
pub struct IdleStrategy;

#[async_trait]
impl Strategy for IdleStrategy {
    async fn decide(&self, _name: &str, _state: &CharacterState, _board: &BoardSnapshot) -> Goal {
        Goal::idle("no strategy configured")
    }
}

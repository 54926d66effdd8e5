//! Priority overrides checked before any planner gets a say.
//!
//! Strict tick order: survival, then urgent task resolution, then the
//! inventory deposit margin, then routine task management. The urgent task
//! overrides outrank the deposit check; the routine ones do not.

use caravan_core::{CharacterState, Goal, TaskKind, WorldKnowledge};

/// Resting starts below this fraction of max HP.
pub(crate) const LOW_HP_RATIO: f64 = 0.4;

/// Deposit once the inventory is within this many units of capacity.
pub(crate) const DEPOSIT_MARGIN: u32 = 5;

/// Deposit once this many inventory slots are occupied.
pub(crate) const SLOT_LIMIT: usize = 20;

/// An item task may be traded early once the inventory is this full.
const TASK_TRADE_FULL_RATIO: f64 = 0.95;

/// Item consumed by a task cancellation.
const TASK_CANCEL_ITEM: &str = "tasks_coin";

/// Survival outranks everything: low HP means rest, whatever else is going
/// on.
pub fn survival_override(state: &CharacterState) -> Option<Goal> {
    if (state.hp as f64) < LOW_HP_RATIO * state.max_hp as f64 {
        return Some(Goal::Rest);
    }
    None
}

/// Task resolution that must not wait for a bank detour: turning in a
/// finished task, or trading collected items while they are on hand.
pub fn task_override_urgent(state: &CharacterState) -> Option<Goal> {
    let task = state.task.as_ref()?;
    if task.is_complete() {
        return Some(Goal::TaskComplete);
    }
    if task.kind == TaskKind::Items {
        let on_hand = state.inventory_count(&task.code);
        let nearly_full = state.inventory_total() as f64
            >= TASK_TRADE_FULL_RATIO * state.inventory_max_items as f64;
        if on_hand > 0 && (on_hand >= task.remaining() || nearly_full) {
            return Some(Goal::TaskTrade);
        }
    }
    None
}

/// Inventory deposit margin: near-full by quantity or by slot count.
pub fn deposit_override(state: &CharacterState) -> Option<Goal> {
    let near_capacity =
        state.inventory_total() >= state.inventory_max_items.saturating_sub(DEPOSIT_MARGIN);
    if near_capacity || state.used_slots() >= SLOT_LIMIT {
        return Some(Goal::DepositAll);
    }
    None
}

/// Routine task management: pick up a task when idle-handed, or abandon one
/// that is provably unachievable (and a cancellation coin is on hand).
pub fn task_override_routine(state: &CharacterState, world: &dyn WorldKnowledge) -> Option<Goal> {
    match &state.task {
        None => Some(Goal::TaskNew),
        Some(task) => {
            let unachievable = !world.task_achievable(task, &state.skill_levels());
            if unachievable && state.inventory_count(TASK_CANCEL_ITEM) >= 1 {
                Some(Goal::TaskCancel)
            } else {
                None
            }
        }
    }
}

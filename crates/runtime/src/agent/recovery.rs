//! Classified API failure recovery.
//!
//! Tier 1 of the error design: errors the game encodes semantically are
//! resolved inside the tick that caused them. Each code maps to a concrete
//! recovery goal, a silent skip, or "unknown", which keeps the failed goal
//! alive and feeds the stuck counter instead.

use caravan_core::{CharacterState, Goal, codes};

/// What to do about a classified API failure.
#[derive(Clone, Debug, PartialEq)]
pub enum Recovery {
    /// Execute this goal immediately instead of the failed one.
    Goal(Goal),
    /// Abandon the goal this tick; counters reset, the next tick
    /// re-strategizes.
    Skip,
    /// Unclassified: the goal stays charged against the stuck counter.
    Unknown,
}

/// Map a game error code to a recovery, given the goal that failed and the
/// character's current state.
pub fn error_recovery(code: u16, state: &CharacterState, goal: &Goal) -> Recovery {
    match code {
        codes::INVENTORY_FULL => Recovery::Goal(Goal::DepositAll),

        // Already holding a task: resolvable if finished, otherwise just a
        // stale TaskNew.
        codes::TASK_ALREADY_ASSIGNED => match &state.task {
            Some(task) if task.is_complete() => Recovery::Goal(Goal::TaskComplete),
            _ => Recovery::Skip,
        },

        // Task op raced past its own completion.
        codes::NO_TASK => match goal {
            Goal::TaskComplete | Goal::TaskTrade | Goal::TaskCancel => {
                Recovery::Goal(Goal::TaskNew)
            }
            _ => Recovery::Skip,
        },

        codes::TASK_NOT_COMPLETE
        | codes::MISSING_ITEM
        | codes::SKILL_LEVEL_TOO_LOW
        | codes::ALREADY_AT_DESTINATION
        | codes::ALREADY_EQUIPPED
        | codes::COOLDOWN_ACTIVE
        | codes::ACTION_LOCKED
        | codes::EXCHANGE_NO_STOCK
        | codes::EXCHANGE_CONFLICT
        | codes::BANK_FULL
        | codes::NOTHING_HERE => Recovery::Skip,

        _ => Recovery::Unknown,
    }
}

//! Goal definition: the one decision an agent commits to per tick.
//!
//! Goals are a closed sum type: every consumer (execution, target-key
//! derivation, decision logging) matches exhaustively, so adding a variant
//! is a compile-time conversation with every consumer.

use serde::Serialize;

use crate::state::EquipSlot;

/// A concrete objective, immutable once produced and consumed exactly once.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Goal {
    /// Gather from a resource node.
    Gather { resource: String },

    /// Fight a monster, optionally as part of a formed party.
    Fight {
        monster: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        party: Option<Vec<String>>,
    },

    /// Craft `quantity` of an item at its workshop.
    Craft { item: String, quantity: u32 },

    /// Recover HP.
    Rest,

    /// Empty the whole inventory (and carried gold) into the bank.
    DepositAll,

    /// Walk to a map coordinate.
    Move { x: i32, y: i32 },

    /// Equip an item into a slot.
    Equip { code: String, slot: EquipSlot },

    /// Clear a slot back into the inventory.
    Unequip { slot: EquipSlot },

    /// Buy from an NPC vendor.
    BuyNpc {
        npc: String,
        item: String,
        quantity: u32,
    },

    /// Buy from the grand exchange, up to a unit price ceiling.
    BuyExchange {
        item: String,
        max_price: u64,
        quantity: u32,
    },

    /// List items on the grand exchange.
    SellExchange {
        item: String,
        quantity: u32,
        price: u64,
    },

    /// Accept a new task from the task master.
    TaskNew,

    /// Turn in a finished task.
    TaskComplete,

    /// Hand task items over to the task master.
    TaskTrade,

    /// Abandon the current task (consumes a cancellation token item).
    TaskCancel,

    /// Do nothing this tick. The reason surfaces in decision logs.
    Idle { reason: String },
}

impl Goal {
    pub fn idle(reason: impl Into<String>) -> Self {
        Goal::Idle {
            reason: reason.into(),
        }
    }

    /// Key used for anti-duplication: two agents must not hold the same one
    /// unless the fight belongs to an active party. Goals without a
    /// contended target have no key.
    pub fn target_key(&self) -> Option<String> {
        match self {
            Goal::Gather { resource } => Some(format!("gather:{resource}")),
            Goal::Fight { monster, .. } => Some(format!("fight:{monster}")),
            _ => None,
        }
    }

    /// True when the fight goal carries a formed party.
    pub fn is_party_fight(&self) -> bool {
        matches!(self, Goal::Fight { party: Some(_), .. })
    }

    /// Stable identity used by stuck detection: the same goal produced twice
    /// yields the same string.
    pub fn identity(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| format!("{self:?}"))
    }
}

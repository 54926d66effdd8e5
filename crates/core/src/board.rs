//! Shared board projections.
//!
//! The board is the only state agents share directly: each loop publishes a
//! reduced view of its character after every action, plus the last observed
//! bank contents and exchange orders. These are the plain data shapes; the
//! live board with its single owner lives in `caravan-runtime`.

use std::collections::BTreeMap;
use std::time::SystemTime;

use serde::{Deserialize, Serialize};

use crate::state::{ItemStack, Skill};

/// Reduced projection of one character, published after every API call.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct CharacterBoardState {
    pub name: String,
    pub x: i32,
    pub y: i32,
    /// Human-readable description of the current action, for logs and
    /// teammate stand-in reconstruction.
    pub action: String,
    pub skill_levels: BTreeMap<Skill, u32>,
    pub inventory_total: u32,
    pub inventory_max_items: u32,
}

/// Last observed bank contents.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct BankBoardState {
    pub items: Vec<ItemStack>,
    pub gold: u64,
    #[serde(skip)]
    pub updated_at: Option<SystemTime>,
}

impl Default for BankBoardState {
    fn default() -> Self {
        Self {
            items: Vec::new(),
            gold: 0,
            updated_at: None,
        }
    }
}

impl BankBoardState {
    pub fn quantity(&self, code: &str) -> u32 {
        self.items
            .iter()
            .filter(|s| s.code == code)
            .map(|s| s.quantity)
            .sum()
    }
}

/// One live exchange order observed by an agent.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MarketOrder {
    pub id: String,
    pub seller: String,
    pub item: String,
    pub quantity: u32,
    pub price: u64,
}

/// Deep copy of the whole board handed to planning code. Mutating a
/// snapshot never affects the live board.
#[derive(Clone, Debug, Default, Serialize)]
pub struct BoardSnapshot {
    pub characters: BTreeMap<String, CharacterBoardState>,
    pub bank: BankBoardState,
    pub orders: Vec<MarketOrder>,
}

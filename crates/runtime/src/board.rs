//! Live shared board.
//!
//! Single owner of the process-wide latest-state projections. Agents push
//! updates between API calls; planners read deep-copied snapshots. Nothing
//! ever hands out a live reference, so a snapshot can be mutated freely
//! without touching the board (and the mutex is never held across I/O).

use std::time::SystemTime;

use tokio::sync::Mutex;

use caravan_core::{
    BankBoardState, BoardSnapshot, CharacterBoardState, CharacterState, ItemStack, MarketOrder,
};

#[derive(Default)]
pub struct Board {
    inner: Mutex<BoardSnapshot>,
}

impl Board {
    pub fn new() -> Self {
        Self::default()
    }

    /// Publish the reduced projection of one character. Overwrites any
    /// previous entry for the same name; readers always see the latest.
    pub async fn update_character(&self, state: &CharacterState, action: impl Into<String>) {
        let projection = CharacterBoardState {
            name: state.name.clone(),
            x: state.x,
            y: state.y,
            action: action.into(),
            skill_levels: state.skill_levels(),
            inventory_total: state.inventory_total(),
            inventory_max_items: state.inventory_max_items,
        };
        let mut inner = self.inner.lock().await;
        inner.characters.insert(state.name.clone(), projection);
    }

    /// Publish freshly observed bank contents.
    pub async fn update_bank(&self, items: Vec<ItemStack>, gold: u64) {
        let mut inner = self.inner.lock().await;
        inner.bank = BankBoardState {
            items,
            gold,
            updated_at: Some(SystemTime::now()),
        };
    }

    /// Publish the latest observed exchange orders.
    pub async fn update_orders(&self, orders: Vec<MarketOrder>) {
        let mut inner = self.inner.lock().await;
        inner.orders = orders;
    }

    /// Deep copy of the whole board.
    pub async fn snapshot(&self) -> BoardSnapshot {
        self.inner.lock().await.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn character(name: &str) -> CharacterState {
        CharacterState {
            name: name.into(),
            x: 1,
            y: 2,
            hp: 80,
            max_hp: 100,
            level: 5,
            skills: BTreeMap::new(),
            equipment: BTreeMap::new(),
            inventory: vec![ItemStack::new("copper_ore", 7)],
            inventory_max_items: 100,
            task: None,
            gold: 12,
        }
    }

    #[tokio::test]
    async fn snapshots_are_deep_copies() {
        let board = Board::new();
        board.update_character(&character("runner"), "gathering").await;
        board.update_bank(vec![ItemStack::new("copper_ore", 40)], 100).await;

        let mut snap = board.snapshot().await;
        snap.bank.items.clear();
        snap.characters.clear();

        let fresh = board.snapshot().await;
        assert_eq!(fresh.bank.quantity("copper_ore"), 40);
        assert!(fresh.characters.contains_key("runner"));
    }

    #[tokio::test]
    async fn character_updates_overwrite_by_name() {
        let board = Board::new();
        let mut state = character("runner");
        board.update_character(&state, "gathering").await;
        state.x = 9;
        board.update_character(&state, "fighting").await;

        let snap = board.snapshot().await;
        assert_eq!(snap.characters.len(), 1);
        let entry = &snap.characters["runner"];
        assert_eq!(entry.x, 9);
        assert_eq!(entry.action, "fighting");
    }
}

//! Reservation ledger over shared bank stock.
//!
//! Pure in-memory bookkeeping: one claim per agent at a time, newest claim
//! replaces the old, and stale claims expire so a crashed agent cannot pin
//! bank stock forever. Callers are expected to hold the coordinator lock;
//! the ledger itself does no synchronization.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use caravan_core::ItemStack;

struct Reservation {
    items: Vec<ItemStack>,
    created_at: Instant,
}

pub struct ReservationLedger {
    reservations: HashMap<String, Reservation>,
    timeout: Duration,
}

impl ReservationLedger {
    pub fn new(timeout: Duration) -> Self {
        Self {
            reservations: HashMap::new(),
            timeout,
        }
    }

    /// Claim items for an agent, replacing any prior claim by the same name.
    pub fn reserve(&mut self, agent: &str, items: Vec<ItemStack>) {
        self.reservations.insert(
            agent.to_string(),
            Reservation {
                items,
                created_at: Instant::now(),
            },
        );
    }

    /// Drop an agent's claim. No-op if it has none.
    pub fn clear(&mut self, agent: &str) {
        self.reservations.remove(agent);
    }

    /// Drop claims older than the configured timeout. Called on every
    /// planning pass, which also bounds ledger size.
    pub fn expire_stale(&mut self) {
        let timeout = self.timeout;
        self.reservations
            .retain(|_, r| r.created_at.elapsed() < timeout);
    }

    /// Quantity of one code reserved across all live claims.
    pub fn reserved(&self, code: &str) -> u32 {
        self.reservations
            .values()
            .flat_map(|r| r.items.iter())
            .filter(|s| s.code == code)
            .map(|s| s.quantity)
            .sum()
    }

    /// Bank quantities minus live reservations, clamped at zero. Every bank
    /// code is preserved in the output even when fully reserved.
    pub fn available(&self, bank: &[ItemStack]) -> Vec<ItemStack> {
        bank.iter()
            .map(|stack| {
                let reserved = self.reserved(&stack.code);
                ItemStack::new(stack.code.clone(), stack.quantity.saturating_sub(reserved))
            })
            .collect()
    }
}

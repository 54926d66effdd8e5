//! Game API seam and its error taxonomy.
//!
//! The transport already owns cooldown bookkeeping and 429/5xx retry; every
//! action method resolves once the action has been accepted, returning the
//! refreshed character snapshot. Failures surface as [`ApiError::Status`]
//! carrying the game's numeric error code, which the agent's recovery logic
//! classifies (see `caravan-runtime`).

use async_trait::async_trait;
use serde::Deserialize;
use thiserror::Error;

use crate::board::MarketOrder;
use crate::state::{CharacterState, EquipSlot, ItemStack};

pub type ApiResult<T> = std::result::Result<T, ApiError>;

#[derive(Debug, Error)]
pub enum ApiError {
    /// Non-2xx response carrying the game's semantic error code.
    #[error("game api returned {code}: {message}")]
    Status { code: u16, message: String },

    /// Network-level failure after internal retry was exhausted.
    #[error("transport failure")]
    Transport(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// Response body did not match the expected shape.
    #[error("failed to decode response body")]
    Decode(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl ApiError {
    /// The semantic error code, when this is a classified API failure.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            ApiError::Status { code, .. } => Some(*code),
            _ => None,
        }
    }
}

/// Numeric error codes with game-level meaning. Illustrative of the codes
/// the recovery table classifies; anything unlisted is treated as unknown.
pub mod codes {
    /// Character inventory is full.
    pub const INVENTORY_FULL: u16 = 497;
    /// A required item is missing from the inventory.
    pub const MISSING_ITEM: u16 = 478;
    /// Skill level too low for the attempted action.
    pub const SKILL_LEVEL_TOO_LOW: u16 = 493;
    /// Move target equals the current position.
    pub const ALREADY_AT_DESTINATION: u16 = 490;
    /// The item is already equipped in that slot.
    pub const ALREADY_EQUIPPED: u16 = 485;
    /// Action attempted while a cooldown is still running.
    pub const COOLDOWN_ACTIVE: u16 = 499;
    /// Another action is already locking the character.
    pub const ACTION_LOCKED: u16 = 486;
    /// Task master: character already has a task.
    pub const TASK_ALREADY_ASSIGNED: u16 = 489;
    /// Task master: task is not finished yet.
    pub const TASK_NOT_COMPLETE: u16 = 488;
    /// Task master: no task to act on.
    pub const NO_TASK: u16 = 487;
    /// Exchange: no matching stock at that price.
    pub const EXCHANGE_NO_STOCK: u16 = 480;
    /// Exchange: conflicting concurrent transaction.
    pub const EXCHANGE_CONFLICT: u16 = 483;
    /// Bank cannot hold more item stacks.
    pub const BANK_FULL: u16 = 462;
    /// No matching resource/monster on the current tile.
    pub const NOTHING_HERE: u16 = 598;
}

/// Cooldown descriptor attached to every accepted action.
#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct Cooldown {
    pub total_seconds: f64,
    pub reason: String,
}

/// Result of one fight action.
#[derive(Clone, Debug, PartialEq)]
pub struct FightOutcome {
    pub state: CharacterState,
    pub victory: bool,
    pub drops: Vec<ItemStack>,
    pub xp: u64,
    pub gold: u64,
}

/// Result of a simulated fight, as memoized by the fight simulator.
#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct SimulationResult {
    pub win_rate: f64,
    pub avg_final_hp: f64,
    pub avg_turns: f64,
}

/// Game API client seam.
///
/// Implementations serialize actions per character, wait out cooldowns, and
/// retry 429/5xx internally with exponential backoff; see
/// `caravan-api-http` for the production client.
#[async_trait]
pub trait GameApi: Send + Sync {
    /// Fetch an authoritative snapshot, used at startup and for resync.
    async fn get_character(&self, name: &str) -> ApiResult<CharacterState>;

    /// Wait until the named character's pending cooldown has expired.
    async fn wait_cooldown(&self, name: &str) -> ApiResult<()>;

    async fn move_to(&self, name: &str, x: i32, y: i32) -> ApiResult<CharacterState>;

    async fn fight(&self, name: &str) -> ApiResult<FightOutcome>;

    async fn gather(&self, name: &str) -> ApiResult<CharacterState>;

    async fn craft(&self, name: &str, item: &str, quantity: u32) -> ApiResult<CharacterState>;

    async fn rest(&self, name: &str) -> ApiResult<CharacterState>;

    async fn equip(&self, name: &str, code: &str, slot: EquipSlot) -> ApiResult<CharacterState>;

    async fn unequip(&self, name: &str, slot: EquipSlot) -> ApiResult<CharacterState>;

    async fn deposit_item(&self, name: &str, code: &str, quantity: u32)
    -> ApiResult<CharacterState>;

    async fn deposit_gold(&self, name: &str, quantity: u64) -> ApiResult<CharacterState>;

    async fn withdraw_item(
        &self,
        name: &str,
        code: &str,
        quantity: u32,
    ) -> ApiResult<CharacterState>;

    async fn bank_items(&self) -> ApiResult<Vec<ItemStack>>;

    async fn bank_gold(&self) -> ApiResult<u64>;

    async fn npc_buy(&self, name: &str, item: &str, quantity: u32) -> ApiResult<CharacterState>;

    async fn exchange_buy(
        &self,
        name: &str,
        item: &str,
        max_price: u64,
        quantity: u32,
    ) -> ApiResult<CharacterState>;

    async fn exchange_sell(
        &self,
        name: &str,
        item: &str,
        quantity: u32,
        price: u64,
    ) -> ApiResult<CharacterState>;

    async fn exchange_orders(&self) -> ApiResult<Vec<MarketOrder>>;

    async fn task_new(&self, name: &str) -> ApiResult<CharacterState>;

    async fn task_complete(&self, name: &str) -> ApiResult<CharacterState>;

    async fn task_trade(&self, name: &str, code: &str, quantity: u32)
    -> ApiResult<CharacterState>;

    async fn task_cancel(&self, name: &str) -> ApiResult<CharacterState>;

    /// Run the server-side fight simulation for one character build.
    async fn simulate_fight(
        &self,
        state: &CharacterState,
        monster: &str,
    ) -> ApiResult<SimulationResult>;

    /// Run the server-side fight simulation for a party.
    async fn simulate_party_fight(
        &self,
        states: &[CharacterState],
        monster: &str,
    ) -> ApiResult<SimulationResult>;
}

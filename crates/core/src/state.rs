//! Character snapshots and the inventory/skill/task model.
//!
//! [`CharacterState`] is the authoritative view of one actor, refreshed from
//! the API after every action. Agents own their state; everyone else sees
//! the reduced projection published on the board.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter};

/// One stack of items. Used for inventory slots, bank contents, drops, and
/// reservations alike; inventory slots are ordered and codes may repeat.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemStack {
    pub code: String,
    pub quantity: u32,
}

impl ItemStack {
    pub fn new(code: impl Into<String>, quantity: u32) -> Self {
        Self {
            code: code.into(),
            quantity,
        }
    }
}

/// The nine trainable skills. Declaration order is the tie-break order for
/// bottleneck ranking: gathering first, then crafting, then combat.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Display,
    EnumIter,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Skill {
    Mining,
    Woodcutting,
    Fishing,
    Alchemy,
    Weaponcrafting,
    Gearcrafting,
    Jewelrycrafting,
    Cooking,
    Combat,
}

impl Skill {
    pub fn is_gathering(self) -> bool {
        matches!(
            self,
            Skill::Mining | Skill::Woodcutting | Skill::Fishing | Skill::Alchemy
        )
    }

    pub fn is_crafting(self) -> bool {
        matches!(
            self,
            Skill::Weaponcrafting | Skill::Gearcrafting | Skill::Jewelrycrafting | Skill::Cooking
        )
    }
}

/// Level and accumulated xp for one skill.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkillProgress {
    pub level: u32,
    pub xp: u64,
}

/// Equipment slots. Ordered so cache keys and swap plans are deterministic.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Display,
    EnumIter,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum EquipSlot {
    Weapon,
    Shield,
    Helmet,
    BodyArmor,
    LegArmor,
    Boots,
    Ring1,
    Ring2,
    Amulet,
}

/// Kind of an accepted task.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskKind {
    Items,
    Monsters,
}

/// The task currently assigned by the task master, if any.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskState {
    pub code: String,
    pub kind: TaskKind,
    pub progress: u32,
    pub total: u32,
}

impl TaskState {
    pub fn remaining(&self) -> u32 {
        self.total.saturating_sub(self.progress)
    }

    pub fn is_complete(&self) -> bool {
        self.progress >= self.total
    }
}

/// Authoritative snapshot of one character.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CharacterState {
    pub name: String,
    pub x: i32,
    pub y: i32,
    pub hp: i32,
    pub max_hp: i32,
    pub level: u32,
    /// Per-skill progress. Skills the character has never touched are absent
    /// and read as level 1.
    pub skills: BTreeMap<Skill, SkillProgress>,
    /// Equipped item code per slot. Empty slots are absent.
    pub equipment: BTreeMap<EquipSlot, String>,
    pub inventory: Vec<ItemStack>,
    /// Maximum total quantity the inventory can hold.
    pub inventory_max_items: u32,
    pub task: Option<TaskState>,
    pub gold: u64,
}

impl CharacterState {
    pub fn skill_level(&self, skill: Skill) -> u32 {
        self.skills.get(&skill).map(|p| p.level).unwrap_or(1)
    }

    /// Total quantity held across every inventory slot.
    pub fn inventory_total(&self) -> u32 {
        self.inventory.iter().map(|s| s.quantity).sum()
    }

    /// Number of occupied inventory slots.
    pub fn used_slots(&self) -> usize {
        self.inventory.iter().filter(|s| s.quantity > 0).count()
    }

    /// Quantity of one item code, summed across slots.
    pub fn inventory_count(&self, code: &str) -> u32 {
        self.inventory
            .iter()
            .filter(|s| s.code == code)
            .map(|s| s.quantity)
            .sum()
    }

    pub fn free_space(&self) -> u32 {
        self.inventory_max_items
            .saturating_sub(self.inventory_total())
    }

    pub fn hp_ratio(&self) -> f64 {
        if self.max_hp <= 0 {
            return 0.0;
        }
        self.hp as f64 / self.max_hp as f64
    }

    /// Skill level map, the shape world-knowledge queries take.
    pub fn skill_levels(&self) -> BTreeMap<Skill, u32> {
        use strum::IntoEnumIterator;
        Skill::iter().map(|s| (s, self.skill_level(s))).collect()
    }
}

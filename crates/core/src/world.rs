//! Static world content and the [`WorldKnowledge`] seam.
//!
//! World knowledge is synchronous and side-effect free: recipes, resource
//! nodes, monsters, maps, and NPC listings never change during a session.
//! The concrete loader lives in the client crate; planners only see this
//! trait.

use std::collections::BTreeMap;

use serde::Deserialize;

use crate::goal::Goal;
use crate::state::{EquipSlot, ItemStack, Skill, TaskState};

/// One possible drop with its inverse rate (1 in `rate` actions).
#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct DropEntry {
    pub code: String,
    pub rate: u32,
    pub min_quantity: u32,
    pub max_quantity: u32,
}

/// Flat item effect, e.g. `attack_fire: 12` or `mining: 10`.
#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct ItemEffect {
    pub code: String,
    pub value: i32,
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct Item {
    pub code: String,
    pub name: String,
    pub level: u32,
    /// Slot this item can be equipped into, if it is gear.
    pub slot: Option<EquipSlot>,
    #[serde(default)]
    pub effects: Vec<ItemEffect>,
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct RecipeMaterial {
    pub code: String,
    pub quantity: u32,
}

/// How one item is crafted: which workshop skill, at what level, from what.
#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct Recipe {
    pub item: String,
    pub skill: Skill,
    pub level: u32,
    pub materials: Vec<RecipeMaterial>,
}

impl Recipe {
    /// Material quantities needed for `count` crafts, saturating on
    /// overflow.
    pub fn materials_for(&self, count: u32) -> Vec<ItemStack> {
        self.materials
            .iter()
            .map(|m| ItemStack::new(m.code.clone(), m.quantity.saturating_mul(count)))
            .collect()
    }
}

/// A gatherable resource node on the map.
#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct ResourceNode {
    pub code: String,
    pub skill: Skill,
    pub level: u32,
    #[serde(default)]
    pub drops: Vec<DropEntry>,
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct Monster {
    pub code: String,
    pub level: u32,
    pub hp: i32,
    #[serde(default)]
    pub drops: Vec<DropEntry>,
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct MapContent {
    #[serde(rename = "type")]
    pub kind: String,
    pub code: String,
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct MapTile {
    pub x: i32,
    pub y: i32,
    pub content: Option<MapContent>,
}

/// NPC vendor listing for one product.
#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct NpcListing {
    pub npc: String,
    pub item: String,
    pub price: u64,
}

/// Read-only queries over static game content.
///
/// Every method is cheap and infallible: a missing answer is `None` or
/// empty, never an error.
pub trait WorldKnowledge: Send + Sync {
    fn item(&self, code: &str) -> Option<&Item>;

    /// Recipe producing the given item, if it is craftable.
    fn recipe(&self, item: &str) -> Option<&Recipe>;

    /// All recipes trained by one skill.
    fn recipes_for_skill(&self, skill: Skill) -> Vec<&Recipe>;

    fn resource(&self, code: &str) -> Option<&ResourceNode>;

    /// All nodes gathered with one skill.
    fn resources_for_skill(&self, skill: Skill) -> Vec<&ResourceNode>;

    /// Resource node that drops the given item, if any.
    fn resource_dropping(&self, item: &str) -> Option<&ResourceNode>;

    fn monster(&self, code: &str) -> Option<&Monster>;

    /// Monster that drops the given item, if any.
    fn monster_dropping(&self, item: &str) -> Option<&Monster>;

    /// Highest-level monster at or below the given level.
    fn strongest_monster_at_most(&self, level: u32) -> Option<&Monster>;

    /// All candidate monsters ordered by descending level, for boss search.
    fn monsters_by_level_desc(&self) -> Vec<&Monster>;

    /// Maps carrying the given content. An empty `code` matches any content
    /// of the kind.
    fn maps_with_content(&self, kind: &str, code: &str) -> Vec<&MapTile>;

    /// Map with the given content nearest to `(x, y)` by Manhattan distance.
    /// Same empty-`code` wildcard as [`WorldKnowledge::maps_with_content`].
    fn nearest_map(&self, kind: &str, code: &str, x: i32, y: i32) -> Option<&MapTile>;

    /// Cheapest NPC listing selling the given item, if any.
    fn npc_selling(&self, item: &str) -> Option<&NpcListing>;

    /// Material-chain resolver: the single next actionable goal toward
    /// obtaining `target`, given bank stock, skill levels, and free
    /// inventory space. `None` when the chain is unresolvable.
    fn resolve_material_chain(
        &self,
        target: &str,
        bank: &[ItemStack],
        skills: &BTreeMap<Skill, u32>,
        free_space: u32,
    ) -> Option<Goal>;

    /// Whether the given task can plausibly be finished with these skill
    /// levels (skill requirements met, materials obtainable).
    fn task_achievable(&self, task: &TaskState, skills: &BTreeMap<Skill, u32>) -> bool;
}

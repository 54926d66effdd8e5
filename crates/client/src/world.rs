//! Static world content loaded from JSON dumps.
//!
//! The dumps are plain arrays fetched once from the game API and kept on
//! disk: `items.json` (with embedded craft recipes), `resources.json`,
//! `monsters.json`, `maps.json`, `npc_items.json`. Content never changes
//! during a session, so everything is indexed up front.

use std::collections::{BTreeMap, HashMap};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;

use caravan_core::{
    Goal, Item, ItemStack, MapTile, Monster, NpcListing, Recipe, RecipeMaterial, ResourceNode,
    Skill, TaskKind, TaskState, WorldKnowledge,
};

/// Material recursion ceiling; matches the planner's.
const MAX_MATERIAL_DEPTH: u32 = 10;

/// Level headroom accepted when judging a monster task achievable.
const TASK_MONSTER_HEADROOM: u32 = 5;

/// Item dump entry: the item itself plus its optional craft recipe.
#[derive(Deserialize)]
struct ItemDump {
    #[serde(flatten)]
    item: Item,
    craft: Option<CraftDump>,
}

#[derive(Deserialize)]
struct CraftDump {
    skill: Skill,
    level: u32,
    items: Vec<RecipeMaterial>,
}

pub struct StaticWorld {
    items: HashMap<String, Item>,
    recipes: HashMap<String, Recipe>,
    resources: Vec<ResourceNode>,
    monsters: Vec<Monster>,
    maps: Vec<MapTile>,
    npc_items: Vec<NpcListing>,
}

impl StaticWorld {
    pub fn load(dir: &Path) -> Result<Self> {
        let dumps: Vec<ItemDump> = read_json(&dir.join("items.json"))?;
        let mut items = HashMap::new();
        let mut recipes = HashMap::new();
        for dump in dumps {
            if let Some(craft) = dump.craft {
                recipes.insert(
                    dump.item.code.clone(),
                    Recipe {
                        item: dump.item.code.clone(),
                        skill: craft.skill,
                        level: craft.level,
                        materials: craft.items,
                    },
                );
            }
            items.insert(dump.item.code.clone(), dump.item);
        }

        Ok(Self {
            items,
            recipes,
            resources: read_json(&dir.join("resources.json"))?,
            monsters: read_json(&dir.join("monsters.json"))?,
            maps: read_json(&dir.join("maps.json"))?,
            npc_items: read_json(&dir.join("npc_items.json"))?,
        })
    }

    /// One step of the material chain, depth-guarded against recipe cycles.
    fn resolve_step(
        &self,
        target: &str,
        bank: &[ItemStack],
        skills: &BTreeMap<Skill, u32>,
        free_space: u32,
        depth: u32,
    ) -> Option<Goal> {
        if depth >= MAX_MATERIAL_DEPTH {
            return None;
        }

        if let Some(recipe) = self.recipes.get(target) {
            if skills.get(&recipe.skill).copied().unwrap_or(1) >= recipe.level {
                for material in &recipe.materials {
                    let banked: u32 = bank
                        .iter()
                        .filter(|s| s.code == material.code)
                        .map(|s| s.quantity)
                        .sum();
                    if banked < material.quantity {
                        return self.resolve_step(
                            &material.code,
                            bank,
                            skills,
                            free_space,
                            depth + 1,
                        );
                    }
                }
                return Some(Goal::Craft {
                    item: target.to_string(),
                    quantity: 1,
                });
            }
        }

        if let Some(node) = self.resource_dropping(target) {
            if skills.get(&node.skill).copied().unwrap_or(1) >= node.level {
                return Some(Goal::Gather {
                    resource: node.code.clone(),
                });
            }
        }

        if let Some(monster) = self.monster_dropping(target) {
            return Some(Goal::Fight {
                monster: monster.code.clone(),
                party: None,
            });
        }

        if let Some(listing) = self.npc_selling(target) {
            return Some(Goal::BuyNpc {
                npc: listing.npc.clone(),
                item: target.to_string(),
                quantity: free_space.max(1).min(10),
            });
        }

        None
    }
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T> {
    let file =
        File::open(path).with_context(|| format!("opening world dump {}", path.display()))?;
    serde_json::from_reader(BufReader::new(file))
        .with_context(|| format!("decoding world dump {}", path.display()))
}

impl WorldKnowledge for StaticWorld {
    fn item(&self, code: &str) -> Option<&Item> {
        self.items.get(code)
    }

    fn recipe(&self, item: &str) -> Option<&Recipe> {
        self.recipes.get(item)
    }

    fn recipes_for_skill(&self, skill: Skill) -> Vec<&Recipe> {
        self.recipes.values().filter(|r| r.skill == skill).collect()
    }

    fn resource(&self, code: &str) -> Option<&ResourceNode> {
        self.resources.iter().find(|r| r.code == code)
    }

    fn resources_for_skill(&self, skill: Skill) -> Vec<&ResourceNode> {
        self.resources.iter().filter(|r| r.skill == skill).collect()
    }

    fn resource_dropping(&self, item: &str) -> Option<&ResourceNode> {
        self.resources
            .iter()
            .find(|r| r.drops.iter().any(|d| d.code == item))
    }

    fn monster(&self, code: &str) -> Option<&Monster> {
        self.monsters.iter().find(|m| m.code == code)
    }

    fn monster_dropping(&self, item: &str) -> Option<&Monster> {
        self.monsters
            .iter()
            .find(|m| m.drops.iter().any(|d| d.code == item))
    }

    fn strongest_monster_at_most(&self, level: u32) -> Option<&Monster> {
        self.monsters
            .iter()
            .filter(|m| m.level <= level)
            .max_by_key(|m| m.level)
    }

    fn monsters_by_level_desc(&self) -> Vec<&Monster> {
        let mut all: Vec<&Monster> = self.monsters.iter().collect();
        all.sort_by(|a, b| b.level.cmp(&a.level));
        all
    }

    fn maps_with_content(&self, kind: &str, code: &str) -> Vec<&MapTile> {
        self.maps
            .iter()
            .filter(|t| {
                t.content
                    .as_ref()
                    .is_some_and(|c| c.kind == kind && (code.is_empty() || c.code == code))
            })
            .collect()
    }

    fn nearest_map(&self, kind: &str, code: &str, x: i32, y: i32) -> Option<&MapTile> {
        self.maps_with_content(kind, code)
            .into_iter()
            .min_by_key(|t| (t.x - x).abs() + (t.y - y).abs())
    }

    fn npc_selling(&self, item: &str) -> Option<&NpcListing> {
        self.npc_items
            .iter()
            .filter(|l| l.item == item)
            .min_by_key(|l| l.price)
    }

    fn resolve_material_chain(
        &self,
        target: &str,
        bank: &[ItemStack],
        skills: &BTreeMap<Skill, u32>,
        free_space: u32,
    ) -> Option<Goal> {
        self.resolve_step(target, bank, skills, free_space, 0)
    }

    fn task_achievable(&self, task: &TaskState, skills: &BTreeMap<Skill, u32>) -> bool {
        match task.kind {
            TaskKind::Monsters => {
                let combat = skills.get(&Skill::Combat).copied().unwrap_or(1);
                self.monster(&task.code)
                    .is_some_and(|m| m.level <= combat + TASK_MONSTER_HEADROOM)
            }
            TaskKind::Items => self
                .resolve_material_chain(&task.code, &[], skills, 1)
                .is_some(),
        }
    }
}

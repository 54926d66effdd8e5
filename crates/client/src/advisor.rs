//! Gear selection: best available item per slot for the next activity.

use std::sync::Arc;

use strum::IntoEnumIterator;

use caravan_core::{
    Activity, CharacterState, EquipSlot, EquipmentAdvisor, GearSwap, Item, ItemStack,
    WorldKnowledge,
};

/// Scores bank and equipped gear per slot: total attack output for combat,
/// the matching skill bonus for gathering. Only strictly better items
/// produce a swap.
pub struct BestAvailableAdvisor {
    world: Arc<dyn WorldKnowledge>,
}

impl BestAvailableAdvisor {
    pub fn new(world: Arc<dyn WorldKnowledge>) -> Self {
        Self { world }
    }

    fn score(&self, item: &Item, activity: Activity) -> i64 {
        match activity {
            Activity::Combat => item
                .effects
                .iter()
                .filter(|e| e.code.starts_with("attack_") || e.code == "hp")
                .map(|e| i64::from(e.value))
                .sum(),
            Activity::Gathering(skill) => {
                let skill = skill.to_string();
                item.effects
                    .iter()
                    .filter(|e| e.code == skill)
                    // Gathering bonuses are cooldown reductions, stored
                    // negative; magnitude is what matters.
                    .map(|e| i64::from(e.value).abs())
                    .sum()
            }
        }
    }

    fn best_for_slot(
        &self,
        state: &CharacterState,
        bank: &[ItemStack],
        slot: EquipSlot,
        activity: Activity,
    ) -> Option<GearSwap> {
        let current = state.equipment.get(&slot);
        let current_score = current
            .and_then(|code| self.world.item(code))
            .map(|item| self.score(item, activity))
            .unwrap_or(0);

        let candidates = bank
            .iter()
            .filter(|stack| stack.quantity > 0)
            .chain(state.inventory.iter().filter(|stack| stack.quantity > 0));
        let best = candidates
            .filter_map(|stack| self.world.item(&stack.code))
            .filter(|item| item.slot == Some(slot) && item.level <= state.level)
            .max_by_key(|item| self.score(item, activity))?;

        if self.score(best, activity) <= current_score {
            return None;
        }
        if current.is_some_and(|code| *code == best.code) {
            return None;
        }
        Some(GearSwap {
            slot,
            unequip: current.cloned(),
            equip: best.code.clone(),
        })
    }
}

impl EquipmentAdvisor for BestAvailableAdvisor {
    fn plan_swaps(
        &self,
        state: &CharacterState,
        bank: &[ItemStack],
        activity: Activity,
    ) -> Vec<GearSwap> {
        let slots: Vec<EquipSlot> = match activity {
            Activity::Combat => EquipSlot::iter().collect(),
            // Gathering only cares about the tool in hand.
            Activity::Gathering(_) => vec![EquipSlot::Weapon],
        };
        slots
            .into_iter()
            .filter_map(|slot| self.best_for_slot(state, bank, slot, activity))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::collections::BTreeMap;

    use caravan_core::{
        Goal, ItemEffect, MapTile, Monster, NpcListing, Recipe, ResourceNode, Skill, TaskState,
    };

    struct GearWorld {
        items: Vec<Item>,
    }

    impl WorldKnowledge for GearWorld {
        fn item(&self, code: &str) -> Option<&Item> {
            self.items.iter().find(|i| i.code == code)
        }
        fn recipe(&self, _item: &str) -> Option<&Recipe> {
            None
        }
        fn recipes_for_skill(&self, _skill: Skill) -> Vec<&Recipe> {
            Vec::new()
        }
        fn resource(&self, _code: &str) -> Option<&ResourceNode> {
            None
        }
        fn resources_for_skill(&self, _skill: Skill) -> Vec<&ResourceNode> {
            Vec::new()
        }
        fn resource_dropping(&self, _item: &str) -> Option<&ResourceNode> {
            None
        }
        fn monster(&self, _code: &str) -> Option<&Monster> {
            None
        }
        fn monster_dropping(&self, _item: &str) -> Option<&Monster> {
            None
        }
        fn strongest_monster_at_most(&self, _level: u32) -> Option<&Monster> {
            None
        }
        fn monsters_by_level_desc(&self) -> Vec<&Monster> {
            Vec::new()
        }
        fn maps_with_content(&self, _kind: &str, _code: &str) -> Vec<&MapTile> {
            Vec::new()
        }
        fn nearest_map(&self, _kind: &str, _code: &str, _x: i32, _y: i32) -> Option<&MapTile> {
            None
        }
        fn npc_selling(&self, _item: &str) -> Option<&NpcListing> {
            None
        }
        fn resolve_material_chain(
            &self,
            _target: &str,
            _bank: &[ItemStack],
            _skills: &BTreeMap<Skill, u32>,
            _free_space: u32,
        ) -> Option<Goal> {
            None
        }
        fn task_achievable(&self, _task: &TaskState, _skills: &BTreeMap<Skill, u32>) -> bool {
            false
        }
    }

    fn weapon(code: &str, level: u32, effects: Vec<(&str, i32)>) -> Item {
        Item {
            code: code.into(),
            name: code.into(),
            level,
            slot: Some(EquipSlot::Weapon),
            effects: effects
                .into_iter()
                .map(|(code, value)| ItemEffect {
                    code: code.into(),
                    value,
                })
                .collect(),
        }
    }

    fn state() -> CharacterState {
        CharacterState {
            name: "alice".into(),
            x: 0,
            y: 0,
            hp: 100,
            max_hp: 100,
            level: 5,
            skills: BTreeMap::new(),
            equipment: BTreeMap::new(),
            inventory: Vec::new(),
            inventory_max_items: 100,
            task: None,
            gold: 0,
        }
    }

    #[test]
    fn stronger_banked_weapon_is_proposed_for_combat() {
        let world = Arc::new(GearWorld {
            items: vec![
                weapon("stick", 1, vec![("attack_air", 4)]),
                weapon("iron_sword", 3, vec![("attack_earth", 20)]),
            ],
        });
        let advisor = BestAvailableAdvisor::new(world);
        let mut state = state();
        state
            .equipment
            .insert(EquipSlot::Weapon, "stick".to_string());
        let bank = vec![ItemStack::new("iron_sword", 1)];

        let swaps = advisor.plan_swaps(&state, &bank, Activity::Combat);
        assert_eq!(swaps.len(), 1);
        assert_eq!(swaps[0].equip, "iron_sword");
        assert_eq!(swaps[0].unequip.as_deref(), Some("stick"));
    }

    #[test]
    fn over_leveled_gear_is_not_proposed() {
        let world = Arc::new(GearWorld {
            items: vec![weapon("dragon_blade", 30, vec![("attack_fire", 90)])],
        });
        let advisor = BestAvailableAdvisor::new(world);
        let bank = vec![ItemStack::new("dragon_blade", 1)];

        let swaps = advisor.plan_swaps(&state(), &bank, Activity::Combat);
        assert!(swaps.is_empty());
    }

    #[test]
    fn gathering_prefers_the_matching_tool() {
        let world = Arc::new(GearWorld {
            items: vec![
                weapon("iron_sword", 3, vec![("attack_earth", 20)]),
                weapon("iron_pickaxe", 3, vec![("mining", -10)]),
            ],
        });
        let advisor = BestAvailableAdvisor::new(world);
        let bank = vec![
            ItemStack::new("iron_sword", 1),
            ItemStack::new("iron_pickaxe", 1),
        ];

        let swaps =
            advisor.plan_swaps(&state(), &bank, Activity::Gathering(Skill::Mining));
        assert_eq!(swaps.len(), 1);
        assert_eq!(swaps[0].equip, "iron_pickaxe");
        assert_eq!(swaps[0].unequip, None);
    }
}

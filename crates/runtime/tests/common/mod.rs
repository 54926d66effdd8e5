//! Shared fixtures: a small scripted world and an in-memory game API.

use std::collections::{BTreeMap, HashMap};
use std::sync::Mutex;

use async_trait::async_trait;

use caravan_core::{
    ApiError, ApiResult, CharacterState, EquipSlot, FightOutcome, GameApi, Goal, ItemStack,
    MapContent, MapTile, MarketOrder, Monster, NpcListing, Recipe, RecipeMaterial, ResourceNode,
    SimulationResult, Skill, TaskState, WorldKnowledge,
};

pub fn character(name: &str) -> CharacterState {
    CharacterState {
        name: name.into(),
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

/// Compact fixed world: one ore node, one monster, one smithing chain.
pub struct TestWorld {
    recipes: Vec<Recipe>,
    resources: Vec<ResourceNode>,
    monsters: Vec<Monster>,
    maps: Vec<MapTile>,
}

impl TestWorld {
    pub fn new() -> Self {
        let recipes = vec![Recipe {
            item: "copper_dagger".into(),
            skill: Skill::Weaponcrafting,
            level: 1,
            materials: vec![RecipeMaterial {
                code: "copper_ore".into(),
                quantity: 10,
            }],
        }];
        let resources = vec![ResourceNode {
            code: "copper_rocks".into(),
            skill: Skill::Mining,
            level: 1,
            drops: vec![],
        }];
        let monsters = vec![Monster {
            code: "chicken".into(),
            level: 1,
            hp: 60,
            drops: vec![],
        }];
        let maps = vec![
            tile(2, 0, "resource", "copper_rocks"),
            tile(4, 0, "monster", "chicken"),
            tile(0, 1, "bank", "bank"),
            tile(1, 1, "workshop", "weaponcrafting"),
            tile(3, 1, "tasks_master", "monsters"),
            tile(5, 1, "grand_exchange", "grand_exchange"),
        ];
        Self {
            recipes,
            resources,
            monsters,
            maps,
        }
    }
}

fn tile(x: i32, y: i32, kind: &str, code: &str) -> MapTile {
    MapTile {
        x,
        y,
        content: Some(MapContent {
            kind: kind.into(),
            code: code.into(),
        }),
    }
}

impl WorldKnowledge for TestWorld {
    fn item(&self, _code: &str) -> Option<&caravan_core::Item> {
        None
    }

    fn recipe(&self, item: &str) -> Option<&Recipe> {
        self.recipes.iter().find(|r| r.item == item)
    }

    fn recipes_for_skill(&self, skill: Skill) -> Vec<&Recipe> {
        self.recipes.iter().filter(|r| r.skill == skill).collect()
    }

    fn resource(&self, code: &str) -> Option<&ResourceNode> {
        self.resources.iter().find(|r| r.code == code)
    }

    fn resources_for_skill(&self, skill: Skill) -> Vec<&ResourceNode> {
        self.resources.iter().filter(|r| r.skill == skill).collect()
    }

    fn resource_dropping(&self, item: &str) -> Option<&ResourceNode> {
        // Ore nodes drop their own code in this fixture.
        self.resources.iter().find(|r| {
            r.code == item || (item == "copper_ore" && r.code == "copper_rocks")
        })
    }

    fn monster(&self, code: &str) -> Option<&Monster> {
        self.monsters.iter().find(|m| m.code == code)
    }

    fn monster_dropping(&self, _item: &str) -> Option<&Monster> {
        None
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
        true
    }
}

/// In-memory game API. Every action mutates a held character snapshot the
/// way the real server would, and records itself in `calls`.
pub struct MockApi {
    pub characters: Mutex<HashMap<String, CharacterState>>,
    pub bank: Mutex<Vec<ItemStack>>,
    pub gold: Mutex<u64>,
    pub calls: Mutex<Vec<String>>,
    /// When set, gather actions fail with this status code.
    pub gather_failure: Mutex<Option<u16>>,
    /// When set to `(name, n)`, that character's nth cooldown wait never
    /// returns, freezing its loop at a tick boundary.
    pub freeze_at_cooldown: Mutex<Option<(String, u32)>>,
    cooldown_waits: Mutex<HashMap<String, u32>>,
}

impl MockApi {
    pub fn new(characters: Vec<CharacterState>) -> Self {
        Self {
            characters: Mutex::new(
                characters.into_iter().map(|c| (c.name.clone(), c)).collect(),
            ),
            bank: Mutex::new(Vec::new()),
            gold: Mutex::new(0),
            calls: Mutex::new(Vec::new()),
            gather_failure: Mutex::new(None),
            freeze_at_cooldown: Mutex::new(None),
            cooldown_waits: Mutex::new(HashMap::new()),
        }
    }

    pub fn call_count(&self, prefix: &str) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|c| c.starts_with(prefix))
            .count()
    }

    pub fn cooldown_waits(&self, name: &str) -> u32 {
        self.cooldown_waits
            .lock()
            .unwrap()
            .get(name)
            .copied()
            .unwrap_or(0)
    }

    fn record(&self, call: String) {
        self.calls.lock().unwrap().push(call);
    }

    fn with_character<F>(&self, name: &str, mutate: F) -> ApiResult<CharacterState>
    where
        F: FnOnce(&mut CharacterState),
    {
        let mut chars = self.characters.lock().unwrap();
        let state = chars.get_mut(name).ok_or_else(|| ApiError::Status {
            code: 404,
            message: format!("unknown character {name}"),
        })?;
        mutate(state);
        Ok(state.clone())
    }
}

fn add_to_stacks(stacks: &mut Vec<ItemStack>, code: &str, quantity: u32) {
    match stacks.iter_mut().find(|s| s.code == code) {
        Some(stack) => stack.quantity += quantity,
        None => stacks.push(ItemStack::new(code.to_string(), quantity)),
    }
}

fn take_from_stacks(stacks: &mut Vec<ItemStack>, code: &str, quantity: u32) -> bool {
    let Some(stack) = stacks.iter_mut().find(|s| s.code == code) else {
        return false;
    };
    if stack.quantity < quantity {
        return false;
    }
    stack.quantity -= quantity;
    stacks.retain(|s| s.quantity > 0);
    true
}

#[async_trait]
impl GameApi for MockApi {
    async fn get_character(&self, name: &str) -> ApiResult<CharacterState> {
        self.record(format!("get_character:{name}"));
        self.with_character(name, |_| {})
    }

    async fn wait_cooldown(&self, name: &str) -> ApiResult<()> {
        let freeze = {
            let mut waits = self.cooldown_waits.lock().unwrap();
            let count = waits.entry(name.to_string()).or_insert(0);
            *count += 1;
            let gate = self.freeze_at_cooldown.lock().unwrap();
            matches!(&*gate, Some((who, at)) if who == name && *count >= *at)
        };
        if freeze {
            std::future::pending::<()>().await;
        }
        Ok(())
    }

    async fn move_to(&self, name: &str, x: i32, y: i32) -> ApiResult<CharacterState> {
        self.record(format!("move:{name}:{x},{y}"));
        self.with_character(name, |c| {
            c.x = x;
            c.y = y;
        })
    }

    async fn fight(&self, name: &str) -> ApiResult<FightOutcome> {
        self.record(format!("fight:{name}"));
        let state = self.with_character(name, |c| {
            c.hp = (c.hp - 10).max(1);
        })?;
        Ok(FightOutcome {
            state,
            victory: true,
            drops: vec![],
            xp: 25,
            gold: 2,
        })
    }

    async fn gather(&self, name: &str) -> ApiResult<CharacterState> {
        self.record(format!("gather:{name}"));
        if let Some(code) = *self.gather_failure.lock().unwrap() {
            return Err(ApiError::Status {
                code,
                message: "scripted gather failure".into(),
            });
        }
        self.with_character(name, |c| {
            add_to_stacks(&mut c.inventory, "copper_ore", 1);
        })
    }

    async fn craft(&self, name: &str, item: &str, quantity: u32) -> ApiResult<CharacterState> {
        self.record(format!("craft:{name}:{item}x{quantity}"));
        self.with_character(name, |c| {
            add_to_stacks(&mut c.inventory, item, quantity);
        })
    }

    async fn rest(&self, name: &str) -> ApiResult<CharacterState> {
        self.record(format!("rest:{name}"));
        self.with_character(name, |c| c.hp = c.max_hp)
    }

    async fn equip(&self, name: &str, code: &str, slot: EquipSlot) -> ApiResult<CharacterState> {
        self.record(format!("equip:{name}:{code}"));
        self.with_character(name, |c| {
            take_from_stacks(&mut c.inventory, code, 1);
            c.equipment.insert(slot, code.to_string());
        })
    }

    async fn unequip(&self, name: &str, slot: EquipSlot) -> ApiResult<CharacterState> {
        self.record(format!("unequip:{name}:{slot}"));
        self.with_character(name, |c| {
            if let Some(code) = c.equipment.remove(&slot) {
                add_to_stacks(&mut c.inventory, &code, 1);
            }
        })
    }

    async fn deposit_item(
        &self,
        name: &str,
        code: &str,
        quantity: u32,
    ) -> ApiResult<CharacterState> {
        self.record(format!("deposit:{name}:{code}x{quantity}"));
        let state = self.with_character(name, |c| {
            take_from_stacks(&mut c.inventory, code, quantity);
        })?;
        add_to_stacks(&mut self.bank.lock().unwrap(), code, quantity);
        Ok(state)
    }

    async fn deposit_gold(&self, name: &str, quantity: u64) -> ApiResult<CharacterState> {
        self.record(format!("deposit_gold:{name}:{quantity}"));
        let state = self.with_character(name, |c| {
            c.gold = c.gold.saturating_sub(quantity);
        })?;
        *self.gold.lock().unwrap() += quantity;
        Ok(state)
    }

    async fn withdraw_item(
        &self,
        name: &str,
        code: &str,
        quantity: u32,
    ) -> ApiResult<CharacterState> {
        self.record(format!("withdraw:{name}:{code}x{quantity}"));
        if !take_from_stacks(&mut self.bank.lock().unwrap(), code, quantity) {
            return Err(ApiError::Status {
                code: 404,
                message: format!("bank lacks {quantity}x {code}"),
            });
        }
        self.with_character(name, |c| {
            add_to_stacks(&mut c.inventory, code, quantity);
        })
    }

    async fn bank_items(&self) -> ApiResult<Vec<ItemStack>> {
        Ok(self.bank.lock().unwrap().clone())
    }

    async fn bank_gold(&self) -> ApiResult<u64> {
        Ok(*self.gold.lock().unwrap())
    }

    async fn npc_buy(&self, name: &str, item: &str, quantity: u32) -> ApiResult<CharacterState> {
        self.record(format!("npc_buy:{name}:{item}x{quantity}"));
        self.with_character(name, |c| {
            add_to_stacks(&mut c.inventory, item, quantity);
        })
    }

    async fn exchange_buy(
        &self,
        name: &str,
        item: &str,
        _max_price: u64,
        quantity: u32,
    ) -> ApiResult<CharacterState> {
        self.record(format!("exchange_buy:{name}:{item}x{quantity}"));
        self.with_character(name, |c| {
            add_to_stacks(&mut c.inventory, item, quantity);
        })
    }

    async fn exchange_sell(
        &self,
        name: &str,
        item: &str,
        quantity: u32,
        _price: u64,
    ) -> ApiResult<CharacterState> {
        self.record(format!("exchange_sell:{name}:{item}x{quantity}"));
        self.with_character(name, |c| {
            take_from_stacks(&mut c.inventory, item, quantity);
        })
    }

    async fn exchange_orders(&self) -> ApiResult<Vec<MarketOrder>> {
        Ok(Vec::new())
    }

    async fn task_new(&self, name: &str) -> ApiResult<CharacterState> {
        self.record(format!("task_new:{name}"));
        self.with_character(name, |c| {
            c.task = Some(TaskState {
                code: "chicken".into(),
                kind: caravan_core::TaskKind::Monsters,
                progress: 0,
                total: 20,
            });
        })
    }

    async fn task_complete(&self, name: &str) -> ApiResult<CharacterState> {
        self.record(format!("task_complete:{name}"));
        self.with_character(name, |c| c.task = None)
    }

    async fn task_trade(&self, name: &str, code: &str, quantity: u32) -> ApiResult<CharacterState> {
        self.record(format!("task_trade:{name}:{code}x{quantity}"));
        self.with_character(name, |c| {
            take_from_stacks(&mut c.inventory, code, quantity);
            if let Some(task) = &mut c.task {
                task.progress += quantity;
            }
        })
    }

    async fn task_cancel(&self, name: &str) -> ApiResult<CharacterState> {
        self.record(format!("task_cancel:{name}"));
        self.with_character(name, |c| c.task = None)
    }

    async fn simulate_fight(
        &self,
        _state: &CharacterState,
        monster: &str,
    ) -> ApiResult<SimulationResult> {
        self.record(format!("simulate:{monster}"));
        Ok(SimulationResult {
            win_rate: 0.95,
            avg_final_hp: 40.0,
            avg_turns: 12.0,
        })
    }

    async fn simulate_party_fight(
        &self,
        _states: &[CharacterState],
        monster: &str,
    ) -> ApiResult<SimulationResult> {
        self.record(format!("simulate_party:{monster}"));
        Ok(SimulationResult {
            win_rate: 0.95,
            avg_final_hp: 60.0,
            avg_turns: 20.0,
        })
    }
}

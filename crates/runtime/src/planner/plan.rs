//! The team's active plan: target recipe, material graph, and progress.

use std::collections::{BTreeMap, HashMap, HashSet};

use caravan_core::{CharacterState, ItemStack, Skill, WorldKnowledge};
use tracing::debug;

use super::{
    CRAFT_BATCH, DEPOSIT_BATCH_THRESHOLD, MAX_MATERIAL_DEPTH, PipelineStage, bottleneck,
    build_pipeline_stages,
};

/// Where one needed material comes from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MaterialSource {
    Gather,
    Craft,
    MonsterDrop,
}

/// One node of the plan's material graph.
#[derive(Clone, Debug, PartialEq)]
pub struct MaterialNeed {
    pub code: String,
    pub quantity: u32,
    pub source: MaterialSource,
    /// Resource node, intermediate recipe item, or monster code.
    pub source_code: String,
}

/// Quantities banked and in flight per needed material. Both maps are
/// rebuilt from scratch on every update; in-flight is a snapshot of agent
/// inventories, never an accumulating counter.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct PlanProgress {
    pub banked: BTreeMap<String, u32>,
    pub in_flight: BTreeMap<String, u32>,
    pub crafted: u32,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PlanStatus {
    Active,
    Completed,
}

/// The one live plan shared by the whole team.
#[derive(Clone, Debug, PartialEq)]
pub struct ActivePlan {
    pub target_skill: Skill,
    /// Item produced by the plan's target recipe; combat plans have none.
    pub target_recipe: Option<String>,
    pub material_needs: Vec<MaterialNeed>,
    pub stages: Vec<PipelineStage>,
    pub progress: PlanProgress,
    pub status: PlanStatus,
}

fn team_max_level(characters: &[CharacterState], skill: Skill) -> u32 {
    characters
        .iter()
        .map(|c| c.skill_level(skill))
        .max()
        .unwrap_or(1)
}

/// Walk a recipe's material list, classifying each code as gatherable,
/// craftable (recursing into its own materials), or a monster drop.
/// Depth-limited and cycle-guarded; an unresolvable material is dropped
/// rather than treated as an error.
fn collect_needs(
    world: &dyn WorldKnowledge,
    item: &str,
    quantity: u32,
    depth: u32,
    visited: &mut HashSet<String>,
    needs: &mut Vec<MaterialNeed>,
) {
    if depth >= MAX_MATERIAL_DEPTH {
        debug!(target: "caravan::planner", item, "material walk hit depth limit");
        return;
    }
    let Some(recipe) = world.recipe(item) else {
        return;
    };
    for material in &recipe.materials {
        // Needs compound down the chain; saturate rather than wrap.
        let needed = material.quantity.saturating_mul(quantity);
        if !visited.insert(material.code.clone()) {
            continue;
        }
        if let Some(node) = world.resource_dropping(&material.code) {
            needs.push(MaterialNeed {
                code: material.code.clone(),
                quantity: needed,
                source: MaterialSource::Gather,
                source_code: node.code.clone(),
            });
        } else if world.recipe(&material.code).is_some() {
            needs.push(MaterialNeed {
                code: material.code.clone(),
                quantity: needed,
                source: MaterialSource::Craft,
                source_code: material.code.clone(),
            });
            collect_needs(world, &material.code, needed, depth + 1, visited, needs);
        } else if let Some(monster) = world.monster_dropping(&material.code) {
            needs.push(MaterialNeed {
                code: material.code.clone(),
                quantity: needed,
                source: MaterialSource::MonsterDrop,
                source_code: monster.code.clone(),
            });
        } else {
            debug!(
                target: "caravan::planner",
                material = %material.code,
                "material has no known source, skipping"
            );
        }
    }
}

/// Build a fresh plan targeting one skill, or `None` when the skill has no
/// reachable recipe (and is not combat).
pub fn build_active_plan(
    target: Skill,
    characters: &[CharacterState],
    bank: &[ItemStack],
    world: &dyn WorldKnowledge,
) -> Option<ActivePlan> {
    let max_level = team_max_level(characters, target);
    let stages = build_pipeline_stages(target, max_level, bank, world);

    if target == Skill::Combat {
        return Some(ActivePlan {
            target_skill: target,
            target_recipe: None,
            material_needs: Vec::new(),
            stages,
            progress: PlanProgress::default(),
            status: PlanStatus::Active,
        });
    }

    let recipe = world
        .recipes_for_skill(target)
        .into_iter()
        .filter(|r| r.level <= max_level)
        .max_by_key(|r| r.level)?;

    let mut needs = Vec::new();
    let mut visited = HashSet::new();
    collect_needs(world, &recipe.item, CRAFT_BATCH, 0, &mut visited, &mut needs);

    Some(ActivePlan {
        target_skill: target,
        target_recipe: Some(recipe.item.clone()),
        material_needs: needs,
        stages,
        progress: PlanProgress::default(),
        status: PlanStatus::Active,
    })
}

/// Recompute plan progress from the bank and every known agent inventory.
pub fn update_progress<'c>(
    plan: &mut ActivePlan,
    bank: &[ItemStack],
    characters: impl IntoIterator<Item = &'c CharacterState>,
) {
    let characters: Vec<&CharacterState> = characters.into_iter().collect();
    let mut banked = BTreeMap::new();
    let mut in_flight = BTreeMap::new();

    for need in &plan.material_needs {
        let bank_qty: u32 = bank
            .iter()
            .filter(|s| s.code == need.code)
            .map(|s| s.quantity)
            .sum();
        banked.insert(need.code.clone(), bank_qty);

        let carried: u32 = characters
            .iter()
            .map(|c| c.inventory_count(&need.code))
            .sum();
        in_flight.insert(need.code.clone(), carried);
    }

    plan.progress.banked = banked;
    plan.progress.in_flight = in_flight;
}

/// Whether the plan is obsolete: true once its target skill is no longer
/// tied for the team's lowest average. An empty team never completes a
/// plan.
pub fn should_complete(plan: &ActivePlan, characters: &[CharacterState]) -> bool {
    let ranking = bottleneck::team_bottleneck(characters);
    let Some(lowest) = ranking.first() else {
        return false;
    };
    match ranking.iter().find(|a| a.skill == plan.target_skill) {
        Some(target) => target.level > lowest.level,
        None => true,
    }
}

/// Whether this agent should detour to the bank for the plan's sake.
///
/// Triggers on a full batch of needed materials. It also triggers below
/// the batch threshold when a *different* agent's craft assignment is starved of
/// bank stock and this agent is personally carrying any of its inputs.
pub fn should_deposit(
    plan: &ActivePlan,
    agent: &str,
    state: &CharacterState,
    assignments: &HashMap<String, String>,
    bank: &[ItemStack],
    world: &dyn WorldKnowledge,
) -> bool {
    let carried_for_plan: u32 = plan
        .material_needs
        .iter()
        .map(|need| state.inventory_count(&need.code))
        .sum();
    if carried_for_plan >= DEPOSIT_BATCH_THRESHOLD {
        return true;
    }

    for (other, key) in assignments {
        if other == agent {
            continue;
        }
        let Some(item) = key.strip_prefix("craft:") else {
            continue;
        };
        let Some(recipe) = world.recipe(item) else {
            continue;
        };
        let starved = recipe.materials.iter().any(|m| {
            let banked: u32 = bank
                .iter()
                .filter(|s| s.code == m.code)
                .map(|s| s.quantity)
                .sum();
            banked < m.quantity
        });
        if !starved {
            continue;
        }
        let feeding = recipe
            .materials
            .iter()
            .any(|m| state.inventory_count(&m.code) > 0);
        if feeding {
            debug!(
                target: "caravan::planner",
                agent,
                crafter = %other,
                item,
                "courier deposit for starved crafter"
            );
            return true;
        }
    }

    false
}

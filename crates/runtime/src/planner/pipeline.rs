//! Pipeline stage expansion and stage assignment.

use std::collections::{HashMap, HashSet};

use caravan_core::{CharacterState, ItemStack, Skill, WorldKnowledge};

use super::{BANK_STOCK_MULTIPLIER, CRAFT_BATCH, PREVIOUS_STAGE_DISCOUNT};

/// One gather/craft/fight step toward training a skill.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PipelineStage {
    Gather { skill: Skill, resource: String },
    Craft { skill: Skill, item: String, quantity: u32 },
    Fight { monster: String },
}

impl PipelineStage {
    /// Assignment key recorded per agent; also the de-duplication key.
    pub fn key(&self) -> String {
        match self {
            PipelineStage::Gather { resource, .. } => format!("gather:{resource}"),
            PipelineStage::Craft { item, .. } => format!("craft:{item}"),
            PipelineStage::Fight { monster } => format!("fight:{monster}"),
        }
    }

    pub fn skill(&self) -> Skill {
        match self {
            PipelineStage::Gather { skill, .. } | PipelineStage::Craft { skill, .. } => *skill,
            PipelineStage::Fight { .. } => Skill::Combat,
        }
    }
}

fn bank_quantity(bank: &[ItemStack], code: &str) -> u32 {
    bank.iter()
        .filter(|s| s.code == code)
        .map(|s| s.quantity)
        .sum()
}

fn stocked(bank: &[ItemStack], code: &str, per_craft: u32) -> bool {
    bank_quantity(bank, code) >= per_craft * BANK_STOCK_MULTIPLIER
}

/// Best recipe for a skill reachable at `max_level`: the one with the
/// highest requirement not exceeding it.
fn best_recipe<'w>(
    world: &'w dyn WorldKnowledge,
    skill: Skill,
    max_level: u32,
) -> Option<&'w caravan_core::Recipe> {
    world
        .recipes_for_skill(skill)
        .into_iter()
        .filter(|r| r.level <= max_level)
        .max_by_key(|r| r.level)
}

/// Expand a target skill into an ordered list of production stages.
///
/// Combat becomes a single fight against the strongest beatable-by-level
/// monster. Gathering skills gather their refine recipe's raw input unless
/// the bank is already stocked. Crafting skills expand each under-stocked
/// material one level deep (gather, intermediate craft, or monster drop)
/// before the target craft itself. Stages are de-duplicated by key,
/// preserving first-seen order; an empty result means "nothing to do".
pub fn build_pipeline_stages(
    target: Skill,
    max_level: u32,
    bank: &[ItemStack],
    world: &dyn WorldKnowledge,
) -> Vec<PipelineStage> {
    let mut stages = Vec::new();

    match target {
        Skill::Combat => {
            if let Some(monster) = world.strongest_monster_at_most(max_level) {
                stages.push(PipelineStage::Fight {
                    monster: monster.code.clone(),
                });
            }
        }
        skill if skill.is_gathering() => {
            let Some(recipe) = best_recipe(world, skill, max_level) else {
                return stages;
            };
            let fully_stocked = recipe
                .materials
                .iter()
                .all(|m| stocked(bank, &m.code, m.quantity));
            if !fully_stocked {
                for material in &recipe.materials {
                    if stocked(bank, &material.code, material.quantity) {
                        continue;
                    }
                    if let Some(node) = world.resource_dropping(&material.code) {
                        stages.push(PipelineStage::Gather {
                            skill,
                            resource: node.code.clone(),
                        });
                    }
                }
            }
            stages.push(PipelineStage::Craft {
                skill,
                item: recipe.item.clone(),
                quantity: CRAFT_BATCH,
            });
        }
        skill => {
            let Some(recipe) = best_recipe(world, skill, max_level) else {
                return stages;
            };
            for material in &recipe.materials {
                if stocked(bank, &material.code, material.quantity) {
                    continue;
                }
                if let Some(node) = world.resource_dropping(&material.code) {
                    stages.push(PipelineStage::Gather {
                        skill: node.skill,
                        resource: node.code.clone(),
                    });
                } else if let Some(intermediate) = world.recipe(&material.code) {
                    // One level of intermediate expansion: gather its own
                    // under-stocked inputs, then craft it.
                    for input in &intermediate.materials {
                        if stocked(bank, &input.code, input.quantity) {
                            continue;
                        }
                        if let Some(node) = world.resource_dropping(&input.code) {
                            stages.push(PipelineStage::Gather {
                                skill: node.skill,
                                resource: node.code.clone(),
                            });
                        }
                    }
                    stages.push(PipelineStage::Craft {
                        skill: intermediate.skill,
                        item: intermediate.item.clone(),
                        quantity: CRAFT_BATCH,
                    });
                } else if let Some(monster) = world.monster_dropping(&material.code) {
                    stages.push(PipelineStage::Fight {
                        monster: monster.code.clone(),
                    });
                }
            }
            // Cheap signal that the chain is worth finishing now: at least
            // one recipe's worth of some material already banked.
            let worth_crafting = recipe
                .materials
                .iter()
                .any(|m| bank_quantity(bank, &m.code) >= m.quantity);
            if worth_crafting {
                stages.push(PipelineStage::Craft {
                    skill,
                    item: recipe.item.clone(),
                    quantity: CRAFT_BATCH,
                });
            }
        }
    }

    dedup_by_key(stages)
}

fn dedup_by_key(stages: Vec<PipelineStage>) -> Vec<PipelineStage> {
    let mut seen = HashSet::new();
    stages
        .into_iter()
        .filter(|stage| seen.insert(stage.key()))
        .collect()
}

/// Pick the stage where this agent helps most: lowest score wins, where
/// score is the agent's level at the stage's skill plus 3 per other agent
/// already assigned there, discounted 30% when the stage matches the
/// agent's previous assignment. Ties keep first-declared stage order.
/// Returns `None` when there are no stages (caller idles).
pub fn assign_to_stage<'s>(
    name: &str,
    state: &CharacterState,
    stages: &'s [PipelineStage],
    assignments: &HashMap<String, String>,
    previous: Option<&str>,
) -> Option<&'s PipelineStage> {
    let mut best: Option<(f64, &PipelineStage)> = None;

    for stage in stages {
        let key = stage.key();
        let others = assignments
            .iter()
            .filter(|(agent, assigned)| agent.as_str() != name && **assigned == key)
            .count();
        let mut score = state.skill_level(stage.skill()) as f64 + 3.0 * others as f64;
        if previous == Some(key.as_str()) {
            score *= PREVIOUS_STAGE_DISCOUNT;
        }
        // Strict comparison keeps the earliest stage on ties.
        if best.map(|(s, _)| score < s).unwrap_or(true) {
            best = Some((score, stage));
        }
    }

    best.map(|(_, stage)| stage)
}

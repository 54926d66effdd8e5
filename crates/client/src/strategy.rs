//! Solo training strategy, used when pipeline coordination stands down.

use std::sync::Arc;

use async_trait::async_trait;
use strum::IntoEnumIterator;

use caravan_core::{BoardSnapshot, CharacterState, Goal, Skill, Strategy, WorldKnowledge};

/// Trains whichever of the character's own skills is lowest: the weakest
/// gathering skill on its best accessible node, or combat on the strongest
/// beatable monster when gathering is ahead.
pub struct TrainingStrategy {
    world: Arc<dyn WorldKnowledge>,
}

impl TrainingStrategy {
    pub fn new(world: Arc<dyn WorldKnowledge>) -> Self {
        Self { world }
    }

    fn best_node_for(&self, state: &CharacterState, skill: Skill) -> Option<String> {
        let level = state.skill_level(skill);
        self.world
            .resources_for_skill(skill)
            .into_iter()
            .filter(|node| node.level <= level)
            .max_by_key(|node| node.level)
            .map(|node| node.code.clone())
    }
}

#[async_trait]
impl Strategy for TrainingStrategy {
    async fn decide(&self, _name: &str, state: &CharacterState, _board: &BoardSnapshot) -> Goal {
        let mut trainable: Vec<Skill> = Skill::iter()
            .filter(|s| s.is_gathering() || *s == Skill::Combat)
            .collect();
        trainable.sort_by_key(|s| state.skill_level(*s));

        for skill in trainable {
            if skill == Skill::Combat {
                if let Some(monster) = self
                    .world
                    .strongest_monster_at_most(state.skill_level(Skill::Combat))
                {
                    return Goal::Fight {
                        monster: monster.code.clone(),
                        party: None,
                    };
                }
            } else if let Some(resource) = self.best_node_for(state, skill) {
                return Goal::Gather { resource };
            }
        }

        Goal::idle("no trainable skill has an accessible target")
    }
}

//! Team bottleneck ranking.

use caravan_core::{CharacterState, Skill};
use strum::IntoEnumIterator;

/// Rounded team-average level for one skill.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SkillAverage {
    pub skill: Skill,
    pub level: u32,
}

/// Rank all nine skills by rounded team-average level, ascending. Ties keep
/// skill-declaration order; the head of the list is the training priority.
/// An empty team yields an empty ranking.
pub fn team_bottleneck(characters: &[CharacterState]) -> Vec<SkillAverage> {
    if characters.is_empty() {
        return Vec::new();
    }

    let mut averages: Vec<SkillAverage> = Skill::iter()
        .map(|skill| {
            let sum: u32 = characters.iter().map(|c| c.skill_level(skill)).sum();
            let level = (sum as f64 / characters.len() as f64).round() as u32;
            SkillAverage { skill, level }
        })
        .collect();

    // Stable sort preserves declaration order among ties.
    averages.sort_by_key(|a| a.level);
    averages
}

//! Memoizing wrapper over the fight-simulation endpoint.
//!
//! Simulation calls are expensive and rate-limited, so results are cached
//! by an exact key over the character's level and full equipment loadout
//! plus the opponent. A build change produces a different key, which is the
//! whole invalidation story; entries never expire. One simulator is shared
//! process-wide.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{debug, warn};

use caravan_core::{CharacterState, GameApi, Monster, SimulationResult, WorldKnowledge};

/// Minimum simulated win rate before a fight is considered safe.
pub const WIN_RATE_THRESHOLD: f64 = 0.9;

/// Heuristic bonus per party member beyond the first, used only when the
/// simulation endpoint fails.
const PARTY_MEMBER_BONUS: f64 = 0.05;

/// Cap for the heuristic estimate; a guess is never near-certain.
const HEURISTIC_CAP: f64 = 0.98;

pub struct FightSimulator {
    api: Arc<dyn GameApi>,
    cache: Mutex<HashMap<String, Arc<SimulationResult>>>,
    threshold: f64,
}

impl FightSimulator {
    pub fn new(api: Arc<dyn GameApi>) -> Self {
        Self {
            api,
            cache: Mutex::new(HashMap::new()),
            threshold: WIN_RATE_THRESHOLD,
        }
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    /// Exact-match cache key: level, every equipped slot, opponent.
    fn cache_key(state: &CharacterState, monster: &str) -> String {
        let mut key = format!("lvl={}", state.level);
        for (slot, code) in &state.equipment {
            key.push_str(&format!("|{slot}={code}"));
        }
        key.push_str(&format!("|vs={monster}"));
        key
    }

    /// Simulate one character against one monster, memoized. The same build
    /// and opponent return the identical cached result object.
    pub async fn simulate(
        &self,
        state: &CharacterState,
        monster: &str,
    ) -> caravan_core::ApiResult<Arc<SimulationResult>> {
        let key = Self::cache_key(state, monster);
        if let Some(hit) = self.cache.lock().await.get(&key) {
            return Ok(Arc::clone(hit));
        }

        let result = Arc::new(self.api.simulate_fight(state, monster).await?);
        debug!(
            target: "caravan::simulator",
            monster,
            win_rate = result.win_rate,
            "simulation cached"
        );
        self.cache
            .lock()
            .await
            .insert(key, Arc::clone(&result));
        Ok(result)
    }

    /// First monster, by descending level, this character can beat at the
    /// safety threshold. A failing simulation skips that candidate; no
    /// beatable monster is `None`, never an error.
    pub async fn find_best_monster(
        &self,
        state: &CharacterState,
        world: &dyn WorldKnowledge,
    ) -> Option<String> {
        for monster in world.monsters_by_level_desc() {
            match self.simulate(state, &monster.code).await {
                Ok(result) if result.win_rate >= self.threshold => {
                    return Some(monster.code.clone());
                }
                Ok(_) => {}
                Err(error) => {
                    warn!(
                        target: "caravan::simulator",
                        monster = %monster.code,
                        %error,
                        "simulation failed, skipping candidate"
                    );
                }
            }
        }
        None
    }

    /// Simulate a party against a monster. Endpoint failure degrades to a
    /// closed-form estimate instead of propagating.
    pub async fn simulate_party(
        &self,
        states: &[CharacterState],
        monster: &Monster,
    ) -> Arc<SimulationResult> {
        match self.api.simulate_party_fight(states, &monster.code).await {
            Ok(result) => Arc::new(result),
            Err(error) => {
                warn!(
                    target: "caravan::simulator",
                    monster = %monster.code,
                    %error,
                    "party simulation failed, using heuristic estimate"
                );
                Arc::new(SimulationResult {
                    win_rate: heuristic_party_win_rate(states, monster.level),
                    avg_final_hp: 0.0,
                    avg_turns: 0.0,
                })
            }
        }
    }

    /// Strongest monster, by descending level, the party can beat at the
    /// safety threshold.
    pub async fn find_best_boss(
        &self,
        states: &[CharacterState],
        world: &dyn WorldKnowledge,
    ) -> Option<String> {
        for monster in world.monsters_by_level_desc() {
            let result = self.simulate_party(states, monster).await;
            if result.win_rate >= self.threshold {
                return Some(monster.code.clone());
            }
        }
        None
    }
}

/// Average party level against monster level, with a small bonus per extra
/// member, capped well below certainty.
fn heuristic_party_win_rate(states: &[CharacterState], monster_level: u32) -> f64 {
    if states.is_empty() {
        return 0.0;
    }
    let avg_level: f64 =
        states.iter().map(|s| s.level as f64).sum::<f64>() / states.len() as f64;
    let base = (avg_level / monster_level.max(1) as f64).min(1.0);
    let extras = states.len().saturating_sub(1) as f64;
    (base * (1.0 + PARTY_MEMBER_BONUS * extras)).min(HEURISTIC_CAP)
}

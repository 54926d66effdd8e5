//! Team coordinator: one goal per agent per tick, without duplicated effort.
//!
//! Every `next_goal` call is a single critical section over the shared
//! coordination state: the reservation rebuild, plan lifecycle, and
//! assignment bookkeeping all happen under one lock, which is what makes
//! the clear-then-re-reserve sequence safe across concurrent agents. The
//! only genuinely asynchronous work, the boss-party search, runs as a
//! fire-and-forget task that delivers into a single-slot cell consumed on a
//! later call; stale results are discarded.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tokio::sync::Mutex;
use tracing::{debug, info};

use caravan_core::{
    BoardSnapshot, CharacterBoardState, CharacterState, Goal, Skill, SkillProgress, Strategy,
    WorldKnowledge,
};

use crate::board::Board;
use crate::ledger::ReservationLedger;
use crate::planner::{
    self, ActivePlan, PipelineStage, assign_to_stage, build_active_plan, team_bottleneck,
};
use crate::simulator::FightSimulator;

/// How long a reservation may outlive its last refresh before it is
/// considered abandoned.
const RESERVATION_TIMEOUT: Duration = Duration::from_secs(300);

#[derive(Clone, Debug)]
pub struct CoordinatorConfig {
    /// Known team member names. Pipeline coordination needs a known team;
    /// empty means "strategy only".
    pub team: Vec<String>,
    pub pipeline_enabled: bool,
    pub reservation_timeout: Duration,
    /// Members recruited into a boss party.
    pub party_size: usize,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            team: Vec::new(),
            pipeline_enabled: true,
            reservation_timeout: RESERVATION_TIMEOUT,
            party_size: 3,
        }
    }
}

/// An installed boss party; members receive this fight verbatim until the
/// party dissolves.
#[derive(Clone, Debug, PartialEq)]
struct PartyFight {
    monster: String,
    members: Vec<String>,
}

/// Result of one background boss search, waiting in the single-slot cell.
struct PartyOutcome {
    members: Vec<String>,
    monster: Option<String>,
}

/// Everything mutated inside the per-call critical section.
struct CoordState {
    ledger: ReservationLedger,
    plan: Option<ActivePlan>,
    /// Pipeline stage key per agent; persists across ticks to dampen thrash.
    stage_assignments: HashMap<String, String>,
    /// Current goal per agent, for anti-duplication and introspection.
    assignments: HashMap<String, Goal>,
    /// Full snapshots from prior calls, preferred over board stand-ins.
    full_states: HashMap<String, CharacterState>,
    party: Option<PartyFight>,
}

pub struct Coordinator {
    board: Arc<Board>,
    world: Arc<dyn WorldKnowledge>,
    strategy: Arc<dyn Strategy>,
    simulator: Option<Arc<FightSimulator>>,
    config: CoordinatorConfig,
    state: Mutex<CoordState>,
    /// Latest-result cell for the boss search; written by the spawned task,
    /// consumed opportunistically under the state lock.
    party_slot: Arc<std::sync::Mutex<Option<PartyOutcome>>>,
    party_search_in_flight: Arc<AtomicBool>,
}

impl Coordinator {
    pub fn new(
        board: Arc<Board>,
        world: Arc<dyn WorldKnowledge>,
        strategy: Arc<dyn Strategy>,
        simulator: Option<Arc<FightSimulator>>,
        config: CoordinatorConfig,
    ) -> Self {
        let ledger = ReservationLedger::new(config.reservation_timeout);
        Self {
            board,
            world,
            strategy,
            simulator,
            config,
            state: Mutex::new(CoordState {
                ledger,
                plan: None,
                stage_assignments: HashMap::new(),
                assignments: HashMap::new(),
                full_states: HashMap::new(),
                party: None,
            }),
            party_slot: Arc::new(std::sync::Mutex::new(None)),
            party_search_in_flight: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Decide a goal for one agent. Atomic with respect to every other
    /// agent's call: reservations cleared here cannot be raced before they
    /// are rebuilt below.
    pub async fn next_goal(&self, name: &str, state: &CharacterState) -> Goal {
        let board = self.board.snapshot().await;
        let mut st = self.state.lock().await;

        st.ledger.expire_stale();
        st.ledger.clear(name);
        st.full_states.insert(name.to_string(), state.clone());

        // Adjusted snapshot: other agents' reservations subtracted from the
        // bank before any planning sees it.
        let mut adjusted = board;
        adjusted.bank.items = st.ledger.available(&adjusted.bank.items);

        let pipeline_ready = self.config.pipeline_enabled && !self.config.team.is_empty();
        let (goal, reason) = if pipeline_ready {
            match self.pipeline_goal(&mut st, name, state, &adjusted) {
                Some(decision) => decision,
                None => self.fallback_goal(&mut st, name, state, &adjusted).await,
            }
        } else {
            self.fallback_goal(&mut st, name, state, &adjusted).await
        };

        // Crafting claims its exact material requirement so a second agent
        // cannot plan against the same bank stock.
        if let Goal::Craft { item, quantity } = &goal {
            if let Some(recipe) = self.world.recipe(item) {
                st.ledger.reserve(name, recipe.materials_for(*quantity));
            }
        }

        st.assignments.insert(name.to_string(), goal.clone());
        info!(
            target: "caravan::coordinator",
            agent = name,
            goal = ?goal,
            reason,
            "goal assigned"
        );
        goal
    }

    /// Pipeline path. `None` falls through to the raw strategy.
    fn pipeline_goal(
        &self,
        st: &mut CoordState,
        name: &str,
        state: &CharacterState,
        board: &BoardSnapshot,
    ) -> Option<(Goal, &'static str)> {
        let team = self.team_view(st, name, state, board);
        if team.is_empty() {
            return None;
        }

        // Plan lifecycle: create when absent, replace once the bottleneck
        // has shifted away from the current target.
        let replace = match &st.plan {
            None => true,
            Some(plan) => planner::should_complete(plan, &team),
        };
        if replace {
            let target = team_bottleneck(&team).first()?.skill;
            st.plan = build_active_plan(target, &team, &board.bank.items, self.world.as_ref());
            if st.plan.as_ref().map(|p| p.target_skill) != Some(Skill::Combat) {
                st.party = None;
            }
            debug!(
                target: "caravan::coordinator",
                target_skill = %target,
                built = st.plan.is_some(),
                "plan rebuilt"
            );
        }

        if st.plan.is_none() {
            return None;
        }

        // An active party's fight goes out verbatim to its members.
        if let Some(goal) = self.party_goal(st, name) {
            return Some((goal, "active party fight"));
        }

        if st.plan.as_ref().map(|p| p.target_skill) == Some(Skill::Combat) {
            self.consume_party_outcome(st);
            if let Some(goal) = self.party_goal(st, name) {
                return Some((goal, "party formed"));
            }
            self.maybe_spawn_party_search(st, &team);
        }

        let CoordState {
            plan,
            stage_assignments,
            ..
        } = st;
        let plan = plan.as_mut()?;

        planner::update_progress(plan, &board.bank.items, team.iter());

        if planner::should_deposit(
            plan,
            name,
            state,
            stage_assignments,
            &board.bank.items,
            self.world.as_ref(),
        ) {
            return Some((Goal::DepositAll, "deposit plan materials"));
        }

        let previous = stage_assignments.get(name).cloned();
        let stage =
            assign_to_stage(name, state, &plan.stages, stage_assignments, previous.as_deref())?;
        let goal = stage_goal(stage);
        stage_assignments.insert(name.to_string(), stage.key());
        Some((goal, "pipeline stage"))
    }

    /// Best-effort full view of every configured teammate: the caller's
    /// fresh state, a cached full state from a prior call, or a minimal
    /// stand-in rebuilt from the board projection.
    fn team_view(
        &self,
        st: &CoordState,
        name: &str,
        state: &CharacterState,
        board: &BoardSnapshot,
    ) -> Vec<CharacterState> {
        self.config
            .team
            .iter()
            .filter_map(|member| {
                if member == name {
                    Some(state.clone())
                } else if let Some(full) = st.full_states.get(member) {
                    Some(full.clone())
                } else {
                    board.characters.get(member).map(stand_in)
                }
            })
            .collect()
    }

    fn party_goal(&self, st: &CoordState, name: &str) -> Option<Goal> {
        let party = st.party.as_ref()?;
        if !party.members.iter().any(|m| m == name) {
            return None;
        }
        Some(Goal::Fight {
            monster: party.monster.clone(),
            party: Some(party.members.clone()),
        })
    }

    /// Apply a finished boss search if it is still relevant: plan still
    /// targets combat (checked by the caller) and no party formed meanwhile.
    /// Anything else is silently discarded.
    fn consume_party_outcome(&self, st: &mut CoordState) {
        let Some(outcome) = self.party_slot.lock().ok().and_then(|mut slot| slot.take()) else {
            return;
        };
        if st.party.is_some() {
            debug!(target: "caravan::coordinator", "party search result stale, discarded");
            return;
        }
        match outcome.monster {
            Some(monster) => {
                info!(
                    target: "caravan::coordinator",
                    monster = %monster,
                    members = ?outcome.members,
                    "boss party formed"
                );
                st.party = Some(PartyFight {
                    monster,
                    members: outcome.members,
                });
            }
            // No beatable boss: the team keeps soloing pipeline fights.
            None => debug!(target: "caravan::coordinator", "boss search found no target"),
        }
    }

    /// Fire the background boss search if the preconditions hold. Never
    /// blocks the calling `next_goal`.
    fn maybe_spawn_party_search(&self, st: &CoordState, team: &[CharacterState]) {
        let Some(simulator) = &self.simulator else {
            return;
        };
        if st.party.is_some() || team.len() < self.config.party_size {
            return;
        }
        if self
            .party_search_in_flight
            .swap(true, Ordering::SeqCst)
        {
            return;
        }

        // Deterministic roster: first N members sorted by name.
        let mut names: Vec<String> = team.iter().map(|c| c.name.clone()).collect();
        names.sort();
        names.truncate(self.config.party_size);
        let members: Vec<CharacterState> = team
            .iter()
            .filter(|c| names.contains(&c.name))
            .cloned()
            .collect();

        let simulator = Arc::clone(simulator);
        let world = Arc::clone(&self.world);
        let slot = Arc::clone(&self.party_slot);
        let in_flight = Arc::clone(&self.party_search_in_flight);
        tokio::spawn(async move {
            let monster = simulator.find_best_boss(&members, world.as_ref()).await;
            if let Ok(mut cell) = slot.lock() {
                *cell = Some(PartyOutcome {
                    members: names,
                    monster,
                });
            }
            in_flight.store(false, Ordering::SeqCst);
        });
    }

    /// Raw strategy with anti-duplication: a gather/fight target another
    /// agent already holds is replaced by idle, unless the fight belongs to
    /// an active party.
    async fn fallback_goal(
        &self,
        st: &mut CoordState,
        name: &str,
        state: &CharacterState,
        board: &BoardSnapshot,
    ) -> (Goal, &'static str) {
        let goal = self.strategy.decide(name, state, board).await;

        if let Some(key) = goal.target_key() {
            let duplicated = st.assignments.iter().any(|(other, assigned)| {
                other != name
                    && assigned.target_key().as_deref() == Some(key.as_str())
                    && !(goal.is_party_fight() || assigned.is_party_fight())
            });
            if duplicated {
                return (
                    Goal::idle("coordinator: duplicate target avoided"),
                    "duplicate avoided",
                );
            }
        }

        (goal, "strategy fallback")
    }

    /// Called by the owning agent once a goal has fully finished (not every
    /// tick): releases the reservation and the current assignment, and
    /// dissolves the party once a member finishes its party fight.
    pub async fn report_complete(&self, name: &str) {
        let mut st = self.state.lock().await;
        st.ledger.clear(name);
        let finished = st.assignments.remove(name);
        if let (Some(goal), Some(party)) = (&finished, &st.party) {
            if goal.is_party_fight() && party.members.iter().any(|m| m == name) {
                debug!(target: "caravan::coordinator", agent = name, "party fight finished, dissolving party");
                st.party = None;
            }
        }
    }

    /// Target keys currently held across the team.
    pub async fn assigned_targets(&self) -> Vec<String> {
        let st = self.state.lock().await;
        st.assignments
            .values()
            .filter_map(|goal| goal.target_key())
            .collect()
    }

    /// The goal currently assigned to one agent, if any.
    pub async fn assignment(&self, name: &str) -> Option<Goal> {
        let st = self.state.lock().await;
        st.assignments.get(name).cloned()
    }
}

fn stage_goal(stage: &PipelineStage) -> Goal {
    match stage {
        PipelineStage::Gather { resource, .. } => Goal::Gather {
            resource: resource.clone(),
        },
        PipelineStage::Craft { item, quantity, .. } => Goal::Craft {
            item: item.clone(),
            quantity: *quantity,
        },
        PipelineStage::Fight { monster } => Goal::Fight {
            monster: monster.clone(),
            party: None,
        },
    }
}

/// Minimal stand-in for a teammate we have never seen a full snapshot of:
/// board skill levels, nothing else.
fn stand_in(projection: &CharacterBoardState) -> CharacterState {
    CharacterState {
        name: projection.name.clone(),
        x: projection.x,
        y: projection.y,
        hp: 1,
        max_hp: 1,
        level: projection
            .skill_levels
            .get(&Skill::Combat)
            .copied()
            .unwrap_or(1),
        skills: projection
            .skill_levels
            .iter()
            .map(|(&skill, &level)| (skill, SkillProgress { level, xp: 0 }))
            .collect(),
        equipment: Default::default(),
        inventory: Vec::new(),
        inventory_max_items: projection.inventory_max_items,
        task: None,
        gold: 0,
    }
}

//! Per-character decision loop.
//!
//! Each agent runs an independent task: wait out the cooldown, pick exactly
//! one goal through the override ladder, execute one action toward it, and
//! report the outcome. Failures are handled in two tiers: API status errors
//! are classified by [`error_recovery`] inside the tick, anything else
//! aborts the tick and forces a full character resync.

mod executor;
mod overrides;
mod recovery;

pub use overrides::{
    deposit_override, survival_override, task_override_routine, task_override_urgent,
};
pub use recovery::{Recovery, error_recovery};

use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

use caravan_core::{
    Activity, ApiError, CharacterState, EquipmentAdvisor, GameApi, Goal, Strategy, WorldKnowledge,
};

use crate::board::Board;
use crate::coordinator::Coordinator;

/// Identical consecutive failures of one goal before it is benched.
const STUCK_LIMIT: u32 = 3;

/// Counts consecutive unclassified failures of one goal identity. A failure
/// of any other goal restarts the count; success clears it.
#[derive(Default)]
struct StuckTracker {
    last_failed: Option<String>,
    strikes: u32,
}

impl StuckTracker {
    fn record_failure(&mut self, identity: String) -> u32 {
        if self.last_failed.as_deref() == Some(identity.as_str()) {
            self.strikes += 1;
        } else {
            self.last_failed = Some(identity);
            self.strikes = 1;
        }
        self.strikes
    }

    fn reset(&mut self) {
        self.last_failed = None;
        self.strikes = 0;
    }

    /// True when this goal has struck out and should be benched.
    fn should_bench(&self, identity: &str) -> bool {
        self.strikes >= STUCK_LIMIT && self.last_failed.as_deref() == Some(identity)
    }
}

/// Pause before retrying after a tick-level failure.
const RESYNC_PAUSE: Duration = Duration::from_secs(5);

#[derive(Debug, Error)]
pub enum AgentError {
    #[error(transparent)]
    Api(#[from] ApiError),

    #[error("no map with {kind} {code:?} is known")]
    UnknownLocation { kind: String, code: String },

    #[error("no recipe known for {0}")]
    UnknownRecipe(String),
}

/// One character's decision loop. Built through [`AgentBuilder`], consumed
/// by [`Agent::run`].
pub struct Agent {
    name: String,
    api: Arc<dyn GameApi>,
    world: Arc<dyn WorldKnowledge>,
    board: Arc<Board>,
    coordinator: Option<Arc<Coordinator>>,
    strategy: Option<Arc<dyn Strategy>>,
    advisor: Option<Arc<dyn EquipmentAdvisor>>,
    shutdown: watch::Receiver<bool>,
    state: Option<CharacterState>,
    last_activity: Option<Activity>,
    stuck: StuckTracker,
}

pub struct AgentBuilder {
    name: String,
    api: Arc<dyn GameApi>,
    world: Arc<dyn WorldKnowledge>,
    board: Arc<Board>,
    shutdown: watch::Receiver<bool>,
    coordinator: Option<Arc<Coordinator>>,
    strategy: Option<Arc<dyn Strategy>>,
    advisor: Option<Arc<dyn EquipmentAdvisor>>,
}

impl AgentBuilder {
    pub fn coordinator(mut self, coordinator: Arc<Coordinator>) -> Self {
        self.coordinator = Some(coordinator);
        self
    }

    pub fn strategy(mut self, strategy: Arc<dyn Strategy>) -> Self {
        self.strategy = Some(strategy);
        self
    }

    pub fn advisor(mut self, advisor: Arc<dyn EquipmentAdvisor>) -> Self {
        self.advisor = Some(advisor);
        self
    }

    pub fn build(self) -> Agent {
        Agent {
            name: self.name,
            api: self.api,
            world: self.world,
            board: self.board,
            coordinator: self.coordinator,
            strategy: self.strategy,
            advisor: self.advisor,
            shutdown: self.shutdown,
            state: None,
            last_activity: None,
            stuck: StuckTracker::default(),
        }
    }
}

impl Agent {
    pub fn builder(
        name: impl Into<String>,
        api: Arc<dyn GameApi>,
        world: Arc<dyn WorldKnowledge>,
        board: Arc<Board>,
        shutdown: watch::Receiver<bool>,
    ) -> AgentBuilder {
        AgentBuilder {
            name: name.into(),
            api,
            world,
            board,
            shutdown,
            coordinator: None,
            strategy: None,
            advisor: None,
        }
    }

    /// Run until the shutdown signal flips. A tick-level error drops the
    /// cached character state so the next iteration resyncs from the API.
    pub async fn run(mut self) {
        info!(target: "caravan::agent", agent = %self.name, "agent starting");
        loop {
            if *self.shutdown.borrow() {
                info!(target: "caravan::agent", agent = %self.name, "agent stopping");
                break;
            }

            if self.state.is_none() {
                match self.api.get_character(&self.name).await {
                    Ok(state) => {
                        self.board.update_character(&state, "resyncing").await;
                        self.state = Some(state);
                    }
                    Err(error) => {
                        error!(
                            target: "caravan::agent",
                            agent = %self.name,
                            %error,
                            "character resync failed"
                        );
                        tokio::time::sleep(RESYNC_PAUSE).await;
                        continue;
                    }
                }
            }

            if let Err(error) = self.tick().await {
                error!(
                    target: "caravan::agent",
                    agent = %self.name,
                    %error,
                    "tick failed, resyncing"
                );
                self.state = None;
                tokio::time::sleep(RESYNC_PAUSE).await;
            }
        }
    }

    /// One decision and one action toward it.
    async fn tick(&mut self) -> Result<(), AgentError> {
        let Some(mut state) = self.state.take() else {
            return Ok(());
        };

        self.api.wait_cooldown(&self.name).await?;

        let (mut goal, mut reason) = self.decide(&state).await;

        if self.stuck.should_bench(&goal.identity()) {
            warn!(
                target: "caravan::agent",
                agent = %self.name,
                abandoned = ?goal,
                "goal failed repeatedly, backing off"
            );
            goal = Goal::idle("stuck after repeated failures");
            reason = "stuck";
            self.stuck.reset();
        }

        info!(
            target: "caravan::agent",
            agent = %self.name,
            goal = ?goal,
            reason,
            hp = state.hp,
            inventory = state.inventory_total(),
            "decision"
        );

        if let Some(activity) = activity_of(&goal, self.world.as_ref()) {
            if self.last_activity != Some(activity) {
                self.apply_gear_swaps(activity, &mut state).await;
            }
            self.last_activity = Some(activity);
        }

        let result = executor::execute(
            self.api.as_ref(),
            self.world.as_ref(),
            &self.board,
            &mut state,
            &goal,
        )
        .await;

        match result {
            Ok(progress) => {
                self.stuck.reset();
                if progress == executor::Progress::Acted && goal_is_finished(&goal) {
                    if let Some(coordinator) = &self.coordinator {
                        coordinator.report_complete(&self.name).await;
                    }
                }
            }
            Err(AgentError::Api(api_error)) => {
                let Some(code) = api_error.status_code() else {
                    // Transport or decode failure: abort the tick and resync.
                    self.state = Some(state);
                    return Err(AgentError::Api(api_error));
                };
                match error_recovery(code, &state, &goal) {
                    Recovery::Goal(recovery_goal) => {
                        warn!(
                            target: "caravan::agent",
                            agent = %self.name,
                            code,
                            failed = ?goal,
                            recovery = ?recovery_goal,
                            "recovering from action failure"
                        );
                        if let Err(error) = executor::execute(
                            self.api.as_ref(),
                            self.world.as_ref(),
                            &self.board,
                            &mut state,
                            &recovery_goal,
                        )
                        .await
                        {
                            warn!(
                                target: "caravan::agent",
                                agent = %self.name,
                                %error,
                                "recovery action failed"
                            );
                        }
                        self.stuck.reset();
                    }
                    Recovery::Skip => {
                        debug!(
                            target: "caravan::agent",
                            agent = %self.name,
                            code,
                            failed = ?goal,
                            "skipping failed action"
                        );
                        self.stuck.reset();
                    }
                    Recovery::Unknown => {
                        let strikes = self.stuck.record_failure(goal.identity());
                        warn!(
                            target: "caravan::agent",
                            agent = %self.name,
                            code,
                            failed = ?goal,
                            strikes,
                            "unclassified action failure"
                        );
                    }
                }
            }
            Err(error) => {
                // World-knowledge gaps (unknown map or recipe) are tick-fatal.
                self.state = Some(state);
                return Err(error);
            }
        }

        self.state = Some(state);
        Ok(())
    }

    /// The override ladder. Earlier rungs always win.
    async fn decide(&self, state: &CharacterState) -> (Goal, &'static str) {
        if let Some(goal) = survival_override(state) {
            return (goal, "survival");
        }
        if let Some(goal) = task_override_urgent(state) {
            return (goal, "task");
        }
        if let Some(goal) = deposit_override(state) {
            return (goal, "inventory");
        }
        if let Some(goal) = task_override_routine(state, self.world.as_ref()) {
            return (goal, "task");
        }
        if let Some(coordinator) = &self.coordinator {
            return (coordinator.next_goal(&self.name, state).await, "coordinator");
        }
        if let Some(strategy) = &self.strategy {
            let snapshot = self.board.snapshot().await;
            return (
                strategy.decide(&self.name, state, &snapshot).await,
                "strategy",
            );
        }
        (Goal::idle("no planner configured"), "unconfigured")
    }

    /// Best-effort gear pass before switching activity. Every failure is
    /// logged and swallowed; the tick proceeds with whatever is equipped.
    async fn apply_gear_swaps(&self, activity: Activity, state: &mut CharacterState) {
        let Some(advisor) = &self.advisor else {
            return;
        };
        let snapshot = self.board.snapshot().await;
        let swaps = advisor.plan_swaps(state, &snapshot.bank.items, activity);
        for swap in swaps {
            if state.inventory_count(&swap.equip) == 0 {
                match self.api.withdraw_item(&self.name, &swap.equip, 1).await {
                    Ok(next) => *state = next,
                    Err(error) => {
                        warn!(
                            target: "caravan::agent",
                            agent = %self.name,
                            item = %swap.equip,
                            %error,
                            "gear withdrawal failed"
                        );
                        continue;
                    }
                }
            }
            if swap.unequip.is_some() {
                match self.api.unequip(&self.name, swap.slot).await {
                    Ok(next) => *state = next,
                    Err(error) => {
                        warn!(
                            target: "caravan::agent",
                            agent = %self.name,
                            slot = %swap.slot,
                            %error,
                            "unequip failed"
                        );
                        continue;
                    }
                }
            }
            match self.api.equip(&self.name, &swap.equip, swap.slot).await {
                Ok(next) => {
                    debug!(
                        target: "caravan::agent",
                        agent = %self.name,
                        slot = %swap.slot,
                        item = %swap.equip,
                        "gear swapped"
                    );
                    *state = next;
                }
                Err(error) => {
                    warn!(
                        target: "caravan::agent",
                        agent = %self.name,
                        slot = %swap.slot,
                        item = %swap.equip,
                        %error,
                        "equip failed"
                    );
                }
            }
        }
    }
}

/// Activity implied by a goal, for the equipment pass.
fn activity_of(goal: &Goal, world: &dyn WorldKnowledge) -> Option<Activity> {
    match goal {
        Goal::Fight { .. } => Some(Activity::Combat),
        Goal::Gather { resource } => world
            .resource(resource)
            .map(|node| Activity::Gathering(node.skill)),
        _ => None,
    }
}

/// Goals that are done once their terminal action ran release their
/// coordinator assignment; the executor says whether this tick reached that
/// action or only advanced toward it. Gathering and fighting are
/// open-ended; the coordinator keeps those until the plan moves on.
fn goal_is_finished(goal: &Goal) -> bool {
    !matches!(
        goal,
        Goal::Gather { .. } | Goal::Fight { .. } | Goal::Idle { .. }
    )
}

//! Coordinator behavior across multiple agents sharing one board.

mod common;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use strum::IntoEnumIterator;
use tokio::time::{sleep, timeout};

use caravan_core::{
    BoardSnapshot, CharacterState, Goal, IdleStrategy, ItemStack, Skill, SkillProgress, Strategy,
};
use caravan_runtime::{Board, Coordinator, CoordinatorConfig, FightSimulator};

use common::{MockApi, TestWorld, character};

/// Craft a dagger whenever the visible bank can cover it, otherwise mine.
struct SmithOrMine;

#[async_trait]
impl Strategy for SmithOrMine {
    async fn decide(&self, _name: &str, _state: &CharacterState, board: &BoardSnapshot) -> Goal {
        if board.bank.quantity("copper_ore") >= 10 {
            Goal::Craft {
                item: "copper_dagger".into(),
                quantity: 1,
            }
        } else {
            Goal::Gather {
                resource: "copper_rocks".into(),
            }
        }
    }
}

struct AlwaysGather;

#[async_trait]
impl Strategy for AlwaysGather {
    async fn decide(&self, _name: &str, _state: &CharacterState, _board: &BoardSnapshot) -> Goal {
        Goal::Gather {
            resource: "copper_rocks".into(),
        }
    }
}

struct PartyFightStrategy;

#[async_trait]
impl Strategy for PartyFightStrategy {
    async fn decide(&self, _name: &str, _state: &CharacterState, _board: &BoardSnapshot) -> Goal {
        Goal::Fight {
            monster: "chicken".into(),
            party: Some(vec!["alice".into(), "bella".into()]),
        }
    }
}

fn coordinator(board: Arc<Board>, strategy: Arc<dyn Strategy>) -> Coordinator {
    Coordinator::new(
        board,
        Arc::new(TestWorld::new()),
        strategy,
        None,
        CoordinatorConfig {
            team: vec!["alice".into(), "bella".into()],
            pipeline_enabled: false,
            ..CoordinatorConfig::default()
        },
    )
}

/// Pipeline-mode coordinator with an idle fallback, so every non-idle goal
/// provably came from the pipeline.
fn pipeline_coordinator(
    board: Arc<Board>,
    simulator: Option<Arc<FightSimulator>>,
    team: Vec<String>,
) -> Coordinator {
    Coordinator::new(
        board,
        Arc::new(TestWorld::new()),
        Arc::new(IdleStrategy),
        simulator,
        CoordinatorConfig {
            team,
            ..CoordinatorConfig::default()
        },
    )
}

/// Every skill at 10 except the named one at 1, making it the bottleneck.
fn specialist(name: &str, weakest: Skill) -> CharacterState {
    let mut state = character(name);
    state.skills = Skill::iter()
        .map(|skill| {
            let level = if skill == weakest { 1 } else { 10 };
            (skill, SkillProgress { level, xp: 0 })
        })
        .collect();
    state
}

#[tokio::test]
async fn reservations_hide_claimed_stock_from_later_planners() {
    let board = Arc::new(Board::new());
    board
        .update_bank(vec![ItemStack::new("copper_ore", 10)], 0)
        .await;
    let coordinator = coordinator(board, Arc::new(SmithOrMine));

    let alice = coordinator.next_goal("alice", &character("alice")).await;
    assert!(
        matches!(alice, Goal::Craft { ref item, .. } if item == "copper_dagger"),
        "first planner should claim the full stock: {alice:?}"
    );

    // Alice's reservation covers all 10 ore, so Bella plans against zero.
    let bella = coordinator.next_goal("bella", &character("bella")).await;
    assert!(
        matches!(bella, Goal::Gather { ref resource } if resource == "copper_rocks"),
        "second planner should see an empty bank: {bella:?}"
    );
}

#[tokio::test]
async fn completing_a_craft_releases_its_reservation() {
    let board = Arc::new(Board::new());
    board
        .update_bank(vec![ItemStack::new("copper_ore", 10)], 0)
        .await;
    let coordinator = coordinator(board, Arc::new(SmithOrMine));

    let alice = coordinator.next_goal("alice", &character("alice")).await;
    assert!(matches!(alice, Goal::Craft { .. }));

    coordinator.report_complete("alice").await;

    let bella = coordinator.next_goal("bella", &character("bella")).await;
    assert!(
        matches!(bella, Goal::Craft { .. }),
        "released stock should be plannable again: {bella:?}"
    );
}

#[tokio::test]
async fn duplicate_contended_targets_are_not_assigned_twice() {
    let board = Arc::new(Board::new());
    let coordinator = coordinator(board, Arc::new(AlwaysGather));

    let alice = coordinator.next_goal("alice", &character("alice")).await;
    assert!(matches!(alice, Goal::Gather { .. }));

    let bella = coordinator.next_goal("bella", &character("bella")).await;
    assert!(
        matches!(bella, Goal::Idle { .. }),
        "same gather target must not be doubled: {bella:?}"
    );
}

#[tokio::test]
async fn duplicate_target_frees_up_after_completion() {
    let board = Arc::new(Board::new());
    let coordinator = coordinator(board, Arc::new(AlwaysGather));

    let alice = coordinator.next_goal("alice", &character("alice")).await;
    assert!(matches!(alice, Goal::Gather { .. }));

    coordinator.report_complete("alice").await;

    let bella = coordinator.next_goal("bella", &character("bella")).await;
    assert!(
        matches!(bella, Goal::Gather { .. }),
        "target should be free once the holder finished: {bella:?}"
    );
}

#[tokio::test]
async fn pipeline_trains_the_bottleneck_through_its_gather_stage() {
    let board = Arc::new(Board::new());
    let coordinator =
        pipeline_coordinator(board, None, vec!["alice".into(), "bella".into()]);

    // Weaponcrafting is the weakest skill and its dagger needs ore the bank
    // does not have, so the plan starts at the gather stage.
    let goal = coordinator
        .next_goal("alice", &specialist("alice", Skill::Weaponcrafting))
        .await;
    assert!(
        matches!(goal, Goal::Gather { ref resource } if resource == "copper_rocks"),
        "expected the plan's gather stage: {goal:?}"
    );
}

#[tokio::test]
async fn a_stocked_bank_advances_the_plan_to_its_craft_stage() {
    let board = Arc::new(Board::new());
    board
        .update_bank(vec![ItemStack::new("copper_ore", 60)], 0)
        .await;
    let coordinator =
        pipeline_coordinator(board, None, vec!["alice".into(), "bella".into()]);

    let goal = coordinator
        .next_goal("alice", &specialist("alice", Skill::Weaponcrafting))
        .await;
    assert!(
        matches!(goal, Goal::Craft { ref item, .. } if item == "copper_dagger"),
        "a stocked bank should skip straight to crafting: {goal:?}"
    );
}

#[tokio::test]
async fn plan_materials_on_hand_divert_to_a_deposit() {
    let board = Arc::new(Board::new());
    let coordinator =
        pipeline_coordinator(board, None, vec!["alice".into(), "bella".into()]);

    // A full batch of the plan's own material beats any stage assignment.
    let mut alice = specialist("alice", Skill::Weaponcrafting);
    alice.inventory = vec![ItemStack::new("copper_ore", 12)];
    let goal = coordinator.next_goal("alice", &alice).await;
    assert_eq!(goal, Goal::DepositAll, "carried plan materials should bank first");
}

#[tokio::test]
async fn a_boss_party_forms_from_the_first_members_sorted() {
    let board = Arc::new(Board::new());
    let api = Arc::new(MockApi::new(vec![]));
    let simulator = Arc::new(FightSimulator::new(
        api as Arc<dyn caravan_core::GameApi>,
    ));
    // Deliberately scrambled roster order; the party roster must sort.
    let coordinator = Arc::new(pipeline_coordinator(
        board,
        Some(simulator),
        vec!["cara".into(), "alice".into(), "bella".into()],
    ));

    let fighters = [
        specialist("alice", Skill::Combat),
        specialist("bella", Skill::Combat),
        specialist("cara", Skill::Combat),
    ];
    // Seed full states; the third call sees the whole team and fires the
    // background boss search.
    for fighter in &fighters {
        coordinator.next_goal(&fighter.name, fighter).await;
    }

    let goal = timeout(Duration::from_secs(5), async {
        loop {
            let goal = coordinator.next_goal("alice", &fighters[0]).await;
            if goal.is_party_fight() {
                break goal;
            }
            sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("boss search never produced a party");

    let Goal::Fight { monster, party: Some(members) } = goal.clone() else {
        panic!("expected a party fight: {goal:?}");
    };
    assert_eq!(monster, "chicken");
    assert_eq!(members, vec!["alice", "bella", "cara"]);

    // Members receive the installed fight verbatim.
    let bella = coordinator.next_goal("bella", &fighters[1]).await;
    assert_eq!(bella, goal);
}

#[tokio::test]
async fn party_fights_are_exempt_from_anti_duplication() {
    let board = Arc::new(Board::new());
    let coordinator = coordinator(board, Arc::new(PartyFightStrategy));

    let alice = coordinator.next_goal("alice", &character("alice")).await;
    let bella = coordinator.next_goal("bella", &character("bella")).await;
    assert!(alice.is_party_fight());
    assert!(
        bella.is_party_fight(),
        "every party member receives the same fight: {bella:?}"
    );
}

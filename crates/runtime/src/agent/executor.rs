//! Goal execution against the game API.
//!
//! One API action per tick (the transport is cooldown-gated anyway): a goal
//! whose target is elsewhere spends this tick walking and acts on a later
//! one. The two exceptions are `DepositAll`, which drains every slot while
//! standing at the bank, and craft material withdrawal, which pulls the
//! whole requirement in one visit.

use std::time::Duration;

use tracing::debug;

use caravan_core::{CharacterState, GameApi, Goal, WorldKnowledge};

use super::AgentError;
use crate::board::Board;

/// Pause for an idle tick, so an idling agent is not a busy loop.
const IDLE_PAUSE: Duration = Duration::from_secs(1);

/// Whether a tick reached the goal's own action or only moved toward it.
/// The coordinator must not learn of a goal as finished while its agent is
/// still walking or staging materials.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Progress {
    /// The goal's terminal action ran this tick.
    Acted,
    /// The tick was spent approaching the target or staging materials.
    Advancing,
}

/// Execute one goal. `state` is replaced by every snapshot the API returns;
/// the board sees the refreshed projection afterwards.
pub(crate) async fn execute(
    api: &dyn GameApi,
    world: &dyn WorldKnowledge,
    board: &Board,
    state: &mut CharacterState,
    goal: &Goal,
) -> Result<Progress, AgentError> {
    let progress = match goal {
        Goal::Gather { resource } => {
            if walk_toward(api, world, state, "resource", resource).await? {
                *state = api.gather(&state.name).await?;
                Progress::Acted
            } else {
                Progress::Advancing
            }
        }

        Goal::Fight { monster, .. } => {
            if walk_toward(api, world, state, "monster", monster).await? {
                let outcome = api.fight(&state.name).await?;
                debug!(
                    target: "caravan::agent",
                    agent = %state.name,
                    monster,
                    victory = outcome.victory,
                    xp = outcome.xp,
                    "fight resolved"
                );
                *state = outcome.state;
                Progress::Acted
            } else {
                Progress::Advancing
            }
        }

        Goal::Craft { item, quantity } => {
            let recipe = world
                .recipe(item)
                .ok_or_else(|| AgentError::UnknownRecipe(item.clone()))?;
            let short = missing_materials(recipe, state, *quantity);
            if short.is_empty() {
                let workshop = recipe.skill.to_string();
                if walk_toward(api, world, state, "workshop", &workshop).await? {
                    *state = api.craft(&state.name, item, *quantity).await?;
                    Progress::Acted
                } else {
                    Progress::Advancing
                }
            } else {
                if walk_toward(api, world, state, "bank", "bank").await? {
                    for (code, missing) in short {
                        api.wait_cooldown(&state.name).await?;
                        *state = api.withdraw_item(&state.name, &code, missing).await?;
                    }
                }
                Progress::Advancing
            }
        }

        Goal::Rest => {
            *state = api.rest(&state.name).await?;
            Progress::Acted
        }

        Goal::DepositAll => {
            if walk_toward(api, world, state, "bank", "bank").await? {
                let slots = state.inventory.clone();
                for slot in slots.iter().filter(|s| s.quantity > 0) {
                    api.wait_cooldown(&state.name).await?;
                    *state = api.deposit_item(&state.name, &slot.code, slot.quantity).await?;
                }
                if state.gold > 0 {
                    api.wait_cooldown(&state.name).await?;
                    *state = api.deposit_gold(&state.name, state.gold).await?;
                }
                let items = api.bank_items().await?;
                let gold = api.bank_gold().await?;
                board.update_bank(items, gold).await;
                Progress::Acted
            } else {
                Progress::Advancing
            }
        }

        Goal::Move { x, y } => {
            *state = api.move_to(&state.name, *x, *y).await?;
            Progress::Acted
        }

        Goal::Equip { code, slot } => {
            if state.inventory_count(code) > 0 {
                *state = api.equip(&state.name, code, *slot).await?;
                Progress::Acted
            } else {
                if walk_toward(api, world, state, "bank", "bank").await? {
                    *state = api.withdraw_item(&state.name, code, 1).await?;
                }
                Progress::Advancing
            }
        }

        Goal::Unequip { slot } => {
            *state = api.unequip(&state.name, *slot).await?;
            Progress::Acted
        }

        Goal::BuyNpc {
            npc,
            item,
            quantity,
        } => {
            if walk_toward(api, world, state, "npc", npc).await? {
                *state = api.npc_buy(&state.name, item, *quantity).await?;
                Progress::Acted
            } else {
                Progress::Advancing
            }
        }

        Goal::BuyExchange {
            item,
            max_price,
            quantity,
        } => {
            if walk_toward(api, world, state, "grand_exchange", "grand_exchange").await? {
                *state = api.exchange_buy(&state.name, item, *max_price, *quantity).await?;
                refresh_orders(api, board).await;
                Progress::Acted
            } else {
                Progress::Advancing
            }
        }

        Goal::SellExchange {
            item,
            quantity,
            price,
        } => {
            if walk_toward(api, world, state, "grand_exchange", "grand_exchange").await? {
                *state = api.exchange_sell(&state.name, item, *quantity, *price).await?;
                refresh_orders(api, board).await;
                Progress::Acted
            } else {
                Progress::Advancing
            }
        }

        Goal::TaskNew => {
            if walk_toward(api, world, state, "tasks_master", "").await? {
                *state = api.task_new(&state.name).await?;
                Progress::Acted
            } else {
                Progress::Advancing
            }
        }

        Goal::TaskComplete => {
            if walk_toward(api, world, state, "tasks_master", "").await? {
                *state = api.task_complete(&state.name).await?;
                Progress::Acted
            } else {
                Progress::Advancing
            }
        }

        Goal::TaskTrade => {
            if walk_toward(api, world, state, "tasks_master", "").await? {
                if let Some(task) = state.task.clone() {
                    let quantity = state.inventory_count(&task.code).min(task.remaining());
                    if quantity > 0 {
                        *state = api.task_trade(&state.name, &task.code, quantity).await?;
                    }
                }
                Progress::Acted
            } else {
                Progress::Advancing
            }
        }

        Goal::TaskCancel => {
            if walk_toward(api, world, state, "tasks_master", "").await? {
                *state = api.task_cancel(&state.name).await?;
                Progress::Acted
            } else {
                Progress::Advancing
            }
        }

        Goal::Idle { reason } => {
            debug!(target: "caravan::agent", agent = %state.name, reason, "idling");
            tokio::time::sleep(IDLE_PAUSE).await;
            Progress::Acted
        }
    };

    board.update_character(state, describe(goal)).await;
    Ok(progress)
}

/// Materials still to withdraw before a craft can run, saturating so an
/// oversized quantity cannot wrap the requirement.
fn missing_materials(
    recipe: &caravan_core::Recipe,
    state: &CharacterState,
    quantity: u32,
) -> Vec<(String, u32)> {
    recipe
        .materials
        .iter()
        .filter_map(|m| {
            let required = m.quantity.saturating_mul(quantity);
            let held = state.inventory_count(&m.code);
            (held < required).then(|| (m.code.clone(), required - held))
        })
        .collect()
}

/// Re-publish the live order book after an exchange transaction. Failures
/// only cost board freshness, so they are logged and dropped.
async fn refresh_orders(api: &dyn GameApi, board: &Board) {
    match api.exchange_orders().await {
        Ok(orders) => board.update_orders(orders).await,
        Err(error) => {
            debug!(target: "caravan::agent", %error, "order book refresh failed");
        }
    }
}

/// Walk one step of the way to the nearest map with the given content.
/// Returns true when already standing on it; false when this tick was spent
/// moving. An empty `code` matches any content of the kind.
async fn walk_toward(
    api: &dyn GameApi,
    world: &dyn WorldKnowledge,
    state: &mut CharacterState,
    kind: &str,
    code: &str,
) -> Result<bool, AgentError> {
    let tile = world
        .nearest_map(kind, code, state.x, state.y)
        .ok_or_else(|| AgentError::UnknownLocation {
            kind: kind.to_string(),
            code: code.to_string(),
        })?;
    if state.x == tile.x && state.y == tile.y {
        return Ok(true);
    }
    *state = api.move_to(&state.name, tile.x, tile.y).await?;
    Ok(false)
}

/// Short current-action label pushed to the board.
fn describe(goal: &Goal) -> String {
    match goal {
        Goal::Gather { resource } => format!("gathering {resource}"),
        Goal::Fight { monster, party: Some(_) } => format!("party fight {monster}"),
        Goal::Fight { monster, party: None } => format!("fighting {monster}"),
        Goal::Craft { item, quantity } => format!("crafting {quantity}x {item}"),
        Goal::Rest => "resting".to_string(),
        Goal::DepositAll => "banking".to_string(),
        Goal::Move { x, y } => format!("moving to ({x},{y})"),
        Goal::Equip { code, .. } => format!("equipping {code}"),
        Goal::Unequip { slot } => format!("unequipping {slot}"),
        Goal::BuyNpc { item, .. } => format!("buying {item}"),
        Goal::BuyExchange { item, .. } => format!("exchange buy {item}"),
        Goal::SellExchange { item, .. } => format!("exchange sell {item}"),
        Goal::TaskNew => "accepting task".to_string(),
        Goal::TaskComplete => "completing task".to_string(),
        Goal::TaskTrade => "trading task items".to_string(),
        Goal::TaskCancel => "cancelling task".to_string(),
        Goal::Idle { reason } => format!("idle: {reason}"),
    }
}

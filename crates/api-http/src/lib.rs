//! HTTP implementation of the game API seam.
//!
//! Owns the two transport-level concerns the rest of the system never sees:
//! per-character cooldown tracking (each accepted action reports its
//! cooldown; `wait_cooldown` sleeps out the remainder) and retry of 429/5xx
//! responses with exponential backoff. Semantic game errors pass through as
//! [`ApiError::Status`] untouched.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use tokio::sync::Mutex;
use tracing::{debug, warn};

use caravan_core::{
    ApiError, ApiResult, CharacterState, Cooldown, EquipSlot, FightOutcome, GameApi, ItemStack,
    MarketOrder, SimulationResult,
};

/// First retry delay for 429/5xx; doubles per attempt.
const BACKOFF_BASE: Duration = Duration::from_secs(1);

/// Backoff ceiling.
const BACKOFF_MAX: Duration = Duration::from_secs(30);

/// Attempts before a throttled/failing request is given up on.
const MAX_ATTEMPTS: u32 = 6;

#[derive(Deserialize)]
struct Envelope<T> {
    data: T,
}

#[derive(Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Deserialize)]
struct ErrorBody {
    code: u16,
    message: String,
}

#[derive(Deserialize)]
struct ActionData {
    cooldown: Cooldown,
    character: CharacterState,
}

#[derive(Deserialize)]
struct FightData {
    cooldown: Cooldown,
    character: CharacterState,
    fight: FightBody,
}

#[derive(Deserialize)]
struct FightBody {
    result: String,
    #[serde(default)]
    drops: Vec<ItemStack>,
    #[serde(default)]
    xp: u64,
    #[serde(default)]
    gold: u64,
}

pub struct HttpGameApi {
    http: reqwest::Client,
    base_url: String,
    /// Cooldown expiry per character, fed by every accepted action.
    cooldowns: Mutex<HashMap<String, Instant>>,
}

impl HttpGameApi {
    /// Build a client against `base_url`, authenticating every request with
    /// the bearer `token`.
    pub fn new(base_url: impl Into<String>, token: &str) -> Result<Self, reqwest::Error> {
        let mut headers = reqwest::header::HeaderMap::new();
        if let Ok(mut value) =
            reqwest::header::HeaderValue::from_str(&format!("Bearer {token}"))
        {
            value.set_sensitive(true);
            headers.insert(reqwest::header::AUTHORIZATION, value);
        }
        let http = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(30))
            .build()?;
        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            cooldowns: Mutex::new(HashMap::new()),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    /// Issue one request, retrying 429 and 5xx with exponential backoff.
    /// Any other non-2xx is decoded into [`ApiError::Status`].
    async fn send<T: DeserializeOwned>(
        &self,
        method: reqwest::Method,
        path: &str,
        body: Option<&Value>,
    ) -> ApiResult<T> {
        let mut delay = BACKOFF_BASE;
        for attempt in 1..=MAX_ATTEMPTS {
            let mut request = self.http.request(method.clone(), self.url(path));
            if let Some(body) = body {
                request = request.json(body);
            }
            let response = match request.send().await {
                Ok(response) => response,
                Err(error) => {
                    if attempt == MAX_ATTEMPTS {
                        return Err(ApiError::Transport(Box::new(error)));
                    }
                    warn!(target: "caravan::api", path, %error, attempt, "request failed, retrying");
                    tokio::time::sleep(delay).await;
                    delay = (delay * 2).min(BACKOFF_MAX);
                    continue;
                }
            };

            let status = response.status();
            if status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error() {
                if attempt == MAX_ATTEMPTS {
                    return Err(ApiError::Status {
                        code: status.as_u16(),
                        message: "retries exhausted".into(),
                    });
                }
                debug!(target: "caravan::api", path, %status, attempt, "throttled, backing off");
                tokio::time::sleep(delay).await;
                delay = (delay * 2).min(BACKOFF_MAX);
                continue;
            }

            let bytes = response
                .bytes()
                .await
                .map_err(|e| ApiError::Transport(Box::new(e)))?;

            if !status.is_success() {
                // Prefer the game's semantic code over the HTTP status.
                return match serde_json::from_slice::<ErrorEnvelope>(&bytes) {
                    Ok(envelope) => Err(ApiError::Status {
                        code: envelope.error.code,
                        message: envelope.error.message,
                    }),
                    Err(_) => Err(ApiError::Status {
                        code: status.as_u16(),
                        message: String::from_utf8_lossy(&bytes).into_owned(),
                    }),
                };
            }

            return serde_json::from_slice::<Envelope<T>>(&bytes)
                .map(|envelope| envelope.data)
                .map_err(|e| ApiError::Decode(Box::new(e)));
        }
        Err(ApiError::Status {
            code: 429,
            message: "retries exhausted".into(),
        })
    }

    async fn record_cooldown(&self, name: &str, cooldown: &Cooldown) {
        let expiry = Instant::now() + Duration::from_secs_f64(cooldown.total_seconds.max(0.0));
        self.cooldowns.lock().await.insert(name.to_string(), expiry);
    }

    /// POST one character action and absorb its cooldown.
    async fn action(&self, name: &str, verb: &str, body: Value) -> ApiResult<CharacterState> {
        let data: ActionData = self
            .send(
                reqwest::Method::POST,
                &format!("/my/{name}/action/{verb}"),
                Some(&body),
            )
            .await?;
        self.record_cooldown(name, &data.cooldown).await;
        Ok(data.character)
    }
}

#[async_trait]
impl GameApi for HttpGameApi {
    async fn get_character(&self, name: &str) -> ApiResult<CharacterState> {
        self.send(reqwest::Method::GET, &format!("/characters/{name}"), None)
            .await
    }

    async fn wait_cooldown(&self, name: &str) -> ApiResult<()> {
        let expiry = self.cooldowns.lock().await.get(name).copied();
        if let Some(expiry) = expiry {
            let now = Instant::now();
            if expiry > now {
                tokio::time::sleep(expiry - now).await;
            }
        }
        Ok(())
    }

    async fn move_to(&self, name: &str, x: i32, y: i32) -> ApiResult<CharacterState> {
        self.action(name, "move", json!({ "x": x, "y": y })).await
    }

    async fn fight(&self, name: &str) -> ApiResult<FightOutcome> {
        let data: FightData = self
            .send(
                reqwest::Method::POST,
                &format!("/my/{name}/action/fight"),
                Some(&json!({})),
            )
            .await?;
        self.record_cooldown(name, &data.cooldown).await;
        Ok(FightOutcome {
            state: data.character,
            victory: data.fight.result == "win",
            drops: data.fight.drops,
            xp: data.fight.xp,
            gold: data.fight.gold,
        })
    }

    async fn gather(&self, name: &str) -> ApiResult<CharacterState> {
        self.action(name, "gathering", json!({})).await
    }

    async fn craft(&self, name: &str, item: &str, quantity: u32) -> ApiResult<CharacterState> {
        self.action(name, "crafting", json!({ "code": item, "quantity": quantity }))
            .await
    }

    async fn rest(&self, name: &str) -> ApiResult<CharacterState> {
        self.action(name, "rest", json!({})).await
    }

    async fn equip(&self, name: &str, code: &str, slot: EquipSlot) -> ApiResult<CharacterState> {
        self.action(name, "equip", json!({ "code": code, "slot": slot }))
            .await
    }

    async fn unequip(&self, name: &str, slot: EquipSlot) -> ApiResult<CharacterState> {
        self.action(name, "unequip", json!({ "slot": slot })).await
    }

    async fn deposit_item(
        &self,
        name: &str,
        code: &str,
        quantity: u32,
    ) -> ApiResult<CharacterState> {
        self.action(
            name,
            "bank/deposit",
            json!({ "code": code, "quantity": quantity }),
        )
        .await
    }

    async fn deposit_gold(&self, name: &str, quantity: u64) -> ApiResult<CharacterState> {
        self.action(name, "bank/deposit/gold", json!({ "quantity": quantity }))
            .await
    }

    async fn withdraw_item(
        &self,
        name: &str,
        code: &str,
        quantity: u32,
    ) -> ApiResult<CharacterState> {
        self.action(
            name,
            "bank/withdraw",
            json!({ "code": code, "quantity": quantity }),
        )
        .await
    }

    async fn bank_items(&self) -> ApiResult<Vec<ItemStack>> {
        self.send(reqwest::Method::GET, "/my/bank/items", None).await
    }

    async fn bank_gold(&self) -> ApiResult<u64> {
        self.send(reqwest::Method::GET, "/my/bank/gold", None).await
    }

    async fn npc_buy(&self, name: &str, item: &str, quantity: u32) -> ApiResult<CharacterState> {
        self.action(
            name,
            "npc/buy",
            json!({ "code": item, "quantity": quantity }),
        )
        .await
    }

    async fn exchange_buy(
        &self,
        name: &str,
        item: &str,
        max_price: u64,
        quantity: u32,
    ) -> ApiResult<CharacterState> {
        self.action(
            name,
            "grandexchange/buy",
            json!({ "code": item, "max_price": max_price, "quantity": quantity }),
        )
        .await
    }

    async fn exchange_sell(
        &self,
        name: &str,
        item: &str,
        quantity: u32,
        price: u64,
    ) -> ApiResult<CharacterState> {
        self.action(
            name,
            "grandexchange/sell",
            json!({ "code": item, "quantity": quantity, "price": price }),
        )
        .await
    }

    async fn exchange_orders(&self) -> ApiResult<Vec<MarketOrder>> {
        self.send(reqwest::Method::GET, "/grandexchange/orders", None)
            .await
    }

    async fn task_new(&self, name: &str) -> ApiResult<CharacterState> {
        self.action(name, "task/new", json!({})).await
    }

    async fn task_complete(&self, name: &str) -> ApiResult<CharacterState> {
        self.action(name, "task/complete", json!({})).await
    }

    async fn task_trade(&self, name: &str, code: &str, quantity: u32) -> ApiResult<CharacterState> {
        self.action(
            name,
            "task/trade",
            json!({ "code": code, "quantity": quantity }),
        )
        .await
    }

    async fn task_cancel(&self, name: &str) -> ApiResult<CharacterState> {
        self.action(name, "task/cancel", json!({})).await
    }

    async fn simulate_fight(
        &self,
        state: &CharacterState,
        monster: &str,
    ) -> ApiResult<SimulationResult> {
        self.send(
            reqwest::Method::POST,
            "/simulate/fight",
            Some(&json!({ "character": state, "monster": monster })),
        )
        .await
    }

    async fn simulate_party_fight(
        &self,
        states: &[CharacterState],
        monster: &str,
    ) -> ApiResult<SimulationResult> {
        self.send(
            reqwest::Method::POST,
            "/simulate/party",
            Some(&json!({ "characters": states, "monster": monster })),
        )
        .await
    }
}

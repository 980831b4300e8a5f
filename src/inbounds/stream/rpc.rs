//--------------------------------------------------------------------------------------------------
// MODULE OVERVIEW
//--------------------------------------------------------------------------------------------------
// JSON-RPC 2.0 over a WebSocket at `GET /rpc`. Every draft operation is a unary method; the
// event stream is opened with `events.subscribe` and arrives as `events.event` notifications on
// the same socket until `events.unsubscribe` or disconnect.
//
// | Method             | Params                                   | Result              |
// |--------------------|------------------------------------------|---------------------|
// | draft.pickPlayer   | {player_id, team_id}                     | PickResponse        |
// | draft.reset        | -                                        | null                |
// | draft.state        | -                                        | DraftSnapshot       |
// | teams.add          | {name, owner?, marker?}                  | Team                |
// | teams.reorder      | {team_ids}                               | [Team]              |
// | players.add        | {name, role?, group?, tier?, popularity?}| Player              |
// | players.setScore   | {player_id, score}                       | Player              |
// | chat.addMessage    | {author, text}                           | ChatMessage         |
// | chat.addReaction   | {message_id, emoji, user}                | ChatMessage         |
// | chat.messages      | -                                        | [ChatMessage]       |
// | events.subscribe   | -                                        | subscription id     |
// | events.unsubscribe | -                                        | bool                |
//--------------------------------------------------------------------------------------------------

use std::sync::Arc;

use axum::{
    Extension,
    extract::ws::{Message, WebSocket, WebSocketUpgrade},
    response::IntoResponse,
};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tokio::time::{Instant, interval_at};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::domain::services::draft_engine::{DraftError, DraftService};
use crate::domain::services::events::{DraftEvent, SubscriptionGuard};
use crate::domain::services::state_store::StoreError;
use crate::inbounds::AppState;
use crate::inbounds::dtos::{PickRequest, PickResponse, ReactionRequest, ReorderTeamsRequest};

pub const PARSE_ERROR: i32 = -32700;
pub const INVALID_REQUEST: i32 = -32600;
pub const METHOD_NOT_FOUND: i32 = -32601;
pub const INVALID_PARAMS: i32 = -32602;
pub const INTERNAL_ERROR: i32 = -32000;
pub const NOT_FOUND: i32 = -32004;
pub const CONFLICT: i32 = -32009;

/// Notification method carrying stream events
pub const EVENT_NOTIFICATION: &str = "events.event";

#[derive(Debug, Clone, Deserialize)]
pub struct RpcRequest {
    pub jsonrpc: String,
    /// Absent for notifications, which get no response
    #[serde(default)]
    pub id: Option<Value>,
    pub method: String,
    #[serde(default)]
    pub params: Value,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RpcError {
    pub code: i32,
    pub message: String,
}

impl RpcError {
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

impl From<DraftError> for RpcError {
    fn from(err: DraftError) -> Self {
        let code = match &err {
            DraftError::PlayerNotFound(_)
            | DraftError::TeamNotFound(_)
            | DraftError::MessageNotFound(_) => NOT_FOUND,
            DraftError::AlreadyDrafted(_) => CONFLICT,
            DraftError::Validation(_) => INVALID_PARAMS,
            DraftError::Store(StoreError::Conflict(_)) => CONFLICT,
            DraftError::Store(_) => INTERNAL_ERROR,
        };
        Self::new(code, err.to_string())
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RpcResponse {
    pub jsonrpc: &'static str,
    pub id: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<RpcError>,
}

impl RpcResponse {
    fn reply(id: Value, outcome: Result<Value, RpcError>) -> Self {
        let (result, error) = match outcome {
            Ok(value) => (Some(value), None),
            Err(err) => (None, Some(err)),
        };
        Self {
            jsonrpc: "2.0",
            id,
            result,
            error,
        }
    }
}

#[derive(Debug, Deserialize)]
struct SetScoreParams {
    player_id: Uuid,
    score: i32,
}

#[derive(Debug, Deserialize)]
struct ReactionParams {
    message_id: Uuid,
    #[serde(flatten)]
    reaction: ReactionRequest,
}

fn params<T: DeserializeOwned>(value: Value) -> Result<T, RpcError> {
    serde_json::from_value(value)
        .map_err(|err| RpcError::new(INVALID_PARAMS, format!("Invalid params: {}", err)))
}

fn to_value<T: Serialize>(value: T) -> Result<Value, RpcError> {
    serde_json::to_value(value).map_err(|err| RpcError::new(INTERNAL_ERROR, err.to_string()))
}

/// Runs one unary method against the draft.
///
/// # Errors
/// Unknown methods, unreadable params and draft errors, as JSON-RPC error objects.
pub fn handle_call(draft: &dyn DraftService, method: &str, raw: Value) -> Result<Value, RpcError> {
    match method {
        "draft.pickPlayer" => {
            let request: PickRequest = params(raw)?;
            let pick = draft.draft_player(request.player_id, request.team_id)?;
            to_value(PickResponse::from(pick))
        }
        "draft.reset" => {
            draft.reset_draft()?;
            Ok(Value::Null)
        }
        "draft.state" => to_value(draft.snapshot()?),
        "teams.add" => to_value(draft.add_team(params(raw)?)?),
        "teams.reorder" => {
            let request: ReorderTeamsRequest = params(raw)?;
            to_value(draft.reorder_teams(request.team_ids)?)
        }
        "players.add" => to_value(draft.add_player(params(raw)?)?),
        "players.setScore" => {
            let request: SetScoreParams = params(raw)?;
            to_value(draft.set_player_score(request.player_id, request.score)?)
        }
        "chat.addMessage" => to_value(draft.add_message(params(raw)?)?),
        "chat.addReaction" => {
            let request: ReactionParams = params(raw)?;
            to_value(draft.add_reaction(
                request.message_id,
                &request.reaction.emoji,
                &request.reaction.user,
            )?)
        }
        "chat.messages" => to_value(draft.messages()?),
        other => Err(RpcError::new(
            METHOD_NOT_FOUND,
            format!("Method not found: {}", other),
        )),
    }
}

/// `GET /rpc`: upgrades to the JSON-RPC socket
pub async fn rpc_socket(
    Extension(state): Extension<Arc<AppState>>,
    ws: WebSocketUpgrade,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| RpcConnection::new(state).run(socket))
}

/// State of one JSON-RPC socket
struct RpcConnection {
    state: Arc<AppState>,
    subscription: Option<SubscriptionGuard>,
}

impl RpcConnection {
    fn new(state: Arc<AppState>) -> Self {
        Self {
            state,
            subscription: None,
        }
    }

    async fn run(mut self, mut socket: WebSocket) {
        let connection_id = Uuid::new_v4();
        info!("RPC connection {} opened", connection_id);

        let period = self.state.keepalive;
        let mut keepalive = interval_at(Instant::now() + period, period);

        loop {
            tokio::select! {
                incoming = socket.recv() => {
                    match incoming {
                        Some(Ok(Message::Text(text))) => {
                            if let Some(reply) = self.dispatch(&text) {
                                if socket.send(Message::Text(reply)).await.is_err() {
                                    break;
                                }
                            }
                        }
                        Some(Ok(Message::Close(_))) | None => break,
                        Some(Ok(_)) => {}
                        Some(Err(err)) => {
                            debug!("RPC connection {} failed: {}", connection_id, err);
                            break;
                        }
                    }
                }
                event = next_event(&mut self.subscription) => {
                    let Some(event) = event else {
                        // Hub closed under us
                        let _ = socket.send(Message::Close(None)).await;
                        break;
                    };
                    let Some(notification) = self.notification(&event) else {
                        continue;
                    };
                    if socket.send(Message::Text(notification)).await.is_err() {
                        break;
                    }
                    keepalive.reset();
                }
                _ = keepalive.tick() => {
                    if socket.send(Message::Ping(Vec::new())).await.is_err() {
                        break;
                    }
                }
            }
        }

        // Dropping the guard unsubscribes
        self.subscription = None;
        info!("RPC connection {} closed", connection_id);
    }

    /// Handles one text frame; `None` for notifications
    fn dispatch(&mut self, text: &str) -> Option<String> {
        let request: RpcRequest = match serde_json::from_str(text) {
            Ok(request) => request,
            Err(err) => {
                let reply = RpcResponse::reply(
                    Value::Null,
                    Err(RpcError::new(PARSE_ERROR, format!("Parse error: {}", err))),
                );
                return serde_json::to_string(&reply).ok();
            }
        };

        let outcome = if request.jsonrpc != "2.0" {
            Err(RpcError::new(INVALID_REQUEST, "jsonrpc must be \"2.0\""))
        } else {
            match request.method.as_str() {
                "events.subscribe" => self.subscribe(),
                "events.unsubscribe" => Ok(Value::Bool(self.subscription.take().is_some())),
                method => handle_call(self.state.draft.as_ref(), method, request.params),
            }
        };

        let id = request.id?;
        serde_json::to_string(&RpcResponse::reply(id, outcome)).ok()
    }

    fn subscribe(&mut self) -> Result<Value, RpcError> {
        if let Some(existing) = &self.subscription {
            return Ok(json!(existing.id()));
        }
        let guard = SubscriptionGuard::subscribe(self.state.events.clone())
            .map_err(|err| RpcError::new(INTERNAL_ERROR, err.to_string()))?;
        let id = guard.id();
        self.subscription = Some(guard);
        Ok(json!(id))
    }

    fn notification(&self, event: &DraftEvent) -> Option<String> {
        let subscription = self.subscription.as_ref()?.id();
        let frame = json!({
            "jsonrpc": "2.0",
            "method": EVENT_NOTIFICATION,
            "params": {
                "subscription": subscription,
                "event": event,
            }
        });
        match serde_json::to_string(&frame) {
            Ok(text) => Some(text),
            Err(err) => {
                warn!("Skipping {} on RPC stream: {}", event.kind(), err);
                None
            }
        }
    }
}

/// Next event of the connection's subscription; never resolves while there is none
async fn next_event(subscription: &mut Option<SubscriptionGuard>) -> Option<DraftEvent> {
    match subscription {
        Some(guard) => guard.recv().await,
        None => std::future::pending().await,
    }
}

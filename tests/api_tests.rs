//--------------------------------------------------------------------------------------------------
// TEST MODULE OVERVIEW
//--------------------------------------------------------------------------------------------------
// Integration tests for the HTTP surface: every route through the real router, engine and
// in-memory store, plus the SSE stream, the JSON-RPC socket and a pick travelling through the
// embedded broker bridge.
//--------------------------------------------------------------------------------------------------

use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::body::{Body, to_bytes};
use axum::http::{Request, StatusCode};
use axum::response::Response;
use futures::{SinkExt, StreamExt};
use serde_json::{Value, from_slice, json};
use tokio::time::timeout;
use tokio_tungstenite::{connect_async, tungstenite::Message};
use tower::ServiceExt;

use draft_room::domain::services::draft_engine::{DraftEngine, DraftService};
use draft_room::domain::services::events::{DraftEvent, EventBus, EventHub};
use draft_room::inbounds::{AppState, router};
use draft_room::outbounds::bridge::{BrokerBridge, EmbeddedTopic, RetryPolicy};
use draft_room::outbounds::memory_store::MemoryStore;

fn app_with_hub(hub: Arc<dyn EventHub>) -> Router {
    app_with_keepalive(hub, Duration::from_secs(30))
}

fn app_with_keepalive(hub: Arc<dyn EventHub>, keepalive: Duration) -> Router {
    let draft: Arc<dyn DraftService> =
        Arc::new(DraftEngine::new(Arc::new(MemoryStore::new()), hub.clone()));
    router(Arc::new(AppState::new(draft, hub, keepalive)))
}

/// Sets up a router over a plain event bus
fn setup_test_router() -> (Router, Arc<EventBus>) {
    let bus = Arc::new(EventBus::new(64));
    (app_with_hub(bus.clone()), bus)
}

async fn parse_json_response(response: Response) -> Value {
    let body_bytes = to_bytes(response.into_body(), 1024 * 1024).await.unwrap();
    from_slice(&body_bytes).unwrap()
}

async fn send(app: &Router, method: &str, uri: &str, body: Option<Value>) -> Response {
    let request = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(body) => request
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => request.body(Body::empty()).unwrap(),
    };
    app.clone().oneshot(request).await.unwrap()
}

async fn create(app: &Router, uri: &str, body: Value) -> Value {
    let response = send(app, "POST", uri, Some(body)).await;
    assert_eq!(response.status(), StatusCode::CREATED, "POST {}", uri);
    parse_json_response(response).await
}

#[tokio::test]
async fn test_health_endpoint() {
    let (app, _) = setup_test_router();

    let response = send(&app, "GET", "/health", None).await;

    assert_eq!(response.status(), StatusCode::OK);
    let body = parse_json_response(response).await;
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn test_pick_flow() {
    let (app, _) = setup_test_router();
    let owls = create(&app, "/teams", json!({"name": "Owls", "owner": "ana"})).await;
    let bears = create(&app, "/teams", json!({"name": "Bears", "owner": "bo"})).await;
    let player = create(&app, "/players", json!({"name": "Rae", "role": "mid"})).await;

    let pick = json!({"player_id": player["id"], "team_id": owls["id"]});
    let response = send(&app, "POST", "/draft/picks", Some(pick.clone())).await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let body = parse_json_response(response).await;
    assert_eq!(body["pick_number"], 1);
    assert_eq!(body["previous_score"], 50);
    assert_eq!(body["new_score"], 68);

    // Same player again
    let response = send(&app, "POST", "/draft/picks", Some(pick)).await;
    assert_eq!(response.status(), StatusCode::CONFLICT);
    let body = parse_json_response(response).await;
    assert_eq!(body["error"]["code"], 409);

    let response = send(&app, "GET", "/state", None).await;
    assert_eq!(response.status(), StatusCode::OK);
    let state = parse_json_response(response).await;
    assert_eq!(state["total_drafted"], 1);
    assert_eq!(state["next_pick"], 2);
    assert_eq!(state["on_the_clock"]["id"], bears["id"]);

    let teams = parse_json_response(send(&app, "GET", "/teams", None).await).await;
    assert_eq!(teams[0]["roster"][0]["player_name"], "Rae");

    // The pick was announced in chat
    let messages = parse_json_response(send(&app, "GET", "/chat/messages", None).await).await;
    assert_eq!(messages.as_array().unwrap().len(), 1);
    assert_eq!(messages[0]["system"], true);
}

#[tokio::test]
async fn test_reset_restores_the_pool() {
    let (app, _) = setup_test_router();
    let team = create(&app, "/teams", json!({"name": "Owls"})).await;
    let player = create(&app, "/players", json!({"name": "Rae"})).await;
    create(
        &app,
        "/draft/picks",
        json!({"player_id": player["id"], "team_id": team["id"]}),
    )
    .await;

    let response = send(&app, "POST", "/draft/reset", None).await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let players = parse_json_response(send(&app, "GET", "/players", None).await).await;
    assert_eq!(players[0]["drafted"], false);
    assert_eq!(players[0]["adjustable_score"], 50);
}

#[tokio::test]
async fn test_unknown_player_is_not_found() {
    let (app, _) = setup_test_router();
    let team = create(&app, "/teams", json!({"name": "Owls"})).await;

    let response = send(
        &app,
        "POST",
        "/draft/picks",
        Some(json!({"player_id": uuid::Uuid::new_v4(), "team_id": team["id"]})),
    )
    .await;

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let body = parse_json_response(response).await;
    assert_eq!(body["error"]["code"], 404);
}

#[tokio::test]
async fn test_reorder_needs_every_team() {
    let (app, _) = setup_test_router();
    let owls = create(&app, "/teams", json!({"name": "Owls"})).await;
    let bears = create(&app, "/teams", json!({"name": "Bears"})).await;

    let response = send(
        &app,
        "PUT",
        "/teams/order",
        Some(json!({"team_ids": [bears["id"]]})),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = send(
        &app,
        "PUT",
        "/teams/order",
        Some(json!({"team_ids": [bears["id"], owls["id"]]})),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let teams = parse_json_response(response).await;
    assert_eq!(teams[0]["name"], "Bears");
}

#[tokio::test]
async fn test_set_player_score() {
    let (app, _) = setup_test_router();
    let player = create(&app, "/players", json!({"name": "Rae", "popularity": 10})).await;

    let uri = format!("/players/{}/score", player["id"].as_str().unwrap());
    let response = send(&app, "PUT", &uri, Some(json!({"score": 87}))).await;

    assert_eq!(response.status(), StatusCode::OK);
    let body = parse_json_response(response).await;
    assert_eq!(body["popularity"], 87);
    assert_eq!(body["adjustable_score"], 50);
}

#[tokio::test]
async fn test_reaction_counts_each_user_once() {
    let (app, bus) = setup_test_router();
    let message = create(
        &app,
        "/chat/messages",
        json!({"author": "ana", "text": "great pick"}),
    )
    .await;
    let mut events = bus.subscribe().unwrap();

    let uri = format!("/chat/messages/{}/reactions", message["id"].as_str().unwrap());
    let reaction = json!({"emoji": "🎉", "user": "bo"});
    for _ in 0..2 {
        let response = send(&app, "POST", &uri, Some(reaction.clone())).await;
        assert_eq!(response.status(), StatusCode::OK);
    }

    let messages = parse_json_response(send(&app, "GET", "/chat/messages", None).await).await;
    let users = messages[0]["reactions"][0]["users"].as_array().unwrap();
    assert_eq!(users.len(), 1);

    // Only the first reaction changed anything
    assert!(matches!(
        events.try_recv(),
        Some(DraftEvent::ChatReactionAdded { count: 1, .. })
    ));
    assert_eq!(events.try_recv(), None);
}

#[tokio::test]
async fn test_sse_stream_emits_events() {
    let (app, bus) = setup_test_router();

    let response = send(&app, "GET", "/events", None).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()["content-type"].to_str().unwrap(),
        "text/event-stream"
    );
    assert_eq!(bus.subscriber_count(), 1);

    let team = create(&app, "/teams", json!({"name": "Owls"})).await;

    let mut body = response.into_body().into_data_stream();
    let (name, frame) = timeout(Duration::from_secs(2), async {
        loop {
            let chunk = body.next().await.unwrap().unwrap();
            let text = String::from_utf8(chunk.to_vec()).unwrap();
            if let Some(data) = text.lines().find_map(|line| line.strip_prefix("data: ")) {
                let name = text
                    .lines()
                    .find_map(|line| line.strip_prefix("event: "))
                    .map(str::to_string);
                return (name, serde_json::from_str::<Value>(data).unwrap());
            }
        }
    })
    .await
    .unwrap();

    assert_eq!(name.as_deref(), Some("team-added"));
    assert_eq!(frame["type"], "team-added");
    assert_eq!(frame["payload"]["team_id"], team["id"]);

    drop(body);
    assert_eq!(bus.subscriber_count(), 0);
}

#[tokio::test]
async fn test_rpc_socket() {
    let (app, bus) = setup_test_router();
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move { axum::serve(listener, app).await });

    let (mut socket, _) = connect_async(format!("ws://{}/rpc", addr)).await.unwrap();

    let call = |id: u64, method: &str, params: Value| {
        Message::Text(
            json!({"jsonrpc": "2.0", "id": id, "method": method, "params": params}).to_string(),
        )
    };

    socket
        .send(call(1, "events.subscribe", Value::Null))
        .await
        .unwrap();
    socket
        .send(call(2, "teams.add", json!({"name": "Owls"})))
        .await
        .unwrap();
    socket
        .send(call(3, "draft.undo", Value::Null))
        .await
        .unwrap();

    let mut replies = Vec::new();
    let mut notifications = Vec::new();
    timeout(Duration::from_secs(2), async {
        while replies.len() < 3 || notifications.is_empty() {
            let Some(Ok(Message::Text(text))) = socket.next().await else {
                continue;
            };
            let frame: Value = serde_json::from_str(&text).unwrap();
            if frame["method"] == "events.event" {
                notifications.push(frame);
            } else {
                replies.push(frame);
            }
        }
    })
    .await
    .unwrap();

    let reply = |id: u64| replies.iter().find(|r| r["id"] == id).unwrap().clone();
    let subscription = reply(1)["result"].clone();
    assert_eq!(reply(2)["result"]["name"], "Owls");
    assert_eq!(reply(3)["error"]["code"], -32601);

    assert_eq!(notifications[0]["params"]["subscription"], subscription);
    assert_eq!(notifications[0]["params"]["event"]["type"], "team-added");

    socket.close(None).await.unwrap();
    timeout(Duration::from_secs(2), async {
        while bus.subscriber_count() > 0 {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .unwrap();
}

#[tokio::test]
async fn test_idle_streams_send_keepalives() {
    let bus = Arc::new(EventBus::new(64));
    let app = app_with_keepalive(bus.clone(), Duration::from_millis(100));

    // SSE: a comment frame arrives with no events published
    let response = send(&app, "GET", "/events", None).await;
    let mut body = response.into_body().into_data_stream();
    let seen = timeout(Duration::from_secs(2), async {
        let mut seen = String::new();
        while !seen
            .lines()
            .any(|line| line.starts_with(':') && line.contains("keepalive"))
        {
            let chunk = body.next().await.unwrap().unwrap();
            seen.push_str(&String::from_utf8(chunk.to_vec()).unwrap());
        }
        seen
    })
    .await
    .unwrap();
    assert!(!seen.contains("data: "));
    drop(body);

    // JSON-RPC: the server pings an idle socket
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move { axum::serve(listener, app).await });

    let (mut socket, _) = connect_async(format!("ws://{}/rpc", addr)).await.unwrap();
    let first = timeout(Duration::from_secs(2), socket.next())
        .await
        .unwrap()
        .unwrap()
        .unwrap();
    assert!(matches!(first, Message::Ping(_)));

    socket.close(None).await.unwrap();
}

#[tokio::test]
async fn test_pick_through_the_embedded_bridge() {
    let topic = EmbeddedTopic::start(
        "draft.events",
        Duration::from_secs(3600),
        broker::EmbeddedBrokerConfig::default(),
    )
    .await
    .unwrap();
    let bridge = Arc::new(
        BrokerBridge::start(Arc::new(topic), EventBus::new(16), RetryPolicy::default())
            .await
            .unwrap(),
    );
    let app = app_with_hub(bridge.clone());
    let mut events = bridge.subscribe().unwrap();

    let team = create(&app, "/teams", json!({"name": "Owls"})).await;
    let player = create(&app, "/players", json!({"name": "Rae"})).await;
    create(
        &app,
        "/draft/picks",
        json!({"player_id": player["id"], "team_id": team["id"]}),
    )
    .await;

    let mut kinds = Vec::new();
    timeout(Duration::from_secs(2), async {
        while kinds.len() < 3 {
            kinds.push(events.recv().await.unwrap().kind());
        }
    })
    .await
    .unwrap();
    assert_eq!(kinds, ["team-added", "player-added", "player-drafted"]);

    bridge.close().await;
}

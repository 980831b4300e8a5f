//--------------------------------------------------------------------------------------------------
// MODULE OVERVIEW
//--------------------------------------------------------------------------------------------------
// HTTP surface of the draft room, built on Axum. Every draft operation maps to one handler; the
// event stream is served both as SSE and over a JSON-RPC WebSocket.
//
// | Component      | Description                                                |
// |----------------|------------------------------------------------------------|
// | Api            | Binds the listener and serves the router until shutdown    |
// | AppState       | Draft service, event hub and stream settings for handlers  |
// | handlers       | One request handler per draft operation                    |
// | stream         | SSE and JSON-RPC event streams                             |
// | dtos           | Request and response bodies                                |
// | api_error      | Error to HTTP response mapping                             |
//--------------------------------------------------------------------------------------------------

pub mod api_error;
pub mod dtos;
pub mod handlers;
pub mod stream;

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    Extension, Router,
    http::{Method, header},
    routing::{get, post, put},
};
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::domain::services::draft_engine::DraftService;
use crate::domain::services::events::EventHub;

use handlers::{chat_handler, draft_handler, health_handler, player_handler, team_handler};

pub use api_error::{ApiError, ApiResult};

/// Shared application state accessible by all handlers
pub struct AppState {
    pub draft: Arc<dyn DraftService>,
    pub events: Arc<dyn EventHub>,
    /// Idle interval between keepalive frames on event streams
    pub keepalive: Duration,
}

impl AppState {
    pub fn new(
        draft: Arc<dyn DraftService>,
        events: Arc<dyn EventHub>,
        keepalive: Duration,
    ) -> Self {
        Self {
            draft,
            events,
            keepalive,
        }
    }
}

/// Builds every route over `state`
pub fn router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::ACCEPT]);

    Router::new()
        .route("/health", get(health_handler::health))
        // Draft
        .route("/draft/picks", post(draft_handler::pick_player))
        .route("/draft/reset", post(draft_handler::reset_draft))
        .route("/state", get(draft_handler::get_state))
        // Teams
        .route(
            "/teams",
            post(team_handler::add_team).get(team_handler::list_teams),
        )
        .route("/teams/order", put(team_handler::reorder_teams))
        // Players
        .route(
            "/players",
            post(player_handler::add_player).get(player_handler::list_players),
        )
        .route("/players/:id/score", put(player_handler::set_player_score))
        // Chat
        .route(
            "/chat/messages",
            post(chat_handler::add_message).get(chat_handler::list_messages),
        )
        .route(
            "/chat/messages/:id/reactions",
            post(chat_handler::add_reaction),
        )
        // Streams
        .route("/events", get(stream::sse::event_stream))
        .route("/rpc", get(stream::rpc::rpc_socket))
        .layer(Extension(state))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}

/// Main API structure
pub struct Api {
    addr: SocketAddr,
    state: Arc<AppState>,
}

impl Api {
    pub fn new(addr: SocketAddr, state: AppState) -> Self {
        Self {
            addr,
            state: Arc::new(state),
        }
    }

    pub fn routes(&self) -> Router {
        router(self.state.clone())
    }

    /// Serves until `shutdown` resolves, then lets in-flight requests finish.
    ///
    /// Long-lived event streams end when the hub is closed afterwards.
    ///
    /// # Errors
    /// Returns an error if the address cannot be bound or the server fails.
    pub async fn serve<F>(self, shutdown: F) -> std::io::Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let listener = TcpListener::bind(self.addr).await?;
        info!("API listening on {}", listener.local_addr()?);
        axum::serve(listener, self.routes())
            .with_graceful_shutdown(shutdown)
            .await
    }
}

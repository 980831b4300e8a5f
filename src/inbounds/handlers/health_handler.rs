use std::sync::Arc;

use axum::{Extension, Json, response::IntoResponse};
use serde_json::json;

use crate::inbounds::AppState;

/// Health check; also reports how many event streams are attached
pub async fn health(Extension(state): Extension<Arc<AppState>>) -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "subscribers": state.events.subscriber_count()
    }))
}

use std::sync::Arc;

use axum::{Extension, Json, http::StatusCode};
use tracing::info;

use crate::domain::models::DraftSnapshot;
use crate::inbounds::AppState;
use crate::inbounds::api_error::ApiResult;
use crate::inbounds::dtos::{PickRequest, PickResponse};

/// +----------------------------------------------------------+
/// | STRUCTS | TRAITS | ENUMS | FUNCTIONS                     |
/// +----------+-------+-------+------------------------------+
/// | Functions:                                               |
/// |   - pick_player                                          |
/// |   - reset_draft                                          |
/// |   - get_state                                            |
/// +----------------------------------------------------------+

/// Drafts a player onto a team.
///
/// # Error Handling
///
/// * Unknown player or team becomes `404`
/// * A player taken by an earlier pick becomes `409`
pub async fn pick_player(
    Extension(state): Extension<Arc<AppState>>,
    Json(request): Json<PickRequest>,
) -> ApiResult<(StatusCode, Json<PickResponse>)> {
    let pick = state.draft.draft_player(request.player_id, request.team_id)?;
    info!(
        "Pick {}: {} to {}",
        pick.pick_number, pick.player.name, pick.team.name
    );
    Ok((StatusCode::CREATED, Json(PickResponse::from(pick))))
}

pub async fn reset_draft(Extension(state): Extension<Arc<AppState>>) -> ApiResult<StatusCode> {
    state.draft.reset_draft()?;
    Ok(StatusCode::NO_CONTENT)
}

/// Players, teams and whose turn it is
pub async fn get_state(
    Extension(state): Extension<Arc<AppState>>,
) -> ApiResult<Json<DraftSnapshot>> {
    Ok(Json(state.draft.snapshot()?))
}

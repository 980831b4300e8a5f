use std::sync::Arc;

use axum::{Extension, Json, http::StatusCode};

use crate::domain::models::{NewTeam, Team};
use crate::inbounds::AppState;
use crate::inbounds::api_error::ApiResult;
use crate::inbounds::dtos::ReorderTeamsRequest;

/// +----------------------------------------------------------+
/// | STRUCTS | TRAITS | ENUMS | FUNCTIONS                     |
/// +----------+-------+-------+------------------------------+
/// | Functions:                                               |
/// |   - add_team                                             |
/// |   - list_teams                                           |
/// |   - reorder_teams                                        |
/// +----------------------------------------------------------+

pub async fn add_team(
    Extension(state): Extension<Arc<AppState>>,
    Json(request): Json<NewTeam>,
) -> ApiResult<(StatusCode, Json<Team>)> {
    let team = state.draft.add_team(request)?;
    Ok((StatusCode::CREATED, Json(team)))
}

/// Teams in draft order, with rosters
pub async fn list_teams(Extension(state): Extension<Arc<AppState>>) -> ApiResult<Json<Vec<Team>>> {
    Ok(Json(state.draft.snapshot()?.teams))
}

pub async fn reorder_teams(
    Extension(state): Extension<Arc<AppState>>,
    Json(request): Json<ReorderTeamsRequest>,
) -> ApiResult<Json<Vec<Team>>> {
    Ok(Json(state.draft.reorder_teams(request.team_ids)?))
}

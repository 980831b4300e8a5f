use std::sync::Arc;

use axum::{Extension, Json, extract::Path, http::StatusCode};
use uuid::Uuid;

use crate::domain::models::{NewPlayer, Player};
use crate::inbounds::AppState;
use crate::inbounds::api_error::ApiResult;
use crate::inbounds::dtos::SetScoreRequest;

/// +----------------------------------------------------------+
/// | STRUCTS | TRAITS | ENUMS | FUNCTIONS                     |
/// +----------+-------+-------+------------------------------+
/// | Functions:                                               |
/// |   - add_player                                           |
/// |   - list_players                                         |
/// |   - set_player_score                                     |
/// +----------------------------------------------------------+

pub async fn add_player(
    Extension(state): Extension<Arc<AppState>>,
    Json(request): Json<NewPlayer>,
) -> ApiResult<(StatusCode, Json<Player>)> {
    let player = state.draft.add_player(request)?;
    Ok((StatusCode::CREATED, Json(player)))
}

pub async fn list_players(
    Extension(state): Extension<Arc<AppState>>,
) -> ApiResult<Json<Vec<Player>>> {
    Ok(Json(state.draft.snapshot()?.players))
}

/// Overwrites a player's popularity score
pub async fn set_player_score(
    Extension(state): Extension<Arc<AppState>>,
    Path(player_id): Path<Uuid>,
    Json(request): Json<SetScoreRequest>,
) -> ApiResult<Json<Player>> {
    Ok(Json(state.draft.set_player_score(player_id, request.score)?))
}

#[cfg(test)]
mod tests {
    use axum::response::IntoResponse;
    use mockall::predicate::{always, eq};

    use super::*;
    use crate::domain::services::draft_engine::{DraftError, MockDraftService};
    use crate::inbounds::handlers::test_support::state_with;

    #[tokio::test]
    async fn unknown_player_score_is_not_found() {
        let player_id = Uuid::new_v4();
        let mut draft = MockDraftService::new();
        draft
            .expect_set_player_score()
            .with(eq(player_id), always())
            .returning(|id, _| Err(DraftError::PlayerNotFound(id)));

        let response = set_player_score(
            Extension(state_with(draft)),
            Path(player_id),
            Json(SetScoreRequest { score: 90 }),
        )
        .await
        .into_response();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}

use std::sync::Arc;

use axum::{Extension, Json, extract::Path, http::StatusCode};
use uuid::Uuid;

use crate::domain::models::{ChatMessage, NewMessage};
use crate::inbounds::AppState;
use crate::inbounds::api_error::ApiResult;
use crate::inbounds::dtos::ReactionRequest;

/// +----------------------------------------------------------+
/// | STRUCTS | TRAITS | ENUMS | FUNCTIONS                     |
/// +----------+-------+-------+------------------------------+
/// | Functions:                                               |
/// |   - add_message                                          |
/// |   - list_messages                                        |
/// |   - add_reaction                                         |
/// +----------------------------------------------------------+

pub async fn add_message(
    Extension(state): Extension<Arc<AppState>>,
    Json(request): Json<NewMessage>,
) -> ApiResult<(StatusCode, Json<ChatMessage>)> {
    let message = state.draft.add_message(request)?;
    Ok((StatusCode::CREATED, Json(message)))
}

pub async fn list_messages(
    Extension(state): Extension<Arc<AppState>>,
) -> ApiResult<Json<Vec<ChatMessage>>> {
    Ok(Json(state.draft.messages()?))
}

/// Adds a reaction; repeating one returns the message unchanged
pub async fn add_reaction(
    Extension(state): Extension<Arc<AppState>>,
    Path(message_id): Path<Uuid>,
    Json(request): Json<ReactionRequest>,
) -> ApiResult<Json<ChatMessage>> {
    let message = state
        .draft
        .add_reaction(message_id, &request.emoji, &request.user)?;
    Ok(Json(message))
}

#[cfg(test)]
mod tests {
    use axum::response::IntoResponse;

    use super::*;
    use crate::domain::services::draft_engine::MockDraftService;
    use crate::inbounds::handlers::test_support::{json_body, state_with};

    #[tokio::test]
    async fn reaction_is_forwarded_to_the_draft() {
        let message_id = Uuid::new_v4();
        let mut draft = MockDraftService::new();
        draft
            .expect_add_reaction()
            .withf(move |id, emoji, user| *id == message_id && emoji == "🎉" && user == "ana")
            .times(1)
            .returning(|_, emoji, user| {
                let mut message = ChatMessage::user(NewMessage {
                    author: "bo".to_string(),
                    text: "what a pick".to_string(),
                });
                message.react(emoji, user);
                Ok(message)
            });

        let response = add_reaction(
            Extension(state_with(draft)),
            Path(message_id),
            Json(ReactionRequest {
                emoji: "🎉".to_string(),
                user: "ana".to_string(),
            }),
        )
        .await
        .into_response();

        assert_eq!(response.status(), StatusCode::OK);
        let body: ChatMessage = json_body(response).await;
        assert_eq!(body.reaction_count("🎉"), 1);
    }
}

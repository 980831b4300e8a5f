/// +----------------------------------------------------------+
/// | MODULES                                                  |
/// +----------+-------+-------+------------------------------+
/// | Exports:                                                 |
/// |   - chat_handler                                         |
/// |   - draft_handler                                        |
/// |   - health_handler                                       |
/// |   - player_handler                                       |
/// |   - team_handler                                         |
/// +----------------------------------------------------------+

/// Handlers for chat messages and reactions
pub mod chat_handler;

/// Handlers for picks, reset and the state read
pub mod draft_handler;

pub mod health_handler;

/// Handlers for adding, listing and scoring players
pub mod player_handler;

/// Handlers for adding, listing and ordering teams
pub mod team_handler;

#[cfg(test)]
pub(crate) mod test_support {
    use std::sync::Arc;
    use std::time::Duration;

    use axum::{body::to_bytes, response::Response};
    use serde::de::DeserializeOwned;

    use crate::domain::services::draft_engine::{DraftService, MockDraftService};
    use crate::domain::services::events::EventBus;
    use crate::inbounds::AppState;

    pub fn state_with(draft: MockDraftService) -> Arc<AppState> {
        let draft: Arc<dyn DraftService> = Arc::new(draft);
        Arc::new(AppState::new(
            draft,
            Arc::new(EventBus::default()),
            Duration::from_secs(30),
        ))
    }

    pub async fn json_body<T: DeserializeOwned>(response: Response) -> T {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }
}

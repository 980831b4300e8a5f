use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;
use tracing::error;

use crate::domain::services::draft_engine::DraftError;
use crate::domain::services::events::EventError;
use crate::domain::services::state_store::StoreError;

/// +----------------------------------------------------------+
/// | STRUCTS | TRAITS | ENUMS | FUNCTIONS                     |
/// +----------+-------+-------+------------------------------+
/// | Enums:                                                   |
/// |   - ApiError                                             |
/// | Types:                                                   |
/// |   - ApiResult                                            |
/// +----------------------------------------------------------+

pub type ApiResult<T> = Result<T, ApiError>;

/// Represents errors that can occur in the API layer.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ApiError {
    /// The requested resource does not exist.
    #[error("Resource not found: {0}")]
    NotFound(String),

    /// The request lost a race with an earlier one.
    #[error("Conflict: {0}")]
    Conflict(String),

    /// The request was malformed or invalid.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// A dependency is down or busy; the request may be retried.
    #[error("Service unavailable: {0}")]
    Unavailable(String),

    /// An internal server error occurred.
    #[error("Internal server error: {0}")]
    Internal(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn message(&self) -> &str {
        match self {
            Self::NotFound(msg)
            | Self::Conflict(msg)
            | Self::BadRequest(msg)
            | Self::Unavailable(msg)
            | Self::Internal(msg) => msg,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = Json(json!({
            "error": {
                "message": self.message(),
                "code": status.as_u16()
            }
        }));

        (status, body).into_response()
    }
}

impl From<DraftError> for ApiError {
    fn from(err: DraftError) -> Self {
        let message = err.to_string();
        match err {
            DraftError::PlayerNotFound(_)
            | DraftError::TeamNotFound(_)
            | DraftError::MessageNotFound(_) => Self::NotFound(message),
            DraftError::AlreadyDrafted(_) => Self::Conflict(message),
            DraftError::Validation(_) => Self::BadRequest(message),
            DraftError::Store(StoreError::Conflict(_) | StoreError::Unavailable(_)) => {
                error!("Draft operation failed: {}", message);
                Self::Unavailable(message)
            }
            DraftError::Store(StoreError::MissingRecord(_)) => {
                error!("Draft operation failed: {}", message);
                Self::Internal(message)
            }
        }
    }
}

impl From<EventError> for ApiError {
    fn from(err: EventError) -> Self {
        Self::Unavailable(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use uuid::Uuid;

    use super::*;

    #[test]
    fn draft_errors_map_to_statuses() {
        let id = Uuid::new_v4();
        let cases = [
            (DraftError::PlayerNotFound(id), StatusCode::NOT_FOUND),
            (DraftError::MessageNotFound(id), StatusCode::NOT_FOUND),
            (DraftError::AlreadyDrafted(id), StatusCode::CONFLICT),
            (
                DraftError::Validation("name must not be empty".to_string()),
                StatusCode::BAD_REQUEST,
            ),
            (
                DraftError::Store(StoreError::Unavailable("lock poisoned".to_string())),
                StatusCode::SERVICE_UNAVAILABLE,
            ),
            (
                DraftError::Store(StoreError::MissingRecord("team".to_string())),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];

        for (err, status) in cases {
            assert_eq!(ApiError::from(err).status(), status);
        }
    }

    #[test]
    fn message_keeps_the_domain_wording() {
        let id = Uuid::new_v4();
        let err = ApiError::from(DraftError::AlreadyDrafted(id));
        assert_eq!(
            err.message(),
            format!("Player {} has already been drafted", id)
        );
        assert_eq!(
            format!("{}", err),
            format!("Conflict: Player {} has already been drafted", id)
        );
    }

    #[test]
    fn closed_hub_is_unavailable() {
        assert_eq!(
            ApiError::from(EventError::Closed).status(),
            StatusCode::SERVICE_UNAVAILABLE
        );
    }
}

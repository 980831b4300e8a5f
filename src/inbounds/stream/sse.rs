use std::convert::Infallible;
use std::sync::Arc;

use axum::{
    Extension,
    response::sse::{Event, KeepAlive, Sse},
};
use futures::{Stream, stream};
use tracing::{debug, warn};

use crate::domain::services::events::SubscriptionGuard;
use crate::inbounds::AppState;
use crate::inbounds::api_error::ApiResult;

/// `GET /events`: one frame per draft event, named after its kind, with
/// `{"type": ..., "payload": {...}}` as data.
///
/// The subscription lives inside the response stream. When the client goes away axum drops the
/// stream and the guard unsubscribes. Idle connections get a `: keepalive` comment every
/// keepalive interval.
pub async fn event_stream(
    Extension(state): Extension<Arc<AppState>>,
) -> ApiResult<Sse<impl Stream<Item = Result<Event, Infallible>>>> {
    let guard = SubscriptionGuard::subscribe(state.events.clone())?;
    debug!("SSE subscriber {} connected", guard.id());

    let events = stream::unfold(guard, |mut guard| async move {
        loop {
            let event = guard.recv().await?;
            match Event::default().event(event.kind()).json_data(&event) {
                Ok(frame) => return Some((Ok::<Event, Infallible>(frame), guard)),
                Err(err) => warn!("Skipping {} on SSE stream: {}", event.kind(), err),
            }
        }
    });

    Ok(Sse::new(events).keep_alive(
        KeepAlive::new()
            .interval(state.keepalive)
            .text("keepalive"),
    ))
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use axum::{http::StatusCode, response::IntoResponse};

    use super::*;
    use crate::domain::services::draft_engine::MockDraftService;
    use crate::domain::services::events::EventBus;

    fn state(events: Arc<EventBus>) -> Arc<AppState> {
        Arc::new(AppState::new(
            Arc::new(MockDraftService::new()),
            events,
            Duration::from_secs(30),
        ))
    }

    #[tokio::test]
    async fn subscribes_on_connect_and_unsubscribes_on_drop() {
        let bus = Arc::new(EventBus::new(8));
        let response = event_stream(Extension(state(bus.clone())))
            .await
            .into_response();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(bus.subscriber_count(), 1);

        drop(response);
        assert_eq!(bus.subscriber_count(), 0);
    }

    #[tokio::test]
    async fn closed_hub_refuses_the_stream() {
        let bus = Arc::new(EventBus::new(8));
        bus.close_all();

        let response = event_stream(Extension(state(bus.clone())))
            .await
            .into_response();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(bus.subscriber_count(), 0);
    }
}

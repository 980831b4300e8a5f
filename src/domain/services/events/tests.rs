#[cfg(test)]
pub mod tests {
    use std::sync::Arc;
    use std::time::{Duration, Instant};

    use serde_json::json;
    use uuid::Uuid;

    use crate::domain::services::events::{
        DraftEvent, EventBus, EventError, EventHub, SubscriptionGuard,
    };

    fn score_event(score: i32) -> DraftEvent {
        DraftEvent::ScoreUpdated {
            player_id: Uuid::nil(),
            score,
        }
    }

    #[tokio::test]
    async fn test_publish_reaches_every_subscriber() {
        let bus = EventBus::new(8);
        let mut first = bus.subscribe().unwrap();
        let mut second = bus.subscribe().unwrap();

        bus.publish(DraftEvent::DraftReset {}).unwrap();

        assert_eq!(first.recv().await, Some(DraftEvent::DraftReset {}));
        assert_eq!(second.recv().await, Some(DraftEvent::DraftReset {}));
    }

    #[tokio::test]
    async fn test_events_arrive_in_publish_order() {
        let bus = EventBus::new(8);
        let mut sub = bus.subscribe().unwrap();

        for score in 0..5 {
            bus.publish(score_event(score)).unwrap();
        }
        for score in 0..5 {
            assert_eq!(sub.recv().await, Some(score_event(score)));
        }
    }

    #[test]
    fn test_publish_never_blocks_on_a_stalled_subscriber() {
        let bus = EventBus::new(10);
        let mut stalled = bus.subscribe().unwrap();

        let started = Instant::now();
        for score in 0..1_000 {
            assert!(bus.publish(score_event(score)).is_ok());
        }
        assert!(started.elapsed() < Duration::from_secs(1));

        let mut seen = Vec::new();
        while let Some(event) = stalled.try_recv() {
            seen.push(event);
        }
        assert_eq!(seen.len(), 10);
        // Oldest events are the ones kept
        assert_eq!(seen, (0..10).map(score_event).collect::<Vec<_>>());
    }

    #[test]
    fn test_full_queue_only_affects_its_own_subscriber() {
        let bus = EventBus::new(2);
        let mut stalled = bus.subscribe().unwrap();
        let mut reader = bus.subscribe().unwrap();

        for score in 0..5 {
            bus.publish(score_event(score)).unwrap();
            assert_eq!(reader.try_recv(), Some(score_event(score)));
        }
        assert_eq!(stalled.try_recv(), Some(score_event(0)));
        assert_eq!(stalled.try_recv(), Some(score_event(1)));
        assert_eq!(stalled.try_recv(), None);
    }

    #[test]
    fn test_unsubscribe_is_safe_for_unknown_and_repeated_ids() {
        let bus = EventBus::new(4);
        let mut other = bus.subscribe().unwrap();
        let sub = bus.subscribe().unwrap();

        assert!(!bus.unsubscribe(Uuid::new_v4()));
        assert!(bus.unsubscribe(sub.id()));
        assert!(!bus.unsubscribe(sub.id()));
        assert_eq!(bus.subscriber_count(), 1);

        bus.publish(DraftEvent::DraftReset {}).unwrap();
        assert_eq!(other.try_recv(), Some(DraftEvent::DraftReset {}));
    }

    #[tokio::test]
    async fn test_unsubscribe_closes_the_queue() {
        let bus = EventBus::new(4);
        let mut sub = bus.subscribe().unwrap();
        bus.publish(DraftEvent::DraftReset {}).unwrap();
        bus.unsubscribe(sub.id());

        assert_eq!(sub.recv().await, Some(DraftEvent::DraftReset {}));
        assert_eq!(sub.recv().await, None);
    }

    #[tokio::test]
    async fn test_close_all_ends_subscriptions_and_refuses_new_ones() {
        let bus = EventBus::new(4);
        let mut sub = bus.subscribe().unwrap();

        bus.close_all();

        assert_eq!(sub.recv().await, None);
        assert_eq!(bus.subscribe().unwrap_err(), EventError::Closed);
        assert_eq!(
            bus.publish(DraftEvent::DraftReset {}).unwrap_err(),
            EventError::Closed
        );
    }

    #[test]
    fn test_dropped_receivers_are_pruned_on_publish() {
        let bus = EventBus::new(4);
        let sub = bus.subscribe().unwrap();
        drop(sub);
        assert_eq!(bus.subscriber_count(), 1);

        bus.publish(DraftEvent::DraftReset {}).unwrap();
        assert_eq!(bus.subscriber_count(), 0);
    }

    #[test]
    fn test_guard_unsubscribes_on_drop() {
        let bus = EventBus::new(4);
        let hub: Arc<dyn EventHub> = Arc::new(bus.clone());

        let guard = SubscriptionGuard::subscribe(hub).unwrap();
        assert_eq!(bus.subscriber_count(), 1);
        drop(guard);
        assert_eq!(bus.subscriber_count(), 0);
    }

    #[test]
    fn test_wire_shape_is_type_and_payload() {
        let player_id = Uuid::new_v4();
        let team_id = Uuid::new_v4();
        let event = DraftEvent::PlayerDrafted {
            player_id,
            team_id,
            pick_number: 3,
        };

        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(
            value,
            json!({
                "type": "player-drafted",
                "payload": {
                    "player_id": player_id,
                    "team_id": team_id,
                    "pick_number": 3
                }
            })
        );
        assert_eq!(event.kind(), "player-drafted");

        let reset = serde_json::to_value(DraftEvent::DraftReset {}).unwrap();
        assert_eq!(reset, json!({"type": "draft-reset", "payload": {}}));
    }

    #[test]
    fn test_kind_matches_serialized_tag() {
        let events = vec![
            DraftEvent::DraftReset {},
            DraftEvent::TeamAdded { team_id: Uuid::nil() },
            DraftEvent::TeamOrderChanged { team_ids: vec![] },
            score_event(1),
            DraftEvent::ChatMessageAdded { message_id: Uuid::nil() },
            DraftEvent::ChatReactionAdded {
                message_id: Uuid::nil(),
                emoji: "🎉".to_string(),
                count: 1,
            },
            DraftEvent::PlayerAdded { player_id: Uuid::nil() },
        ];
        for event in events {
            let value = serde_json::to_value(&event).unwrap();
            assert_eq!(value["type"], event.kind());
        }
    }
}

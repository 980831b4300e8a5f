//--------------------------------------------------------------------------------------------------
// MODULE OVERVIEW
//--------------------------------------------------------------------------------------------------
// Real-time draft room: a transactional draft engine, an in-process event bus that can be bridged
// to a durable topic, and the HTTP/SSE and JSON-RPC surfaces that expose both.
//
// | Module     | Description                                                    |
// |------------|----------------------------------------------------------------|
// | domain     | Draft models, the draft engine, the event bus, the store port  |
// | outbounds  | In-memory store, roster seeding, broker bridge                 |
// | inbounds   | HTTP routes, SSE stream, JSON-RPC over WebSocket               |
// | config     | Startup configuration                                          |
//--------------------------------------------------------------------------------------------------

pub mod config;
pub mod domain;
pub mod inbounds;
pub mod outbounds;

pub use config::{BridgeMode, Config, ConfigError};
pub use domain::models::{
    ChatMessage, DraftPick, DraftSnapshot, DraftState, NewMessage, NewPlayer, NewTeam, Player,
    Team, TeamRef,
};
pub use domain::services::draft_engine::{DraftEngine, DraftError, DraftService};
pub use domain::services::events::{
    DraftEvent, EventBus, EventError, EventHub, EventResult, Subscription, SubscriptionGuard,
};
pub use domain::services::state_store::{StateStore, StoreError};
pub use inbounds::Api;
pub use outbounds::bridge::{BridgeError, BrokerBridge, connect_hub};
pub use outbounds::memory_store::MemoryStore;

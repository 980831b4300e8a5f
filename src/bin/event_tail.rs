//--------------------------------------------------------------------------------------------------
// MODULE OVERVIEW
//--------------------------------------------------------------------------------------------------
// Prints draft events from the durable topic as they arrive, one JSON line each. Attaches to a
// running draft room's embedded broker (its address is logged at startup) or to the RabbitMQ
// exchange of a networked deployment.
//--------------------------------------------------------------------------------------------------

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, bail};
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use broker::{AmqpTopicConfig, DeliverPolicy};
use draft_room::domain::services::events::{EventBus, EventHub};
use draft_room::outbounds::bridge::{
    AmqpTopic, BrokerBridge, EmbeddedTopic, RetryPolicy, TopicConnector,
};

#[derive(Debug, Parser)]
#[command(version, about = "Follow the draft event topic")]
struct Args {
    /// Address of a running embedded broker
    #[arg(long, conflicts_with = "rabbit_url")]
    embedded: Option<SocketAddr>,

    /// RabbitMQ url of a networked deployment
    #[arg(long, env = "RABBIT_URL")]
    rabbit_url: Option<String>,

    /// Stream or exchange name
    #[arg(long, env = "DRAFT_TOPIC", default_value = "draft.events")]
    topic: String,

    /// Replay what the embedded stream still retains before following it
    #[arg(long)]
    history: bool,

    /// Only print these event kinds, e.g. `player-drafted`
    #[arg(long = "kind")]
    kinds: Vec<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "warn".into()))
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let connector: Arc<dyn TopicConnector> = match (args.embedded, &args.rabbit_url) {
        (Some(addr), _) => {
            let policy = if args.history {
                DeliverPolicy::All
            } else {
                DeliverPolicy::New
            };
            // Retention is the owner's business; the stream already exists
            Arc::new(
                EmbeddedTopic::attach(addr, &args.topic, Duration::from_secs(3600))
                    .with_policy(policy),
            )
        }
        (None, Some(url)) => Arc::new(AmqpTopic::new(AmqpTopicConfig {
            url: url.clone(),
            app_id: "event-tail".to_string(),
            exchange: args.topic.clone(),
            consumer_name: None,
            message_ttl: None,
            prefetch: 16,
        })),
        (None, None) => bail!("pass --embedded <addr> or --rabbit-url <url>"),
    };

    info!("Following {}", connector.describe());
    let bridge = BrokerBridge::start(connector, EventBus::default(), RetryPolicy::default())
        .await
        .context("failed to attach to the topic")?;
    let mut subscription = bridge.subscribe()?;

    loop {
        tokio::select! {
            event = subscription.recv() => {
                let Some(event) = event else { break };
                if args.kinds.is_empty() || args.kinds.iter().any(|kind| kind == event.kind()) {
                    println!("{}", serde_json::to_string(&event)?);
                }
            }
            _ = tokio::signal::ctrl_c() => break,
        }
    }

    bridge.close().await;
    Ok(())
}

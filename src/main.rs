//--------------------------------------------------------------------------------------------------
// MODULE OVERVIEW
//--------------------------------------------------------------------------------------------------
// Entry point of the draft room server. Startup order matters: the event hub (and the broker
// bridge behind it) must be connected before any draft operation can run, so seeding and the
// HTTP listener only start once `connect_hub` has returned.
//--------------------------------------------------------------------------------------------------

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use draft_room::config::{BridgeMode, Config};
use draft_room::domain::services::draft_engine::{DraftEngine, DraftService};
use draft_room::inbounds::{Api, AppState};
use draft_room::outbounds::bridge::connect_hub;
use draft_room::outbounds::memory_store::MemoryStore;
use draft_room::outbounds::seed::Seed;

/// Real-time draft room server
#[derive(Debug, Parser)]
#[command(version, about)]
struct Args {
    /// Address to serve HTTP on (overrides DRAFT_HTTP_ADDR)
    #[arg(long)]
    http_addr: Option<SocketAddr>,

    /// local, embedded or networked (overrides DRAFT_BRIDGE_MODE)
    #[arg(long)]
    bridge_mode: Option<BridgeMode>,

    /// Teams and players to load at startup (overrides DRAFT_SEED_FILE)
    #[arg(long)]
    seed_file: Option<PathBuf>,
}

impl Args {
    fn apply(self, config: &mut Config) {
        if let Some(addr) = self.http_addr {
            config.http_addr = addr;
        }
        if let Some(mode) = self.bridge_mode {
            config.bridge_mode = mode;
        }
        if let Some(path) = self.seed_file {
            config.seed_file = Some(path);
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let mut config = Config::try_from_env().context("invalid configuration")?;
    Args::parse().apply(&mut config);
    config.validate().context("invalid configuration")?;
    info!(
        "Starting draft room ({} bridge, topic {})",
        config.bridge_mode, config.topic
    );

    let hub = connect_hub(&config)
        .await
        .context("failed to start the event hub")?;

    let draft: Arc<dyn DraftService> = Arc::new(DraftEngine::new(
        Arc::new(MemoryStore::new()),
        hub.clone(),
    ));

    if let Some(path) = &config.seed_file {
        let seed = Seed::load(path)?;
        seed.apply(draft.as_ref())?;
    }

    let shutdown = CancellationToken::new();
    tokio::spawn(wait_for_signal(shutdown.clone()));

    let api = Api::new(
        config.http_addr,
        AppState::new(draft, hub.clone(), config.keepalive),
    );
    let mut server = tokio::spawn(api.serve(shutdown.clone().cancelled_owned()));

    let result = tokio::select! {
        _ = shutdown.cancelled() => {
            info!("Shutting down");
            // Ends the open event streams so the server can drain
            hub.close().await;
            (&mut server).await
        }
        result = &mut server => result,
    };
    hub.close().await;

    result
        .context("HTTP server task failed")?
        .context("HTTP server failed")?;
    info!("Draft room stopped");
    Ok(())
}

async fn wait_for_signal(shutdown: CancellationToken) {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for ctrl-c: {}", err);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                error!("Failed to listen for SIGTERM: {}", err);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
    shutdown.cancel();
}

//! outpost worker entry point.
//!
//! This is the main binary that serves host lifecycle and fetch events on
//! stdio transport. Logging goes to stderr to avoid interfering with the
//! event protocol on stdout.

use std::sync::Arc;

use anyhow::Result;
use tracing_subscriber::EnvFilter;

use outpost_client::{NetClient, NetConfig};
use outpost_core::{AppConfig, GenerationStore};

mod classify;
mod engine;
mod events;
mod lifecycle;
mod quota;
mod strategies;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .json()
        .init();

    let config = AppConfig::load()?;

    tracing::info!(
        generation = %config.cache_name,
        db_path = %config.db_path.display(),
        "Starting outpost worker on stdio transport"
    );

    let store = GenerationStore::open(&config.db_path).await?;

    let net = NetClient::new(NetConfig {
        user_agent: config.user_agent.clone(),
        max_bytes: config.max_bytes,
        timeout: config.timeout(),
        ..Default::default()
    })?;

    let engine_config = engine::EngineConfig::from_app(&config)?;
    let engine = Arc::new(engine::Engine::new(store, Arc::new(net), engine_config));

    let stdin = tokio::io::BufReader::new(tokio::io::stdin());
    events::serve(engine, stdin, tokio::io::stdout()).await?;

    Ok(())
}

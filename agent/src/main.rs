//! netscope Agent - Main Entry Point

use netscope_agent::config::DEFAULT_CONFIG_PATH;
use netscope_agent::{AgentConfig, NetscopeAgent};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("netscope agent v{}", env!("CARGO_PKG_VERSION"));

    let config_path =
        std::env::var("NETSCOPE_CONFIG").unwrap_or_else(|_| DEFAULT_CONFIG_PATH.into());

    let config = AgentConfig::load(&config_path).unwrap_or_else(|e| {
        tracing::warn!(path = %config_path, error = %e, "config not loaded, using defaults");
        AgentConfig::default()
    });

    NetscopeAgent::new(config).run().await?;

    Ok(())
}

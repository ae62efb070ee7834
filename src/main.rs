//! Local agent gateway (default binary).
//!
//! Hosts the echo agent behind the gateway protocol so a bot can be exercised
//! without the real decision process. Configured through the `TAREBOT_*`
//! environment variables.

use anyhow::{Context, Result};
use tracing::info;

use tarebot::adapter::{check_tcp_listen_available, echo_factory, run_gateway, GatewayConfig};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    let config = GatewayConfig::from_env();
    check_tcp_listen_available(&config.host, config.port)
        .with_context(|| format!("gateway address {} is not available", config.address()))?;

    info!("[Gateway] hosting echo agent (protocol {})", config.protocol_version);
    run_gateway(config, echo_factory(), None).await
}

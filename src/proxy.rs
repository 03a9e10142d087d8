//! Relay orchestration.
//!
//! Builds the long-lived collaborators once, binds transports and runs until
//! Ctrl-C.

use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tracing::info;

use crate::bootstrap::{BootstrapResolver, EndpointDialer};
use crate::config::RelayConfig;
use crate::error::ConfigError;
use crate::handler::TranslationHandler;
use crate::transport::{tcp::TcpTransport, udp::UdpTransport};
use crate::upstream::HttpsUpstream;

/// Configuration for the relay process.
pub struct ProxyConfig {
    /// Local address to bind (e.g., 0.0.0.0:53)
    pub bind_addr: SocketAddr,
    /// Translation settings
    pub relay: RelayConfig,
}

/// Wire bootstrap resolver, dialer and HTTPS client into a handler.
pub fn build_handler(config: RelayConfig) -> Result<TranslationHandler, ConfigError> {
    let bootstrap = Arc::new(BootstrapResolver::from_config(&config)?);
    let dialer = EndpointDialer::new(bootstrap);
    let upstream = Arc::new(HttpsUpstream::new(&config, dialer)?);

    Ok(TranslationHandler::new(config, upstream))
}

/// Run the relay with the given configuration.
///
/// Starts UDP and TCP transports on the bind address and translates every
/// query through the DoH endpoint. Returns on Ctrl-C.
pub async fn run(config: ProxyConfig) -> io::Result<()> {
    let handler = build_handler(config.relay)
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e))?;
    let handler = Arc::new(handler);

    let udp = UdpTransport::bind(config.bind_addr).await?;
    let tcp = TcpTransport::bind(config.bind_addr).await?;

    let relay = handler.config();
    let nameservers: Vec<_> = relay
        .bootstrap_nameservers
        .iter()
        .map(|a| a.to_string())
        .collect();
    info!(
        bind = %config.bind_addr,
        endpoint = %relay.endpoint,
        bootstrap = nameservers.join(", "),
        "DNS relay listening"
    );

    udp.start(handler.clone());
    tcp.start(handler.clone());

    // Log stats every minute
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(60));
        interval.tick().await; // Skip first immediate tick
        loop {
            interval.tick().await;
            let stats = handler.stats_snapshot_and_reset();
            info!(
                requests = stats.requests,
                answered = stats.answered,
                rejected = stats.rejected,
                failed = stats.failed,
                avg_response_ms = format!("{:.2}", stats.avg_response_ms),
                "stats"
            );
        }
    });

    tokio::signal::ctrl_c().await?;
    info!("shutting down");

    Ok(())
}

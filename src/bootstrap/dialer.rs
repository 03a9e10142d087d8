//! Name-resolution hook for the endpoint's HTTPS client.
//!
//! reqwest asks its resolver for the host of every connection it opens. This
//! one ignores the system resolver and answers with the bootstrap address; the
//! default connector then dials `ip:port` and runs TLS against the endpoint
//! hostname.

use std::net::SocketAddr;
use std::sync::Arc;

use futures::FutureExt;
use reqwest::dns::{Addrs, Name, Resolve, Resolving};
use tracing::{debug, warn};

use super::BootstrapResolver;
use crate::error::ResolveError;

/// Dial hook bound to the DoH endpoint.
///
/// Only ever install this on the endpoint's client: whatever host is asked
/// for, it answers with the endpoint's address.
#[derive(Clone)]
pub struct EndpointDialer {
    bootstrap: Arc<BootstrapResolver>,
}

impl EndpointDialer {
    pub fn new(bootstrap: Arc<BootstrapResolver>) -> Self {
        Self { bootstrap }
    }

    /// Address to connect to for `port` on the endpoint.
    pub async fn target(&self, port: u16) -> Result<SocketAddr, ResolveError> {
        let ip = self.bootstrap.resolve().await?;
        Ok(SocketAddr::new(ip, port))
    }

    /// Split `host:port`, resolve the endpoint host and rejoin as `ip:port`.
    pub async fn dial_addr(&self, address: &str) -> Result<SocketAddr, ResolveError> {
        let (host, port) = address
            .rsplit_once(':')
            .and_then(|(host, port)| Some((host, port.parse().ok()?)))
            .ok_or_else(|| ResolveError::InvalidHost(address.to_string()))?;
        if host.trim_start_matches('[').trim_end_matches(']') != self.bootstrap.host() {
            warn!(
                requested = host,
                endpoint = self.bootstrap.host(),
                "dial for foreign host, using endpoint address"
            );
        }
        self.target(port).await
    }
}

impl Resolve for EndpointDialer {
    fn resolve(&self, name: Name) -> Resolving {
        let dialer = self.clone();
        async move {
            // Port 0 is replaced with the URL's port by the connector.
            let addr = dialer.dial_addr(&format!("{}:0", name.as_str())).await?;
            debug!(host = name.as_str(), %addr, "dialing endpoint");
            let addrs: Addrs = Box::new(std::iter::once(addr));
            Ok::<_, Box<dyn std::error::Error + Send + Sync>>(addrs)
        }
        .boxed()
    }
}

//! HTTPS GET against the JSON DoH endpoint.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use tracing::debug;
use url::Url;

use crate::bootstrap::EndpointDialer;
use crate::config::RelayConfig;
use crate::error::{ConfigError, UpstreamError};

/// Fetches the JSON body for a query string.
#[async_trait]
pub trait Upstream: Send + Sync {
    async fn get(&self, query: &str) -> Result<Bytes, UpstreamError>;
}

/// reqwest-backed upstream whose connections are dialed through the bootstrap
/// address.
pub struct HttpsUpstream {
    endpoint: Url,
    timeout: Duration,
    client: reqwest::Client,
}

impl HttpsUpstream {
    pub fn new(config: &RelayConfig, dialer: EndpointDialer) -> Result<Self, ConfigError> {
        // Proxy hosts would be resolved through the dialer too, so proxies are
        // never used.
        let client = reqwest::Client::builder()
            .use_rustls_tls()
            .no_proxy()
            .timeout(config.upstream_timeout)
            .dns_resolver(Arc::new(dialer))
            .build()?;

        Ok(Self {
            endpoint: config.endpoint.clone(),
            timeout: config.upstream_timeout,
            client,
        })
    }

    /// Full request URL for `query`.
    pub fn url(&self, query: &str) -> String {
        request_url(&self.endpoint, query)
    }
}

/// Append `query` to `endpoint`, keeping any query the endpoint already has.
pub fn request_url(endpoint: &Url, query: &str) -> String {
    let separator = match endpoint.query() {
        Some(existing) if !existing.is_empty() => '&',
        _ => '?',
    };
    let base = endpoint.as_str().trim_end_matches('?');
    format!("{base}{separator}{query}")
}

#[async_trait]
impl Upstream for HttpsUpstream {
    async fn get(&self, query: &str) -> Result<Bytes, UpstreamError> {
        let url = self.url(query);
        debug!(%url, "requesting DoH endpoint");

        let request_err = |source: reqwest::Error| UpstreamError::Request {
            url: url.clone(),
            source,
        };

        let response = self.client.get(&url).send().await.map_err(|e| {
            if e.is_timeout() {
                UpstreamError::Timeout(self.timeout, url.clone())
            } else {
                request_err(e)
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(UpstreamError::Status {
                url: url.clone(),
                status: status.as_u16(),
            });
        }

        let body = response.bytes().await.map_err(request_err)?;
        debug!(%url, body_len = body.len(), "DoH response received");
        Ok(body)
    }
}

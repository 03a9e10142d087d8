//! Relay configuration.

use std::net::SocketAddr;
use std::time::Duration;

use url::Url;

use crate::error::ConfigError;

/// Default JSON DoH endpoint.
pub const DEFAULT_ENDPOINT: &str = "https://dns.google.com/resolve";

/// Nameservers used to bootstrap the endpoint's address when none are given.
pub const DEFAULT_BOOTSTRAP_NAMESERVERS: [&str; 2] = ["8.8.8.8:53", "8.8.4.4:53"];

/// Settings consumed by the translation core.
#[derive(Debug, Clone)]
pub struct RelayConfig {
    /// Base URL queries are appended to.
    pub endpoint: Url,
    /// Send `edns_client_subnet=0.0.0.0/0` so the upstream ignores our subnet.
    pub edns_disable: bool,
    /// Ask the upstream to skip DNSSEC validation on every query.
    pub checking_disabled: bool,
    /// Plain-UDP nameservers used only to resolve the endpoint host.
    pub bootstrap_nameservers: Vec<SocketAddr>,
    /// Whole-request bound for the HTTPS GET.
    pub upstream_timeout: Duration,
    /// Bound for each bootstrap nameserver attempt.
    pub bootstrap_timeout: Duration,
}

impl RelayConfig {
    pub fn new(endpoint: Url) -> Self {
        Self {
            endpoint,
            ..Self::default()
        }
    }

    /// Host part of the endpoint URL, the only name the bootstrap resolver handles.
    pub fn endpoint_host(&self) -> Result<String, ConfigError> {
        self.endpoint
            .host_str()
            .map(|h| h.trim_start_matches('[').trim_end_matches(']').to_string())
            .filter(|h| !h.is_empty())
            .ok_or_else(|| ConfigError::MissingHost(self.endpoint.to_string()))
    }
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            endpoint: Url::parse(DEFAULT_ENDPOINT).expect("default endpoint is a valid URL"),
            edns_disable: false,
            checking_disabled: false,
            bootstrap_nameservers: DEFAULT_BOOTSTRAP_NAMESERVERS
                .iter()
                .filter_map(|s| s.parse().ok())
                .collect(),
            upstream_timeout: Duration::from_secs(5),
            bootstrap_timeout: Duration::from_secs(2),
        }
    }
}

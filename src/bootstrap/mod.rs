//! Bootstrap resolution of the DoH endpoint host.
//!
//! The HTTPS connection to the endpoint must not depend on the system resolver
//! (which may well be this relay). `BootstrapResolver` asks a fixed list of
//! nameservers over plain UDP for the endpoint's A record and caches the answer
//! for its TTL. `EndpointDialer` plugs it into the HTTPS client.

mod dialer;
mod exchange;

pub use dialer::EndpointDialer;
pub use exchange::{Exchange, UdpExchange};

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;

use hickory_proto::op::{Message, MessageType, OpCode, Query, ResponseCode};
use hickory_proto::rr::{Name, RData, RecordType};
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::config::RelayConfig;
use crate::error::{ConfigError, ResolveError};

struct CacheEntry {
    ip: Ipv4Addr,
    valid_until: Instant,
}

/// What the endpoint host names.
enum Target {
    /// IP literal, served as-is.
    Literal(IpAddr),
    /// Hostname looked up as an A record.
    Lookup(Name),
}

/// Resolves one hostname to an IPv4 address.
///
/// Bound to its hostname for life. IP literals of either family are returned
/// without a lookup. The cache lock is held across the lookup, so
/// concurrent callers that find the cache cold wait for a single lookup instead
/// of racing their own.
pub struct BootstrapResolver {
    host: String,
    target: Target,
    nameservers: Vec<SocketAddr>,
    timeout: Duration,
    exchange: Arc<dyn Exchange>,
    cache: Mutex<Option<CacheEntry>>,
}

impl BootstrapResolver {
    /// Resolver for `host` querying `nameservers` in order over UDP.
    pub fn new(
        host: &str,
        nameservers: Vec<SocketAddr>,
        timeout: Duration,
    ) -> Result<Self, ResolveError> {
        Self::with_exchange(host, nameservers, timeout, Arc::new(UdpExchange))
    }

    pub fn with_exchange(
        host: &str,
        nameservers: Vec<SocketAddr>,
        timeout: Duration,
        exchange: Arc<dyn Exchange>,
    ) -> Result<Self, ResolveError> {
        let target = match host.parse::<IpAddr>() {
            Ok(ip) => Target::Literal(ip),
            Err(_) => {
                let mut name = Name::from_ascii(host)
                    .map_err(|_| ResolveError::InvalidHost(host.to_string()))?;
                name.set_fqdn(true);
                Target::Lookup(name)
            }
        };

        Ok(Self {
            host: host.to_string(),
            target,
            nameservers,
            timeout,
            exchange,
            cache: Mutex::new(None),
        })
    }

    /// Resolver for the endpoint host named in `config`.
    pub fn from_config(config: &RelayConfig) -> Result<Self, ConfigError> {
        if config.bootstrap_nameservers.is_empty() {
            return Err(ConfigError::NoNameservers);
        }
        let host = config.endpoint_host()?;
        Ok(Self::new(
            &host,
            config.bootstrap_nameservers.clone(),
            config.bootstrap_timeout,
        )?)
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    /// Return the host's address, from cache while its TTL lasts.
    ///
    /// Nameservers are tried once each, in order; the first reply with an A
    /// record wins. When all fail the cache is left as it was.
    pub async fn resolve(&self) -> Result<IpAddr, ResolveError> {
        let name = match &self.target {
            Target::Literal(ip) => return Ok(*ip),
            Target::Lookup(name) => name,
        };

        let mut cache = self.cache.lock().await;
        if let Some(entry) = cache.as_ref().filter(|e| Instant::now() < e.valid_until) {
            return Ok(IpAddr::V4(entry.ip));
        }

        let query = query(name);
        for &server in &self.nameservers {
            let response = match self.exchange.exchange(&query, server, self.timeout).await {
                Ok(r) => r,
                Err(e) => {
                    warn!(host = %self.host, %server, error = %e, "bootstrap nameserver failed");
                    continue;
                }
            };

            let Some((ip, ttl)) = first_a_record(&response) else {
                warn!(
                    host = %self.host,
                    %server,
                    rcode = ?response.response_code(),
                    "bootstrap nameserver returned no A record"
                );
                continue;
            };

            debug!(host = %self.host, %server, %ip, ttl, "bootstrap resolved");
            *cache = Some(CacheEntry {
                ip,
                valid_until: Instant::now() + Duration::from_secs(ttl.into()),
            });
            return Ok(IpAddr::V4(ip));
        }

        Err(ResolveError::Exhausted {
            host: self.host.clone(),
            tried: self.nameservers.len(),
        })
    }

}

fn query(name: &Name) -> Message {
    let mut msg = Message::new();
    msg.set_id(rand::random())
        .set_message_type(MessageType::Query)
        .set_op_code(OpCode::Query)
        .set_recursion_desired(true);
    msg.add_query(Query::query(name.clone(), RecordType::A));
    msg
}

/// First A record of a successful reply, with its TTL.
fn first_a_record(response: &Message) -> Option<(Ipv4Addr, u32)> {
    if response.response_code() != ResponseCode::NoError {
        return None;
    }
    response
        .answers()
        .iter()
        .find_map(|record| match record.data() {
            Some(RData::A(a)) => Some((a.0, record.ttl())),
            _ => None,
        })
}

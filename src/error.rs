//! Error types for the relay.
//!
//! Nothing here crosses the handler boundary: every variant ends up as a DNS
//! reply code (see `handler`).

use std::net::SocketAddr;

use hickory_proto::op::ResponseCode;
use thiserror::Error;

/// Why an inbound query was refused before any upstream work.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    #[error("request carries {0} questions")]
    MultipleQuestions(usize),

    #[error("request carries no question")]
    NoQuestion,

    #[error("recursion not desired")]
    RecursionNotDesired,

    #[error("DNSSEC requested (DO bit set)")]
    DnssecRequested,

    #[error("unsupported query class {0}")]
    UnsupportedClass(u16),
}

impl RejectReason {
    /// Reply code sent back for this rejection.
    pub fn response_code(self) -> ResponseCode {
        match self {
            RejectReason::MultipleQuestions(_) => ResponseCode::NotImp,
            RejectReason::NoQuestion => ResponseCode::FormErr,
            RejectReason::RecursionNotDesired => ResponseCode::NotImp,
            RejectReason::DnssecRequested => ResponseCode::FormErr,
            RejectReason::UnsupportedClass(_) => ResponseCode::ServFail,
        }
    }
}

/// Failure talking to the DoH endpoint.
#[derive(Error, Debug)]
pub enum UpstreamError {
    #[error("timeout after {0:?} waiting for {1}")]
    Timeout(std::time::Duration, String),

    #[error("request to {url} failed: {source}")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{url} returned HTTP {status}")]
    Status { url: String, status: u16 },
}

/// Failure turning a DoH JSON body into a DNS reply.
#[derive(Error, Debug)]
pub enum DecodeError {
    #[error("malformed JSON body: {0}")]
    Json(#[from] serde_json::Error),

    #[error("status {0} has no DNS reply code")]
    UnknownStatus(u16),

    #[error("invalid owner name in `{line}`: {reason}")]
    InvalidName { line: String, reason: String },

    #[error("invalid record `{line}`: {reason}")]
    InvalidRecord { line: String, reason: String },
}

/// Failure of a single bootstrap DNS exchange.
#[derive(Error, Debug)]
pub enum ExchangeError {
    #[error("I/O error talking to {server}: {source}")]
    Io {
        server: SocketAddr,
        #[source]
        source: std::io::Error,
    },

    #[error("timeout waiting for {0}")]
    Timeout(SocketAddr),

    #[error("codec error: {0}")]
    Proto(#[from] hickory_proto::error::ProtoError),
}

/// Bootstrap resolution failure.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ResolveError {
    #[error("invalid bootstrap hostname '{0}'")]
    InvalidHost(String),

    #[error("unable to resolve '{host}' via {tried} nameserver(s)")]
    Exhausted { host: String, tried: usize },
}

/// Invalid relay configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("endpoint '{0}' has no host")]
    MissingHost(String),

    #[error("no bootstrap nameservers configured")]
    NoNameservers,

    #[error(transparent)]
    Bootstrap(#[from] ResolveError),

    #[error("failed to build HTTPS client: {0}")]
    Client(#[from] reqwest::Error),
}

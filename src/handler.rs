//! DNS request translation.
//!
//! Handles the core query pipeline:
//! 1. Validate the inbound message
//! 2. Encode the question as a DoH query string
//! 3. GET it from the endpoint
//! 4. Decode the JSON body into the reply
//!
//! Transports handle the actual I/O, the handler produces exactly one reply per
//! request. Every failure becomes a reply code.

use std::sync::Arc;
use std::time::Instant;

use hickory_proto::op::{Message, ResponseCode};
use tracing::{debug, error};

use crate::config::RelayConfig;
use crate::doh::{self, reply};
use crate::stats::{Stats, StatsSnapshot};
use crate::upstream::Upstream;
use crate::validate::validate;

/// Translates DNS queries into DoH requests and back.
///
/// Expensive collaborators (the HTTPS client and, through it, the bootstrap
/// resolver) are built once by the caller and injected here.
pub struct TranslationHandler {
    config: RelayConfig,
    upstream: Arc<dyn Upstream>,
    stats: Stats,
}

impl TranslationHandler {
    pub fn new(config: RelayConfig, upstream: Arc<dyn Upstream>) -> Self {
        Self {
            config,
            upstream,
            stats: Stats::new(),
        }
    }

    /// Produce the reply for `request`. Never fails.
    pub async fn handle(&self, request: &Message) -> Message {
        let start = Instant::now();

        let question = match validate(request) {
            Ok(q) => q,
            Err(reason) => {
                self.stats.record_rejected(start.elapsed());
                return reply(request, reason.response_code());
            }
        };

        let query = doh::encode(question, &self.config, request.checking_disabled());

        let body = match self.upstream.get(&query).await {
            Ok(body) => body,
            Err(e) => {
                error!(id = request.id(), error = %e, "DoH request failed");
                self.stats.record_failed(start.elapsed());
                return reply(request, ResponseCode::ServFail);
            }
        };

        match doh::decode(&body, request) {
            Ok(response) => {
                debug!(
                    id = request.id(),
                    rcode = ?response.response_code(),
                    answers = response.answers().len(),
                    "translated DoH response"
                );
                self.stats.record_answered(start.elapsed());
                response
            }
            Err(e) => {
                error!(id = request.id(), error = %e, "unable to build reply from DoH response");
                self.stats.record_failed(start.elapsed());
                reply(request, ResponseCode::ServFail)
            }
        }
    }

    pub fn config(&self) -> &RelayConfig {
        &self.config
    }

    pub fn stats_snapshot_and_reset(&self) -> StatsSnapshot {
        self.stats.snapshot_and_reset()
    }
}

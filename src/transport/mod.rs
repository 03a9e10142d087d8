//! Transport layer for the relay.
//!
//! Provides UDP and TCP listeners that receive DNS queries from clients,
//! decode them, pass them to the `TranslationHandler` and write back its reply.

pub mod tcp;
pub mod udp;

/// Maximum size of a DNS packet (with some headroom).
pub const MAX_DNS_PACKET_SIZE: usize = 4096;

use std::time::Duration;

use hickory_proto::op::Message;
use tracing::info;

/// Transport protocol identifier for logging.
#[derive(Debug, Clone, Copy)]
pub enum Protocol {
    Tcp,
    Udp,
}

impl Protocol {
    fn as_str(self) -> &'static str {
        match self {
            Protocol::Tcp => "TCP",
            Protocol::Udp => "UDP",
        }
    }
}

/// Logger for answered queries.
#[derive(Debug, Clone, Copy)]
pub struct QueryLogger {
    protocol: Protocol,
}

impl QueryLogger {
    pub fn new(protocol: Protocol) -> Self {
        Self { protocol }
    }

    pub fn answered(&self, reply: &Message, elapsed: Duration) {
        let name = reply
            .queries()
            .first()
            .map(|q| q.name().to_ascii())
            .unwrap_or_else(|| "<none>".to_string());
        info!(
            protocol = self.protocol.as_str(),
            id = reply.id(),
            %name,
            rcode = ?reply.response_code(),
            answers = reply.answers().len(),
            total_ms = elapsed.as_secs_f64() * 1000.0,
            "answered"
        );
    }
}

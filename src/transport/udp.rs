//! UDP transport for DNS queries.
//!
//! Each datagram is decoded and handled on its own task; the reply goes back
//! to the datagram's source address.

use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use hickory_proto::op::Message;
use hickory_proto::serialize::binary::BinEncodable;
use tokio::net::UdpSocket;
use tracing::{debug, error};

use super::{MAX_DNS_PACKET_SIZE, Protocol, QueryLogger};
use crate::handler::TranslationHandler;

/// UDP listener for the relay.
pub struct UdpTransport {
    socket: Arc<UdpSocket>,
}

impl UdpTransport {
    /// Bind the listening socket.
    pub async fn bind(addr: SocketAddr) -> io::Result<Self> {
        let socket = Arc::new(UdpSocket::bind(addr).await?);

        Ok(Self { socket })
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.socket.local_addr()
    }

    /// Start the UDP transport.
    ///
    /// Spawns the receive loop; every request is handled on its own task.
    pub fn start(self, handler: Arc<TranslationHandler>) {
        tokio::spawn(run(self.socket, handler));
    }
}

/// Receive loop.
async fn run(socket: Arc<UdpSocket>, handler: Arc<TranslationHandler>) {
    let logger = QueryLogger::new(Protocol::Udp);
    let mut buf = [0u8; MAX_DNS_PACKET_SIZE];

    loop {
        let (len, src) = match socket.recv_from(&mut buf).await {
            Ok(r) => r,
            Err(e) => {
                error!(error = %e, "UDP recv error");
                continue;
            }
        };

        let request = match Message::from_vec(&buf[..len]) {
            Ok(msg) => msg,
            Err(e) => {
                debug!(%src, len, error = %e, "dropping undecodable datagram");
                continue;
            }
        };

        tokio::spawn(respond(socket.clone(), handler.clone(), logger, request, src));
    }
}

async fn respond(
    socket: Arc<UdpSocket>,
    handler: Arc<TranslationHandler>,
    logger: QueryLogger,
    request: Message,
    src: SocketAddr,
) {
    let start_time = Instant::now();
    let reply = handler.handle(&request).await;

    let bytes = match reply.to_bytes() {
        Ok(b) => b,
        Err(e) => {
            error!(id = reply.id(), error = %e, "failed to encode reply");
            return;
        }
    };

    if let Err(e) = socket.send_to(&bytes, src).await {
        error!(%src, error = %e, "UDP response error");
        return;
    }
    logger.answered(&reply, start_time.elapsed());
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RelayConfig;
    use crate::error::UpstreamError;
    use crate::upstream::Upstream;
    use async_trait::async_trait;
    use bytes::Bytes;
    use hickory_proto::op::{Query, ResponseCode};
    use hickory_proto::rr::{Name, RecordType};
    use std::str::FromStr;
    use std::time::Duration;

    struct StaticUpstream;

    #[async_trait]
    impl Upstream for StaticUpstream {
        async fn get(&self, _query: &str) -> Result<Bytes, UpstreamError> {
            Ok(Bytes::from_static(
                br#"{"Status":0,"Answer":[{"name":"example.com.","type":1,"TTL":60,"data":"192.0.2.1"}]}"#,
            ))
        }
    }

    #[tokio::test]
    async fn answers_query_over_udp() {
        let transport = UdpTransport::bind("127.0.0.1:0".parse().unwrap()).await.unwrap();
        let addr = transport.local_addr().unwrap();
        transport.start(Arc::new(TranslationHandler::new(
            RelayConfig::default(),
            Arc::new(StaticUpstream),
        )));

        let client = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let mut query = Message::new();
        query.set_id(99).set_recursion_desired(true);
        query.add_query(Query::query(Name::from_str("example.com.").unwrap(), RecordType::A));
        client.send_to(&query.to_bytes().unwrap(), addr).await.unwrap();

        let mut buf = [0u8; MAX_DNS_PACKET_SIZE];
        let (len, _) = tokio::time::timeout(Duration::from_secs(2), client.recv_from(&mut buf))
            .await
            .unwrap()
            .unwrap();
        let reply = Message::from_vec(&buf[..len]).unwrap();

        assert_eq!(reply.id(), 99);
        assert_eq!(reply.response_code(), ResponseCode::NoError);
        assert_eq!(reply.answers().len(), 1);
    }
}

//! Single-shot DNS exchange over plain UDP.

use std::net::{Ipv4Addr, Ipv6Addr, SocketAddr};
use std::time::Duration;

use async_trait::async_trait;
use hickory_proto::op::Message;
use hickory_proto::serialize::binary::BinEncodable;
use tokio::net::UdpSocket;
use tracing::debug;

use crate::error::ExchangeError;

/// Maximum UDP DNS response size with EDNS(0).
const MAX_UDP_RESPONSE_SIZE: usize = 4096;

/// Sends one query to one nameserver and waits for its reply.
#[async_trait]
pub trait Exchange: Send + Sync {
    async fn exchange(
        &self,
        query: &Message,
        server: SocketAddr,
        timeout: Duration,
    ) -> Result<Message, ExchangeError>;
}

/// Exchange over an ephemeral UDP socket.
#[derive(Debug, Default, Clone, Copy)]
pub struct UdpExchange;

#[async_trait]
impl Exchange for UdpExchange {
    async fn exchange(
        &self,
        query: &Message,
        server: SocketAddr,
        timeout: Duration,
    ) -> Result<Message, ExchangeError> {
        let bytes = query.to_bytes()?;

        tokio::time::timeout(timeout, send_and_receive(&bytes, query.id(), server))
            .await
            .map_err(|_| ExchangeError::Timeout(server))?
    }
}

async fn send_and_receive(
    bytes: &[u8],
    id: u16,
    server: SocketAddr,
) -> Result<Message, ExchangeError> {
    let io_err = |source| ExchangeError::Io { server, source };

    let bind_addr: SocketAddr = if server.is_ipv4() {
        (Ipv4Addr::UNSPECIFIED, 0).into()
    } else {
        (Ipv6Addr::UNSPECIFIED, 0).into()
    };
    let socket = UdpSocket::bind(bind_addr).await.map_err(io_err)?;
    socket.connect(server).await.map_err(io_err)?;
    socket.send(bytes).await.map_err(io_err)?;

    let mut buf = vec![0u8; MAX_UDP_RESPONSE_SIZE];
    loop {
        let len = socket.recv(&mut buf).await.map_err(io_err)?;
        let response = match Message::from_vec(&buf[..len]) {
            Ok(msg) => msg,
            Err(e) => {
                debug!(%server, error = %e, "discarding undecodable reply");
                continue;
            }
        };
        if response.id() != id {
            debug!(%server, expected = id, got = response.id(), "discarding reply with foreign id");
            continue;
        }
        return Ok(response);
    }
}

//! TCP transport for DNS queries.
//!
//! Each client connection is handled independently. TCP DNS messages are
//! prefixed with a 2-byte length; a client may send several on one connection
//! and gets the replies in order.

use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use hickory_proto::op::Message;
use hickory_proto::serialize::binary::BinEncodable;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tracing::{debug, error};

use super::{Protocol, QueryLogger};
use crate::handler::TranslationHandler;

/// TCP listener for the relay.
///
/// Each accepted connection is handled in a separate task.
pub struct TcpTransport {
    listener: TcpListener,
}

impl TcpTransport {
    /// Bind a TCP listener for the transport.
    pub async fn bind(addr: SocketAddr) -> io::Result<Self> {
        let listener = TcpListener::bind(addr).await?;

        Ok(Self { listener })
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Start the TCP transport.
    pub fn start(self, handler: Arc<TranslationHandler>) {
        tokio::spawn(run_accept_loop(self.listener, handler));
    }
}

/// Accept loop - spawns a handler task for each incoming connection.
async fn run_accept_loop(listener: TcpListener, handler: Arc<TranslationHandler>) {
    loop {
        match listener.accept().await {
            Ok((client, peer)) => {
                tokio::spawn(handle_connection(client, peer, handler.clone()));
            }
            Err(e) => {
                error!(error = %e, "TCP accept error");
            }
        }
    }
}

/// Serve queries on one connection until EOF or a framing error.
async fn handle_connection(
    mut client: TcpStream,
    peer: SocketAddr,
    handler: Arc<TranslationHandler>,
) {
    let logger = QueryLogger::new(Protocol::Tcp);

    loop {
        let message = match read_dns_message(&mut client).await {
            Ok(Some(m)) => m,
            Ok(None) => return,
            Err(e) => {
                debug!(%peer, error = %e, "closing TCP connection");
                return;
            }
        };

        let request = match Message::from_vec(&message) {
            Ok(msg) => msg,
            Err(e) => {
                debug!(%peer, error = %e, "closing TCP connection on undecodable message");
                return;
            }
        };

        let start_time = Instant::now();
        let reply = handler.handle(&request).await;

        if let Err(e) = write_dns_message(&mut client, &reply).await {
            debug!(%peer, error = %e, "TCP write error");
            return;
        }
        logger.answered(&reply, start_time.elapsed());
    }
}

/// Read one length-prefixed DNS message, without its prefix.
///
/// Returns `None` on a clean EOF between messages.
async fn read_dns_message(stream: &mut TcpStream) -> io::Result<Option<Vec<u8>>> {
    let msg_len = match stream.read_u16().await {
        Ok(n) => n as usize,
        Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => return Ok(None),
        Err(e) => return Err(e),
    };

    let mut buf = vec![0u8; msg_len];
    stream.read_exact(&mut buf).await?;

    Ok(Some(buf))
}

async fn write_dns_message(stream: &mut TcpStream, reply: &Message) -> io::Result<()> {
    let bytes = reply
        .to_bytes()
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
    let len = u16::try_from(bytes.len())
        .map_err(|_| io::Error::new(io::ErrorKind::InvalidData, "reply exceeds 65535 bytes"))?;

    let mut framed = Vec::with_capacity(bytes.len() + 2);
    framed.extend_from_slice(&len.to_be_bytes());
    framed.extend_from_slice(&bytes);
    stream.write_all(&framed).await
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

    struct StaticUpstream;

    #[async_trait]
    impl Upstream for StaticUpstream {
        async fn get(&self, _query: &str) -> Result<Bytes, UpstreamError> {
            Ok(Bytes::from_static(br#"{"Status":3}"#))
        }
    }

    fn query(id: u16) -> Vec<u8> {
        let mut msg = Message::new();
        msg.set_id(id).set_recursion_desired(true);
        msg.add_query(Query::query(Name::from_str("nope.example.").unwrap(), RecordType::A));
        let bytes = msg.to_bytes().unwrap();

        let mut framed = (bytes.len() as u16).to_be_bytes().to_vec();
        framed.extend_from_slice(&bytes);
        framed
    }

    async fn read_reply(stream: &mut TcpStream) -> Message {
        let len = stream.read_u16().await.unwrap() as usize;
        let mut buf = vec![0u8; len];
        stream.read_exact(&mut buf).await.unwrap();
        Message::from_vec(&buf).unwrap()
    }

    #[tokio::test]
    async fn answers_pipelined_queries_in_order() {
        let transport = TcpTransport::bind("127.0.0.1:0".parse().unwrap()).await.unwrap();
        let addr = transport.local_addr().unwrap();
        transport.start(Arc::new(TranslationHandler::new(
            RelayConfig::default(),
            Arc::new(StaticUpstream),
        )));

        let mut client = TcpStream::connect(addr).await.unwrap();
        let mut both = query(1);
        both.extend(query(2));
        client.write_all(&both).await.unwrap();

        let first = read_reply(&mut client).await;
        let second = read_reply(&mut client).await;

        assert_eq!(first.id(), 1);
        assert_eq!(second.id(), 2);
        assert_eq!(first.response_code(), ResponseCode::NXDomain);
    }
}

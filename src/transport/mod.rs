//! Byte transports
//!
//! The link only needs "bytes in, bytes out". A [`Connector`] opens an
//! endpoint described by a [`ConnectionConfig`] and hands back the two halves
//! of the connection, so the receive task can own the reader while senders
//! share the writer.
//!
//! # Endpoints
//!
//! - **UDP server**: binds `0.0.0.0:port` and learns the peer from the first
//!   datagram. Sending before that fails with [`TransportError::IoError`].
//! - **UDP client**: sends to a fixed `host:port` and accepts datagrams from
//!   any source.
//! - **TCP client**: a stream with opaque boundaries; the frame decoder
//!   reassembles frames split across reads.
//!
//! Closing is done by dropping the halves. A receive blocked in the
//! reader is unblocked by the session's cancellation signal, not by the
//! transport.

pub mod tcp;
pub mod udp;

use async_trait::async_trait;
use log::info;
use thiserror::Error;

use crate::config::{ConnectionConfig, Endpoint};

/// Transport error types
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    /// Host name did not resolve to any address
    #[error("cannot resolve address {0}")]
    AddressUnresolvable(String),

    /// Local socket could not be bound
    #[error("bind failed: {0}")]
    BindFailed(String),

    /// Remote endpoint refused or was unreachable
    #[error("connect failed: {0}")]
    ConnectFailed(String),

    /// Peer closed the connection
    #[error("connection closed by peer")]
    IoClosed,

    /// Any other I/O failure
    #[error("I/O error: {0}")]
    IoError(String),
}

impl From<std::io::Error> for TransportError {
    fn from(err: std::io::Error) -> Self {
        use std::io::ErrorKind;
        match err.kind() {
            ErrorKind::UnexpectedEof
            | ErrorKind::ConnectionReset
            | ErrorKind::ConnectionAborted
            | ErrorKind::BrokenPipe => TransportError::IoClosed,
            _ => TransportError::IoError(err.to_string()),
        }
    }
}

/// Receiving half of a connection
#[async_trait]
pub trait TransportRx: Send {
    /// Wait for the next chunk of bytes
    ///
    /// # Returns
    ///
    /// - `Ok(n)` - `buf[..n]` holds received bytes (n ≥ 1)
    /// - `Err(TransportError::IoClosed)` - peer closed the connection
    /// - `Err(_)` - terminal I/O failure
    async fn recv(&mut self, buf: &mut [u8]) -> Result<usize, TransportError>;
}

/// Sending half of a connection
#[async_trait]
pub trait TransportTx: Send {
    /// Write all of `bytes` as one unit (one datagram for UDP).
    async fn send(&mut self, bytes: &[u8]) -> Result<(), TransportError>;

    /// Flush and release the underlying endpoint. Safe to call repeatedly.
    async fn close(&mut self) {}
}

/// An open connection split into halves
pub struct Connected {
    pub rx: Box<dyn TransportRx>,
    pub tx: Box<dyn TransportTx>,
    /// Human-readable endpoint for logs
    pub description: String,
}

/// Opens connections
///
/// The session talks to the network only through this trait, which lets tests
/// substitute an in-memory link.
#[async_trait]
pub trait Connector: Send + Sync {
    async fn connect(&self, config: &ConnectionConfig) -> Result<Connected, TransportError>;
}

/// Connector for real UDP and TCP sockets
#[derive(Debug, Clone, Copy, Default)]
pub struct SocketConnector;

#[async_trait]
impl Connector for SocketConnector {
    async fn connect(&self, config: &ConnectionConfig) -> Result<Connected, TransportError> {
        let connected = match config.endpoint() {
            Endpoint::UdpServer { port } => udp::listen(port).await?,
            Endpoint::UdpClient { host, port } => udp::connect(&host, port).await?,
            Endpoint::TcpClient { host, port } => tcp::connect(&host, port).await?,
        };
        info!("Transport open: {}", connected.description);
        Ok(connected)
    }
}

/// Resolve `host:port` to the first address it maps to.
pub(crate) async fn resolve(host: &str, port: u16) -> Result<std::net::SocketAddr, TransportError> {
    let target = format!("{host}:{port}");
    tokio::net::lookup_host((host, port))
        .await
        .map_err(|_| TransportError::AddressUnresolvable(target.clone()))?
        .next()
        .ok_or(TransportError::AddressUnresolvable(target))
}

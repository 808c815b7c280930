//! UDP transport
//!
//! Both modes share one socket between the halves. A server learns its peer
//! from the first datagram it receives; a client sends to a fixed address but
//! accepts datagrams from anyone.

use std::net::SocketAddr;
use std::sync::Arc;

use async_trait::async_trait;
use log::{info, warn};
use parking_lot::Mutex;
use tokio::net::UdpSocket;

use super::{resolve, Connected, TransportError, TransportRx, TransportTx};

/// Peer address shared between the halves of a server socket
type PeerSlot = Arc<Mutex<Option<SocketAddr>>>;

/// Bind `0.0.0.0:port` and wait for a peer to speak first.
pub async fn listen(port: u16) -> Result<Connected, TransportError> {
    let socket = UdpSocket::bind(("0.0.0.0", port))
        .await
        .map_err(|e| TransportError::BindFailed(format!("0.0.0.0:{port}: {e}")))?;
    let local = socket.local_addr()?;
    let socket = Arc::new(socket);
    let peer: PeerSlot = Arc::new(Mutex::new(None));

    Ok(Connected {
        rx: Box::new(UdpRx {
            socket: socket.clone(),
            peer: Some(peer.clone()),
        }),
        tx: Box::new(UdpTx {
            socket,
            target: Target::Learned(peer),
        }),
        description: format!("udp listen {local}"),
    })
}

/// Open a socket that sends to `host:port`.
pub async fn connect(host: &str, port: u16) -> Result<Connected, TransportError> {
    let remote = resolve(host, port).await?;
    let bind_addr: SocketAddr = if remote.is_ipv4() {
        ([0, 0, 0, 0], 0).into()
    } else {
        ([0u16; 8], 0).into()
    };
    let socket = UdpSocket::bind(bind_addr)
        .await
        .map_err(|e| TransportError::BindFailed(format!("{bind_addr}: {e}")))?;
    let socket = Arc::new(socket);

    Ok(Connected {
        rx: Box::new(UdpRx {
            socket: socket.clone(),
            peer: None,
        }),
        tx: Box::new(UdpTx {
            socket,
            target: Target::Fixed(remote),
        }),
        description: format!("udp {remote}"),
    })
}

struct UdpRx {
    socket: Arc<UdpSocket>,
    /// Set for server sockets, which record the first sender
    peer: Option<PeerSlot>,
}

#[async_trait]
impl TransportRx for UdpRx {
    async fn recv(&mut self, buf: &mut [u8]) -> Result<usize, TransportError> {
        loop {
            let (n, from) = self.socket.recv_from(buf).await?;
            if let Some(peer) = &self.peer {
                let mut slot = peer.lock();
                if slot.is_none() {
                    info!("UDP peer discovered: {from}");
                    *slot = Some(from);
                }
            }
            // Empty datagrams carry nothing for the decoder
            if n > 0 {
                return Ok(n);
            }
        }
    }
}

enum Target {
    Fixed(SocketAddr),
    Learned(PeerSlot),
}

struct UdpTx {
    socket: Arc<UdpSocket>,
    target: Target,
}

#[async_trait]
impl TransportTx for UdpTx {
    async fn send(&mut self, bytes: &[u8]) -> Result<(), TransportError> {
        let addr = match &self.target {
            Target::Fixed(addr) => *addr,
            Target::Learned(peer) => {
                let known = *peer.lock();
                known.ok_or_else(|| TransportError::IoError("no UDP peer yet".into()))?
            }
        };

        let sent = self.socket.send_to(bytes, addr).await?;
        if sent != bytes.len() {
            warn!("Short UDP send to {addr}: {sent}/{} bytes", bytes.len());
            return Err(TransportError::IoError(format!(
                "short send: {sent}/{} bytes",
                bytes.len()
            )));
        }
        Ok(())
    }
}

//! TCP client transport

use async_trait::async_trait;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;

use super::{resolve, Connected, TransportError, TransportRx, TransportTx};

/// Connect to `host:port`.
pub async fn connect(host: &str, port: u16) -> Result<Connected, TransportError> {
    let remote = resolve(host, port).await?;
    let stream = TcpStream::connect(remote)
        .await
        .map_err(|e| TransportError::ConnectFailed(format!("{remote}: {e}")))?;
    // Disable Nagle for small frames
    stream.set_nodelay(true)?;

    let (rx, tx) = stream.into_split();
    Ok(Connected {
        rx: Box::new(TcpRx { stream: rx }),
        tx: Box::new(TcpTx {
            stream: Some(tx),
        }),
        description: format!("tcp {remote}"),
    })
}

struct TcpRx {
    stream: OwnedReadHalf,
}

#[async_trait]
impl TransportRx for TcpRx {
    async fn recv(&mut self, buf: &mut [u8]) -> Result<usize, TransportError> {
        match self.stream.read(buf).await? {
            0 => Err(TransportError::IoClosed),
            n => Ok(n),
        }
    }
}

struct TcpTx {
    /// `None` once closed
    stream: Option<OwnedWriteHalf>,
}

#[async_trait]
impl TransportTx for TcpTx {
    async fn send(&mut self, bytes: &[u8]) -> Result<(), TransportError> {
        let stream = self.stream.as_mut().ok_or(TransportError::IoClosed)?;
        stream.write_all(bytes).await?;
        Ok(())
    }

    async fn close(&mut self) {
        if let Some(mut stream) = self.stream.take() {
            let _ = stream.shutdown().await;
        }
    }
}

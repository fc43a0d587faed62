//! Outbound channels for zone snapshots.
//!
//! The publisher depends on the [`PublishSink`] trait rather than a socket,
//! so the transport can be swapped or recorded in tests.

use async_trait::async_trait;
use bytes::Bytes;
use tokio::net::UdpSocket;

use super::PublishResult;

/// Delivers one serialized snapshot to the controlling process.
#[async_trait]
pub trait PublishSink: Send + Sync {
    async fn send(&self, payload: Bytes) -> PublishResult<()>;
}

/// Sends each snapshot as one UDP datagram.
pub struct UdpPublishSink {
    socket: UdpSocket,
}

impl UdpPublishSink {
    /// Binds an ephemeral local port and connects it to `host:port`.
    pub async fn connect(host: &str, port: u16) -> PublishResult<Self> {
        let socket = UdpSocket::bind(("0.0.0.0", 0)).await?;
        socket.connect((host, port)).await?;
        log::info!("[Publish] Sending snapshots to {}:{}", host, port);
        Ok(Self { socket })
    }
}

#[async_trait]
impl PublishSink for UdpPublishSink {
    async fn send(&self, payload: Bytes) -> PublishResult<()> {
        self.socket.send(&payload).await?;
        Ok(())
    }
}

/// Discards every snapshot.
pub struct NoopPublishSink;

#[async_trait]
impl PublishSink for NoopPublishSink {
    async fn send(&self, _payload: Bytes) -> PublishResult<()> {
        Ok(())
    }
}

/// Logs every snapshot at debug level. Useful when no consumer is running.
pub struct LoggingPublishSink;

#[async_trait]
impl PublishSink for LoggingPublishSink {
    async fn send(&self, payload: Bytes) -> PublishResult<()> {
        tracing::debug!(
            bytes = payload.len(),
            payload = %String::from_utf8_lossy(&payload),
            "zone_snapshot"
        );
        Ok(())
    }
}

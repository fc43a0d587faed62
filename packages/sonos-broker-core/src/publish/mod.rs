//! Zone snapshot publishing.
//!
//! - [`Publisher`]: builds dirty and full snapshots from the registry
//! - [`PublishSink`]: where the serialized snapshots go

mod publisher;
mod sink;

use thiserror::Error;

pub use publisher::Publisher;
pub use sink::{LoggingPublishSink, NoopPublishSink, PublishSink, UdpPublishSink};

/// Errors that can occur while publishing a snapshot.
#[derive(Debug, Error)]
pub enum PublishError {
    /// The sink could not deliver the payload.
    #[error("send failed: {0}")]
    Io(#[from] std::io::Error),

    /// The snapshot could not be serialized.
    #[error("encode failed: {0}")]
    Encode(#[from] serde_json::Error),

    /// The zone is not in the registry.
    #[error("unknown zone: {0}")]
    UnknownZone(String),
}

/// Convenient Result alias for publish operations.
pub type PublishResult<T> = Result<T, PublishError>;

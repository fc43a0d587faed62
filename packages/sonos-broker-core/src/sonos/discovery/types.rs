//! Shared types for zone player discovery.

use serde::Serialize;
use thiserror::Error;

/// Errors raised by a discovery probe.
#[derive(Debug, Error)]
pub enum DiscoveryError {
    /// Failed to bind UDP socket for discovery.
    #[error("failed to bind UDP socket: {0}")]
    SocketBind(#[source] std::io::Error),

    /// No usable network interfaces found.
    #[error("no usable network interfaces found")]
    NoInterfaces,
}

/// Convenient Result alias for discovery operations.
pub type DiscoveryResult<T> = Result<T, DiscoveryError>;

/// A zone player that answered an M-SEARCH.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DiscoveredZone {
    /// Lowercased RINCON uid from the USN header.
    pub uid: String,
    /// Source address of the response.
    pub ip: String,
    /// Model code from the SERVER header (`ZPS5`, `BR100`, ...), empty when absent.
    pub model: String,
}

/// Virtual interface prefixes to filter out during discovery.
pub const VIRTUAL_INTERFACE_PREFIXES: &[&str] = &[
    "lo", "docker", "veth", "br-", "virbr", "vmnet", "vbox", "tun", "tap",
];

/// Checks if an interface name belongs to a virtual/container interface.
pub fn is_virtual_interface(name: &str) -> bool {
    let name_lower = name.to_lowercase();
    VIRTUAL_INTERFACE_PREFIXES
        .iter()
        .any(|prefix| name_lower.starts_with(prefix))
}

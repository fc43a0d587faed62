//! Zone player discovery over SSDP.

mod ssdp;
mod types;

pub use ssdp::{SsdpConfig, SsdpProbe, ZoneProbe};
pub use types::{DiscoveredZone, DiscoveryError, DiscoveryResult};

//! Zone player protocol layer.
//!
//! Everything that talks UPnP to a zone player or parses what it sends back.
//!
//! # Module Structure
//!
//! - `discovery` - SSDP M-SEARCH probing
//! - `metadata` - `/status/zp` device metadata
//! - `device` - Typed control actions lowered to SOAP calls
//! - `soap` - Low-level SOAP protocol implementation and UPnP fault tables
//! - `retry` - Transient-fault retry for transport actions
//! - `gena_client` - GENA SUBSCRIBE/renew/UNSUBSCRIBE over HTTP
//! - `lease` - Subscription lease table
//! - `gena_parser` - NOTIFY body parsing per event category
//! - `zone_groups` - ZoneGroupTopology parsing
//! - `didl` - DIDL-Lite track metadata
//! - `alarms` - AlarmClock `ListAlarms` parsing
//! - `types` - Transport states and group topology types
//! - `services` - UPnP service definitions (URNs, paths)
//! - `utils` - Shared XML and URL helpers

pub mod alarms;
pub mod device;
pub mod didl;
pub mod discovery;
pub mod gena_client;
pub mod gena_parser;
pub mod lease;
pub mod metadata;
pub(crate) mod retry;
pub mod services;
pub mod soap;
pub mod types;
pub mod utils;
pub mod zone_groups;

#[cfg(test)]
pub(crate) mod test_fixtures;

pub use device::{DeviceAction, DeviceControl, SonosDevice, TrackInfo};
pub use gena_client::{GenaClient, SubscriptionTransport};
pub use services::SonosService;

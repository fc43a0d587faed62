//! Application services layer.
//!
//! Business logic that sits between the API layer and the zone players
//! (`sonos/`): discovery, subscription leases, event decoding, zone commands
//! and snippet playback.

pub mod discovery_loop;
pub mod event_decoder;
pub mod lease_manager;
pub mod snippet;
pub mod zone_controller;

pub use discovery_loop::{DiscoveryLoop, DiscoveryReport};
pub use event_decoder::EventDecoder;
pub use lease_manager::LeaseManager;
pub use snippet::{SnippetError, SnippetOrchestrator, SnippetOutcome, SnippetResult};
pub use zone_controller::{ZoneController, ZoneError, ZoneResult};

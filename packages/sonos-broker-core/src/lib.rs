//! Sonos Broker Core - zone state broker for Sonos players.
//!
//! Discovers zone players on the LAN, keeps a registry of their state fed by
//! UPnP event subscriptions, publishes changed fields as JSON datagrams and
//! exposes a command surface for controlling them.
//!
//! # Architecture
//!
//! - [`sonos`]: Zone player protocol (SSDP, SOAP, GENA, XML parsing)
//! - [`zone`]: Zone entities, group resolution and change tracking
//! - [`publish`]: Snapshot publishing and sinks
//! - [`services`]: Discovery loop, lease manager, event decoder, zone controller, snippets
//! - [`api`]: NOTIFY callback and HTTP control surface
//! - [`bootstrap`]: Composition root
//! - [`context`]: Network configuration and callback URLs
//! - [`state`]: Core configuration
//! - [`error`]: Centralized error types
//!
//! # Abstraction Traits
//!
//! - [`DeviceControl`](sonos::DeviceControl): commands and queries against a zone player
//! - [`SubscriptionTransport`](sonos::SubscriptionTransport): GENA subscribe/renew/unsubscribe
//! - [`ZoneProbe`](sonos::discovery::ZoneProbe): one discovery probe round
//! - [`PublishSink`](publish::PublishSink): where snapshots go
//! - [`IpDetector`](context::IpDetector): local IP detection

#![allow(missing_docs)]
#![warn(clippy::all)]

pub mod api;
pub mod bootstrap;
pub mod context;
pub mod error;
pub mod protocol_constants;
pub mod publish;
pub mod runtime;
pub mod services;
pub mod sonos;
pub mod state;
pub mod zone;

#[cfg(test)]
pub(crate) mod test_support;

pub use context::{IpDetector, LocalIpDetector, NetworkContext, NetworkError};
pub use error::{BrokerError, BrokerResult, ErrorCode};
pub use runtime::{TaskSpawner, TokioSpawner};
pub use state::Config;

pub use sonos::discovery::{DiscoveredZone, DiscoveryError, DiscoveryResult};
pub use sonos::gena_client::{GenaError, GenaResult};
pub use sonos::soap::{SoapError, SoapResult};
pub use sonos::types::{TransportState, ZoneGroup};
pub use sonos::SonosService;

pub use publish::{PublishError, PublishResult, Publisher};
pub use services::{
    DiscoveryLoop, DiscoveryReport, EventDecoder, LeaseManager, SnippetError, SnippetOrchestrator,
    SnippetOutcome, SnippetResult, ZoneController, ZoneError, ZoneResult,
};
pub use zone::{ZoneEntity, ZoneField, ZoneRegistry};

pub use bootstrap::{bootstrap_services, wire_services, Backends, BootstrappedServices};
pub use api::{bind, serve, start_server, AppState, ServerError};

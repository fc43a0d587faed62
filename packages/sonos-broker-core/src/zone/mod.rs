//! Zone state model.
//!
//! - [`entity`]: per-device state and device-local setters
//! - [`field`]: published field names and change tracking
//! - [`registry`]: the uid → zone map with coordinator resolution
//! - [`snapshot`]: JSON snapshots and fingerprints

pub mod entity;
pub mod field;
pub mod registry;
pub mod snapshot;

pub use entity::{GroupScoped, ZoneEntity};
pub use field::{ChangeTracker, ZoneField};
pub use registry::{ZoneRegistry, ZoneView};
pub use snapshot::Snapshot;

//! Fixed protocol constants that should NOT be changed.
//!
//! These values are defined by external specifications (UPnP, GENA, SSDP) or
//! by Sonos firmware behavior, and changing them would break protocol
//! compliance. Tunable values live in [`crate::state::Config`].

// ─────────────────────────────────────────────────────────────────────────────
// SSDP
// ─────────────────────────────────────────────────────────────────────────────

/// Standard SSDP multicast address and port.
pub const SSDP_MULTICAST_ADDR: &str = "239.255.255.250:1900";

/// SSDP search target for Sonos ZonePlayer devices.
pub const SONOS_SEARCH_TARGET: &str = "urn:schemas-upnp-org:device:ZonePlayer:1";

/// MX value (max response delay in seconds) sent in M-SEARCH.
pub const SSDP_MX_SECS: u64 = 1;

/// Models that answer SSDP but cannot play audio (Bridge).
pub const DEFAULT_EXCLUDED_MODELS: &[&str] = &["BR100"];

// ─────────────────────────────────────────────────────────────────────────────
// HTTP/SOAP
// ─────────────────────────────────────────────────────────────────────────────

/// Timeout for SOAP HTTP requests (seconds).
///
/// 10 seconds is reasonable for LAN operations.
pub const SOAP_TIMEOUT_SECS: u64 = 10;

/// Device status document with zone name, serial and firmware details.
pub const STATUS_ZP_PATH: &str = "/status/zp";

/// Maximum size of GENA notification body (bytes).
pub const MAX_GENA_BODY_SIZE: usize = 64 * 1024;

/// Path of the inbound GENA callback endpoint.
pub const GENA_CALLBACK_PATH: &str = "/notify";

// ─────────────────────────────────────────────────────────────────────────────
// Playback
// ─────────────────────────────────────────────────────────────────────────────

/// Extra time added to a snippet's reported duration before restoring (seconds).
pub const SNIPPET_DURATION_MARGIN_SECS: u64 = 1;

/// Volume increment used by `volume_up` / `volume_down`.
pub const VOLUME_STEP: u8 = 2;

/// Neutral position reported for durations and positions.
pub const ZERO_TIME: &str = "00:00:00";

// ─────────────────────────────────────────────────────────────────────────────
// Application Identity
// ─────────────────────────────────────────────────────────────────────────────

/// Service identifier returned by the health endpoint.
pub const SERVICE_ID: &str = "sonos-broker";

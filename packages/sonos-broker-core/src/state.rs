//! Broker configuration.
//!
//! [`Config`] holds every tunable of the core. The standalone server fills it
//! from YAML, environment variables and CLI flags before bootstrapping.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::protocol_constants::DEFAULT_EXCLUDED_MODELS;

/// Configuration for the Sonos broker.
///
/// All fields have sensible defaults.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct Config {
    // Server
    /// Preferred port for the HTTP server receiving NOTIFY callbacks (0 = auto-allocate).
    pub preferred_port: u16,

    // Discovery
    /// Interval between discovery passes (seconds).
    pub discovery_interval_secs: u64,

    /// Every Nth discovery pass performs a deep scan.
    pub deep_scan_every: u64,

    /// How long to collect SSDP responses per pass (milliseconds).
    pub probe_window_ms: u64,

    /// Number of M-SEARCH packets to send per pass.
    pub probe_send_count: u64,

    /// Device models (from the SSDP SERVER header) that are never tracked.
    pub excluded_models: Vec<String>,

    // Subscriptions
    /// Leases whose remaining TTL drops below this are renewed (seconds).
    pub renewal_buffer_secs: u64,

    /// Interval between renewal checks (seconds).
    pub renewal_check_secs: u64,

    // Snippets
    /// Pause after muting before a snippet starts (milliseconds).
    pub snippet_fade_ms: u64,

    // Publishing
    /// Host receiving UDP state datagrams.
    pub publish_host: String,

    /// Port receiving UDP state datagrams.
    pub publish_port: u16,
}

impl Config {
    /// Lease duration requested for every subscription.
    ///
    /// Twice a full discovery cycle (including a deep scan), so a lease
    /// outlives the cycle that would re-establish it.
    #[must_use]
    pub fn lease_secs(&self) -> u64 {
        self.discovery_interval_secs * self.deep_scan_every * 2
    }

    /// Discovery interval as a [`Duration`].
    #[must_use]
    pub fn discovery_interval(&self) -> Duration {
        Duration::from_secs(self.discovery_interval_secs)
    }

    /// Validates the configuration values.
    ///
    /// # Errors
    ///
    /// Returns a description of the first invalid value.
    pub fn validate(&self) -> Result<(), String> {
        if self.discovery_interval_secs == 0 {
            return Err("discovery_interval_secs must be >= 1".to_string());
        }
        if self.deep_scan_every == 0 {
            return Err("deep_scan_every must be >= 1".to_string());
        }
        if self.probe_window_ms == 0 {
            return Err("probe_window_ms must be >= 1".to_string());
        }
        if self.probe_send_count == 0 {
            return Err("probe_send_count must be >= 1".to_string());
        }
        if self.renewal_check_secs == 0 {
            return Err("renewal_check_secs must be >= 1 (interval panics on 0)".to_string());
        }
        if self.renewal_buffer_secs >= self.lease_secs() {
            return Err(format!(
                "renewal_buffer_secs ({}) must be below the lease duration ({}s)",
                self.renewal_buffer_secs,
                self.lease_secs()
            ));
        }
        if self.publish_host.is_empty() {
            return Err("publish_host must not be empty".to_string());
        }
        if self.publish_port == 0 {
            return Err("publish_port must be >= 1".to_string());
        }
        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            preferred_port: 12901,
            discovery_interval_secs: 10,
            deep_scan_every: 10,
            probe_window_ms: 1000,
            probe_send_count: 2,
            excluded_models: DEFAULT_EXCLUDED_MODELS
                .iter()
                .map(|m| m.to_string())
                .collect(),
            renewal_buffer_secs: 30,
            renewal_check_secs: 10,
            snippet_fade_ms: 1000,
            publish_host: "127.0.0.1".to_string(),
            publish_port: 12900,
        }
    }
}

//! Server configuration.
//!
//! Supports loading from YAML files with environment variable overrides.

use std::net::IpAddr;
use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;

/// Server configuration loaded from YAML with environment overrides.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Port receiving NOTIFY callbacks and control requests (0 = auto).
    /// Override: `SONOS_BROKER_BIND_PORT`
    pub bind_port: u16,

    /// IP address zone players use to reach the callback listener.
    /// If not specified, auto-detection will be attempted.
    /// Override: `SONOS_BROKER_ADVERTISE_IP`
    pub advertise_ip: Option<IpAddr>,

    /// Host receiving state datagrams.
    /// Override: `SONOS_BROKER_PUBLISH_HOST`
    pub publish_host: String,

    /// Port receiving state datagrams.
    /// Override: `SONOS_BROKER_PUBLISH_PORT`
    pub publish_port: u16,

    /// Seconds between discovery passes.
    /// Override: `SONOS_BROKER_DISCOVERY_INTERVAL`
    pub discovery_interval: u64,

    /// Every Nth pass is a deep scan.
    pub deep_scan_every: u64,

    /// Device models that are never tracked.
    pub excluded_models: Vec<String>,

    /// Mute-to-play pause before a snippet starts (milliseconds).
    pub snippet_fade_ms: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        let core = sonos_broker_core::Config::default();
        Self {
            bind_port: core.preferred_port,
            advertise_ip: None,
            publish_host: core.publish_host,
            publish_port: core.publish_port,
            discovery_interval: core.discovery_interval_secs,
            deep_scan_every: core.deep_scan_every,
            excluded_models: core.excluded_models,
            snippet_fade_ms: core.snippet_fade_ms,
        }
    }
}

impl ServerConfig {
    /// Loads configuration from a YAML file, then applies environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = if let Some(path) = path {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file: {}", path.display()))?;
            serde_yaml::from_str(&content)
                .with_context(|| format!("Failed to parse config file: {}", path.display()))?
        } else {
            Self::default()
        };

        config.apply_env_overrides(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Applies environment variable overrides to the configuration.
    ///
    /// Unparseable values are ignored.
    fn apply_env_overrides(&mut self, var: impl Fn(&str) -> Option<String>) {
        if let Some(port) = var("SONOS_BROKER_BIND_PORT").and_then(|v| v.parse().ok()) {
            self.bind_port = port;
        }
        if let Some(ip) = var("SONOS_BROKER_ADVERTISE_IP").and_then(|v| v.parse().ok()) {
            self.advertise_ip = Some(ip);
        }
        if let Some(host) = var("SONOS_BROKER_PUBLISH_HOST").filter(|v| !v.is_empty()) {
            self.publish_host = host;
        }
        if let Some(port) = var("SONOS_BROKER_PUBLISH_PORT").and_then(|v| v.parse().ok()) {
            self.publish_port = port;
        }
        if let Some(secs) = var("SONOS_BROKER_DISCOVERY_INTERVAL").and_then(|v| v.parse().ok()) {
            self.discovery_interval = secs;
        }
    }

    /// Converts to the core's Config type.
    pub fn to_core_config(&self) -> sonos_broker_core::Config {
        sonos_broker_core::Config {
            preferred_port: self.bind_port,
            discovery_interval_secs: self.discovery_interval,
            deep_scan_every: self.deep_scan_every,
            excluded_models: self.excluded_models.clone(),
            snippet_fade_ms: self.snippet_fade_ms,
            publish_host: self.publish_host.clone(),
            publish_port: self.publish_port,
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::io::Write;

    use super::*;

    #[test]
    fn yaml_file_overrides_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "bind_port: 13000\npublish_host: 10.0.0.5\nexcluded_models: [BR100, ZP80]"
        )
        .unwrap();

        let config = ServerConfig::load(Some(file.path())).unwrap();
        assert_eq!(config.bind_port, 13000);
        assert_eq!(config.publish_host, "10.0.0.5");
        assert_eq!(config.excluded_models, vec!["BR100", "ZP80"]);
        assert_eq!(config.publish_port, 12900);
    }

    #[test]
    fn malformed_yaml_is_an_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "bind_port: [not a port").unwrap();
        assert!(ServerConfig::load(Some(file.path())).is_err());
    }

    #[test]
    fn env_overrides_apply_and_bad_values_are_ignored() {
        let vars: HashMap<&str, &str> = [
            ("SONOS_BROKER_PUBLISH_PORT", "14000"),
            ("SONOS_BROKER_BIND_PORT", "not-a-port"),
            ("SONOS_BROKER_ADVERTISE_IP", "192.168.1.20"),
        ]
        .into_iter()
        .collect();

        let mut config = ServerConfig::default();
        config.apply_env_overrides(|key| vars.get(key).map(|v| v.to_string()));
        assert_eq!(config.publish_port, 14000);
        assert_eq!(config.bind_port, 12901);
        assert_eq!(config.advertise_ip, Some("192.168.1.20".parse().unwrap()));
    }

    #[test]
    fn core_config_carries_server_values() {
        let config = ServerConfig {
            discovery_interval: 5,
            ..ServerConfig::default()
        };
        let core = config.to_core_config();
        assert_eq!(core.discovery_interval_secs, 5);
        assert_eq!(core.lease_secs(), 5 * 10 * 2);
        assert!(core.validate().is_ok());
    }
}

//! Network configuration context for the notification listener.
//!
//! [`NetworkContext`] holds the port the listener is bound to and the IP
//! address zone players use to reach it. Both feed the GENA callback URL
//! handed out in every SUBSCRIBE.

use std::net::IpAddr;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::protocol_constants::GENA_CALLBACK_PATH;

/// Network configuration shared across services.
///
/// # Modes
///
/// - **Explicit**: bind port and advertise IP come from configuration. Use
///   [`NetworkContext::explicit`].
/// - **Auto-detect**: the local IP is detected from the system interfaces.
///   Use [`NetworkContext::auto_detect`].
#[derive(Clone)]
pub struct NetworkContext {
    /// Listener port (0 until bound when auto-assigned).
    port: Arc<RwLock<u16>>,
    /// IP address that zone players can reach us at.
    local_ip: Arc<RwLock<String>>,
    ip_detector: Option<Arc<dyn IpDetector>>,
}

impl NetworkContext {
    /// Creates a `NetworkContext` with explicit configuration.
    #[must_use]
    pub fn explicit(bind_port: u16, advertise_ip: IpAddr) -> Self {
        Self {
            port: Arc::new(RwLock::new(bind_port)),
            local_ip: Arc::new(RwLock::new(advertise_ip.to_string())),
            ip_detector: None,
        }
    }

    /// Creates a `NetworkContext` whose IP is detected now and can be
    /// re-detected later.
    ///
    /// # Errors
    ///
    /// Returns an error if the initial IP detection fails.
    pub fn auto_detect(
        preferred_port: u16,
        ip_detector: Arc<dyn IpDetector>,
    ) -> Result<Self, NetworkError> {
        let local_ip = ip_detector.detect()?;
        Ok(Self {
            port: Arc::new(RwLock::new(preferred_port)),
            local_ip: Arc::new(RwLock::new(local_ip)),
            ip_detector: Some(ip_detector),
        })
    }

    /// Creates a `NetworkContext` for testing with a fixed IP.
    #[cfg(test)]
    pub fn for_test() -> Self {
        Self::explicit(12901, IpAddr::V4(std::net::Ipv4Addr::new(192, 168, 1, 50)))
    }

    /// Detects the current local IP address using the configured detector.
    pub fn detect_ip(&self) -> Result<String, NetworkError> {
        match &self.ip_detector {
            Some(detector) => detector.detect(),
            None => Err(NetworkError::NoDetector),
        }
    }

    #[must_use]
    pub fn get_port(&self) -> u16 {
        *self.port.read()
    }

    #[must_use]
    pub fn get_local_ip(&self) -> String {
        self.local_ip.read().clone()
    }

    /// Records the port the listener actually bound.
    pub fn set_port(&self, port: u16) {
        *self.port.write() = port;
    }

    pub fn set_local_ip(&self, ip: String) {
        *self.local_ip.write() = ip;
    }

    /// Base URL of the listener (e.g., `http://192.168.1.100:12901`).
    #[must_use]
    pub fn base_url(&self) -> String {
        format!("http://{}:{}", self.get_local_ip(), self.get_port())
    }

    /// Returns the GENA callback URL for receiving zone player notifications.
    #[must_use]
    pub fn gena_callback_url(&self) -> String {
        format!("{}{}", self.base_url(), GENA_CALLBACK_PATH)
    }
}

/// Trait for detecting the local IP address.
pub trait IpDetector: Send + Sync {
    fn detect(&self) -> Result<String, NetworkError>;
}

/// Default IP detector using the system's network interfaces.
#[derive(Debug, Clone, Default)]
pub struct LocalIpDetector;

impl LocalIpDetector {
    /// Creates a new `LocalIpDetector` wrapped in an Arc.
    #[must_use]
    pub fn arc() -> Arc<dyn IpDetector> {
        Arc::new(Self)
    }
}

impl IpDetector for LocalIpDetector {
    fn detect(&self) -> Result<String, NetworkError> {
        local_ip_address::local_ip()
            .map(|ip| ip.to_string())
            .map_err(|e| NetworkError::Detection(e.to_string()))
    }
}

/// Errors that can occur during network operations.
#[derive(Debug, thiserror::Error)]
pub enum NetworkError {
    /// Could not detect local IP address.
    #[error("Failed to detect local IP: {0}")]
    Detection(String),

    /// No IP detector configured (explicit mode).
    #[error("No IP detector configured (using explicit mode)")]
    NoDetector,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::Ipv4Addr;

    struct MockIpDetector {
        ip: String,
    }

    impl IpDetector for MockIpDetector {
        fn detect(&self) -> Result<String, NetworkError> {
            Ok(self.ip.clone())
        }
    }

    #[test]
    fn explicit_context_builds_callback_url() {
        let ctx = NetworkContext::explicit(12901, IpAddr::V4(Ipv4Addr::new(192, 168, 1, 100)));
        assert_eq!(ctx.gena_callback_url(), "http://192.168.1.100:12901/notify");
        assert!(matches!(ctx.detect_ip(), Err(NetworkError::NoDetector)));
    }

    #[test]
    fn bound_port_is_reflected_in_urls() {
        let detector = Arc::new(MockIpDetector {
            ip: "10.0.0.5".to_string(),
        });
        let ctx = NetworkContext::auto_detect(0, detector).unwrap();
        ctx.set_port(40123);
        assert_eq!(ctx.base_url(), "http://10.0.0.5:40123");
        assert_eq!(ctx.detect_ip().unwrap(), "10.0.0.5");
    }
}

//! GENA HTTP client for subscription operations.
//!
//! Handles the HTTP protocol aspects of GENA subscriptions. Lease state is
//! tracked separately by [`LeaseTable`](super::lease::LeaseTable).

use async_trait::async_trait;
use reqwest::{Client, Method};
use thiserror::Error;

use super::services::SonosService;
use super::utils::build_sonos_url;

/// Errors that can occur during GENA subscription operations.
#[derive(Debug, Error)]
pub enum GenaError {
    /// HTTP request to the speaker failed.
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Speaker rejected the SUBSCRIBE request.
    #[error("subscription failed with status {0}")]
    SubscriptionFailed(u16),

    /// Speaker rejected the renewal request.
    #[error("renewal failed with status {0}")]
    RenewalFailed(u16),

    /// Speaker rejected the UNSUBSCRIBE request.
    #[error("unsubscribe failed with status {0}")]
    UnsubscribeFailed(u16),

    /// Speaker accepted the subscription but returned no SID header.
    #[error("subscription response missing SID header")]
    MissingSid,
}

/// Convenient Result alias for GENA operations.
pub type GenaResult<T> = Result<T, GenaError>;

/// Response from a successful GENA subscription.
#[derive(Debug, Clone)]
pub struct SubscribeResponse {
    /// The subscription ID returned by the speaker.
    pub sid: String,
    /// The timeout value in seconds granted by the speaker.
    pub timeout_secs: u64,
}

/// Transport for establishing, renewing and cancelling event subscriptions.
#[async_trait]
pub trait SubscriptionTransport: Send + Sync {
    /// Creates a subscription and returns the SID and granted timeout.
    async fn subscribe(
        &self,
        ip: &str,
        service: SonosService,
        callback_url: &str,
        lease_secs: u64,
    ) -> GenaResult<SubscribeResponse>;

    /// Renews an existing subscription and returns the granted timeout.
    async fn renew(
        &self,
        ip: &str,
        service: SonosService,
        sid: &str,
        lease_secs: u64,
    ) -> GenaResult<u64>;

    /// Cancels a subscription.
    async fn unsubscribe(&self, ip: &str, service: SonosService, sid: &str) -> GenaResult<()>;
}

/// HTTP client for GENA (UPnP eventing) operations.
pub struct GenaClient {
    client: Client,
}

impl GenaClient {
    /// Creates a new GENA client with the given HTTP client.
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Creates the HTTP method for SUBSCRIBE requests.
    fn subscribe_method() -> Method {
        // SAFETY: "SUBSCRIBE" is a valid HTTP method name
        Method::from_bytes(b"SUBSCRIBE").expect("SUBSCRIBE is a valid method")
    }

    /// Creates the HTTP method for UNSUBSCRIBE requests.
    fn unsubscribe_method() -> Method {
        // SAFETY: "UNSUBSCRIBE" is a valid HTTP method name
        Method::from_bytes(b"UNSUBSCRIBE").expect("UNSUBSCRIBE is a valid method")
    }

    /// Extracts the granted timeout from a GENA response.
    ///
    /// Parses the "TIMEOUT" header which has format "Second-N". Falls back to
    /// the requested lease when the header is missing or malformed.
    fn extract_timeout_secs(response: &reqwest::Response, requested: u64) -> u64 {
        response
            .headers()
            .get("TIMEOUT")
            .and_then(|v| v.to_str().ok())
            .and_then(parse_timeout_header)
            .unwrap_or(requested)
    }
}

/// Parses a `Second-N` timeout header value.
fn parse_timeout_header(value: &str) -> Option<u64> {
    value.trim().strip_prefix("Second-")?.parse().ok()
}

#[async_trait]
impl SubscriptionTransport for GenaClient {
    async fn subscribe(
        &self,
        ip: &str,
        service: SonosService,
        callback_url: &str,
        lease_secs: u64,
    ) -> GenaResult<SubscribeResponse> {
        let url = build_sonos_url(ip, service.event_path());

        let response = self
            .client
            .request(Self::subscribe_method(), &url)
            .header("CALLBACK", format!("<{}>", callback_url))
            .header("NT", "upnp:event")
            .header("TIMEOUT", format!("Second-{}", lease_secs))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(GenaError::SubscriptionFailed(response.status().as_u16()));
        }

        let sid = response
            .headers()
            .get("SID")
            .and_then(|v| v.to_str().ok())
            .map(|s| s.to_string())
            .ok_or(GenaError::MissingSid)?;

        let timeout_secs = Self::extract_timeout_secs(&response, lease_secs);

        log::debug!(
            "[GENA] Subscribed to {} on {} (sid={}, timeout={}s)",
            service,
            ip,
            sid,
            timeout_secs
        );

        Ok(SubscribeResponse { sid, timeout_secs })
    }

    async fn renew(
        &self,
        ip: &str,
        service: SonosService,
        sid: &str,
        lease_secs: u64,
    ) -> GenaResult<u64> {
        let url = build_sonos_url(ip, service.event_path());

        let response = self
            .client
            .request(Self::subscribe_method(), &url)
            .header("SID", sid)
            .header("TIMEOUT", format!("Second-{}", lease_secs))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(GenaError::RenewalFailed(response.status().as_u16()));
        }

        Ok(Self::extract_timeout_secs(&response, lease_secs))
    }

    async fn unsubscribe(&self, ip: &str, service: SonosService, sid: &str) -> GenaResult<()> {
        let url = build_sonos_url(ip, service.event_path());

        let response = self
            .client
            .request(Self::unsubscribe_method(), &url)
            .header("SID", sid)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(GenaError::UnsubscribeFailed(response.status().as_u16()));
        }

        Ok(())
    }
}

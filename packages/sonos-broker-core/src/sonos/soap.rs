//! Low-level SOAP protocol implementation for UPnP/Sonos communication.
//!
//! This module handles the raw SOAP envelope building, HTTP transport,
//! and UPnP fault parsing. For typed device commands, see `device.rs`.

use std::time::Duration;

use reqwest::Client;
use thiserror::Error;

use super::services::SonosService;
use super::utils::{build_sonos_url, escape_xml, extract_xml_text};
use crate::protocol_constants::SOAP_TIMEOUT_SECS;

// ─────────────────────────────────────────────────────────────────────────────
// Error Types
// ─────────────────────────────────────────────────────────────────────────────

/// Errors that can occur during SOAP operations with Sonos speakers.
#[derive(Debug, Error)]
pub enum SoapError {
    /// HTTP request to the speaker failed.
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Speaker returned a non-success HTTP status without a SOAP fault.
    #[error("HTTP error {0}: {1}")]
    HttpStatus(u16, String),

    /// Speaker returned a UPnP/SOAP fault.
    #[error("UPnP error {}: {description}", code.map_or_else(|| "?".to_string(), |c| c.to_string()))]
    Fault {
        /// UPnP `errorCode`, when the fault carried one.
        code: Option<u16>,
        /// Human-readable description (table lookup or raw faultstring).
        description: String,
    },

    /// Failed to parse SOAP response XML.
    #[error("Failed to parse SOAP response")]
    Parse,
}

/// Convenient Result alias for SOAP operations.
pub type SoapResult<T> = Result<T, SoapError>;

impl SoapError {
    /// Returns the UPnP error code carried by a fault, if any.
    #[must_use]
    pub fn fault_code(&self) -> Option<u16> {
        match self {
            SoapError::Fault { code, .. } => *code,
            _ => None,
        }
    }

    /// Returns true if this error is transient and the operation should be retried.
    ///
    /// Transient Sonos SOAP fault codes:
    /// - 701: Transition not available (device changing states)
    /// - 714: Illegal seek target (previous source still loading)
    /// - 716: Resource not found (device busy initializing)
    #[must_use]
    pub fn is_transient(&self) -> bool {
        match self {
            SoapError::Fault { code, .. } => matches!(code, Some(701 | 714 | 716)),
            SoapError::Http(e) => e.is_timeout(),
            _ => false,
        }
    }
}

/// Looks up the description of a UPnP error code for a service.
///
/// Covers the generic UPnP control codes plus the AVTransport and
/// ContentDirectory ranges Sonos actually returns.
#[must_use]
pub fn upnp_error_description(service: SonosService, code: u16) -> &'static str {
    match code {
        401 => "Invalid Action",
        402 => "Invalid Args",
        404 => "Invalid Var",
        412 => "Precondition Failed",
        501 => "Action Failed",
        600 => "Argument Value Invalid",
        601 => "Argument Value Out of Range",
        602 => "Optional Action Not Implemented",
        603 => "Out Of Memory",
        604 => "Human Intervention Required",
        605 => "String Argument Too Long",
        606 => "Action Not Authorized",
        607 => "Signature Failure",
        608 => "Signature Missing",
        609 => "Not Encrypted",
        610 => "Invalid Sequence",
        611 => "Invalid Control URL",
        612 => "No Such Session",
        _ => match service {
            SonosService::AVTransport => match code {
                701 => "Transition not available",
                702 => "No contents",
                703 => "Read error",
                704 => "Format not supported for playback",
                705 => "Transport is locked",
                706 => "Write error",
                707 => "Media is protected or not writeable",
                708 => "Format not supported for recording",
                709 => "Media is full",
                710 => "Seek mode not supported",
                711 => "Illegal seek target",
                712 => "Play mode not supported",
                713 => "Record quality not supported",
                714 => "Illegal MIME-Type",
                715 => "Content \"BUSY\"",
                716 => "Resource Not found",
                717 => "Play speed not supported",
                718 => "Invalid InstanceID",
                737 => "No DNS Server",
                738 => "Bad Domain Name",
                739 => "Server Error",
                _ => "",
            },
            _ => match code {
                701 => "No such object",
                702 => "Invalid CurrentTagValue",
                703 => "Invalid NewTagValue",
                704 => "Required tag",
                705 => "Read-only tag",
                706 => "Parameter Mismatch",
                708 => "Unsupported or invalid search criteria",
                709 => "Unsupported or invalid sort criteria",
                710 => "No such container",
                711 => "Restricted object",
                712 => "Bad metadata",
                713 => "Restricted parent object",
                714 => "No such source resource",
                715 => "Resource access denied",
                716 => "Transfer busy",
                717 => "No such file transfer",
                718 => "No such destination resource",
                719 => "Destination resource access denied",
                720 => "Cannot process the request",
                _ => "",
            },
        },
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// SOAP Request/Response
// ─────────────────────────────────────────────────────────────────────────────

/// Sends a SOAP request to a Sonos speaker.
///
/// Builds the SOAP envelope, sends the HTTP request, and maps UPnP faults
/// (usually delivered with a 500 status) to [`SoapError::Fault`].
///
/// # Arguments
/// * `client` - The HTTP client to use for the request
/// * `ip` - IP address of the Sonos speaker
/// * `service` - The UPnP service (provides URN and control path)
/// * `action` - The SOAP action name (e.g., "Play", "GetVolume")
/// * `args` - Key-value pairs for action arguments (order is preserved)
pub async fn send_soap_request(
    client: &Client,
    ip: &str,
    service: SonosService,
    action: &str,
    args: &[(&str, &str)],
) -> SoapResult<String> {
    let url = build_sonos_url(ip, service.control_path());
    let body = build_envelope(service.urn(), action, args);

    log::debug!("[SOAP] {} -> {} (body: {} bytes)", action, url, body.len());
    log::trace!("[SOAP] Request body: {}", body);

    let start = std::time::Instant::now();
    let res = client
        .post(&url)
        .header("Content-Type", "text/xml; charset=\"utf-8\"")
        .header("SOAPAction", format!("\"{}#{}\"", service.urn(), action))
        .body(body)
        .timeout(Duration::from_secs(SOAP_TIMEOUT_SECS))
        .send()
        .await;

    log::debug!(
        "[SOAP] {} completed in {:?}: {:?}",
        action,
        start.elapsed(),
        res.as_ref().map(|r| r.status())
    );

    let res = res?;
    let status = res.status();
    let response_text = res.text().await?;

    // SOAP faults arrive with a 500 status, check them first
    if let Some(fault) = parse_fault(service, &response_text) {
        log::debug!("[SOAP] {} fault from {}: {}", action, ip, fault);
        return Err(fault);
    }

    if !status.is_success() {
        return Err(SoapError::HttpStatus(status.as_u16(), response_text));
    }

    Ok(response_text)
}

/// Builds a SOAP envelope on a single line.
///
/// Some SOAP parsers (including Sonos) reject XML with whitespace before the
/// root element.
fn build_envelope(urn: &str, action: &str, args: &[(&str, &str)]) -> String {
    let mut body = format!(
        r#"<?xml version="1.0" encoding="utf-8"?><s:Envelope xmlns:s="http://schemas.xmlsoap.org/soap/envelope/" s:encodingStyle="http://schemas.xmlsoap.org/soap/encoding/"><s:Body><u:{} xmlns:u="{}">"#,
        action, urn
    );

    for (k, v) in args {
        body.push_str(&format!("<{k}>{}</{k}>", escape_xml(v)));
    }

    body.push_str(&format!(r#"</u:{}></s:Body></s:Envelope>"#, action));
    body
}

/// Parses a UPnP fault body into a [`SoapError::Fault`].
///
/// Returns `None` when the body is not a fault.
fn parse_fault(service: SonosService, xml: &str) -> Option<SoapError> {
    if !xml.contains("Fault>") {
        return None;
    }

    let code = extract_xml_text(xml, "errorCode").and_then(|c| c.trim().parse::<u16>().ok());
    let description = match code {
        Some(c) if !upnp_error_description(service, c).is_empty() => {
            upnp_error_description(service, c).to_string()
        }
        _ => extract_xml_text(xml, "faultstring").unwrap_or_else(|| "Unknown SOAP fault".into()),
    };

    Some(SoapError::Fault { code, description })
}

// ─────────────────────────────────────────────────────────────────────────────
// SOAP Request Builder
// ─────────────────────────────────────────────────────────────────────────────

/// Builder for constructing and sending SOAP requests to Sonos speakers.
///
/// # Example
/// ```ignore
/// let response = SoapRequestBuilder::new(&client, "192.168.1.100")
///     .service(SonosService::AVTransport)
///     .action("Play")
///     .instance_id()
///     .arg("Speed", "1")
///     .send()
///     .await?;
/// ```
pub struct SoapRequestBuilder<'a> {
    client: &'a Client,
    ip: &'a str,
    service: Option<SonosService>,
    action: Option<&'a str>,
    args: Vec<(&'a str, String)>,
}

impl<'a> SoapRequestBuilder<'a> {
    /// Creates a new SOAP request builder.
    #[must_use]
    pub fn new(client: &'a Client, ip: &'a str) -> Self {
        Self {
            client,
            ip,
            service: None,
            action: None,
            args: Vec::new(),
        }
    }

    /// Sets the Sonos service for this request.
    #[must_use]
    pub fn service(mut self, service: SonosService) -> Self {
        self.service = Some(service);
        self
    }

    /// Sets the SOAP action name.
    #[must_use]
    pub fn action(mut self, action: &'a str) -> Self {
        self.action = Some(action);
        self
    }

    /// Adds an argument to the SOAP request.
    ///
    /// Arguments are included in the SOAP body in the order they are added.
    #[must_use]
    pub fn arg(mut self, key: &'a str, value: impl Into<String>) -> Self {
        self.args.push((key, value.into()));
        self
    }

    /// Adds the standard InstanceID="0" argument used by most Sonos actions.
    #[must_use]
    pub fn instance_id(self) -> Self {
        self.arg("InstanceID", "0")
    }

    /// Sends the SOAP request and returns the response body.
    ///
    /// # Errors
    /// Returns `SoapError` if the service or action is not set, or if the
    /// request fails.
    pub async fn send(self) -> SoapResult<String> {
        let service = self.service.ok_or_else(|| SoapError::Fault {
            code: None,
            description: "SoapRequestBuilder: service not set".into(),
        })?;
        let action = self.action.ok_or_else(|| SoapError::Fault {
            code: None,
            description: "SoapRequestBuilder: action not set".into(),
        })?;

        let args: Vec<(&str, &str)> = self.args.iter().map(|(k, v)| (*k, v.as_str())).collect();

        send_soap_request(self.client, self.ip, service, action, &args).await
    }

    /// Returns the request parts without sending (for testing).
    #[cfg(test)]
    pub fn into_parts(self) -> Option<(SonosService, &'a str, Vec<(&'a str, String)>)> {
        let service = self.service?;
        let action = self.action?;
        Some((service, action, self.args))
    }
}

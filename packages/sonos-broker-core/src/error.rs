//! Centralized error types for the Sonos broker core.
//!
//! Each concern keeps its own `thiserror` enum next to the code that raises
//! it. This module maps all of them onto [`BrokerError`], which carries an
//! HTTP status and a machine-readable code for the control API.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use thiserror::Error;

use crate::context::NetworkError;
use crate::publish::PublishError;
use crate::services::{SnippetError, ZoneError};
use crate::sonos::discovery::DiscoveryError;
use crate::sonos::gena_client::GenaError;
use crate::sonos::soap::SoapError;

/// Trait for error types that provide machine-readable error codes.
pub trait ErrorCode {
    /// Returns a machine-readable error code for API responses.
    fn code(&self) -> &'static str;
}

impl ErrorCode for DiscoveryError {
    fn code(&self) -> &'static str {
        match self {
            Self::SocketBind(_) => "socket_bind_failed",
            Self::NoInterfaces => "no_network_interfaces",
        }
    }
}

impl ErrorCode for SoapError {
    fn code(&self) -> &'static str {
        match self {
            Self::Http(_) => "http_request_failed",
            Self::HttpStatus(_, _) => "http_error_status",
            Self::Fault { .. } => "upnp_fault",
            Self::Parse => "soap_parse_error",
        }
    }
}

impl ErrorCode for GenaError {
    fn code(&self) -> &'static str {
        match self {
            Self::Http(_) => "http_request_failed",
            Self::SubscriptionFailed(_) => "gena_subscription_failed",
            Self::RenewalFailed(_) => "gena_renewal_failed",
            Self::UnsubscribeFailed(_) => "gena_unsubscribe_failed",
            Self::MissingSid => "gena_missing_sid",
        }
    }
}

impl ErrorCode for PublishError {
    fn code(&self) -> &'static str {
        match self {
            Self::Io(_) => "publish_send_failed",
            Self::Encode(_) => "publish_encode_failed",
            Self::UnknownZone(_) => "zone_not_found",
        }
    }
}

impl ErrorCode for ZoneError {
    fn code(&self) -> &'static str {
        match self {
            Self::UnknownZone(_) => "zone_not_found",
            Self::InvalidValue(_) => "invalid_value",
            Self::Device(e) => e.code(),
        }
    }
}

impl ErrorCode for SnippetError {
    fn code(&self) -> &'static str {
        match self {
            Self::InFlight(_) => "snippet_in_flight",
            Self::Zone(e) => e.code(),
            Self::Task(_) => "snippet_task_failed",
        }
    }
}

/// Application-wide error type for the broker's control surface.
#[derive(Debug, Error)]
pub enum BrokerError {
    /// The uid is not in the registry.
    #[error("Zone not found: {0}")]
    ZoneNotFound(String),

    /// Client sent an invalid or malformed request.
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// A value was outside the range the device accepts.
    #[error("Invalid value: {0}")]
    InvalidValue(String),

    /// The device rejected the command or could not be reached.
    #[error("Device error: {0}")]
    Device(#[source] SoapError),

    /// A snippet is already playing on the coordinator.
    #[error("Snippet already playing on {0}")]
    SnippetInFlight(String),

    /// A snapshot could not be delivered.
    #[error("Publish failed: {0}")]
    Publish(#[source] PublishError),

    /// Network-related error (IP detection, bind).
    #[error("Network error: {0}")]
    Network(String),

    /// Server configuration error.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl BrokerError {
    /// Returns a machine-readable error code for API responses.
    pub fn code(&self) -> &'static str {
        match self {
            Self::ZoneNotFound(_) => "zone_not_found",
            Self::InvalidRequest(_) => "invalid_request",
            Self::InvalidValue(_) => "invalid_value",
            Self::Device(e) => e.code(),
            Self::SnippetInFlight(_) => "snippet_in_flight",
            Self::Publish(e) => e.code(),
            Self::Network(_) => "network_error",
            Self::Configuration(_) => "configuration_error",
            Self::Internal(_) => "internal_error",
        }
    }

    /// Maps the error to an appropriate HTTP status code.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::ZoneNotFound(_) => StatusCode::NOT_FOUND,
            Self::InvalidRequest(_) | Self::InvalidValue(_) => StatusCode::BAD_REQUEST,
            Self::SnippetInFlight(_) => StatusCode::CONFLICT,
            Self::Device(_) => StatusCode::BAD_GATEWAY,
            Self::Configuration(_) => StatusCode::SERVICE_UNAVAILABLE,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Convenient Result alias for application-wide operations.
pub type BrokerResult<T> = Result<T, BrokerError>;

/// JSON response body for error responses.
#[derive(Serialize)]
struct ErrorResponse {
    error: &'static str,
    message: String,
    status: u16,
    #[serde(skip_serializing_if = "Option::is_none")]
    fault: Option<u16>,
}

impl IntoResponse for BrokerError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let fault = match &self {
            Self::Device(e) => e.fault_code(),
            _ => None,
        };
        let body = ErrorResponse {
            error: self.code(),
            message: self.to_string(),
            status: status.as_u16(),
            fault,
        };
        (status, Json(body)).into_response()
    }
}

impl From<ZoneError> for BrokerError {
    fn from(err: ZoneError) -> Self {
        match err {
            ZoneError::UnknownZone(uid) => Self::ZoneNotFound(uid),
            ZoneError::InvalidValue(msg) => Self::InvalidValue(msg),
            ZoneError::Device(e) => Self::Device(e),
        }
    }
}

impl From<SnippetError> for BrokerError {
    fn from(err: SnippetError) -> Self {
        match err {
            SnippetError::InFlight(uid) => Self::SnippetInFlight(uid),
            SnippetError::Zone(e) => e.into(),
            SnippetError::Task(msg) => Self::Internal(msg),
        }
    }
}

impl From<PublishError> for BrokerError {
    fn from(err: PublishError) -> Self {
        match err {
            PublishError::UnknownZone(uid) => Self::ZoneNotFound(uid),
            other => Self::Publish(other),
        }
    }
}

impl From<SoapError> for BrokerError {
    fn from(err: SoapError) -> Self {
        Self::Device(err)
    }
}

impl From<GenaError> for BrokerError {
    fn from(err: GenaError) -> Self {
        Self::Network(err.to_string())
    }
}

impl From<DiscoveryError> for BrokerError {
    fn from(err: DiscoveryError) -> Self {
        Self::Network(err.to_string())
    }
}

impl From<NetworkError> for BrokerError {
    fn from(err: NetworkError) -> Self {
        Self::Network(err.to_string())
    }
}

//! Sonos UPnP service definitions.
//!
//! This module provides a single source of truth for Sonos service URNs,
//! control paths, and event paths used by both SOAP commands and GENA subscriptions.

use serde::Serialize;

/// Sonos UPnP services used for control and event subscriptions.
#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum SonosService {
    /// Audio/Video transport control (play, pause, stop, seek, queue).
    AVTransport,
    /// Individual speaker volume, mute, EQ and loudness.
    RenderingControl,
    /// Zone group topology and membership information.
    ZoneGroupTopology,
    /// Alarm list and alarm-version notifications.
    AlarmClock,
    /// Device-level properties (status LED, zone attributes).
    DeviceProperties,
}

impl SonosService {
    /// Event categories every zone entity subscribes to.
    pub const EVENT_CATEGORIES: [SonosService; 4] = [
        Self::ZoneGroupTopology,
        Self::AVTransport,
        Self::RenderingControl,
        Self::AlarmClock,
    ];

    /// Returns the UPnP service URN for SOAP requests.
    #[must_use]
    pub fn urn(&self) -> &'static str {
        match self {
            Self::AVTransport => "urn:schemas-upnp-org:service:AVTransport:1",
            Self::RenderingControl => "urn:schemas-upnp-org:service:RenderingControl:1",
            Self::ZoneGroupTopology => "urn:schemas-upnp-org:service:ZoneGroupTopology:1",
            Self::AlarmClock => "urn:schemas-upnp-org:service:AlarmClock:1",
            Self::DeviceProperties => "urn:schemas-upnp-org:service:DeviceProperties:1",
        }
    }

    /// Returns the UPnP control endpoint path for SOAP requests.
    #[must_use]
    pub fn control_path(&self) -> &'static str {
        match self {
            Self::AVTransport => "/MediaRenderer/AVTransport/Control",
            Self::RenderingControl => "/MediaRenderer/RenderingControl/Control",
            Self::ZoneGroupTopology => "/ZoneGroupTopology/Control",
            Self::AlarmClock => "/AlarmClock/Control",
            Self::DeviceProperties => "/DeviceProperties/Control",
        }
    }

    /// Returns the UPnP event endpoint path for GENA subscriptions.
    #[must_use]
    pub fn event_path(&self) -> &'static str {
        match self {
            Self::AVTransport => "/MediaRenderer/AVTransport/Event",
            Self::RenderingControl => "/MediaRenderer/RenderingControl/Event",
            Self::ZoneGroupTopology => "/ZoneGroupTopology/Event",
            Self::AlarmClock => "/AlarmClock/Event",
            Self::DeviceProperties => "/DeviceProperties/Event",
        }
    }

    /// Returns a human-readable name for this service.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::AVTransport => "AVTransport",
            Self::RenderingControl => "RenderingControl",
            Self::ZoneGroupTopology => "ZoneGroupTopology",
            Self::AlarmClock => "AlarmClock",
            Self::DeviceProperties => "DeviceProperties",
        }
    }
}

impl std::fmt::Display for SonosService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

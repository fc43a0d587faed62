//! Device control for individual zone players.
//!
//! Writes are expressed as [`DeviceAction`] values that lower to SOAP call
//! descriptors, so the dispatch is a plain match instead of a name lookup.
//! Reads are typed query methods on the [`DeviceControl`] trait.

use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;

use crate::protocol_constants::{SOAP_TIMEOUT_SECS, STATUS_ZP_PATH};
use crate::sonos::alarms::{parse_alarm_list, AlarmMap};
use crate::sonos::metadata::{parse_status_zp, ZoneMetadata};
use crate::sonos::retry::with_retry;
use crate::sonos::services::SonosService;
use crate::sonos::soap::{send_soap_request, SoapError, SoapResult};
use crate::sonos::types::TransportState;
use crate::sonos::utils::{build_sonos_url, extract_xml_text};

// ─────────────────────────────────────────────────────────────────────────────
// Actions
// ─────────────────────────────────────────────────────────────────────────────

/// A single SOAP request: service, action name and ordered arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SoapCall {
    pub service: SonosService,
    pub action: &'static str,
    pub args: Vec<(&'static str, String)>,
}

impl SoapCall {
    fn new(service: SonosService, action: &'static str) -> Self {
        Self {
            service,
            action,
            args: Vec::new(),
        }
    }

    fn arg(mut self, key: &'static str, value: impl Into<String>) -> Self {
        self.args.push((key, value.into()));
        self
    }

    fn instance_id(self) -> Self {
        self.arg("InstanceID", "0")
    }

    fn master(self) -> Self {
        self.instance_id().arg("Channel", "Master")
    }
}

/// Every write a zone player accepts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeviceAction {
    Play,
    Pause,
    Stop,
    Next,
    Previous,
    /// Seek within the current track to `HH:MM:SS`.
    Seek(String),
    /// Replace the transport source and start playing it.
    PlayUri { uri: String, metadata: String },
    /// Switch to the zone's queue and play the track at a 0-based index.
    PlayFromQueue { uid: String, index: u32 },
    SetVolume(u8),
    SetMute(bool),
    SetBass(i8),
    SetTreble(i8),
    SetLoudness(bool),
    SetLed(bool),
    /// Play mode name (`normal`, `shuffle`, `repeat_all`, ...).
    SetPlayMode(String),
}

fn flag(value: bool) -> &'static str {
    if value {
        "1"
    } else {
        "0"
    }
}

fn play_call() -> SoapCall {
    SoapCall::new(SonosService::AVTransport, "Play")
        .instance_id()
        .arg("Speed", "1")
}

fn set_uri_call(uri: &str, metadata: &str) -> SoapCall {
    SoapCall::new(SonosService::AVTransport, "SetAVTransportURI")
        .instance_id()
        .arg("CurrentURI", uri)
        .arg("CurrentURIMetaData", metadata)
}

impl DeviceAction {
    /// Lowers the action into the SOAP requests that carry it out.
    ///
    /// Most actions are a single request. Source changes are followed by
    /// `Play`; `PlayFromQueue` also seeks to the track number in between.
    #[must_use]
    pub fn calls(&self) -> Vec<SoapCall> {
        use SonosService::{AVTransport, DeviceProperties, RenderingControl};

        match self {
            Self::Play => vec![play_call()],
            Self::Pause => vec![SoapCall::new(AVTransport, "Pause").instance_id()],
            Self::Stop => vec![SoapCall::new(AVTransport, "Stop").instance_id()],
            Self::Next => vec![SoapCall::new(AVTransport, "Next").instance_id()],
            Self::Previous => vec![SoapCall::new(AVTransport, "Previous").instance_id()],
            Self::Seek(target) => vec![SoapCall::new(AVTransport, "Seek")
                .instance_id()
                .arg("Unit", "REL_TIME")
                .arg("Target", target.as_str())],
            Self::PlayUri { uri, metadata } => vec![set_uri_call(uri, metadata), play_call()],
            Self::PlayFromQueue { uid, index } => vec![
                set_uri_call(&format!("x-rincon-queue:{}#0", uid.to_uppercase()), ""),
                SoapCall::new(AVTransport, "Seek")
                    .instance_id()
                    .arg("Unit", "TRACK_NR")
                    .arg("Target", (index + 1).to_string()),
                play_call(),
            ],
            Self::SetVolume(v) => vec![SoapCall::new(RenderingControl, "SetVolume")
                .master()
                .arg("DesiredVolume", (*v).min(100).to_string())],
            Self::SetMute(m) => vec![SoapCall::new(RenderingControl, "SetMute")
                .master()
                .arg("DesiredMute", flag(*m))],
            Self::SetBass(b) => vec![SoapCall::new(RenderingControl, "SetBass")
                .instance_id()
                .arg("DesiredBass", (*b).clamp(-10, 10).to_string())],
            Self::SetTreble(t) => vec![SoapCall::new(RenderingControl, "SetTreble")
                .instance_id()
                .arg("DesiredTreble", (*t).clamp(-10, 10).to_string())],
            Self::SetLoudness(l) => vec![SoapCall::new(RenderingControl, "SetLoudness")
                .master()
                .arg("DesiredLoudness", flag(*l))],
            Self::SetLed(on) => vec![SoapCall::new(DeviceProperties, "SetLEDState")
                .arg("DesiredLEDState", if *on { "On" } else { "Off" })],
            Self::SetPlayMode(mode) => vec![SoapCall::new(AVTransport, "SetPlayMode")
                .instance_id()
                .arg("NewPlayMode", mode.to_uppercase())],
        }
    }

    /// Transport actions are retried on transient faults.
    fn is_transport(&self) -> bool {
        matches!(
            self,
            Self::Play
                | Self::Pause
                | Self::Stop
                | Self::Next
                | Self::Previous
                | Self::Seek(_)
                | Self::PlayUri { .. }
                | Self::PlayFromQueue { .. }
        )
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Queries
// ─────────────────────────────────────────────────────────────────────────────

/// Current track details from `GetPositionInfo`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TrackInfo {
    pub uri: String,
    /// `H:MM:SS`, `0:00:00` for streams.
    pub duration: String,
    /// Elapsed time, `H:MM:SS`.
    pub position: String,
    /// Decoded DIDL-Lite of the current track.
    pub metadata: String,
    /// 1-based queue position, 0 when not playing from the queue.
    pub playlist_position: u32,
}

/// Parses a `GetPositionInfo` response.
pub fn parse_position_info(xml: &str) -> SoapResult<TrackInfo> {
    let text = |name: &str| extract_xml_text(xml, name);

    Ok(TrackInfo {
        uri: text("TrackURI").unwrap_or_default(),
        duration: text("TrackDuration").unwrap_or_default(),
        position: text("RelTime").ok_or(SoapError::Parse)?,
        metadata: text("TrackMetaData")
            .filter(|m| m != "NOT_IMPLEMENTED")
            .unwrap_or_default(),
        playlist_position: text("Track").and_then(|t| t.parse().ok()).unwrap_or(0),
    })
}

/// Operations on a single zone player.
///
/// Production code talks SOAP through [`SonosDevice`]; tests substitute a
/// recording double.
#[async_trait]
pub trait DeviceControl: Send + Sync {
    /// Carries out a write on the device at `ip`.
    async fn perform(&self, ip: &str, action: &DeviceAction) -> SoapResult<()>;

    async fn volume(&self, ip: &str) -> SoapResult<u8>;
    async fn mute(&self, ip: &str) -> SoapResult<bool>;
    async fn bass(&self, ip: &str) -> SoapResult<i8>;
    async fn treble(&self, ip: &str) -> SoapResult<i8>;
    async fn loudness(&self, ip: &str) -> SoapResult<bool>;
    async fn led(&self, ip: &str) -> SoapResult<bool>;
    /// Lowercased play mode.
    async fn play_mode(&self, ip: &str) -> SoapResult<String>;
    async fn transport_state(&self, ip: &str) -> SoapResult<TransportState>;
    async fn track_info(&self, ip: &str) -> SoapResult<TrackInfo>;

    /// Lists the alarms that belong to the zone `uid`.
    async fn list_alarms(&self, ip: &str, uid: &str) -> SoapResult<AlarmMap>;

    /// Fetches the `/status/zp` identity document.
    async fn fetch_metadata(&self, ip: &str) -> SoapResult<ZoneMetadata>;
}

/// SOAP-backed [`DeviceControl`].
#[derive(Clone)]
pub struct SonosDevice {
    client: Client,
}

impl SonosDevice {
    #[must_use]
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    async fn send(&self, ip: &str, call: &SoapCall) -> SoapResult<String> {
        let args: Vec<(&str, &str)> = call.args.iter().map(|(k, v)| (*k, v.as_str())).collect();
        send_soap_request(&self.client, ip, call.service, call.action, &args).await
    }

    /// Sends a query and extracts one element of the response.
    async fn query(
        &self,
        ip: &str,
        call: SoapCall,
        element: &str,
    ) -> SoapResult<String> {
        let response = self.send(ip, &call).await?;
        extract_xml_text(&response, element).ok_or(SoapError::Parse)
    }

    async fn query_number<T: std::str::FromStr>(
        &self,
        ip: &str,
        call: SoapCall,
        element: &str,
    ) -> SoapResult<T> {
        self.query(ip, call, element)
            .await?
            .trim()
            .parse()
            .map_err(|_| SoapError::Parse)
    }
}

#[async_trait]
impl DeviceControl for SonosDevice {
    async fn perform(&self, ip: &str, action: &DeviceAction) -> SoapResult<()> {
        log::debug!("[Sonos] {:?} -> {}", action, ip);
        for call in action.calls() {
            if action.is_transport() {
                with_retry(call.action, || self.send(ip, &call)).await?;
            } else {
                self.send(ip, &call).await?;
            }
        }
        Ok(())
    }

    async fn volume(&self, ip: &str) -> SoapResult<u8> {
        let call = SoapCall::new(SonosService::RenderingControl, "GetVolume").master();
        self.query_number(ip, call, "CurrentVolume").await
    }

    async fn mute(&self, ip: &str) -> SoapResult<bool> {
        let call = SoapCall::new(SonosService::RenderingControl, "GetMute").master();
        Ok(self.query(ip, call, "CurrentMute").await? == "1")
    }

    async fn bass(&self, ip: &str) -> SoapResult<i8> {
        let call = SoapCall::new(SonosService::RenderingControl, "GetBass").instance_id();
        self.query_number(ip, call, "CurrentBass").await
    }

    async fn treble(&self, ip: &str) -> SoapResult<i8> {
        let call = SoapCall::new(SonosService::RenderingControl, "GetTreble").instance_id();
        self.query_number(ip, call, "CurrentTreble").await
    }

    async fn loudness(&self, ip: &str) -> SoapResult<bool> {
        let call = SoapCall::new(SonosService::RenderingControl, "GetLoudness").master();
        Ok(self.query(ip, call, "CurrentLoudness").await? == "1")
    }

    async fn led(&self, ip: &str) -> SoapResult<bool> {
        let call = SoapCall::new(SonosService::DeviceProperties, "GetLEDState");
        Ok(self.query(ip, call, "CurrentLEDState").await? == "On")
    }

    async fn play_mode(&self, ip: &str) -> SoapResult<String> {
        let call = SoapCall::new(SonosService::AVTransport, "GetTransportSettings").instance_id();
        Ok(self.query(ip, call, "PlayMode").await?.to_lowercase())
    }

    async fn transport_state(&self, ip: &str) -> SoapResult<TransportState> {
        let call = SoapCall::new(SonosService::AVTransport, "GetTransportInfo").instance_id();
        self.query(ip, call, "CurrentTransportState")
            .await?
            .parse()
            .map_err(|()| SoapError::Parse)
    }

    async fn track_info(&self, ip: &str) -> SoapResult<TrackInfo> {
        let call = SoapCall::new(SonosService::AVTransport, "GetPositionInfo").instance_id();
        let response = self.send(ip, &call).await?;
        parse_position_info(&response)
    }

    async fn list_alarms(&self, ip: &str, uid: &str) -> SoapResult<AlarmMap> {
        let call = SoapCall::new(SonosService::AlarmClock, "ListAlarms");
        let list = self.query(ip, call, "CurrentAlarmList").await?;
        parse_alarm_list(&list, uid).map_err(|e| {
            log::warn!("[Sonos] Malformed alarm list from {}: {}", ip, e);
            SoapError::Parse
        })
    }

    async fn fetch_metadata(&self, ip: &str) -> SoapResult<ZoneMetadata> {
        let url = build_sonos_url(ip, STATUS_ZP_PATH);
        let res = self
            .client
            .get(&url)
            .timeout(Duration::from_secs(SOAP_TIMEOUT_SECS))
            .send()
            .await?;

        let status = res.status();
        let body = res.text().await?;
        if !status.is_success() {
            return Err(SoapError::HttpStatus(status.as_u16(), body));
        }

        parse_status_zp(&body).ok_or(SoapError::Parse)
    }
}

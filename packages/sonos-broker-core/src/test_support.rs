//! Test doubles for the network-facing traits.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::Mutex;

use crate::publish::{PublishError, PublishResult, PublishSink};
use crate::sonos::alarms::AlarmMap;
use crate::sonos::device::{DeviceAction, DeviceControl, TrackInfo};
use crate::sonos::discovery::{DiscoveredZone, DiscoveryError, DiscoveryResult, ZoneProbe};
use crate::sonos::gena_client::{
    GenaError, GenaResult, SubscribeResponse, SubscriptionTransport,
};
use crate::sonos::metadata::ZoneMetadata;
use crate::sonos::services::SonosService;
use crate::sonos::soap::{SoapError, SoapResult};
use crate::sonos::types::TransportState;

// ─────────────────────────────────────────────────────────────────────────────
// Publish sink
// ─────────────────────────────────────────────────────────────────────────────

/// Keeps every payload; can be switched into a failing mode.
#[derive(Default)]
pub struct RecordingSink {
    payloads: Mutex<Vec<Bytes>>,
    failing: AtomicBool,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Delivered payloads parsed as JSON.
    pub fn payloads(&self) -> Vec<serde_json::Value> {
        self.payloads
            .lock()
            .iter()
            .map(|p| serde_json::from_slice(p).unwrap())
            .collect()
    }

    /// Delivered payloads for one zone.
    pub fn payloads_for(&self, uid: &str) -> Vec<serde_json::Value> {
        self.payloads()
            .into_iter()
            .filter(|p| p["uid"] == uid)
            .collect()
    }
}

#[async_trait]
impl PublishSink for RecordingSink {
    async fn send(&self, payload: Bytes) -> PublishResult<()> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(PublishError::Io(std::io::Error::new(
                std::io::ErrorKind::ConnectionRefused,
                "sink down",
            )));
        }
        self.payloads.lock().push(payload);
        Ok(())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Device control
// ─────────────────────────────────────────────────────────────────────────────

/// Device state served by [`MockDevice`].
#[derive(Debug, Clone)]
pub struct MockState {
    pub volume: u8,
    pub mute: bool,
    pub bass: i8,
    pub treble: i8,
    pub loudness: bool,
    pub led: bool,
    pub play_mode: String,
    pub transport: TransportState,
    pub track: TrackInfo,
    pub alarms: AlarmMap,
}

impl Default for MockState {
    fn default() -> Self {
        Self {
            volume: 20,
            mute: false,
            bass: 0,
            treble: 0,
            loudness: true,
            led: true,
            play_mode: "normal".into(),
            transport: TransportState::Stopped,
            track: TrackInfo::default(),
            alarms: AlarmMap::new(),
        }
    }
}

/// In-memory zone players keyed by ip.
///
/// Actions are recorded and applied to the shared [`MockState`]. Ips marked
/// unreachable fail every call; a fault can be injected per action name.
#[derive(Default)]
pub struct MockDevice {
    pub state: Mutex<MockState>,
    metadata: Mutex<HashMap<String, ZoneMetadata>>,
    actions: Mutex<Vec<(String, DeviceAction)>>,
    unreachable: Mutex<HashSet<String>>,
    faults: Mutex<HashMap<&'static str, u16>>,
}

impl MockDevice {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers the `/status/zp` answer for `ip`.
    pub fn add_zone(&self, ip: &str, uid: &str, zone_name: &str) {
        self.metadata.lock().insert(
            ip.to_string(),
            ZoneMetadata {
                uid: uid.to_string(),
                zone_name: zone_name.to_string(),
                zone_icon: "x-rincon-roomicon:living".into(),
                serial_number: "00-0E-58-00-00-01:1".into(),
                software_version: "57.3-77280".into(),
                hardware_version: "1.20.1.6-2".into(),
                mac_address: "00:0E:58:00:00:01".into(),
            },
        );
    }

    pub fn set_unreachable(&self, ip: &str) {
        self.unreachable.lock().insert(ip.to_string());
    }

    /// Makes every call of `action` fail with UPnP error `code`.
    pub fn inject_fault(&self, action: &'static str, code: u16) {
        self.faults.lock().insert(action, code);
    }

    pub fn actions(&self) -> Vec<(String, DeviceAction)> {
        self.actions.lock().clone()
    }

    pub fn actions_for(&self, ip: &str) -> Vec<DeviceAction> {
        self.actions
            .lock()
            .iter()
            .filter(|(i, _)| i == ip)
            .map(|(_, a)| a.clone())
            .collect()
    }

    fn check(&self, ip: &str) -> SoapResult<()> {
        if self.unreachable.lock().contains(ip) {
            return Err(SoapError::HttpStatus(503, format!("{ip} unreachable")));
        }
        Ok(())
    }

    fn apply(&self, action: &DeviceAction) {
        let mut state = self.state.lock();
        match action {
            DeviceAction::Play => state.transport = TransportState::Playing,
            DeviceAction::Pause => state.transport = TransportState::PausedPlayback,
            DeviceAction::Stop => state.transport = TransportState::Stopped,
            DeviceAction::Seek(target) => state.track.position = target.clone(),
            DeviceAction::PlayUri { uri, metadata } => {
                state.track.uri = uri.clone();
                state.track.metadata = metadata.clone();
                state.transport = TransportState::Playing;
            }
            DeviceAction::PlayFromQueue { index, .. } => {
                state.track.playlist_position = index + 1;
                state.transport = TransportState::Playing;
            }
            DeviceAction::SetVolume(v) => state.volume = *v,
            DeviceAction::SetMute(m) => state.mute = *m,
            DeviceAction::SetBass(b) => state.bass = *b,
            DeviceAction::SetTreble(t) => state.treble = *t,
            DeviceAction::SetLoudness(l) => state.loudness = *l,
            DeviceAction::SetLed(l) => state.led = *l,
            DeviceAction::SetPlayMode(m) => state.play_mode = m.to_lowercase(),
            DeviceAction::Next | DeviceAction::Previous => {}
        }
    }
}

#[async_trait]
impl DeviceControl for MockDevice {
    async fn perform(&self, ip: &str, action: &DeviceAction) -> SoapResult<()> {
        self.check(ip)?;
        self.actions.lock().push((ip.to_string(), action.clone()));

        for call in action.calls() {
            if let Some(&code) = self.faults.lock().get(call.action) {
                return Err(SoapError::Fault {
                    code: Some(code),
                    description: format!("injected fault on {}", call.action),
                });
            }
        }

        self.apply(action);
        Ok(())
    }

    async fn volume(&self, ip: &str) -> SoapResult<u8> {
        self.check(ip)?;
        Ok(self.state.lock().volume)
    }

    async fn mute(&self, ip: &str) -> SoapResult<bool> {
        self.check(ip)?;
        Ok(self.state.lock().mute)
    }

    async fn bass(&self, ip: &str) -> SoapResult<i8> {
        self.check(ip)?;
        Ok(self.state.lock().bass)
    }

    async fn treble(&self, ip: &str) -> SoapResult<i8> {
        self.check(ip)?;
        Ok(self.state.lock().treble)
    }

    async fn loudness(&self, ip: &str) -> SoapResult<bool> {
        self.check(ip)?;
        Ok(self.state.lock().loudness)
    }

    async fn led(&self, ip: &str) -> SoapResult<bool> {
        self.check(ip)?;
        Ok(self.state.lock().led)
    }

    async fn play_mode(&self, ip: &str) -> SoapResult<String> {
        self.check(ip)?;
        Ok(self.state.lock().play_mode.clone())
    }

    async fn transport_state(&self, ip: &str) -> SoapResult<TransportState> {
        self.check(ip)?;
        Ok(self.state.lock().transport)
    }

    async fn track_info(&self, ip: &str) -> SoapResult<TrackInfo> {
        self.check(ip)?;
        Ok(self.state.lock().track.clone())
    }

    async fn list_alarms(&self, ip: &str, _uid: &str) -> SoapResult<AlarmMap> {
        self.check(ip)?;
        Ok(self.state.lock().alarms.clone())
    }

    async fn fetch_metadata(&self, ip: &str) -> SoapResult<ZoneMetadata> {
        self.check(ip)?;
        self.metadata
            .lock()
            .get(ip)
            .cloned()
            .ok_or(SoapError::HttpStatus(404, "no /status/zp".into()))
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Subscription transport
// ─────────────────────────────────────────────────────────────────────────────

/// Hands out sequential SIDs and records every call.
#[derive(Default)]
pub struct MockSubscriber {
    next_sid: AtomicUsize,
    subscribes: Mutex<Vec<(String, SonosService, String)>>,
    renewals: Mutex<Vec<String>>,
    unsubscribes: Mutex<Vec<String>>,
    failing: AtomicBool,
    /// Lease granted by the device, overriding the requested one.
    pub granted_secs: Mutex<Option<u64>>,
}

impl MockSubscriber {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// `(ip, category, callback)` of every SUBSCRIBE.
    pub fn subscribes(&self) -> Vec<(String, SonosService, String)> {
        self.subscribes.lock().clone()
    }

    pub fn renewals(&self) -> Vec<String> {
        self.renewals.lock().clone()
    }

    pub fn unsubscribes(&self) -> Vec<String> {
        self.unsubscribes.lock().clone()
    }
}

#[async_trait]
impl SubscriptionTransport for MockSubscriber {
    async fn subscribe(
        &self,
        ip: &str,
        service: SonosService,
        callback_url: &str,
        lease_secs: u64,
    ) -> GenaResult<SubscribeResponse> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(GenaError::SubscriptionFailed(503));
        }
        self.subscribes
            .lock()
            .push((ip.to_string(), service, callback_url.to_string()));
        let n = self.next_sid.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(SubscribeResponse {
            sid: format!("uuid:sub-{n}"),
            timeout_secs: self.granted_secs.lock().unwrap_or(lease_secs),
        })
    }

    async fn renew(
        &self,
        _ip: &str,
        _service: SonosService,
        sid: &str,
        lease_secs: u64,
    ) -> GenaResult<u64> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(GenaError::RenewalFailed(412));
        }
        self.renewals.lock().push(sid.to_string());
        Ok(self.granted_secs.lock().unwrap_or(lease_secs))
    }

    async fn unsubscribe(&self, _ip: &str, _service: SonosService, sid: &str) -> GenaResult<()> {
        self.unsubscribes.lock().push(sid.to_string());
        if self.failing.load(Ordering::SeqCst) {
            return Err(GenaError::UnsubscribeFailed(412));
        }
        Ok(())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Discovery probe
// ─────────────────────────────────────────────────────────────────────────────

/// Returns a fixed set of responses until changed.
#[derive(Default)]
pub struct StaticProbe {
    zones: Mutex<Vec<DiscoveredZone>>,
    failing: AtomicBool,
    probes: AtomicUsize,
}

impl StaticProbe {
    pub fn new(zones: Vec<DiscoveredZone>) -> Self {
        Self {
            zones: Mutex::new(zones),
            ..Self::default()
        }
    }

    pub fn set(&self, zones: Vec<DiscoveredZone>) {
        *self.zones.lock() = zones;
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn probe_count(&self) -> usize {
        self.probes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ZoneProbe for StaticProbe {
    async fn probe(&self) -> DiscoveryResult<Vec<DiscoveredZone>> {
        self.probes.fetch_add(1, Ordering::SeqCst);
        if self.failing.load(Ordering::SeqCst) {
            return Err(DiscoveryError::NoInterfaces);
        }
        Ok(self.zones.lock().clone())
    }
}

/// A discovered zone with a generic model.
pub fn discovered(uid: &str, ip: &str) -> DiscoveredZone {
    DiscoveredZone {
        uid: uid.to_string(),
        ip: ip.to_string(),
        model: "ZPS5".into(),
    }
}

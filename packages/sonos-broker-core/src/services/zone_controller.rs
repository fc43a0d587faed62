//! Direct zone commands.
//!
//! Every command talks to the device first and only updates the registry
//! once the device accepted it, then publishes the resulting dirty fields.
//! Transport commands and play mode always run on the group coordinator.
//! Rendering commands take a `group_command` flag that fans the write out to
//! the coordinator and every member.

use std::sync::Arc;

use thiserror::Error;

use crate::protocol_constants::VOLUME_STEP;
use crate::publish::Publisher;
use crate::sonos::device::{DeviceAction, DeviceControl, TrackInfo};
use crate::sonos::didl::{absolute_album_art, parse_didl, stream_type};
use crate::sonos::soap::SoapError;
use crate::zone::{ZoneEntity, ZoneField, ZoneRegistry};

/// Errors returned by zone commands.
#[derive(Debug, Error)]
pub enum ZoneError {
    /// The uid is not in the registry.
    #[error("Unknown zone: {0}")]
    UnknownZone(String),

    /// The value is outside the range the device accepts.
    #[error("Invalid value: {0}")]
    InvalidValue(String),

    /// The device rejected the command or could not be reached.
    #[error(transparent)]
    Device(#[from] SoapError),
}

impl ZoneError {
    /// UPnP fault code when the device answered with a fault.
    #[must_use]
    pub fn fault_code(&self) -> Option<u16> {
        match self {
            Self::Device(e) => e.fault_code(),
            _ => None,
        }
    }
}

/// Convenient Result alias for zone commands.
pub type ZoneResult<T> = Result<T, ZoneError>;

fn check_eq(name: &str, value: i8) -> ZoneResult<i8> {
    if (-10..=10).contains(&value) {
        Ok(value)
    } else {
        Err(ZoneError::InvalidValue(format!("{name} {value} outside -10..=10")))
    }
}

fn check_volume(name: &str, value: u8) -> ZoneResult<u8> {
    if value <= 100 {
        Ok(value)
    } else {
        Err(ZoneError::InvalidValue(format!("{name} {value} outside 0..=100")))
    }
}

/// Runs commands against zones and keeps the registry in step.
pub struct ZoneController {
    registry: Arc<ZoneRegistry>,
    device: Arc<dyn DeviceControl>,
    publisher: Arc<Publisher>,
}

impl ZoneController {
    pub fn new(
        registry: Arc<ZoneRegistry>,
        device: Arc<dyn DeviceControl>,
        publisher: Arc<Publisher>,
    ) -> Self {
        Self {
            registry,
            device,
            publisher,
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Target resolution
    // ─────────────────────────────────────────────────────────────────────────

    fn ip_of(&self, uid: &str) -> ZoneResult<String> {
        self.registry
            .view(uid, |v| v.zone().ip.clone())
            .ok_or_else(|| ZoneError::UnknownZone(uid.to_string()))
    }

    /// `(uid, ip)` of the coordinator `uid` resolves to.
    fn coordinator(&self, uid: &str) -> ZoneResult<(String, String)> {
        self.registry
            .coordinator_endpoint(uid)
            .ok_or_else(|| ZoneError::UnknownZone(uid.to_string()))
    }

    fn targets(&self, uid: &str, group_command: bool) -> ZoneResult<Vec<(String, String)>> {
        if group_command {
            let endpoints = self.registry.group_endpoints(uid);
            if endpoints.is_empty() {
                return Err(ZoneError::UnknownZone(uid.to_string()));
            }
            Ok(endpoints)
        } else {
            Ok(vec![(uid.to_string(), self.ip_of(uid)?)])
        }
    }

    fn local<R>(&self, uid: &str, f: impl FnOnce(&mut ZoneEntity) -> R) -> ZoneResult<R> {
        self.registry
            .with_zone(uid, f)
            .ok_or_else(|| ZoneError::UnknownZone(uid.to_string()))
    }

    /// Publishes dirty fields of every zone in `uid`'s group. Failures are
    /// logged; the fields stay dirty for the next publish.
    async fn publish_group(&self, uid: &str) {
        for (member, _) in self.registry.group_endpoints(uid) {
            if let Err(e) = self.publisher.publish_dirty(&member).await {
                log::warn!("[Zone] Publish of {} failed: {}", member, e);
            }
        }
    }

    /// Applies a device-local write to each target, then publishes.
    async fn fan_out(
        &self,
        uid: &str,
        group_command: bool,
        action: impl Fn(&ZoneEntity) -> DeviceAction,
        apply: impl Fn(&mut ZoneEntity),
    ) -> ZoneResult<()> {
        for (target, ip) in self.targets(uid, group_command)? {
            let Some(action) = self.registry.with_zone(&target, |z| action(z)) else {
                continue;
            };
            self.device.perform(&ip, &action).await?;
            self.registry.with_zone(&target, &apply);
            self.publish_group(&target).await;
        }
        Ok(())
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Rendering
    // ─────────────────────────────────────────────────────────────────────────

    /// Sets the volume, clamped per zone to its `max_volume`.
    pub async fn set_volume(&self, uid: &str, volume: u8, group_command: bool) -> ZoneResult<()> {
        let volume = check_volume("volume", volume)?;
        self.fan_out(
            uid,
            group_command,
            |z| DeviceAction::SetVolume(volume.min(z.max_volume.unwrap_or(100))),
            |z| {
                z.set_volume(volume);
            },
        )
        .await
    }

    /// Raises the volume by one step on each target.
    pub async fn volume_up(&self, uid: &str, group_command: bool) -> ZoneResult<()> {
        self.step_volume(uid, group_command, |v| v.saturating_add(VOLUME_STEP).min(100))
            .await
    }

    /// Lowers the volume by one step on each target.
    pub async fn volume_down(&self, uid: &str, group_command: bool) -> ZoneResult<()> {
        self.step_volume(uid, group_command, |v| v.saturating_sub(VOLUME_STEP))
            .await
    }

    async fn step_volume(
        &self,
        uid: &str,
        group_command: bool,
        step: impl Fn(u8) -> u8,
    ) -> ZoneResult<()> {
        for (target, ip) in self.targets(uid, group_command)? {
            let Some(next) = self.registry.with_zone(&target, |z| {
                step(z.volume).min(z.max_volume.unwrap_or(100))
            }) else {
                continue;
            };
            self.device.perform(&ip, &DeviceAction::SetVolume(next)).await?;
            self.registry.with_zone(&target, |z| z.set_volume(next));
            self.publish_group(&target).await;
        }
        Ok(())
    }

    /// Sets or clears the volume ceiling of one zone.
    ///
    /// The ceiling is enforced locally; the device only hears about it when
    /// the current volume has to come down.
    pub async fn set_max_volume(&self, uid: &str, max: Option<u8>) -> ZoneResult<()> {
        let max = max.map(|m| check_volume("max_volume", m)).transpose()?;
        let (ip, lowered) = self.local(uid, |z| {
            let lowered = max.filter(|m| z.volume > *m);
            (z.ip.clone(), lowered)
        })?;

        if let Some(volume) = lowered {
            self.device.perform(&ip, &DeviceAction::SetVolume(volume)).await?;
        }
        self.local(uid, |z| z.set_max_volume(max))?;
        self.publish_group(uid).await;
        Ok(())
    }

    pub async fn set_mute(&self, uid: &str, mute: bool, group_command: bool) -> ZoneResult<()> {
        self.fan_out(uid, group_command, |_| DeviceAction::SetMute(mute), |z| {
            z.set_mute(mute);
        })
        .await
    }

    pub async fn set_bass(&self, uid: &str, bass: i8, group_command: bool) -> ZoneResult<()> {
        let bass = check_eq("bass", bass)?;
        self.fan_out(uid, group_command, |_| DeviceAction::SetBass(bass), |z| {
            z.set_bass(bass);
        })
        .await
    }

    pub async fn set_treble(&self, uid: &str, treble: i8, group_command: bool) -> ZoneResult<()> {
        let treble = check_eq("treble", treble)?;
        self.fan_out(uid, group_command, |_| DeviceAction::SetTreble(treble), |z| {
            z.set_treble(treble);
        })
        .await
    }

    pub async fn set_loudness(
        &self,
        uid: &str,
        loudness: bool,
        group_command: bool,
    ) -> ZoneResult<()> {
        self.fan_out(uid, group_command, |_| DeviceAction::SetLoudness(loudness), |z| {
            z.set_loudness(loudness);
        })
        .await
    }

    pub async fn set_led(&self, uid: &str, led: bool, group_command: bool) -> ZoneResult<()> {
        self.fan_out(uid, group_command, |_| DeviceAction::SetLed(led), |z| {
            z.set_led(led);
        })
        .await
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Transport (coordinator)
    // ─────────────────────────────────────────────────────────────────────────

    async fn transport(&self, uid: &str, action: DeviceAction) -> ZoneResult<String> {
        let (coordinator, ip) = self.coordinator(uid)?;
        log::debug!("[Zone] {:?} on {} via {}", action, uid, coordinator);
        self.device.perform(&ip, &action).await?;
        Ok(coordinator)
    }

    fn set_flags(&self, uid: &str, play: bool, pause: bool, stop: bool) {
        self.registry
            .set_group(uid, ZoneField::Play, |g| &mut g.play, play);
        self.registry
            .set_group(uid, ZoneField::Pause, |g| &mut g.pause, pause);
        self.registry
            .set_group(uid, ZoneField::Stop, |g| &mut g.stop, stop);
    }

    pub async fn play(&self, uid: &str) -> ZoneResult<()> {
        let coordinator = self.transport(uid, DeviceAction::Play).await?;
        self.set_flags(&coordinator, true, false, false);
        self.publish_group(&coordinator).await;
        Ok(())
    }

    pub async fn pause(&self, uid: &str) -> ZoneResult<()> {
        let coordinator = self.transport(uid, DeviceAction::Pause).await?;
        self.set_flags(&coordinator, false, true, false);
        self.publish_group(&coordinator).await;
        Ok(())
    }

    pub async fn stop(&self, uid: &str) -> ZoneResult<()> {
        let coordinator = self.transport(uid, DeviceAction::Stop).await?;
        self.set_flags(&coordinator, false, false, true);
        self.publish_group(&coordinator).await;
        Ok(())
    }

    pub async fn next(&self, uid: &str) -> ZoneResult<()> {
        self.transport(uid, DeviceAction::Next).await.map(drop)
    }

    pub async fn previous(&self, uid: &str) -> ZoneResult<()> {
        self.transport(uid, DeviceAction::Previous).await.map(drop)
    }

    /// Seeks within the current track (`H:MM:SS`).
    pub async fn seek(&self, uid: &str, position: &str) -> ZoneResult<()> {
        self.transport(uid, DeviceAction::Seek(position.to_string()))
            .await
            .map(drop)
    }

    /// Replaces the transport source with `uri` and starts playback.
    pub async fn play_uri(&self, uid: &str, uri: &str, metadata: &str) -> ZoneResult<()> {
        let action = DeviceAction::PlayUri {
            uri: uri.to_string(),
            metadata: metadata.to_string(),
        };
        let coordinator = self.transport(uid, action).await?;
        self.set_flags(&coordinator, true, false, false);
        self.publish_group(&coordinator).await;
        Ok(())
    }

    /// Plays the coordinator's queue starting at the 0-based `index`.
    pub async fn play_from_queue(&self, uid: &str, index: u32) -> ZoneResult<()> {
        let (coordinator, _) = self.coordinator(uid)?;
        let action = DeviceAction::PlayFromQueue {
            uid: coordinator,
            index,
        };
        let coordinator = self.transport(uid, action).await?;
        self.set_flags(&coordinator, true, false, false);
        self.publish_group(&coordinator).await;
        Ok(())
    }

    /// Sets the play mode (`normal`, `repeat_all`, `shuffle`, ...).
    pub async fn set_playmode(&self, uid: &str, mode: &str) -> ZoneResult<()> {
        let mode = mode.trim();
        if mode.is_empty() {
            return Err(ZoneError::InvalidValue("empty play mode".into()));
        }
        let coordinator = self
            .transport(uid, DeviceAction::SetPlayMode(mode.to_uppercase()))
            .await?;
        self.registry
            .set_group(&coordinator, ZoneField::Playmode, |g| &mut g.playmode, mode.to_lowercase());
        self.publish_group(&coordinator).await;
        Ok(())
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Refresh
    // ─────────────────────────────────────────────────────────────────────────

    /// Reads position info from the coordinator and stores the track fields.
    pub async fn refresh_track_info(&self, uid: &str) -> ZoneResult<TrackInfo> {
        let (coordinator, ip) = self.coordinator(uid)?;
        let info = self.device.track_info(&ip).await?;
        let didl = parse_didl(&info.metadata).unwrap_or_default();

        let r = &self.registry;
        let c = coordinator.as_str();
        r.set_group(c, ZoneField::TrackUri, |g| &mut g.track_uri, info.uri.clone());
        r.set_group(
            c,
            ZoneField::Streamtype,
            |g| &mut g.streamtype,
            stream_type(&info.uri).to_string(),
        );
        r.set_group(
            c,
            ZoneField::TrackDuration,
            |g| &mut g.track_duration,
            info.duration.clone(),
        );
        r.set_group(
            c,
            ZoneField::TrackPosition,
            |g| &mut g.track_position,
            info.position.clone(),
        );
        r.set_group(
            c,
            ZoneField::PlaylistPosition,
            |g| &mut g.playlist_position,
            info.playlist_position,
        );
        r.set_group(c, ZoneField::TrackTitle, |g| &mut g.track_title, didl.title);
        r.set_group(c, ZoneField::TrackArtist, |g| &mut g.track_artist, didl.creator);
        r.set_group(
            c,
            ZoneField::TrackAlbumArt,
            |g| &mut g.track_album_art,
            absolute_album_art(&ip, &didl.album_art_uri),
        );
        r.with_group(c, |g| g.metadata = info.metadata.clone());

        self.publish_group(c).await;
        Ok(info)
    }

    /// Reads the transport state from the coordinator and stores the flags.
    pub async fn refresh_transport_state(&self, uid: &str) -> ZoneResult<bool> {
        let (coordinator, ip) = self.coordinator(uid)?;
        let state = self.device.transport_state(&ip).await?;
        if let Some((play, pause, stop)) = state.flags() {
            self.set_flags(&coordinator, play, pause, stop);
            self.publish_group(&coordinator).await;
        }
        Ok(state.flags().is_some_and(|(play, _, _)| play))
    }

    /// Reads the rendering state and play mode of one zone from the device.
    pub async fn refresh_state(&self, uid: &str) -> ZoneResult<()> {
        let ip = self.ip_of(uid)?;
        let volume = self.device.volume(&ip).await?;
        let mute = self.device.mute(&ip).await?;
        let bass = self.device.bass(&ip).await?;
        let treble = self.device.treble(&ip).await?;
        let loudness = self.device.loudness(&ip).await?;
        let led = self.device.led(&ip).await?;
        let play_mode = self.device.play_mode(&ip).await?;

        self.local(uid, |z| {
            z.set_volume(volume);
            z.set_mute(mute);
            z.set_bass(bass);
            z.set_treble(treble);
            z.set_loudness(loudness);
            z.set_led(led);
        })?;
        self.registry
            .set_group(uid, ZoneField::Playmode, |g| &mut g.playmode, play_mode);
        self.publish_group(uid).await;
        Ok(())
    }

    /// Reloads the alarms that target this zone.
    pub async fn refresh_alarms(&self, uid: &str) -> ZoneResult<()> {
        let ip = self.ip_of(uid)?;
        let alarms = self.device.list_alarms(&ip, uid).await?;
        let count = alarms.len();
        if self.local(uid, |z| z.set_alarms(alarms))? {
            log::debug!("[Zone] {} now has {} alarm(s)", uid, count);
            self.publish_group(uid).await;
        }
        Ok(())
    }
}

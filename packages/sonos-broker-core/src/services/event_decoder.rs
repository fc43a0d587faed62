//! Applies GENA notifications to zone state.
//!
//! A notification is matched to its zone and event category through the
//! lease index, parsed, written through the registry (coordinator-scoped
//! fields land on the coordinator), and the resulting dirty fields are
//! published. Unknown SIDs and malformed payloads are logged and dropped
//! without touching state.

use std::sync::Arc;

use crate::publish::Publisher;
use crate::runtime::{TaskSpawner, TokioSpawner};
use crate::services::lease_manager::LeaseManager;
use crate::services::zone_controller::ZoneController;
use crate::sonos::didl::{absolute_album_art, stream_type, DidlItem};
use crate::sonos::gena_parser::{
    parse_alarm_clock, parse_av_transport, parse_rendering_control, parse_zone_group_topology,
    AvTransportData, ParseResult, RenderingControlData,
};
use crate::sonos::services::SonosService;
use crate::zone::{ZoneField, ZoneRegistry};

/// Splits radio now-playing text (`Artist - Title`) into title and artist.
fn split_stream_content(content: &str) -> (String, String) {
    match content.split_once(" - ") {
        Some((artist, title)) => (title.trim().to_string(), artist.trim().to_string()),
        None => (content.trim().to_string(), String::new()),
    }
}

/// Decodes NOTIFY bodies into zone state changes.
pub struct EventDecoder {
    registry: Arc<ZoneRegistry>,
    leases: Arc<LeaseManager>,
    publisher: Arc<Publisher>,
    controller: Arc<ZoneController>,
    spawner: TokioSpawner,
}

impl EventDecoder {
    pub fn new(
        registry: Arc<ZoneRegistry>,
        leases: Arc<LeaseManager>,
        publisher: Arc<Publisher>,
        controller: Arc<ZoneController>,
        spawner: TokioSpawner,
    ) -> Self {
        Self {
            registry,
            leases,
            publisher,
            controller,
            spawner,
        }
    }

    /// Handles one NOTIFY delivery.
    ///
    /// Returns true when the payload was applied.
    pub async fn handle_notify(&self, sid: &str, body: &str) -> bool {
        let Some((uid, category)) = self.leases.resolve(sid) else {
            log::debug!("[GENA] Dropping notification for unknown SID {}", sid);
            return false;
        };
        if !self.registry.contains(&uid) {
            log::debug!("[GENA] Dropping notification for removed zone {}", uid);
            return false;
        }

        let applied = match category {
            SonosService::RenderingControl => parse_rendering_control(body)
                .map(|data| self.apply_rendering_control(&uid, data)),
            SonosService::AVTransport => {
                parse_av_transport(body).map(|data| self.apply_av_transport(&uid, data))
            }
            SonosService::ZoneGroupTopology => self.apply_topology(body).await,
            SonosService::AlarmClock => parse_alarm_clock(body).map(|data| {
                if let Some(version) = data.alarm_list_version {
                    log::debug!("[GENA] Alarm list of {} now at {}", uid, version);
                    self.schedule_alarm_refresh(&uid);
                }
            }),
            other => {
                log::debug!("[GENA] Ignoring {} notification from {}", other, uid);
                return false;
            }
        };

        if let Err(e) = applied {
            log::warn!("[GENA] Malformed {} notification from {}: {}", category, uid, e);
            return false;
        }

        self.publish(&uid).await;
        true
    }

    /// Publishes the dirty fields of the zone and everyone in its group.
    async fn publish(&self, uid: &str) {
        for (member, _) in self.registry.group_endpoints(uid) {
            if let Err(e) = self.publisher.publish_dirty(&member).await {
                log::warn!("[GENA] Publish of {} failed: {}", member, e);
            }
        }
    }

    fn apply_rendering_control(&self, uid: &str, data: RenderingControlData) {
        self.registry.with_zone(uid, |zone| {
            if let Some(volume) = data.volume {
                zone.set_volume(volume);
            }
            if let Some(mute) = data.mute {
                zone.set_mute(mute);
            }
            if let Some(bass) = data.bass {
                zone.set_bass(bass);
            }
            if let Some(treble) = data.treble {
                zone.set_treble(treble);
            }
            if let Some(loudness) = data.loudness {
                zone.set_loudness(loudness);
            }
        });
    }

    fn apply_av_transport(&self, uid: &str, data: AvTransportData) {
        let r = &self.registry;

        if let Some((play, pause, stop)) = data.transport_state.and_then(|s| s.flags()) {
            r.set_group(uid, ZoneField::Play, |g| &mut g.play, play);
            r.set_group(uid, ZoneField::Pause, |g| &mut g.pause, pause);
            r.set_group(uid, ZoneField::Stop, |g| &mut g.stop, stop);
        }
        if let Some(mode) = data.play_mode {
            r.set_group(uid, ZoneField::Playmode, |g| &mut g.playmode, mode);
        }
        if let Some(uri) = data.track_uri {
            let kind = stream_type(&uri).to_string();
            r.set_group(uid, ZoneField::TrackUri, |g| &mut g.track_uri, uri);
            r.set_group(uid, ZoneField::Streamtype, |g| &mut g.streamtype, kind);
        }
        if let Some(duration) = data.track_duration {
            r.set_group(uid, ZoneField::TrackDuration, |g| &mut g.track_duration, duration);
        }
        if let Some(position) = data.playlist_position {
            r.set_group(
                uid,
                ZoneField::PlaylistPosition,
                |g| &mut g.playlist_position,
                position,
            );
        }
        if let Some(metadata) = data.track_metadata {
            r.with_group(uid, |g| g.metadata = metadata);
        }
        if let Some(track) = data.track {
            self.apply_track(uid, track);
        }
        if let Some(station) = data.radio_station {
            r.set_group(uid, ZoneField::RadioStation, |g| &mut g.radio_station, station);
        }
    }

    fn apply_track(&self, uid: &str, track: DidlItem) {
        let r = &self.registry;
        let ip = r.view(uid, |v| v.zone().ip.clone()).unwrap_or_default();

        let (title, artist) = if track.stream_content.is_empty() {
            (track.title, track.creator)
        } else {
            split_stream_content(&track.stream_content)
        };

        r.set_group(uid, ZoneField::TrackTitle, |g| &mut g.track_title, title);
        r.set_group(uid, ZoneField::TrackArtist, |g| &mut g.track_artist, artist);
        r.set_group(
            uid,
            ZoneField::TrackAlbumArt,
            |g| &mut g.track_album_art,
            absolute_album_art(&ip, &track.album_art_uri),
        );
        r.set_group(uid, ZoneField::RadioShow, |g| &mut g.radio_show, track.radio_show);
    }

    async fn apply_topology(&self, body: &str) -> ParseResult<()> {
        let groups = parse_zone_group_topology(body)?;
        let changed = self.registry.apply_topology(&groups);
        if !changed.is_empty() {
            log::info!("[GENA] Topology changed for {} zone(s)", changed.len());
        }
        // Regrouping touches zones other than the sender
        self.publisher.publish_dirty_all().await;
        Ok(())
    }

    fn schedule_alarm_refresh(&self, uid: &str) {
        let controller = Arc::clone(&self.controller);
        let uid = uid.to_string();
        self.spawner.spawn(async move {
            if let Err(e) = controller.refresh_alarms(&uid).await {
                log::warn!("[GENA] Alarm refresh of {} failed: {}", uid, e);
            }
        });
    }
}

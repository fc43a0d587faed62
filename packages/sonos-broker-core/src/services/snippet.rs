//! Time-boxed interrupt playback.
//!
//! A snippet (doorbell chime, announcement) interrupts whatever a group is
//! playing, then puts the previous source, position and volume back. Each
//! snippet runs as its own task on the group coordinator; a coordinator
//! plays at most one snippet at a time.

use std::sync::Arc;
use std::time::Duration;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use thiserror::Error;
use tokio::task::JoinHandle;

use crate::protocol_constants::SNIPPET_DURATION_MARGIN_SECS;
use crate::runtime::TokioSpawner;
use crate::services::zone_controller::{ZoneController, ZoneError, ZoneResult};
use crate::sonos::utils::parse_hms_secs;
use crate::zone::ZoneRegistry;

/// UPnP fault raised when the restored source is no longer available.
const FAULT_TRANSITION_NOT_AVAILABLE: u16 = 701;

/// Errors returned by snippet playback.
#[derive(Debug, Error)]
pub enum SnippetError {
    /// The coordinator is already playing a snippet.
    #[error("Snippet already playing on {0}")]
    InFlight(String),

    #[error(transparent)]
    Zone(#[from] ZoneError),

    /// The snippet task panicked or was aborted.
    #[error("Snippet task failed: {0}")]
    Task(String),
}

/// Convenient Result alias for snippet playback.
pub type SnippetResult<T> = Result<T, SnippetError>;

/// How a finished snippet left the zone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SnippetOutcome {
    /// The previous playback was put back.
    Restored,
    /// Something else started playing meanwhile; playback was left alone.
    SourceChanged,
    /// The zone left the registry while the snippet played.
    ZoneRemoved,
}

/// Playback captured before the snippet interrupts it.
#[derive(Debug, Clone)]
struct Captured {
    streamtype: String,
    track_uri: String,
    playlist_position: u32,
    track_position: String,
    metadata: String,
    playing: bool,
    volume: u8,
    max_volume: Option<u8>,
}

/// Swallows the fault devices raise when the previous source cannot be
/// resumed; every other error propagates.
fn tolerate_unavailable(result: ZoneResult<()>, step: &str) -> ZoneResult<()> {
    match result {
        Err(e) if e.fault_code() == Some(FAULT_TRANSITION_NOT_AVAILABLE) => {
            log::info!("[Snippet] {} not possible, skipping: {}", step, e);
            Ok(())
        }
        other => other,
    }
}

/// Runs snippets, one task per coordinator.
pub struct SnippetOrchestrator {
    registry: Arc<ZoneRegistry>,
    controller: Arc<ZoneController>,
    spawner: TokioSpawner,
    fade: Duration,
    tasks: DashMap<String, JoinHandle<SnippetResult<SnippetOutcome>>>,
}

impl SnippetOrchestrator {
    pub fn new(
        registry: Arc<ZoneRegistry>,
        controller: Arc<ZoneController>,
        spawner: TokioSpawner,
        fade: Duration,
    ) -> Self {
        Self {
            registry,
            controller,
            spawner,
            fade,
            tasks: DashMap::new(),
        }
    }

    /// Starts a snippet on the coordinator of `uid`.
    ///
    /// `volume` is the snippet volume; `None` keeps the current volume.
    /// Returns the coordinator uid the snippet runs on.
    pub fn play(
        self: &Arc<Self>,
        uid: &str,
        uri: &str,
        volume: Option<u8>,
    ) -> SnippetResult<String> {
        let coordinator = self
            .registry
            .coordinator_of(uid)
            .ok_or_else(|| ZoneError::UnknownZone(uid.to_string()))?;
        if let Some(v) = volume.filter(|v| *v > 100) {
            return Err(ZoneError::InvalidValue(format!("volume {v} outside 0..=100")).into());
        }

        match self.tasks.entry(coordinator.clone()) {
            Entry::Occupied(e) if !e.get().is_finished() => {
                return Err(SnippetError::InFlight(coordinator));
            }
            Entry::Occupied(mut e) => {
                e.insert(self.spawn(&coordinator, uri, volume));
            }
            Entry::Vacant(e) => {
                e.insert(self.spawn(&coordinator, uri, volume));
            }
        }
        log::info!("[Snippet] Playing {} on {}", uri, coordinator);
        Ok(coordinator)
    }

    fn spawn(
        self: &Arc<Self>,
        coordinator: &str,
        uri: &str,
        volume: Option<u8>,
    ) -> JoinHandle<SnippetResult<SnippetOutcome>> {
        let this = Arc::clone(self);
        let coordinator = coordinator.to_string();
        let uri = uri.to_string();
        self.spawner.spawn_with_handle(async move {
            let result = this
                .run(&coordinator, &uri, volume)
                .await
                .map_err(SnippetError::from);
            match &result {
                Ok(outcome) => log::info!("[Snippet] {} finished: {:?}", coordinator, outcome),
                Err(e) => log::warn!("[Snippet] {} failed: {}", coordinator, e),
            }
            result
        })
    }

    /// True while a snippet is playing on `coordinator`.
    #[must_use]
    pub fn is_running(&self, coordinator: &str) -> bool {
        self.tasks
            .get(coordinator)
            .is_some_and(|handle| !handle.is_finished())
    }

    /// Waits for the snippet on `coordinator` and returns its outcome.
    ///
    /// Returns `None` when no snippet was started there.
    pub async fn wait(&self, coordinator: &str) -> Option<SnippetResult<SnippetOutcome>> {
        let (_, handle) = self.tasks.remove(coordinator)?;
        Some(match handle.await {
            Ok(result) => result,
            Err(e) => Err(SnippetError::Task(e.to_string())),
        })
    }

    async fn run(&self, coordinator: &str, uri: &str, volume: Option<u8>) -> ZoneResult<SnippetOutcome> {
        let captured = self.capture(coordinator).await?;
        log::debug!("[Snippet] Captured {:?}", captured);

        match self.play_and_wait(coordinator, uri, volume, &captured).await {
            Ok(()) => self.restore(coordinator, uri, &captured).await,
            Err(_) if !self.registry.contains(coordinator) => Ok(SnippetOutcome::ZoneRemoved),
            Err(e) => {
                self.recover(coordinator, &captured).await;
                Err(e)
            }
        }
    }

    /// Fades out, plays the snippet and waits for it to end.
    async fn play_and_wait(
        &self,
        coordinator: &str,
        uri: &str,
        volume: Option<u8>,
        captured: &Captured,
    ) -> ZoneResult<()> {
        self.controller.set_volume(coordinator, 0, false).await?;
        tokio::time::sleep(self.fade).await;
        self.controller.set_max_volume(coordinator, None).await?;

        self.controller
            .set_volume(coordinator, volume.unwrap_or(captured.volume), false)
            .await?;
        self.controller.play_uri(coordinator, uri, "").await?;
        let info = self.controller.refresh_track_info(coordinator).await?;

        let clip = parse_hms_secs(&info.duration).unwrap_or(0);
        tokio::time::sleep(Duration::from_secs(clip.saturating_add(SNIPPET_DURATION_MARGIN_SECS))).await;
        Ok(())
    }

    /// Puts the volume ceiling and volume back after a failed snippet.
    ///
    /// Failures here are logged only; the caller reports the original error.
    async fn recover(&self, coordinator: &str, captured: &Captured) {
        if let Err(e) = self
            .controller
            .set_max_volume(coordinator, captured.max_volume)
            .await
        {
            log::warn!("[Snippet] {} max volume not restored: {}", coordinator, e);
        }
        if let Err(e) = self
            .controller
            .set_volume(coordinator, captured.volume, false)
            .await
        {
            log::warn!("[Snippet] {} volume not restored: {}", coordinator, e);
        }
    }

    async fn capture(&self, coordinator: &str) -> ZoneResult<Captured> {
        self.controller.refresh_track_info(coordinator).await?;
        let playing = self.controller.refresh_transport_state(coordinator).await?;
        self.registry
            .view(coordinator, |v| Captured {
                streamtype: v.group().streamtype.clone(),
                track_uri: v.group().track_uri.clone(),
                playlist_position: v.group().playlist_position,
                track_position: v.group().track_position.clone(),
                metadata: v.group().metadata.clone(),
                playing,
                volume: v.zone().volume,
                max_volume: v.zone().max_volume,
            })
            .ok_or_else(|| ZoneError::UnknownZone(coordinator.to_string()))
    }

    async fn restore(
        &self,
        coordinator: &str,
        uri: &str,
        captured: &Captured,
    ) -> ZoneResult<SnippetOutcome> {
        let Some(current_uri) = self
            .registry
            .view(coordinator, |v| v.group().track_uri.clone())
        else {
            return Ok(SnippetOutcome::ZoneRemoved);
        };

        self.controller
            .set_max_volume(coordinator, captured.max_volume)
            .await?;

        if current_uri != uri {
            log::info!(
                "[Snippet] {} moved on to {}, not restoring",
                coordinator,
                current_uri
            );
            return Ok(SnippetOutcome::SourceChanged);
        }

        let c = coordinator;
        if captured.streamtype == "music" && captured.playlist_position > 0 {
            tolerate_unavailable(
                self.controller
                    .play_from_queue(c, captured.playlist_position - 1)
                    .await,
                "queue restore",
            )?;
            tolerate_unavailable(
                self.controller.seek(c, &captured.track_position).await,
                "seek",
            )?;
        } else if !captured.track_uri.is_empty() {
            tolerate_unavailable(
                self.controller
                    .play_uri(c, &captured.track_uri, &captured.metadata)
                    .await,
                "source restore",
            )?;
        }

        if !captured.playing {
            tolerate_unavailable(self.controller.pause(c).await, "pause")?;
        }

        self.controller.set_volume(c, captured.volume, false).await?;
        Ok(SnippetOutcome::Restored)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::publish::Publisher;
    use crate::sonos::device::{DeviceAction, TrackInfo};
    use crate::sonos::types::TransportState;
    use crate::test_support::{MockDevice, RecordingSink};
    use crate::zone::{ZoneEntity, ZoneField};

    const CHIME: &str = "http://10.0.0.50/chime.mp3";

    struct Harness {
        registry: Arc<ZoneRegistry>,
        device: Arc<MockDevice>,
        snippets: Arc<SnippetOrchestrator>,
    }

    /// rincon_a coordinates rincon_b and is playing track 3 of its queue.
    fn harness() -> Harness {
        let registry = Arc::new(ZoneRegistry::new());
        let mut a = ZoneEntity::new("rincon_a", "10.0.0.1", "S1");
        a.members = vec!["rincon_b".into()];
        a.volume = 20;
        let mut b = ZoneEntity::new("rincon_b", "10.0.0.2", "S1");
        b.coordinator = Some("rincon_a".into());
        registry.insert(a);
        registry.insert(b);

        let device = Arc::new(MockDevice::new());
        {
            let mut state = device.state.lock();
            state.transport = TransportState::Playing;
            state.track = TrackInfo {
                uri: "x-file-cifs://nas/song.mp3".into(),
                duration: "0:04:00".into(),
                position: "0:01:30".into(),
                metadata: String::new(),
                playlist_position: 3,
            };
        }

        let publisher = Arc::new(Publisher::new(
            Arc::clone(&registry),
            Arc::new(RecordingSink::new()),
        ));
        let controller = Arc::new(ZoneController::new(
            Arc::clone(&registry),
            device.clone(),
            publisher,
        ));
        let snippets = Arc::new(SnippetOrchestrator::new(
            Arc::clone(&registry),
            controller,
            TokioSpawner::current(),
            Duration::from_millis(1000),
        ));
        Harness {
            registry,
            device,
            snippets,
        }
    }

    fn actions(h: &Harness) -> Vec<DeviceAction> {
        h.device.actions_for("10.0.0.1")
    }

    #[tokio::test(start_paused = true)]
    async fn queue_playback_is_restored() {
        let h = harness();
        h.device.state.lock().track.duration = String::new();
        let coordinator = h.snippets.play("rincon_b", CHIME, Some(40)).unwrap();
        assert_eq!(coordinator, "rincon_a");

        let outcome = h.snippets.wait("rincon_a").await.unwrap().unwrap();
        assert_eq!(outcome, SnippetOutcome::Restored);

        assert_eq!(
            actions(&h),
            vec![
                DeviceAction::SetVolume(0),
                DeviceAction::SetVolume(40),
                DeviceAction::PlayUri {
                    uri: CHIME.into(),
                    metadata: String::new()
                },
                DeviceAction::PlayFromQueue {
                    uid: "rincon_a".into(),
                    index: 2
                },
                DeviceAction::Seek("0:01:30".into()),
                DeviceAction::SetVolume(20),
            ]
        );
        assert_eq!(h.registry.view("rincon_a", |v| v.zone().volume), Some(20));
    }

    #[tokio::test(start_paused = true)]
    async fn restore_is_skipped_when_source_changed() {
        let h = harness();
        h.snippets.play("rincon_a", CHIME, None).unwrap();

        tokio::time::sleep(Duration::from_secs(3)).await;
        h.registry
            .set_group("rincon_a", ZoneField::TrackUri, |g| &mut g.track_uri, "Y".to_string());

        let outcome = h.snippets.wait("rincon_a").await.unwrap().unwrap();
        assert_eq!(outcome, SnippetOutcome::SourceChanged);
        assert!(!actions(&h)
            .iter()
            .any(|a| matches!(a, DeviceAction::PlayFromQueue { .. })));
        assert_eq!(actions(&h).last(), Some(&DeviceAction::PlayUri {
            uri: CHIME.into(),
            metadata: String::new()
        }));
    }

    #[tokio::test(start_paused = true)]
    async fn second_snippet_is_rejected_while_one_plays() {
        let h = harness();
        h.snippets.play("rincon_a", CHIME, None).unwrap();
        assert!(h.snippets.is_running("rincon_a"));
        assert!(matches!(
            h.snippets.play("rincon_b", CHIME, None),
            Err(SnippetError::InFlight(c)) if c == "rincon_a"
        ));

        h.snippets.wait("rincon_a").await.unwrap().unwrap();
        assert!(h.snippets.play("rincon_a", CHIME, None).is_ok());
    }

    #[tokio::test(start_paused = true)]
    async fn stopped_radio_is_reissued_and_paused() {
        let h = harness();
        {
            let mut state = h.device.state.lock();
            state.transport = TransportState::Stopped;
            state.track = TrackInfo {
                uri: "x-rincon-mp3radio://radio.example/live".into(),
                duration: String::new(),
                position: String::new(),
                metadata: "<DIDL-Lite/>".into(),
                playlist_position: 1,
            };
        }

        h.snippets.play("rincon_a", CHIME, None).unwrap();
        let outcome = h.snippets.wait("rincon_a").await.unwrap().unwrap();
        assert_eq!(outcome, SnippetOutcome::Restored);

        let restore: Vec<DeviceAction> = actions(&h).into_iter().skip(3).collect();
        assert_eq!(
            restore,
            vec![
                DeviceAction::PlayUri {
                    uri: "x-rincon-mp3radio://radio.example/live".into(),
                    metadata: "<DIDL-Lite/>".into()
                },
                DeviceAction::Pause,
                DeviceAction::SetVolume(20),
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn transition_fault_during_restore_is_swallowed() {
        let h = harness();
        h.device.inject_fault("Seek", 701);

        h.snippets.play("rincon_a", CHIME, None).unwrap();
        let outcome = h.snippets.wait("rincon_a").await.unwrap().unwrap();
        assert_eq!(outcome, SnippetOutcome::Restored);
        assert_eq!(actions(&h).last(), Some(&DeviceAction::SetVolume(20)));
    }

    #[tokio::test(start_paused = true)]
    async fn other_faults_during_restore_propagate() {
        let h = harness();
        h.device.state.lock().transport = TransportState::PausedPlayback;
        h.device.inject_fault("Pause", 714);

        h.snippets.play("rincon_a", CHIME, None).unwrap();
        let err = h.snippets.wait("rincon_a").await.unwrap().unwrap_err();
        assert!(matches!(err, SnippetError::Zone(ref e) if e.fault_code() == Some(714)));
    }

    #[tokio::test(start_paused = true)]
    async fn removed_zone_is_left_alone() {
        let h = harness();
        h.snippets.play("rincon_a", CHIME, None).unwrap();

        tokio::time::sleep(Duration::from_secs(2)).await;
        h.registry.remove("rincon_a");

        let outcome = h.snippets.wait("rincon_a").await.unwrap().unwrap();
        assert_eq!(outcome, SnippetOutcome::ZoneRemoved);
    }

    #[tokio::test(start_paused = true)]
    async fn failed_playback_puts_volume_cap_back() {
        let h = harness();
        h.registry.with_zone("rincon_a", |z| z.max_volume = Some(30));
        h.device.state.lock().volume = 20;
        h.device.inject_fault("SetAVTransportURI", 714);

        h.snippets.play("rincon_a", CHIME, Some(60)).unwrap();
        let err = h.snippets.wait("rincon_a").await.unwrap().unwrap_err();
        assert!(matches!(err, SnippetError::Zone(ref e) if e.fault_code() == Some(714)));

        assert_eq!(h.registry.view("rincon_a", |v| v.zone().max_volume), Some(Some(30)));
        assert_eq!(h.registry.view("rincon_a", |v| v.zone().volume), Some(20));
        assert_eq!(h.device.state.lock().volume, 20);
        assert_eq!(actions(&h).last(), Some(&DeviceAction::SetVolume(20)));
    }

    #[tokio::test(start_paused = true)]
    async fn zone_removed_during_fade_ends_quietly() {
        let h = harness();
        h.snippets.play("rincon_a", CHIME, None).unwrap();

        tokio::time::sleep(Duration::from_millis(500)).await;
        h.registry.remove("rincon_a");

        let outcome = h.snippets.wait("rincon_a").await.unwrap().unwrap();
        assert_eq!(outcome, SnippetOutcome::ZoneRemoved);
        assert_eq!(actions(&h), vec![DeviceAction::SetVolume(0)]);
    }

    #[tokio::test]
    async fn unknown_zone_is_rejected() {
        let h = harness();
        assert!(matches!(
            h.snippets.play("rincon_x", CHIME, None),
            Err(SnippetError::Zone(ZoneError::UnknownZone(_)))
        ));
    }
}

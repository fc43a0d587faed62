//! Per-device zone state.

use crate::protocol_constants::ZERO_TIME;
use crate::sonos::alarms::AlarmMap;
use crate::sonos::metadata::ZoneMetadata;
use crate::zone::field::{ChangeTracker, ZoneField};

/// Fields owned by the group coordinator.
///
/// Every entity carries a copy, but only the coordinator's copy is ever read
/// or written; the registry redirects access for members.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupScoped {
    pub play: bool,
    pub pause: bool,
    pub stop: bool,
    pub track_title: String,
    pub track_artist: String,
    pub track_album_art: String,
    pub track_uri: String,
    pub track_duration: String,
    pub track_position: String,
    pub playlist_position: u32,
    pub streamtype: String,
    pub radio_station: String,
    pub radio_show: String,
    /// Lowercased play mode.
    pub playmode: String,
    pub zone_name: String,
    pub zone_icon: String,
    /// Raw DIDL-Lite of the current track, used to restore playback.
    pub metadata: String,
}

impl Default for GroupScoped {
    fn default() -> Self {
        Self {
            play: false,
            pause: false,
            stop: false,
            track_title: String::new(),
            track_artist: String::new(),
            track_album_art: String::new(),
            track_uri: String::new(),
            track_duration: ZERO_TIME.to_string(),
            track_position: ZERO_TIME.to_string(),
            playlist_position: 0,
            streamtype: String::new(),
            radio_station: String::new(),
            radio_show: String::new(),
            playmode: String::new(),
            zone_name: String::new(),
            zone_icon: String::new(),
            metadata: String::new(),
        }
    }
}

/// One physical zone player.
#[derive(Debug, Clone)]
pub struct ZoneEntity {
    uid: String,
    pub ip: String,
    pub model: String,
    pub serial_number: String,
    pub software_version: String,
    pub hardware_version: String,
    pub mac_address: String,

    pub volume: u8,
    pub mute: bool,
    pub bass: i8,
    pub treble: i8,
    pub loudness: bool,
    pub led: bool,
    /// Volume ceiling; `None` when disabled.
    pub max_volume: Option<u8>,
    pub alarms: AlarmMap,

    /// Local copy of the coordinator-owned fields.
    pub group: GroupScoped,
    /// Coordinator uid; `None` or our own uid means we coordinate.
    pub coordinator: Option<String>,
    /// Uids of the other group members. Only coordinators list members.
    pub members: Vec<String>,

    pub online: bool,
    /// Fingerprint of the last successfully sent full snapshot.
    pub properties_hash: Option<String>,
    pub dirty: ChangeTracker,
}

/// Replaces `slot` with `value`, returning true if it changed.
pub(crate) fn replace<T: PartialEq>(slot: &mut T, value: T) -> bool {
    if *slot == value {
        false
    } else {
        *slot = value;
        true
    }
}

impl ZoneEntity {
    /// Creates an online entity with default state.
    #[must_use]
    pub fn new(uid: impl Into<String>, ip: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            uid: uid.into().to_lowercase(),
            ip: ip.into(),
            model: model.into(),
            serial_number: String::new(),
            software_version: String::new(),
            hardware_version: String::new(),
            mac_address: String::new(),
            volume: 0,
            mute: false,
            bass: 0,
            treble: 0,
            loudness: false,
            led: true,
            max_volume: None,
            alarms: AlarmMap::new(),
            group: GroupScoped::default(),
            coordinator: None,
            members: Vec::new(),
            online: true,
            properties_hash: None,
            dirty: ChangeTracker::new(),
        }
    }

    #[must_use]
    pub fn uid(&self) -> &str {
        &self.uid
    }

    /// True when no coordinator is set or the coordinator is this entity.
    #[must_use]
    pub fn is_coordinator(&self) -> bool {
        self.coordinator.as_deref().map_or(true, |c| c == self.uid)
    }

    /// Copies identity and firmware details from a `/status/zp` fetch.
    pub fn apply_metadata(&mut self, meta: &ZoneMetadata) {
        self.serial_number = meta.serial_number.clone();
        self.software_version = meta.software_version.clone();
        self.hardware_version = meta.hardware_version.clone();
        self.mac_address = meta.mac_address.clone();
        self.group.zone_name = meta.zone_name.clone();
        self.group.zone_icon = meta.zone_icon.clone();
    }

    /// Marks the entity offline and resets every mutable field.
    ///
    /// Identity (uid, ip, model, serial and firmware) and the last publish
    /// fingerprint survive so a revival can be detected and published.
    pub fn mark_offline(&mut self) {
        self.online = false;
        self.volume = 0;
        self.mute = false;
        self.bass = 0;
        self.treble = 0;
        self.loudness = false;
        self.led = true;
        self.max_volume = None;
        self.alarms.clear();
        self.group = GroupScoped::default();
        self.coordinator = None;
        self.members.clear();
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Device-local setters
    // ─────────────────────────────────────────────────────────────────────────

    /// Sets the volume, clamped to 0-100 and to `max_volume`.
    pub fn set_volume(&mut self, volume: u8) -> bool {
        let ceiling = self.max_volume.unwrap_or(100).min(100);
        let changed = replace(&mut self.volume, volume.min(ceiling));
        if changed {
            self.dirty.mark(ZoneField::Volume);
        }
        changed
    }

    /// Sets or clears the volume ceiling.
    ///
    /// A ceiling below the current volume lowers the volume to it.
    pub fn set_max_volume(&mut self, max: Option<u8>) -> bool {
        let max = max.map(|m| m.min(100));
        let changed = replace(&mut self.max_volume, max);
        if changed {
            self.dirty.mark(ZoneField::MaxVolume);
        }
        if let Some(m) = max {
            if self.volume > m {
                self.set_volume(m);
            }
        }
        changed
    }

    pub fn set_mute(&mut self, mute: bool) -> bool {
        self.set_flag(ZoneField::Mute, mute)
    }

    pub fn set_loudness(&mut self, loudness: bool) -> bool {
        self.set_flag(ZoneField::Loudness, loudness)
    }

    pub fn set_led(&mut self, led: bool) -> bool {
        self.set_flag(ZoneField::Led, led)
    }

    pub fn set_bass(&mut self, bass: i8) -> bool {
        let changed = replace(&mut self.bass, bass.clamp(-10, 10));
        if changed {
            self.dirty.mark(ZoneField::Bass);
        }
        changed
    }

    pub fn set_treble(&mut self, treble: i8) -> bool {
        let changed = replace(&mut self.treble, treble.clamp(-10, 10));
        if changed {
            self.dirty.mark(ZoneField::Treble);
        }
        changed
    }

    pub fn set_alarms(&mut self, alarms: AlarmMap) -> bool {
        let changed = replace(&mut self.alarms, alarms);
        if changed {
            self.dirty.mark(ZoneField::Alarms);
        }
        changed
    }

    fn set_flag(&mut self, field: ZoneField, value: bool) -> bool {
        let slot = match field {
            ZoneField::Mute => &mut self.mute,
            ZoneField::Loudness => &mut self.loudness,
            ZoneField::Led => &mut self.led,
            _ => return false,
        };
        let changed = replace(slot, value);
        if changed {
            self.dirty.mark(field);
        }
        changed
    }
}

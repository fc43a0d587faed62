//! Published zone fields and per-zone change tracking.

use std::fmt;

/// A field of the published zone snapshot.
///
/// The string form is the JSON key used in outbound datagrams.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ZoneField {
    Uid,
    Ip,
    Model,
    MacAddress,
    SoftwareVersion,
    HardwareVersion,
    SerialNumber,
    Status,
    Led,
    Volume,
    MaxVolume,
    Mute,
    Bass,
    Treble,
    Loudness,
    Play,
    Pause,
    Stop,
    TrackTitle,
    TrackArtist,
    TrackAlbumArt,
    TrackUri,
    TrackDuration,
    TrackPosition,
    PlaylistPosition,
    Streamtype,
    RadioStation,
    RadioShow,
    Playmode,
    ZoneName,
    ZoneIcon,
    AdditionalZoneMembers,
    Alarms,
}

impl ZoneField {
    /// Every field included in a full snapshot.
    pub const ALL: [ZoneField; 33] = [
        Self::Uid,
        Self::Ip,
        Self::Model,
        Self::MacAddress,
        Self::SoftwareVersion,
        Self::HardwareVersion,
        Self::SerialNumber,
        Self::Status,
        Self::Led,
        Self::Volume,
        Self::MaxVolume,
        Self::Mute,
        Self::Bass,
        Self::Treble,
        Self::Loudness,
        Self::Play,
        Self::Pause,
        Self::Stop,
        Self::TrackTitle,
        Self::TrackArtist,
        Self::TrackAlbumArt,
        Self::TrackUri,
        Self::TrackDuration,
        Self::TrackPosition,
        Self::PlaylistPosition,
        Self::Streamtype,
        Self::RadioStation,
        Self::RadioShow,
        Self::Playmode,
        Self::ZoneName,
        Self::ZoneIcon,
        Self::AdditionalZoneMembers,
        Self::Alarms,
    ];

    /// Returns the JSON key for this field.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Uid => "uid",
            Self::Ip => "ip",
            Self::Model => "model",
            Self::MacAddress => "mac_address",
            Self::SoftwareVersion => "software_version",
            Self::HardwareVersion => "hardware_version",
            Self::SerialNumber => "serial_number",
            Self::Status => "status",
            Self::Led => "led",
            Self::Volume => "volume",
            Self::MaxVolume => "max_volume",
            Self::Mute => "mute",
            Self::Bass => "bass",
            Self::Treble => "treble",
            Self::Loudness => "loudness",
            Self::Play => "play",
            Self::Pause => "pause",
            Self::Stop => "stop",
            Self::TrackTitle => "track_title",
            Self::TrackArtist => "track_artist",
            Self::TrackAlbumArt => "track_album_art",
            Self::TrackUri => "track_uri",
            Self::TrackDuration => "track_duration",
            Self::TrackPosition => "track_position",
            Self::PlaylistPosition => "playlist_position",
            Self::Streamtype => "streamtype",
            Self::RadioStation => "radio_station",
            Self::RadioShow => "radio_show",
            Self::Playmode => "playmode",
            Self::ZoneName => "zone_name",
            Self::ZoneIcon => "zone_icon",
            Self::AdditionalZoneMembers => "additional_zone_members",
            Self::Alarms => "alarms",
        }
    }

    /// Returns true if reads and writes of this field go to the group coordinator.
    #[must_use]
    pub fn is_coordinator_scoped(&self) -> bool {
        matches!(
            self,
            Self::Play
                | Self::Pause
                | Self::Stop
                | Self::TrackTitle
                | Self::TrackArtist
                | Self::TrackAlbumArt
                | Self::TrackUri
                | Self::TrackDuration
                | Self::TrackPosition
                | Self::PlaylistPosition
                | Self::Streamtype
                | Self::RadioStation
                | Self::RadioShow
                | Self::Playmode
                | Self::ZoneName
                | Self::ZoneIcon
        )
    }
}

impl fmt::Display for ZoneField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Ordered set of fields changed since the last publish.
///
/// Marking is idempotent and preserves first-seen order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChangeTracker {
    fields: Vec<ZoneField>,
}

impl ChangeTracker {
    /// Creates an empty tracker.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Marks a field dirty. No-op if it is already marked.
    pub fn mark(&mut self, field: ZoneField) {
        if !self.fields.contains(&field) {
            self.fields.push(field);
        }
    }

    /// Returns the dirty fields in first-seen order.
    #[must_use]
    pub fn fields(&self) -> &[ZoneField] {
        &self.fields
    }

    /// Returns true if the field is marked.
    #[must_use]
    pub fn contains(&self, field: ZoneField) -> bool {
        self.fields.contains(&field)
    }

    /// Returns true if nothing is marked.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Takes all marked fields, leaving the tracker empty.
    pub fn drain(&mut self) -> Vec<ZoneField> {
        std::mem::take(&mut self.fields)
    }

    /// Re-marks previously drained fields (after a failed send).
    pub fn merge(&mut self, fields: impl IntoIterator<Item = ZoneField>) {
        for field in fields {
            self.mark(field);
        }
    }
}

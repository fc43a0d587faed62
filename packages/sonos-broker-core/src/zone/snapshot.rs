//! JSON snapshots of zone state.
//!
//! Snapshots are flat objects keyed by [`ZoneField::as_str`]. A `BTreeMap`
//! keeps the keys sorted so the serialized form, and therefore the
//! fingerprint, is stable.

use std::collections::BTreeMap;

use bytes::Bytes;
use serde_json::Value;
use sha1::{Digest, Sha1};

use crate::sonos::alarms::alarms_value;
use crate::zone::field::ZoneField;
use crate::zone::registry::ZoneView;

/// Field key to JSON value, sorted by key.
pub type Snapshot = BTreeMap<&'static str, Value>;

/// Current value of one field, with coordinator-scoped fields resolved.
#[must_use]
pub fn field_value(view: &ZoneView<'_>, field: ZoneField) -> Value {
    let zone = view.zone();
    let group = view.group();

    match field {
        ZoneField::Uid => Value::from(zone.uid()),
        ZoneField::Ip => Value::from(zone.ip.as_str()),
        ZoneField::Model => Value::from(zone.model.as_str()),
        ZoneField::MacAddress => Value::from(zone.mac_address.as_str()),
        ZoneField::SoftwareVersion => Value::from(zone.software_version.as_str()),
        ZoneField::HardwareVersion => Value::from(zone.hardware_version.as_str()),
        ZoneField::SerialNumber => Value::from(zone.serial_number.as_str()),
        ZoneField::Status => Value::from(u8::from(zone.online)),
        ZoneField::Led => Value::from(zone.led),
        ZoneField::Volume => Value::from(zone.volume),
        ZoneField::MaxVolume => Value::from(zone.max_volume.map_or(-1, i16::from)),
        ZoneField::Mute => Value::from(zone.mute),
        ZoneField::Bass => Value::from(zone.bass),
        ZoneField::Treble => Value::from(zone.treble),
        ZoneField::Loudness => Value::from(zone.loudness),
        ZoneField::Play => Value::from(group.play),
        ZoneField::Pause => Value::from(group.pause),
        ZoneField::Stop => Value::from(group.stop),
        ZoneField::TrackTitle => Value::from(group.track_title.as_str()),
        ZoneField::TrackArtist => Value::from(group.track_artist.as_str()),
        ZoneField::TrackAlbumArt => Value::from(group.track_album_art.as_str()),
        ZoneField::TrackUri => Value::from(group.track_uri.as_str()),
        ZoneField::TrackDuration => Value::from(group.track_duration.as_str()),
        ZoneField::TrackPosition => Value::from(group.track_position.as_str()),
        ZoneField::PlaylistPosition => Value::from(group.playlist_position),
        ZoneField::Streamtype => Value::from(group.streamtype.as_str()),
        ZoneField::RadioStation => Value::from(group.radio_station.as_str()),
        ZoneField::RadioShow => Value::from(group.radio_show.as_str()),
        ZoneField::Playmode => Value::from(group.playmode.as_str()),
        ZoneField::ZoneName => Value::from(group.zone_name.as_str()),
        ZoneField::ZoneIcon => Value::from(group.zone_icon.as_str()),
        ZoneField::AdditionalZoneMembers => Value::from(zone.members.join(",")),
        ZoneField::Alarms => alarms_value(&zone.alarms),
    }
}

/// Every field of the zone.
#[must_use]
pub fn full_snapshot(view: &ZoneView<'_>) -> Snapshot {
    ZoneField::ALL
        .iter()
        .map(|&f| (f.as_str(), field_value(view, f)))
        .collect()
}

/// The given fields plus `uid`.
#[must_use]
pub fn partial_snapshot(view: &ZoneView<'_>, fields: &[ZoneField]) -> Snapshot {
    std::iter::once(ZoneField::Uid)
        .chain(fields.iter().copied())
        .map(|f| (f.as_str(), field_value(view, f)))
        .collect()
}

/// Serializes a snapshot to its datagram payload.
pub fn encode(snapshot: &Snapshot) -> serde_json::Result<Bytes> {
    serde_json::to_vec(snapshot).map(Bytes::from)
}

/// SHA-1 hex digest of the serialized snapshot.
#[must_use]
pub fn fingerprint(payload: &[u8]) -> String {
    let mut hasher = Sha1::new();
    hasher.update(payload);
    format!("{:x}", hasher.finalize())
}

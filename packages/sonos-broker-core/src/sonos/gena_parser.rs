//! GENA event XML parsing.
//!
//! This module contains pure parsing functions for GENA NOTIFY payloads.
//! It separates XML parsing concerns from subscription lifecycle management
//! and from applying the parsed deltas to zone state.

use thiserror::Error;

use crate::sonos::didl::{parse_didl, DidlItem};
use crate::sonos::types::{TransportState, ZoneGroup};
use crate::sonos::utils::{extract_val_attrs, extract_xml_text};
use crate::sonos::zone_groups::parse_zone_group_xml;

/// Errors produced while parsing a NOTIFY payload.
#[derive(Debug, Error)]
pub enum ParseError {
    /// The property set lacks the element carrying the event data.
    #[error("missing <{0}> element")]
    MissingElement(&'static str),

    /// The embedded document is not well-formed.
    #[error("malformed XML: {0}")]
    Xml(#[from] quick_xml::Error),
}

/// Convenient Result alias for NOTIFY parsing.
pub type ParseResult<T> = Result<T, ParseError>;

/// Parsed data from a RenderingControl NOTIFY event.
///
/// Per-speaker values; only the master channel is considered.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct RenderingControlData {
    /// Speaker volume level (0-100).
    pub volume: Option<u8>,
    /// Speaker mute state.
    pub mute: Option<bool>,
    /// Bass EQ (-10..=10).
    pub bass: Option<i8>,
    /// Treble EQ (-10..=10).
    pub treble: Option<i8>,
    /// Loudness compensation.
    pub loudness: Option<bool>,
}

/// Parsed data from an AVTransport NOTIFY event.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct AvTransportData {
    /// Current transport state (playing, paused, stopped, etc.).
    pub transport_state: Option<TransportState>,
    /// Current play mode (`NORMAL`, `SHUFFLE`, ...).
    pub play_mode: Option<String>,
    /// Current track URI being played.
    pub track_uri: Option<String>,
    /// Current track duration (`H:MM:SS`).
    pub track_duration: Option<String>,
    /// 1-based position of the current track in the queue.
    pub playlist_position: Option<u32>,
    /// Raw DIDL of the current track (empty when cleared).
    pub track_metadata: Option<String>,
    /// Parsed fields of `track_metadata`.
    pub track: Option<DidlItem>,
    /// Station title from the enqueued transport metadata.
    pub radio_station: Option<String>,
}

/// Parsed data from an AlarmClock NOTIFY event.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct AlarmClockData {
    /// New `AlarmListVersion`, signalling the alarm list changed.
    pub alarm_list_version: Option<String>,
}

/// Extracts and decodes the `LastChange` document of a property set.
fn last_change(body: &str) -> ParseResult<String> {
    extract_xml_text(body, "LastChange").ok_or(ParseError::MissingElement("LastChange"))
}

/// Decodes one level of entity escaping from a raw `val` attribute.
fn decode(val: &str) -> String {
    html_escape::decode_html_entities(val).to_string()
}

/// Parses a RenderingControl NOTIFY event body.
///
/// RenderingControl uses the LastChange XML format. Volume, Mute and
/// Loudness are read from the `Master` channel only, ignoring the LF/RF
/// channels stereo pairs also report. Bass and Treble carry no channel.
pub fn parse_rendering_control(body: &str) -> ParseResult<RenderingControlData> {
    let doc = last_change(body)?;
    let attrs = extract_val_attrs(&doc, &["Volume", "Mute", "Bass", "Treble", "Loudness"])?;

    Ok(RenderingControlData {
        volume: attrs
            .get("Volume")
            .and_then(|v| v.parse::<u8>().ok())
            .map(|v| v.min(100)),
        mute: attrs.get("Mute").map(|v| v == "1"),
        bass: attrs
            .get("Bass")
            .and_then(|v| v.parse::<i8>().ok())
            .map(|v| v.clamp(-10, 10)),
        treble: attrs
            .get("Treble")
            .and_then(|v| v.parse::<i8>().ok())
            .map(|v| v.clamp(-10, 10)),
        loudness: attrs.get("Loudness").map(|v| v == "1"),
    })
}

/// Parses an AVTransport NOTIFY event body.
///
/// Metadata values are DIDL-Lite documents escaped inside the `val`
/// attribute; they are decoded once before parsing.
pub fn parse_av_transport(body: &str) -> ParseResult<AvTransportData> {
    let doc = last_change(body)?;
    let attrs = extract_val_attrs(
        &doc,
        &[
            "TransportState",
            "CurrentPlayMode",
            "CurrentTrackURI",
            "CurrentTrackDuration",
            "CurrentTrack",
            "CurrentTrackMetaData",
            "EnqueuedTransportURIMetaData",
        ],
    )?;

    let track_metadata = attrs.get("CurrentTrackMetaData").map(|v| decode(v));
    let track = track_metadata
        .as_deref()
        .map(|m| parse_didl(m).unwrap_or_default());

    let radio_station = attrs
        .get("EnqueuedTransportURIMetaData")
        .map(|v| parse_didl(&decode(v)).map(|d| d.title).unwrap_or_default());

    Ok(AvTransportData {
        transport_state: attrs.get("TransportState").and_then(|v| v.parse().ok()),
        play_mode: attrs.get("CurrentPlayMode").map(|v| v.to_lowercase()),
        track_uri: attrs.get("CurrentTrackURI").map(|v| decode(v)),
        track_duration: attrs.get("CurrentTrackDuration").map(|v| decode(v)),
        playlist_position: attrs.get("CurrentTrack").and_then(|v| v.parse().ok()),
        track_metadata,
        track,
        radio_station,
    })
}

/// Parses a ZoneGroupTopology NOTIFY event body.
pub fn parse_zone_group_topology(body: &str) -> ParseResult<Vec<ZoneGroup>> {
    let state = extract_xml_text(body, "ZoneGroupState")
        .ok_or(ParseError::MissingElement("ZoneGroupState"))?;
    Ok(parse_zone_group_xml(&state)?)
}

/// Parses an AlarmClock NOTIFY event body.
///
/// AlarmClock events are plain property sets (no LastChange). Bodies
/// without `AlarmListVersion` (e.g. time zone changes) yield empty data.
pub fn parse_alarm_clock(body: &str) -> ParseResult<AlarmClockData> {
    if !body.contains("propertyset") {
        return Err(ParseError::MissingElement("propertyset"));
    }
    Ok(AlarmClockData {
        alarm_list_version: extract_xml_text(body, "AlarmListVersion"),
    })
}

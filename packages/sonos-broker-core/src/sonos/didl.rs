//! DIDL-Lite metadata parsing and stream classification.
//!
//! Sonos reports the current track as a DIDL-Lite document inside
//! `CurrentTrackMetaData` and the enqueued source inside
//! `EnqueuedTransportURIMetaData`.

use crate::sonos::utils::{build_sonos_url, extract_xml_text};

/// Track metadata extracted from a DIDL-Lite document.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DidlItem {
    /// `dc:title`
    pub title: String,
    /// `dc:creator`
    pub creator: String,
    /// `upnp:album`
    pub album: String,
    /// `upnp:albumArtURI`, possibly relative to the device.
    pub album_art_uri: String,
    /// `r:streamContent` (now-playing text for radio streams).
    pub stream_content: String,
    /// `r:radioShowMd` with the trailing show id removed.
    pub radio_show: String,
}

/// Parses a DIDL-Lite document.
///
/// Returns `None` for empty metadata and for the `NOT_IMPLEMENTED` marker
/// Sonos uses when no metadata is available.
#[must_use]
pub fn parse_didl(xml: &str) -> Option<DidlItem> {
    let xml = xml.trim();
    if xml.is_empty() || !xml.contains("DIDL-Lite") {
        return None;
    }

    let text = |name: &str| extract_xml_text(xml, name).unwrap_or_default();

    Some(DidlItem {
        title: text("title"),
        creator: text("creator"),
        album: text("album"),
        album_art_uri: text("albumArtURI"),
        stream_content: text("streamContent"),
        radio_show: strip_show_id(&text("radioShowMd")),
    })
}

/// `radioShowMd` looks like `Morning Show,p123456`; the suffix is an id.
fn strip_show_id(raw: &str) -> String {
    match raw.rfind(",p") {
        Some(idx) => raw[..idx].to_string(),
        None => raw.to_string(),
    }
}

/// Resolves a relative album art path (`/getaa?...`) against the device.
#[must_use]
pub fn absolute_album_art(ip: &str, art: &str) -> String {
    if art.is_empty() || art.starts_with("http://") || art.starts_with("https://") {
        art.to_string()
    } else {
        build_sonos_url(ip, art)
    }
}

/// URI scheme prefixes of internet radio sources.
const RADIO_SCHEMES: &[&str] = &[
    "x-rincon-mp3radio:",
    "x-sonosapi-stream:",
    "x-sonosapi-radio:",
    "x-sonosapi-hls:",
    "x-rincon-stream-radio:",
    "aac:",
    "hls-radio:",
];

/// Derives the stream type reported as `streamtype` from a track URI.
///
/// - empty → `""`
/// - internet radio schemes → `"radio"`
/// - home theater input (`x-sonos-htastream:`) → `"tv"`
/// - line-in (`x-rincon-stream:`) → `"line_in"`
/// - everything else (queue, files, services) → `"music"`
#[must_use]
pub fn stream_type(uri: &str) -> &'static str {
    let lower = uri.trim().to_ascii_lowercase();
    if lower.is_empty() {
        ""
    } else if RADIO_SCHEMES.iter().any(|s| lower.starts_with(s)) {
        "radio"
    } else if lower.starts_with("x-sonos-htastream:") {
        "tv"
    } else if lower.starts_with("x-rincon-stream:") {
        "line_in"
    } else {
        "music"
    }
}

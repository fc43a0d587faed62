//! Shared XML and URL helpers for UPnP communication.

use std::collections::HashMap;

use quick_xml::events::{BytesStart, Event};
use quick_xml::reader::Reader;

/// Default Sonos speaker control port.
pub const SONOS_PORT: u16 = 1400;

// ─────────────────────────────────────────────────────────────────────────────
// XML Parsing Utilities
// ─────────────────────────────────────────────────────────────────────────────

/// Extracts text content from the first occurrence of an XML element.
///
/// Searches for an element by its local name (ignoring namespace prefixes)
/// and returns its text content with HTML entities decoded once. For
/// `LastChange` and `ZoneGroupState` this yields the embedded document.
///
/// # Example
/// ```ignore
/// let xml = r#"<u:CurrentVolume>42</u:CurrentVolume>"#;
/// assert_eq!(extract_xml_text(xml, "CurrentVolume"), Some("42".to_string()));
/// ```
pub fn extract_xml_text(xml: &str, element_name: &str) -> Option<String> {
    let mut reader = Reader::from_str(xml);
    let mut buf = Vec::new();
    let target_bytes = element_name.as_bytes();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(ref e)) if e.local_name().as_ref() == target_bytes => {
                if let Ok(text) = reader.read_text(e.name()) {
                    let decoded = html_escape::decode_html_entities(&text);
                    return Some(decoded.to_string());
                }
            }
            Ok(Event::Empty(ref e)) if e.local_name().as_ref() == target_bytes => {
                return Some(String::new());
            }
            Ok(Event::Eof) => break,
            Err(_) => break,
            _ => {}
        }
        buf.clear();
    }
    None
}

/// Extracts `val` attributes from empty elements of a LastChange document.
///
/// UPnP LastChange events convey state as empty elements:
/// ```xml
/// <TransportState val="PLAYING"/>
/// <Volume channel="Master" val="42"/>
/// ```
///
/// Elements carrying a `channel` attribute only count when the channel is
/// `Master` (case-insensitive); stereo pairs also report `LF`/`RF` which are
/// ignored. Values are returned raw (entity references are not decoded).
///
/// # Errors
/// Returns the reader error when the document is not well-formed, so callers
/// can drop malformed notifications instead of applying partial state.
pub fn extract_val_attrs(
    xml: &str,
    element_names: &[&str],
) -> Result<HashMap<String, String>, quick_xml::Error> {
    let mut result = HashMap::new();
    let mut reader = Reader::from_str(xml);
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Empty(ref e) | Event::Start(ref e) => {
                let local = e.local_name();
                let matched = element_names
                    .iter()
                    .find(|&&n| n.as_bytes() == local.as_ref());
                if let Some(&name) = matched {
                    let is_master = get_xml_attr(e, b"channel")
                        .map(|c| c.eq_ignore_ascii_case("master"))
                        .unwrap_or(true);
                    if is_master {
                        if let Some(val) = get_xml_attr(e, b"val") {
                            result.insert(name.to_string(), val);
                        }
                    }
                }
            }
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    Ok(result)
}

/// Gets an attribute value from an XML element.
///
/// # Arguments
/// * `elem` - The XML element to search
/// * `attr_name` - The attribute name as bytes (e.g., `b"ZoneName"`)
pub fn get_xml_attr(elem: &BytesStart, attr_name: &[u8]) -> Option<String> {
    elem.attributes()
        .flatten()
        .find(|a| a.key.as_ref() == attr_name)
        .map(|a| String::from_utf8_lossy(&a.value).to_string())
}

/// Extracts IP address from a UPnP Location URL.
///
/// # Example
/// ```ignore
/// let ip = extract_ip_from_location("http://192.168.1.100:1400/xml/device_desc.xml");
/// assert_eq!(ip, Some("192.168.1.100".to_string()));
/// ```
pub fn extract_ip_from_location(location: &str) -> Option<String> {
    let stripped = location.strip_prefix("http://")?;
    let host_end = stripped.find(':')?;
    Some(stripped[..host_end].to_string())
}

// ─────────────────────────────────────────────────────────────────────────────
// Time Helpers
// ─────────────────────────────────────────────────────────────────────────────

/// Parses an `H:MM:SS` / `HH:MM:SS` duration into whole seconds.
///
/// Returns `None` for anything that is not three colon-separated integers
/// (Sonos reports `NOT_IMPLEMENTED` for live streams) or a value that does
/// not fit in a `u64`.
#[must_use]
pub fn parse_hms_secs(value: &str) -> Option<u64> {
    let mut parts = value.trim().split(':');
    let h: u64 = parts.next()?.parse().ok()?;
    let m: u64 = parts.next()?.parse().ok()?;
    let s: u64 = parts.next()?.parse().ok()?;
    if parts.next().is_some() {
        return None;
    }
    h.checked_mul(3600)?
        .checked_add(m.checked_mul(60)?)?
        .checked_add(s)
}

// ─────────────────────────────────────────────────────────────────────────────
// URL Building
// ─────────────────────────────────────────────────────────────────────────────

/// Builds a Sonos speaker URL for the given IP and endpoint.
///
/// # Example
/// ```ignore
/// assert_eq!(
///     build_sonos_url("192.168.1.10", "/status/zp"),
///     "http://192.168.1.10:1400/status/zp"
/// );
/// ```
pub fn build_sonos_url(ip: &str, endpoint: &str) -> String {
    format!("http://{}:{}{}", ip, SONOS_PORT, endpoint)
}

// ─────────────────────────────────────────────────────────────────────────────
// XML Encoding
// ─────────────────────────────────────────────────────────────────────────────

/// Escapes XML special characters for embedding in XML content.
///
/// Used for SOAP arguments, including DIDL-Lite metadata passed back to
/// `SetAVTransportURI`.
pub fn escape_xml(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extract_xml_text_ignores_namespace_prefix() {
        let xml = r#"<s:Body><u:GetVolumeResponse><CurrentVolume>42</CurrentVolume></u:GetVolumeResponse></s:Body>"#;
        assert_eq!(extract_xml_text(xml, "CurrentVolume"), Some("42".to_string()));
        assert_eq!(extract_xml_text(xml, "Missing"), None);
    }

    #[test]
    fn extract_xml_text_decodes_embedded_document() {
        let xml = "<e:property><LastChange>&lt;Event&gt;&lt;/Event&gt;</LastChange></e:property>";
        assert_eq!(
            extract_xml_text(xml, "LastChange"),
            Some("<Event></Event>".to_string())
        );
    }

    #[test]
    fn extract_val_attrs_prefers_master_channel() {
        let xml = r#"<Event><InstanceID val="0">
            <Volume channel="LF" val="50"/>
            <Volume channel="Master" val="37"/>
            <Volume channel="RF" val="50"/>
            <Bass val="-3"/>
        </InstanceID></Event>"#;
        let attrs = extract_val_attrs(xml, &["Volume", "Bass"]).unwrap();
        assert_eq!(attrs.get("Volume").map(String::as_str), Some("37"));
        assert_eq!(attrs.get("Bass").map(String::as_str), Some("-3"));
    }

    #[test]
    fn extract_val_attrs_rejects_mismatched_tags() {
        let xml = r#"<Event><InstanceID val="0"><Volume channel="Master" val="1"/></Event>"#;
        assert!(extract_val_attrs(xml, &["Volume"]).is_err());
    }

    #[test]
    fn parse_hms_secs_handles_common_forms() {
        assert_eq!(parse_hms_secs("00:00:05"), Some(5));
        assert_eq!(parse_hms_secs("0:01:10"), Some(70));
        assert_eq!(parse_hms_secs("01:00:00"), Some(3600));
        assert_eq!(parse_hms_secs("NOT_IMPLEMENTED"), None);
        assert_eq!(parse_hms_secs("1:2"), None);
    }

    #[test]
    fn parse_hms_secs_rejects_overflowing_hours() {
        let huge = format!("{}:00:00", u64::MAX / 1000);
        assert_eq!(parse_hms_secs(&huge), None);
        assert_eq!(parse_hms_secs(&format!("0:00:{}", u64::MAX)), Some(u64::MAX));
        assert_eq!(parse_hms_secs(&format!("0:01:{}", u64::MAX)), None);
    }

    #[test]
    fn extract_ip_from_location_parses_host() {
        assert_eq!(
            extract_ip_from_location("http://192.168.1.100:1400/xml/device_description.xml"),
            Some("192.168.1.100".to_string())
        );
        assert_eq!(extract_ip_from_location("https://example.com"), None);
    }

    #[test]
    fn escape_xml_escapes_all_specials() {
        assert_eq!(
            escape_xml(r#"<a href="x">Tom & 'Jerry'</a>"#),
            "&lt;a href=&quot;x&quot;&gt;Tom &amp; &apos;Jerry&apos;&lt;/a&gt;"
        );
    }
}

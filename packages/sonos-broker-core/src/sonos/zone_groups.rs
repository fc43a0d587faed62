//! Zone group topology parsing.
//!
//! Handles parsing ZoneGroupState XML into structured `ZoneGroup` data. The
//! same document arrives in ZoneGroupTopology NOTIFY events and in the
//! `GetZoneGroupState` SOAP response.

use quick_xml::events::Event;
use quick_xml::reader::Reader;

use crate::sonos::types::{ZoneGroup, ZoneGroupMember};
use crate::sonos::utils::{extract_ip_from_location, get_xml_attr};

/// Parses ZoneGroupState XML into a vector of ZoneGroup structures.
///
/// Expects the decoded ZoneGroupState document. Accepts both the
/// `<ZoneGroupState><ZoneGroups>` wrapper of current firmware and the bare
/// `<ZoneGroups>` root of older firmware.
///
/// # Filtering
/// - Zone Bridges (`IsZoneBridge="1"`) are skipped, they cannot play audio.
/// - Groups left without members are excluded entirely.
/// - Satellites of home theater setups are not zones of their own and are
///   ignored.
///
/// # Errors
/// Returns the reader error when the document is not well-formed.
pub fn parse_zone_group_xml(xml: &str) -> Result<Vec<ZoneGroup>, quick_xml::Error> {
    let mut groups = Vec::new();
    let mut reader = Reader::from_str(xml);
    let mut buf = Vec::new();

    // State for current group being parsed
    let mut current: Option<ZoneGroup> = None;
    // Satellites nest inside their ZoneGroupMember
    let mut satellite_depth = 0usize;

    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(ref e) if e.local_name().as_ref() == b"Satellite" => {
                satellite_depth += 1;
            }
            Event::End(ref e) if e.local_name().as_ref() == b"Satellite" => {
                satellite_depth = satellite_depth.saturating_sub(1);
            }
            Event::Start(ref e) | Event::Empty(ref e) => match e.local_name().as_ref() {
                b"ZoneGroup" => {
                    current = Some(ZoneGroup {
                        id: get_xml_attr(e, b"ID").unwrap_or_default(),
                        coordinator_uid: get_xml_attr(e, b"Coordinator")
                            .unwrap_or_default()
                            .to_lowercase(),
                        members: Vec::new(),
                    });
                }
                b"ZoneGroupMember" if satellite_depth == 0 => {
                    if let Some(member) = member_from_element(e) {
                        if let Some(group) = current.as_mut() {
                            group.members.push(member);
                        }
                    }
                }
                _ => {}
            },
            Event::End(ref e) if e.local_name().as_ref() == b"ZoneGroup" => {
                if let Some(group) = current.take() {
                    if !group.members.is_empty() && !group.coordinator_uid.is_empty() {
                        groups.push(group);
                    }
                }
            }
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    Ok(groups)
}

fn member_from_element(e: &quick_xml::events::BytesStart) -> Option<ZoneGroupMember> {
    // Skip Zone Bridges - they can't play audio
    if get_xml_attr(e, b"IsZoneBridge").as_deref() == Some("1") {
        return None;
    }

    let uid = get_xml_attr(e, b"UUID")?.to_lowercase();
    let ip = get_xml_attr(e, b"Location")
        .and_then(|l| extract_ip_from_location(&l))
        .unwrap_or_default();
    let zone_name = get_xml_attr(e, b"ZoneName").unwrap_or_default();

    Some(ZoneGroupMember { uid, ip, zone_name })
}

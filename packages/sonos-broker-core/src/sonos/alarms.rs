//! AlarmClock `ListAlarms` parsing.

use std::collections::BTreeMap;

use quick_xml::events::{BytesStart, Event};
use quick_xml::reader::Reader;
use serde_json::{Map, Value};

use super::utils::get_xml_attr;

/// A single alarm as published in the `alarms` field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Alarm {
    pub enabled: bool,
    pub duration: String,
    pub play_mode: String,
    pub volume: u8,
    pub recurrence: String,
    pub start_time: String,
    pub included_link_zones: bool,
}

impl Alarm {
    /// Published form of the alarm.
    #[must_use]
    pub fn to_value(&self) -> Value {
        let mut fields = Map::new();
        fields.insert("Enabled".into(), Value::from(self.enabled));
        fields.insert("Duration".into(), Value::from(self.duration.as_str()));
        fields.insert("PlayMode".into(), Value::from(self.play_mode.as_str()));
        fields.insert("Volume".into(), Value::from(self.volume));
        fields.insert("Recurrence".into(), Value::from(self.recurrence.as_str()));
        fields.insert("StartTime".into(), Value::from(self.start_time.as_str()));
        fields.insert("IncludedLinkZones".into(), Value::from(self.included_link_zones));
        Value::Object(fields)
    }
}

/// Alarms of one zone keyed by alarm id.
pub type AlarmMap = BTreeMap<String, Alarm>;

/// Published form of a zone's alarms: an object keyed by alarm id.
#[must_use]
pub fn alarms_value(alarms: &AlarmMap) -> Value {
    Value::Object(
        alarms
            .iter()
            .map(|(id, alarm)| (id.clone(), alarm.to_value()))
            .collect(),
    )
}

/// Parses the decoded `CurrentAlarmList` document, keeping alarms of `uid`.
///
/// Room UUIDs are compared case-insensitively.
///
/// # Errors
/// Returns the reader error when the document is not well-formed.
pub fn parse_alarm_list(xml: &str, uid: &str) -> Result<AlarmMap, quick_xml::Error> {
    let mut alarms = AlarmMap::new();
    let mut reader = Reader::from_str(xml);
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Empty(ref e) | Event::Start(ref e) if e.local_name().as_ref() == b"Alarm" => {
                if let Some((id, alarm)) = alarm_from_element(e, uid) {
                    alarms.insert(id, alarm);
                }
            }
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    Ok(alarms)
}

fn alarm_from_element(e: &BytesStart, uid: &str) -> Option<(String, Alarm)> {
    let room = get_xml_attr(e, b"RoomUUID")?;
    if !room.eq_ignore_ascii_case(uid) {
        return None;
    }
    let id = get_xml_attr(e, b"ID")?;
    let attr = |name: &[u8]| get_xml_attr(e, name).unwrap_or_default();

    let alarm = Alarm {
        enabled: attr(b"Enabled") == "1",
        duration: attr(b"Duration"),
        play_mode: attr(b"PlayMode"),
        volume: attr(b"Volume").parse::<u8>().unwrap_or(0).min(100),
        recurrence: attr(b"Recurrence"),
        start_time: attr(b"StartTime"),
        included_link_zones: attr(b"IncludeLinkedZones") == "1",
    };
    Some((id, alarm))
}

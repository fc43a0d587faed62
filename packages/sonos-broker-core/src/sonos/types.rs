//! Domain types shared by the Sonos protocol modules.

use std::str::FromStr;

use serde::Serialize;

/// AVTransport transport state as reported by `TransportState`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransportState {
    Playing,
    PausedPlayback,
    Stopped,
    Transitioning,
    NoMediaPresent,
}

impl TransportState {
    /// Maps the state to the published `(play, pause, stop)` flags.
    ///
    /// `Transitioning` is a passing state and yields `None` so the last
    /// settled flags stay in place.
    #[must_use]
    pub fn flags(self) -> Option<(bool, bool, bool)> {
        match self {
            Self::Playing => Some((true, false, false)),
            Self::PausedPlayback => Some((false, true, false)),
            Self::Stopped | Self::NoMediaPresent => Some((false, false, true)),
            Self::Transitioning => None,
        }
    }
}

impl FromStr for TransportState {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PLAYING" => Ok(Self::Playing),
            "PAUSED_PLAYBACK" => Ok(Self::PausedPlayback),
            "STOPPED" => Ok(Self::Stopped),
            "TRANSITIONING" => Ok(Self::Transitioning),
            "NO_MEDIA_PRESENT" => Ok(Self::NoMediaPresent),
            _ => Err(()),
        }
    }
}

/// A member of a zone group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ZoneGroupMember {
    /// Lowercased RINCON uid.
    pub uid: String,
    pub ip: String,
    pub zone_name: String,
}

/// A zone group from the ZoneGroupState topology document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ZoneGroup {
    pub id: String,
    /// Lowercased RINCON uid of the coordinator.
    pub coordinator_uid: String,
    /// All members including the coordinator.
    pub members: Vec<ZoneGroupMember>,
}

impl ZoneGroup {
    /// Uids of the members other than the coordinator.
    #[must_use]
    pub fn additional_members(&self) -> Vec<String> {
        self.members
            .iter()
            .filter(|m| m.uid != self.coordinator_uid)
            .map(|m| m.uid.clone())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transport_state_maps_to_flags() {
        assert_eq!(
            "PLAYING".parse::<TransportState>().unwrap().flags(),
            Some((true, false, false))
        );
        assert_eq!(
            "PAUSED_PLAYBACK".parse::<TransportState>().unwrap().flags(),
            Some((false, true, false))
        );
        assert_eq!(
            "NO_MEDIA_PRESENT".parse::<TransportState>().unwrap().flags(),
            Some((false, false, true))
        );
        assert_eq!(TransportState::Transitioning.flags(), None);
        assert!("BOGUS".parse::<TransportState>().is_err());
    }
}

//! Process-wide zone registry with group resolution.
//!
//! All zones live behind one coarse `parking_lot::Mutex`. Access goes
//! through closures so the lock is never held across an `.await`.
//!
//! Coordinator-scoped fields are resolved exactly one hop: a zone's
//! coordinator reference is followed once, and a reference to a zone that
//! is not registered resolves to the zone itself.

use std::collections::HashMap;

use parking_lot::Mutex;

use crate::sonos::types::ZoneGroup;
use crate::zone::entity::{replace, GroupScoped, ZoneEntity};
use crate::zone::field::ZoneField;

/// A zone paired with the coordinator its group fields resolve to.
pub struct ZoneView<'a> {
    zone: &'a ZoneEntity,
    coordinator: &'a ZoneEntity,
}

impl<'a> ZoneView<'a> {
    #[must_use]
    pub fn zone(&self) -> &'a ZoneEntity {
        self.zone
    }

    /// Coordinator-owned fields as seen by this zone.
    #[must_use]
    pub fn group(&self) -> &'a GroupScoped {
        &self.coordinator.group
    }

    #[must_use]
    pub fn coordinator(&self) -> &'a ZoneEntity {
        self.coordinator
    }

    #[must_use]
    pub fn is_coordinator(&self) -> bool {
        self.zone.uid() == self.coordinator.uid()
    }
}

/// Uid of the zone whose group fields `uid` resolves to.
fn resolve<'a>(zones: &'a HashMap<String, ZoneEntity>, uid: &'a str) -> Option<&'a str> {
    let zone = zones.get(uid)?;
    Some(match zone.coordinator.as_deref() {
        Some(c) if c != uid && zones.contains_key(c) => c,
        _ => zone.uid(),
    })
}

/// Uids of the zones that resolve to `coordinator`, itself included.
fn followers(zones: &HashMap<String, ZoneEntity>, coordinator: &str) -> Vec<String> {
    zones
        .keys()
        .filter(|uid| resolve(zones, uid) == Some(coordinator))
        .cloned()
        .collect()
}

fn mark_all(zones: &mut HashMap<String, ZoneEntity>, uids: &[String], field: ZoneField) {
    for uid in uids {
        if let Some(zone) = zones.get_mut(uid) {
            zone.dirty.mark(field);
        }
    }
}

/// Registry of every known zone, keyed by lowercase uid.
#[derive(Default)]
pub struct ZoneRegistry {
    zones: Mutex<HashMap<String, ZoneEntity>>,
}

impl ZoneRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a zone, returning the one it replaced.
    pub fn insert(&self, zone: ZoneEntity) -> Option<ZoneEntity> {
        self.zones.lock().insert(zone.uid().to_string(), zone)
    }

    pub fn remove(&self, uid: &str) -> Option<ZoneEntity> {
        self.zones.lock().remove(uid)
    }

    #[must_use]
    pub fn contains(&self, uid: &str) -> bool {
        self.zones.lock().contains_key(uid)
    }

    /// All uids, sorted.
    #[must_use]
    pub fn uids(&self) -> Vec<String> {
        let mut uids: Vec<String> = self.zones.lock().keys().cloned().collect();
        uids.sort();
        uids
    }

    /// Uids of zones currently online, sorted.
    #[must_use]
    pub fn online_uids(&self) -> Vec<String> {
        self.uids_where(|z| z.online)
    }

    /// Uids of zones currently offline, sorted.
    #[must_use]
    pub fn offline_uids(&self) -> Vec<String> {
        self.uids_where(|z| !z.online)
    }

    fn uids_where(&self, pred: impl Fn(&ZoneEntity) -> bool) -> Vec<String> {
        let mut uids: Vec<String> = self
            .zones
            .lock()
            .values()
            .filter(|z| pred(z))
            .map(|z| z.uid().to_string())
            .collect();
        uids.sort();
        uids
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.zones.lock().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.zones.lock().is_empty()
    }

    /// Removes every zone, returning the removed uids.
    pub fn clear(&self) -> Vec<String> {
        let mut zones = self.zones.lock();
        let uids = zones.keys().cloned().collect();
        zones.clear();
        uids
    }

    /// Runs `f` on a group-resolved view of the zone.
    pub fn view<R>(&self, uid: &str, f: impl FnOnce(&ZoneView<'_>) -> R) -> Option<R> {
        let zones = self.zones.lock();
        let coordinator = resolve(&zones, uid)?;
        let view = ZoneView {
            zone: zones.get(uid)?,
            coordinator: zones.get(coordinator)?,
        };
        Some(f(&view))
    }

    /// Drains the zone's dirty fields and runs `f` on the view and the
    /// drained fields under the same lock.
    pub fn drain_dirty<R>(
        &self,
        uid: &str,
        f: impl FnOnce(&ZoneView<'_>, &[ZoneField]) -> R,
    ) -> Option<(Vec<ZoneField>, R)> {
        let mut zones = self.zones.lock();
        let fields = zones.get_mut(uid)?.dirty.drain();
        let coordinator = resolve(&zones, uid)?;
        let view = ZoneView {
            zone: zones.get(uid)?,
            coordinator: zones.get(coordinator)?,
        };
        let out = f(&view, &fields);
        Some((fields, out))
    }

    /// Runs `f` on the zone itself, ignoring group resolution.
    ///
    /// Use for device-local state; coordinator-scoped writes go through
    /// [`ZoneRegistry::set_group`].
    pub fn with_zone<R>(&self, uid: &str, f: impl FnOnce(&mut ZoneEntity) -> R) -> Option<R> {
        self.zones.lock().get_mut(uid).map(f)
    }

    /// Uid of the coordinator `uid` resolves to.
    #[must_use]
    pub fn coordinator_of(&self, uid: &str) -> Option<String> {
        resolve(&self.zones.lock(), uid).map(str::to_string)
    }

    /// `(uid, ip)` of the coordinator `uid` resolves to.
    #[must_use]
    pub fn coordinator_endpoint(&self, uid: &str) -> Option<(String, String)> {
        let zones = self.zones.lock();
        let coordinator = zones.get(resolve(&zones, uid)?)?;
        Some((coordinator.uid().to_string(), coordinator.ip.clone()))
    }

    /// `(uid, ip)` of every zone in `uid`'s group: the coordinator first,
    /// then its members.
    #[must_use]
    pub fn group_endpoints(&self, uid: &str) -> Vec<(String, String)> {
        let zones = self.zones.lock();
        let Some(coordinator) = resolve(&zones, uid).and_then(|c| zones.get(c)) else {
            return Vec::new();
        };

        std::iter::once(coordinator.uid())
            .chain(coordinator.members.iter().map(String::as_str))
            .filter_map(|m| zones.get(m))
            .map(|z| (z.uid().to_string(), z.ip.clone()))
            .collect()
    }

    /// Writes a coordinator-scoped field.
    ///
    /// The value lands on the coordinator `uid` resolves to, and the field
    /// is marked dirty on the coordinator and every zone following it.
    /// Returns false (and marks nothing) when the value is unchanged or the
    /// zone is unknown.
    pub fn set_group<T: PartialEq>(
        &self,
        uid: &str,
        field: ZoneField,
        slot: impl FnOnce(&mut GroupScoped) -> &mut T,
        value: T,
    ) -> bool {
        let mut zones = self.zones.lock();
        let Some(coordinator) = resolve(&zones, uid).map(str::to_string) else {
            return false;
        };
        let changed = zones
            .get_mut(&coordinator)
            .is_some_and(|c| replace(slot(&mut c.group), value));
        if changed {
            let group = followers(&zones, &coordinator);
            mark_all(&mut zones, &group, field);
        }
        changed
    }

    /// Runs `f` on the group fields `uid` resolves to without marking
    /// anything dirty. For unpublished state such as raw track metadata.
    pub fn with_group<R>(&self, uid: &str, f: impl FnOnce(&mut GroupScoped) -> R) -> Option<R> {
        let mut zones = self.zones.lock();
        let coordinator = resolve(&zones, uid)?.to_string();
        zones.get_mut(&coordinator).map(|c| f(&mut c.group))
    }

    /// Applies a ZoneGroupState topology to every registered zone.
    ///
    /// Zones listed in a group take its coordinator; the coordinator lists
    /// the other members. Registered zones absent from every group become
    /// their own coordinator. Returns the uids whose grouping changed.
    pub fn apply_topology(&self, groups: &[ZoneGroup]) -> Vec<String> {
        let mut zones = self.zones.lock();

        let mut assigned: HashMap<&str, (&str, Vec<String>)> = HashMap::new();
        let mut names: Vec<(&str, &str)> = Vec::new();
        for group in groups {
            for member in &group.members {
                let members = if member.uid == group.coordinator_uid {
                    group.additional_members()
                } else {
                    Vec::new()
                };
                assigned.insert(member.uid.as_str(), (group.coordinator_uid.as_str(), members));
                if !member.zone_name.is_empty() {
                    names.push((member.uid.as_str(), member.zone_name.as_str()));
                }
            }
        }

        let mut changed = Vec::new();
        for zone in zones.values_mut() {
            let (coordinator, members) = match assigned.remove(zone.uid()) {
                Some((c, m)) if c != zone.uid() => (Some(c.to_string()), m),
                Some((_, m)) => (None, m),
                None => (None, Vec::new()),
            };

            let moved = replace(&mut zone.coordinator, coordinator);
            let regrouped = replace(&mut zone.members, members);
            if regrouped {
                zone.dirty.mark(ZoneField::AdditionalZoneMembers);
            }
            if moved {
                // Group fields now resolve elsewhere
                for field in ZoneField::ALL.iter().filter(|f| f.is_coordinator_scoped()) {
                    zone.dirty.mark(*field);
                }
            }
            if moved || regrouped {
                changed.push(zone.uid().to_string());
            }
        }

        for (uid, name) in names {
            let renamed = zones
                .get_mut(uid)
                .is_some_and(|z| replace(&mut z.group.zone_name, name.to_string()));
            if renamed && resolve(&zones, uid) == Some(uid) {
                let group = followers(&zones, uid);
                mark_all(&mut zones, &group, ZoneField::ZoneName);
            }
        }

        changed.sort();
        changed
    }
}

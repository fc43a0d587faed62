//! Subscription lease state.
//!
//! Pure data structure tracking one lease per (zone, event category) without
//! performing I/O. Network operations are driven by
//! [`LeaseManager`](crate::services::lease_manager::LeaseManager).
//!
//! ```text
//! UNSUBSCRIBED → SUBSCRIBING → ACTIVE → EXPIRING → RENEWING → ACTIVE
//!                                                          ↘ UNSUBSCRIBED
//! ```

use std::collections::HashMap;
use std::time::Duration;

use parking_lot::RwLock;
use serde::Serialize;
use tokio::time::Instant;

use super::services::SonosService;

/// Lifecycle state of a subscription lease.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LeaseState {
    /// No live subscription.
    Unsubscribed,
    /// SUBSCRIBE request in flight.
    Subscribing,
    /// Subscription established with remaining time-to-live.
    Active,
    /// Selected for renewal, request not yet issued.
    Expiring,
    /// Renewal request in flight.
    Renewing,
}

/// Composite key for a lease (zone uid + event category).
#[derive(Debug, Clone, Hash, PartialEq, Eq)]
pub struct LeaseKey {
    pub uid: String,
    pub category: SonosService,
}

impl LeaseKey {
    /// Creates a new lease key.
    pub fn new(uid: impl Into<String>, category: SonosService) -> Self {
        Self {
            uid: uid.into(),
            category,
        }
    }
}

struct Lease {
    ip: String,
    state: LeaseState,
    sid: Option<String>,
    expires_at: Option<Instant>,
}

impl Lease {
    fn remaining(&self, now: Instant) -> Duration {
        self.expires_at
            .map(|at| at.saturating_duration_since(now))
            .unwrap_or(Duration::ZERO)
    }

    /// Effective state: an active lease with no time left counts as absent.
    fn effective_state(&self, now: Instant) -> LeaseState {
        match self.state {
            LeaseState::Active if self.remaining(now).is_zero() => LeaseState::Unsubscribed,
            s => s,
        }
    }
}

/// A lease selected for renewal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenewalTarget {
    pub key: LeaseKey,
    pub ip: String,
    pub sid: String,
}

/// A lease dropped from the table that still holds a device-side SID.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReleasedLease {
    pub category: SonosService,
    pub ip: String,
    pub sid: String,
}

/// Pure state container for subscription leases.
pub struct LeaseTable {
    leases: RwLock<HashMap<LeaseKey, Lease>>,
    /// Reverse lookup: SID -> lease key, used to route NOTIFY requests.
    sids: RwLock<HashMap<String, LeaseKey>>,
}

impl LeaseTable {
    /// Creates a new empty lease table.
    pub fn new() -> Self {
        Self {
            leases: RwLock::new(HashMap::new()),
            sids: RwLock::new(HashMap::new()),
        }
    }

    /// Returns the effective state of a lease (absent leases are `Unsubscribed`).
    #[must_use]
    pub fn state(&self, uid: &str, category: SonosService) -> LeaseState {
        let now = Instant::now();
        self.leases
            .read()
            .get(&LeaseKey::new(uid, category))
            .map(|l| l.effective_state(now))
            .unwrap_or(LeaseState::Unsubscribed)
    }

    /// Returns the remaining time-to-live of a lease.
    #[must_use]
    pub fn ttl(&self, uid: &str, category: SonosService) -> Option<Duration> {
        let now = Instant::now();
        self.leases
            .read()
            .get(&LeaseKey::new(uid, category))
            .filter(|l| l.state != LeaseState::Unsubscribed)
            .map(|l| l.remaining(now))
    }

    /// Marks a lease as `Subscribing` if it is absent, unsubscribed or expired.
    ///
    /// Returns `false` when a live lease exists or a request is already in
    /// flight, so concurrent callers never issue duplicate SUBSCRIBE requests.
    pub fn begin_subscribe(&self, uid: &str, ip: &str, category: SonosService) -> bool {
        let now = Instant::now();
        let key = LeaseKey::new(uid, category);
        let mut leases = self.leases.write();

        if let Some(existing) = leases.get(&key) {
            if existing.effective_state(now) != LeaseState::Unsubscribed {
                return false;
            }
            if let Some(sid) = &existing.sid {
                self.sids.write().remove(sid);
            }
        }

        leases.insert(
            key,
            Lease {
                ip: ip.to_string(),
                state: LeaseState::Subscribing,
                sid: None,
                expires_at: None,
            },
        );
        true
    }

    /// Forces a lease into `Subscribing` regardless of its state.
    ///
    /// Returns `None` when a SUBSCRIBE is already in flight, otherwise the
    /// previous SID (if any) so the caller can cancel it on the device.
    pub fn begin_resubscribe(
        &self,
        uid: &str,
        ip: &str,
        category: SonosService,
    ) -> Option<Option<String>> {
        let key = LeaseKey::new(uid, category);
        let mut leases = self.leases.write();

        let previous_sid = match leases.get(&key) {
            Some(l) if l.state == LeaseState::Subscribing => return None,
            Some(l) => l.sid.clone(),
            None => None,
        };
        if let Some(sid) = &previous_sid {
            self.sids.write().remove(sid);
        }

        leases.insert(
            key,
            Lease {
                ip: ip.to_string(),
                state: LeaseState::Subscribing,
                sid: None,
                expires_at: None,
            },
        );
        Some(previous_sid)
    }

    /// Records an established (or renewed) subscription.
    ///
    /// Ignored when the lease was dropped while the request was in flight.
    pub fn activate(&self, uid: &str, category: SonosService, sid: String, timeout_secs: u64) {
        let key = LeaseKey::new(uid, category);
        let mut leases = self.leases.write();
        let Some(lease) = leases.get_mut(&key) else {
            return;
        };

        let mut sids = self.sids.write();
        if let Some(old) = lease.sid.take() {
            sids.remove(&old);
        }
        sids.insert(sid.clone(), key);
        lease.sid = Some(sid);
        lease.state = LeaseState::Active;
        lease.expires_at = Some(Instant::now() + Duration::from_secs(timeout_secs));
    }

    /// Moves a lease to `Unsubscribed` after a failed request.
    pub fn fail(&self, uid: &str, category: SonosService) {
        let key = LeaseKey::new(uid, category);
        if let Some(lease) = self.leases.write().get_mut(&key) {
            if let Some(sid) = lease.sid.take() {
                self.sids.write().remove(&sid);
            }
            lease.state = LeaseState::Unsubscribed;
            lease.expires_at = None;
        }
    }

    /// Selects active leases whose TTL is below `buffer` and marks them `Expiring`.
    pub fn begin_renewals(&self, buffer: Duration) -> Vec<RenewalTarget> {
        let now = Instant::now();
        let mut targets = Vec::new();

        for (key, lease) in self.leases.write().iter_mut() {
            if lease.state != LeaseState::Active || lease.remaining(now) >= buffer {
                continue;
            }
            let Some(sid) = lease.sid.clone() else {
                continue;
            };
            lease.state = LeaseState::Expiring;
            targets.push(RenewalTarget {
                key: key.clone(),
                ip: lease.ip.clone(),
                sid,
            });
        }

        targets
    }

    /// Marks an expiring lease as `Renewing`.
    ///
    /// Returns `false` if the lease was dropped or changed state meanwhile.
    pub fn mark_renewing(&self, key: &LeaseKey) -> bool {
        match self.leases.write().get_mut(key) {
            Some(lease) if lease.state == LeaseState::Expiring => {
                lease.state = LeaseState::Renewing;
                true
            }
            _ => false,
        }
    }

    /// Resolves a SID to its zone uid and event category.
    #[must_use]
    pub fn resolve(&self, sid: &str) -> Option<(String, SonosService)> {
        self.sids
            .read()
            .get(sid)
            .map(|k| (k.uid.clone(), k.category))
    }

    /// Drops every lease of a zone, returning those with a device-side SID.
    pub fn remove_zone(&self, uid: &str) -> Vec<ReleasedLease> {
        let mut leases = self.leases.write();
        let mut sids = self.sids.write();
        let keys: Vec<LeaseKey> = leases.keys().filter(|k| k.uid == uid).cloned().collect();

        keys.into_iter()
            .filter_map(|key| {
                let lease = leases.remove(&key)?;
                let sid = lease.sid?;
                sids.remove(&sid);
                Some(ReleasedLease {
                    category: key.category,
                    ip: lease.ip,
                    sid,
                })
            })
            .collect()
    }

    /// Returns the uids that currently hold at least one lease record.
    #[must_use]
    pub fn zone_uids(&self) -> Vec<String> {
        let mut uids: Vec<String> = self.leases.read().keys().map(|k| k.uid.clone()).collect();
        uids.sort();
        uids.dedup();
        uids
    }

    /// Drops all lease records.
    pub fn clear(&self) {
        self.leases.write().clear();
        self.sids.write().clear();
    }

    /// Returns the number of lease records.
    #[must_use]
    pub fn len(&self) -> usize {
        self.leases.read().len()
    }

    /// Returns true if there are no lease records.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.leases.read().is_empty()
    }
}

impl Default for LeaseTable {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const RC: SonosService = SonosService::RenderingControl;

    #[test]
    fn absent_lease_is_unsubscribed() {
        let table = LeaseTable::new();
        assert_eq!(table.state("a", RC), LeaseState::Unsubscribed);
        assert!(table.ttl("a", RC).is_none());
        assert!(table.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn subscribe_marks_pending_once() {
        let table = LeaseTable::new();
        assert!(table.begin_subscribe("a", "10.0.0.1", RC));
        assert!(!table.begin_subscribe("a", "10.0.0.1", RC));
        assert_eq!(table.state("a", RC), LeaseState::Subscribing);

        table.activate("a", RC, "uuid:sid-1".into(), 200);
        assert_eq!(table.state("a", RC), LeaseState::Active);
        assert!(!table.begin_subscribe("a", "10.0.0.1", RC));
        assert_eq!(table.resolve("uuid:sid-1"), Some(("a".to_string(), RC)));
    }

    #[tokio::test(start_paused = true)]
    async fn zero_ttl_lease_counts_as_absent() {
        let table = LeaseTable::new();
        table.begin_subscribe("a", "10.0.0.1", RC);
        table.activate("a", RC, "sid".into(), 5);

        tokio::time::advance(Duration::from_secs(5)).await;

        assert_eq!(table.state("a", RC), LeaseState::Unsubscribed);
        assert!(table.begin_subscribe("a", "10.0.0.1", RC));
        assert!(table.resolve("sid").is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn renewal_selects_leases_within_buffer() {
        let table = LeaseTable::new();
        table.begin_subscribe("a", "10.0.0.1", RC);
        table.activate("a", RC, "sid-a".into(), 200);
        table.begin_subscribe("b", "10.0.0.2", RC);
        table.activate("b", RC, "sid-b".into(), 20);

        let targets = table.begin_renewals(Duration::from_secs(30));
        assert_eq!(targets.len(), 1);
        assert_eq!(targets[0].key.uid, "b");
        assert_eq!(table.state("b", RC), LeaseState::Expiring);

        assert!(table.mark_renewing(&targets[0].key));
        assert_eq!(table.state("b", RC), LeaseState::Renewing);

        table.activate("b", RC, "sid-b".into(), 200);
        assert_eq!(table.state("b", RC), LeaseState::Active);
        assert_eq!(table.ttl("b", RC), Some(Duration::from_secs(200)));
    }

    #[test]
    fn failed_lease_drops_sid() {
        let table = LeaseTable::new();
        table.begin_subscribe("a", "10.0.0.1", RC);
        table.activate("a", RC, "sid".into(), 200);
        table.fail("a", RC);

        assert_eq!(table.state("a", RC), LeaseState::Unsubscribed);
        assert!(table.resolve("sid").is_none());
    }

    #[test]
    fn resubscribe_returns_previous_sid() {
        let table = LeaseTable::new();
        table.begin_subscribe("a", "10.0.0.1", RC);
        assert_eq!(table.begin_resubscribe("a", "10.0.0.1", RC), None);

        table.activate("a", RC, "old".into(), 200);
        assert_eq!(
            table.begin_resubscribe("a", "10.0.0.1", RC),
            Some(Some("old".to_string()))
        );
        assert!(table.resolve("old").is_none());
    }

    #[test]
    fn remove_zone_returns_live_sids() {
        let table = LeaseTable::new();
        for category in SonosService::EVENT_CATEGORIES {
            table.begin_subscribe("a", "10.0.0.1", category);
        }
        table.activate("a", RC, "sid-rc".into(), 200);

        let released = table.remove_zone("a");
        assert_eq!(released.len(), 1);
        assert_eq!(released[0].category, RC);
        assert!(table.is_empty());
        assert!(table.resolve("sid-rc").is_none());
    }

    #[test]
    fn activate_after_removal_is_ignored() {
        let table = LeaseTable::new();
        table.begin_subscribe("a", "10.0.0.1", RC);
        table.clear();
        table.activate("a", RC, "late".into(), 200);

        assert!(table.resolve("late").is_none());
        assert!(table.is_empty());
    }
}

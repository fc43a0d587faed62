//! Periodic zone discovery.
//!
//! Each pass probes the network, diffs the responses against the registry,
//! admits new or returning zones (metadata fetch, subscriptions, state
//! refresh, full publish) and takes missing zones offline. Every
//! `deep_scan_every`-th pass also evicts zones that stayed offline and
//! re-fetches and re-subscribes the online ones.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::sync::Notify;
use tokio_util::sync::CancellationToken;

use crate::context::NetworkContext;
use crate::publish::Publisher;
use crate::runtime::{TaskSpawner, TokioSpawner};
use crate::services::lease_manager::LeaseManager;
use crate::services::zone_controller::ZoneController;
use crate::sonos::device::DeviceControl;
use crate::sonos::discovery::{DiscoveredZone, ZoneProbe};
use crate::state::Config;
use crate::zone::{ZoneEntity, ZoneField, ZoneRegistry};

/// Outcome of one discovery pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DiscoveryReport {
    /// Uids seen for the first time.
    pub added: Vec<String>,
    /// Known offline uids that answered again.
    pub revived: Vec<String>,
    /// Online uids that did not answer.
    pub offline: Vec<String>,
    /// Uids removed by a deep scan.
    pub evicted: Vec<String>,
    pub deep_scan: bool,
    /// Number of zones dropped because the probe heard nothing.
    pub cleared: usize,
}

impl DiscoveryReport {
    fn is_quiet(&self) -> bool {
        self.added.is_empty()
            && self.revived.is_empty()
            && self.offline.is_empty()
            && self.evicted.is_empty()
            && self.cleared == 0
    }
}

/// Drives periodic discovery passes.
pub struct DiscoveryLoop {
    probe: Arc<dyn ZoneProbe>,
    device: Arc<dyn DeviceControl>,
    registry: Arc<ZoneRegistry>,
    leases: Arc<LeaseManager>,
    controller: Arc<ZoneController>,
    publisher: Arc<Publisher>,
    network: NetworkContext,
    interval: Duration,
    deep_scan_every: u64,
    excluded_models: Vec<String>,
    passes: AtomicU64,
    scan_notify: Notify,
}

impl DiscoveryLoop {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        probe: Arc<dyn ZoneProbe>,
        device: Arc<dyn DeviceControl>,
        registry: Arc<ZoneRegistry>,
        leases: Arc<LeaseManager>,
        controller: Arc<ZoneController>,
        publisher: Arc<Publisher>,
        network: NetworkContext,
        config: &Config,
    ) -> Self {
        Self {
            probe,
            device,
            registry,
            leases,
            controller,
            publisher,
            network,
            interval: config.discovery_interval(),
            deep_scan_every: config.deep_scan_every.max(1),
            excluded_models: config
                .excluded_models
                .iter()
                .map(|m| m.to_ascii_uppercase())
                .collect(),
            passes: AtomicU64::new(0),
            scan_notify: Notify::new(),
        }
    }

    /// Requests a pass ahead of the regular interval.
    pub fn trigger_scan(&self) {
        self.scan_notify.notify_one();
    }

    fn is_excluded(&self, zone: &DiscoveredZone) -> bool {
        let model = zone.model.to_ascii_uppercase();
        self.excluded_models.iter().any(|m| *m == model)
    }

    /// Runs one discovery pass.
    pub async fn run_pass(&self) -> DiscoveryReport {
        let mut report = DiscoveryReport::default();

        let responses = match self.probe.probe().await {
            Ok(responses) => responses,
            Err(e) => {
                log::warn!("[Discovery] Probe failed, skipping pass: {}", e);
                return report;
            }
        };

        if responses.is_empty() {
            let cleared = self.registry.clear();
            self.leases.forget_all();
            self.passes.store(0, Ordering::SeqCst);
            if !cleared.is_empty() {
                log::warn!(
                    "[Discovery] No zone answered, dropped {} zone(s)",
                    cleared.len()
                );
            }
            report.cleared = cleared.len();
            return report;
        }

        let pass = self.passes.fetch_add(1, Ordering::SeqCst) + 1;
        report.deep_scan = pass % self.deep_scan_every == 0;

        let found: HashMap<String, DiscoveredZone> = responses
            .into_iter()
            .filter(|z| !self.is_excluded(z))
            .map(|z| (z.uid.clone(), z))
            .collect();
        let online: HashSet<String> = self.registry.online_uids().into_iter().collect();
        let offline_before = self.registry.offline_uids();

        let mut new: Vec<&DiscoveredZone> =
            found.values().filter(|z| !online.contains(&z.uid)).collect();
        new.sort_by(|a, b| a.uid.cmp(&b.uid));
        for zone in new {
            let revived = self.registry.contains(&zone.uid);
            if self.admit(zone).await {
                if revived {
                    report.revived.push(zone.uid.clone());
                } else {
                    report.added.push(zone.uid.clone());
                }
            }
        }

        for zone in found.values().filter(|z| online.contains(&z.uid)) {
            self.follow_address(zone).await;
        }

        let mut missing: Vec<&String> = online.iter().filter(|u| !found.contains_key(*u)).collect();
        missing.sort();
        for uid in missing {
            self.take_offline(uid).await;
            report.offline.push(uid.clone());
        }

        if report.deep_scan {
            report.evicted = self.deep_scan(&offline_before, &found).await;
        } else {
            for uid in self.registry.online_uids() {
                if let Some(ip) = self.registry.view(&uid, |v| v.zone().ip.clone()) {
                    self.leases.ensure_subscribed(&uid, &ip).await;
                }
            }
        }

        if report.is_quiet() {
            log::debug!("[Discovery] Pass {} found {} zone(s), no changes", pass, found.len());
        } else {
            log::info!("[Discovery] Pass {}: {:?}", pass, report);
        }
        report
    }

    /// Fetches metadata and registers or revives the zone.
    ///
    /// Returns false when the zone could not be reached.
    async fn admit(&self, found: &DiscoveredZone) -> bool {
        let meta = match self.device.fetch_metadata(&found.ip).await {
            Ok(meta) => meta,
            Err(e) => {
                log::warn!(
                    "[Discovery] Metadata fetch for {} at {} failed: {}",
                    found.uid,
                    found.ip,
                    e
                );
                return false;
            }
        };

        let revived = self
            .registry
            .with_zone(&found.uid, |zone| {
                zone.ip = found.ip.clone();
                zone.online = true;
                zone.apply_metadata(&meta);
                zone.dirty.mark(ZoneField::Status);
            })
            .is_some();
        if !revived {
            let mut zone = ZoneEntity::new(&found.uid, &found.ip, &found.model);
            zone.apply_metadata(&meta);
            self.registry.insert(zone);
        }
        log::info!(
            "[Discovery] {} zone {} ({}) at {}",
            if revived { "Revived" } else { "Added" },
            found.uid,
            meta.zone_name,
            found.ip
        );

        self.leases.ensure_subscribed(&found.uid, &found.ip).await;
        if let Err(e) = self.controller.refresh_state(&found.uid).await {
            log::warn!("[Discovery] State refresh of {} failed: {}", found.uid, e);
        }
        if let Err(e) = self.publisher.publish_full(&found.uid, false).await {
            log::warn!("[Discovery] Full publish of {} failed: {}", found.uid, e);
        }
        true
    }

    /// Moves subscriptions when an online zone answered from a new address.
    async fn follow_address(&self, found: &DiscoveredZone) {
        let moved = self
            .registry
            .with_zone(&found.uid, |zone| {
                if zone.ip == found.ip {
                    return false;
                }
                zone.ip = found.ip.clone();
                zone.dirty.mark(ZoneField::Ip);
                true
            })
            .unwrap_or(false);
        if moved {
            log::info!("[Discovery] {} moved to {}", found.uid, found.ip);
            self.leases.release(&found.uid).await;
            self.leases.ensure_subscribed(&found.uid, &found.ip).await;
            if let Err(e) = self.publisher.publish_dirty(&found.uid).await {
                log::warn!("[Discovery] Publish of {} failed: {}", found.uid, e);
            }
        }
    }

    async fn take_offline(&self, uid: &str) {
        log::info!("[Discovery] {} stopped answering, marking offline", uid);
        self.registry.with_zone(uid, ZoneEntity::mark_offline);
        self.leases.release(uid).await;
        if let Err(e) = self.publisher.publish_full(uid, false).await {
            log::warn!("[Discovery] Full publish of {} failed: {}", uid, e);
        }
    }

    /// Evicts zones that were offline before this pass and still are, then
    /// refreshes metadata and subscriptions of every online zone.
    async fn deep_scan(
        &self,
        offline_before: &[String],
        found: &HashMap<String, DiscoveredZone>,
    ) -> Vec<String> {
        let mut evicted = Vec::new();
        for uid in offline_before {
            if found.contains_key(uid) {
                continue;
            }
            if self.registry.remove(uid).is_some() {
                self.leases.release(uid).await;
                log::info!("[Discovery] Evicted {} after staying offline", uid);
                evicted.push(uid.clone());
            }
        }

        for uid in self.registry.online_uids() {
            let Some(ip) = self.registry.view(&uid, |v| v.zone().ip.clone()) else {
                continue;
            };
            match self.device.fetch_metadata(&ip).await {
                Ok(meta) => {
                    self.registry.with_zone(&uid, |zone| zone.apply_metadata(&meta));
                }
                Err(e) => log::warn!("[Discovery] Deep scan fetch for {} failed: {}", uid, e),
            }
            self.leases.resubscribe(&uid, &ip).await;
            if let Err(e) = self.publisher.publish_full(&uid, false).await {
                log::warn!("[Discovery] Full publish of {} failed: {}", uid, e);
            }
        }
        evicted
    }

    /// Drops every subscription when the advertised address changed, so the
    /// next pass subscribes again with the new callback URL.
    async fn check_local_ip(&self) {
        let Ok(detected) = self.network.detect_ip() else {
            return;
        };
        let current = self.network.get_local_ip();
        if detected != current {
            log::warn!(
                "[Discovery] Local IP changed: {} -> {}. Re-subscribing...",
                current,
                detected
            );
            self.network.set_local_ip(detected);
            self.leases.shutdown().await;
        }
    }

    /// Starts the background discovery loop.
    ///
    /// The first pass runs immediately. The loop stops when `cancel` is
    /// triggered.
    pub fn start(self: Arc<Self>, spawner: &TokioSpawner, cancel: CancellationToken) {
        spawner.spawn(async move {
            let mut interval = tokio::time::interval(self.interval);
            loop {
                let is_manual = tokio::select! {
                    _ = cancel.cancelled() => {
                        log::info!("[Discovery] Shutting down discovery loop");
                        break;
                    }
                    _ = interval.tick() => false,
                    _ = self.scan_notify.notified() => {
                        log::info!("[Discovery] Manual scan triggered");
                        true
                    }
                };

                // Push the next automatic pass back after a manual one
                if is_manual {
                    interval.reset();
                }

                self.check_local_ip().await;
                self.run_pass().await;
            }
        });
    }
}

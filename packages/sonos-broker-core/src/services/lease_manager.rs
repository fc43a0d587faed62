//! Subscription lease management.
//!
//! Keeps one GENA subscription per (zone, event category) alive: creates
//! missing ones, renews them before they lapse, and cancels them when a
//! zone goes away. The per-lease state machine lives in [`LeaseTable`];
//! this service drives it with network calls.

use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use tokio_util::sync::CancellationToken;

use crate::context::NetworkContext;
use crate::runtime::{TaskSpawner, TokioSpawner};
use crate::sonos::gena_client::SubscriptionTransport;
use crate::sonos::lease::LeaseTable;
use crate::sonos::services::SonosService;
use crate::state::Config;

/// Drives subscription leases for every known zone.
pub struct LeaseManager {
    table: LeaseTable,
    transport: Arc<dyn SubscriptionTransport>,
    network: NetworkContext,
    lease_secs: u64,
    renewal_buffer: Duration,
    renewal_check: Duration,
}

impl LeaseManager {
    pub fn new(
        transport: Arc<dyn SubscriptionTransport>,
        network: NetworkContext,
        config: &Config,
    ) -> Self {
        Self {
            table: LeaseTable::new(),
            transport,
            network,
            lease_secs: config.lease_secs(),
            renewal_buffer: Duration::from_secs(config.renewal_buffer_secs),
            renewal_check: Duration::from_secs(config.renewal_check_secs),
        }
    }

    /// Read access to the lease records.
    #[must_use]
    pub fn table(&self) -> &LeaseTable {
        &self.table
    }

    /// Resolves a SID to its zone uid and event category.
    #[must_use]
    pub fn resolve(&self, sid: &str) -> Option<(String, SonosService)> {
        self.table.resolve(sid)
    }

    /// Subscribes every category whose lease is absent, unsubscribed or
    /// expired. Categories with a request already in flight are skipped.
    ///
    /// Returns the number of subscriptions established.
    pub async fn ensure_subscribed(&self, uid: &str, ip: &str) -> usize {
        let pending = SonosService::EVENT_CATEGORIES
            .into_iter()
            .filter(|&category| self.table.begin_subscribe(uid, ip, category))
            .map(|category| self.subscribe_one(uid, ip, category));

        join_all(pending).await.into_iter().filter(|ok| *ok).count()
    }

    /// Cancels and re-creates every subscription of a zone regardless of
    /// lease state. Used on deep scans.
    pub async fn resubscribe(&self, uid: &str, ip: &str) -> usize {
        let mut established = 0;
        for category in SonosService::EVENT_CATEGORIES {
            let Some(previous) = self.table.begin_resubscribe(uid, ip, category) else {
                continue;
            };
            if let Some(sid) = previous {
                if let Err(e) = self.transport.unsubscribe(ip, category, &sid).await {
                    log::debug!("[Lease] Unsubscribe of stale {} failed: {}", sid, e);
                }
            }
            if self.subscribe_one(uid, ip, category).await {
                established += 1;
            }
        }
        established
    }

    async fn subscribe_one(&self, uid: &str, ip: &str, category: SonosService) -> bool {
        let callback = self.network.gena_callback_url();
        match self
            .transport
            .subscribe(ip, category, &callback, self.lease_secs)
            .await
        {
            Ok(response) => {
                log::debug!(
                    "[Lease] Subscribed {} {} ({}s, {})",
                    uid,
                    category,
                    response.timeout_secs,
                    response.sid
                );
                self.table
                    .activate(uid, category, response.sid, response.timeout_secs);
                true
            }
            Err(e) => {
                log::warn!("[Lease] Subscribe {} {} at {} failed: {}", uid, category, ip, e);
                self.table.fail(uid, category);
                false
            }
        }
    }

    /// Renews every active lease whose TTL dropped below the buffer.
    ///
    /// Failed renewals leave the lease unsubscribed; the next discovery
    /// pass subscribes it again. Returns the number renewed.
    pub async fn renew_due(&self) -> usize {
        let mut renewed = 0;
        for target in self.table.begin_renewals(self.renewal_buffer) {
            if !self.table.mark_renewing(&target.key) {
                continue;
            }
            let (uid, category) = (&target.key.uid, target.key.category);
            match self
                .transport
                .renew(&target.ip, category, &target.sid, self.lease_secs)
                .await
            {
                Ok(timeout_secs) => {
                    log::debug!("[Lease] Renewed {} {} ({}s)", uid, category, timeout_secs);
                    self.table.activate(uid, category, target.sid.clone(), timeout_secs);
                    renewed += 1;
                }
                Err(e) => {
                    log::warn!("[Lease] Renewal of {} {} failed: {}", uid, category, e);
                    self.table.fail(uid, category);
                }
            }
        }
        renewed
    }

    /// Best-effort unsubscribe of every lease of a zone.
    ///
    /// Local records are always dropped, even when the device is gone.
    pub async fn release(&self, uid: &str) {
        for lease in self.table.remove_zone(uid) {
            if let Err(e) = self
                .transport
                .unsubscribe(&lease.ip, lease.category, &lease.sid)
                .await
            {
                log::debug!("[Lease] Unsubscribe {} {} failed: {}", uid, lease.category, e);
            }
        }
    }

    /// Drops every lease record without contacting devices.
    pub fn forget_all(&self) {
        let dropped = self.table.len();
        self.table.clear();
        if dropped > 0 {
            log::info!("[Lease] Forgot {} lease record(s)", dropped);
        }
    }

    /// Releases the leases of every zone.
    pub async fn shutdown(&self) {
        let uids = self.table.zone_uids();
        log::info!("[Lease] Releasing leases of {} zone(s)", uids.len());
        join_all(uids.iter().map(|uid| self.release(uid))).await;
    }

    /// Starts the background renewal task.
    ///
    /// The task stops when `cancel` is triggered.
    pub fn start_renewal_task(self: Arc<Self>, spawner: &TokioSpawner, cancel: CancellationToken) {
        spawner.spawn(async move {
            let mut interval = tokio::time::interval(self.renewal_check);
            loop {
                tokio::select! {
                    _ = cancel.cancelled() => {
                        log::info!("[Lease] Renewal task shutting down");
                        break;
                    }
                    _ = interval.tick() => {}
                }

                let renewed = self.renew_due().await;
                if renewed > 0 {
                    log::debug!("[Lease] Renewed {} lease(s)", renewed);
                }
            }
        });
    }
}

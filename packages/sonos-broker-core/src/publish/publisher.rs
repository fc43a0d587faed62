//! Builds snapshots from the registry and hands them to the sink.
//!
//! Snapshots are built under the registry lock and sent after it is
//! released, so a slow sink never blocks event handling.

use std::sync::Arc;

use super::{PublishError, PublishResult, PublishSink};
use crate::zone::snapshot::{encode, fingerprint, full_snapshot, partial_snapshot};
use crate::zone::ZoneRegistry;

/// Publishes zone state through a [`PublishSink`].
pub struct Publisher {
    registry: Arc<ZoneRegistry>,
    sink: Arc<dyn PublishSink>,
}

impl Publisher {
    pub fn new(registry: Arc<ZoneRegistry>, sink: Arc<dyn PublishSink>) -> Self {
        Self { registry, sink }
    }

    /// Sends the zone's dirty fields plus `uid`, draining the dirty set.
    ///
    /// Returns `Ok(false)` when nothing was dirty. When the send fails the
    /// drained fields are marked dirty again so the next publish retries
    /// them.
    pub async fn publish_dirty(&self, uid: &str) -> PublishResult<bool> {
        let (fields, payload) = self
            .registry
            .drain_dirty(uid, |view, fields| {
                (!fields.is_empty()).then(|| encode(&partial_snapshot(view, fields)))
            })
            .ok_or_else(|| PublishError::UnknownZone(uid.to_string()))?;

        let Some(payload) = payload else {
            return Ok(false);
        };

        let result = match payload {
            Ok(payload) => self.sink.send(payload).await,
            Err(e) => Err(e.into()),
        };

        if let Err(e) = result {
            log::warn!("[Publish] Dirty publish of {} failed: {}", uid, e);
            self.registry.with_zone(uid, |zone| zone.dirty.merge(fields));
            return Err(e);
        }

        log::debug!("[Publish] Sent {} dirty field(s) of {}", fields.len(), uid);
        Ok(true)
    }

    /// Publishes the dirty fields of every zone. Returns how many zones sent.
    pub async fn publish_dirty_all(&self) -> usize {
        let mut sent = 0;
        for uid in self.registry.uids() {
            match self.publish_dirty(&uid).await {
                Ok(true) => sent += 1,
                Ok(false) => {}
                Err(e) => log::debug!("[Publish] Skipped {}: {}", uid, e),
            }
        }
        sent
    }

    /// Sends every field of the zone if its fingerprint changed, or always
    /// when `force` is set.
    ///
    /// After a coordinator is published its members get an unforced full
    /// publish, so only members whose snapshot changed are sent; member
    /// failures are logged. Returns whether the zone itself was sent.
    pub async fn publish_full(&self, uid: &str, force: bool) -> PublishResult<bool> {
        let sent = self.publish_full_one(uid, force).await?;

        let members = self
            .registry
            .view(uid, |v| {
                if v.is_coordinator() {
                    v.zone().members.clone()
                } else {
                    Vec::new()
                }
            })
            .unwrap_or_default();

        for member in members {
            if let Err(e) = self.publish_full_one(&member, false).await {
                log::warn!("[Publish] Full publish of member {} failed: {}", member, e);
            }
        }

        Ok(sent)
    }

    async fn publish_full_one(&self, uid: &str, force: bool) -> PublishResult<bool> {
        let (payload, previous) = self
            .registry
            .view(uid, |v| {
                (
                    encode(&full_snapshot(v)),
                    v.zone().properties_hash.clone(),
                )
            })
            .ok_or_else(|| PublishError::UnknownZone(uid.to_string()))?;

        let payload = payload?;
        let hash = fingerprint(&payload);
        if !force && previous.as_deref() == Some(hash.as_str()) {
            log::trace!("[Publish] {} unchanged, skipping full publish", uid);
            return Ok(false);
        }

        self.sink.send(payload).await?;

        // Only a delivered snapshot counts as published
        self.registry
            .with_zone(uid, |zone| zone.properties_hash = Some(hash));
        log::debug!("[Publish] Sent full snapshot of {}", uid);
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::RecordingSink;
    use crate::zone::{ZoneEntity, ZoneField};

    fn setup() -> (Arc<ZoneRegistry>, Arc<RecordingSink>, Publisher) {
        let registry = Arc::new(ZoneRegistry::new());
        let sink = Arc::new(RecordingSink::new());
        let publisher = Publisher::new(Arc::clone(&registry), sink.clone());
        (registry, sink, publisher)
    }

    #[tokio::test]
    async fn dirty_publish_sends_marked_fields_then_drains() {
        let (registry, sink, publisher) = setup();
        let mut zone = ZoneEntity::new("rincon_a", "10.0.0.1", "S1");
        zone.set_volume(37);
        registry.insert(zone);

        assert!(publisher.publish_dirty("rincon_a").await.unwrap());
        assert!(!publisher.publish_dirty("rincon_a").await.unwrap());

        let payloads = sink.payloads();
        assert_eq!(payloads.len(), 1);
        assert_eq!(payloads[0], serde_json::json!({"uid": "rincon_a", "volume": 37}));
    }

    #[tokio::test]
    async fn failed_dirty_publish_keeps_fields() {
        let (registry, sink, publisher) = setup();
        let mut zone = ZoneEntity::new("rincon_a", "10.0.0.1", "S1");
        zone.set_mute(true);
        registry.insert(zone);

        sink.set_failing(true);
        assert!(publisher.publish_dirty("rincon_a").await.is_err());
        assert!(registry
            .view("rincon_a", |v| v.zone().dirty.contains(ZoneField::Mute))
            .unwrap());

        sink.set_failing(false);
        assert!(publisher.publish_dirty("rincon_a").await.unwrap());
        assert_eq!(sink.payloads()[0]["mute"], true);
    }

    #[tokio::test]
    async fn full_publish_skips_unchanged_unless_forced() {
        let (registry, sink, publisher) = setup();
        registry.insert(ZoneEntity::new("rincon_a", "10.0.0.1", "S1"));

        assert!(publisher.publish_full("rincon_a", false).await.unwrap());
        assert!(!publisher.publish_full("rincon_a", false).await.unwrap());
        assert!(publisher.publish_full("rincon_a", true).await.unwrap());
        assert_eq!(sink.payloads().len(), 2);

        registry.with_zone("rincon_a", |z| z.set_volume(10));
        assert!(publisher.publish_full("rincon_a", false).await.unwrap());
        assert_eq!(sink.payloads().len(), 3);
    }

    #[tokio::test]
    async fn failed_full_publish_does_not_store_hash() {
        let (registry, sink, publisher) = setup();
        registry.insert(ZoneEntity::new("rincon_a", "10.0.0.1", "S1"));

        sink.set_failing(true);
        assert!(publisher.publish_full("rincon_a", false).await.is_err());
        sink.set_failing(false);
        assert!(publisher.publish_full("rincon_a", false).await.unwrap());
    }

    #[tokio::test]
    async fn coordinator_publish_cascades_to_members() {
        let (registry, sink, publisher) = setup();
        let mut a = ZoneEntity::new("rincon_a", "10.0.0.1", "S1");
        a.members = vec!["rincon_b".into()];
        let mut b = ZoneEntity::new("rincon_b", "10.0.0.2", "S1");
        b.coordinator = Some("rincon_a".into());
        registry.insert(a);
        registry.insert(b);

        publisher.publish_full("rincon_a", false).await.unwrap();
        let uids: Vec<String> = sink
            .payloads()
            .iter()
            .map(|p| p["uid"].as_str().unwrap().to_string())
            .collect();
        assert_eq!(uids, vec!["rincon_a", "rincon_b"]);

        // Members do not cascade
        publisher.publish_full("rincon_b", true).await.unwrap();
        assert_eq!(sink.payloads().len(), 3);
    }

    #[tokio::test]
    async fn forced_coordinator_publish_skips_unchanged_members() {
        let (registry, sink, publisher) = setup();
        let mut a = ZoneEntity::new("rincon_a", "10.0.0.1", "S1");
        a.members = vec!["rincon_b".into()];
        let mut b = ZoneEntity::new("rincon_b", "10.0.0.2", "S1");
        b.coordinator = Some("rincon_a".into());
        registry.insert(a);
        registry.insert(b);

        publisher.publish_full("rincon_a", false).await.unwrap();
        assert_eq!(sink.payloads().len(), 2);

        assert!(publisher.publish_full("rincon_a", true).await.unwrap());
        let uids: Vec<String> = sink
            .payloads()
            .iter()
            .map(|p| p["uid"].as_str().unwrap().to_string())
            .collect();
        assert_eq!(uids, vec!["rincon_a", "rincon_b", "rincon_a"]);

        registry.with_zone("rincon_b", |z| z.set_volume(12));
        publisher.publish_full("rincon_a", true).await.unwrap();
        assert_eq!(sink.payloads_for("rincon_b").len(), 2);
    }

    #[tokio::test]
    async fn unknown_zone_is_rejected() {
        let (_, _, publisher) = setup();
        assert!(matches!(
            publisher.publish_dirty("rincon_x").await,
            Err(PublishError::UnknownZone(_))
        ));
    }
}

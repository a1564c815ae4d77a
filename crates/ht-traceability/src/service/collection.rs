//! Collection recording and bare status transitions.

use super::TraceabilityService;
use crate::domain::{
    check_geofence, check_harvest_month, Batch, BatchEvent, BatchStatus, CollectionEvent,
    TraceError,
};
use crate::ports::inbound::CollectionRequest;
use crate::store::AppliedKey;
use shared_types::{LedgerRecord, RecordKind};
use tracing::info;

fn validate_collection(req: &CollectionRequest) -> Result<(), TraceError> {
    if req.collection_id.trim().is_empty() || req.batch_id.trim().is_empty() {
        return Err(TraceError::validation("collection and batch ids required"));
    }
    if req.collector_id.trim().is_empty() {
        return Err(TraceError::validation("collector_id required"));
    }
    if req.species.trim().is_empty() {
        return Err(TraceError::validation("species required"));
    }
    if req.idempotency_key.trim().is_empty() {
        return Err(TraceError::validation("idempotency_key required"));
    }
    if !req.quantity_kg.is_finite() || req.quantity_kg <= 0.0 {
        return Err(TraceError::validation("quantity_kg must be > 0"));
    }
    if !(-90.0..=90.0).contains(&req.lat) {
        return Err(TraceError::validation("lat must be within -90..=90"));
    }
    if !(-180.0..=180.0).contains(&req.long) {
        return Err(TraceError::validation("long must be within -180..=180"));
    }
    Ok(())
}

impl TraceabilityService {
    pub(super) async fn do_record_collection(
        &self,
        req: CollectionRequest,
    ) -> Result<Batch, TraceError> {
        validate_collection(&req)?;

        let rules = self.registry().require_rules(&req.species)?;
        if let Some(fence) = &rules.geofence {
            check_geofence(fence, req.lat, req.long)?;
        }
        check_harvest_month(&rules, req.timestamp)?;

        let digest = super::request_digest(&req)?;
        let _guard = self.locks().acquire(&req.batch_id).await;
        // Checked under the lock: a replayed key resolves to the batch the
        // first call created, even when the calls race.
        if let Some(AppliedKey::Batch(batch_id)) =
            self.check_replay(&req.idempotency_key, &digest)?
        {
            return self.store().batch(&batch_id);
        }
        if self.store().batch_exists(&req.batch_id) {
            return Err(TraceError::validation(format!(
                "batch {} already exists",
                req.batch_id
            )));
        }

        let payload = serde_json::json!({
            "collection_id": req.collection_id,
            "batch_id": req.batch_id,
            "collector_id": req.collector_id,
            "lat": req.lat,
            "long": req.long,
            "timestamp": req.timestamp,
            "species": req.species,
            "quantity_kg": req.quantity_kg,
        });
        let receipt = self
            .write_with_retry(LedgerRecord {
                kind: RecordKind::CollectionEvent,
                entity_id: req.batch_id.clone(),
                payload,
                idempotency_key: req.idempotency_key.clone(),
                fingerprint: None,
            })
            .await?;

        let event = CollectionEvent {
            id: req.collection_id.clone(),
            batch_id: req.batch_id.clone(),
            collector_id: req.collector_id.clone(),
            lat: req.lat,
            long: req.long,
            timestamp: req.timestamp,
            species: req.species.clone(),
            quantity_kg: req.quantity_kg,
            receipt,
        };
        info!(
            "[ht] collection {} created batch {} ({} {}kg)",
            event.id, event.batch_id, event.species, event.quantity_kg
        );
        self.store().insert_collection(event.clone());
        self.store()
            .append_events(&req.batch_id, vec![BatchEvent::Collected { event }]);
        self.store().mark_applied(
            &req.idempotency_key,
            AppliedKey::Batch(req.batch_id.clone()),
            digest,
        );
        self.store().batch(&req.batch_id)
    }

    /// Apply a bare status transition with no accompanying child record.
    pub(super) async fn do_transition(
        &self,
        batch_id: &str,
        proposed: BatchStatus,
        idempotency_key: &str,
    ) -> Result<Batch, TraceError> {
        if idempotency_key.trim().is_empty() {
            return Err(TraceError::validation("idempotency_key required"));
        }

        let digest = super::request_digest(&serde_json::json!({
            "batch_id": batch_id,
            "proposed": proposed,
        }))?;
        let _guard = self.locks().acquire(batch_id).await;
        if let Some(AppliedKey::Batch(id)) = self.check_replay(idempotency_key, &digest)? {
            return self.store().batch(&id);
        }
        let batch = self.store().batch(batch_id)?;
        if !batch.status.can_transition_to(proposed) {
            return Err(TraceError::InvalidTransition {
                batch_id: batch_id.to_string(),
                from: batch.status,
                to: proposed,
            });
        }

        let payload = serde_json::json!({
            "batch_id": batch_id,
            "from": batch.status,
            "to": proposed,
        });
        let receipt = self
            .write_with_retry(LedgerRecord {
                kind: RecordKind::StatusTransition,
                entity_id: batch_id.to_string(),
                payload,
                idempotency_key: idempotency_key.to_string(),
                fingerprint: None,
            })
            .await?;

        info!(
            "[ht] batch {batch_id} transition {} -> {}",
            batch.status, proposed
        );
        self.store().append_events(
            batch_id,
            vec![BatchEvent::StatusChanged {
                from: batch.status,
                to: proposed,
                at: self.clock().now(),
                receipt,
            }],
        );
        self.store().mark_applied(
            idempotency_key,
            AppliedKey::Batch(batch_id.to_string()),
            digest,
        );
        self.store().batch(batch_id)
    }
}

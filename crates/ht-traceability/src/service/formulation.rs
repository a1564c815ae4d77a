//! Formulation composer: consume input batches, all-or-nothing.

use super::TraceabilityService;
use crate::domain::{
    check_batch_eligible, check_input_batch_ids, BatchEvent, BatchStatus, Formulation, TraceError,
};
use crate::ports::inbound::FormulationRequest;
use crate::store::AppliedKey;
use shared_types::{LedgerRecord, RecordKind};
use tracing::info;

impl TraceabilityService {
    pub(super) async fn do_create_formulation(
        &self,
        req: FormulationRequest,
    ) -> Result<Formulation, TraceError> {
        if req.formulation_id.trim().is_empty() {
            return Err(TraceError::validation("formulation_id required"));
        }
        if req.manufacturer_id.trim().is_empty() {
            return Err(TraceError::validation("manufacturer_id required"));
        }
        if req.idempotency_key.trim().is_empty() {
            return Err(TraceError::validation("idempotency_key required"));
        }
        req.params.validate()?;
        check_input_batch_ids(&req.input_batch_ids)?;

        // Locks are taken in sorted id order so two formulations over
        // overlapping inputs serialize instead of deadlocking.
        let digest = super::request_digest(&req)?;
        let _guards = self.locks().acquire_many(&req.input_batch_ids).await;
        if let Some(AppliedKey::Formulation(id)) = self.check_replay(&req.idempotency_key, &digest)?
        {
            return self.store().formulation(&id);
        }

        // Every input is checked before any batch is touched; one
        // ineligible batch fails the whole request with nothing consumed.
        let mut inputs = Vec::with_capacity(req.input_batch_ids.len());
        for batch_id in &req.input_batch_ids {
            let batch = self.store().batch(batch_id)?;
            check_batch_eligible(&batch)?;
            inputs.push(batch);
        }

        // The id is claimed before the ledger write so a concurrent create
        // over disjoint inputs cannot slip past the duplicate check while
        // this write is in flight.
        if !self.store().reserve_formulation_id(&req.formulation_id) {
            return Err(TraceError::validation(format!(
                "formulation {} already exists",
                req.formulation_id
            )));
        }

        let timestamp = self.clock().now();
        let payload = serde_json::json!({
            "formulation_id": req.formulation_id,
            "manufacturer_id": req.manufacturer_id,
            "input_batch_ids": req.input_batch_ids,
            "params": req.params,
            "timestamp": timestamp,
        });
        let receipt = match self
            .write_with_retry(LedgerRecord {
                kind: RecordKind::Formulation,
                entity_id: req.formulation_id.clone(),
                payload,
                idempotency_key: req.idempotency_key.clone(),
                fingerprint: None,
            })
            .await
        {
            Ok(receipt) => receipt,
            Err(e) => {
                self.store().release_formulation_id(&req.formulation_id);
                return Err(e);
            }
        };

        let formulation = Formulation {
            id: req.formulation_id.clone(),
            manufacturer_id: req.manufacturer_id.clone(),
            input_batch_ids: req.input_batch_ids.clone(),
            params: req.params.clone(),
            timestamp,
            receipt: receipt.clone(),
        };
        info!(
            "[ht] formulation {} ({:?}) consumed {} batches",
            formulation.id,
            formulation.params.product_type,
            formulation.input_batch_ids.len()
        );
        self.store().insert_formulation(formulation.clone());
        for batch in inputs {
            self.store().append_events(
                &batch.id,
                vec![
                    BatchEvent::Consumed {
                        formulation_id: req.formulation_id.clone(),
                        manufacturer_id: req.manufacturer_id.clone(),
                        at: timestamp,
                    },
                    BatchEvent::StatusChanged {
                        from: batch.status,
                        to: BatchStatus::UsedInFormulation,
                        at: timestamp,
                        receipt: receipt.clone(),
                    },
                ],
            );
        }
        self.store().mark_applied(
            &req.idempotency_key,
            AppliedKey::Formulation(req.formulation_id),
            digest,
        );
        Ok(formulation)
    }
}

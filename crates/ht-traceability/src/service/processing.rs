//! Processing chain: append steps, read the ordered chain.

use super::TraceabilityService;
use crate::domain::{BatchEvent, ProcessingStep, TraceError};
use crate::ports::inbound::AddStepRequest;
use crate::store::AppliedKey;
use shared_types::{LedgerRecord, RecordKind};
use tracing::info;

impl TraceabilityService {
    pub(super) async fn do_add_step(
        &self,
        req: AddStepRequest,
    ) -> Result<ProcessingStep, TraceError> {
        if req.step_id.trim().is_empty() {
            return Err(TraceError::validation("step_id required"));
        }
        if req.facility_id.trim().is_empty() {
            return Err(TraceError::validation("facility_id required"));
        }
        if req.idempotency_key.trim().is_empty() {
            return Err(TraceError::validation("idempotency_key required"));
        }
        req.params.validate()?;

        let digest = super::request_digest(&req)?;
        let _guard = self.locks().acquire(&req.batch_id).await;
        // Checked under the lock so a racing retry replays instead of
        // tripping the duplicate-step rejection.
        if let Some(AppliedKey::Step(step_id)) = self.check_replay(&req.idempotency_key, &digest)? {
            return self.store().step(&step_id);
        }
        let batch = self.store().batch(&req.batch_id)?;
        let resulting = req.params.step_type().resulting_status();
        if !batch.status.can_transition_to(resulting) {
            return Err(TraceError::InvalidTransition {
                batch_id: req.batch_id.clone(),
                from: batch.status,
                to: resulting,
            });
        }
        if self.store().step(&req.step_id).is_ok() {
            return Err(TraceError::validation(format!(
                "step {} already exists",
                req.step_id
            )));
        }

        // The chain is linear: the new step's predecessor is the batch's
        // latest step, or none for the first.
        let predecessor = batch.step_ids.last().cloned();
        let timestamp = self.clock().now();
        let payload = serde_json::json!({
            "step_id": req.step_id,
            "batch_id": req.batch_id,
            "facility_id": req.facility_id,
            "params": req.params,
            "predecessor_step_id": predecessor,
            "timestamp": timestamp,
        });
        let receipt = self
            .write_with_retry(LedgerRecord {
                kind: RecordKind::ProcessingStep,
                entity_id: req.batch_id.clone(),
                payload,
                idempotency_key: req.idempotency_key.clone(),
                fingerprint: None,
            })
            .await?;

        let step = ProcessingStep {
            id: req.step_id.clone(),
            batch_id: req.batch_id.clone(),
            facility_id: req.facility_id.clone(),
            params: req.params.clone(),
            predecessor_step_id: predecessor,
            timestamp,
            receipt: receipt.clone(),
        };
        info!(
            "[ht] step {} ({}) appended to batch {}, now {}",
            step.id,
            step.params.step_type(),
            step.batch_id,
            resulting
        );
        self.store().insert_step(step.clone());
        self.store().append_events(
            &req.batch_id,
            vec![
                BatchEvent::StepLinked {
                    step_id: req.step_id.clone(),
                    facility_id: req.facility_id.clone(),
                    at: timestamp,
                },
                BatchEvent::StatusChanged {
                    from: batch.status,
                    to: resulting,
                    at: timestamp,
                    receipt,
                },
            ],
        );
        self.store()
            .mark_applied(&req.idempotency_key, AppliedKey::Step(req.step_id), digest);
        Ok(step)
    }

    /// The ordered chain, oldest first, reconstructed over predecessor
    /// links. Append order and link order agree; the links are the source
    /// of truth.
    pub(super) fn do_processing_chain(
        &self,
        batch_id: &str,
    ) -> Result<Vec<ProcessingStep>, TraceError> {
        let batch = self.store().batch(batch_id)?;
        let mut chain = Vec::with_capacity(batch.step_ids.len());
        for step_id in &batch.step_ids {
            let step = self.store().step(step_id)?;
            let expected = chain.last().map(|prev: &ProcessingStep| prev.id.clone());
            if step.predecessor_step_id != expected {
                return Err(TraceError::validation(format!(
                    "broken step chain at {step_id} for batch {batch_id}"
                )));
            }
            chain.push(step);
        }
        Ok(chain)
    }
}

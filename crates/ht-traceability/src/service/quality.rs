//! Quality gate: record tests, derive verdicts, check record integrity.

use super::TraceabilityService;
use crate::domain::{BatchEvent, BatchStatus, QualityTest, TraceError, Verdict};
use crate::ports::inbound::{AddTestRequest, IntegrityReport};
use crate::store::AppliedKey;
use serde::Serialize;
use sha2::{Digest, Sha256};
use shared_types::{LedgerRecord, RecordKind};
use tracing::{info, warn};

/// The canonical fields a test fingerprint covers. Receipts are excluded:
/// the fingerprint must be computable before the ledger write.
#[derive(Serialize)]
struct FingerprintInput<'a> {
    test_id: &'a str,
    batch_id: &'a str,
    lab_id: &'a str,
    results: &'a crate::domain::TestResults,
    verdict: Verdict,
    reasons: &'a [String],
    timestamp: u64,
}

fn fingerprint(input: &FingerprintInput<'_>) -> Result<String, TraceError> {
    let canonical = serde_json::to_vec(input)
        .map_err(|e| TraceError::validation(format!("unserializable test record: {e}")))?;
    Ok(hex::encode(Sha256::digest(&canonical)))
}

impl TraceabilityService {
    pub(super) async fn do_add_quality_test(
        &self,
        req: AddTestRequest,
    ) -> Result<QualityTest, TraceError> {
        if req.test_id.trim().is_empty() {
            return Err(TraceError::validation("test_id required"));
        }
        if req.lab_id.trim().is_empty() {
            return Err(TraceError::validation("lab_id required"));
        }
        if req.idempotency_key.trim().is_empty() {
            return Err(TraceError::validation("idempotency_key required"));
        }
        req.results.validate()?;

        let digest = super::request_digest(&req)?;
        let _guard = self.locks().acquire(&req.batch_id).await;
        if let Some(AppliedKey::Test(test_id)) = self.check_replay(&req.idempotency_key, &digest)? {
            return self.store().test(&test_id);
        }
        let batch = self.store().batch(&req.batch_id)?;
        if self.store().test(&req.test_id).is_ok() {
            return Err(TraceError::validation(format!(
                "test {} already exists",
                req.test_id
            )));
        }

        // Verdict is pure: (results, species thresholds) and nothing else.
        let thresholds = self.registry().require_thresholds(&batch.species)?;
        let outcome = req.results.evaluate(&thresholds);

        // A passing test on an already quality-tested batch records without
        // transitioning; everything else must be a legal move.
        let target = match outcome.verdict {
            Verdict::Pass => BatchStatus::QualityTested,
            Verdict::Fail => BatchStatus::QualityFail,
        };
        let transitions = if outcome.verdict == Verdict::Pass && batch.status == target {
            false
        } else if batch.status.can_transition_to(target) {
            true
        } else {
            return Err(TraceError::InvalidTransition {
                batch_id: req.batch_id.clone(),
                from: batch.status,
                to: target,
            });
        };

        let timestamp = self.clock().now();
        let fingerprint = fingerprint(&FingerprintInput {
            test_id: &req.test_id,
            batch_id: &req.batch_id,
            lab_id: &req.lab_id,
            results: &req.results,
            verdict: outcome.verdict,
            reasons: &outcome.reasons,
            timestamp,
        })?;

        let payload = serde_json::json!({
            "test_id": req.test_id,
            "batch_id": req.batch_id,
            "lab_id": req.lab_id,
            "results": req.results,
            "verdict": outcome.verdict,
            "reasons": outcome.reasons,
            "timestamp": timestamp,
        });
        let receipt = self
            .write_with_retry(LedgerRecord {
                kind: RecordKind::QualityTest,
                entity_id: req.batch_id.clone(),
                payload,
                idempotency_key: req.idempotency_key.clone(),
                fingerprint: Some(fingerprint.clone()),
            })
            .await?;

        let test = QualityTest {
            id: req.test_id.clone(),
            batch_id: req.batch_id.clone(),
            lab_id: req.lab_id.clone(),
            results: req.results.clone(),
            verdict: outcome.verdict,
            reasons: outcome.reasons.clone(),
            timestamp,
            fingerprint,
            receipt: receipt.clone(),
        };
        info!(
            "[ht] test {} on batch {}: {:?} ({})",
            test.id,
            test.batch_id,
            test.verdict,
            test.reasons.join("; ")
        );

        let mut events = vec![BatchEvent::TestRecorded {
            test_id: req.test_id.clone(),
            verdict: outcome.verdict,
            at: timestamp,
        }];
        if transitions {
            events.push(BatchEvent::StatusChanged {
                from: batch.status,
                to: target,
                at: timestamp,
                receipt,
            });
        }
        self.store().insert_test(test.clone());
        self.store().append_events(&req.batch_id, events);
        self.store()
            .mark_applied(&req.idempotency_key, AppliedKey::Test(req.test_id), digest);
        Ok(test)
    }

    /// Recompute a stored test's fingerprint and compare it against the
    /// ledger record. Mismatches are reported, never repaired.
    pub(super) async fn do_validate_integrity(
        &self,
        test_id: &str,
    ) -> Result<IntegrityReport, TraceError> {
        let test = self.store().test(test_id)?;
        let recomputed = fingerprint(&FingerprintInput {
            test_id: &test.id,
            batch_id: &test.batch_id,
            lab_id: &test.lab_id,
            results: &test.results,
            verdict: test.verdict,
            reasons: &test.reasons,
            timestamp: test.timestamp,
        })?;

        let ledger_fingerprint = self
            .ledger()
            .read(&test.receipt.tx_id)
            .await?
            .and_then(|record| record.fingerprint);

        let detail = match &ledger_fingerprint {
            None => Some("ledger record or its fingerprint is missing".to_string()),
            Some(anchored) if *anchored != recomputed => Some(format!(
                "stored record hashes to {recomputed}, ledger anchors {anchored}"
            )),
            Some(_) => None,
        };
        if let Some(detail) = &detail {
            warn!("[ht] integrity mismatch for test {test_id}: {detail}");
        }
        Ok(IntegrityReport {
            test_id: test.id,
            matches: detail.is_none(),
            detail,
        })
    }
}

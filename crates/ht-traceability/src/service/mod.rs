//! # Traceability Services
//!
//! Orchestration over the domain: validate, write to the ledger, then
//! commit to the store. The ledger write always comes first; on failure the
//! in-process state is untouched, so there is nothing to roll back.

mod collection;
mod formulation;
mod processing;
mod provenance;
mod qr;
mod quality;

use crate::domain::{
    Batch, BatchStatus, ConsumerView, Formulation, ProcessingStep, ProvenanceBundle, QrToken,
    QualityTest, TraceError,
};
use crate::ports::inbound::{
    AddStepRequest, AddTestRequest, CollectionRequest, FormulationRequest, IntegrityReport,
    TraceabilityApi,
};
use crate::ports::outbound::{HerbRegistry, LedgerAdapter, TimeSource};
use crate::store::{AppliedKey, LockManager, TraceStore};
use async_trait::async_trait;
use serde::Serialize;
use sha2::{Digest, Sha256};
use shared_types::{EntityRef, LedgerReceipt, LedgerRecord};
use std::sync::Arc;
use std::time::Duration;
use tracing::warn;

/// Ledger write attempts before giving up.
pub const LEDGER_WRITE_ATTEMPTS: u32 = 3;
/// Per-attempt ledger write timeout.
pub const LEDGER_WRITE_TIMEOUT: Duration = Duration::from_secs(2);
/// Pause between failed attempts.
pub const LEDGER_RETRY_BACKOFF: Duration = Duration::from_millis(50);

/// SHA-256 (hex) over a request's canonical JSON form. Stored beside the
/// idempotency key so a replay can be told apart from key reuse.
pub(crate) fn request_digest<T: Serialize>(req: &T) -> Result<String, TraceError> {
    let bytes = serde_json::to_vec(req)
        .map_err(|e| TraceError::validation(format!("unserializable request: {e}")))?;
    Ok(hex::encode(Sha256::digest(&bytes)))
}

/// The traceability core, wired by dependency injection.
pub struct TraceabilityService {
    ledger: Arc<dyn LedgerAdapter>,
    registry: Arc<dyn HerbRegistry>,
    clock: Arc<dyn TimeSource>,
    store: TraceStore,
    locks: LockManager,
}

impl TraceabilityService {
    /// Wire the core against its outbound ports, starting empty.
    pub fn new(
        ledger: Arc<dyn LedgerAdapter>,
        registry: Arc<dyn HerbRegistry>,
        clock: Arc<dyn TimeSource>,
    ) -> Self {
        Self {
            ledger,
            registry,
            clock,
            store: TraceStore::new(),
            locks: LockManager::new(),
        }
    }

    pub(crate) fn ledger(&self) -> &dyn LedgerAdapter {
        self.ledger.as_ref()
    }

    pub(crate) fn registry(&self) -> &dyn HerbRegistry {
        self.registry.as_ref()
    }

    pub(crate) fn clock(&self) -> &dyn TimeSource {
        self.clock.as_ref()
    }

    pub(crate) fn store(&self) -> &TraceStore {
        &self.store
    }

    pub(crate) fn locks(&self) -> &LockManager {
        &self.locks
    }

    /// Resolve an idempotency key against the replay index. Returns what
    /// the key produced when the request matches the original; a key reused
    /// with a different request body is rejected outright.
    pub(crate) fn check_replay(
        &self,
        key: &str,
        digest: &str,
    ) -> Result<Option<AppliedKey>, TraceError> {
        match self.store.applied(key) {
            None => Ok(None),
            Some(record) if record.request_digest == digest => Ok(Some(record.outcome)),
            Some(_) => Err(TraceError::validation(format!(
                "idempotency key '{key}' was already used by a different request"
            ))),
        }
    }

    /// Write to the ledger with a bounded per-attempt timeout and capped
    /// retries. The record's idempotency key makes retries safe: a write
    /// that committed but timed out on the reply resolves to the original
    /// receipt on the next attempt.
    pub(crate) async fn write_with_retry(
        &self,
        record: LedgerRecord,
    ) -> Result<LedgerReceipt, TraceError> {
        for attempt in 1..=LEDGER_WRITE_ATTEMPTS {
            match tokio::time::timeout(LEDGER_WRITE_TIMEOUT, self.ledger.write(record.clone()))
                .await
            {
                Ok(Ok(receipt)) => return Ok(receipt),
                Ok(Err(TraceError::LedgerUnavailable { detail })) => {
                    warn!(
                        "[ht] ledger write attempt {attempt}/{LEDGER_WRITE_ATTEMPTS} failed: {detail}"
                    );
                }
                Ok(Err(other)) => return Err(other),
                Err(_) => {
                    warn!("[ht] ledger write attempt {attempt}/{LEDGER_WRITE_ATTEMPTS} timed out");
                }
            }
            if attempt < LEDGER_WRITE_ATTEMPTS {
                tokio::time::sleep(LEDGER_RETRY_BACKOFF).await;
            }
        }
        Err(TraceError::LedgerWriteFailed {
            attempts: LEDGER_WRITE_ATTEMPTS,
        })
    }
}

#[async_trait]
impl TraceabilityApi for TraceabilityService {
    async fn record_collection(&self, req: CollectionRequest) -> Result<Batch, TraceError> {
        self.do_record_collection(req).await
    }

    async fn batch(&self, batch_id: &str) -> Result<Batch, TraceError> {
        self.store.batch(batch_id)
    }

    fn valid_transitions(&self, status: BatchStatus) -> Vec<BatchStatus> {
        status.valid_transitions()
    }

    async fn transition(
        &self,
        batch_id: &str,
        proposed: BatchStatus,
        idempotency_key: &str,
    ) -> Result<Batch, TraceError> {
        self.do_transition(batch_id, proposed, idempotency_key).await
    }

    async fn add_step(&self, req: AddStepRequest) -> Result<ProcessingStep, TraceError> {
        self.do_add_step(req).await
    }

    async fn processing_chain(&self, batch_id: &str) -> Result<Vec<ProcessingStep>, TraceError> {
        self.do_processing_chain(batch_id)
    }

    async fn add_quality_test(&self, req: AddTestRequest) -> Result<QualityTest, TraceError> {
        self.do_add_quality_test(req).await
    }

    async fn validate_integrity(&self, test_id: &str) -> Result<IntegrityReport, TraceError> {
        self.do_validate_integrity(test_id).await
    }

    async fn create_formulation(
        &self,
        req: FormulationRequest,
    ) -> Result<Formulation, TraceError> {
        self.do_create_formulation(req).await
    }

    async fn build_provenance(&self, entity: &EntityRef) -> Result<ProvenanceBundle, TraceError> {
        self.do_build_provenance(entity)
    }

    async fn generate_token(&self, entity: EntityRef) -> Result<QrToken, TraceError> {
        self.do_generate_token(entity).await
    }

    async fn resolve_token(&self, token: &str) -> Result<ConsumerView, TraceError> {
        self.do_resolve_token(token)
    }

    async fn revoke_token(&self, token: &str) -> Result<(), TraceError> {
        self.do_revoke_token(token).await
    }
}

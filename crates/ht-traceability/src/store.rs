//! # Trace Store
//!
//! In-process state behind the services: append-only batch event logs plus
//! lookup maps for child records. Writes happen only after a ledger receipt
//! is in hand, so readers never see a half-applied mutation.
//!
//! `LockManager` provides per-batch async locks; multi-batch operations
//! acquire their locks in sorted id order so two overlapping formulations
//! can never deadlock.

use crate::domain::{
    Batch, BatchEvent, CollectionEvent, Formulation, ProcessingStep, QrToken, QualityTest,
    TraceError,
};
use parking_lot::{Mutex, RwLock};
use shared_types::{BatchId, CollectionId, EntityRef, FormulationId, StepId, TestId};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::OwnedMutexGuard;

/// What a previously applied idempotency key produced. Replayed requests
/// resolve through this instead of mutating again.
#[derive(Clone, Debug, PartialEq)]
pub enum AppliedKey {
    /// The key created (or transitioned) a batch.
    Batch(BatchId),
    /// The key appended a processing step.
    Step(StepId),
    /// The key recorded a quality test.
    Test(TestId),
    /// The key created a formulation.
    Formulation(FormulationId),
}

/// An applied idempotency key: what it produced plus a digest of the
/// request that produced it. A replay must present the same request;
/// the same key with a different body is a caller error, not a replay.
#[derive(Clone, Debug, PartialEq)]
pub struct AppliedRecord {
    /// Entity the original call created.
    pub outcome: AppliedKey,
    /// SHA-256 (hex) of the original request body.
    pub request_digest: String,
}

/// All mutable traceability state.
#[derive(Default)]
pub struct TraceStore {
    /// Append-only event log per batch; the projection is rebuilt by fold.
    batch_events: RwLock<HashMap<BatchId, Vec<BatchEvent>>>,
    collections: RwLock<HashMap<CollectionId, CollectionEvent>>,
    steps: RwLock<HashMap<StepId, ProcessingStep>>,
    tests: RwLock<HashMap<TestId, QualityTest>>,
    formulations: RwLock<HashMap<FormulationId, Formulation>>,
    /// Token string -> token record (revoked ones included).
    tokens: RwLock<HashMap<String, QrToken>>,
    /// Unique index: entity -> its live (non-revoked) token.
    token_by_entity: RwLock<HashMap<EntityRef, String>>,
    /// Idempotency keys already applied, with what they produced.
    applied: RwLock<HashMap<String, AppliedRecord>>,
    /// Formulation ids claimed by in-flight creates. Reserving before the
    /// ledger write closes the window in which two concurrent creates with
    /// the same id could both pass the duplicate check.
    reserved_formulations: Mutex<HashSet<FormulationId>>,
}

impl TraceStore {
    /// Empty store.
    pub fn new() -> Self {
        Self::default()
    }

    // === Batches ===

    /// Current projection of a batch.
    pub fn batch(&self, batch_id: &str) -> Result<Batch, TraceError> {
        let logs = self.batch_events.read();
        let events = logs
            .get(batch_id)
            .ok_or_else(|| TraceError::not_found("batch", batch_id))?;
        Batch::replay(events).ok_or_else(|| TraceError::not_found("batch", batch_id))
    }

    /// Whether a batch with this id exists.
    pub fn batch_exists(&self, batch_id: &str) -> bool {
        self.batch_events.read().contains_key(batch_id)
    }

    /// Append events to a batch's log. The first append must begin with
    /// `Collected`; later appends extend an existing log.
    pub fn append_events(&self, batch_id: &str, events: Vec<BatchEvent>) {
        self.batch_events
            .write()
            .entry(batch_id.to_string())
            .or_default()
            .extend(events);
    }

    // === Child records ===

    /// Store a collection event.
    pub fn insert_collection(&self, event: CollectionEvent) {
        self.collections.write().insert(event.id.clone(), event);
    }

    /// Look up a collection event.
    pub fn collection(&self, id: &str) -> Result<CollectionEvent, TraceError> {
        self.collections
            .read()
            .get(id)
            .cloned()
            .ok_or_else(|| TraceError::not_found("collection", id))
    }

    /// Store a processing step.
    pub fn insert_step(&self, step: ProcessingStep) {
        self.steps.write().insert(step.id.clone(), step);
    }

    /// Look up a processing step.
    pub fn step(&self, id: &str) -> Result<ProcessingStep, TraceError> {
        self.steps
            .read()
            .get(id)
            .cloned()
            .ok_or_else(|| TraceError::not_found("step", id))
    }

    /// Store a quality test.
    pub fn insert_test(&self, test: QualityTest) {
        self.tests.write().insert(test.id.clone(), test);
    }

    /// Look up a quality test.
    pub fn test(&self, id: &str) -> Result<QualityTest, TraceError> {
        self.tests
            .read()
            .get(id)
            .cloned()
            .ok_or_else(|| TraceError::not_found("test", id))
    }

    /// Reserve a formulation id ahead of its ledger write. Returns false
    /// when the id is already committed or claimed by an in-flight create.
    pub fn reserve_formulation_id(&self, id: &str) -> bool {
        let mut reserved = self.reserved_formulations.lock();
        if reserved.contains(id) || self.formulations.read().contains_key(id) {
            return false;
        }
        reserved.insert(id.to_string());
        true
    }

    /// Drop a reservation whose ledger write failed.
    pub fn release_formulation_id(&self, id: &str) {
        self.reserved_formulations.lock().remove(id);
    }

    /// Store a formulation, consuming its reservation.
    pub fn insert_formulation(&self, formulation: Formulation) {
        let id = formulation.id.clone();
        let mut reserved = self.reserved_formulations.lock();
        self.formulations.write().insert(id.clone(), formulation);
        reserved.remove(&id);
    }

    /// Look up a formulation.
    pub fn formulation(&self, id: &str) -> Result<Formulation, TraceError> {
        self.formulations
            .read()
            .get(id)
            .cloned()
            .ok_or_else(|| TraceError::not_found("formulation", id))
    }

    // === Tokens ===

    /// Store a freshly minted token and index it as the entity's live token.
    pub fn insert_token(&self, token: QrToken) {
        self.token_by_entity
            .write()
            .insert(token.bound.clone(), token.token.clone());
        self.tokens.write().insert(token.token.clone(), token);
    }

    /// Look up a token record, revoked ones included.
    pub fn token(&self, token: &str) -> Option<QrToken> {
        self.tokens.read().get(token).cloned()
    }

    /// The live token for an entity, if one was minted and not revoked.
    pub fn live_token_for(&self, entity: &EntityRef) -> Option<QrToken> {
        let token = self.token_by_entity.read().get(entity).cloned()?;
        self.tokens
            .read()
            .get(&token)
            .filter(|t| !t.revoked)
            .cloned()
    }

    /// Mark a token revoked and drop it from the live index.
    pub fn revoke_token(&self, token: &str) -> Result<(), TraceError> {
        let mut tokens = self.tokens.write();
        let record = tokens.get_mut(token).ok_or(TraceError::TokenNotFound)?;
        if record.revoked {
            return Err(TraceError::TokenRevoked);
        }
        record.revoked = true;
        self.token_by_entity.write().remove(&record.bound);
        Ok(())
    }

    // === Idempotency ===

    /// What a key previously produced, if anything.
    pub fn applied(&self, key: &str) -> Option<AppliedRecord> {
        self.applied.read().get(key).cloned()
    }

    /// Record a key as applied. Called only after the commit it covers.
    pub fn mark_applied(&self, key: &str, outcome: AppliedKey, request_digest: String) {
        self.applied.write().insert(
            key.to_string(),
            AppliedRecord {
                outcome,
                request_digest,
            },
        );
    }
}

/// Per-batch async locks. Guards are owned so they can be held across await
/// points while the ledger write is in flight.
#[derive(Default)]
pub struct LockManager {
    locks: Mutex<HashMap<BatchId, Arc<tokio::sync::Mutex<()>>>>,
}

impl LockManager {
    /// Empty lock table.
    pub fn new() -> Self {
        Self::default()
    }

    fn lock_for(&self, batch_id: &str) -> Arc<tokio::sync::Mutex<()>> {
        self.locks
            .lock()
            .entry(batch_id.to_string())
            .or_insert_with(|| Arc::new(tokio::sync::Mutex::new(())))
            .clone()
    }

    /// Acquire the lock for one batch.
    pub async fn acquire(&self, batch_id: &str) -> OwnedMutexGuard<()> {
        self.lock_for(batch_id).lock_owned().await
    }

    /// Acquire locks for several batches, in sorted id order.
    pub async fn acquire_many(&self, batch_ids: &[BatchId]) -> Vec<OwnedMutexGuard<()>> {
        let mut sorted: Vec<&BatchId> = batch_ids.iter().collect();
        sorted.sort();
        sorted.dedup();
        let mut guards = Vec::with_capacity(sorted.len());
        for id in sorted {
            guards.push(self.lock_for(id).lock_owned().await);
        }
        guards
    }
}

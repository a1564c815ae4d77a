//! # Inbound Ports
//!
//! The API surface the (out-of-scope) HTTP layer consumes: plain method
//! calls, each returning a typed result or a typed error. No HTTP, auth, or
//! serialization concerns cross this boundary.

use crate::domain::{
    Batch, BatchStatus, ConsumerView, Formulation, FormulationParams, ProcessingStep,
    ProvenanceBundle, QrToken, QualityTest, StepParams, TestResults, TraceError,
};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use shared_types::{BatchId, CollectionId, EntityRef, ParticipantId, Species, TestId, Timestamp};

/// Request to record a field collection and create its batch.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CollectionRequest {
    /// New collection event id.
    pub collection_id: CollectionId,
    /// New batch id.
    pub batch_id: BatchId,
    /// Collector performing the harvest.
    pub collector_id: ParticipantId,
    /// Collection latitude, degrees.
    pub lat: f64,
    /// Collection longitude, degrees.
    pub long: f64,
    /// When the material was collected.
    pub timestamp: Timestamp,
    /// Species collected.
    pub species: Species,
    /// Quantity in kilograms.
    pub quantity_kg: f64,
    /// Deduplication key for ledger retries.
    pub idempotency_key: String,
}

/// Request to append a processing step to a batch's chain.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AddStepRequest {
    /// New step id.
    pub step_id: String,
    /// Batch to extend.
    pub batch_id: BatchId,
    /// Facility performing the step.
    pub facility_id: ParticipantId,
    /// Tagged step parameters; the step type is derived from the tag.
    pub params: StepParams,
    /// Deduplication key: a retried call cannot create a duplicate step.
    pub idempotency_key: String,
}

/// Request to record a quality test against a batch.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AddTestRequest {
    /// New test id.
    pub test_id: TestId,
    /// Batch tested.
    pub batch_id: BatchId,
    /// Laboratory that ran the test.
    pub lab_id: ParticipantId,
    /// Tagged measurement results; the test type is derived from the tag.
    pub results: TestResults,
    /// Deduplication key for ledger retries.
    pub idempotency_key: String,
}

/// Request to compose input batches into a formulation.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FormulationRequest {
    /// New formulation (product batch) id.
    pub formulation_id: String,
    /// Manufacturer composing the product.
    pub manufacturer_id: ParticipantId,
    /// Input batches, 1..=10, distinct, each consumed exactly once.
    pub input_batch_ids: Vec<BatchId>,
    /// Product parameters.
    pub params: FormulationParams,
    /// Deduplication key for ledger retries.
    pub idempotency_key: String,
}

/// Result of recomputing a stored test's fingerprint against its ledger
/// record. A mismatch is reported, never silently repaired.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct IntegrityReport {
    /// The test checked.
    pub test_id: TestId,
    /// True when the stored record still matches its ledger fingerprint.
    pub matches: bool,
    /// Mismatch detail when `matches` is false.
    pub detail: Option<String>,
}

/// Primary API for traceability operations.
#[async_trait]
pub trait TraceabilityApi: Send + Sync {
    // === Collection ===

    /// Record a field collection, creating its batch at `collected`.
    async fn record_collection(&self, req: CollectionRequest) -> Result<Batch, TraceError>;

    // === Batch state machine ===

    /// Current projection of a batch.
    async fn batch(&self, batch_id: &str) -> Result<Batch, TraceError>;

    /// Pure lookup of the statuses reachable from `status`.
    fn valid_transitions(&self, status: BatchStatus) -> Vec<BatchStatus>;

    /// Apply a bare status transition. On failure the state is untouched.
    async fn transition(
        &self,
        batch_id: &str,
        proposed: BatchStatus,
        idempotency_key: &str,
    ) -> Result<Batch, TraceError>;

    // === Processing chain ===

    /// Append a processing step and move the batch to `processed-*`.
    async fn add_step(&self, req: AddStepRequest) -> Result<ProcessingStep, TraceError>;

    /// The ordered (oldest-first) step chain for a batch.
    async fn processing_chain(&self, batch_id: &str) -> Result<Vec<ProcessingStep>, TraceError>;

    // === Quality gate ===

    /// Record a quality test; its verdict drives the state machine.
    async fn add_quality_test(&self, req: AddTestRequest) -> Result<QualityTest, TraceError>;

    /// Recompute a stored test's fingerprint against its ledger record.
    async fn validate_integrity(&self, test_id: &str) -> Result<IntegrityReport, TraceError>;

    // === Formulation ===

    /// Consume eligible batches into a formulation, all-or-nothing.
    async fn create_formulation(&self, req: FormulationRequest)
        -> Result<Formulation, TraceError>;

    // === Provenance (read path) ===

    /// Reconstruct the full lineage DAG for a batch or formulation.
    async fn build_provenance(&self, entity: &EntityRef) -> Result<ProvenanceBundle, TraceError>;

    // === QR tokens (public read path) ===

    /// Mint (or return the existing) public token for an entity.
    async fn generate_token(&self, entity: EntityRef) -> Result<QrToken, TraceError>;

    /// Resolve a token to the consumer-safe provenance view.
    async fn resolve_token(&self, token: &str) -> Result<ConsumerView, TraceError>;

    /// Revoke a token; a later `generate_token` mints a fresh one.
    async fn revoke_token(&self, token: &str) -> Result<(), TraceError>;
}

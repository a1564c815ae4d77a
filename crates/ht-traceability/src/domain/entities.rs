//! # Domain Entities
//!
//! Records created once and only ever extended by new child records or
//! status events. The `Batch` struct here is a projection rebuilt by folding
//! its event log (see `events.rs`), never an independently mutated row.

use super::value_objects::{
    BatchStatus, FormulationParams, QualityThresholds, StepParams, TestResults, Verdict,
};
use serde::{Deserialize, Serialize};
use shared_types::{
    BatchId, CollectionId, EntityRef, FormulationId, LedgerReceipt, ParticipantId, Species,
    StepId, TestId, Timestamp,
};

/// Circular harvest zone for a species.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Geofence {
    /// Zone center latitude, degrees.
    pub center_lat: f64,
    /// Zone center longitude, degrees.
    pub center_long: f64,
    /// Zone radius in meters.
    pub radius_meters: f64,
}

/// Herb Registry entry: reference data consumed, never mutated, by this core.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SpeciesRules {
    /// Botanical species name.
    pub species: Species,
    /// Where collection is permitted, if geographically constrained.
    pub geofence: Option<Geofence>,
    /// Calendar months (1-12) in which harvest is permitted. Empty means
    /// year-round.
    pub allowed_months: Vec<u32>,
    /// Quality thresholds applied by the quality gate.
    pub thresholds: QualityThresholds,
}

/// A field collection event. 1:1 with the batch it creates.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CollectionEvent {
    /// Collection event id.
    pub id: CollectionId,
    /// Batch created by this collection.
    pub batch_id: BatchId,
    /// Collector (farmer/wildcrafter) id.
    pub collector_id: ParticipantId,
    /// Collection latitude, degrees.
    pub lat: f64,
    /// Collection longitude, degrees.
    pub long: f64,
    /// When the material was collected.
    pub timestamp: Timestamp,
    /// Species collected.
    pub species: Species,
    /// Collected quantity in kilograms.
    pub quantity_kg: f64,
    /// Ledger receipt for the collection record.
    pub receipt: LedgerReceipt,
}

/// Current state of a batch, derived by folding its event log.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Batch {
    /// Batch id.
    pub id: BatchId,
    /// Species collected.
    pub species: Species,
    /// Quantity in kilograms.
    pub quantity_kg: f64,
    /// Original collector.
    pub collector_id: ParticipantId,
    /// Current custodian (collector, then facility, then manufacturer).
    pub current_owner_id: ParticipantId,
    /// Current lifecycle status.
    pub status: BatchStatus,
    /// The collection event that created this batch.
    pub collection_event_id: CollectionId,
    /// Ordered processing step ids, oldest first.
    pub step_ids: Vec<StepId>,
    /// Quality test ids in recording order.
    pub test_ids: Vec<TestId>,
    /// Ledger receipts for every mutation, in order.
    pub receipts: Vec<LedgerReceipt>,
    /// Set once the batch is consumed. Forward-only adjacency; the
    /// formulation holds the reverse edge.
    pub consumed_in: Option<FormulationId>,
}

impl Batch {
    /// Reference to this batch for QR binding and provenance roots.
    pub fn entity_ref(&self) -> EntityRef {
        EntityRef::Batch(self.id.clone())
    }
}

/// One processing step in a batch's chain of custody.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ProcessingStep {
    /// Step id.
    pub id: StepId,
    /// Batch this step belongs to.
    pub batch_id: BatchId,
    /// Facility that performed the step.
    pub facility_id: ParticipantId,
    /// Tagged, type-checked parameters.
    pub params: StepParams,
    /// Previous step in this batch's chain; `None` for the first step.
    pub predecessor_step_id: Option<StepId>,
    /// When the step was recorded.
    pub timestamp: Timestamp,
    /// Ledger receipt.
    pub receipt: LedgerReceipt,
}

/// A laboratory quality test with its derived verdict.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct QualityTest {
    /// Test id.
    pub id: TestId,
    /// Batch tested.
    pub batch_id: BatchId,
    /// Laboratory that ran the test.
    pub lab_id: ParticipantId,
    /// Tagged measurement results.
    pub results: TestResults,
    /// Verdict derived from (results, species thresholds). Pure.
    pub verdict: Verdict,
    /// Threshold comparisons behind the verdict.
    pub reasons: Vec<String>,
    /// When the test was recorded.
    pub timestamp: Timestamp,
    /// SHA-256 (hex) over the canonical test fields, mirrored into the
    /// ledger record for tamper detection.
    pub fingerprint: String,
    /// Ledger receipt.
    pub receipt: LedgerReceipt,
}

/// A manufactured product batch composed from consumed input batches.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Formulation {
    /// Formulation (product batch) id.
    pub id: FormulationId,
    /// Manufacturer id.
    pub manufacturer_id: ParticipantId,
    /// Input batches, each consumed exactly once, in caller order.
    pub input_batch_ids: Vec<BatchId>,
    /// Product parameters.
    pub params: FormulationParams,
    /// When the formulation was created.
    pub timestamp: Timestamp,
    /// Ledger receipt.
    pub receipt: LedgerReceipt,
}

impl Formulation {
    /// Reference to this formulation for QR binding and provenance roots.
    pub fn entity_ref(&self) -> EntityRef {
        EntityRef::Formulation(self.id.clone())
    }
}

/// An opaque public lookup token bound to a batch or formulation.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct QrToken {
    /// The unguessable token string.
    pub token: String,
    /// Entity this token resolves to.
    pub bound: EntityRef,
    /// When the token was minted.
    pub minted_at: Timestamp,
    /// Revoked tokens no longer resolve; a new mint replaces them.
    pub revoked: bool,
    /// Ledger receipt for the mint.
    pub receipt: LedgerReceipt,
}

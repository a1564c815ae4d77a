//! # Provenance Lineage
//!
//! The reconstructed lineage of a batch or formulation. The shape is a DAG:
//! a formulation fans out to several batch chains, each linear. Adjacency is
//! one-directional (formulation -> input batches; a batch only carries the id
//! of the formulation that consumed it), so ownership stays single-directional
//! and serialization is trivial.

use super::entities::{Batch, CollectionEvent, Formulation, ProcessingStep, QualityTest};
use super::value_objects::{BatchStatus, ProductType, StepType, TestType, Verdict};
use serde::{Deserialize, Serialize};
use shared_types::{EntityRef, Timestamp};

/// Aggregate quality standing of a batch.
///
/// `Pending` is an explicit, non-error representation of "no test yet".
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QualityStatus {
    /// No quality test recorded yet.
    Pending,
    /// Every recorded test passed.
    Passed,
    /// At least one recorded test failed.
    Failed,
}

impl QualityStatus {
    /// Derive the aggregate standing from recorded tests.
    pub fn derive(tests: &[QualityTest]) -> Self {
        if tests.is_empty() {
            QualityStatus::Pending
        } else if tests.iter().any(|t| t.verdict == Verdict::Fail) {
            QualityStatus::Failed
        } else {
            QualityStatus::Passed
        }
    }
}

/// Full lineage of one batch: collection, ordered steps, tests.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BatchProvenance {
    /// The batch projection, receipts included.
    pub batch: Batch,
    /// The collection event that created the batch.
    pub collection: CollectionEvent,
    /// Processing steps, oldest first, by predecessor links.
    pub steps: Vec<ProcessingStep>,
    /// Quality tests, chronological.
    pub tests: Vec<QualityTest>,
    /// Aggregate quality standing.
    pub quality: QualityStatus,
}

/// Full lineage of a formulation: the formulation plus every input batch
/// chain, expanded.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FormulationProvenance {
    /// The formulation record, receipt included.
    pub formulation: Formulation,
    /// Input batch lineages, in the formulation's input order.
    pub inputs: Vec<BatchProvenance>,
}

/// A provenance query result, rooted at a batch or a formulation.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ProvenanceBundle {
    /// Rooted at a single batch.
    Batch(BatchProvenance),
    /// Rooted at a formulation, fanning out to its inputs.
    Formulation(FormulationProvenance),
}

impl ProvenanceBundle {
    /// The entity this bundle is rooted at.
    pub fn root(&self) -> EntityRef {
        match self {
            ProvenanceBundle::Batch(b) => EntityRef::Batch(b.batch.id.clone()),
            ProvenanceBundle::Formulation(f) => {
                EntityRef::Formulation(f.formulation.id.clone())
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Consumer-safe view
// ---------------------------------------------------------------------------

/// Public view of a provenance bundle, redacted by policy: participant ids
/// (collector, facility, lab, manufacturer, owner), raw coordinates, and
/// free-form operational fields are dropped; species, stages, verdicts,
/// timestamps, and ledger transaction ids remain so authenticity stays
/// independently checkable.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ConsumerView {
    /// Entity the resolved token was bound to.
    pub root: EntityRef,
    /// Present when the root is a formulation.
    pub product: Option<ConsumerProduct>,
    /// Input batch summaries (a single entry when the root is a batch).
    pub batches: Vec<ConsumerBatch>,
}

/// Redacted formulation summary.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ConsumerProduct {
    /// Product batch id.
    pub formulation_id: String,
    /// Product category.
    pub product_type: ProductType,
    /// Dosage description.
    pub dosage: String,
    /// Creation time.
    pub created_at: Timestamp,
    /// Ledger transaction id of the formulation record.
    pub ledger_tx_id: String,
}

/// Redacted batch summary.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ConsumerBatch {
    /// Batch id.
    pub batch_id: String,
    /// Species collected.
    pub species: String,
    /// Lifecycle status.
    pub status: BatchStatus,
    /// Collection time.
    pub collected_at: Timestamp,
    /// Aggregate quality standing.
    pub quality: QualityStatus,
    /// Processing stages, oldest first.
    pub steps: Vec<ConsumerStep>,
    /// Test outcomes, chronological.
    pub tests: Vec<ConsumerTest>,
}

/// Redacted processing step.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ConsumerStep {
    /// Stage performed.
    pub step_type: StepType,
    /// When it was recorded.
    pub timestamp: Timestamp,
    /// Ledger transaction id.
    pub ledger_tx_id: String,
}

/// Redacted quality test.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ConsumerTest {
    /// Test category.
    pub test_type: TestType,
    /// Derived verdict.
    pub verdict: Verdict,
    /// When it was recorded.
    pub timestamp: Timestamp,
    /// Ledger transaction id.
    pub ledger_tx_id: String,
}

impl ConsumerView {
    /// Apply the redaction policy to a full bundle.
    pub fn from_bundle(bundle: &ProvenanceBundle) -> Self {
        match bundle {
            ProvenanceBundle::Batch(b) => ConsumerView {
                root: bundle.root(),
                product: None,
                batches: vec![redact_batch(b)],
            },
            ProvenanceBundle::Formulation(f) => ConsumerView {
                root: bundle.root(),
                product: Some(ConsumerProduct {
                    formulation_id: f.formulation.id.clone(),
                    product_type: f.formulation.params.product_type,
                    dosage: f.formulation.params.dosage.clone(),
                    created_at: f.formulation.timestamp,
                    ledger_tx_id: f.formulation.receipt.tx_id.clone(),
                }),
                batches: f.inputs.iter().map(redact_batch).collect(),
            },
        }
    }
}

fn redact_batch(p: &BatchProvenance) -> ConsumerBatch {
    ConsumerBatch {
        batch_id: p.batch.id.clone(),
        species: p.batch.species.clone(),
        status: p.batch.status,
        collected_at: p.collection.timestamp,
        quality: p.quality,
        steps: p
            .steps
            .iter()
            .map(|s| ConsumerStep {
                step_type: s.params.step_type(),
                timestamp: s.timestamp,
                ledger_tx_id: s.receipt.tx_id.clone(),
            })
            .collect(),
        tests: p
            .tests
            .iter()
            .map(|t| ConsumerTest {
                test_type: t.results.test_type(),
                verdict: t.verdict,
                timestamp: t.timestamp,
                ledger_tx_id: t.receipt.tx_id.clone(),
            })
            .collect(),
    }
}

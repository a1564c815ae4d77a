//! # Domain Errors
//!
//! Error taxonomy for the traceability core. Domain errors always surface to
//! the caller typed, naming the invariant that failed and the entity that
//! triggered it; only transient ledger failures are retried internally.

use super::value_objects::BatchStatus;
use shared_types::{BatchId, FormulationId, TestId};
use thiserror::Error;

/// Traceability error taxonomy.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum TraceError {
    /// Malformed input. Caller-fixable, retryable after correction.
    #[error("Validation failed: {detail}")]
    Validation {
        /// What was wrong with the input.
        detail: String,
    },

    /// Proposed status is not in the allowed set for the current status.
    /// Not retryable with the same input; state is left untouched.
    #[error("Invalid transition for batch {batch_id}: {from} -> {to}")]
    InvalidTransition {
        /// Batch the transition was attempted on.
        batch_id: BatchId,
        /// Current status.
        from: BatchStatus,
        /// Proposed status.
        to: BatchStatus,
    },

    /// An input batch is not in a consumable state.
    #[error("Batch {batch_id} not eligible for formulation (status {status})")]
    NotEligible {
        /// The ineligible input batch.
        batch_id: BatchId,
        /// Its current status.
        status: BatchStatus,
    },

    /// An input batch was already consumed by an earlier formulation.
    #[error("Batch {batch_id} already consumed by formulation {formulation_id}")]
    AlreadyConsumed {
        /// The consumed batch.
        batch_id: BatchId,
        /// The formulation that consumed it.
        formulation_id: FormulationId,
    },

    /// Ledger could not be reached. Transient.
    #[error("Ledger unavailable: {detail}")]
    LedgerUnavailable {
        /// Adapter-provided detail.
        detail: String,
    },

    /// Ledger write kept failing past the retry cap. Transient; the call's
    /// staged mutation has been rolled back.
    #[error("Ledger write failed after {attempts} attempts")]
    LedgerWriteFailed {
        /// Attempts made before giving up.
        attempts: u32,
    },

    /// Stored record no longer matches its ledger fingerprint. Always
    /// surfaced, never auto-corrected.
    #[error("Integrity mismatch for test {test_id}: {detail}")]
    IntegrityMismatch {
        /// The tampered test record.
        test_id: TestId,
        /// What differed.
        detail: String,
    },

    /// Entity lookup failed.
    #[error("{kind} not found: {id}")]
    NotFound {
        /// Entity kind (batch, formulation, test, species, ...).
        kind: &'static str,
        /// The missing id.
        id: String,
    },

    /// QR token lookup failed.
    #[error("Token not found")]
    TokenNotFound,

    /// QR token was revoked.
    #[error("Token revoked")]
    TokenRevoked,

    /// Lineage traversal revisited a node. Should be impossible with
    /// append-only writes; validated defensively.
    #[error("Provenance cycle detected at {id}")]
    CycleDetected {
        /// First revisited entity id.
        id: String,
    },
}

impl TraceError {
    /// Shorthand for a validation failure.
    pub fn validation(detail: impl Into<String>) -> Self {
        TraceError::Validation {
            detail: detail.into(),
        }
    }

    /// Shorthand for a missing entity.
    pub fn not_found(kind: &'static str, id: impl Into<String>) -> Self {
        TraceError::NotFound {
            kind,
            id: id.into(),
        }
    }
}

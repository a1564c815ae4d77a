//! # Ledger Wire Types
//!
//! What the core hands to the external ledger and what it receives back.
//! The ledger itself (consensus, cryptography, networking) is out of scope;
//! these types only describe the persisted record and its receipt.

use crate::entities::Timestamp;
use serde::{Deserialize, Serialize};

/// Category of a persisted mutation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RecordKind {
    /// Field collection of raw material.
    CollectionEvent,
    /// A processing step appended to a batch chain.
    ProcessingStep,
    /// A laboratory quality test with its derived verdict.
    QualityTest,
    /// Consumption of input batches into a formulation.
    Formulation,
    /// A bare status transition.
    StatusTransition,
    /// QR token mint or revocation.
    QrToken,
}

/// An immutable record submitted to the ledger.
///
/// `idempotency_key` is caller-supplied; a retried write with the same key
/// MUST yield the original receipt rather than a duplicate record.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerRecord {
    /// Record category.
    pub kind: RecordKind,
    /// Id of the entity this record is about.
    pub entity_id: String,
    /// Full record body, serialized by the caller.
    pub payload: serde_json::Value,
    /// Deduplication key for retried writes.
    pub idempotency_key: String,
    /// Optional SHA-256 fingerprint (hex) of the canonical payload, used for
    /// post-hoc tamper detection.
    pub fingerprint: Option<String>,
}

/// Receipt returned by the ledger for a committed record.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerReceipt {
    /// Ledger transaction id.
    pub tx_id: String,
    /// Ledger commit timestamp.
    pub timestamp: Timestamp,
}

//! # Shared Identifiers
//!
//! Identifier aliases and the entity reference used for QR binding and
//! provenance root resolution.
//!
//! ## Type Decisions
//!
//! - Ids are caller-supplied strings (`BATCH001`, `COLL001`, ...) rather than
//!   fixed-width hashes: they originate upstream of this core and are opaque
//!   lookup keys, never computed here.
//! - `Timestamp` is unix seconds. Calendar interpretation (harvest months)
//!   happens at the point of use.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Unix timestamp in seconds.
pub type Timestamp = u64;

/// Herb batch identifier.
pub type BatchId = String;
/// Field collection event identifier.
pub type CollectionId = String;
/// Processing step identifier.
pub type StepId = String;
/// Quality test identifier.
pub type TestId = String;
/// Formulation (finished product batch) identifier.
pub type FormulationId = String;
/// Participant identifier (collector, facility, lab, manufacturer).
pub type ParticipantId = String;
/// Botanical species name, e.g. `Ashwagandha`.
pub type Species = String;

/// Reference to a QR-bindable, provenance-rooted entity.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id")]
pub enum EntityRef {
    /// A herb batch.
    Batch(BatchId),
    /// A finished formulation.
    Formulation(FormulationId),
}

impl EntityRef {
    /// The underlying id string.
    pub fn id(&self) -> &str {
        match self {
            EntityRef::Batch(id) => id,
            EntityRef::Formulation(id) => id,
        }
    }
}

impl fmt::Display for EntityRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntityRef::Batch(id) => write!(f, "batch/{id}"),
            EntityRef::Formulation(id) => write!(f, "formulation/{id}"),
        }
    }
}

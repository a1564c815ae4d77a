//! # Outbound Ports
//!
//! Traits for external dependencies: the ledger, the Herb Registry, and the
//! clock. Adapters live in `crate::adapters`; tests inject the in-memory
//! implementations from there.

use crate::domain::{QualityThresholds, SpeciesRules, TraceError};
use async_trait::async_trait;
use shared_types::{LedgerReceipt, LedgerRecord, Timestamp};

/// The external ledger - outbound port.
///
/// `write` must be idempotent over the record's `idempotency_key`: a retried
/// write with the same key returns the original receipt. Transient failures
/// surface as `LedgerUnavailable`; the services retry with a bounded cap.
#[async_trait]
pub trait LedgerAdapter: Send + Sync {
    /// Persist a record and return its receipt.
    async fn write(&self, record: LedgerRecord) -> Result<LedgerReceipt, TraceError>;

    /// Read back a committed record by transaction id.
    async fn read(&self, tx_id: &str) -> Result<Option<LedgerRecord>, TraceError>;
}

/// Herb Registry - outbound port. Read-only reference data.
pub trait HerbRegistry: Send + Sync {
    /// Quality thresholds for a species, or `None` when unregistered.
    fn quality_thresholds(&self, species: &str) -> Option<QualityThresholds>;

    /// Full rules (geofence, season, thresholds) for a species.
    fn species_rules(&self, species: &str) -> Option<SpeciesRules>;

    /// Thresholds, surfacing a typed error for unknown species.
    fn require_thresholds(&self, species: &str) -> Result<QualityThresholds, TraceError> {
        self.quality_thresholds(species)
            .ok_or_else(|| TraceError::not_found("species", species))
    }

    /// Rules, surfacing a typed error for unknown species.
    fn require_rules(&self, species: &str) -> Result<SpeciesRules, TraceError> {
        self.species_rules(species)
            .ok_or_else(|| TraceError::not_found("species", species))
    }
}

/// Clock - outbound port. Injectable so tests control time.
pub trait TimeSource: Send + Sync {
    /// Current unix time in seconds.
    fn now(&self) -> Timestamp;

    /// Current unix time in nanoseconds, used as token entropy.
    fn now_nanos(&self) -> u128;
}

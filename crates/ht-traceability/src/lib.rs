//! # HerbalTrace Traceability Core
//!
//! Supply-chain traceability for medicinal herbs: from field collection
//! through processing and quality testing to finished formulations, every
//! mutation anchored on an external ledger.
//!
//! **Architecture:** Hexagonal (DDD + Ports/Adapters)
//!
//! ## Purpose
//!
//! - Batch lifecycle as an explicit status machine over an append-only
//!   event log
//! - Linear processing chains with typed, validated step parameters
//! - A quality gate deriving pure verdicts from species thresholds
//! - All-or-nothing formulation composition with exactly-once consumption
//! - Provenance reconstruction and redacted consumer views behind QR tokens
//!
//! ## Write Discipline
//!
//! | Rule | Description |
//! |------|-------------|
//! | Ledger first | No in-process commit without a receipt in hand |
//! | Idempotency keys | Retried writes resolve to the original receipt |
//! | Per-batch locks | Sorted multi-acquire, no deadlocks |
//! | Typed errors | Every rejection names the invariant and entity |
//!
//! ## Module Structure
//!
//! ```text
//! ht-traceability/
//! ├── domain/          # Entities, status machine, events, invariants
//! ├── ports/           # TraceabilityApi, LedgerAdapter, HerbRegistry
//! ├── adapters/        # In-memory ledger, registry, clocks
//! ├── service/         # Orchestration: validate, anchor, commit
//! └── store.rs         # Event logs, lookup maps, per-batch locks
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod adapters;
pub mod domain;
pub mod ports;
pub mod service;
pub mod store;

// Re-exports
pub use adapters::{FixedClock, InMemoryHerbRegistry, InMemoryLedger, SystemTimeSource};
pub use domain::{
    check_batch_eligible, check_geofence, check_harvest_month, check_input_batch_ids, Batch,
    BatchEvent, BatchProvenance, BatchStatus, CollectionEvent, ConsumerView, Formulation,
    FormulationParams, FormulationProvenance, Geofence, ProcessingStep, ProductType,
    ProvenanceBundle, QrToken, QualityStatus, QualityTest, QualityThresholds, SpeciesRules,
    StepParams, StepType, TestResults, TestType, TraceError, Verdict, VerdictOutcome,
    MAX_INPUT_BATCHES, MIN_INPUT_BATCHES,
};
pub use ports::{
    AddStepRequest, AddTestRequest, CollectionRequest, FormulationRequest, HerbRegistry,
    IntegrityReport, LedgerAdapter, TimeSource, TraceabilityApi,
};
pub use service::TraceabilityService;
pub use store::{LockManager, TraceStore};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

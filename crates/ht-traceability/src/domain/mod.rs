//! # Domain Module
//!
//! Core domain types for herb traceability: entities, the batch status
//! machine, the append-only event log, invariants, and the error taxonomy.

pub mod entities;
pub mod errors;
pub mod events;
pub mod invariants;
pub mod provenance;
pub mod value_objects;

pub use entities::*;
pub use errors::*;
pub use events::*;
pub use invariants::*;
pub use provenance::*;
pub use value_objects::*;

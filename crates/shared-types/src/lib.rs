//! # Shared Types Crate
//!
//! Domain identifiers and ledger wire types shared across HerbalTrace crates.
//!
//! ## Design Principles
//!
//! - **Single Source of Truth**: all cross-crate identifiers live here.
//! - **Ledger neutrality**: `LedgerRecord` / `LedgerReceipt` describe what is
//!   persisted without assuming any particular ledger network.

pub mod entities;
pub mod ledger;

pub use entities::*;
pub use ledger::*;

//! # HerbalTrace Test Suite
//!
//! Unified test crate exercising the traceability core end to end.
//!
//! ## Structure
//!
//! ```text
//! tests/src/
//! ├── support.rs        # Fixtures: wired service, canned requests
//! └── integration/      # End-to-end scenarios
//!     ├── lifecycle.rs  # Collection through formulation, happy path
//!     ├── quality.rs    # Quality gate verdicts and integrity checks
//!     ├── composer.rs   # All-or-nothing and exactly-once consumption
//!     ├── resilience.rs # Ledger flakiness, retries, idempotency
//!     └── tokens.rs     # QR minting, resolution, redaction, revocation
//! ```
//!
//! ## Running Tests
//!
//! ```bash
//! # All tests
//! cargo test -p ht-tests
//!
//! # By category
//! cargo test -p ht-tests integration::lifecycle
//! cargo test -p ht-tests integration::resilience
//! ```

#![allow(unused_imports)]
#![allow(dead_code)]

pub mod integration;

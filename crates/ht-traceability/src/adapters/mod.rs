//! Outbound adapter implementations.

pub mod memory_ledger;
pub mod memory_registry;
pub mod system_time;

pub use memory_ledger::InMemoryLedger;
pub use memory_registry::InMemoryHerbRegistry;
pub use system_time::{FixedClock, SystemTimeSource};

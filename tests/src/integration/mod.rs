//! End-to-end scenarios over the wired service.

pub mod composer;
pub mod lifecycle;
pub mod resilience;
pub mod tokens;

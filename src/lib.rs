//! coherence-stats: invariant checks and reporting for cache coherence
//! simulator output.
//!
//! Parses per-run statistics records, verifies the algebraic invariants any
//! correct simulation must satisfy, and renders a comparison table across runs.

pub mod checker;
pub mod error;
pub mod loader;
pub mod report;
pub mod stats;
pub mod types;

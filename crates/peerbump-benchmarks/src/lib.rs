//! peerbump benchmarking suite
//!
//! Criterion benchmarks for range matching, best-version selection,
//! manifest parsing and whole resolution runs over in-memory registries.

pub mod common;

pub use common::*;

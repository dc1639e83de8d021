//! # peerbump-core
//!
//! Core types shared across all peerbump crates.
//!
//! This crate provides:
//! - Version and VersionReq types implementing the npm range grammar
//! - The Manifest model and Dependency types
//! - BumpError enum for unified error handling
//!
//! ## Architecture
//!
//! The crate is organized into modules:
//! - `types`: Core data types (Version, Manifest, etc.)
//! - `error`: Error types and result aliases

pub mod error;
pub mod types;

// Re-export commonly used types
pub use error::{BumpError, BumpResult};
pub use types::{Dependency, DependencyKind, Manifest, Version, VersionReq};

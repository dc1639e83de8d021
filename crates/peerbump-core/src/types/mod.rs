//! Core data types for peerbump.
//!
//! This module provides the fundamental types used throughout the workspace:
//! - Version types for semantic versioning and npm ranges
//! - The project manifest model
//! - Dependency specifications

pub mod dependency;
pub mod manifest;
pub mod version;

// Re-export all public types
pub use dependency::{Dependency, DependencyKind};
pub use manifest::Manifest;
pub use version::{Comparator, ComparatorSet, Op, PartialVersion, Version, VersionError, VersionReq};

//! Configuration and manifest files for peerbump
//!
//! This crate reads and writes package.json without disturbing fields it
//! does not own, and loads the layered peerbump.toml settings.

pub mod json;
pub mod merge;
pub mod toml;

// Re-export main types
pub use json::PackageJson;
pub use merge::{ConfigLayering, ConfigLoader, ConfigSource, LoadedConfig, CONFIG_FILE, MANIFEST_FILE};
pub use toml::{AdviceSection, PeerbumpToml, RegistrySection, ResolverSection};

use peerbump_core::error::BumpError;

/// Result type for configuration operations
pub type ConfigResult<T> = Result<T, BumpError>;

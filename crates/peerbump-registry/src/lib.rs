//! npm registry access for peerbump
//!
//! This crate provides the [`PackageSource`] port the resolver queries, an
//! HTTP client for live registries with connection pooling and retry logic,
//! a TTL metadata cache, and an in-memory registry for fixtures and tests.

pub mod api;
pub mod cache;
pub mod client;
pub mod memory;
pub mod source;

// Re-export main types
pub use api::{DistInfo, PackageMetadataResponse, VersionMetadata};
pub use cache::{CacheEntry, CacheStats, MetadataCache};
pub use client::{AuthConfig, ClientOptions, RegistryClient, RetryConfig, DEFAULT_REGISTRY};
pub use memory::MemoryRegistry;
pub use source::{CachedRegistry, PackageSource};

use peerbump_core::error::BumpError;

/// Result type for registry operations
pub type RegistryResult<T> = Result<T, BumpError>;

//! Registry doubles shared by the resolver tests

use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;

use peerbump_core::error::BumpError;
use peerbump_registry::{MemoryRegistry, PackageMetadataResponse, PackageSource, RegistryResult, VersionMetadata};

/// Build a registry from `(name, version)` entries in publish order
pub fn registry(entries: &[(&str, VersionMetadata)]) -> MemoryRegistry {
    let mut registry = MemoryRegistry::new();
    for (name, metadata) in entries {
        registry.add_version(name, metadata.clone());
    }
    registry
}

/// Wraps a registry and fails every lookup of the listed packages
pub struct FailingSource {
    inner: MemoryRegistry,
    failing: HashSet<String>,
    calls: AtomicUsize,
}

impl FailingSource {
    pub fn new(inner: MemoryRegistry, failing: &[&str]) -> Self {
        Self {
            inner,
            failing: failing.iter().map(|name| name.to_string()).collect(),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PackageSource for FailingSource {
    async fn fetch_package_metadata(&self, name: &str) -> RegistryResult<Arc<PackageMetadataResponse>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.failing.contains(name) {
            return Err(BumpError::Network {
                message: format!("connection reset while fetching {}", name),
                source: None,
            });
        }
        self.inner.fetch_package_metadata(name).await
    }
}

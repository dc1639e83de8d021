//! Metadata caching with TTL support

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use dashmap::DashMap;

use crate::api::PackageMetadataResponse;

/// Default time-to-live for cached packuments
pub const DEFAULT_TTL: Duration = Duration::from_secs(300);

/// Cache entry with TTL
#[derive(Debug, Clone)]
pub struct CacheEntry {
    /// Cached metadata
    pub metadata: Arc<PackageMetadataResponse>,
    /// When the entry was stored
    pub stored_at: Instant,
    /// Time-to-live duration
    pub ttl: Duration,
}

impl CacheEntry {
    /// Create cache entry with custom TTL
    pub fn with_ttl(metadata: Arc<PackageMetadataResponse>, ttl: Duration) -> Self {
        Self {
            metadata,
            stored_at: Instant::now(),
            ttl,
        }
    }

    /// Check if cache entry is still fresh
    pub fn is_fresh(&self) -> bool {
        self.stored_at.elapsed() < self.ttl
    }

    /// Get age of cache entry
    pub fn age(&self) -> Duration {
        self.stored_at.elapsed()
    }
}

/// In-memory metadata cache with TTL, shared across concurrent lookups
#[derive(Debug)]
pub struct MetadataCache {
    cache: DashMap<String, CacheEntry>,
    ttl: Duration,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl MetadataCache {
    /// Create new metadata cache with the default TTL
    pub fn new() -> Self {
        Self::with_ttl(DEFAULT_TTL)
    }

    /// Create cache whose entries expire after `ttl`
    pub fn with_ttl(ttl: Duration) -> Self {
        Self {
            cache: DashMap::new(),
            ttl,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    /// Configured TTL
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Get cached metadata if fresh
    pub fn get(&self, package_name: &str) -> Option<Arc<PackageMetadataResponse>> {
        let fresh = self
            .cache
            .get(package_name)
            .and_then(|entry| entry.is_fresh().then(|| Arc::clone(&entry.metadata)));

        match fresh {
            Some(metadata) => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                Some(metadata)
            },
            None => {
                // The read guard is released above; removing here cannot deadlock
                self.cache.remove_if(package_name, |_, entry| !entry.is_fresh());
                self.misses.fetch_add(1, Ordering::Relaxed);
                None
            },
        }
    }

    /// Store metadata with the cache TTL
    pub fn insert(&self, package_name: impl Into<String>, metadata: Arc<PackageMetadataResponse>) {
        self.insert_with_ttl(package_name, metadata, self.ttl);
    }

    /// Store metadata with custom TTL
    pub fn insert_with_ttl(
        &self,
        package_name: impl Into<String>,
        metadata: Arc<PackageMetadataResponse>,
        ttl: Duration,
    ) {
        self.cache
            .insert(package_name.into(), CacheEntry::with_ttl(metadata, ttl));
    }

    /// Check if package is cached and fresh
    pub fn contains_fresh(&self, package_name: &str) -> bool {
        self.cache
            .get(package_name)
            .map(|entry| entry.is_fresh())
            .unwrap_or(false)
    }

    /// Get cache statistics
    pub fn stats(&self) -> CacheStats {
        let mut fresh_entries = 0;
        let mut stale_entries = 0;

        for entry in self.cache.iter() {
            if entry.is_fresh() {
                fresh_entries += 1;
            } else {
                stale_entries += 1;
            }
        }

        CacheStats {
            total_entries: self.cache.len(),
            fresh_entries,
            stale_entries,
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
        }
    }

    /// Clear all cached entries
    pub fn clear(&self) {
        self.cache.clear();
    }

    /// Remove stale entries, returning how many were dropped
    pub fn cleanup(&self) -> usize {
        let before = self.cache.len();
        self.cache.retain(|_, entry| entry.is_fresh());
        before.saturating_sub(self.cache.len())
    }
}

impl Default for MetadataCache {
    fn default() -> Self {
        Self::new()
    }
}

/// Cache statistics
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Total number of entries
    pub total_entries: usize,
    /// Number of fresh entries
    pub fresh_entries: usize,
    /// Number of stale entries
    pub stale_entries: usize,
    /// Lookups answered from the cache
    pub hits: u64,
    /// Lookups that fell through to the registry
    pub misses: u64,
}

impl CacheStats {
    /// Fraction of lookups answered from the cache
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

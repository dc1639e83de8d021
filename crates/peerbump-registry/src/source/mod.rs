//! The package-source port the resolver talks to
//!
//! Resolution never touches HTTP directly: it goes through [`PackageSource`],
//! which the live registry, the in-memory fixture registry and test doubles
//! all implement.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use crate::api::{PackageMetadataResponse, VersionMetadata};
use crate::cache::{CacheStats, MetadataCache};
use crate::client::RegistryClient;
use crate::RegistryResult;
use peerbump_core::error::BumpError;

/// Anything that can answer packument queries
#[async_trait]
pub trait PackageSource: Send + Sync {
    /// Full packument of a package
    async fn fetch_package_metadata(&self, name: &str) -> RegistryResult<Arc<PackageMetadataResponse>>;

    /// Metadata of one exact published version
    async fn fetch_package_version_metadata(
        &self,
        name: &str,
        version: &str,
    ) -> RegistryResult<VersionMetadata> {
        let metadata = self.fetch_package_metadata(name).await?;
        metadata
            .version(version)
            .cloned()
            .ok_or_else(|| BumpError::VersionNotFound {
                name: name.to_string(),
                version: version.to_string(),
            })
    }

    /// Every published version string, in registry order
    async fn fetch_available_versions(&self, name: &str) -> RegistryResult<Vec<String>> {
        Ok(self.fetch_package_metadata(name).await?.version_strings())
    }
}

/// Live registry client fronted by a TTL cache
#[derive(Debug)]
pub struct CachedRegistry {
    client: RegistryClient,
    cache: MetadataCache,
}

impl CachedRegistry {
    /// Wrap a client with a fresh cache
    pub fn new(client: RegistryClient, cache: MetadataCache) -> Self {
        Self { client, cache }
    }

    /// Underlying HTTP client
    pub fn client(&self) -> &RegistryClient {
        &self.client
    }

    /// Cache statistics for diagnostics
    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }
}

#[async_trait]
impl PackageSource for CachedRegistry {
    async fn fetch_package_metadata(&self, name: &str) -> RegistryResult<Arc<PackageMetadataResponse>> {
        if let Some(metadata) = self.cache.get(name) {
            debug!("cache hit for {}", name);
            return Ok(metadata);
        }

        let metadata = Arc::new(self.client.fetch_metadata(name).await?);
        debug!(
            "fetched {} ({} versions) from {}",
            name,
            metadata.versions.len(),
            self.client.base_url()
        );
        self.cache.insert(name, Arc::clone(&metadata));
        Ok(metadata)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::{ClientOptions, RetryConfig};
    use std::time::Duration;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn registry_with(server: &MockServer) -> CachedRegistry {
        let client = RegistryClient::with_options(ClientOptions {
            base_url: server.uri(),
            retry: RetryConfig {
                max_retries: 0,
                ..RetryConfig::default()
            },
            ..ClientOptions::default()
        })
        .unwrap();
        CachedRegistry::new(client, MetadataCache::with_ttl(Duration::from_secs(60)))
    }

    #[tokio::test]
    async fn test_second_lookup_is_served_from_cache() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/lib-a"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "name": "lib-a",
                "dist-tags": { "latest": "2.0.0" },
                "versions": {
                    "1.0.0": { "version": "1.0.0" },
                    "2.0.0": { "version": "2.0.0", "peerDependencies": { "lib-b": "^2.0.0" } }
                }
            })))
            .expect(1)
            .mount(&server)
            .await;

        let registry = registry_with(&server).await;

        let versions = registry.fetch_available_versions("lib-a").await.unwrap();
        assert_eq!(versions, vec!["1.0.0", "2.0.0"]);

        let version = registry
            .fetch_package_version_metadata("lib-a", "2.0.0")
            .await
            .unwrap();
        assert_eq!(version.peer_range("lib-b"), Some("^2.0.0"));

        let stats = registry.cache_stats();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
    }

    #[tokio::test]
    async fn test_missing_version_is_reported() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/lib-a"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "name": "lib-a",
                "versions": { "1.0.0": { "version": "1.0.0" } }
            })))
            .mount(&server)
            .await;

        let registry = registry_with(&server).await;
        let result = registry.fetch_package_version_metadata("lib-a", "9.9.9").await;

        match result {
            Err(BumpError::VersionNotFound { name, version }) => {
                assert_eq!(name, "lib-a");
                assert_eq!(version, "9.9.9");
            },
            other => panic!("Expected VersionNotFound, got {:?}", other.map(|_| ())),
        }
    }
}

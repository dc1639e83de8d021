//! In-memory package source backed by packuments
//!
//! Used for offline runs (`--registry-fixture`) and as the default
//! collaborator in resolver tests. The fixture format is a JSON object
//! mapping package name to its packument.

use std::sync::Arc;

use async_trait::async_trait;
use camino::Utf8Path;
use indexmap::IndexMap;

use crate::api::{PackageMetadataResponse, VersionMetadata};
use crate::source::PackageSource;
use crate::RegistryResult;
use peerbump_core::error::BumpError;

/// Package source holding every packument in memory
#[derive(Debug, Clone, Default)]
pub struct MemoryRegistry {
    packages: IndexMap<String, Arc<PackageMetadataResponse>>,
}

impl MemoryRegistry {
    /// Empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Publish one version; the newest-inserted version becomes `latest`
    pub fn add_version(&mut self, name: &str, metadata: VersionMetadata) -> &mut Self {
        let entry = self
            .packages
            .entry(name.to_string())
            .or_insert_with(|| Arc::new(PackageMetadataResponse::new(name)));

        let packument = Arc::make_mut(entry);
        packument
            .dist_tags
            .insert("latest".to_string(), metadata.version.clone());
        packument.versions.insert(metadata.version.clone(), metadata);
        self
    }

    /// Builder-style [`MemoryRegistry::add_version`]
    pub fn with_version(mut self, name: &str, metadata: VersionMetadata) -> Self {
        self.add_version(name, metadata);
        self
    }

    /// Replace a whole packument
    pub fn insert(&mut self, metadata: PackageMetadataResponse) {
        self.packages
            .insert(metadata.name.clone(), Arc::new(metadata));
    }

    /// Parse a `{ "<name>": <packument> }` fixture
    pub fn from_json(content: &str) -> RegistryResult<Self> {
        let raw: IndexMap<String, PackageMetadataResponse> =
            serde_json::from_str(content).map_err(|e| BumpError::JsonParse {
                message: format!("invalid registry fixture: {}", e),
            })?;

        let packages = raw
            .into_iter()
            .map(|(name, mut metadata)| {
                if metadata.name.is_empty() {
                    metadata.name = name.clone();
                }
                for (version, entry) in metadata.versions.iter_mut() {
                    if entry.version.is_empty() {
                        entry.version = version.clone();
                    }
                }
                (name, Arc::new(metadata))
            })
            .collect();

        Ok(Self { packages })
    }

    /// Load a fixture file from disk
    pub async fn load(path: &Utf8Path) -> RegistryResult<Self> {
        let content = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| BumpError::io(format!("Failed to read registry fixture {}", path), e))?;
        Self::from_json(&content)
    }

    /// Number of packages known
    pub fn len(&self) -> usize {
        self.packages.len()
    }

    /// Whether no package is known
    pub fn is_empty(&self) -> bool {
        self.packages.is_empty()
    }
}

#[async_trait]
impl PackageSource for MemoryRegistry {
    async fn fetch_package_metadata(&self, name: &str) -> RegistryResult<Arc<PackageMetadataResponse>> {
        self.packages
            .get(name)
            .cloned()
            .ok_or_else(|| BumpError::PackageNotFound {
                name: name.to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use camino::Utf8PathBuf;

    #[tokio::test]
    async fn test_add_version_keeps_publish_order() {
        let registry = MemoryRegistry::new()
            .with_version("lib-a", VersionMetadata::new("1.0.0"))
            .with_version(
                "lib-a",
                VersionMetadata::new("2.0.0").with_peer_dependency("lib-b", "^2.0.0"),
            );

        let metadata = registry.fetch_package_metadata("lib-a").await.unwrap();
        assert_eq!(metadata.version_strings(), vec!["1.0.0", "2.0.0"]);
        assert_eq!(metadata.latest(), Some("2.0.0"));

        let version = registry
            .fetch_package_version_metadata("lib-a", "2.0.0")
            .await
            .unwrap();
        assert_eq!(version.peer_range("lib-b"), Some("^2.0.0"));
    }

    #[tokio::test]
    async fn test_unknown_package() {
        let registry = MemoryRegistry::new();
        assert!(registry.is_empty());

        let result = registry.fetch_available_versions("ghost").await;
        assert!(matches!(result, Err(BumpError::PackageNotFound { .. })));
    }

    #[tokio::test]
    async fn test_from_json_fills_names() {
        let registry = MemoryRegistry::from_json(
            r#"{
                "lib-b": {
                    "versions": {
                        "2.0.0": {},
                        "2.1.0": { "peerDependencies": { "lib-c": "^3.0.0" } }
                    }
                }
            }"#,
        )
        .unwrap();

        assert_eq!(registry.len(), 1);
        let metadata = registry.fetch_package_metadata("lib-b").await.unwrap();
        assert_eq!(metadata.name, "lib-b");
        assert_eq!(metadata.version("2.1.0").unwrap().version, "2.1.0");
    }

    #[test]
    fn test_from_json_rejects_garbage() {
        let result = MemoryRegistry::from_json("[1, 2, 3]");
        assert!(matches!(result, Err(BumpError::JsonParse { .. })));
    }

    #[tokio::test]
    async fn test_load_fixture_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = Utf8PathBuf::from_path_buf(dir.path().join("registry.json")).unwrap();
        tokio::fs::write(&path, r#"{ "react": { "versions": { "18.2.0": {} } } }"#)
            .await
            .unwrap();

        let registry = MemoryRegistry::load(&path).await.unwrap();
        let versions = registry.fetch_available_versions("react").await.unwrap();
        assert_eq!(versions, vec!["18.2.0"]);

        let missing = MemoryRegistry::load(&path.with_file_name("missing.json")).await;
        assert!(matches!(missing, Err(BumpError::Io { .. })));
    }
}

//! npm registry API response types

use std::collections::HashMap;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Package metadata response (packument) from the npm registry
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct PackageMetadataResponse {
    /// Package name
    #[serde(default)]
    pub name: String,
    /// Package description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Tag name to version (`latest`, `next`, ...)
    #[serde(default, rename = "dist-tags")]
    pub dist_tags: HashMap<String, String>,
    /// All versions metadata, in registry order
    #[serde(default)]
    pub versions: IndexMap<String, VersionMetadata>,
    /// Last modification timestamp (abbreviated metadata)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub modified: Option<String>,
}

/// Metadata for a specific package version
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct VersionMetadata {
    /// Version string
    #[serde(default)]
    pub version: String,
    /// Dependencies
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub dependencies: IndexMap<String, String>,
    /// Dev dependencies (only present in full metadata)
    #[serde(default, rename = "devDependencies", skip_serializing_if = "IndexMap::is_empty")]
    pub dev_dependencies: IndexMap<String, String>,
    /// Peer dependencies
    #[serde(default, rename = "peerDependencies", skip_serializing_if = "IndexMap::is_empty")]
    pub peer_dependencies: IndexMap<String, String>,
    /// Deprecation notice
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deprecated: Option<String>,
    /// Distribution information
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dist: Option<DistInfo>,
}

/// Distribution information for package tarball
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct DistInfo {
    /// Tarball download URL
    pub tarball: String,
    /// Subresource integrity hash
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub integrity: Option<String>,
}

impl PackageMetadataResponse {
    /// Empty packument for a package name
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Metadata of one exact version string
    pub fn version(&self, version: &str) -> Option<&VersionMetadata> {
        self.versions.get(version)
    }

    /// Every published version string, in registry order
    pub fn version_strings(&self) -> Vec<String> {
        self.versions.keys().cloned().collect()
    }

    /// Version the `latest` dist-tag points at
    pub fn latest(&self) -> Option<&str> {
        self.dist_tags.get("latest").map(String::as_str)
    }
}

impl VersionMetadata {
    /// Metadata with no dependencies
    pub fn new(version: impl Into<String>) -> Self {
        Self {
            version: version.into(),
            ..Default::default()
        }
    }

    /// Builder-style runtime dependency
    pub fn with_dependency(mut self, name: impl Into<String>, range: impl Into<String>) -> Self {
        self.dependencies.insert(name.into(), range.into());
        self
    }

    /// Builder-style peer dependency
    pub fn with_peer_dependency(mut self, name: impl Into<String>, range: impl Into<String>) -> Self {
        self.peer_dependencies.insert(name.into(), range.into());
        self
    }

    /// Declared peer range on another package
    pub fn peer_range(&self, name: &str) -> Option<&str> {
        self.peer_dependencies.get(name).map(String::as_str)
    }

    /// Union of runtime and peer requirements; a peer entry overrides a
    /// runtime entry of the same name
    pub fn requirements(&self) -> IndexMap<String, String> {
        let mut all = self.dependencies.clone();
        for (name, range) in &self.peer_dependencies {
            all.insert(name.clone(), range.clone());
        }
        all
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_abbreviated_packument() {
        let json = serde_json::json!({
            "name": "eslint-plugin-react",
            "dist-tags": { "latest": "7.33.2" },
            "modified": "2023-08-15T00:00:00.000Z",
            "versions": {
                "7.33.2": {
                    "version": "7.33.2",
                    "dependencies": { "array-includes": "^3.1.6" },
                    "peerDependencies": { "eslint": "^3 || ^4 || ^5 || ^6 || ^7 || ^8" },
                    "dist": { "tarball": "https://example.com/r.tgz", "integrity": "sha512-x" }
                },
                "7.0.0": { "version": "7.0.0" }
            }
        });

        let metadata: PackageMetadataResponse = serde_json::from_value(json).unwrap();
        assert_eq!(metadata.latest(), Some("7.33.2"));
        assert_eq!(metadata.version_strings(), vec!["7.33.2", "7.0.0"]);

        let version = metadata.version("7.33.2").unwrap();
        assert_eq!(version.peer_range("eslint"), Some("^3 || ^4 || ^5 || ^6 || ^7 || ^8"));
        assert!(metadata.version("7.0.0").unwrap().peer_dependencies.is_empty());
    }

    #[test]
    fn test_requirements_union() {
        let version = VersionMetadata::new("3.0.0")
            .with_dependency("lib-b", "^2.0.0")
            .with_dependency("lib-c", "^1.0.0")
            .with_peer_dependency("lib-c", "^1.2.0")
            .with_peer_dependency("react", ">=17");

        let requirements = version.requirements();
        let names: Vec<&str> = requirements.keys().map(String::as_str).collect();
        assert_eq!(names, vec!["lib-b", "lib-c", "react"]);
        assert_eq!(requirements.get("lib-c").map(String::as_str), Some("^1.2.0"));
    }
}

//! In-memory project manifest.
//!
//! Holds the package identity and the two dependency buckets the resolver
//! reads and rewrites. Bucket order is kept so a saved manifest diffs cleanly.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use super::DependencyKind;

/// Project manifest (the dependency-relevant subset of package.json)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Manifest {
    pub name: String,
    pub version: String,
    #[serde(default)]
    pub dependencies: IndexMap<String, String>,
    #[serde(default, rename = "devDependencies")]
    pub dev_dependencies: IndexMap<String, String>,
}

impl Manifest {
    /// Create an empty manifest
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
            ..Default::default()
        }
    }

    /// Builder-style production dependency
    pub fn with_dependency(mut self, name: impl Into<String>, spec: impl Into<String>) -> Self {
        self.dependencies.insert(name.into(), spec.into());
        self
    }

    /// Builder-style dev dependency
    pub fn with_dev_dependency(mut self, name: impl Into<String>, spec: impl Into<String>) -> Self {
        self.dev_dependencies.insert(name.into(), spec.into());
        self
    }

    /// Union of both buckets; on a name present in both, the dev spec wins
    pub fn get_all_dependencies(&self) -> IndexMap<String, String> {
        let mut all = self.dependencies.clone();
        for (name, spec) in &self.dev_dependencies {
            all.insert(name.clone(), spec.clone());
        }
        all
    }

    /// True iff the package is declared in devDependencies
    pub fn is_dev_dependency(&self, name: &str) -> bool {
        self.dev_dependencies.contains_key(name)
    }

    /// True iff the package is declared in either bucket
    pub fn contains(&self, name: &str) -> bool {
        self.dependencies.contains_key(name) || self.dev_dependencies.contains_key(name)
    }

    /// Current specifier, resolved the same way as `get_all_dependencies`
    pub fn spec_of(&self, name: &str) -> Option<&str> {
        self.dev_dependencies
            .get(name)
            .or_else(|| self.dependencies.get(name))
            .map(String::as_str)
    }

    /// Bucket the package currently lives in; production when absent
    pub fn kind_of(&self, name: &str) -> DependencyKind {
        DependencyKind::from_dev_flag(self.is_dev_dependency(name))
    }

    /// Write `spec` into the bucket selected by `is_dev`.
    ///
    /// The other bucket is left untouched, so a caller passing the wrong
    /// flag creates a duplicate classification.
    pub fn update_dependency(&mut self, name: &str, spec: impl Into<String>, is_dev: bool) {
        let bucket = if is_dev {
            &mut self.dev_dependencies
        } else {
            &mut self.dependencies
        };
        bucket.insert(name.to_string(), spec.into());
    }

    /// Rewrite a package in place, keeping its current classification
    pub fn set_dependency(&mut self, name: &str, spec: impl Into<String>) -> DependencyKind {
        let kind = self.kind_of(name);
        self.update_dependency(name, spec, kind.is_dev_only());
        kind
    }

    /// Names declared in both buckets (an ill-formed manifest)
    pub fn overlapping_names(&self) -> Vec<String> {
        self.dependencies
            .keys()
            .filter(|name| self.dev_dependencies.contains_key(*name))
            .cloned()
            .collect()
    }

    /// Total number of declared dependencies across both buckets
    pub fn dependency_count(&self) -> usize {
        self.dependencies.len() + self.dev_dependencies.len()
    }
}

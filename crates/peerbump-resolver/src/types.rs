//! Inputs and facts flowing between the resolution components

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use peerbump_core::error::BumpError;
use peerbump_core::types::Manifest;

/// A desired bump supplied by the caller
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlannedUpdate {
    pub name: String,
    /// Target version specifier, written to the manifest as given
    pub version: String,
    pub is_dev: bool,
}

impl PlannedUpdate {
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
            is_dev: false,
        }
    }

    pub fn dev(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            is_dev: true,
            ..Self::new(name, version)
        }
    }
}

impl FromStr for PlannedUpdate {
    type Err = BumpError;

    /// Parse `name@range`, including scoped names such as `@types/node@^20`
    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let input = input.trim();
        let invalid = || BumpError::InvalidVersion {
            package: input.to_string(),
            input: input.to_string(),
        };

        let split_at = input
            .char_indices()
            .skip(1)
            .find(|(_, c)| *c == '@')
            .map(|(i, _)| i)
            .ok_or_else(invalid)?;

        let (name, version) = (&input[..split_at], &input[split_at + 1..]);
        if name.is_empty() || name.ends_with('/') || version.trim().is_empty() {
            return Err(invalid());
        }

        Ok(Self::new(name, version.trim()))
    }
}

impl fmt::Display for PlannedUpdate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.name, self.version)
    }
}

/// A bump that has been written to the manifest
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AppliedUpdate {
    pub name: String,
    pub version: String,
    pub is_dev: bool,
}

impl AppliedUpdate {
    pub fn new(name: impl Into<String>, version: impl Into<String>, is_dev: bool) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
            is_dev,
        }
    }
}

/// `package_name@current_version` declares a peer range on
/// `conflicts_with_package_name` that `conflicts_with_version` falls outside of
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConflictInfo {
    pub package_name: String,
    pub current_version: String,
    pub conflicts_with_package_name: String,
    pub conflicts_with_version: String,
    /// The declared range that was violated
    pub peer_range: String,
    pub reason: String,
}

impl ConflictInfo {
    pub fn new(
        package_name: impl Into<String>,
        current_version: impl Into<String>,
        conflicts_with_package_name: impl Into<String>,
        conflicts_with_version: impl Into<String>,
        peer_range: impl Into<String>,
    ) -> Self {
        let conflicts_with_package_name = conflicts_with_package_name.into();
        let conflicts_with_version = conflicts_with_version.into();
        let peer_range = peer_range.into();
        let reason = format!(
            "requires {}@{} but updating to {}",
            conflicts_with_package_name, peer_range, conflicts_with_version
        );

        Self {
            package_name: package_name.into(),
            current_version: current_version.into(),
            conflicts_with_package_name,
            conflicts_with_version,
            peer_range,
            reason,
        }
    }

    /// Whether a bump of `name` could settle this conflict
    pub fn involves(&self, name: &str) -> bool {
        self.package_name == name || self.conflicts_with_package_name == name
    }
}

impl fmt::Display for ConflictInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{} {}", self.package_name, self.current_version, self.reason)
    }
}

/// Analyzer output: the conflicts found plus warnings about packages that
/// could not be analyzed
#[derive(Debug, Clone, Default)]
pub struct ConflictResolution {
    pub conflicts: Vec<ConflictInfo>,
    pub resolutions: crate::report::Narrative,
}

/// A candidate bump proposed by a suggestion oracle
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Suggestion {
    pub name: String,
    pub version: String,
    #[serde(default)]
    pub is_dev: bool,
    #[serde(default)]
    pub reason: String,
}

/// What the oracle gets to look at
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SuggestionContext {
    pub manifest: Manifest,
    pub planned: Vec<PlannedUpdate>,
    pub unresolved: Vec<ConflictInfo>,
    /// 1-based suggestion round
    pub round: usize,
}

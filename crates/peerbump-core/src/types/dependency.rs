//! Dependency specification types.
//!
//! Defines a named version specifier together with the manifest section
//! (or registry metadata section) it was declared in.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::{Version, VersionReq};

/// Dependency specification as written in a manifest or registry packument
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dependency {
    pub name: String,
    pub spec: String,
    pub kind: DependencyKind,
}

/// Type of dependency
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DependencyKind {
    /// Normal runtime dependency
    Normal,
    /// Development-only dependency
    Dev,
    /// Peer dependency (must be provided by consumer)
    Peer,
}

impl Dependency {
    /// Create a new normal dependency
    pub fn new(name: impl Into<String>, spec: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            spec: spec.into(),
            kind: DependencyKind::Normal,
        }
    }

    /// Create a development dependency
    pub fn dev(name: impl Into<String>, spec: impl Into<String>) -> Self {
        Self {
            kind: DependencyKind::Dev,
            ..Self::new(name, spec)
        }
    }

    /// Create a peer dependency
    pub fn peer(name: impl Into<String>, spec: impl Into<String>) -> Self {
        Self {
            kind: DependencyKind::Peer,
            ..Self::new(name, spec)
        }
    }

    /// Parse the specifier as a range, if it is one
    pub fn version_req(&self) -> Option<VersionReq> {
        VersionReq::parse(&self.spec).ok()
    }

    /// Coerced version of the specifier (`^1.2.3` -> `1.2.3`)
    pub fn coerced_version(&self) -> Option<Version> {
        Version::coerce(&self.spec)
    }
}

impl DependencyKind {
    /// Manifest bucket selected by a dev flag
    pub fn from_dev_flag(is_dev: bool) -> Self {
        if is_dev {
            DependencyKind::Dev
        } else {
            DependencyKind::Normal
        }
    }

    /// Check if this dependency is only for development
    pub fn is_dev_only(&self) -> bool {
        matches!(self, DependencyKind::Dev)
    }

    /// Check if this dependency must be provided by the consumer
    pub fn is_peer(&self) -> bool {
        matches!(self, DependencyKind::Peer)
    }

    /// Manifest key for this section
    pub fn section(&self) -> &'static str {
        match self {
            DependencyKind::Normal => "dependencies",
            DependencyKind::Dev => "devDependencies",
            DependencyKind::Peer => "peerDependencies",
        }
    }
}

impl fmt::Display for DependencyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            DependencyKind::Normal => "dependency",
            DependencyKind::Dev => "dev dependency",
            DependencyKind::Peer => "peer dependency",
        };
        f.write_str(label)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dependency_creation() {
        let dep = Dependency::new("lodash", "^4.17.21");

        assert_eq!(dep.name, "lodash");
        assert_eq!(dep.kind, DependencyKind::Normal);
        assert_eq!(dep.coerced_version(), Some(Version::new(4, 17, 21)));
        assert!(dep.version_req().unwrap().matches(&Version::new(4, 18, 0)));
    }

    #[test]
    fn test_non_registry_specs() {
        let dep = Dependency::dev("local-lib", "file:../local-lib");

        assert!(dep.kind.is_dev_only());
        assert!(dep.version_req().is_none());
        assert_eq!(dep.coerced_version(), None);
    }

    #[test]
    fn test_dependency_kinds() {
        assert_eq!(DependencyKind::from_dev_flag(true), DependencyKind::Dev);
        assert_eq!(DependencyKind::from_dev_flag(false), DependencyKind::Normal);

        assert!(DependencyKind::Peer.is_peer());
        assert!(!DependencyKind::Normal.is_peer());

        assert_eq!(DependencyKind::Dev.section(), "devDependencies");
        assert_eq!(Dependency::peer("react", "^18").kind.to_string(), "peer dependency");
    }
}

//! Version oracle primitives
//!
//! Pure helpers over version strings and npm ranges. Nothing in here fails:
//! input that cannot be understood turns into `None` or `false`.

use std::collections::BTreeSet;
use std::str::FromStr;

use peerbump_core::types::{Version, VersionReq};

/// Coerce a specifier (`^1.2.3`, `~2.0.0`, `1.2.x`) to `major.minor.patch`
pub fn clean_version(spec: &str) -> Option<Version> {
    Version::coerce(spec)
}

/// Whether the coerced `version` falls inside `range`
pub fn satisfies_range(version: &str, range: &str) -> bool {
    match (clean_version(version), VersionReq::parse(range)) {
        (Some(version), Ok(req)) => req.matches(&version),
        _ => false,
    }
}

/// Highest candidate satisfying `range`, compared by semver precedence
pub fn find_best_satisfying<S: AsRef<str>>(candidates: &[S], range: &str) -> Option<Version> {
    let req = VersionReq::parse(range).ok()?;
    VersionSelector::from_strings(candidates).select_best(&[req])
}

/// Published versions a specifier may pin: the literal version when it
/// names one (prereleases included), then the coerced version
pub fn pinned_versions(spec: &str) -> Vec<Version> {
    let literal = spec.trim().trim_start_matches(|c: char| matches!(c, '^' | '~' | '=' | 'v' | ' '));
    let mut candidates: Vec<Version> = Version::from_str(literal).ok().into_iter().collect();
    if let Some(clean) = clean_version(spec) {
        if !candidates.contains(&clean) {
            candidates.push(clean);
        }
    }
    candidates
}

/// Candidate versions kept in precedence order
#[derive(Debug, Clone, Default)]
pub struct VersionSelector {
    available_versions: BTreeSet<Version>,
}

impl VersionSelector {
    /// Create new version selector with available versions
    pub fn new(versions: Vec<Version>) -> Self {
        Self {
            available_versions: versions.into_iter().collect(),
        }
    }

    /// Parse published version strings, skipping any that are not semver
    pub fn from_strings<S: AsRef<str>>(versions: &[S]) -> Self {
        Self {
            available_versions: versions
                .iter()
                .filter_map(|v| Version::from_str(v.as_ref().trim()).ok())
                .collect(),
        }
    }

    /// Number of parseable candidates
    pub fn len(&self) -> usize {
        self.available_versions.len()
    }

    /// Whether there are no candidates
    pub fn is_empty(&self) -> bool {
        self.available_versions.is_empty()
    }

    /// Candidates newest first
    pub fn descending(&self) -> impl Iterator<Item = &Version> {
        self.available_versions.iter().rev()
    }

    /// Select highest version matching all constraints
    pub fn select_best(&self, constraints: &[VersionReq]) -> Option<Version> {
        self.descending()
            .find(|version| constraints.iter().all(|req| req.matches(version)))
            .cloned()
    }

    /// Select highest stable version (no prerelease) matching constraints
    pub fn select_best_stable(&self, constraints: &[VersionReq]) -> Option<Version> {
        self.descending()
            .filter(|version| !version.is_prerelease())
            .find(|version| constraints.iter().all(|req| req.matches(version)))
            .cloned()
    }

    /// Select version with preference for stability
    pub fn select_preferred(&self, constraints: &[VersionReq], allow_prerelease: bool) -> Option<Version> {
        if allow_prerelease {
            self.select_best(constraints)
        } else {
            self.select_best_stable(constraints)
        }
    }

    /// Get the highest available version
    pub fn highest_version(&self) -> Option<&Version> {
        self.available_versions.iter().next_back()
    }
}

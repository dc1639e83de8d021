//! Conflict resolution
//!
//! For each conflict, scans the published versions of the package that
//! declared the unmet peer range, newest first, and adopts the first one
//! whose peer range accepts the planned target.

pub mod advice;

use std::fmt;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use peerbump_core::types::{Manifest, Version};
use peerbump_registry::{PackageSource, VersionMetadata};

use crate::pipeline::ResolverOptions;
use crate::report::{BumpReason, ManifestChange, Narrative};
use crate::semver::{clean_version, satisfies_range, VersionSelector};
use crate::types::{AppliedUpdate, ConflictInfo};

pub use advice::{AdviceRule, AdviceTable, MatchKind};

/// What a batch of conflicts turned into
#[derive(Debug, Clone, Default)]
pub struct ConflictOutcome {
    pub resolutions: Narrative,
    pub changes: Vec<ManifestChange>,
    /// Bumps written to the manifest, in resolution order
    pub resolved: Vec<AppliedUpdate>,
    pub unresolved: Vec<ConflictInfo>,
}

/// Why a published version cannot settle a peer conflict
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CandidateRejection {
    Prerelease,
    NoPeer { target: String },
    OutOfRange { target: String, range: String },
}

impl fmt::Display for CandidateRejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CandidateRejection::Prerelease => write!(f, "is a prerelease and prereleases are not allowed"),
            CandidateRejection::NoPeer { target } => write!(f, "does not declare a peer dependency on {}", target),
            CandidateRejection::OutOfRange { target, range } => write!(f, "still requires {}@{}", target, range),
        }
    }
}

/// Stable releases are always candidates; prereleases only when allowed
pub fn check_prerelease(candidate: &Version, allow_prerelease: bool) -> Result<(), CandidateRejection> {
    if candidate.is_prerelease() && !allow_prerelease {
        return Err(CandidateRejection::Prerelease);
    }
    Ok(())
}

/// A published version settles the conflict when it declares a peer on
/// `peer` whose range accepts `target`. Returns that range.
pub fn check_candidate<'m>(
    published: &'m VersionMetadata,
    candidate: &Version,
    peer: &str,
    target: &str,
    allow_prerelease: bool,
) -> Result<&'m str, CandidateRejection> {
    check_prerelease(candidate, allow_prerelease)?;
    let range = published.peer_range(peer).ok_or_else(|| CandidateRejection::NoPeer {
        target: peer.to_string(),
    })?;
    if !satisfies_range(target, range) {
        return Err(CandidateRejection::OutOfRange {
            target: peer.to_string(),
            range: range.to_string(),
        });
    }
    Ok(range)
}

/// Greedy newest-first conflict resolver
pub struct ConflictResolver<'a> {
    source: &'a dyn PackageSource,
    options: &'a ResolverOptions,
    cancel: CancellationToken,
}

impl<'a> ConflictResolver<'a> {
    pub fn new(source: &'a dyn PackageSource, options: &'a ResolverOptions) -> Self {
        Self {
            source,
            options,
            cancel: CancellationToken::new(),
        }
    }

    /// Stop between conflicts once `token` is cancelled
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    /// Resolve conflicts in input order, mutating `manifest` for each success
    pub async fn resolve(&self, manifest: &mut Manifest, conflicts: &[ConflictInfo]) -> ConflictOutcome {
        let mut outcome = ConflictOutcome::default();

        for conflict in conflicts {
            if self.cancel.is_cancelled() {
                break;
            }
            self.resolve_one(manifest, conflict, &mut outcome).await;
        }

        outcome
    }

    async fn resolve_one(&self, manifest: &mut Manifest, conflict: &ConflictInfo, outcome: &mut ConflictOutcome) {
        let package = &conflict.package_name;
        let target_name = &conflict.conflicts_with_package_name;
        outcome.resolutions.info(format!("Resolving conflict: {}", conflict));

        let metadata = match self.source.fetch_package_metadata(package).await {
            Ok(metadata) => metadata,
            Err(e) => {
                outcome
                    .resolutions
                    .error(format!("Failed to resolve conflict for {}: {}", package, e));
                outcome.unresolved.push(conflict.clone());
                return;
            },
        };

        let Some(target) = clean_version(&conflict.conflicts_with_version) else {
            outcome.resolutions.error(format!(
                "Cannot resolve conflict for {}: '{}' is not a valid version of {}",
                package, conflict.conflicts_with_version, target_name
            ));
            outcome.unresolved.push(conflict.clone());
            return;
        };
        let target = target.to_string();

        let selector = VersionSelector::from_strings(&metadata.version_strings());
        let found = selector.descending().find_map(|candidate| {
            let published = metadata.version(&candidate.to_string())?;
            check_candidate(published, candidate, target_name, &target, self.options.allow_prerelease)
                .ok()
                .map(|range| (candidate.clone(), range.to_string()))
        });

        let Some((version, range)) = found else {
            debug!("no version of {} accepts {}@{}", package, target_name, target);
            self.narrate_failure(conflict, &target, &mut outcome.resolutions);
            outcome.unresolved.push(conflict.clone());
            return;
        };

        let previous = manifest.spec_of(package).map(str::to_string);
        let spec = self.options.range_style.format(previous.as_deref(), &version);
        outcome.resolutions.info(format!(
            "Proposed solution: update {} to {} (peer range {}@{})",
            package, version, target_name, range
        ));

        let bucket = manifest.set_dependency(package, spec.clone());
        info!("{} {} -> {} for {}@{}", package, conflict.current_version, spec, target_name, target);
        outcome.resolutions.success(format!(
            "Updated {} from {} to {} in {}",
            package,
            previous.as_deref().unwrap_or("(none)"),
            spec,
            bucket.section()
        ));

        outcome.changes.push(ManifestChange {
            name: package.clone(),
            from: previous,
            to: spec.clone(),
            bucket,
            reason: BumpReason::PeerConflict {
                with: target_name.clone(),
                version: target,
            },
        });
        outcome
            .resolved
            .push(AppliedUpdate::new(package.as_str(), spec, bucket.is_dev_only()));
    }

    fn narrate_failure(&self, conflict: &ConflictInfo, target: &str, resolutions: &mut Narrative) {
        let package = &conflict.package_name;
        let target_name = &conflict.conflicts_with_package_name;

        resolutions.error(format!(
            "No published version of {} supports {}@{}",
            package, target_name, target
        ));
        resolutions.tip(format!(
            "Keep {} within {} until {} publishes a compatible release",
            target_name, conflict.peer_range, package
        ));
        resolutions.tip(format!(
            "Check whether {} has been replaced or renamed for newer {} versions",
            package, target_name
        ));
        for hint in self.options.advice.advise(package, target_name, target) {
            resolutions.tip(hint);
        }
        resolutions.tip("As a last resort, install with --legacy-peer-deps to bypass peer dependency checks");
    }
}

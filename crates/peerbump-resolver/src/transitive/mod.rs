//! Transitive requirement checks
//!
//! After updates are applied, each updated package's own dependency and
//! peer ranges are checked against what the manifest currently declares.
//! Every requirement ends in one of three states: satisfied (no mutation),
//! resolved (rewritten to the best published match) or unresolved
//! (reported only).

use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use peerbump_core::types::{Manifest, Version, VersionReq};
use peerbump_registry::PackageSource;

use crate::pipeline::ResolverOptions;
use crate::report::{BumpReason, ManifestChange, Narrative};
use crate::semver::{clean_version, pinned_versions, satisfies_range, VersionSelector};
use crate::types::{AppliedUpdate, ConflictInfo};

/// Result of one transitive pass
#[derive(Debug, Clone, Default)]
pub struct TransitiveOutcome {
    pub resolutions: Narrative,
    pub changes: Vec<ManifestChange>,
    /// Requirements no published version satisfies, expressed as conflicts
    /// between the updated package and the installed dependency
    pub unresolved: Vec<ConflictInfo>,
}

/// Walks the requirements of applied updates
pub struct TransitiveResolver<'a> {
    source: &'a dyn PackageSource,
    options: &'a ResolverOptions,
    cancel: CancellationToken,
}

impl<'a> TransitiveResolver<'a> {
    pub fn new(source: &'a dyn PackageSource, options: &'a ResolverOptions) -> Self {
        Self {
            source,
            options,
            cancel: CancellationToken::new(),
        }
    }

    /// Stop between applied updates once `token` is cancelled
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    /// Check and repair the requirements of every applied update, in order
    pub async fn update(&self, manifest: &mut Manifest, applied: &[AppliedUpdate]) -> TransitiveOutcome {
        let mut outcome = TransitiveOutcome::default();

        for update in applied {
            if self.cancel.is_cancelled() {
                break;
            }
            self.update_one(manifest, update, &mut outcome).await;
        }

        outcome
    }

    async fn update_one(&self, manifest: &mut Manifest, update: &AppliedUpdate, outcome: &mut TransitiveOutcome) {
        let metadata = match self.source.fetch_package_metadata(&update.name).await {
            Ok(metadata) => metadata,
            Err(e) => {
                outcome.resolutions.error(format!(
                    "Failed to check dependencies of {}@{}: {}",
                    update.name, update.version, e
                ));
                return;
            },
        };

        let Some(version_data) = pinned_versions(&update.version)
            .into_iter()
            .find_map(|version| metadata.version(&version.to_string()))
        else {
            outcome.resolutions.error(format!(
                "Cannot check dependencies of {}@{}: version not found in registry",
                update.name, update.version
            ));
            return;
        };
        let required_by = format!("{}@{}", update.name, version_data.version);

        for (dep_name, required_range) in version_data.requirements() {
            let Some(current_spec) = manifest.spec_of(&dep_name).map(str::to_string) else {
                continue;
            };

            let Some(current) = clean_version(&current_spec) else {
                outcome.resolutions.error(format!(
                    "Cannot verify {} for {}: '{}' is not a valid version",
                    dep_name, required_by, current_spec
                ));
                continue;
            };

            if satisfies_range(&current.to_string(), &required_range) {
                outcome.resolutions.success(format!(
                    "{}@{} satisfies {}'s requirement {}",
                    dep_name, current_spec, required_by, required_range
                ));
                continue;
            }

            let available = match self.source.fetch_available_versions(&dep_name).await {
                Ok(versions) => versions,
                Err(e) => {
                    outcome.resolutions.error(format!(
                        "Failed to fetch versions of {} required by {}: {}",
                        dep_name, required_by, e
                    ));
                    continue;
                },
            };

            match self.best_match(&available, &required_range) {
                Some(version) => {
                    let spec = self.options.range_style.format(Some(&current_spec), &version);
                    let bucket = manifest.set_dependency(&dep_name, spec.clone());
                    warn!("{} forced to {} by {}", dep_name, spec, required_by);
                    outcome.resolutions.warning(format!(
                        "Updated {} from {} to {} ({} requires {})",
                        dep_name, current_spec, spec, required_by, required_range
                    ));
                    outcome.changes.push(ManifestChange {
                        name: dep_name.clone(),
                        from: Some(current_spec),
                        to: spec,
                        bucket,
                        reason: BumpReason::Transitive {
                            required_by: required_by.clone(),
                            range: required_range.clone(),
                        },
                    });
                },
                None => {
                    debug!("nothing published for {}@{}", dep_name, required_range);
                    outcome.resolutions.error(format!(
                        "Unresolved conflict: {} requires {}@{}, but no published version satisfies it",
                        required_by, dep_name, required_range
                    ));
                    let mut conflict = ConflictInfo::new(
                        update.name.as_str(),
                        update.version.as_str(),
                        dep_name.as_str(),
                        current_spec.as_str(),
                        required_range.as_str(),
                    );
                    conflict.reason = format!(
                        "requires {}@{} but {} is installed",
                        dep_name, required_range, current_spec
                    );
                    outcome.unresolved.push(conflict);
                },
            }
        }
    }

    fn best_match(&self, available: &[String], range: &str) -> Option<Version> {
        let req = VersionReq::parse(range).ok()?;
        VersionSelector::from_strings(available).select_preferred(&[req], self.options.allow_prerelease)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::NarrationLevel;
    use crate::test_support::{registry, FailingSource};
    use peerbump_registry::{MemoryRegistry, VersionMetadata};
    use proptest::prelude::*;

    fn lib_registry() -> MemoryRegistry {
        registry(&[
            (
                "lib-a",
                VersionMetadata::new("3.0.0")
                    .with_dependency("lib-b", "^2.0.0")
                    .with_dependency("not-installed", "^1.0.0")
                    .with_peer_dependency("react", ">=17"),
            ),
            ("lib-b", VersionMetadata::new("1.9.0")),
            ("lib-b", VersionMetadata::new("2.1.0")),
            ("lib-b", VersionMetadata::new("2.4.0")),
            ("react", VersionMetadata::new("18.2.0")),
        ])
    }

    fn manifest() -> Manifest {
        Manifest::new("app", "1.0.0")
            .with_dependency("lib-a", "3.0.0")
            .with_dependency("lib-b", "1.5.0")
            .with_dependency("react", "^18.2.0")
    }

    #[tokio::test]
    async fn test_picks_highest_satisfying_version() {
        let source = lib_registry();
        let options = ResolverOptions::default();
        let mut manifest = manifest();

        let outcome = TransitiveResolver::new(&source, &options)
            .update(&mut manifest, &[AppliedUpdate::new("lib-a", "3.0.0", false)])
            .await;

        assert_eq!(manifest.spec_of("lib-b"), Some("^2.4.0"));
        assert_eq!(manifest.spec_of("react"), Some("^18.2.0"));
        assert!(!manifest.contains("not-installed"));

        assert_eq!(outcome.changes.len(), 1);
        assert_eq!(
            outcome.changes[0].reason,
            BumpReason::Transitive {
                required_by: "lib-a@3.0.0".to_string(),
                range: "^2.0.0".to_string()
            }
        );
        assert_eq!(outcome.resolutions.at_level(NarrationLevel::Warning).count(), 1);
        assert_eq!(outcome.resolutions.at_level(NarrationLevel::Success).count(), 1);
    }

    #[tokio::test]
    async fn test_second_pass_is_idempotent() {
        let source = lib_registry();
        let options = ResolverOptions::default();
        let resolver = TransitiveResolver::new(&source, &options);
        let applied = [AppliedUpdate::new("lib-a", "^3.0.0", false)];
        let mut manifest = manifest();

        resolver.update(&mut manifest, &applied).await;
        let after_first = manifest.clone();
        let second = resolver.update(&mut manifest, &applied).await;

        assert!(second.changes.is_empty());
        assert_eq!(manifest, after_first);
        assert_eq!(second.resolutions.at_level(NarrationLevel::Success).count(), 2);
    }

    #[tokio::test]
    async fn test_unsatisfiable_requirement_is_reported() {
        let source = registry(&[
            ("lib-a", VersionMetadata::new("3.0.0").with_dependency("lib-b", "^5.0.0")),
            ("lib-b", VersionMetadata::new("1.9.0")),
        ]);
        let options = ResolverOptions::default();
        let mut manifest = manifest();

        let outcome = TransitiveResolver::new(&source, &options)
            .update(&mut manifest, &[AppliedUpdate::new("lib-a", "3.0.0", false)])
            .await;

        assert_eq!(manifest.spec_of("lib-b"), Some("1.5.0"));
        assert_eq!(outcome.unresolved.len(), 1);
        assert_eq!(outcome.unresolved[0].package_name, "lib-a");
        assert_eq!(outcome.unresolved[0].conflicts_with_package_name, "lib-b");
        assert!(outcome.resolutions.rendered()[0].starts_with("✗ Unresolved conflict: lib-a@3.0.0 requires lib-b@^5.0.0"));
    }

    #[tokio::test]
    async fn test_bad_applied_update_does_not_stop_others() {
        let source = FailingSource::new(lib_registry(), &["ghost"]);
        let options = ResolverOptions::default();
        let mut manifest = manifest();

        let outcome = TransitiveResolver::new(&source, &options)
            .update(
                &mut manifest,
                &[
                    AppliedUpdate::new("ghost", "1.0.0", false),
                    AppliedUpdate::new("lib-a", "9.9.9", false),
                    AppliedUpdate::new("lib-a", "3.0.0", false),
                ],
            )
            .await;

        let errors: Vec<String> = outcome
            .resolutions
            .at_level(NarrationLevel::Error)
            .map(|line| line.message.clone())
            .collect();
        assert_eq!(errors.len(), 2);
        assert!(errors[0].starts_with("Failed to check dependencies of ghost@1.0.0"));
        assert!(errors[1].contains("version not found in registry"));
        assert_eq!(manifest.spec_of("lib-b"), Some("^2.4.0"));
    }

    #[tokio::test]
    async fn test_unparseable_current_spec_is_an_error() {
        let source = lib_registry();
        let options = ResolverOptions::default();
        let mut manifest = manifest().with_dependency("lib-b", "github:acme/lib-b");

        let outcome = TransitiveResolver::new(&source, &options)
            .update(&mut manifest, &[AppliedUpdate::new("lib-a", "3.0.0", false)])
            .await;

        assert_eq!(manifest.spec_of("lib-b"), Some("github:acme/lib-b"));
        assert_eq!(outcome.resolutions.at_level(NarrationLevel::Error).count(), 1);
    }

    #[tokio::test]
    async fn test_dev_classification_is_preserved() {
        let source = lib_registry();
        let options = ResolverOptions::default();
        let mut manifest = Manifest::new("app", "1.0.0")
            .with_dependency("lib-a", "3.0.0")
            .with_dev_dependency("lib-b", "~1.5.0");

        TransitiveResolver::new(&source, &options)
            .update(&mut manifest, &[AppliedUpdate::new("lib-a", "3.0.0", false)])
            .await;

        assert_eq!(manifest.dev_dependencies.get("lib-b").map(String::as_str), Some("^2.4.0"));
        assert!(!manifest.dependencies.contains_key("lib-b"));
    }

    #[tokio::test]
    async fn test_prerelease_update_is_checked() {
        let source = registry(&[
            ("lib-a", VersionMetadata::new("4.0.0-rc.1").with_dependency("lib-b", "^2.0.0")),
            ("lib-b", VersionMetadata::new("2.1.0")),
        ]);
        let options = ResolverOptions::default();
        let mut manifest = Manifest::new("app", "1.0.0")
            .with_dependency("lib-a", "^4.0.0-rc.1")
            .with_dependency("lib-b", "^1.0.0");

        let outcome = TransitiveResolver::new(&source, &options)
            .update(&mut manifest, &[AppliedUpdate::new("lib-a", "^4.0.0-rc.1", false)])
            .await;

        assert_eq!(manifest.spec_of("lib-b"), Some("^2.1.0"));
        assert_eq!(outcome.resolutions.at_level(NarrationLevel::Error).count(), 0);
    }

    proptest! {
        #[test]
        fn prop_satisfied_requirements_are_untouched(minor in 0u64..10, patch in 0u64..10) {
            let source = lib_registry();
            let options = ResolverOptions::default();
            let installed = format!("2.{}.{}", minor, patch);
            let mut manifest = Manifest::new("app", "1.0.0")
                .with_dependency("lib-a", "3.0.0")
                .with_dependency("lib-b", installed.as_str());

            let outcome = tokio_test::block_on(
                TransitiveResolver::new(&source, &options)
                    .update(&mut manifest, &[AppliedUpdate::new("lib-a", "3.0.0", false)]),
            );

            prop_assert!(outcome.changes.is_empty());
            prop_assert_eq!(manifest.spec_of("lib-b"), Some(installed.as_str()));
        }
    }
}

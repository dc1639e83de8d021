//! Forward conflict detection
//!
//! For every planned update, walks the manifest looking for installed
//! packages whose declared peer range on the updated package rejects the
//! planned target version.

use tokio_util::sync::CancellationToken;
use tracing::debug;

use peerbump_core::types::Manifest;
use peerbump_registry::PackageSource;

use crate::semver::{clean_version, satisfies_range};
use crate::types::{ConflictInfo, ConflictResolution, PlannedUpdate};

/// Detects peer-dependency violations introduced by planned updates
pub struct ConflictAnalyzer<'a> {
    source: &'a dyn PackageSource,
    cancel: CancellationToken,
}

impl<'a> ConflictAnalyzer<'a> {
    pub fn new(source: &'a dyn PackageSource) -> Self {
        Self {
            source,
            cancel: CancellationToken::new(),
        }
    }

    /// Stop between planned updates once `token` is cancelled
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    /// Find every existing package whose peer range rejects a planned target.
    ///
    /// Registry failures become warning lines; analysis of the remaining
    /// packages carries on.
    pub async fn analyze(&self, manifest: &Manifest, planned: &[PlannedUpdate]) -> ConflictResolution {
        let mut result = ConflictResolution::default();
        let existing = manifest.get_all_dependencies();

        for update in planned {
            if self.cancel.is_cancelled() {
                break;
            }

            let Some(target) = clean_version(&update.version) else {
                result.resolutions.warning(format!(
                    "Could not analyze {} for conflicts: '{}' is not a valid version",
                    update.name, update.version
                ));
                continue;
            };
            let target = target.to_string();

            for (existing_name, existing_spec) in &existing {
                if *existing_name == update.name {
                    continue;
                }

                let metadata = match self.source.fetch_package_metadata(existing_name).await {
                    Ok(metadata) => metadata,
                    Err(e) => {
                        result
                            .resolutions
                            .warning(format!("Could not analyze {} for conflicts: {}", existing_name, e));
                        continue;
                    },
                };

                // Unreadable or unpublished current versions carry no facts
                let Some(current) = clean_version(existing_spec) else {
                    continue;
                };
                let Some(peer_range) = metadata
                    .version(&current.to_string())
                    .and_then(|version| version.peer_range(&update.name))
                else {
                    continue;
                };

                if !satisfies_range(&target, peer_range) {
                    debug!(
                        "{}@{} rejects {}@{} (peer range {})",
                        existing_name, current, update.name, target, peer_range
                    );
                    result.conflicts.push(ConflictInfo::new(
                        existing_name.as_str(),
                        existing_spec.as_str(),
                        update.name.as_str(),
                        update.version.as_str(),
                        peer_range,
                    ));
                }
            }
        }

        result
    }
}

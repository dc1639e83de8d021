//! Resolution orchestrator
//!
//! Sequences analysis, conflict resolution, update application and the
//! transitive pass over one manifest. Planned updates flow through a
//! worklist: the caller's updates form the first batch, and suggestions
//! accepted from the oracle form later batches.

mod oracle;

use std::collections::VecDeque;
use std::sync::Arc;

use indexmap::IndexMap;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use peerbump_core::types::{DependencyKind, Manifest};
use peerbump_registry::PackageSource;

use crate::analyzer::ConflictAnalyzer;
use crate::conflict::{check_candidate, check_prerelease, AdviceTable, ConflictResolver};
use crate::range::RangeStyle;
use crate::report::{BumpReason, ManifestChange, Narrative, ResolutionReport};
use crate::semver::{clean_version, pinned_versions, satisfies_range};
use crate::transitive::TransitiveResolver;
use crate::types::{AppliedUpdate, ConflictInfo, PlannedUpdate, Suggestion, SuggestionContext};

pub use oracle::SuggestionOracle;

/// Knobs shared by every resolution component
#[derive(Debug, Clone)]
pub struct ResolverOptions {
    pub range_style: RangeStyle,
    /// Let the conflict scan and transitive picks land on prereleases
    pub allow_prerelease: bool,
    /// How many times the oracle may be consulted in one run
    pub max_suggestion_rounds: usize,
    pub advice: AdviceTable,
}

impl Default for ResolverOptions {
    fn default() -> Self {
        Self {
            range_style: RangeStyle::Caret,
            allow_prerelease: false,
            max_suggestion_rounds: 2,
            advice: AdviceTable::builtin(),
        }
    }
}

/// A queued update and why it is being applied
type Queued = (PlannedUpdate, BumpReason);

/// Mutable state of one run
#[derive(Default)]
struct RunState {
    report: ResolutionReport,
    queue: VecDeque<Queued>,
    planned: Vec<PlannedUpdate>,
    applied: IndexMap<String, AppliedUpdate>,
    pending: Vec<ConflictInfo>,
}

/// Orchestrates one resolution run over a manifest
pub struct ResolutionPipeline {
    source: Arc<dyn PackageSource>,
    oracle: Option<Arc<dyn SuggestionOracle>>,
    options: ResolverOptions,
    cancel: CancellationToken,
}

impl ResolutionPipeline {
    pub fn new(source: Arc<dyn PackageSource>, options: ResolverOptions) -> Self {
        Self {
            source,
            oracle: None,
            options,
            cancel: CancellationToken::new(),
        }
    }

    /// Consult `oracle` when conflicts remain unresolved
    pub fn with_oracle(mut self, oracle: Arc<dyn SuggestionOracle>) -> Self {
        self.oracle = Some(oracle);
        self
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    /// Token that stops the run between top-level iterations
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn options(&self) -> &ResolverOptions {
        &self.options
    }

    /// Report conflicts the planned updates would introduce without touching
    /// the manifest
    pub async fn check(&self, manifest: &Manifest, planned: &[PlannedUpdate]) -> ResolutionReport {
        let mut report = ResolutionReport::default();
        warn_overlaps(manifest, &mut report.resolutions);

        let valid: Vec<PlannedUpdate> = planned
            .iter()
            .filter(|update| keep_valid(update, &mut report.resolutions))
            .cloned()
            .collect();

        let analysis = ConflictAnalyzer::new(self.source.as_ref())
            .with_cancellation(self.cancel.clone())
            .analyze(manifest, &valid)
            .await;
        report.resolutions.append(analysis.resolutions);
        if !valid.is_empty() {
            narrate_conflicts(&analysis.conflicts, &mut report.resolutions);
        }

        report.unresolved = analysis.conflicts.clone();
        report.conflicts = analysis.conflicts;
        report.cancelled = self.cancel.is_cancelled();
        report
    }

    /// Resolve `planned` against `manifest`, mutating it in place.
    ///
    /// Component failures end up in the narrative; the returned report always
    /// accounts for everything that happened, including on cancellation.
    pub async fn run(&self, manifest: &mut Manifest, planned: Vec<PlannedUpdate>) -> ResolutionReport {
        let mut state = RunState::default();
        warn_overlaps(manifest, &mut state.report.resolutions);

        for update in planned {
            if keep_valid(&update, &mut state.report.resolutions) {
                state.queue.push_back((update, BumpReason::Requested));
            }
        }

        let mut round = 0;
        while !state.queue.is_empty() {
            if self.cancel.is_cancelled() {
                return self.finish_cancelled(state);
            }
            round += 1;
            self.run_round(manifest, &mut state).await;
            if self.cancel.is_cancelled() {
                return self.finish_cancelled(state);
            }

            if state.pending.is_empty() || round > self.options.max_suggestion_rounds {
                continue;
            }
            if let Some(oracle) = &self.oracle {
                self.consult(oracle.as_ref(), manifest, round, &mut state).await;
            }
        }

        let applied: Vec<AppliedUpdate> = state.applied.values().cloned().collect();
        if !applied.is_empty() {
            state
                .report
                .resolutions
                .info(format!("Checking requirements of {} updated package(s)", applied.len()));
        }
        let outcome = TransitiveResolver::new(self.source.as_ref(), &self.options)
            .with_cancellation(self.cancel.clone())
            .update(manifest, &applied)
            .await;
        state.report.resolutions.append(outcome.resolutions);
        state.report.changes.extend(outcome.changes);
        state.pending.extend(outcome.unresolved);

        if self.cancel.is_cancelled() {
            return self.finish_cancelled(state);
        }

        let mut report = state.report;
        report.applied = applied;
        report.unresolved = state.pending;
        if state.planned.is_empty() {
            return report;
        }
        if report.unresolved.is_empty() {
            report
                .resolutions
                .success("All peer dependency requirements are satisfied");
        } else {
            report.resolutions.error(format!(
                "{} conflict(s) remain unresolved",
                report.unresolved.len()
            ));
        }
        info!(
            "resolution finished: {} change(s), {} unresolved",
            report.changes.len(),
            report.unresolved.len()
        );
        report
    }

    /// Analyze, resolve and apply one drained batch
    async fn run_round(&self, manifest: &mut Manifest, state: &mut RunState) {
        let batch: Vec<Queued> = state.queue.drain(..).collect();
        let updates: Vec<PlannedUpdate> = batch.iter().map(|(update, _)| update.clone()).collect();
        debug!("round with {} update(s)", updates.len());

        let analysis = ConflictAnalyzer::new(self.source.as_ref())
            .with_cancellation(self.cancel.clone())
            .analyze(manifest, &updates)
            .await;
        state.report.resolutions.append(analysis.resolutions);
        narrate_conflicts(&analysis.conflicts, &mut state.report.resolutions);

        let outcome = ConflictResolver::new(self.source.as_ref(), &self.options)
            .with_cancellation(self.cancel.clone())
            .resolve(manifest, &analysis.conflicts)
            .await;
        state.report.conflicts.extend(analysis.conflicts);
        state.report.resolutions.append(outcome.resolutions);
        state.report.changes.extend(outcome.changes);
        state.pending.extend(outcome.unresolved);
        for update in outcome.resolved {
            state.applied.insert(update.name.clone(), update);
        }

        for (update, reason) in batch {
            apply_update(manifest, &update, reason, state);
        }
        state.planned.extend(updates);
    }

    /// Ask the oracle for alternatives and queue the ones that hold up
    async fn consult(&self, oracle: &dyn SuggestionOracle, manifest: &Manifest, round: usize, state: &mut RunState) {
        let context = SuggestionContext {
            manifest: manifest.clone(),
            planned: state.planned.clone(),
            unresolved: state.pending.clone(),
            round,
        };
        state.report.resolutions.info(format!(
            "Looking for alternatives to {} unresolved conflict(s)",
            state.pending.len()
        ));

        let suggestions = match oracle.suggest_alternatives(&context).await {
            Ok(suggestions) => suggestions,
            Err(e) => {
                state
                    .report
                    .resolutions
                    .error(format!("Could not get suggestions: {}", e));
                return;
            },
        };
        if suggestions.is_empty() {
            state.report.resolutions.info("No alternative versions were suggested");
            return;
        }

        for suggestion in suggestions {
            match self.validate_suggestion(&suggestion, state).await {
                Ok(update) => {
                    state.report.resolutions.info(format!(
                        "Accepted suggestion {}@{}: {}",
                        suggestion.name, suggestion.version, suggestion.reason
                    ));
                    state.pending.retain(|conflict| !conflict.involves(&suggestion.name));
                    state.queue.push_back((
                        update,
                        BumpReason::Suggested {
                            reason: suggestion.reason.clone(),
                        },
                    ));
                },
                Err(why) => {
                    state.report.resolutions.warning(format!(
                        "Rejected suggestion {}@{}: {}",
                        suggestion.name, suggestion.version, why
                    ));
                },
            }
        }
    }

    /// Run a suggestion through the same checks as any other candidate
    async fn validate_suggestion(&self, suggestion: &Suggestion, state: &RunState) -> Result<PlannedUpdate, String> {
        let clean = clean_version(&suggestion.version)
            .ok_or_else(|| format!("'{}' is not a valid version", suggestion.version))?;

        let already_planned = state
            .planned
            .iter()
            .chain(state.queue.iter().map(|(update, _)| update))
            .any(|update| update.name == suggestion.name && clean_version(&update.version).as_ref() == Some(&clean));
        if already_planned {
            return Err("already planned".to_string());
        }

        let metadata = self
            .source
            .fetch_package_metadata(&suggestion.name)
            .await
            .map_err(|e| e.to_string())?;
        let (version, published) = pinned_versions(&suggestion.version)
            .into_iter()
            .find_map(|version| metadata.version(&version.to_string()).map(|published| (version, published)))
            .ok_or_else(|| format!("{}@{} is not published", suggestion.name, suggestion.version))?;
        check_prerelease(&version, self.options.allow_prerelease)
            .map_err(|why| format!("{}@{} {}", suggestion.name, version, why))?;

        let addressed: Vec<&ConflictInfo> = state
            .pending
            .iter()
            .filter(|conflict| conflict.involves(&suggestion.name))
            .collect();
        if addressed.is_empty() {
            return Err("it does not touch any unresolved conflict".to_string());
        }

        for conflict in addressed {
            if conflict.package_name == suggestion.name {
                let target = clean_version(&conflict.conflicts_with_version).ok_or_else(|| {
                    format!(
                        "'{}' is not a valid version of {}",
                        conflict.conflicts_with_version, conflict.conflicts_with_package_name
                    )
                })?;
                check_candidate(
                    published,
                    &version,
                    &conflict.conflicts_with_package_name,
                    &target.to_string(),
                    self.options.allow_prerelease,
                )
                .map_err(|why| format!("{}@{} {}", suggestion.name, version, why))?;
            } else if !satisfies_range(&version.to_string(), &conflict.peer_range) {
                return Err(format!(
                    "{}@{} requires {}@{}",
                    conflict.package_name, conflict.current_version, suggestion.name, conflict.peer_range
                ));
            }
        }

        Ok(PlannedUpdate {
            name: suggestion.name.clone(),
            version: suggestion.version.clone(),
            is_dev: suggestion.is_dev,
        })
    }

    fn finish_cancelled(&self, state: RunState) -> ResolutionReport {
        let mut report = state.report;
        report.applied = state.applied.into_values().collect();
        report.unresolved = state.pending;
        report.cancelled = true;
        report.resolutions.warning(format!(
            "Resolution cancelled; {} update(s) already applied remain in the manifest",
            report.applied.len()
        ));
        report
    }
}

/// Write a planned update into the bucket its package already lives in
fn apply_update(manifest: &mut Manifest, update: &PlannedUpdate, reason: BumpReason, state: &mut RunState) {
    let is_dev = if manifest.contains(&update.name) {
        manifest.is_dev_dependency(&update.name)
    } else {
        update.is_dev
    };
    let bucket = DependencyKind::from_dev_flag(is_dev);
    let previous = manifest.spec_of(&update.name).map(str::to_string);
    let resolutions = &mut state.report.resolutions;

    if previous.as_deref() == Some(update.version.as_str()) {
        resolutions.info(format!("{} is already at {}", update.name, update.version));
    } else {
        manifest.update_dependency(&update.name, update.version.clone(), is_dev);
        match &previous {
            Some(from) => resolutions.success(format!(
                "Updated {} from {} to {} in {}",
                update.name,
                from,
                update.version,
                bucket.section()
            )),
            None => resolutions.success(format!(
                "Added {}@{} to {}",
                update.name,
                update.version,
                bucket.section()
            )),
        }
        state.report.changes.push(ManifestChange {
            name: update.name.clone(),
            from: previous,
            to: update.version.clone(),
            bucket,
            reason,
        });
    }

    state.applied.insert(
        update.name.clone(),
        AppliedUpdate::new(update.name.as_str(), update.version.as_str(), is_dev),
    );
}

fn warn_overlaps(manifest: &Manifest, resolutions: &mut Narrative) {
    for name in manifest.overlapping_names() {
        resolutions.warning(format!(
            "{} is declared in both dependencies and devDependencies; updates will target devDependencies",
            name
        ));
    }
}

fn keep_valid(update: &PlannedUpdate, resolutions: &mut Narrative) -> bool {
    if clean_version(&update.version).is_some() {
        return true;
    }
    resolutions.error(format!(
        "Skipping {}: '{}' is not a valid version",
        update.name, update.version
    ));
    false
}

fn narrate_conflicts(conflicts: &[ConflictInfo], resolutions: &mut Narrative) {
    if conflicts.is_empty() {
        resolutions.success("No peer dependency conflicts found");
    } else {
        resolutions.warning(format!("Found {} peer dependency conflict(s)", conflicts.len()));
    }
}

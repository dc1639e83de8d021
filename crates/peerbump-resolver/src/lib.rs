//! Peer dependency conflict detection and resolution for peerbump
//!
//! Given a manifest and a list of planned updates, this crate works out
//! what else must change so every peer dependency range in the tree still
//! holds, rewrites the manifest accordingly and narrates each decision.
//!
//! The engine is greedy and newest-first rather than a full solver:
//! - `analyzer` finds existing packages whose peer ranges reject a target
//! - `conflict` bumps those packages to their newest compatible release
//! - `transitive` checks the requirements of every updated package
//! - `pipeline` sequences the three and consults an optional oracle

pub mod analyzer;
pub mod conflict;
pub mod pipeline;
pub mod range;
pub mod report;
pub mod semver;
pub mod transitive;
pub mod types;

#[cfg(test)]
mod test_support;

// Re-export main types
pub use analyzer::ConflictAnalyzer;
pub use conflict::{
    check_candidate, AdviceRule, AdviceTable, CandidateRejection, ConflictOutcome, ConflictResolver, MatchKind,
};
pub use pipeline::{ResolutionPipeline, ResolverOptions, SuggestionOracle};
pub use range::RangeStyle;
pub use report::{BumpReason, ManifestChange, Narration, NarrationLevel, Narrative, ResolutionReport};
pub use semver::{clean_version, find_best_satisfying, pinned_versions, satisfies_range, VersionSelector};
pub use transitive::{TransitiveOutcome, TransitiveResolver};
pub use types::{AppliedUpdate, ConflictInfo, ConflictResolution, PlannedUpdate, Suggestion, SuggestionContext};

use peerbump_core::error::BumpError;

/// Result type for resolver operations
pub type ResolverResult<T> = Result<T, BumpError>;

//! Narration lines, provenance records and the final resolution report

use std::fmt;

use serde::Serialize;

use peerbump_core::types::DependencyKind;

use crate::types::{AppliedUpdate, ConflictInfo};

/// Semantic marker of a narration line
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NarrationLevel {
    Info,
    Success,
    Warning,
    Error,
    Tip,
}

impl NarrationLevel {
    /// Marker printed in front of the message
    pub fn marker(&self) -> &'static str {
        match self {
            NarrationLevel::Info => "ℹ",
            NarrationLevel::Success => "✓",
            NarrationLevel::Warning => "⚠",
            NarrationLevel::Error => "✗",
            NarrationLevel::Tip => "💡",
        }
    }
}

/// One human-readable decision record
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Narration {
    pub level: NarrationLevel,
    pub message: String,
}

impl fmt::Display for Narration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.level.marker(), self.message)
    }
}

/// Append-only, ordered log of narration lines
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Narrative {
    lines: Vec<Narration>,
}

impl Narrative {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, level: NarrationLevel, message: impl Into<String>) {
        self.lines.push(Narration {
            level,
            message: message.into(),
        });
    }

    pub fn info(&mut self, message: impl Into<String>) {
        self.push(NarrationLevel::Info, message);
    }

    pub fn success(&mut self, message: impl Into<String>) {
        self.push(NarrationLevel::Success, message);
    }

    pub fn warning(&mut self, message: impl Into<String>) {
        self.push(NarrationLevel::Warning, message);
    }

    pub fn error(&mut self, message: impl Into<String>) {
        self.push(NarrationLevel::Error, message);
    }

    pub fn tip(&mut self, message: impl Into<String>) {
        self.push(NarrationLevel::Tip, message);
    }

    /// Move every line of `other` to the end of this log
    pub fn append(&mut self, other: Narrative) {
        self.lines.extend(other.lines);
    }

    pub fn iter(&self) -> impl Iterator<Item = &Narration> {
        self.lines.iter()
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Lines at one level, in order
    pub fn at_level(&self, level: NarrationLevel) -> impl Iterator<Item = &Narration> {
        self.lines.iter().filter(move |line| line.level == level)
    }

    /// Rendered `marker message` strings
    pub fn rendered(&self) -> Vec<String> {
        self.lines.iter().map(ToString::to_string).collect()
    }
}

impl<'a> IntoIterator for &'a Narrative {
    type Item = &'a Narration;
    type IntoIter = std::slice::Iter<'a, Narration>;

    fn into_iter(self) -> Self::IntoIter {
        self.lines.iter()
    }
}

/// Why a manifest entry was rewritten
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum BumpReason {
    /// Listed in the caller's planned updates
    Requested,
    /// Bumped so its peer range accepts `with@version`
    #[serde(rename_all = "camelCase")]
    PeerConflict { with: String, version: String },
    /// Bumped because an updated package requires `range`
    #[serde(rename_all = "camelCase")]
    Transitive { required_by: String, range: String },
    /// Accepted from the suggestion oracle
    Suggested { reason: String },
}

impl fmt::Display for BumpReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BumpReason::Requested => write!(f, "requested"),
            BumpReason::PeerConflict { with, version } => {
                write!(f, "peer dependency on {} {}", with, version)
            },
            BumpReason::Transitive { required_by, range } => {
                write!(f, "required by {} ({})", required_by, range)
            },
            BumpReason::Suggested { reason } => write!(f, "suggested: {}", reason),
        }
    }
}

/// Provenance of one manifest mutation
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ManifestChange {
    pub name: String,
    /// Previous specifier; `None` when the package was added
    pub from: Option<String>,
    pub to: String,
    pub bucket: DependencyKind,
    pub reason: BumpReason,
}

/// Everything one resolution run decided
#[derive(Debug, Clone, Default, Serialize)]
pub struct ResolutionReport {
    /// Every conflict the analyzer found, in discovery order
    pub conflicts: Vec<ConflictInfo>,
    /// Conflicts still standing at the end of the run
    pub unresolved: Vec<ConflictInfo>,
    pub resolutions: Narrative,
    pub changes: Vec<ManifestChange>,
    pub applied: Vec<AppliedUpdate>,
    pub cancelled: bool,
}

impl ResolutionReport {
    /// No unresolved conflict and the run finished
    pub fn is_clean(&self) -> bool {
        self.unresolved.is_empty() && !self.cancelled
    }

    /// Most recent change recorded for a package
    pub fn change_for(&self, name: &str) -> Option<&ManifestChange> {
        self.changes.iter().rev().find(|change| change.name == name)
    }

    /// Names whose manifest entry changed, first change first
    pub fn changed_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = Vec::new();
        for change in &self.changes {
            if !names.contains(&change.name.as_str()) {
                names.push(&change.name);
            }
        }
        names
    }
}

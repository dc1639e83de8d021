//! Semantic version types and npm-style range matching.
//!
//! Provides `Version` and `VersionReq` following the semantic versioning
//! precedence rules and the range grammar used by npm registry metadata
//! (`^1.2.3`, `~2.0`, `1.2.x`, `>=1.0.0 <2.0.0`, `1 - 2`, `^1 || ^2`).

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Semantic version (major.minor.patch-prerelease+build)
#[derive(Debug, Clone, Eq, Serialize, Deserialize)]
pub struct Version {
    pub major: u64,
    pub minor: u64,
    pub patch: u64,
    pub prerelease: Option<String>,
    pub build: Option<String>,
}

/// Version requirement: one or more comparator sets joined by `||`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionReq {
    pub sets: Vec<ComparatorSet>,
    raw: String,
}

/// Comparators that must all match (space separated in the source range)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComparatorSet {
    pub comparators: Vec<Comparator>,
}

/// Individual version comparator
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Comparator {
    pub op: Op,
    pub version: PartialVersion,
}

/// Comparison operator for version requirements
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Op {
    Exact,     // =1.0.0
    Greater,   // >1.0.0
    GreaterEq, // >=1.0.0
    Less,      // <1.0.0
    LessEq,    // <=1.0.0
    Tilde,     // ~1.0.0
    Caret,     // ^1.0.0
    Wildcard,  // *
}

/// Partial version for comparisons (may have missing components)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartialVersion {
    pub major: u64,
    pub minor: Option<u64>,
    pub patch: Option<u64>,
    pub prerelease: Option<String>,
}

/// Version parsing and validation errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum VersionError {
    #[error("Invalid version format: {input}")]
    InvalidFormat { input: String },

    #[error("Invalid number in version: {component}")]
    InvalidNumber { component: String },

    #[error("Invalid prerelease identifier: {prerelease}")]
    InvalidPrerelease { prerelease: String },

    #[error("Invalid build metadata: {build}")]
    InvalidBuild { build: String },
}

/// One end of the interval a comparator admits
#[derive(Debug, Clone)]
struct Bound {
    version: Version,
    inclusive: bool,
}

impl Version {
    /// Create a new version
    pub fn new(major: u64, minor: u64, patch: u64) -> Self {
        Self {
            major,
            minor,
            patch,
            prerelease: None,
            build: None,
        }
    }

    /// Check if this version satisfies a version requirement
    pub fn satisfies(&self, req: &VersionReq) -> bool {
        req.matches(self)
    }

    /// Check if this is a prerelease version
    pub fn is_prerelease(&self) -> bool {
        self.prerelease.is_some()
    }

    /// Coerce an arbitrary specifier into a release version.
    ///
    /// Takes the first run of `major[.minor[.patch]]` digits found anywhere in
    /// the input, fills missing components with zero and drops any prerelease
    /// or build suffix. `^1.2.3` gives `1.2.3`, `1.2.x` gives `1.2.0`,
    /// `>=1 <2` gives `1.0.0`; input without digits gives `None`.
    pub fn coerce(input: &str) -> Option<Self> {
        let bytes = input.as_bytes();
        let start = bytes.iter().position(u8::is_ascii_digit)?;

        let mut parts = [0u64; 3];
        let mut count = 0;
        let mut pos = start;
        loop {
            let run_start = pos;
            while pos < bytes.len() && bytes[pos].is_ascii_digit() {
                pos += 1;
            }
            parts[count] = input[run_start..pos].parse().ok()?;
            count += 1;

            let continues = count < 3
                && pos + 1 < bytes.len()
                && bytes[pos] == b'.'
                && bytes[pos + 1].is_ascii_digit();
            if !continues {
                break;
            }
            pos += 1;
        }

        Some(Self::new(parts[0], parts[1], parts[2]))
    }

    /// The same version with prerelease and build metadata removed
    pub fn release(&self) -> Self {
        Self::new(self.major, self.minor, self.patch)
    }

    fn same_release(&self, other: &Self) -> bool {
        (self.major, self.minor, self.patch) == (other.major, other.minor, other.patch)
    }

    /// Get the precedence for comparison (ignores build metadata)
    fn precedence_cmp(&self, other: &Self) -> Ordering {
        match (self.major, self.minor, self.patch).cmp(&(other.major, other.minor, other.patch)) {
            Ordering::Equal => match (&self.prerelease, &other.prerelease) {
                (None, None) => Ordering::Equal,
                (Some(_), None) => Ordering::Less,    // prerelease < normal
                (None, Some(_)) => Ordering::Greater, // normal > prerelease
                (Some(a), Some(b)) => compare_prerelease(a, b),
            },
            other => other,
        }
    }
}

/// Compare dot-separated prerelease identifiers (numeric ones numerically)
fn compare_prerelease(a: &str, b: &str) -> Ordering {
    let mut left = a.split('.');
    let mut right = b.split('.');
    loop {
        match (left.next(), right.next()) {
            (None, None) => return Ordering::Equal,
            (None, Some(_)) => return Ordering::Less,
            (Some(_), None) => return Ordering::Greater,
            (Some(x), Some(y)) => {
                let ordering = match (x.parse::<u64>(), y.parse::<u64>()) {
                    (Ok(x), Ok(y)) => x.cmp(&y),
                    (Ok(_), Err(_)) => Ordering::Less,
                    (Err(_), Ok(_)) => Ordering::Greater,
                    (Err(_), Err(_)) => x.cmp(y),
                };
                if ordering != Ordering::Equal {
                    return ordering;
                }
            },
        }
    }
}

fn parse_component(component: &str) -> Result<u64, VersionError> {
    if component.is_empty() || !component.bytes().all(|b| b.is_ascii_digit()) {
        return Err(VersionError::InvalidNumber {
            component: component.to_string(),
        });
    }
    component.parse().map_err(|_| VersionError::InvalidNumber {
        component: component.to_string(),
    })
}

fn is_valid_identifier_list(value: &str) -> bool {
    !value.is_empty()
        && value.split('.').all(|ident| {
            !ident.is_empty() && ident.chars().all(|c| c.is_ascii_alphanumeric() || c == '-')
        })
}

impl FromStr for Version {
    type Err = VersionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let input = s.trim();
        let unprefixed = input.strip_prefix(['v', 'V']).unwrap_or(input);

        // Split on '+' for build metadata
        let (version_part, build) = match unprefixed.split_once('+') {
            Some((v, b)) => (v, Some(b.to_string())),
            None => (unprefixed, None),
        };

        // Split on '-' for prerelease
        let (core_part, prerelease) = match version_part.split_once('-') {
            Some((c, p)) => (c, Some(p.to_string())),
            None => (version_part, None),
        };

        if let Some(ref pre) = prerelease {
            if !is_valid_identifier_list(pre) {
                return Err(VersionError::InvalidPrerelease {
                    prerelease: pre.clone(),
                });
            }
        }
        if let Some(ref build) = build {
            if !is_valid_identifier_list(build) {
                return Err(VersionError::InvalidBuild {
                    build: build.clone(),
                });
            }
        }

        // Parse major.minor.patch
        let parts: Vec<&str> = core_part.split('.').collect();
        if parts.len() != 3 {
            return Err(VersionError::InvalidFormat {
                input: input.to_string(),
            });
        }

        Ok(Version {
            major: parse_component(parts[0])?,
            minor: parse_component(parts[1])?,
            patch: parse_component(parts[2])?,
            prerelease,
            build,
        })
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)?;

        if let Some(ref pre) = self.prerelease {
            write!(f, "-{}", pre)?;
        }

        if let Some(ref build) = self.build {
            write!(f, "+{}", build)?;
        }

        Ok(())
    }
}

impl PartialEq for Version {
    fn eq(&self, other: &Self) -> bool {
        self.precedence_cmp(other) == Ordering::Equal
    }
}

impl PartialOrd for Version {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Version {
    fn cmp(&self, other: &Self) -> Ordering {
        self.precedence_cmp(other)
    }
}

impl VersionReq {
    /// Requirement that matches every release version
    pub fn any() -> Self {
        Self {
            sets: vec![ComparatorSet::any()],
            raw: "*".to_string(),
        }
    }

    /// Parse a version requirement string
    pub fn parse(input: &str) -> Result<Self, VersionError> {
        let raw = input.trim();
        let sets = raw
            .split("||")
            .map(ComparatorSet::parse)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(VersionReq {
            sets,
            raw: raw.to_string(),
        })
    }

    /// Check if a version matches this requirement
    pub fn matches(&self, version: &Version) -> bool {
        self.sets.iter().any(|set| set.matches(version))
    }

    /// The requirement as written
    pub fn as_str(&self) -> &str {
        &self.raw
    }
}

impl FromStr for VersionReq {
    type Err = VersionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for VersionReq {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

impl ComparatorSet {
    fn any() -> Self {
        Self {
            comparators: vec![Comparator::wildcard()],
        }
    }

    fn parse(input: &str) -> Result<Self, VersionError> {
        let input = input.trim();
        if input.is_empty() {
            return Ok(Self::any());
        }

        // Hyphen range: "1.2.3 - 2.3.4"
        if let Some((from, to)) = input.split_once(" - ") {
            let mut comparators = Vec::with_capacity(2);
            if let Some(lower) = PartialVersion::parse(from)? {
                comparators.push(Comparator { op: Op::GreaterEq, version: lower });
            }
            if let Some(upper) = PartialVersion::parse(to)? {
                comparators.push(Comparator { op: Op::LessEq, version: upper });
            }
            if comparators.is_empty() {
                comparators.push(Comparator::wildcard());
            }
            return Ok(Self { comparators });
        }

        let comparators = tokenize(input)
            .iter()
            .map(|token| Comparator::parse(token))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self { comparators })
    }

    /// All comparators match, and a prerelease is only admitted when some
    /// comparator names a prerelease of the same major.minor.patch
    pub fn matches(&self, version: &Version) -> bool {
        if !self.comparators.iter().all(|comp| comp.matches(version)) {
            return false;
        }

        if !version.is_prerelease() {
            return true;
        }

        self.comparators.iter().any(|comp| {
            comp.version.prerelease.is_some()
                && comp.version.minor.is_some()
                && comp.version.patch.is_some()
                && comp.version.to_version().same_release(version)
        })
    }
}

/// Split a comparator set on whitespace, re-attaching operators written
/// with a space before their version (`>= 1.2.3`)
fn tokenize(input: &str) -> Vec<String> {
    let mut tokens: Vec<String> = Vec::new();
    let mut pending_op: Option<&str> = None;

    for word in input.split_whitespace() {
        let is_bare_op = matches!(word, ">=" | "<=" | ">" | "<" | "=" | "^" | "~" | "~>");
        match (pending_op.take(), is_bare_op) {
            (Some(op), false) => tokens.push(format!("{}{}", op, word)),
            (Some(op), true) => {
                tokens.push(op.to_string());
                pending_op = Some(word);
            },
            (None, true) => pending_op = Some(word),
            (None, false) => tokens.push(word.to_string()),
        }
    }

    if let Some(op) = pending_op {
        tokens.push(op.to_string());
    }

    tokens
}

impl Comparator {
    fn wildcard() -> Self {
        Self {
            op: Op::Wildcard,
            version: PartialVersion {
                major: 0,
                minor: None,
                patch: None,
                prerelease: None,
            },
        }
    }

    fn parse(token: &str) -> Result<Self, VersionError> {
        // Parse operator prefix
        let (op, version_str) = if let Some(stripped) = token.strip_prefix(">=") {
            (Op::GreaterEq, stripped)
        } else if let Some(stripped) = token.strip_prefix("<=") {
            (Op::LessEq, stripped)
        } else if let Some(stripped) = token.strip_prefix('>') {
            (Op::Greater, stripped)
        } else if let Some(stripped) = token.strip_prefix('<') {
            (Op::Less, stripped)
        } else if let Some(stripped) = token.strip_prefix('=') {
            (Op::Exact, stripped)
        } else if let Some(stripped) = token.strip_prefix('^') {
            (Op::Caret, stripped)
        } else if let Some(stripped) = token.strip_prefix("~>") {
            (Op::Tilde, stripped)
        } else if let Some(stripped) = token.strip_prefix('~') {
            (Op::Tilde, stripped)
        } else {
            (Op::Exact, token)
        };

        match PartialVersion::parse(version_str)? {
            Some(version) => Ok(Comparator { op, version }),
            // ">*" and "<*" admit nothing; reject rather than guess
            None if matches!(op, Op::Greater | Op::Less) => Err(VersionError::InvalidFormat {
                input: token.to_string(),
            }),
            None => Ok(Comparator::wildcard()),
        }
    }

    /// Check if a version matches this comparator
    pub fn matches(&self, version: &Version) -> bool {
        let (lower, upper) = self.bounds();

        let above_lower = lower.map_or(true, |bound| {
            if bound.inclusive {
                version >= &bound.version
            } else {
                version > &bound.version
            }
        });
        let below_upper = upper.map_or(true, |bound| {
            if bound.inclusive {
                version <= &bound.version
            } else {
                version < &bound.version
            }
        });

        above_lower && below_upper
    }

    /// Interval of versions admitted by this comparator
    fn bounds(&self) -> (Option<Bound>, Option<Bound>) {
        let partial = &self.version;
        let floor = partial.to_version();

        match self.op {
            Op::Wildcard => (None, None),
            Op::Exact if partial.is_complete() => (
                Some(Bound::inclusive(floor.clone())),
                Some(Bound::inclusive(floor)),
            ),
            Op::Exact => (Some(Bound::inclusive(floor)), Some(Bound::exclusive(partial.next_unspecified()))),
            Op::Greater if partial.is_complete() => (Some(Bound::exclusive(floor)), None),
            Op::Greater => (Some(Bound::inclusive(partial.next_unspecified())), None),
            Op::GreaterEq => (Some(Bound::inclusive(floor)), None),
            Op::Less => (None, Some(Bound::exclusive(floor))),
            Op::LessEq if partial.is_complete() => (None, Some(Bound::inclusive(floor))),
            Op::LessEq => (None, Some(Bound::exclusive(partial.next_unspecified()))),
            Op::Tilde => {
                let upper = match partial.minor {
                    Some(minor) => Version::new(partial.major, minor + 1, 0),
                    None => Version::new(partial.major + 1, 0, 0),
                };
                (Some(Bound::inclusive(floor)), Some(Bound::exclusive(upper)))
            },
            Op::Caret => (Some(Bound::inclusive(floor)), Some(Bound::exclusive(partial.caret_ceiling()))),
        }
    }
}

impl Bound {
    fn inclusive(version: Version) -> Self {
        Self { version, inclusive: true }
    }

    fn exclusive(version: Version) -> Self {
        Self { version, inclusive: false }
    }
}

impl PartialVersion {
    /// Parse `1`, `1.2`, `1.2.x`, `1.2.3-beta.1`; `Ok(None)` for a bare wildcard
    fn parse(input: &str) -> Result<Option<Self>, VersionError> {
        let input = input.trim();
        let input = input.strip_prefix('=').unwrap_or(input);
        let input = input.strip_prefix(['v', 'V']).unwrap_or(input);

        if input.is_empty() {
            return Err(VersionError::InvalidFormat {
                input: input.to_string(),
            });
        }

        let version_part = input.split_once('+').map_or(input, |(v, _)| v);
        let (core_part, prerelease) = match version_part.split_once('-') {
            Some((c, p)) => (c, Some(p.to_string())),
            None => (version_part, None),
        };

        let parts: Vec<&str> = core_part.split('.').collect();
        if parts.len() > 3 {
            return Err(VersionError::InvalidFormat {
                input: input.to_string(),
            });
        }

        let mut numbers: [Option<u64>; 3] = [None; 3];
        for (slot, part) in numbers.iter_mut().zip(&parts) {
            if matches!(*part, "x" | "X" | "*") {
                break;
            }
            *slot = Some(parse_component(part)?);
        }

        let Some(major) = numbers[0] else {
            return Ok(None);
        };

        // Range ceilings step one past a component, so u64::MAX has no successor
        if let Some(component) = numbers.iter().flatten().find(|&&n| n == u64::MAX) {
            return Err(VersionError::InvalidNumber {
                component: component.to_string(),
            });
        }

        if let Some(ref pre) = prerelease {
            if numbers[2].is_none() || !is_valid_identifier_list(pre) {
                return Err(VersionError::InvalidPrerelease {
                    prerelease: pre.clone(),
                });
            }
        }

        Ok(Some(PartialVersion {
            major,
            minor: numbers[1],
            patch: numbers[2],
            prerelease,
        }))
    }

    fn is_complete(&self) -> bool {
        self.minor.is_some() && self.patch.is_some()
    }

    /// Convert to a full version (filling missing parts with 0)
    pub fn to_version(&self) -> Version {
        Version {
            major: self.major,
            minor: self.minor.unwrap_or(0),
            patch: self.patch.unwrap_or(0),
            prerelease: self.prerelease.clone(),
            build: None,
        }
    }

    /// First version past the last specified component (`1.2` -> `1.3.0`)
    fn next_unspecified(&self) -> Version {
        match (self.minor, self.patch) {
            (None, _) => Version::new(self.major + 1, 0, 0),
            (Some(minor), None) => Version::new(self.major, minor + 1, 0),
            (Some(minor), Some(patch)) => Version::new(self.major, minor, patch + 1),
        }
    }

    /// Exclusive upper bound of a caret range: the left-most non-zero component is locked
    fn caret_ceiling(&self) -> Version {
        if self.major > 0 {
            return Version::new(self.major + 1, 0, 0);
        }
        match (self.minor, self.patch) {
            (None, _) => Version::new(1, 0, 0),
            (Some(minor), _) if minor > 0 => Version::new(0, minor + 1, 0),
            (Some(_), None) => Version::new(0, 1, 0),
            (Some(_), Some(patch)) => Version::new(0, 0, patch + 1),
        }
    }
}

impl fmt::Display for Op {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let symbol = match self {
            Op::Exact => "=",
            Op::Greater => ">",
            Op::GreaterEq => ">=",
            Op::Less => "<",
            Op::LessEq => "<=",
            Op::Tilde => "~",
            Op::Caret => "^",
            Op::Wildcard => "*",
        };
        f.write_str(symbol)
    }
}

//! How automatically chosen versions are written back to the manifest

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use peerbump_core::error::BumpError;
use peerbump_core::types::Version;

/// Range style for auto-applied versions
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RangeStyle {
    /// Always `^x.y.z`
    #[default]
    Caret,
    /// Keep the entry's previous operator (exact, `~` or `^`)
    Preserve,
}

impl RangeStyle {
    /// Specifier for `version`, given the entry's previous specifier
    pub fn format(&self, previous: Option<&str>, version: &Version) -> String {
        match self {
            RangeStyle::Caret => format!("^{}", version),
            RangeStyle::Preserve => match previous.map(str::trim) {
                Some(spec) if spec.starts_with('~') => format!("~{}", version),
                Some(spec) if is_exact_pin(spec) => version.to_string(),
                _ => format!("^{}", version),
            },
        }
    }
}

fn is_exact_pin(spec: &str) -> bool {
    Version::from_str(spec.strip_prefix('=').unwrap_or(spec)).is_ok()
}

impl FromStr for RangeStyle {
    type Err = BumpError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "caret" => Ok(RangeStyle::Caret),
            "preserve" => Ok(RangeStyle::Preserve),
            other => Err(BumpError::ConfigValidation {
                field: "resolver.range-style".to_string(),
                reason: format!("expected 'caret' or 'preserve', got '{}'", other),
            }),
        }
    }
}

impl fmt::Display for RangeStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RangeStyle::Caret => write!(f, "caret"),
            RangeStyle::Preserve => write!(f, "preserve"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_caret_always_relaxes() {
        let version = Version::new(2, 4, 0);
        for previous in [None, Some("1.5.0"), Some("~1.5.0"), Some(">=1")] {
            assert_eq!(RangeStyle::Caret.format(previous, &version), "^2.4.0");
        }
    }

    #[test]
    fn test_preserve_keeps_operator() {
        let version = Version::new(2, 4, 0);
        let style = RangeStyle::Preserve;

        assert_eq!(style.format(Some("1.5.0"), &version), "2.4.0");
        assert_eq!(style.format(Some("=1.5.0"), &version), "2.4.0");
        assert_eq!(style.format(Some("~1.5.0"), &version), "~2.4.0");
        assert_eq!(style.format(Some("^1.5.0"), &version), "^2.4.0");
        assert_eq!(style.format(Some(">=1.0.0 <2"), &version), "^2.4.0");
        assert_eq!(style.format(None, &version), "^2.4.0");
    }

    #[test]
    fn test_parse_style() {
        assert_eq!("caret".parse::<RangeStyle>().unwrap(), RangeStyle::Caret);
        assert_eq!("Preserve".parse::<RangeStyle>().unwrap(), RangeStyle::Preserve);
        assert!(matches!(
            "tilde".parse::<RangeStyle>(),
            Err(BumpError::ConfigValidation { .. })
        ));
        assert_eq!(RangeStyle::default().to_string(), "caret");
    }
}

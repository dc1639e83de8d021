//! peerbump.toml configuration parsing and serialization

use serde::{Deserialize, Serialize};

use crate::ConfigResult;
use peerbump_core::error::BumpError;

/// Accepted values of `resolver.range-style`
pub const RANGE_STYLES: [&str; 2] = ["caret", "preserve"];

/// Accepted values of `advice.match`
pub const MATCH_KINDS: [&str; 2] = ["prefix", "contains"];

/// Complete peerbump.toml configuration.
///
/// Every scalar is optional so that layers can be merged field by field;
/// the binary fills in defaults for whatever is still unset.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PeerbumpToml {
    /// Registry access
    #[serde(default)]
    pub registry: RegistrySection,

    /// Resolution policy
    #[serde(default)]
    pub resolver: ResolverSection,

    /// Extra advice rules appended to the built-in table
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub advice: Vec<AdviceSection>,
}

/// `[registry]` section
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct RegistrySection {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,

    /// Bearer token sent with every request
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_retries: Option<u32>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,

    /// Lifetime of cached packuments
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cache_ttl_secs: Option<u64>,
}

/// `[resolver]` section
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct ResolverSection {
    /// `caret` or `preserve`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub range_style: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub allow_prerelease: Option<bool>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_suggestion_rounds: Option<usize>,
}

/// One `[[advice]]` entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AdviceSection {
    pub pattern: String,

    /// `prefix` or `contains`
    #[serde(rename = "match", default = "default_match")]
    pub match_kind: String,

    /// Tip text with `{package}`, `{target}` and `{version}` placeholders
    pub template: String,
}

fn default_match() -> String {
    "prefix".to_string()
}

impl PeerbumpToml {
    /// Overlay `other` on top of `self`: set fields win, advice rules append
    pub fn overlay(mut self, other: PeerbumpToml) -> Self {
        let registry = other.registry;
        self.registry.url = registry.url.or(self.registry.url);
        self.registry.token = registry.token.or(self.registry.token);
        self.registry.max_retries = registry.max_retries.or(self.registry.max_retries);
        self.registry.timeout_secs = registry.timeout_secs.or(self.registry.timeout_secs);
        self.registry.cache_ttl_secs = registry.cache_ttl_secs.or(self.registry.cache_ttl_secs);

        let resolver = other.resolver;
        self.resolver.range_style = resolver.range_style.or(self.resolver.range_style);
        self.resolver.allow_prerelease = resolver.allow_prerelease.or(self.resolver.allow_prerelease);
        self.resolver.max_suggestion_rounds =
            resolver.max_suggestion_rounds.or(self.resolver.max_suggestion_rounds);

        self.advice.extend(other.advice);
        self
    }
}

/// Parse TOML string to PeerbumpToml configuration
pub fn parse_peerbump_toml(content: &str) -> ConfigResult<PeerbumpToml> {
    // Syntax pass first, it reports precise locations
    content
        .parse::<toml_edit::DocumentMut>()
        .map_err(|e| toml_error(content, e.message(), e.span()))?;

    let config: PeerbumpToml =
        toml::from_str(content).map_err(|e| toml_error(content, e.message(), e.span()))?;

    validate_config(&config)?;

    Ok(config)
}

/// Serialize PeerbumpToml to TOML string
pub fn serialize_peerbump_toml(config: &PeerbumpToml) -> ConfigResult<String> {
    toml::to_string_pretty(config).map_err(|e| BumpError::TomlParse {
        message: format!("serialization failed: {}", e),
        line: 0,
        column: 0,
    })
}

/// Validate field values the type system cannot express
pub fn validate_config(config: &PeerbumpToml) -> ConfigResult<()> {
    if let Some(url) = &config.registry.url {
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(invalid("registry.url", format!("'{}' must be an http(s) URL", url)));
        }
    }

    if config.registry.timeout_secs == Some(0) {
        return Err(invalid("registry.timeout-secs", "must be greater than zero"));
    }

    if let Some(style) = &config.resolver.range_style {
        if !RANGE_STYLES.contains(&style.as_str()) {
            return Err(invalid(
                "resolver.range-style",
                format!("'{}' is not one of {}", style, RANGE_STYLES.join(", ")),
            ));
        }
    }

    for (index, rule) in config.advice.iter().enumerate() {
        if rule.pattern.is_empty() {
            return Err(invalid(format!("advice[{}].pattern", index), "must not be empty"));
        }
        if !MATCH_KINDS.contains(&rule.match_kind.as_str()) {
            return Err(invalid(
                format!("advice[{}].match", index),
                format!("'{}' is not one of {}", rule.match_kind, MATCH_KINDS.join(", ")),
            ));
        }
        if rule.template.trim().is_empty() {
            return Err(invalid(format!("advice[{}].template", index), "must not be empty"));
        }
    }

    Ok(())
}

/// Load and parse peerbump.toml from file path
pub async fn load_from_file(path: &camino::Utf8Path) -> ConfigResult<PeerbumpToml> {
    let content = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| BumpError::io(format!("Failed to read {}", path), e))?;

    parse_peerbump_toml(&content).map_err(|e| match e {
        BumpError::TomlParse { message, line, column } => BumpError::TomlParse {
            message: format!("in file {}: {}", path, message),
            line,
            column,
        },
        BumpError::ConfigValidation { field, reason } => BumpError::ConfigValidation {
            field,
            reason: format!("{} (in {})", reason, path),
        },
        other => other,
    })
}

fn invalid(field: impl Into<String>, reason: impl Into<String>) -> BumpError {
    BumpError::ConfigValidation {
        field: field.into(),
        reason: reason.into(),
    }
}

fn toml_error(content: &str, message: &str, span: Option<std::ops::Range<usize>>) -> BumpError {
    let (line, column) = span
        .map(|span| line_column(content, span.start))
        .unwrap_or((0, 0));

    BumpError::TomlParse {
        message: message.trim().to_string(),
        line,
        column,
    }
}

/// 1-based line and column of a byte offset
fn line_column(content: &str, offset: usize) -> (usize, usize) {
    let offset = offset.min(content.len());
    let before = &content.as_bytes()[..offset];
    let line = before.iter().filter(|&&b| b == b'\n').count() + 1;
    let line_start = before.iter().rposition(|&b| b == b'\n').map_or(0, |i| i + 1);
    (line, offset - line_start + 1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_empty_config() {
        let config = parse_peerbump_toml("").unwrap();
        assert_eq!(config, PeerbumpToml::default());
    }

    #[test]
    fn test_parse_full_config() {
        let toml = r#"
[registry]
url = "https://npm.example.com"
token = "secret"
max-retries = 5
timeout-secs = 10
cache-ttl-secs = 60

[resolver]
range-style = "preserve"
allow-prerelease = true
max-suggestion-rounds = 3

[[advice]]
pattern = "@acme/"
template = "Upgrade every @acme package together to {version}"

[[advice]]
pattern = "vue"
match = "contains"
template = "Check the Vue migration guide for {package}"
"#;

        let config = parse_peerbump_toml(toml).unwrap();
        assert_eq!(config.registry.url.as_deref(), Some("https://npm.example.com"));
        assert_eq!(config.registry.max_retries, Some(5));
        assert_eq!(config.registry.cache_ttl_secs, Some(60));
        assert_eq!(config.resolver.range_style.as_deref(), Some("preserve"));
        assert_eq!(config.resolver.allow_prerelease, Some(true));
        assert_eq!(config.resolver.max_suggestion_rounds, Some(3));
        assert_eq!(config.advice.len(), 2);
        assert_eq!(config.advice[0].match_kind, "prefix");
        assert_eq!(config.advice[1].match_kind, "contains");
    }

    #[test]
    fn test_syntax_error_reports_location() {
        let toml = "[registry]\nurl = \"https://a.example\"\nmax-retries = \n";

        match parse_peerbump_toml(toml) {
            Err(BumpError::TomlParse { line, column, .. }) => {
                assert_eq!(line, 3);
                assert!(column > 1);
            },
            other => panic!("Expected TomlParse error, got {:?}", other),
        }
    }

    #[test]
    fn test_unknown_key_is_rejected() {
        let result = parse_peerbump_toml("[resolver]\nrange = \"caret\"\n");
        assert!(matches!(result, Err(BumpError::TomlParse { .. })));
    }

    #[test]
    fn test_validation_errors() {
        let cases = [
            ("[registry]\nurl = \"ftp://x\"\n", "registry.url"),
            ("[registry]\ntimeout-secs = 0\n", "registry.timeout-secs"),
            ("[resolver]\nrange-style = \"tilde\"\n", "resolver.range-style"),
            ("[[advice]]\npattern = \"x\"\nmatch = \"regex\"\ntemplate = \"t\"\n", "advice[0].match"),
            ("[[advice]]\npattern = \"\"\ntemplate = \"t\"\n", "advice[0].pattern"),
        ];

        for (toml, expected) in cases {
            match parse_peerbump_toml(toml) {
                Err(BumpError::ConfigValidation { field, .. }) => assert_eq!(field, expected),
                other => panic!("Expected ConfigValidation for {}, got {:?}", expected, other),
            }
        }
    }

    #[test]
    fn test_overlay() {
        let base = parse_peerbump_toml(
            "[registry]\nurl = \"https://a.example\"\nmax-retries = 2\n\n[[advice]]\npattern = \"a\"\ntemplate = \"t\"\n",
        )
        .unwrap();
        let top = parse_peerbump_toml(
            "[registry]\nurl = \"https://b.example\"\n\n[[advice]]\npattern = \"b\"\ntemplate = \"t\"\n",
        )
        .unwrap();

        let merged = base.overlay(top);
        assert_eq!(merged.registry.url.as_deref(), Some("https://b.example"));
        assert_eq!(merged.registry.max_retries, Some(2));
        assert_eq!(
            merged.advice.iter().map(|a| a.pattern.as_str()).collect::<Vec<_>>(),
            vec!["a", "b"]
        );
    }

    #[test]
    fn test_serialize_round_trip() {
        let mut config = PeerbumpToml::default();
        config.resolver.range_style = Some("caret".to_string());
        config.registry.timeout_secs = Some(30);

        let text = serialize_peerbump_toml(&config).unwrap();
        assert!(text.contains("range-style = \"caret\""));
        assert_eq!(parse_peerbump_toml(&text).unwrap(), config);
    }

    #[test]
    fn test_line_column() {
        assert_eq!(line_column("abc", 0), (1, 1));
        assert_eq!(line_column("ab\ncd", 4), (2, 2));
        assert_eq!(line_column("ab\n", 99), (2, 1));
    }
}

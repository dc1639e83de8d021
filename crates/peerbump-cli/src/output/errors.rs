//! Error message formatting with actionable suggestions.

use std::error::Error;

use peerbump_core::error::BumpError;

use super::colors::ColorSupport;

/// Error formatter with suggestions
pub struct ErrorFormatter {
    colors: ColorSupport,
}

impl ErrorFormatter {
    /// Create a new error formatter
    pub fn new() -> Self {
        Self::with_colors(ColorSupport::detect())
    }

    pub fn with_colors(colors: ColorSupport) -> Self {
        Self { colors }
    }

    /// Format an error with context and suggestions
    pub fn format_error(&self, error: &BumpError) -> String {
        let mut output = self.format_simple(&error.to_string());
        output.push('\n');

        if let BumpError::TomlParse { line, column, .. } = error {
            if *line > 0 {
                output.push_str(&self.format_location("peerbump.toml", *line, *column));
                output.push('\n');
            }
        }

        if let Some(suggestion) = error.suggestion() {
            output.push('\n');
            output.push_str(&self.colors.dim("help"));
            output.push_str(": ");
            output.push_str(suggestion);
            output.push('\n');
        }

        let mut source = error.source();
        while let Some(err) = source {
            output.push('\n');
            output.push_str(&self.colors.dim("caused by"));
            output.push_str(": ");
            output.push_str(&err.to_string());
            source = err.source();
        }

        output
    }

    /// Format a simple error message
    pub fn format_simple(&self, message: &str) -> String {
        format!("{}: {}", self.colors.red("error"), message)
    }

    /// Format file location context
    pub fn format_location(&self, file: &str, line: usize, column: usize) -> String {
        format!("  {} {}:{}:{}", self.colors.dim("-->"), file, line, column)
    }
}

impl Default for ErrorFormatter {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn formatter() -> ErrorFormatter {
        ErrorFormatter::with_colors(ColorSupport::disabled())
    }

    #[test]
    fn test_help_line_is_appended() {
        let text = formatter().format_error(&BumpError::PackageNotFound {
            name: "reactt".to_string(),
        });

        assert!(text.starts_with("error: Package 'reactt' not found in registry"));
        assert!(text.contains("help: Check the package name spelling"));
    }

    #[test]
    fn test_toml_location_is_shown() {
        let text = formatter().format_error(&BumpError::TomlParse {
            message: "expected `=`".to_string(),
            line: 4,
            column: 9,
        });

        assert!(text.contains("--> peerbump.toml:4:9"));
    }

    #[test]
    fn test_source_chain() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "no such file");
        let text = formatter().format_error(&BumpError::io("Failed to read package.json".to_string(), io));

        assert!(text.contains("caused by: no such file"));
        assert!(!text.contains("help:"));
    }
}

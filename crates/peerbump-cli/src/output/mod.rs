//! Terminal output formatting.
//!
//! All commands print through [`OutputHandler`] so that narration markers,
//! colors and the JSON mode look the same everywhere.

pub mod colors;
pub mod errors;

use peerbump_resolver::{ManifestChange, Narration, NarrationLevel, Narrative};

use colors::ColorSupport;

/// Output handler for consistent terminal formatting
pub struct OutputHandler {
    colors: ColorSupport,
}

impl OutputHandler {
    /// Create a new output handler
    pub fn new() -> Self {
        Self::with_colors(ColorSupport::detect())
    }

    pub fn with_colors(colors: ColorSupport) -> Self {
        Self { colors }
    }

    /// Print an info message
    pub fn info(&self, message: &str) {
        println!("{}", self.colors.dim(message));
    }

    /// Print a success message
    pub fn success(&self, message: &str) {
        println!("{} {}", self.colors.green("✓"), message);
    }

    /// Print a warning message
    pub fn warn(&self, message: &str) {
        println!("{} {}", self.colors.yellow("⚠"), message);
    }

    /// Print a section heading
    pub fn heading(&self, message: &str) {
        println!("\n{}", self.colors.bold(message));
    }

    /// Print one narration line
    pub fn narration(&self, line: &Narration) {
        println!("{}", self.format_narration(line));
    }

    /// Print a whole narrative in order
    pub fn narrative(&self, narrative: &Narrative) {
        for line in narrative {
            self.narration(line);
        }
    }

    /// Print the provenance of every manifest change
    pub fn changes(&self, changes: &[ManifestChange]) {
        for change in changes {
            println!("{}", self.format_change(change));
        }
    }

    /// Print a JSON document
    pub fn json(&self, value: &serde_json::Value) {
        match serde_json::to_string_pretty(value) {
            Ok(text) => println!("{}", text),
            Err(e) => eprintln!("{}", errors::ErrorFormatter::with_colors(self.colors).format_simple(&e.to_string())),
        }
    }

    pub fn format_narration(&self, line: &Narration) -> String {
        let marker = line.level.marker();
        let marker = match line.level {
            NarrationLevel::Info => self.colors.cyan(marker),
            NarrationLevel::Success => self.colors.green(marker),
            NarrationLevel::Warning => self.colors.yellow(marker),
            NarrationLevel::Error => self.colors.red(marker),
            NarrationLevel::Tip => marker.to_string(),
        };
        format!("{} {}", marker, line.message)
    }

    pub fn format_change(&self, change: &ManifestChange) -> String {
        let from = change.from.as_deref().unwrap_or("(new)");
        format!(
            "  {} {} → {} {}",
            self.colors.bold(&change.name),
            from,
            self.colors.green(&change.to),
            self.colors.dim(&format!("[{}, {}]", change.bucket.section(), change.reason)),
        )
    }
}

impl Default for OutputHandler {
    fn default() -> Self {
        Self::new()
    }
}

//! Ecosystem-specific remediation hints
//!
//! A declarative table of package-name patterns and advisory templates.
//! Templates may use `{package}`, `{target}` and `{version}`.

use serde::{Deserialize, Serialize};

/// How a rule's pattern is compared with a package name
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchKind {
    Prefix,
    Contains,
}

/// One pattern and the hint it produces
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdviceRule {
    pub pattern: String,
    #[serde(rename = "match")]
    pub match_kind: MatchKind,
    pub template: String,
}

impl AdviceRule {
    pub fn prefix(pattern: impl Into<String>, template: impl Into<String>) -> Self {
        Self {
            pattern: pattern.into(),
            match_kind: MatchKind::Prefix,
            template: template.into(),
        }
    }

    pub fn contains(pattern: impl Into<String>, template: impl Into<String>) -> Self {
        Self {
            pattern: pattern.into(),
            match_kind: MatchKind::Contains,
            template: template.into(),
        }
    }

    pub fn matches(&self, package: &str) -> bool {
        match self.match_kind {
            MatchKind::Prefix => package.starts_with(&self.pattern),
            MatchKind::Contains => package.contains(&self.pattern),
        }
    }

    /// Fill the template for a package that rejects `target@version`
    pub fn render(&self, package: &str, target: &str, version: &str) -> String {
        self.template
            .replace("{package}", package)
            .replace("{target}", target)
            .replace("{version}", version)
    }
}

/// Ordered set of advice rules
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdviceTable {
    rules: Vec<AdviceRule>,
}

impl AdviceTable {
    /// Table without any rule
    pub fn empty() -> Self {
        Self { rules: Vec::new() }
    }

    /// Rules for the ecosystems whose peer ranges most often block upgrades
    pub fn builtin() -> Self {
        Self {
            rules: vec![
                AdviceRule::prefix(
                    "@angular",
                    "Angular packages move in lockstep: run `ng update {package}` to the major matching {target}@{version}",
                ),
                AdviceRule::prefix(
                    "@typescript-eslint/",
                    "Upgrade @typescript-eslint/parser and @typescript-eslint/eslint-plugin together to the major that supports {target}@{version}",
                ),
                AdviceRule::contains(
                    "eslint-plugin",
                    "ESLint plugins often trail ESLint majors: check {package}'s changelog for {target}@{version} support",
                ),
                AdviceRule::contains(
                    "eslint-config",
                    "Shared ESLint configs pin plugin and parser majors: look for a {package} major released after {target}@{version}",
                ),
                AdviceRule::prefix(
                    "@storybook/",
                    "Storybook packages must share one version: run `npx storybook@latest upgrade` instead of bumping {target} alone",
                ),
                AdviceRule::prefix(
                    "@babel/",
                    "Keep every @babel/* package on the same minor as @babel/core when moving {target} to {version}",
                ),
                AdviceRule::prefix(
                    "@nestjs/",
                    "Nest packages are released together: bump all @nestjs/* packages to the major of {target}@{version}",
                ),
                AdviceRule::contains(
                    "react",
                    "React-family packages usually ship a new major alongside React: look for a {package} release listing {target}@{version} in its peer range",
                ),
                AdviceRule::prefix(
                    "@types/",
                    "Type packages follow their runtime package: pick the {package} release matching {target}@{version}",
                ),
            ],
        }
    }

    /// Append user rules after the existing ones
    pub fn with_rules(mut self, rules: impl IntoIterator<Item = AdviceRule>) -> Self {
        self.rules.extend(rules);
        self
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Every matching hint, in table order
    pub fn advise(&self, package: &str, target: &str, version: &str) -> Vec<String> {
        self.rules
            .iter()
            .filter(|rule| rule.matches(package))
            .map(|rule| rule.render(package, target, version))
            .collect()
    }
}

impl Default for AdviceTable {
    fn default() -> Self {
        Self::builtin()
    }
}

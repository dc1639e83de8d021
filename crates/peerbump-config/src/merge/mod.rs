//! Configuration layering, file discovery, and environment overrides
//!
//! Layers, lowest priority first: built-in defaults, the global
//! `~/.peerbump/config.toml`, the nearest project `peerbump.toml`,
//! `PEERBUMP_*` environment variables, then command-line flags.

use std::collections::HashMap;

use camino::{Utf8Path, Utf8PathBuf};
use peerbump_core::error::BumpError;

use crate::toml::{validate_config, PeerbumpToml};
use crate::ConfigResult;

/// Project configuration file name
pub const CONFIG_FILE: &str = "peerbump.toml";

/// Manifest file name
pub const MANIFEST_FILE: &str = "package.json";

/// Prefix of environment overrides
pub const ENV_PREFIX: &str = "PEERBUMP_";

/// Override keys, as used on the command line. The environment form is
/// `PEERBUMP_` followed by the upper-cased key with `-` replaced by `_`.
const OVERRIDE_KEYS: [&str; 8] = [
    "registry",
    "token",
    "max-retries",
    "timeout-secs",
    "cache-ttl-secs",
    "range-style",
    "allow-prerelease",
    "max-suggestion-rounds",
];

/// Main configuration loading interface
pub struct ConfigLoader {
    /// Directory the search starts from
    cwd: Utf8PathBuf,
    /// Location of the global config file, if a home directory exists
    global_path: Option<Utf8PathBuf>,
}

/// Configuration layering and merging
pub struct ConfigLayering;

/// Where a configuration layer came from
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigSource {
    /// Global config file
    Global(Utf8PathBuf),
    /// Project peerbump.toml file
    Project(Utf8PathBuf),
    /// Environment variable
    Environment(String),
    /// CLI flag
    CommandLine(String),
}

/// Effective configuration together with the layers that contributed to it
#[derive(Debug, Clone, PartialEq)]
pub struct LoadedConfig {
    pub config: PeerbumpToml,
    pub sources: Vec<ConfigSource>,
}

impl ConfigLoader {
    /// Create a new configuration loader
    pub fn new(cwd: Utf8PathBuf) -> Self {
        let global_path = dirs::home_dir()
            .and_then(|home| Utf8PathBuf::try_from(home).ok())
            .map(|home| home.join(".peerbump").join("config.toml"));

        Self { cwd, global_path }
    }

    /// Use a different global config file
    pub fn with_global_path(mut self, path: Option<Utf8PathBuf>) -> Self {
        self.global_path = path;
        self
    }

    /// Find a file in the project, walking up the directory tree
    pub fn resolve_config_path(&self, filename: &str) -> Option<Utf8PathBuf> {
        self.cwd
            .ancestors()
            .map(|dir| dir.join(filename))
            .find(|path| path.exists())
    }

    /// Locate the package.json the commands operate on
    pub fn find_manifest(&self) -> ConfigResult<Utf8PathBuf> {
        self.resolve_config_path(MANIFEST_FILE)
            .ok_or_else(|| BumpError::ConfigValidation {
                field: "manifest".to_string(),
                reason: format!(
                    "No {} found in {} or any parent directory",
                    MANIFEST_FILE, self.cwd
                ),
            })
    }

    /// Load the nearest project peerbump.toml, if any
    pub async fn load_project_config(&self) -> ConfigResult<Option<(PeerbumpToml, ConfigSource)>> {
        match self.resolve_config_path(CONFIG_FILE) {
            Some(path) => {
                let config = crate::toml::load_from_file(&path).await?;
                Ok(Some((config, ConfigSource::Project(path))))
            },
            None => Ok(None),
        }
    }

    /// Load global configuration
    pub async fn load_global_config(&self) -> ConfigResult<Option<(PeerbumpToml, ConfigSource)>> {
        match &self.global_path {
            Some(path) if path.exists() => {
                let config = crate::toml::load_from_file(path).await?;
                Ok(Some((config, ConfigSource::Global(path.clone()))))
            },
            _ => Ok(None),
        }
    }

    /// Load every layer and merge them with the given overrides
    pub async fn load(
        &self,
        env_overrides: HashMap<String, String>,
        cli_overrides: HashMap<String, String>,
    ) -> ConfigResult<LoadedConfig> {
        let mut sources = Vec::new();

        let global = self.load_global_config().await?.map(|(config, source)| {
            sources.push(source);
            config
        });
        let project = self.load_project_config().await?.map(|(config, source)| {
            sources.push(source);
            config
        });

        let mut env_keys: Vec<_> = env_overrides.keys().cloned().collect();
        env_keys.sort();
        sources.extend(env_keys.into_iter().map(ConfigSource::Environment));
        let mut cli_keys: Vec<_> = cli_overrides.keys().cloned().collect();
        cli_keys.sort();
        sources.extend(cli_keys.into_iter().map(ConfigSource::CommandLine));

        let config = ConfigLayering::merge_configs(global, project, env_overrides, cli_overrides)?;
        Ok(LoadedConfig { config, sources })
    }

    /// Start directory of the search
    pub fn cwd(&self) -> &Utf8Path {
        &self.cwd
    }
}

impl ConfigLayering {
    /// Merge multiple configuration layers
    pub fn merge_configs(
        global_config: Option<PeerbumpToml>,
        project_config: Option<PeerbumpToml>,
        env_overrides: HashMap<String, String>,
        cli_overrides: HashMap<String, String>,
    ) -> ConfigResult<PeerbumpToml> {
        let mut merged = global_config.unwrap_or_default();

        if let Some(project) = project_config {
            merged = merged.overlay(project);
        }

        Self::apply_env_overrides(&mut merged, &env_overrides)?;

        // CLI flags have the highest priority
        Self::apply_cli_overrides(&mut merged, &cli_overrides)?;

        validate_config(&merged)?;
        Ok(merged)
    }

    /// Apply `PEERBUMP_*` environment variable overrides
    pub fn apply_env_overrides(config: &mut PeerbumpToml, overrides: &HashMap<String, String>) -> ConfigResult<()> {
        for key in OVERRIDE_KEYS {
            if let Some(value) = overrides.get(&env_name(key)) {
                set_field(config, key, value, &env_name(key))?;
            }
        }
        Ok(())
    }

    /// Apply command-line flag overrides
    pub fn apply_cli_overrides(config: &mut PeerbumpToml, overrides: &HashMap<String, String>) -> ConfigResult<()> {
        for key in OVERRIDE_KEYS {
            if let Some(value) = overrides.get(key) {
                set_field(config, key, value, &format!("--{}", key))?;
            }
        }
        Ok(())
    }

    /// Collect environment variable overrides
    pub fn collect_env_overrides() -> HashMap<String, String> {
        Self::filter_env_overrides(std::env::vars())
    }

    /// Keep the variables that name a known override
    pub fn filter_env_overrides(vars: impl IntoIterator<Item = (String, String)>) -> HashMap<String, String> {
        vars.into_iter()
            .filter(|(key, _)| key.starts_with(ENV_PREFIX))
            .filter(|(key, _)| OVERRIDE_KEYS.iter().any(|k| env_name(k) == *key))
            .collect()
    }
}

fn env_name(key: &str) -> String {
    format!("{}{}", ENV_PREFIX, key.to_uppercase().replace('-', "_"))
}

fn set_field(config: &mut PeerbumpToml, key: &str, value: &str, origin: &str) -> ConfigResult<()> {
    match key {
        "registry" => config.registry.url = Some(value.to_string()),
        "token" => config.registry.token = Some(value.to_string()),
        "max-retries" => config.registry.max_retries = Some(parse_value(value, origin)?),
        "timeout-secs" => config.registry.timeout_secs = Some(parse_value(value, origin)?),
        "cache-ttl-secs" => config.registry.cache_ttl_secs = Some(parse_value(value, origin)?),
        "range-style" => config.resolver.range_style = Some(value.to_lowercase()),
        "allow-prerelease" => config.resolver.allow_prerelease = Some(parse_bool(value, origin)?),
        "max-suggestion-rounds" => {
            config.resolver.max_suggestion_rounds = Some(parse_value(value, origin)?)
        },
        _ => {}
    }
    Ok(())
}

fn parse_value<T: std::str::FromStr>(value: &str, origin: &str) -> ConfigResult<T>
where
    T::Err: std::fmt::Display,
{
    value.trim().parse().map_err(|e| BumpError::ConfigValidation {
        field: origin.to_string(),
        reason: format!("'{}': {}", value, e),
    })
}

fn parse_bool(value: &str, origin: &str) -> ConfigResult<bool> {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(BumpError::ConfigValidation {
            field: origin.to_string(),
            reason: format!("'{}' is not a boolean", value),
        }),
    }
}

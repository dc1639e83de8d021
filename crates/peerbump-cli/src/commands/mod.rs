//! Command implementations and dispatch logic.
//!
//! Both commands share the same setup: find package.json, load the layered
//! configuration, build a package source and a resolution pipeline.

use std::collections::HashMap;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use camino::Utf8PathBuf;
use peerbump_config::{
    AdviceSection, ConfigLayering, ConfigLoader, ConfigSource, PackageJson, PeerbumpToml,
};
use peerbump_core::error::{BumpError, BumpResult};
use peerbump_core::types::Manifest;
use peerbump_registry::{
    AuthConfig, CachedRegistry, ClientOptions, MemoryRegistry, MetadataCache, PackageSource,
    RegistryClient, RetryConfig,
};
use peerbump_resolver::{AdviceRule, PlannedUpdate, ResolutionPipeline, ResolutionReport, ResolverOptions};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

pub mod check;
pub mod update;


use crate::output::OutputHandler;
use crate::{Commands, ResolveArgs};

/// Shared context for all commands
pub struct CommandContext {
    pub cwd: Utf8PathBuf,
    pub output: OutputHandler,
    /// `PEERBUMP_*` variables captured at startup
    pub env_overrides: HashMap<String, String>,
    /// Read `~/.peerbump/config.toml`
    pub use_global_config: bool,
}

/// How a command ended, mapped onto the process exit code
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandOutcome {
    /// Every conflict was resolved
    Clean,
    /// Some conflicts remain
    Unresolved,
    /// Interrupted before completion
    Cancelled,
}

impl CommandOutcome {
    pub fn from_report(report: &ResolutionReport) -> Self {
        if report.cancelled {
            CommandOutcome::Cancelled
        } else if report.unresolved.is_empty() {
            CommandOutcome::Clean
        } else {
            CommandOutcome::Unresolved
        }
    }

    pub fn exit_code(self) -> ExitCode {
        match self {
            CommandOutcome::Clean => ExitCode::SUCCESS,
            CommandOutcome::Unresolved => ExitCode::from(1),
            CommandOutcome::Cancelled => ExitCode::from(130),
        }
    }
}

impl CommandContext {
    /// Create a new command context
    pub fn new() -> BumpResult<Self> {
        let cwd = std::env::current_dir()
            .map_err(|e| BumpError::io("Failed to get current directory".to_string(), e))?;
        let cwd = Utf8PathBuf::try_from(cwd).map_err(|e| BumpError::ConfigValidation {
            field: "cwd".to_string(),
            reason: format!("current directory is not valid UTF-8: {}", e),
        })?;

        Ok(Self {
            cwd,
            output: OutputHandler::new(),
            env_overrides: ConfigLayering::collect_env_overrides(),
            use_global_config: true,
        })
    }
}

/// Dispatch a command to its handler
pub async fn dispatch_command(command: Commands, ctx: &CommandContext) -> BumpResult<CommandOutcome> {
    match command {
        Commands::Update { args, dry_run } => {
            info!("Updating {:?} (dry_run: {})", args.packages, dry_run);
            update::execute(args, dry_run, ctx).await
        },
        Commands::Check { args } => {
            info!("Checking {:?}", args.packages);
            check::execute(args, ctx).await
        },
    }
}

/// Everything a command needs once setup is done
pub struct Session {
    pub manifest_path: Utf8PathBuf,
    pub package: PackageJson,
    pub manifest: Manifest,
    pub planned: Vec<PlannedUpdate>,
    pub pipeline: ResolutionPipeline,
}

/// Load files and configuration and build the pipeline
pub async fn prepare(args: &ResolveArgs, ctx: &CommandContext) -> BumpResult<Session> {
    let planned = parse_planned(args)?;

    let manifest_path = match &args.manifest {
        Some(path) if path.is_absolute() => path.clone(),
        Some(path) => ctx.cwd.join(path),
        None => ConfigLoader::new(ctx.cwd.clone()).find_manifest()?,
    };
    let project_dir = manifest_path
        .parent()
        .map(|dir| dir.to_path_buf())
        .unwrap_or_else(|| ctx.cwd.clone());

    let mut loader = ConfigLoader::new(project_dir);
    if !ctx.use_global_config {
        loader = loader.with_global_path(None);
    }
    let loaded = loader.load(ctx.env_overrides.clone(), cli_overrides(args)).await?;
    for source in &loaded.sources {
        match source {
            ConfigSource::Global(path) | ConfigSource::Project(path) => debug!("Loaded config from {}", path),
            ConfigSource::Environment(key) => debug!("Config override from ${}", key),
            ConfigSource::CommandLine(key) => debug!("Config override from --{}", key),
        }
    }

    let package = peerbump_config::json::load_from_file(&manifest_path).await?;
    let manifest = package.to_manifest()?;
    debug!("Loaded {} with {} dependencies", manifest_path, manifest.dependency_count());

    let source = build_source(&loaded.config, args.registry_fixture.as_ref(), ctx).await?;
    let pipeline = ResolutionPipeline::new(source, resolver_options(&loaded.config)?)
        .with_cancellation(cancel_on_ctrl_c());

    Ok(Session {
        manifest_path,
        package,
        manifest,
        planned,
        pipeline,
    })
}

/// Parse the positional `name@range` arguments
pub fn parse_planned(args: &ResolveArgs) -> BumpResult<Vec<PlannedUpdate>> {
    args.packages
        .iter()
        .map(|arg| {
            let mut update: PlannedUpdate = arg.parse()?;
            update.is_dev = args.dev;
            Ok(update)
        })
        .collect()
}

/// Command-line flags that override configuration values
pub fn cli_overrides(args: &ResolveArgs) -> HashMap<String, String> {
    let mut overrides = HashMap::new();
    if let Some(registry) = &args.registry {
        overrides.insert("registry".to_string(), registry.clone());
    }
    if let Some(style) = &args.range_style {
        overrides.insert("range-style".to_string(), style.clone());
    }
    if args.allow_prerelease {
        overrides.insert("allow-prerelease".to_string(), "true".to_string());
    }
    overrides
}

/// Registry client settings from configuration, with client defaults
pub fn client_options(config: &PeerbumpToml) -> ClientOptions {
    let defaults = ClientOptions::default();
    let registry = &config.registry;

    ClientOptions {
        base_url: registry.url.clone().unwrap_or(defaults.base_url),
        timeout: registry.timeout_secs.map(Duration::from_secs).unwrap_or(defaults.timeout),
        auth: registry.token.clone().map(|token| AuthConfig {
            token: Some(token),
            ..AuthConfig::default()
        }),
        retry: RetryConfig {
            max_retries: registry.max_retries.unwrap_or(defaults.retry.max_retries),
            ..defaults.retry
        },
    }
}

/// Resolver settings from configuration, with resolver defaults
pub fn resolver_options(config: &PeerbumpToml) -> BumpResult<ResolverOptions> {
    let defaults = ResolverOptions::default();
    let resolver = &config.resolver;

    let range_style = match &resolver.range_style {
        Some(style) => style.parse()?,
        None => defaults.range_style,
    };

    Ok(ResolverOptions {
        range_style,
        allow_prerelease: resolver.allow_prerelease.unwrap_or(defaults.allow_prerelease),
        max_suggestion_rounds: resolver
            .max_suggestion_rounds
            .unwrap_or(defaults.max_suggestion_rounds),
        advice: defaults.advice.with_rules(config.advice.iter().map(advice_rule)),
    })
}

fn advice_rule(section: &AdviceSection) -> AdviceRule {
    match section.match_kind.as_str() {
        "contains" => AdviceRule::contains(&section.pattern, &section.template),
        _ => AdviceRule::prefix(&section.pattern, &section.template),
    }
}

async fn build_source(
    config: &PeerbumpToml,
    fixture: Option<&Utf8PathBuf>,
    ctx: &CommandContext,
) -> BumpResult<Arc<dyn PackageSource>> {
    if let Some(path) = fixture {
        let path = if path.is_absolute() { path.clone() } else { ctx.cwd.join(path) };
        let registry = MemoryRegistry::load(&path).await?;
        info!("Using registry fixture {} ({} packages)", path, registry.len());
        return Ok(Arc::new(registry));
    }

    let options = client_options(config);
    info!("Using registry {}", options.base_url);
    let client = RegistryClient::with_options(options)?;
    let cache = match config.registry.cache_ttl_secs {
        Some(secs) => MetadataCache::with_ttl(Duration::from_secs(secs)),
        None => MetadataCache::new(),
    };
    Ok(Arc::new(CachedRegistry::new(client, cache)))
}

/// A token that is cancelled on the first Ctrl-C
fn cancel_on_ctrl_c() -> CancellationToken {
    let token = CancellationToken::new();
    let child = token.clone();
    tokio::spawn(async move {
        tokio::select! {
            _ = child.cancelled() => {}
            result = tokio::signal::ctrl_c() => {
                if result.is_ok() {
                    info!("Interrupted, finishing the current step");
                    child.cancel();
                }
            },
        }
    });
    token
}

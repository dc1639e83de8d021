//! Common utilities for benchmarks

use criterion::Criterion;
use pprof::criterion::{Output, PProfProfiler};

use peerbump_core::types::Manifest;
use peerbump_registry::{MemoryRegistry, VersionMetadata};

/// Configure criterion with flamegraph profiling support
pub fn criterion_config() -> Criterion {
    Criterion::default()
        .warm_up_time(std::time::Duration::from_secs(3))
        .measurement_time(std::time::Duration::from_secs(10))
        .sample_size(100)
        .with_profiler(PProfProfiler::new(100, Output::Flamegraph(None)))
}

/// A `core` package with `plugins` plugins peering on it, one release line
/// per core major. The manifest sits on core 1 with every plugin installed.
pub fn plugin_ecosystem(plugins: usize) -> (MemoryRegistry, Manifest) {
    let mut registry = MemoryRegistry::new();
    for minor in 0..10 {
        registry.add_version("core", VersionMetadata::new(format!("1.{}.0", minor)));
    }
    registry.add_version("core", VersionMetadata::new("2.0.0"));

    let mut manifest = Manifest::new("bench-app", "1.0.0").with_dependency("core", "^1.0.0");
    for index in 0..plugins {
        let name = format!("plugin-{}", index);
        for minor in 0..5 {
            registry.add_version(
                &name,
                VersionMetadata::new(format!("1.{}.0", minor)).with_peer_dependency("core", "^1.0.0"),
            );
        }
        registry.add_version(
            &name,
            VersionMetadata::new("2.0.0")
                .with_peer_dependency("core", "^2.0.0")
                .with_dependency("core", "^2.0.0"),
        );
        manifest = manifest.with_dependency(name, "^1.0.0");
    }

    (registry, manifest)
}

/// `count` published version strings across a few majors
pub fn version_strings(count: usize) -> Vec<String> {
    (0..count)
        .map(|i| {
            let major = i / 100;
            let minor = (i / 10) % 10;
            let patch = i % 10;
            if i % 7 == 0 {
                format!("{}.{}.{}-beta.{}", major, minor, patch, i % 3)
            } else {
                format!("{}.{}.{}", major, minor, patch)
            }
        })
        .collect()
}

/// A package.json document with `count` dependencies
pub fn package_json_content(count: usize) -> String {
    let dependencies: serde_json::Map<String, serde_json::Value> = (0..count)
        .map(|i| (format!("package-{}", i), serde_json::Value::String(format!("^{}.{}.0", i % 5, i % 10))))
        .collect();

    let document = serde_json::json!({
        "name": "bench-app",
        "version": "1.0.0",
        "private": true,
        "scripts": { "build": "tsc", "test": "vitest" },
        "dependencies": dependencies,
        "devDependencies": { "typescript": "~5.4.0" },
    });
    serde_json::to_string_pretty(&document).unwrap_or_default()
}

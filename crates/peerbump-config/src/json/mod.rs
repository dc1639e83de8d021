//! package.json loading and saving
//!
//! The whole document is kept as an ordered JSON object so that fields the
//! resolver never touches, and the order of every key, survive a
//! load/save round-trip. Only the two dependency buckets are rewritten.

use camino::Utf8Path;
use indexmap::IndexMap;
use serde_json::{Map, Value};

use crate::ConfigResult;
use peerbump_core::error::BumpError;
use peerbump_core::types::Manifest;

const DEPENDENCIES: &str = "dependencies";
const DEV_DEPENDENCIES: &str = "devDependencies";

/// A parsed package.json document
#[derive(Debug, Clone, PartialEq)]
pub struct PackageJson {
    document: Map<String, Value>,
}

impl PackageJson {
    /// Top-level field lookup
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.document.get(key)
    }

    /// Package name, empty when absent
    pub fn name(&self) -> &str {
        self.document.get("name").and_then(Value::as_str).unwrap_or_default()
    }

    /// Declared peer dependencies of this package
    pub fn peer_dependencies(&self) -> ConfigResult<IndexMap<String, String>> {
        read_bucket(&self.document, "peerDependencies")
    }

    /// Extract the manifest the resolver works on
    pub fn to_manifest(&self) -> ConfigResult<Manifest> {
        let field = |key: &str| {
            self.document
                .get(key)
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string()
        };

        Ok(Manifest {
            name: field("name"),
            version: field("version"),
            dependencies: read_bucket(&self.document, DEPENDENCIES)?,
            dev_dependencies: read_bucket(&self.document, DEV_DEPENDENCIES)?,
        })
    }

    /// Write the manifest's buckets back, keeping every other field as is.
    ///
    /// Existing bucket keys stay where they are; an empty bucket that was
    /// not in the document is not added.
    pub fn apply_manifest(&mut self, manifest: &Manifest) {
        for (key, bucket) in [
            (DEPENDENCIES, &manifest.dependencies),
            (DEV_DEPENDENCIES, &manifest.dev_dependencies),
        ] {
            if bucket.is_empty() && !self.document.contains_key(key) {
                continue;
            }
            let object: Map<String, Value> = bucket
                .iter()
                .map(|(name, spec)| (name.clone(), Value::String(spec.clone())))
                .collect();
            self.document.insert(key.to_string(), Value::Object(object));
        }
    }
}

fn read_bucket(document: &Map<String, Value>, key: &str) -> ConfigResult<IndexMap<String, String>> {
    let Some(value) = document.get(key) else {
        return Ok(IndexMap::new());
    };
    let object = value.as_object().ok_or_else(|| BumpError::JsonParse {
        message: format!("'{}' must be an object", key),
    })?;

    object
        .iter()
        .map(|(name, spec)| match spec.as_str() {
            Some(spec) => Ok((name.clone(), spec.to_string())),
            None => Err(BumpError::JsonParse {
                message: format!("'{}.{}' must be a version string", key, name),
            }),
        })
        .collect()
}

/// Parse package.json content
pub fn parse_package_json(content: &str) -> ConfigResult<PackageJson> {
    let value: Value = serde_json::from_str(content).map_err(|e| BumpError::JsonParse {
        message: format!("line {}, column {}: {}", e.line(), e.column(), e),
    })?;

    match value {
        Value::Object(document) => Ok(PackageJson { document }),
        _ => Err(BumpError::JsonParse {
            message: "top-level value must be an object".to_string(),
        }),
    }
}

/// Serialize with two-space indentation and a trailing newline
pub fn serialize_package_json(package: &PackageJson) -> ConfigResult<String> {
    let mut output = serde_json::to_string_pretty(&package.document).map_err(|e| BumpError::JsonParse {
        message: format!("serialization failed: {}", e),
    })?;
    output.push('\n');
    Ok(output)
}

/// Load and parse package.json from file path
pub async fn load_from_file(path: &Utf8Path) -> ConfigResult<PackageJson> {
    let content = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| BumpError::io(format!("Failed to read {}", path), e))?;

    parse_package_json(&content).map_err(|e| match e {
        BumpError::JsonParse { message } => BumpError::JsonParse {
            message: format!("in file {}: {}", path, message),
        },
        other => other,
    })
}

/// Serialize and write package.json to file path
pub async fn save_to_file(path: &Utf8Path, package: &PackageJson) -> ConfigResult<()> {
    let content = serialize_package_json(package)?;
    tokio::fs::write(path, content)
        .await
        .map_err(|e| BumpError::io(format!("Failed to write {}", path), e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use camino::Utf8PathBuf;
    use proptest::prelude::*;

    const SAMPLE: &str = r#"{
  "name": "app",
  "version": "1.0.0",
  "private": true,
  "scripts": {
    "build": "tsc"
  },
  "dependencies": {
    "react": "^17.0.2",
    "lodash": "^4.17.21"
  },
  "devDependencies": {
    "typescript": "~5.2.0"
  },
  "peerDependencies": {
    "react-dom": ">=17"
  }
}
"#;

    #[test]
    fn test_to_manifest() {
        let package = parse_package_json(SAMPLE).unwrap();
        let manifest = package.to_manifest().unwrap();

        assert_eq!(package.name(), "app");
        assert_eq!(manifest.version, "1.0.0");
        assert_eq!(manifest.dependencies.keys().collect::<Vec<_>>(), vec!["react", "lodash"]);
        assert_eq!(manifest.dev_dependencies.get("typescript").map(String::as_str), Some("~5.2.0"));
        assert_eq!(
            package.peer_dependencies().unwrap().get("react-dom").map(String::as_str),
            Some(">=17")
        );
    }

    #[test]
    fn test_round_trip_is_byte_identical() {
        let package = parse_package_json(SAMPLE).unwrap();
        assert_eq!(serialize_package_json(&package).unwrap(), SAMPLE);
    }

    #[test]
    fn test_apply_manifest_keeps_order_and_other_fields() {
        let mut package = parse_package_json(SAMPLE).unwrap();
        let mut manifest = package.to_manifest().unwrap();
        manifest.set_dependency("react", "^18.2.0");
        manifest.update_dependency("eslint", "^8.0.0", true);

        package.apply_manifest(&manifest);
        let output = serialize_package_json(&package).unwrap();

        let react = output.find("\"react\": \"^18.2.0\"").unwrap();
        let lodash = output.find("\"lodash\"").unwrap();
        assert!(react < lodash);
        assert!(output.find("\"scripts\"").unwrap() < output.find("\"dependencies\"").unwrap());
        assert!(output.contains("\"eslint\": \"^8.0.0\""));
        assert_eq!(package.get("private"), Some(&Value::Bool(true)));
    }

    #[test]
    fn test_empty_bucket_is_not_added() {
        let mut package = parse_package_json(r#"{ "name": "bare", "version": "0.1.0" }"#).unwrap();
        let manifest = package.to_manifest().unwrap();

        package.apply_manifest(&manifest);

        assert!(package.get("dependencies").is_none());
        assert!(package.get("devDependencies").is_none());
    }

    #[test]
    fn test_invalid_documents() {
        assert!(matches!(parse_package_json("[]"), Err(BumpError::JsonParse { .. })));
        assert!(matches!(parse_package_json("{ \"name\": "), Err(BumpError::JsonParse { .. })));

        let package = parse_package_json(r#"{ "dependencies": { "react": 18 } }"#).unwrap();
        match package.to_manifest() {
            Err(BumpError::JsonParse { message }) => assert!(message.contains("dependencies.react")),
            other => panic!("Expected JsonParse error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_load_and_save_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = Utf8PathBuf::try_from(dir.path().join("package.json")).unwrap();
        tokio::fs::write(&path, SAMPLE).await.unwrap();

        let mut package = load_from_file(&path).await.unwrap();
        let mut manifest = package.to_manifest().unwrap();
        manifest.set_dependency("lodash", "^4.18.0");
        package.apply_manifest(&manifest);
        save_to_file(&path, &package).await.unwrap();

        let reloaded = load_from_file(&path).await.unwrap().to_manifest().unwrap();
        assert_eq!(reloaded.spec_of("lodash"), Some("^4.18.0"));

        let missing = load_from_file(&path.with_file_name("nope.json")).await;
        assert!(matches!(missing, Err(BumpError::Io { .. })));
    }

    proptest! {
        #[test]
        fn prop_apply_preserves_untouched_fields(
            deps in prop::collection::btree_map("[a-z]{1,8}", "\\^[0-9]\\.[0-9]\\.[0-9]", 0..6),
            extra in "[a-z]{1,10}",
        ) {
            let mut package = parse_package_json(
                &serde_json::json!({ "name": "app", "version": "1.0.0", "description": extra }).to_string(),
            ).unwrap();

            let mut manifest = package.to_manifest().unwrap();
            for (name, spec) in &deps {
                manifest.update_dependency(name, spec.as_str(), false);
            }
            package.apply_manifest(&manifest);

            let reloaded = parse_package_json(&serialize_package_json(&package).unwrap()).unwrap();
            prop_assert_eq!(reloaded.get("description"), Some(&Value::String(extra)));
            prop_assert_eq!(reloaded.to_manifest().unwrap().dependencies.len(), deps.len());
        }
    }
}

//! # Embedded Schemas
//!
//! JSON Schemas (Draft 2020-12) for the two document kinds, compiled into
//! the binary so validation needs no files on disk and no network access.

use jsonschema::Validator;
use serde_json::Value;

use crate::error::{ManifestError, Violation, Violations};

/// Filename of the plugin manifest schema.
pub const PLUGIN_MANIFEST_SCHEMA: &str = "plugin-manifest.schema.json";

/// Filename of the target set schema.
pub const TARGET_SET_SCHEMA: &str = "target-set.schema.json";

const PLUGIN_MANIFEST_SOURCE: &str = include_str!("../schemas/plugin-manifest.schema.json");
const TARGET_SET_SOURCE: &str = include_str!("../schemas/target-set.schema.json");

/// Source text of an embedded schema, by filename.
pub fn schema_source(schema_name: &str) -> Option<&'static str> {
    match schema_name {
        PLUGIN_MANIFEST_SCHEMA => Some(PLUGIN_MANIFEST_SOURCE),
        TARGET_SET_SCHEMA => Some(TARGET_SET_SOURCE),
        _ => None,
    }
}

/// A compiled schema.
pub struct CompiledSchema {
    name: &'static str,
    validator: Validator,
}

impl CompiledSchema {
    /// Compile the embedded schema called `name`.
    ///
    /// # Errors
    ///
    /// Returns `ManifestError::SchemaBuild` if the name is unknown or the
    /// schema does not compile.
    pub fn compile(name: &'static str) -> Result<Self, ManifestError> {
        let build_error = |reason: String| ManifestError::SchemaBuild {
            schema_name: name,
            reason,
        };
        let source = schema_source(name).ok_or_else(|| build_error("unknown schema".into()))?;
        let schema: Value = serde_json::from_str(source)
            .map_err(|e| build_error(format!("invalid JSON: {e}")))?;

        let mut opts = jsonschema::options();
        opts.with_draft(jsonschema::Draft::Draft202012);
        let validator = opts
            .build(&schema)
            .map_err(|e| build_error(e.to_string()))?;
        Ok(Self { name, validator })
    }

    /// Schema filename.
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Validate `instance`, collecting every violation.
    ///
    /// # Errors
    ///
    /// Returns `ManifestError::ValidationFailed` listing each violation.
    pub fn validate(&self, instance: &Value) -> Result<(), ManifestError> {
        let violations: Vec<Violation> = self
            .validator
            .iter_errors(instance)
            .map(|e| Violation {
                instance_path: e.instance_path.to_string(),
                schema_path: e.schema_path.to_string(),
                message: e.to_string(),
            })
            .collect();

        if violations.is_empty() {
            Ok(())
        } else {
            Err(ManifestError::ValidationFailed {
                schema_name: self.name,
                violations: Violations(violations),
            })
        }
    }
}

impl std::fmt::Debug for CompiledSchema {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompiledSchema")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn embedded_schemas_compile() {
        assert!(CompiledSchema::compile(PLUGIN_MANIFEST_SCHEMA).is_ok());
        assert!(CompiledSchema::compile(TARGET_SET_SCHEMA).is_ok());
    }

    #[test]
    fn unknown_schema_name() {
        assert!(matches!(
            CompiledSchema::compile("nope.schema.json"),
            Err(ManifestError::SchemaBuild { .. })
        ));
    }

    #[test]
    fn manifest_schema_accepts_minimal_document() {
        let schema = CompiledSchema::compile(PLUGIN_MANIFEST_SCHEMA).unwrap();
        assert!(schema.validate(&json!({"plugins": []})).is_ok());
        assert!(schema
            .validate(&json!({"plugins": [{"info": {"type": 99, "name": "x"}}]}))
            .is_ok());
    }

    #[test]
    fn manifest_schema_reports_paths() {
        let schema = CompiledSchema::compile(PLUGIN_MANIFEST_SCHEMA).unwrap();
        let err = schema
            .validate(&json!({"plugins": [{"info": {"type": "REMOTE"}, "for_web_service": "yes"}]}))
            .unwrap_err();
        match err {
            ManifestError::ValidationFailed { violations, .. } => {
                let paths: Vec<&str> = violations
                    .as_slice()
                    .iter()
                    .map(|v| v.instance_path.as_str())
                    .collect();
                assert!(paths.contains(&"/plugins/0/info/type"), "{paths:?}");
                assert!(paths.contains(&"/plugins/0/for_web_service"), "{paths:?}");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn target_schema_bounds_accuracy() {
        let schema = CompiledSchema::compile(TARGET_SET_SCHEMA).unwrap();
        let doc = json!({"targets": [{"name": "a", "operating_system_classes": [{"accuracy": 101}]}]});
        assert!(schema.validate(&doc).is_err());
    }
}

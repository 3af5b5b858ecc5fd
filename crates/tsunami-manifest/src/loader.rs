//! # Document Loading
//!
//! Reads plugin manifests and target sets from YAML or JSON, validates them
//! against the embedded schemas, then decodes them into typed records.
//!
//! Validation runs on the generic JSON value before typed decoding, so a
//! malformed document is reported with the path of every offending value
//! rather than the first serde error.

use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tsunami_proto::{PluginDefinition, TargetDescriptor};

use crate::error::ManifestError;
use crate::schema::{CompiledSchema, PLUGIN_MANIFEST_SCHEMA, TARGET_SET_SCHEMA};

/// Label used in errors for documents that did not come from a file.
const INLINE: &str = "<inline>";

/// Serialization format of a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentFormat {
    /// YAML 1.2.
    Yaml,
    /// JSON.
    Json,
}

impl DocumentFormat {
    /// `.yaml` and `.yml` are YAML; anything else is JSON.
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("yaml") || ext.eq_ignore_ascii_case("yml") => {
                Self::Yaml
            }
            _ => Self::Json,
        }
    }
}

/// A document listing plugin definitions.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PluginManifest {
    /// Definitions in document order.
    pub plugins: Vec<PluginDefinition>,
}

/// A target with a label for reporting.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NamedTarget {
    /// Label, e.g. a host:port.
    pub name: String,
    /// The facts matched against.
    #[serde(flatten)]
    pub target: TargetDescriptor,
}

/// A document listing targets.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetSet {
    /// Targets in document order.
    pub targets: Vec<NamedTarget>,
}

/// Loads documents, holding both schemas compiled.
#[derive(Debug)]
pub struct ManifestLoader {
    manifest_schema: CompiledSchema,
    target_schema: CompiledSchema,
}

impl ManifestLoader {
    /// Compile the embedded schemas.
    ///
    /// # Errors
    ///
    /// Returns `ManifestError::SchemaBuild` if an embedded schema does not
    /// compile.
    pub fn new() -> Result<Self, ManifestError> {
        Ok(Self {
            manifest_schema: CompiledSchema::compile(PLUGIN_MANIFEST_SCHEMA)?,
            target_schema: CompiledSchema::compile(TARGET_SET_SCHEMA)?,
        })
    }

    /// Load a plugin manifest from a string.
    pub fn load_manifest_str(
        &self,
        content: &str,
        format: DocumentFormat,
    ) -> Result<PluginManifest, ManifestError> {
        self.load(content, format, INLINE, &self.manifest_schema)
    }

    /// Load a plugin manifest from a file, choosing the format by extension.
    pub fn load_manifest_file(&self, path: &Path) -> Result<PluginManifest, ManifestError> {
        let content = read_document(path)?;
        let manifest: PluginManifest = self.load(
            &content,
            DocumentFormat::from_path(path),
            &path.display().to_string(),
            &self.manifest_schema,
        )?;
        tracing::info!(path = %path.display(), plugins = manifest.plugins.len(), "loaded plugin manifest");
        Ok(manifest)
    }

    /// Load a target set from a string.
    ///
    /// Each target's web-service classification is derived from its
    /// service name; an explicit `web_service: true` is kept.
    pub fn load_targets_str(
        &self,
        content: &str,
        format: DocumentFormat,
    ) -> Result<TargetSet, ManifestError> {
        let set: TargetSet = self.load(content, format, INLINE, &self.target_schema)?;
        Ok(classify(set))
    }

    /// Load a target set from a file, choosing the format by extension.
    pub fn load_targets_file(&self, path: &Path) -> Result<TargetSet, ManifestError> {
        let content = read_document(path)?;
        let set: TargetSet = self.load(
            &content,
            DocumentFormat::from_path(path),
            &path.display().to_string(),
            &self.target_schema,
        )?;
        tracing::info!(path = %path.display(), targets = set.targets.len(), "loaded target set");
        Ok(classify(set))
    }

    fn load<T: serde::de::DeserializeOwned>(
        &self,
        content: &str,
        format: DocumentFormat,
        label: &str,
        schema: &CompiledSchema,
    ) -> Result<T, ManifestError> {
        let value = parse_document(content, format, label)?;
        schema.validate(&value)?;
        tracing::debug!(document = label, schema = schema.name(), "document passed schema validation");
        serde_json::from_value(value).map_err(|e| ManifestError::Decode {
            path: label.to_string(),
            reason: e.to_string(),
        })
    }
}

fn classify(mut set: TargetSet) -> TargetSet {
    for named in &mut set.targets {
        named.target = std::mem::take(&mut named.target).classify_web_service();
    }
    set
}

fn read_document(path: &Path) -> Result<String, ManifestError> {
    std::fs::read_to_string(path).map_err(|e| ManifestError::DocumentLoad {
        path: path.display().to_string(),
        reason: e.to_string(),
    })
}

/// Parse YAML or JSON text into a JSON value.
pub fn parse_document(
    content: &str,
    format: DocumentFormat,
    label: &str,
) -> Result<Value, ManifestError> {
    let load_error = |reason: String| ManifestError::DocumentLoad {
        path: label.to_string(),
        reason,
    };
    match format {
        DocumentFormat::Json => {
            serde_json::from_str(content).map_err(|e| load_error(format!("invalid JSON: {e}")))
        }
        DocumentFormat::Yaml => {
            serde_yaml::from_str(content).map_err(|e| load_error(format!("invalid YAML: {e}")))
        }
    }
}

//! Errors raised while loading manifests and target sets.

use std::fmt;

use thiserror::Error;

/// Failure to load a plugin manifest or target set.
#[derive(Error, Debug)]
pub enum ManifestError {
    /// The document could not be read or parsed as YAML/JSON.
    #[error("document load error for '{path}': {reason}")]
    DocumentLoad {
        /// Path of the document, or `<inline>` for in-memory content.
        path: String,
        /// Why it could not be loaded.
        reason: String,
    },

    /// The document does not conform to its schema.
    #[error("validation failed against schema '{schema_name}':\n{violations}")]
    ValidationFailed {
        /// Schema the document was validated against.
        schema_name: &'static str,
        /// Every violation found.
        violations: Violations,
    },

    /// An embedded schema could not be compiled.
    #[error("schema build error for '{schema_name}': {reason}")]
    SchemaBuild {
        /// Schema filename.
        schema_name: &'static str,
        /// Compiler message.
        reason: String,
    },

    /// A schema-valid document could not be decoded into typed records.
    #[error("decode error for '{path}': {reason}")]
    Decode {
        /// Path of the document, or `<inline>`.
        path: String,
        /// Deserializer message.
        reason: String,
    },

    /// IO error reading a document.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// A single schema violation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Violation {
    /// JSON Pointer to the violating value in the document.
    pub instance_path: String,
    /// JSON Pointer to the schema keyword that failed.
    pub schema_path: String,
    /// Human-readable description.
    pub message: String,
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.instance_path.is_empty() {
            write!(f, "  (root): {}", self.message)
        } else {
            write!(f, "  {}: {}", self.instance_path, self.message)
        }
    }
}

/// Violations of one document, in the order the validator reported them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Violations(pub(crate) Vec<Violation>);

impl Violations {
    /// Number of violations.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns true if there are no violations.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// All violations.
    pub fn as_slice(&self) -> &[Violation] {
        &self.0
    }
}

impl fmt::Display for Violations {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, v) in self.0.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "{v}")?;
        }
        Ok(())
    }
}

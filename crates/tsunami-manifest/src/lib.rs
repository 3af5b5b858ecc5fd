//! # tsunami-manifest — Plugin Manifest & Target Set Loading
//!
//! Human-authored documents that feed the plugin schema: manifests listing
//! plugin definitions, and target sets describing reconnaissance results to
//! preview matching against.
//!
//! ## Loading Pipeline (`loader`)
//!
//! 1. Parse YAML or JSON (chosen by file extension) into a JSON value.
//! 2. Validate against the embedded Draft 2020-12 schema ([`schema`]).
//! 3. Decode into [`tsunami_proto`] records with serde.
//!
//! Manifest field names are the snake_case schema field names; `type` takes
//! the wire enum name or an integer.
//!
//! ## Crate Policy
//!
//! - Depends only on `tsunami-proto` internally.
//! - Schema validation is a trust boundary: invalid documents are rejected
//!   with the instance path and message of every violation.
//! - Semantic checks (unspecified type, empty filters) are not schema
//!   errors; see [`tsunami_proto::validate_definition`].

pub mod error;
pub mod loader;
pub mod schema;

pub use error::{ManifestError, Violation, Violations};
pub use loader::{
    parse_document, DocumentFormat, ManifestLoader, NamedTarget, PluginManifest, TargetSet,
};
pub use schema::{CompiledSchema, PLUGIN_MANIFEST_SCHEMA, TARGET_SET_SCHEMA};

//! # tsunami-proto — Plugin Representation Schema
//!
//! The wire-stable description of a Tsunami scanner plugin and the rule that
//! decides which network targets it applies to. Definitions are exchanged
//! between the scan orchestrator and plugin servers running in separate
//! processes, so the binary encoding here is byte-compatible with every
//! other `tsunami.proto` producer and consumer.
//!
//! ## Key Design Principles
//!
//! 1. **Native records, static metadata.** The five messages are plain
//!    structs with public fields. Their tags live in a compile-time
//!    descriptor table ([`descriptor`]); there is no registration step.
//!
//! 2. **Forward compatibility.** Unknown fields are kept verbatim and
//!    re-emitted on encode. Unknown `PluginType` numbers decode into
//!    [`PluginType::Unrecognized`] unless strict enum checking is asked for.
//!
//! 3. **Absent is not empty.** An absent filter and a present filter with
//!    empty fields both match everything, yet they encode differently and
//!    survive a round trip unchanged.
//!
//! 4. **Matching cannot fail.** [`matches`] is a pure function of a
//!    definition and a [`TargetDescriptor`]. Questionable definitions are
//!    reported by [`validate_definition`] instead of being rejected.
//!
//! ## Crate Policy
//!
//! - No dependencies on other `tsunami-*` crates (this is the leaf of the DAG).
//! - No `unsafe` code.
//! - No `panic!()` or `.unwrap()` outside tests.
//! - Tag numbers in [`descriptor`] are never renumbered or reused.

pub mod catalog;
pub mod codec;
pub mod descriptor;
pub mod error;
pub mod matching;
pub mod plugin;
pub mod validate;
pub mod version;
pub mod wire;

// Re-export primary types for ergonomic imports.
pub use catalog::{PluginCatalog, SelectionConfig};
pub use codec::{DecodeOptions, Message, DEFAULT_RECURSION_LIMIT};
pub use descriptor::PACKAGE;
pub use error::{DecodeError, EncodeError, ProtoError, VersionError};
pub use matching::{
    first_mismatch, is_web_service, matches, DetectedSoftware, FilterKind, OperatingSystemGuess,
    TargetDescriptor,
};
pub use plugin::{
    PluginDefinition, PluginInfo, PluginType, TargetOperatingSystemClass, TargetServiceName,
    TargetSoftware, UnknownPluginType,
};
pub use validate::{validate_definition, ValidationWarning};
pub use version::{version_satisfies, Version, VersionEntry, VersionRange, VersionSet};
pub use wire::{UnknownField, UnknownFields, WireType};

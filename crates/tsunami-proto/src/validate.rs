//! # Definition Validation
//!
//! Semantic checks on well-typed definitions. Nothing here rejects a
//! definition or changes how it matches; callers decide which warnings are
//! fatal (the CLI's `--deny-warnings`).

use std::fmt;

use serde::Serialize;

use crate::matching::FilterKind;
use crate::plugin::{PluginDefinition, PluginInfo};
use crate::version::VersionEntry;

/// Upper bound of a meaningful `min_accuracy`.
pub const MAX_ACCURACY: u32 = 100;

/// A questionable but decodable property of a definition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ValidationWarning {
    /// `info` is absent.
    MissingInfo,
    /// `info.type` is `PLUGIN_TYPE_UNSPECIFIED`.
    UnspecifiedPluginType,
    /// `info.type` is a value unknown to this build.
    UnrecognizedPluginType {
        /// The numeric type.
        value: i32,
    },
    /// `info.name` is empty.
    EmptyPluginName,
    /// A filter is present but every one of its fields is empty.
    UnconstrainedFilter {
        /// The filter in question.
        filter: FilterKind,
    },
    /// `min_accuracy` exceeds 100, so no OS guess can satisfy it.
    MinAccuracyOutOfRange {
        /// The configured minimum.
        min_accuracy: u32,
    },
    /// A `TargetSoftware.value` entry is neither a version nor a range. It
    /// will only match a detected version spelled identically.
    UnparsableVersionExpression {
        /// The offending entry.
        entry: String,
        /// Parser message.
        reason: String,
    },
}

impl fmt::Display for ValidationWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingInfo => f.write_str("plugin info is missing"),
            Self::UnspecifiedPluginType => f.write_str("plugin type is PLUGIN_TYPE_UNSPECIFIED"),
            Self::UnrecognizedPluginType { value } => {
                write!(f, "plugin type {value} is not recognized")
            }
            Self::EmptyPluginName => f.write_str("plugin name is empty"),
            Self::UnconstrainedFilter { filter } => {
                write!(f, "{filter} is present but constrains nothing")
            }
            Self::MinAccuracyOutOfRange { min_accuracy } => write!(
                f,
                "min_accuracy {min_accuracy} exceeds {MAX_ACCURACY}; no target can match"
            ),
            Self::UnparsableVersionExpression { entry, reason } => {
                write!(f, "version entry {entry:?} is not a version or range: {reason}")
            }
        }
    }
}

/// Collect every warning for `definition`, in field order.
pub fn validate_definition(definition: &PluginDefinition) -> Vec<ValidationWarning> {
    let mut warnings = Vec::new();

    match &definition.info {
        Some(info) => validate_info(info, &mut warnings),
        None => warnings.push(ValidationWarning::MissingInfo),
    }

    if let Some(filter) = &definition.target_service_name {
        if filter.is_unconstrained() {
            warnings.push(ValidationWarning::UnconstrainedFilter {
                filter: FilterKind::ServiceName,
            });
        }
    }

    if let Some(filter) = &definition.target_software {
        if filter.is_unconstrained() {
            warnings.push(ValidationWarning::UnconstrainedFilter {
                filter: FilterKind::Software,
            });
        }
        for entry in &filter.value {
            if let Err(error) = VersionEntry::parse(entry) {
                warnings.push(ValidationWarning::UnparsableVersionExpression {
                    entry: entry.clone(),
                    reason: error.to_string(),
                });
            }
        }
    }

    if let Some(filter) = &definition.target_operating_system_class {
        if filter.is_unconstrained() {
            warnings.push(ValidationWarning::UnconstrainedFilter {
                filter: FilterKind::OperatingSystemClass,
            });
        }
        if filter.min_accuracy > MAX_ACCURACY {
            warnings.push(ValidationWarning::MinAccuracyOutOfRange {
                min_accuracy: filter.min_accuracy,
            });
        }
    }

    warnings
}

fn validate_info(info: &PluginInfo, warnings: &mut Vec<ValidationWarning>) {
    if info.plugin_type.is_unspecified() {
        warnings.push(ValidationWarning::UnspecifiedPluginType);
    } else if !info.plugin_type.is_known() {
        warnings.push(ValidationWarning::UnrecognizedPluginType {
            value: info.plugin_type.as_i32(),
        });
    }
    if info.name.is_empty() {
        warnings.push(ValidationWarning::EmptyPluginName);
    }
}

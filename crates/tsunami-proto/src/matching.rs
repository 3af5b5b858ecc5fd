//! # Target Matching
//!
//! A target matches a [`PluginDefinition`] iff every filter present on the
//! definition holds for it. Absent filters, and empty lists inside present
//! filters, constrain nothing.
//!
//! | Filter | Holds when |
//! |--------|------------|
//! | `target_service_name` | the detected service name is a case-sensitive member of `value` |
//! | `target_software` | the detected software name equals `name` (ASCII case-insensitive) and the detected version satisfies an entry of `value` |
//! | `for_web_service` | the target is classified as a web service |
//! | `target_operating_system_class` | some OS guess passes vendor, family and accuracy |
//!
//! Matching is pure and cannot fail. Every function here may be called
//! concurrently on shared definitions.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::plugin::{
    PluginDefinition, TargetOperatingSystemClass, TargetServiceName, TargetSoftware,
};
use crate::version::version_satisfies;

/// Service names classified as web services.
const WEB_SERVICE_NAMES: &[&str] = &[
    "http",
    "http-alt",
    "http-proxy",
    "https",
    "radan-http",
    "ssl/http",
    "ssl/https",
];

/// Returns true if `service_name` names a web service.
///
/// Comparison is ASCII case-insensitive.
pub fn is_web_service(service_name: &str) -> bool {
    WEB_SERVICE_NAMES
        .iter()
        .any(|name| name.eq_ignore_ascii_case(service_name))
}

/// Software identified on a target.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectedSoftware {
    /// Product name, e.g. `nginx`.
    pub name: String,
    /// Detected version, if the fingerprinter found one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
}

/// One operating system guess reported by a port scanner.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OperatingSystemGuess {
    /// Vendor, e.g. `Microsoft`.
    pub vendor: String,
    /// Family, e.g. `Windows`.
    pub os_family: String,
    /// Confidence of the guess, 0-100.
    pub accuracy: u32,
}

/// Runtime facts about a scanned network endpoint.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TargetDescriptor {
    /// Detected service name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub service_name: Option<String>,
    /// Detected software.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub software: Option<DetectedSoftware>,
    /// Whether the service is a web service.
    pub web_service: bool,
    /// Operating system guesses, in the order the scanner reported them.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub operating_system_classes: Vec<OperatingSystemGuess>,
}

impl TargetDescriptor {
    /// Target running `service_name`.
    pub fn service(service_name: impl Into<String>) -> Self {
        Self {
            service_name: Some(service_name.into()),
            ..Self::default()
        }
    }

    /// Set the detected software.
    pub fn with_software(mut self, name: impl Into<String>, version: Option<&str>) -> Self {
        self.software = Some(DetectedSoftware {
            name: name.into(),
            version: version.map(str::to_string),
        });
        self
    }

    /// Set the web-service classification explicitly.
    pub fn with_web_service(mut self, web_service: bool) -> Self {
        self.web_service = web_service;
        self
    }

    /// Add an operating system guess.
    pub fn with_os_guess(
        mut self,
        vendor: impl Into<String>,
        os_family: impl Into<String>,
        accuracy: u32,
    ) -> Self {
        self.operating_system_classes.push(OperatingSystemGuess {
            vendor: vendor.into(),
            os_family: os_family.into(),
            accuracy,
        });
        self
    }

    /// Derive the web-service classification from the service name.
    ///
    /// A target already classified as a web service stays one.
    pub fn classify_web_service(mut self) -> Self {
        if let Some(service_name) = &self.service_name {
            self.web_service |= is_web_service(service_name);
        }
        self
    }
}

/// The four filters of a definition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterKind {
    /// `target_service_name`.
    ServiceName,
    /// `target_software`.
    Software,
    /// `for_web_service`.
    WebService,
    /// `target_operating_system_class`.
    OperatingSystemClass,
}

impl FilterKind {
    /// Field name of the filter in the definition.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ServiceName => "target_service_name",
            Self::Software => "target_software",
            Self::WebService => "for_web_service",
            Self::OperatingSystemClass => "target_operating_system_class",
        }
    }
}

impl fmt::Display for FilterKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returns true if every filter present on `definition` holds for `target`.
pub fn matches(definition: &PluginDefinition, target: &TargetDescriptor) -> bool {
    first_mismatch(definition, target).is_none()
}

/// The first filter, in tag order, that rejects `target`.
pub fn first_mismatch(
    definition: &PluginDefinition,
    target: &TargetDescriptor,
) -> Option<FilterKind> {
    if let Some(filter) = &definition.target_service_name {
        if !service_name_matches(filter, target) {
            return Some(FilterKind::ServiceName);
        }
    }
    if let Some(filter) = &definition.target_software {
        if !software_matches(filter, target) {
            return Some(FilterKind::Software);
        }
    }
    if definition.for_web_service && !target.web_service {
        return Some(FilterKind::WebService);
    }
    if let Some(filter) = &definition.target_operating_system_class {
        if !operating_system_matches(filter, target) {
            return Some(FilterKind::OperatingSystemClass);
        }
    }
    None
}

/// Service name filter predicate.
pub fn service_name_matches(filter: &TargetServiceName, target: &TargetDescriptor) -> bool {
    if filter.value.is_empty() {
        return true;
    }
    target
        .service_name
        .as_deref()
        .is_some_and(|service| filter.value.iter().any(|name| name == service))
}

/// Software filter predicate.
///
/// A non-empty version list is never satisfied by a target without a
/// detected version.
pub fn software_matches(filter: &TargetSoftware, target: &TargetDescriptor) -> bool {
    let software = target.software.as_ref();
    let name_ok = filter.name.is_empty()
        || software.is_some_and(|s| s.name.eq_ignore_ascii_case(&filter.name));
    if !name_ok {
        return false;
    }
    if filter.value.is_empty() {
        return true;
    }
    software
        .and_then(|s| s.version.as_deref())
        .is_some_and(|detected| {
            filter
                .value
                .iter()
                .any(|entry| version_satisfies(detected, entry))
        })
}

/// Operating system filter predicate.
pub fn operating_system_matches(
    filter: &TargetOperatingSystemClass,
    target: &TargetDescriptor,
) -> bool {
    if filter.is_unconstrained() {
        return true;
    }
    target
        .operating_system_classes
        .iter()
        .any(|guess| guess_matches(filter, guess))
}

fn guess_matches(filter: &TargetOperatingSystemClass, guess: &OperatingSystemGuess) -> bool {
    (filter.vendor.is_empty() || filter.vendor.contains(&guess.vendor))
        && (filter.os_family.is_empty() || filter.os_family.contains(&guess.os_family))
        && guess.accuracy >= filter.min_accuracy
}

//! # Plugin Catalog
//!
//! A read-only collection of decoded definitions, queried by type, by
//! plugin id, and by target.
//!
//! Vulnerability detectors can additionally be narrowed by name with a
//! [`SelectionConfig`]. Port scanners and fingerprinters are never subject
//! to selection.

use serde::{Deserialize, Serialize};

use crate::matching::{first_mismatch, TargetDescriptor};
use crate::plugin::{PluginDefinition, PluginType};

/// Include/exclude lists over detector names.
///
/// An empty include list admits every detector. A name on the exclude
/// list is rejected even if it is also included.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SelectionConfig {
    /// Detector names to run. Empty means all.
    pub detectors_include: Vec<String>,
    /// Detector names never to run.
    pub detectors_exclude: Vec<String>,
}

impl SelectionConfig {
    /// Returns true if a detector called `name` passes the lists.
    pub fn admits(&self, name: &str) -> bool {
        let included =
            self.detectors_include.is_empty() || self.detectors_include.iter().any(|n| n == name);
        let excluded = self.detectors_exclude.iter().any(|n| n == name);
        included && !excluded
    }
}

/// Definitions held for the lifetime of a scan session.
#[derive(Debug, Clone, Default)]
pub struct PluginCatalog {
    definitions: Vec<PluginDefinition>,
    selection: SelectionConfig,
}

impl PluginCatalog {
    /// Catalog over `definitions`, with no selection applied.
    pub fn new(definitions: Vec<PluginDefinition>) -> Self {
        Self {
            definitions,
            selection: SelectionConfig::default(),
        }
    }

    /// Apply detector selection.
    pub fn with_selection(mut self, selection: SelectionConfig) -> Self {
        self.selection = selection;
        self
    }

    /// Number of definitions, selected or not.
    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    /// Returns true if the catalog holds no definitions.
    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }

    /// Every definition, in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &PluginDefinition> {
        self.definitions.iter()
    }

    /// Definitions of the given type.
    pub fn by_type(&self, plugin_type: PluginType) -> impl Iterator<Item = &PluginDefinition> {
        self.definitions
            .iter()
            .filter(move |definition| definition.plugin_type() == plugin_type)
    }

    /// First definition whose plugin id is `id`.
    pub fn find_by_id(&self, id: &str) -> Option<&PluginDefinition> {
        self.definitions
            .iter()
            .find(|definition| definition.id().as_deref() == Some(id))
    }

    /// Returns true if `definition` survives detector selection.
    pub fn is_selected(&self, definition: &PluginDefinition) -> bool {
        match &definition.info {
            Some(info) if info.plugin_type == PluginType::VulnDetection => {
                self.selection.admits(&info.name)
            }
            _ => true,
        }
    }

    /// Selected definitions matching `target`, in insertion order.
    pub fn matching<'a>(&'a self, target: &TargetDescriptor) -> Vec<&'a PluginDefinition> {
        let mut matched = Vec::new();
        for definition in &self.definitions {
            let id = definition.id().unwrap_or_default();
            if !self.is_selected(definition) {
                tracing::debug!(plugin = %id, "excluded by detector selection");
                continue;
            }
            match first_mismatch(definition, target) {
                Some(filter) => {
                    tracing::debug!(plugin = %id, filter = %filter, "target rejected");
                }
                None => matched.push(definition),
            }
        }
        matched
    }
}

impl FromIterator<PluginDefinition> for PluginCatalog {
    fn from_iter<I: IntoIterator<Item = PluginDefinition>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plugin::PluginInfo;

    fn plugin(plugin_type: PluginType, name: &str) -> PluginDefinition {
        PluginDefinition::new(PluginInfo::new(plugin_type, name, "1.0", "tsunami"))
    }

    fn catalog() -> PluginCatalog {
        [
            plugin(PluginType::PortScan, "Nmap"),
            plugin(PluginType::ServiceFingerprint, "WebFingerprinter").with_web_service(true),
            plugin(PluginType::VulnDetection, "NginxDetector").with_software("nginx", ["1.18"]),
            plugin(PluginType::VulnDetection, "SshDetector").with_service_names(["ssh"]),
        ]
        .into_iter()
        .collect()
    }

    #[test]
    fn selection_lists() {
        let all = SelectionConfig::default();
        assert!(all.admits("anything"));

        let include = SelectionConfig {
            detectors_include: vec!["A".into()],
            ..SelectionConfig::default()
        };
        assert!(include.admits("A"));
        assert!(!include.admits("B"));

        let both = SelectionConfig {
            detectors_include: vec!["A".into()],
            detectors_exclude: vec!["A".into()],
        };
        assert!(!both.admits("A"));
    }

    #[test]
    fn lookup_by_type_and_id() {
        let catalog = catalog();
        assert_eq!(catalog.len(), 4);
        assert_eq!(catalog.by_type(PluginType::VulnDetection).count(), 2);
        assert_eq!(catalog.by_type(PluginType::Unspecified).count(), 0);
        let found = catalog
            .find_by_id("/tsunami/PORT_SCAN/Nmap/1.0")
            .unwrap();
        assert_eq!(found.plugin_type(), PluginType::PortScan);
        assert!(catalog.find_by_id("/tsunami/PORT_SCAN/Nmap/2.0").is_none());
    }

    #[test]
    fn matching_target() {
        let catalog = catalog();
        let target = TargetDescriptor::service("http")
            .classify_web_service()
            .with_software("nginx", Some("1.18"));
        let names: Vec<&str> = catalog
            .matching(&target)
            .into_iter()
            .filter_map(|d| d.info.as_ref().map(|i| i.name.as_str()))
            .collect();
        assert_eq!(names, vec!["Nmap", "WebFingerprinter", "NginxDetector"]);
    }

    #[test]
    fn selection_applies_to_detectors_only() {
        let catalog = catalog().with_selection(SelectionConfig {
            detectors_exclude: vec!["NginxDetector".into(), "Nmap".into()],
            ..SelectionConfig::default()
        });
        let target = TargetDescriptor::service("http").with_software("nginx", Some("1.18"));
        let names: Vec<&str> = catalog
            .matching(&target)
            .into_iter()
            .filter_map(|d| d.info.as_ref().map(|i| i.name.as_str()))
            .collect();
        assert_eq!(names, vec!["Nmap"]);
    }

    #[test]
    fn empty_catalog() {
        let catalog = PluginCatalog::default();
        assert!(catalog.is_empty());
        assert!(catalog.matching(&TargetDescriptor::default()).is_empty());
    }

    #[test]
    fn detector_typed_by_number_is_still_selected_out() {
        use crate::codec::Message;

        let by_number = plugin(PluginType::from_i32(3), "NginxDetector");
        let wire = PluginDefinition::decode(&by_number.encode_to_vec()).unwrap();
        let catalog: PluginCatalog = [by_number, wire].into_iter().collect();
        let catalog = catalog.with_selection(SelectionConfig {
            detectors_exclude: vec!["NginxDetector".into()],
            ..SelectionConfig::default()
        });
        assert!(catalog.iter().all(|d| !catalog.is_selected(d)));
        assert!(catalog.matching(&TargetDescriptor::default()).is_empty());
    }
}

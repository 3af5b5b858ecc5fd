//! # Match Subcommand
//!
//! Previews which plugins of a manifest apply to each target of a target
//! set, honouring the detector selection of the configuration file.
//!
//! Output is one block per target:
//!
//! ```text
//! 10.0.0.5:443
//!   /Tsunami Team/PORT_SCAN/NmapPortScanner/0.1
//! ```
//!
//! Run with `-vv` to log which filter rejected each plugin.

use std::io::Write;
use std::path::PathBuf;

use anyhow::Result;
use clap::Args;
use tsunami_manifest::ManifestLoader;
use tsunami_proto::{PluginCatalog, SelectionConfig};

use crate::plugin_label;

/// Arguments for the match subcommand.
#[derive(Args, Debug)]
pub struct MatchArgs {
    /// Plugin manifest (YAML or JSON).
    pub manifest: PathBuf,

    /// Target set (YAML or JSON).
    pub targets: PathBuf,
}

/// Execute the match subcommand.
pub fn run_match(args: &MatchArgs, selection: &SelectionConfig, out: &mut dyn Write) -> Result<u8> {
    let loader = ManifestLoader::new()?;
    let manifest = loader.load_manifest_file(&args.manifest)?;
    let target_set = loader.load_targets_file(&args.targets)?;

    let catalog: PluginCatalog = manifest.plugins.into_iter().collect();
    let catalog = catalog.with_selection(selection.clone());

    for named in &target_set.targets {
        let _span = tracing::debug_span!("target", name = %named.name).entered();
        writeln!(out, "{}", named.name)?;
        let matched = catalog.matching(&named.target);
        if matched.is_empty() {
            writeln!(out, "  (no matching plugins)")?;
        }
        for definition in matched {
            let index = catalog
                .iter()
                .position(|d| std::ptr::eq(d, definition))
                .unwrap_or_default();
            writeln!(out, "  {}", plugin_label(definition, index))?;
        }
    }
    Ok(0)
}

//! # Validate Subcommand
//!
//! Checks a plugin manifest against its schema, then reports semantic
//! warnings for each definition.
//!
//! Exit codes: `0` valid, `1` schema violations, or warnings with
//! `--deny-warnings`.

use std::io::Write;
use std::path::PathBuf;

use anyhow::Result;
use clap::Args;
use tsunami_manifest::{ManifestError, ManifestLoader};
use tsunami_proto::validate_definition;

use crate::plugin_label;

/// Arguments for the validate subcommand.
#[derive(Args, Debug)]
pub struct ValidateArgs {
    /// Plugin manifest (YAML or JSON).
    pub manifest: PathBuf,

    /// Exit with status 1 when any definition has warnings.
    #[arg(long)]
    pub deny_warnings: bool,
}

/// Execute the validate subcommand.
pub fn run_validate(args: &ValidateArgs, out: &mut dyn Write) -> Result<u8> {
    let loader = ManifestLoader::new()?;
    let manifest = match loader.load_manifest_file(&args.manifest) {
        Ok(manifest) => manifest,
        Err(ManifestError::ValidationFailed {
            schema_name,
            violations,
        }) => {
            writeln!(
                out,
                "FAIL {}: {} schema violation(s) against {schema_name}",
                args.manifest.display(),
                violations.len()
            )?;
            writeln!(out, "{violations}")?;
            return Ok(1);
        }
        Err(e) => return Err(e.into()),
    };

    let mut warning_count = 0;
    for (index, definition) in manifest.plugins.iter().enumerate() {
        for warning in validate_definition(definition) {
            warning_count += 1;
            writeln!(out, "WARN {}: {warning}", plugin_label(definition, index))?;
        }
    }

    writeln!(
        out,
        "OK {}: {} plugin(s), {warning_count} warning(s)",
        args.manifest.display(),
        manifest.plugins.len()
    )?;

    if args.deny_warnings && warning_count > 0 {
        tracing::warn!(warnings = warning_count, "warnings denied");
        return Ok(1);
    }
    Ok(0)
}

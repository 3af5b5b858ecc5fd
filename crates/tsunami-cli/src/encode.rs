//! # Encode Subcommand
//!
//! Encodes every definition of a manifest as a stream of varint
//! length-prefixed `PluginDefinition` messages. Without `--output` the
//! stream is printed as hex, one message per line.

use std::io::Write;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use tsunami_manifest::ManifestLoader;
use tsunami_proto::Message;

/// Arguments for the encode subcommand.
#[derive(Args, Debug)]
pub struct EncodeArgs {
    /// Plugin manifest (YAML or JSON).
    pub manifest: PathBuf,

    /// Write the binary stream to this file instead of printing hex.
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

/// Execute the encode subcommand.
pub fn run_encode(args: &EncodeArgs, out: &mut dyn Write) -> Result<u8> {
    let manifest = ManifestLoader::new()?.load_manifest_file(&args.manifest)?;
    let frames: Vec<Vec<u8>> = manifest
        .plugins
        .iter()
        .map(|definition| definition.encode_length_delimited_to_vec())
        .collect();

    match &args.output {
        Some(path) => {
            let stream = frames.concat();
            std::fs::write(path, &stream)
                .with_context(|| format!("failed to write {}", path.display()))?;
            tracing::info!(path = %path.display(), bytes = stream.len(), "wrote encoded stream");
            writeln!(
                out,
                "wrote {} definition(s), {} bytes, to {}",
                frames.len(),
                stream.len(),
                path.display()
            )?;
        }
        None => {
            for frame in &frames {
                writeln!(out, "{}", hex::encode(frame))?;
            }
        }
    }
    Ok(0)
}

//! # Decode Subcommand
//!
//! Decodes a stream of length-prefixed `PluginDefinition` messages and
//! prints the result as a plugin manifest, so the output can be fed back to
//! `validate` or `encode`.
//!
//! A message that fails to decode is logged and skipped; the remaining
//! messages are still decoded. A broken length prefix ends the stream, as
//! no later frame boundary can be trusted.

use std::io::Write;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, ValueEnum};
use tsunami_manifest::PluginManifest;
use tsunami_proto::wire::Reader;
use tsunami_proto::{DecodeError, DecodeOptions, Message, PluginDefinition};

/// Output document format.
#[derive(ValueEnum, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum OutputFormat {
    /// YAML manifest.
    #[default]
    Yaml,
    /// Pretty-printed JSON manifest.
    Json,
}

/// Arguments for the decode subcommand.
#[derive(Args, Debug)]
pub struct DecodeArgs {
    /// Encoded stream, as written by `encode --output`.
    pub input: PathBuf,

    /// Treat the input as hex text, as printed by `encode` without `--output`.
    #[arg(long)]
    pub hex: bool,

    /// Output format.
    #[arg(long, value_enum, default_value_t = OutputFormat::Yaml)]
    pub format: OutputFormat,
}

/// Outcome of walking a stream.
#[derive(Debug, Default)]
pub struct DecodedStream {
    /// Messages that decoded, in stream order.
    pub definitions: Vec<PluginDefinition>,
    /// Index and error of each message that did not.
    pub failures: Vec<(usize, DecodeError)>,
}

/// Split `stream` into frames and decode each one independently.
pub fn decode_stream(stream: &[u8], options: DecodeOptions) -> DecodedStream {
    let mut result = DecodedStream::default();
    let mut reader = Reader::new(stream);
    let mut index = 0;
    while !reader.is_empty() {
        let frame = match reader.read_length_delimited() {
            Ok(frame) => frame,
            Err(error) => {
                result.failures.push((index, error));
                break;
            }
        };
        match PluginDefinition::decode_with(frame, options) {
            Ok(definition) => {
                if !definition.unknown_fields.is_empty() {
                    tracing::info!(
                        frame = index,
                        unknown = definition.unknown_fields.len(),
                        "preserved unknown fields"
                    );
                }
                result.definitions.push(definition);
            }
            Err(error) => result.failures.push((index, error)),
        }
        index += 1;
    }
    result
}

fn read_input(args: &DecodeArgs) -> Result<Vec<u8>> {
    if args.hex {
        let text = std::fs::read_to_string(&args.input)
            .with_context(|| format!("failed to read {}", args.input.display()))?;
        let digits: String = text.split_whitespace().collect();
        hex::decode(&digits).with_context(|| format!("invalid hex in {}", args.input.display()))
    } else {
        std::fs::read(&args.input)
            .with_context(|| format!("failed to read {}", args.input.display()))
    }
}

/// Execute the decode subcommand.
pub fn run_decode(args: &DecodeArgs, options: DecodeOptions, out: &mut dyn Write) -> Result<u8> {
    let stream = read_input(args)?;
    let decoded = decode_stream(&stream, options);

    for (index, error) in &decoded.failures {
        tracing::error!(frame = index, %error, "failed to decode message");
    }

    let manifest = PluginManifest {
        plugins: decoded.definitions,
    };
    match args.format {
        OutputFormat::Yaml => write!(out, "{}", serde_yaml::to_string(&manifest)?)?,
        OutputFormat::Json => writeln!(out, "{}", serde_json::to_string_pretty(&manifest)?)?,
    }

    Ok(if decoded.failures.is_empty() { 0 } else { 1 })
}

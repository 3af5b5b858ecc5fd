//! # Describe Subcommand
//!
//! Prints the plugin definition schema as the decoder understands it: every
//! message with its fields, then the `PluginType` values.

use std::io::Write;

use anyhow::Result;
use tsunami_proto::descriptor::{Cardinality, MESSAGES, PLUGIN_TYPE};

/// Execute the describe subcommand.
pub fn run_describe(out: &mut dyn Write) -> Result<u8> {
    for message in MESSAGES {
        writeln!(out, "message {}", message.full_name)?;
        for field in message.fields {
            let label = match field.cardinality {
                Cardinality::Singular => "",
                Cardinality::Repeated => "repeated ",
            };
            writeln!(
                out,
                "  {:>2}  {label}{} {}",
                field.number,
                field.kind.type_name(),
                field.name
            )?;
        }
    }
    writeln!(out, "enum {}", PLUGIN_TYPE.full_name)?;
    for value in PLUGIN_TYPE.values {
        writeln!(out, "  {:>2}  {}", value.number, value.name)?;
    }
    Ok(0)
}

//! # tsunami-cli: the `tsunami-plugin` Tool
//!
//! Command-line front end over `tsunami-proto` and `tsunami-manifest`.
//!
//! ## Subcommands
//!
//! - `tsunami-plugin validate` checks a manifest against its schema and
//!   reports semantic warnings.
//! - `tsunami-plugin encode` writes manifest definitions as length-prefixed
//!   wire messages.
//! - `tsunami-plugin decode` reads such a stream back into a manifest.
//! - `tsunami-plugin match` previews which plugins apply to each target.
//! - `tsunami-plugin describe` prints the message and enum descriptors.
//!
//! ```bash
//! tsunami-plugin validate plugins.yaml --deny-warnings
//! tsunami-plugin encode plugins.yaml -o plugins.bin
//! tsunami-plugin decode plugins.bin --format json
//! tsunami-plugin -vv match plugins.yaml targets.yaml
//! ```
//!
//! Every handler takes its arguments and an output sink and returns the
//! process exit code, so tests can drive them without spawning a process.

pub mod config;
pub mod decode;
pub mod describe;
pub mod encode;
pub mod matching;
pub mod validate;

use tsunami_proto::PluginDefinition;

/// Human-readable label for a definition in command output: its plugin id,
/// or its position in the manifest when it has no `info`.
pub fn plugin_label(definition: &PluginDefinition, index: usize) -> String {
    definition
        .id()
        .unwrap_or_else(|| format!("plugin #{index}"))
}

//! # tsunami-plugin CLI entry point
//!
//! Parses command-line arguments, loads the optional configuration file,
//! and dispatches to subcommand handlers.

use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use tsunami_cli::config::CliConfig;
use tsunami_cli::decode::{run_decode, DecodeArgs};
use tsunami_cli::describe::run_describe;
use tsunami_cli::encode::{run_encode, EncodeArgs};
use tsunami_cli::matching::{run_match, MatchArgs};
use tsunami_cli::validate::{run_validate, ValidateArgs};

/// Tsunami plugin definition toolkit.
///
/// Validates plugin manifests, converts them to and from the wire format,
/// and previews which plugins a scan would run against each target.
#[derive(Parser, Debug)]
#[command(name = "tsunami-plugin", version, about, long_about = None)]
struct Cli {
    /// Enable verbose output. Repeat for more verbosity (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Path to configuration file.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Validate a plugin manifest against its schema.
    Validate(ValidateArgs),

    /// Encode a manifest as length-prefixed wire messages.
    Encode(EncodeArgs),

    /// Decode length-prefixed wire messages into a manifest.
    Decode(DecodeArgs),

    /// Show which plugins match each target of a target set.
    Match(MatchArgs),

    /// Print the plugin definition message descriptors.
    Describe,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 => EnvFilter::new("warn"),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };

    // Logs go to stderr so decoded documents on stdout stay parseable.
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let stdout = std::io::stdout();
    let result = run(&cli, &mut stdout.lock());

    match result {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            tracing::error!("{e:#}");
            ExitCode::from(1)
        }
    }
}

/// Load the configuration, run the selected subcommand, and flush `out`.
fn run(cli: &Cli, out: &mut dyn Write) -> anyhow::Result<u8> {
    let config = CliConfig::load(cli.config.as_deref())?;
    let code = match &cli.command {
        Commands::Validate(args) => run_validate(args, out),
        Commands::Encode(args) => run_encode(args, out),
        Commands::Decode(args) => run_decode(args, config.decode, out),
        Commands::Match(args) => run_match(args, &config.selection, out),
        Commands::Describe => run_describe(out),
    }?;
    out.flush().context("failed to write output")?;
    Ok(code)
}

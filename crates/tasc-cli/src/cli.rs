//! CLI argument definitions for tasc.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use clap_verbosity_flag::{Verbosity, WarnLevel};
use colorchoice_clap::Color;

#[derive(Parser)]
#[command(
    name = "tasc",
    version,
    about = "Inspect tasc domains and operations",
    long_about = "Inspect the registered domains and operations of the tasc engine.\n\n\
                  The operation manifest lists every (domain, operation) pair with its\n\
                  parameters and output kind, for tooling generators."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Adjust log verbosity (-v for info, -vv for debug, -q for errors only).
    #[command(flatten)]
    pub verbosity: Verbosity<WarnLevel>,

    /// Control ANSI color output (auto, always, never).
    #[command(flatten)]
    pub color: Color,

    /// Explicit log level (overrides -v/-q flags).
    #[arg(long = "log-level", value_enum, global = true)]
    pub log_level: Option<LogLevelArg>,

    /// Log output format (pretty for human, json for machine parsing).
    #[arg(
        long = "log-format",
        value_enum,
        default_value = "pretty",
        global = true
    )]
    pub log_format: LogFormatArg,

    /// Write logs to a file instead of stderr.
    #[arg(long = "log-file", value_name = "PATH", global = true)]
    pub log_file: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Command {
    /// List registered domains.
    Domains,

    /// List operations callable from a domain (all operations by default).
    Operations(OperationsArgs),

    /// Print, write or check the operation manifest.
    Manifest(ManifestArgs),
}

#[derive(Args)]
pub struct OperationsArgs {
    /// Show the operations available in this domain, inherited ones included.
    #[arg(long = "domain", value_name = "DOMAIN")]
    pub domain: Option<String>,
}

#[derive(Args)]
pub struct ManifestArgs {
    /// Write the manifest to this file instead of stdout.
    #[arg(long = "output", value_name = "PATH", conflicts_with = "check")]
    pub output: Option<PathBuf>,

    /// Compare a committed manifest with the registry; exit 1 on drift.
    #[arg(long = "check", value_name = "PATH")]
    pub check: Option<PathBuf>,
}

/// CLI log level choices.
#[derive(Clone, Copy, ValueEnum)]
pub enum LogLevelArg {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// CLI log format choices.
#[derive(Clone, Copy, ValueEnum)]
pub enum LogFormatArg {
    Pretty,
    Compact,
    Json,
}

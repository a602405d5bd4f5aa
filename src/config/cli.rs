//! CLI argument parsing

use clap::Parser;
use std::path::PathBuf;

/// sampletag - audio sample analysis for library tagging
///
/// Classifies samples as one-shot or loop, extracts an onset timeline and a
/// flat feature record, and suggests tags. Runs either on a single file or
/// as a persistent stdin/stdout worker.
#[derive(Parser, Debug)]
#[command(name = "sampletag")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Audio file to analyze (omit when running with --worker)
    #[arg(value_name = "PATH")]
    pub input: Option<PathBuf>,

    /// Analysis level (only "advanced" is currently exposed; the flag is
    /// kept for forward compatibility)
    #[arg(long, value_name = "LEVEL", default_value = "advanced")]
    pub level: String,

    /// Filename hint for classification (defaults to the input's file name)
    #[arg(long, value_name = "NAME")]
    pub filename: Option<String>,

    /// Run as a persistent worker: line-delimited JSON requests on stdin,
    /// one JSON response per line on stdout
    #[arg(long, default_value = "false")]
    pub worker: bool,

    /// Verbose output (can be repeated: -v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Quiet mode (errors only)
    #[arg(short, long, default_value = "false")]
    pub quiet: bool,
}

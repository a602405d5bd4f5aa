//! sampletag CLI entry point

use clap::Parser;
use sampletag::config::{CapabilityConfig, Cli};
use sampletag::pipeline::AnalysisPipeline;
use sampletag::types::AnalysisLevel;
use sampletag::worker;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

fn main() -> ExitCode {
    // Parse CLI arguments
    let cli = Cli::parse();

    // Logging goes to stderr; stdout carries the JSON protocol
    init_logging(&cli);

    // Resolve capabilities and pin the numeric thread pool
    let capabilities = CapabilityConfig::from_env();
    if let Err(e) = capabilities.configure_thread_pool() {
        eprintln!("Fatal error: {}", e);
        return ExitCode::FAILURE;
    }

    let pipeline = AnalysisPipeline::new(capabilities);

    if cli.worker {
        return match worker::serve_stdio(&pipeline) {
            Ok(()) => ExitCode::SUCCESS,
            Err(e) => {
                eprintln!("Fatal error: {}", e);
                ExitCode::FAILURE
            }
        };
    }

    // One-shot mode: analyze a single file and print the record
    let input = match cli.input {
        Some(path) => path,
        None => {
            print_error_json("missing input path (or pass --worker)");
            return ExitCode::FAILURE;
        }
    };

    let level = AnalysisLevel::parse(&cli.level);
    match pipeline.analyze(&input, level, cli.filename.as_deref()) {
        Ok(record) => match serde_json::to_string_pretty(&record) {
            Ok(json) => {
                println!("{}", json);
                ExitCode::SUCCESS
            }
            Err(e) => {
                print_error_json(&format!("Failed to serialize result: {}", e));
                ExitCode::FAILURE
            }
        },
        Err(e) => {
            print_error_json(&e.to_string());
            ExitCode::FAILURE
        }
    }
}

/// Fatal one-shot errors still produce a JSON document on stdout so
/// machine callers always have something to parse
fn print_error_json(message: &str) {
    let doc = serde_json::json!({ "error": message });
    println!("{}", doc);
}

fn init_logging(cli: &Cli) {
    let filter = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    let filter = if cli.quiet { "error" } else { filter };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

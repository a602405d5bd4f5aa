//! Worker request loop
//!
//! Strictly sequential read-eval-write over buffered line streams: one
//! request is fully served before the next line is read. Request-scoped
//! failures, bad bytes included, become error responses; only I/O failure
//! on the streams themselves ends the loop with an error.

use crate::error::{Result, SampletagError};
use crate::pipeline::AnalysisPipeline;
use crate::types::AnalysisLevel;
use crate::worker::protocol::{ReadyBanner, Request, Response};
use std::io::{BufRead, Write};
use std::path::Path;
use tracing::{debug, error, info, warn};

/// Serve the worker protocol on stdin/stdout until shutdown or EOF
pub fn serve_stdio(pipeline: &AnalysisPipeline) -> Result<()> {
    let stdin = std::io::stdin();
    let stdout = std::io::stdout();
    run(pipeline, stdin.lock(), stdout.lock())
}

/// Serve the worker protocol over arbitrary streams.
///
/// Generic over the streams so tests can drive the loop with in-memory
/// buffers. Returns after a `shutdown` command or end of input.
pub fn run<R: BufRead, W: Write>(pipeline: &AnalysisPipeline, mut reader: R, mut writer: W) -> Result<()> {
    write_line(&mut writer, &ReadyBanner::new())?;
    info!("Worker ready, serving requests");

    let mut buf = Vec::new();
    loop {
        buf.clear();
        if reader.read_until(b'\n', &mut buf)? == 0 {
            break;
        }

        // Lines are read as raw bytes so a non-UTF-8 line stays a
        // request-scoped error instead of killing the loop
        let line = match std::str::from_utf8(&buf) {
            Ok(s) => s.trim(),
            Err(e) => {
                warn!(error = %e, "Request line is not valid UTF-8");
                let msg =
                    SampletagError::MalformedRequest(format!("invalid UTF-8: {}", e)).to_string();
                write_line(&mut writer, &Response::err(None, msg))?;
                continue;
            }
        };
        if line.is_empty() {
            continue;
        }

        let request: Request = match serde_json::from_str(line) {
            Ok(req) => req,
            Err(e) => {
                // Best effort to echo an id from the broken line
                let id = recover_id(line);
                warn!(error = %e, "Malformed request line");
                let msg = SampletagError::MalformedRequest(e.to_string()).to_string();
                write_line(&mut writer, &Response::err(id, msg))?;
                continue;
            }
        };

        let shutdown = request.cmd == "shutdown";
        let response = dispatch(pipeline, request);
        write_line(&mut writer, &response)?;

        if shutdown {
            info!("Shutdown requested, leaving request loop");
            return Ok(());
        }
    }

    debug!("Input stream closed, leaving request loop");
    Ok(())
}

fn dispatch(pipeline: &AnalysisPipeline, request: Request) -> Response {
    let id = request.id.clone();
    match request.cmd.as_str() {
        "ping" => Response::ok(id, "pong".into()),
        "shutdown" => Response::ok(id, "bye".into()),
        "analyze" => handle_analyze(pipeline, request),
        other => {
            warn!(cmd = other, "Unknown command");
            Response::err(id, SampletagError::UnknownCommand(other.to_string()).to_string())
        }
    }
}

fn handle_analyze(pipeline: &AnalysisPipeline, request: Request) -> Response {
    let id = request.id;

    let audio_path = match request.audio_path {
        Some(p) => p,
        None => {
            return Response::err(
                id,
                SampletagError::MissingField("audio_path").to_string(),
            )
        }
    };

    let level = AnalysisLevel::parse(request.level.as_deref().unwrap_or("advanced"));

    match pipeline.analyze(Path::new(&audio_path), level, request.filename.as_deref()) {
        Ok(record) => match Response::record(id.clone(), &record) {
            Ok(resp) => resp,
            Err(e) => Response::err(id, format!("Failed to serialize result: {}", e)),
        },
        Err(e) => {
            if e.is_request_scoped() {
                warn!(path = %audio_path, error = %e, "Analysis request failed");
            } else {
                error!(path = %audio_path, error = %e, "Analysis hit a non-request error");
            }
            Response::err(id, e.to_string())
        }
    }
}

/// Each response is one line, flushed immediately so the caller never
/// blocks on a buffered reply
fn write_line<W: Write, T: serde::Serialize>(writer: &mut W, value: &T) -> Result<()> {
    let json = serde_json::to_string(value)
        .map_err(|e| SampletagError::ConfigError(format!("Response serialization failed: {}", e)))?;
    writeln!(writer, "{}", json)?;
    writer.flush()?;
    Ok(())
}

/// Try to pull an `id` field out of a line that failed full parsing
fn recover_id(line: &str) -> Option<String> {
    serde_json::from_str::<serde_json::Value>(line)
        .ok()
        .and_then(|v| v.get("id").and_then(|id| id.as_str().map(str::to_owned)))
}

//! Wire types for the worker protocol
//!
//! One JSON object per line in each direction. Every response carries
//! exactly one of `result` or `error`, echoing the request id when one was
//! supplied.

use crate::types::FeatureRecord;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// An inbound request line
#[derive(Debug, Clone, Deserialize)]
pub struct Request {
    #[serde(default)]
    pub id: Option<String>,
    pub cmd: String,
    #[serde(default)]
    pub audio_path: Option<String>,
    #[serde(default)]
    pub level: Option<String>,
    #[serde(default)]
    pub filename: Option<String>,
}

/// An outbound response line
#[derive(Debug, Serialize)]
pub struct Response {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl Response {
    pub fn ok(id: Option<String>, result: Value) -> Self {
        Self {
            id,
            result: Some(result),
            error: None,
        }
    }

    pub fn err(id: Option<String>, message: impl Into<String>) -> Self {
        Self {
            id,
            result: None,
            error: Some(message.into()),
        }
    }

    pub fn record(id: Option<String>, record: &FeatureRecord) -> serde_json::Result<Self> {
        Ok(Self::ok(id, serde_json::to_value(record)?))
    }
}

/// The startup banner, emitted once before the request loop begins
#[derive(Debug, Serialize)]
pub struct ReadyBanner {
    pub status: &'static str,
}

impl ReadyBanner {
    pub fn new() -> Self {
        Self { status: "ready" }
    }
}

impl Default for ReadyBanner {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_parses_minimal_line() {
        let req: Request = serde_json::from_str(r#"{"cmd":"ping"}"#).unwrap();
        assert_eq!(req.cmd, "ping");
        assert_eq!(req.id, None);
        assert_eq!(req.audio_path, None);
    }

    #[test]
    fn test_request_parses_analyze_payload() {
        let line = r#"{"id":"7","cmd":"analyze","audio_path":"/tmp/kick.wav","filename":"Kick 01.wav"}"#;
        let req: Request = serde_json::from_str(line).unwrap();
        assert_eq!(req.id.as_deref(), Some("7"));
        assert_eq!(req.audio_path.as_deref(), Some("/tmp/kick.wav"));
        assert_eq!(req.level, None);
    }

    #[test]
    fn test_response_has_exactly_one_payload_key() {
        let ok = serde_json::to_string(&Response::ok(Some("1".into()), "pong".into())).unwrap();
        assert!(ok.contains("\"result\""));
        assert!(!ok.contains("\"error\""));

        let err = serde_json::to_string(&Response::err(None, "bad")).unwrap();
        assert!(err.contains("\"error\""));
        assert!(!err.contains("\"result\""));
        assert!(!err.contains("\"id\""));
    }

    #[test]
    fn test_ready_banner_shape() {
        let line = serde_json::to_string(&ReadyBanner::new()).unwrap();
        assert_eq!(line, r#"{"status":"ready"}"#);
    }
}

//! Protocol I/O for JSONL requests and responses
//!
//! This module provides:
//! - `parse_request` for parsing one request line
//! - `serialize_response` for writing one response line
//! - `serve` for answering a whole request stream

use std::io::{BufRead, Write};
use tracing::{debug, warn};

use super::message::{handle_request, Request, Response};
use crate::error::{ExpanderError, Result};
use crate::state::{DocumentStore, StateCache};

/// Maximum length for raw JSON in logs (state documents can be large)
const MAX_RAW_LOG_PREVIEW: usize = 200;

/// Get a truncated preview of raw JSON for logging
fn log_preview(raw: &str) -> (&str, usize) {
    let len = raw.len();
    if len <= MAX_RAW_LOG_PREVIEW {
        return (raw, len);
    }
    let mut end = MAX_RAW_LOG_PREVIEW;
    while !raw.is_char_boundary(end) {
        end -= 1;
    }
    (&raw[..end], len)
}

/// Parse a single request line
///
/// Errors distinguish a missing `type`, an unknown `type` and an invalid
/// payload for a known type.
pub fn parse_request(line: &str) -> Result<Request> {
    let (preview, raw_len) = log_preview(line);

    let value: serde_json::Value = serde_json::from_str(line).map_err(|e| {
        warn!(raw_input = %preview, raw_len, error = %e, "Failed to parse request JSON");
        ExpanderError::Protocol(format!("invalid JSON: {e}"))
    })?;

    let Some(message_type) = value.get("type").and_then(|t| t.as_str()) else {
        warn!(raw_input = %preview, raw_len, "Request missing 'type' field");
        return Err(ExpanderError::Protocol("missing 'type' field".to_string()));
    };
    let message_type = message_type.to_string();

    serde_json::from_value(value).map_err(|e| {
        if matches!(message_type.as_str(), "GET_STATE" | "SET_STATE") {
            warn!(message_type = %message_type, error = %e, "Invalid request payload");
            ExpanderError::Protocol(format!("invalid {message_type} payload: {e}"))
        } else {
            warn!(message_type = %message_type, raw_input = %preview, "Unknown request type");
            ExpanderError::Protocol(format!("unknown request type: {message_type}"))
        }
    })
}

/// Serialize a response to one JSON line (without the newline)
pub fn serialize_response(response: &Response) -> Result<String> {
    Ok(serde_json::to_string(response)?)
}

/// Answer every request on `reader`, one response line per request line
///
/// Empty lines are skipped. Malformed requests are answered with `ERROR` and
/// don't end the stream. Returns the number of requests answered.
pub fn serve<S, R, W>(cache: &StateCache<S>, reader: R, mut writer: W) -> Result<usize>
where
    S: DocumentStore,
    R: BufRead,
    W: Write,
{
    let mut answered = 0;
    for line in reader.lines() {
        let line = line.map_err(|e| ExpanderError::Protocol(format!("read failed: {e}")))?;
        let trimmed = line.trim();
        if trimmed.is_empty() {
            debug!("Skipping empty line in JSONL stream");
            continue;
        }

        let response = match parse_request(trimmed) {
            Ok(request) => {
                debug!(id = ?request.id(), "Handling request");
                handle_request(cache, request)
            }
            Err(e) => Response::error(None, e.to_string()),
        };

        let json = serialize_response(&response)?;
        writeln!(writer, "{json}")
            .and_then(|_| writer.flush())
            .map_err(|e| ExpanderError::Protocol(format!("write failed: {e}")))?;
        answered += 1;
    }
    Ok(answered)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::MemoryStore;
    use std::io::Cursor;

    #[test]
    fn test_log_preview_truncation() {
        let short = r#"{"type":"GET_STATE"}"#;
        assert_eq!(log_preview(short), (short, short.len()));

        let long = "é".repeat(150);
        let (preview, len) = log_preview(&long);
        assert_eq!(len, 300);
        assert!(preview.len() <= MAX_RAW_LOG_PREVIEW);
        assert!(long.starts_with(preview));
    }

    #[test]
    fn test_parse_request_missing_type() {
        let err = parse_request(r#"{"state":{}}"#).unwrap_err();
        assert!(err.to_string().contains("missing 'type'"));
    }

    #[test]
    fn test_parse_request_unknown_type() {
        let err = parse_request(r#"{"type":"DELETE_STATE"}"#).unwrap_err();
        assert!(err.to_string().contains("unknown request type: DELETE_STATE"));
    }

    #[test]
    fn test_parse_request_invalid_payload() {
        let err = parse_request(r#"{"type":"SET_STATE"}"#).unwrap_err();
        assert!(err.to_string().contains("invalid SET_STATE payload"));
    }

    #[test]
    fn test_serve_answers_each_line() {
        let cache = StateCache::new(MemoryStore::new());
        let input = concat!(
            r#"{"type":"SET_STATE","id":"1","state":{"cues":[{"id":"c","trigger":":hi","template":"Hello"}]}}"#,
            "\n\n",
            "not json\n",
            r#"{"type":"GET_STATE","id":"2"}"#,
            "\n",
        );
        let mut output = Vec::new();

        let answered = serve(&cache, Cursor::new(input), &mut output).unwrap();
        assert_eq!(answered, 3);

        let lines: Vec<Response> = String::from_utf8(output)
            .unwrap()
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        assert!(matches!(&lines[0], Response::State { id: Some(id), .. } if id == "1"));
        assert!(matches!(&lines[1], Response::Error { id: None, .. }));
        match &lines[2] {
            Response::State { state, .. } => assert_eq!(state.cues[0].trigger, ":hi"),
            other => panic!("expected STATE, got {other:?}"),
        }
    }
}

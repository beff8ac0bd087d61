//! Log streaming over Server-Sent Events.
//!
//! Each log line becomes one `data:` frame carrying a JSON
//! `{timestamp, message, stream}` entry. The stream/stderr split is a
//! heuristic: lines that parse as JSON with an error-ish level field
//! are classified as stderr.

use std::collections::HashMap;
use std::convert::Infallible;

use axum::extract::{Extension, Path, Query, State};
use axum::response::sse::{Event, Sse};
use chrono::{DateTime, Utc};
use futures::Stream;
use futures::StreamExt;
use maxcloud_core::Ctx;
use maxcloud_orchestrator::{LogOptions, OrchestratorError};
use serde::Serialize;
use serde_json::Value;
use tokio_stream::wrappers::ReceiverStream;
use tracing::error;

use super::services::resolve_service;
use super::{ApiError, store_error};
use crate::middleware::RequestId;
use crate::state::AppState;

/// One SSE frame.
#[derive(Debug, Serialize)]
pub struct LogEntry {
    pub timestamp: DateTime<Utc>,
    pub message: String,
    pub stream: String,
}

pub async fn stream_logs(
    State(state): State<AppState>,
    Extension(ctx): Extension<Ctx>,
    Extension(request_id): Extension<RequestId>,
    Path(id): Path<String>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, ApiError> {
    let svc = resolve_service(&state, &ctx, &id, &request_id).await?;

    let follow = params
        .get("follow")
        .is_some_and(|v| matches!(v.as_str(), "1" | "t" | "true" | "T" | "TRUE" | "True"));
    let tail = params
        .get("tail")
        .and_then(|v| v.parse::<u64>().ok())
        .filter(|&v| v > 0)
        .unwrap_or(100);

    let rx = state
        .orchestrator
        .logs(&svc, LogOptions { follow, tail })
        .await
        .map_err(|err| match err {
            OrchestratorError::NoPods => ApiError::new(
                axum::http::StatusCode::SERVICE_UNAVAILABLE,
                "no running pods found",
            ),
            other => {
                error!(error = %other, id = %svc.id, "failed to get logs");
                store_error(
                    maxcloud_core::Error::Internal(other.to_string()),
                    &request_id,
                )
            }
        })?;

    // The receiver is bounded, so a slow client back-pressures the
    // producer instead of buffering unbounded lines; client disconnect
    // drops the receiver and ends the producer.
    let stream = ReceiverStream::new(rx).map(|line| {
        let entry = LogEntry {
            timestamp: Utc::now(),
            stream: detect_stream(&line).to_string(),
            message: line,
        };
        Ok(Event::default().json_data(&entry).unwrap_or_default())
    });

    Ok(Sse::new(stream))
}

/// Classify a log line as stdout or stderr by sniffing a JSON level
/// field.
fn detect_stream(line: &str) -> &'static str {
    let Ok(value) = serde_json::from_str::<Value>(line) else {
        return "stdout";
    };

    match extract_level(&value) {
        Some(level) => match level.as_str() {
            "error" | "err" | "fatal" | "crit" | "critical" | "alert" | "emerg" | "emergency" => {
                "stderr"
            }
            _ => "stdout",
        },
        None => "stdout",
    }
}

fn extract_level(value: &Value) -> Option<String> {
    const LEVEL_KEYS: [&str; 5] = ["level", "severity", "lvl", "severity_text", "log_level"];
    LEVEL_KEYS
        .iter()
        .find_map(|key| value.get(key).and_then(Value::as_str))
        .map(|s| s.to_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn non_json_lines_are_stdout() {
        assert_eq!(detect_stream("plain text line"), "stdout");
        assert_eq!(detect_stream(""), "stdout");
    }

    #[test]
    fn json_without_level_is_stdout() {
        assert_eq!(detect_stream(r#"{"msg":"hello"}"#), "stdout");
    }

    #[test]
    fn error_levels_are_stderr() {
        for level in ["error", "err", "fatal", "crit", "critical", "alert", "emerg", "emergency"] {
            let line = format!(r#"{{"level":"{level}","msg":"boom"}}"#);
            assert_eq!(detect_stream(&line), "stderr", "level {level}");
        }
    }

    #[test]
    fn info_level_is_stdout() {
        assert_eq!(detect_stream(r#"{"level":"info","msg":"ok"}"#), "stdout");
    }

    #[test]
    fn alternate_level_keys_are_recognized() {
        assert_eq!(detect_stream(r#"{"severity":"ERROR"}"#), "stderr");
        assert_eq!(detect_stream(r#"{"lvl":"fatal"}"#), "stderr");
        assert_eq!(detect_stream(r#"{"log_level":"warn"}"#), "stdout");
    }
}

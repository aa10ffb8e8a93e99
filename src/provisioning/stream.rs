//! Model-create status stream.
//!
//! `POST /api/create` answers with NDJSON lines such as
//! `{"status":"reading model metadata"}` ... `{"status":"success"}`. Failures
//! show up as an `error` field or as a numeric status.
//!
//! ```text
//! CREATING --progress--> CREATING
//! CREATING --success---> VERIFYING
//! CREATING --failed----> FAILED
//! VERIFYING --failed---> FAILED
//! end of stream without success → VERIFYING (the listing decides)
//! ```

use serde::Deserialize;

use crate::provisioning::registry::ModelStatus;

#[derive(Debug, Deserialize)]
struct StatusLine {
    #[serde(default)]
    status: Option<StatusValue>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum StatusValue {
    Text(String),
    Code(i64),
}

/// One typed event from the create stream.
#[derive(Debug, Clone, PartialEq)]
pub enum CreateEvent {
    Progress(String),
    Success,
    Failed(String),
}

/// Parse one NDJSON line. Blank lines yield `None`.
pub fn parse_line(line: &str) -> Option<CreateEvent> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }

    let parsed: StatusLine = match serde_json::from_str(line) {
        Ok(parsed) => parsed,
        Err(_) => return Some(CreateEvent::Progress(line.to_string())),
    };

    if let Some(error) = parsed.error {
        return Some(CreateEvent::Failed(error));
    }
    match parsed.status {
        Some(StatusValue::Text(s)) if s.eq_ignore_ascii_case("success") => Some(CreateEvent::Success),
        Some(StatusValue::Text(s)) => Some(CreateEvent::Progress(s)),
        Some(StatusValue::Code(code)) => Some(CreateEvent::Failed(format!("status code {}", code))),
        None => Some(CreateEvent::Progress(line.to_string())),
    }
}

/// Tracks one create stream from CREATING to a verdict.
#[derive(Debug)]
pub struct CreateTracker {
    status: ModelStatus,
    failure: Option<String>,
}

impl Default for CreateTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl CreateTracker {
    pub fn new() -> Self {
        Self { status: ModelStatus::Creating, failure: None }
    }

    pub fn status(&self) -> ModelStatus {
        self.status
    }

    /// Apply one event and return the resulting status.
    pub fn apply(&mut self, event: &CreateEvent) -> ModelStatus {
        match (self.status, event) {
            (ModelStatus::Failed, _) => {}
            (_, CreateEvent::Failed(reason)) => {
                self.status = ModelStatus::Failed;
                self.failure = Some(reason.clone());
            }
            (ModelStatus::Creating, CreateEvent::Success) => self.status = ModelStatus::Verifying,
            (_, CreateEvent::Progress(status)) => tracing::debug!(status = %status, "Model create progress"),
            _ => {}
        }
        self.status
    }

    /// Close the stream. `Err` carries the failure reason.
    pub fn finish(self) -> Result<ModelStatus, String> {
        match self.status {
            ModelStatus::Failed => Err(self.failure.unwrap_or_else(|| "create failed".to_string())),
            ModelStatus::Creating => {
                tracing::debug!("Create stream ended without success, verifying by listing");
                Ok(ModelStatus::Verifying)
            }
            other => Ok(other),
        }
    }
}

/// Splits a byte stream into complete lines.
#[derive(Debug, Default)]
pub struct LineBuffer {
    pending: Vec<u8>,
}

impl LineBuffer {
    /// Append a chunk and drain every complete line.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        self.pending.extend_from_slice(chunk);
        let mut lines = Vec::new();
        while let Some(pos) = self.pending.iter().position(|b| *b == b'\n') {
            let line: Vec<u8> = self.pending.drain(..=pos).collect();
            lines.push(String::from_utf8_lossy(&line).into_owned());
        }
        lines
    }

    /// Whatever is left after the last newline.
    pub fn finish(self) -> Option<String> {
        if self.pending.is_empty() {
            None
        } else {
            Some(String::from_utf8_lossy(&self.pending).into_owned())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_progress_statuses() {
        for status in [
            "reading model metadata",
            "creating system layer",
            "using already created layer sha256:abc",
            "writing layer sha256:def",
            "writing manifest",
            "removing any unused layers",
        ] {
            let line = format!("{{\"status\":\"{}\"}}", status);
            assert_eq!(parse_line(&line), Some(CreateEvent::Progress(status.to_string())));
        }
    }

    #[test]
    fn test_success_status() {
        assert_eq!(parse_line(r#"{"status":"success"}"#), Some(CreateEvent::Success));
    }

    #[test]
    fn test_error_field_fails() {
        assert_eq!(
            parse_line(r#"{"error":"no FROM line for the model was specified"}"#),
            Some(CreateEvent::Failed("no FROM line for the model was specified".to_string()))
        );
    }

    #[test]
    fn test_numeric_status_fails() {
        assert_eq!(parse_line(r#"{"status":500}"#), Some(CreateEvent::Failed("status code 500".to_string())));
    }

    #[test]
    fn test_blank_and_unparseable_lines() {
        assert_eq!(parse_line("   "), None);
        assert_eq!(parse_line("not json"), Some(CreateEvent::Progress("not json".to_string())));
    }

    #[test]
    fn test_tracker_success_path() {
        let mut tracker = CreateTracker::new();
        assert_eq!(tracker.apply(&CreateEvent::Progress("writing manifest".into())), ModelStatus::Creating);
        assert_eq!(tracker.apply(&CreateEvent::Success), ModelStatus::Verifying);
        assert_eq!(tracker.finish(), Ok(ModelStatus::Verifying));
    }

    #[test]
    fn test_tracker_failure_is_sticky() {
        let mut tracker = CreateTracker::new();
        tracker.apply(&CreateEvent::Failed("bad template".into()));
        assert_eq!(tracker.apply(&CreateEvent::Success), ModelStatus::Failed);
        assert_eq!(tracker.finish(), Err("bad template".to_string()));
    }

    #[test]
    fn test_tracker_error_after_success() {
        let mut tracker = CreateTracker::new();
        tracker.apply(&CreateEvent::Success);
        assert_eq!(tracker.apply(&CreateEvent::Failed("late error".into())), ModelStatus::Failed);
    }

    #[test]
    fn test_stream_without_success_goes_to_verification() {
        let mut tracker = CreateTracker::new();
        tracker.apply(&CreateEvent::Progress("writing manifest".into()));
        assert_eq!(tracker.finish(), Ok(ModelStatus::Verifying));
    }

    #[test]
    fn test_line_buffer_splits_across_chunks() {
        let mut buffer = LineBuffer::default();
        assert!(buffer.push(b"{\"status\":\"read").is_empty());
        let lines = buffer.push(b"ing\"}\n{\"status\":\"success\"}\n{\"sta");
        assert_eq!(lines, vec!["{\"status\":\"reading\"}\n", "{\"status\":\"success\"}\n"]);
        assert_eq!(buffer.finish().as_deref(), Some("{\"sta"));
    }
}

//! Request/response protocol.
//!
//! One JSON object per message, discriminated by an `action` tag. Requests
//! are parsed here, at the transport boundary, so a malformed message never
//! reaches the core.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use seamcut_common::error::SeamcutResult;

use crate::request::EditParams;
use crate::timeline::TimelineEntry;

/// Inbound requests, one variant per action.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Request {
    /// Build the timeline map for scrubbing.
    GeneratePreviewMap { params: EditParams },

    /// Render a short preview window starting at `start_time` (timeline
    /// seconds).
    GeneratePreviewFragment {
        params: EditParams,
        #[serde(default)]
        start_time: f64,
    },

    /// Run the full export.
    Process { params: EditParams },
}

impl Request {
    /// Parse one protocol line.
    pub fn parse_line(line: &str) -> SeamcutResult<Self> {
        Ok(serde_json::from_str(line.trim())?)
    }

    pub fn action(&self) -> &'static str {
        match self {
            Self::GeneratePreviewMap { .. } => "generate_preview_map",
            Self::GeneratePreviewFragment { .. } => "generate_preview_fragment",
            Self::Process { .. } => "process",
        }
    }

    pub fn params(&self) -> &EditParams {
        match self {
            Self::GeneratePreviewMap { params }
            | Self::GeneratePreviewFragment { params, .. }
            | Self::Process { params } => params,
        }
    }
}

/// Outbound events.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Response {
    /// A progress or transcoder output line.
    Log { message: String },

    PreviewMapReady {
        timeline_map: Vec<TimelineEntry>,
        total_duration: f64,
    },

    PreviewFragmentReady {
        start_time: f64,
        /// Measured duration of the rendered artifact.
        duration: f64,
        path: PathBuf,
    },

    ExportComplete { output: PathBuf, duration: f64 },

    /// Terminal event of an export task, sent on success and on failure.
    Finished,

    /// Terminal failure of a task.
    Error { kind: String, message: String },
}

impl Response {
    pub fn log(message: impl Into<String>) -> Self {
        Self::Log {
            message: message.into(),
        }
    }

    /// Serialize as one protocol line (no trailing newline).
    pub fn to_line(&self) -> SeamcutResult<String> {
        Ok(serde_json::to_string(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_fragment_request() {
        let line = r#"{"action":"generate_preview_fragment","start_time":62.5,"params":{"video1":"/m/a.mkv"}}"#;
        let request = Request::parse_line(line).unwrap();
        assert_eq!(request.action(), "generate_preview_fragment");
        match request {
            Request::GeneratePreviewFragment { start_time, params } => {
                assert_eq!(start_time, 62.5);
                assert_eq!(params.video1.as_deref(), Some("/m/a.mkv"));
            }
            other => panic!("unexpected request {other:?}"),
        }
    }

    #[test]
    fn test_unknown_action_is_rejected() {
        assert!(Request::parse_line(r#"{"action":"select_file","id":"video1"}"#).is_err());
        assert!(Request::parse_line("not json").is_err());
    }

    #[test]
    fn test_response_lines_are_action_tagged() {
        assert_eq!(
            Response::Finished.to_line().unwrap(),
            r#"{"action":"finished"}"#
        );
        let line = Response::log("frame=  100").to_line().unwrap();
        assert_eq!(line, r#"{"action":"log","message":"frame=  100"}"#);
    }
}

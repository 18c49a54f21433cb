//! Error types shared across SeamCut crates.

use std::path::PathBuf;

/// Top-level error type for SeamCut operations.
#[derive(Debug, thiserror::Error)]
pub enum SeamcutError {
    #[error("Invalid input: {0}")]
    InputValidation(#[from] InputValidationError),

    #[error("Probe error for {path}: {message}")]
    Probe { path: PathBuf, message: String },

    #[error(
        "Segment {segment} [{start:.3}, {end:.3}] is too short for {fade_duration}s fades: no keyframe split points"
    )]
    InsufficientSegmentLength {
        segment: usize,
        start: f64,
        end: f64,
        fade_duration: f64,
    },

    #[error("Transcode error (exit code {}): {message}", display_code(.code))]
    Transcode { code: Option<i32>, message: String },

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("File not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

/// Request validation failures, raised before any external process runs.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum InputValidationError {
    #[error("no primary source (video1) supplied")]
    MissingPrimarySource,

    #[error("two-file mode requires a second source (video2)")]
    MissingSecondarySource,

    #[error("output directory does not exist: {path}")]
    OutputDirectoryInvalid { path: PathBuf },

    #[error("invalid timecode for {field}: {value:?}")]
    InvalidTimecode { field: String, value: String },

    #[error("no prepared intro and no intro source to build it from")]
    IntroUnavailable,

    #[error("unknown mode {0:?} (expected \"single\" or \"two\")")]
    UnknownMode(String),

    #[error("unknown intro resolution {0:?} (expected \"fullhd\" or \"2k\")")]
    UnknownIntroResolution(String),
}

/// A non-fatal failure to remove an intermediate artifact.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct CleanupWarning {
    pub path: PathBuf,
    pub message: String,
}

impl std::fmt::Display for CleanupWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "failed to remove {}: {}", self.path.display(), self.message)
    }
}

/// Result type alias using SeamcutError.
pub type SeamcutResult<T> = Result<T, SeamcutError>;

fn display_code(code: &Option<i32>) -> String {
    match code {
        Some(code) => code.to_string(),
        None => "none".to_string(),
    }
}

impl SeamcutError {
    pub fn probe(path: impl Into<PathBuf>, msg: impl Into<String>) -> Self {
        Self::Probe {
            path: path.into(),
            message: msg.into(),
        }
    }

    pub fn transcode(code: Option<i32>, msg: impl Into<String>) -> Self {
        Self::Transcode {
            code,
            message: msg.into(),
        }
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    /// Short machine-readable category, used in task failure events.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::InputValidation(_) => "input_validation",
            Self::Probe { .. } => "probe",
            Self::InsufficientSegmentLength { .. } => "insufficient_segment_length",
            Self::Transcode { .. } => "transcode",
            Self::Config { .. } => "config",
            Self::FileNotFound { .. } => "file_not_found",
            Self::Io(_) => "io",
            Self::Json(_) => "json",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transcode_error_carries_exit_code() {
        let err = SeamcutError::transcode(Some(183), "ffmpeg failed");
        assert_eq!(err.kind(), "transcode");
        assert!(err.to_string().contains("183"));

        let err = SeamcutError::transcode(None, "killed");
        assert!(err.to_string().contains("none"));
    }

    #[test]
    fn test_validation_error_converts() {
        let err: SeamcutError = InputValidationError::MissingSecondarySource.into();
        assert_eq!(err.kind(), "input_validation");
        assert!(err.to_string().contains("video2"));
    }

    #[test]
    fn test_io_and_json_errors_convert() {
        let err: SeamcutError = std::io::Error::other("disk gone").into();
        assert_eq!(err.kind(), "io");

        let err: SeamcutError = serde_json::from_str::<u32>("x").unwrap_err().into();
        assert_eq!(err.kind(), "json");
    }
}

//! Domain error types.

use super::step::StepType;
use thiserror::Error;

/// Rejection of a task payload before any flow is built.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    #[error("uploadId is required")]
    MissingUploadId,

    #[error("invalid {field}: {reason}")]
    InvalidField { field: String, reason: String },
}

impl ValidationError {
    pub fn invalid(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidField {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

/// Failure of a single step while it runs.
#[derive(Error, Debug)]
pub enum StepError {
    #[error("{step} command failed: {stderr}")]
    Command { step: StepType, stderr: String },

    #[error("{step} produced no output")]
    NoOutput { step: StepType },

    #[error("{step} timed out after {secs}s")]
    Timeout { step: StepType, secs: u64 },

    #[error("source has no audio stream")]
    NoAudioStream,

    #[error("source has no video stream")]
    NoVideoStream,

    #[error("invalid probe output: {0}")]
    InvalidProbe(String),

    #[error("invalid {step} parameters: {source}")]
    Params {
        step: StepType,
        #[source]
        source: serde_json::Error,
    },

    #[error("storage error: {0}")]
    Storage(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl StepError {
    pub fn storage(err: impl std::fmt::Display) -> Self {
        Self::Storage(err.to_string())
    }
}

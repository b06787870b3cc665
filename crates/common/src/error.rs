//! Error types shared across Manga Recap crates.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Ordered phases of a pipeline run that can fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Rasterize,
    Narrate,
    Synthesize,
    Timeline,
    Subtitles,
    Mux,
}

impl Stage {
    pub fn as_str(self) -> &'static str {
        match self {
            Stage::Rasterize => "rasterize",
            Stage::Narrate => "narrate",
            Stage::Synthesize => "synthesize",
            Stage::Timeline => "timeline",
            Stage::Subtitles => "subtitles",
            Stage::Mux => "mux",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Classification recorded on a failed or cancelled run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FailureKind {
    EmptyDocument,
    UnreadableDocument,
    EmptyTimeline,
    StageTimeout,
    SynthesisFailure,
    MuxFailure,
    Cancelled,
}

impl FailureKind {
    /// Kind assigned to unclassified errors raised inside `stage`.
    pub fn for_stage(stage: Stage) -> Self {
        match stage {
            Stage::Rasterize => FailureKind::UnreadableDocument,
            Stage::Narrate | Stage::Synthesize => FailureKind::SynthesisFailure,
            Stage::Timeline | Stage::Subtitles | Stage::Mux => FailureKind::MuxFailure,
        }
    }
}

/// Top-level error type for Manga Recap operations.
#[derive(Debug, thiserror::Error)]
pub enum RecapError {
    #[error("Document contains no pages")]
    EmptyDocument,

    #[error("Unreadable document: {message}")]
    UnreadableDocument { message: String },

    #[error("Timeline is empty")]
    EmptyTimeline,

    #[error("Stage '{stage}' timed out after {timeout_secs:.1}s")]
    StageTimeout { stage: Stage, timeout_secs: f64 },

    #[error("Speech synthesis failed for page {page_number}: {message}")]
    SynthesisFailure { page_number: u32, message: String },

    #[error("Muxing failed: {message}")]
    MuxFailure { message: String },

    #[error("Run cancelled")]
    Cancelled,

    #[error("Invalid run transition: {message}")]
    InvalidTransition { message: String },

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Result type alias using RecapError.
pub type RecapResult<T> = Result<T, RecapError>;

impl RecapError {
    pub fn unreadable(msg: impl Into<String>) -> Self {
        Self::UnreadableDocument {
            message: msg.into(),
        }
    }

    pub fn synthesis(page_number: u32, msg: impl Into<String>) -> Self {
        Self::SynthesisFailure {
            page_number,
            message: msg.into(),
        }
    }

    pub fn mux(msg: impl Into<String>) -> Self {
        Self::MuxFailure {
            message: msg.into(),
        }
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    pub fn invalid_transition(msg: impl Into<String>) -> Self {
        Self::InvalidTransition {
            message: msg.into(),
        }
    }

    pub fn timeout(stage: Stage, timeout: std::time::Duration) -> Self {
        Self::StageTimeout {
            stage,
            timeout_secs: timeout.as_secs_f64(),
        }
    }

    /// The taxonomy kind this error belongs to, if it carries one itself.
    pub fn taxonomy_kind(&self) -> Option<FailureKind> {
        match self {
            RecapError::EmptyDocument => Some(FailureKind::EmptyDocument),
            RecapError::UnreadableDocument { .. } => Some(FailureKind::UnreadableDocument),
            RecapError::EmptyTimeline => Some(FailureKind::EmptyTimeline),
            RecapError::StageTimeout { .. } => Some(FailureKind::StageTimeout),
            RecapError::SynthesisFailure { .. } => Some(FailureKind::SynthesisFailure),
            RecapError::MuxFailure { .. } => Some(FailureKind::MuxFailure),
            RecapError::Cancelled => Some(FailureKind::Cancelled),
            _ => None,
        }
    }

    /// Classify this error as a failure of `stage`.
    pub fn kind_in(&self, stage: Stage) -> FailureKind {
        self.taxonomy_kind()
            .unwrap_or_else(|| FailureKind::for_stage(stage))
    }
}

//! Per-request run state.

use std::path::{Path, PathBuf};

use mangarecap_common::clock::{RunClock, RunId};
use mangarecap_common::error::{FailureKind, RecapError, RecapResult};
use serde::Serialize;

use crate::progress::ProgressRecord;

/// State of a pipeline run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum RunState {
    /// Document accepted, nothing started.
    Uploaded,
    Rasterizing,
    Narrating,
    Synthesizing,
    /// Timeline, subtitles, and muxing.
    Assembling,
    Complete,
    Failed,
    Cancelled,
}

impl RunState {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            RunState::Complete | RunState::Failed | RunState::Cancelled
        )
    }

    /// The state a successful stage leads to.
    pub fn successor(self) -> Option<RunState> {
        match self {
            RunState::Uploaded => Some(RunState::Rasterizing),
            RunState::Rasterizing => Some(RunState::Narrating),
            RunState::Narrating => Some(RunState::Synthesizing),
            RunState::Synthesizing => Some(RunState::Assembling),
            RunState::Assembling => Some(RunState::Complete),
            RunState::Complete | RunState::Failed | RunState::Cancelled => None,
        }
    }

    /// Percentage reported on entering this state.
    pub fn progress_percent(self) -> Option<u8> {
        match self {
            RunState::Uploaded => Some(0),
            RunState::Rasterizing => Some(20),
            RunState::Narrating => Some(40),
            RunState::Synthesizing => Some(60),
            RunState::Assembling => Some(80),
            RunState::Complete => Some(100),
            RunState::Failed | RunState::Cancelled => None,
        }
    }

    /// Client-facing status line for this state.
    pub fn status_message(self) -> &'static str {
        match self {
            RunState::Uploaded => "Uploaded",
            RunState::Rasterizing => "Processing PDF...",
            RunState::Narrating => "Analyzing scenes...",
            RunState::Synthesizing => "Generating narration audio...",
            RunState::Assembling => "Creating video...",
            RunState::Complete => "Complete!",
            RunState::Failed => "Failed",
            RunState::Cancelled => "Cancelled",
        }
    }
}

/// Why a run ended without a video.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunFailure {
    pub kind: FailureKind,
    pub message: String,
}

/// State of one request from upload to terminal result.
#[derive(Debug)]
pub struct PipelineRun {
    id: RunId,
    document: PathBuf,
    state: RunState,
    progress: u8,
    clock: RunClock,
    video_path: Option<PathBuf>,
    video_url: Option<String>,
    failure: Option<RunFailure>,
    terminal_reported: bool,
}

impl PipelineRun {
    pub fn new(id: RunId, document: impl Into<PathBuf>) -> Self {
        Self {
            id,
            document: document.into(),
            state: RunState::Uploaded,
            progress: 0,
            clock: RunClock::start(),
            video_path: None,
            video_url: None,
            failure: None,
            terminal_reported: false,
        }
    }

    pub fn id(&self) -> &RunId {
        &self.id
    }

    pub fn document(&self) -> &Path {
        &self.document
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    pub fn progress(&self) -> u8 {
        self.progress
    }

    pub fn is_terminal(&self) -> bool {
        self.state.is_terminal()
    }

    pub fn video_path(&self) -> Option<&Path> {
        self.video_path.as_deref()
    }

    pub fn video_url(&self) -> Option<&str> {
        self.video_url.as_deref()
    }

    pub fn failure(&self) -> Option<&RunFailure> {
        self.failure.as_ref()
    }

    pub fn elapsed_ms(&self) -> u64 {
        self.clock.elapsed_ms()
    }

    /// Wall-clock time the run was accepted (RFC 3339).
    pub fn started_at(&self) -> &str {
        self.clock.epoch_wall()
    }

    /// Move to the next non-terminal stage.
    pub fn advance(&mut self, next: RunState) -> RecapResult<()> {
        if next.is_terminal() || self.state.successor() != Some(next) {
            return Err(RecapError::invalid_transition(format!(
                "{:?} -> {next:?}",
                self.state
            )));
        }
        self.enter(next);
        Ok(())
    }

    /// Finish successfully after assembly.
    pub fn complete(&mut self, video_path: PathBuf, video_url: String) -> RecapResult<()> {
        if self.state != RunState::Assembling {
            return Err(RecapError::invalid_transition(format!(
                "{:?} -> Complete",
                self.state
            )));
        }
        self.video_path = Some(video_path);
        self.video_url = Some(video_url);
        self.enter(RunState::Complete);
        Ok(())
    }

    /// Record a fatal failure.
    pub fn fail(&mut self, kind: FailureKind, message: impl Into<String>) -> RecapResult<()> {
        if kind == FailureKind::Cancelled {
            return self.cancel();
        }
        self.end(RunState::Failed, kind, message.into())
    }

    /// Record cancellation.
    pub fn cancel(&mut self) -> RecapResult<()> {
        self.end(
            RunState::Cancelled,
            FailureKind::Cancelled,
            RecapError::Cancelled.to_string(),
        )
    }

    /// Record for the current non-terminal state.
    pub fn progress_record(&self) -> Option<ProgressRecord> {
        if self.is_terminal() {
            return None;
        }
        Some(ProgressRecord::progress(
            self.state.status_message(),
            self.progress,
        ))
    }

    /// The terminal record, handed out at most once.
    pub fn take_terminal_record(&mut self) -> Option<ProgressRecord> {
        if !self.is_terminal() || self.terminal_reported {
            return None;
        }
        self.terminal_reported = true;

        match (&self.state, &self.video_url, &self.failure) {
            (RunState::Complete, Some(url), _) => Some(ProgressRecord::Complete {
                status: RunState::Complete.status_message().to_string(),
                progress: 100,
                video_url: url.clone(),
            }),
            (_, _, Some(failure)) => Some(ProgressRecord::failed(failure.message.clone())),
            _ => Some(ProgressRecord::failed(self.state.status_message())),
        }
    }

    fn enter(&mut self, state: RunState) {
        tracing::debug!(from = ?self.state, to = ?state, "Run transition");
        self.state = state;
        if let Some(percent) = state.progress_percent() {
            self.progress = percent;
        }
    }

    fn end(&mut self, state: RunState, kind: FailureKind, message: String) -> RecapResult<()> {
        if self.is_terminal() {
            return Err(RecapError::invalid_transition(format!(
                "{:?} -> {state:?}",
                self.state
            )));
        }
        self.failure = Some(RunFailure { kind, message });
        self.enter(state);
        Ok(())
    }
}

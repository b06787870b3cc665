//! Synthesized narration audio.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Audio clip produced for one narration segment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SynthesizedAudio {
    /// Page the clip narrates.
    pub page_number: u32,

    /// Audio file on disk.
    pub path: PathBuf,

    /// Playback length measured on the produced file, in seconds.
    /// Authoritative over the planner's estimate.
    pub duration_secs: f64,
}

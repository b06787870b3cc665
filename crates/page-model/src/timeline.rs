//! Absolute placement of pages in the output video.

use serde::{Deserialize, Serialize};

/// One page + narration pair placed on the video timeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimelineEntry {
    /// Page shown during this entry.
    pub page_number: u32,

    /// Start time in seconds from the beginning of the video.
    pub start_secs: f64,

    /// End time in seconds (exclusive).
    pub end_secs: f64,

    /// Narration spoken during this entry.
    pub text: String,
}

impl TimelineEntry {
    pub fn duration_secs(&self) -> f64 {
        self.end_secs - self.start_secs
    }
}

/// Contiguous sequence of entries covering `[0, total_duration_secs)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Timeline {
    pub entries: Vec<TimelineEntry>,
    pub total_duration_secs: f64,
}

impl Timeline {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

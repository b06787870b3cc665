//! Run identity and timing utilities.
//!
//! Every pipeline run is namespaced by a [`RunId`] so concurrent runs never
//! share scratch paths or output names. [`RunClock`] anchors stage timing to
//! the moment a run was accepted, and [`DurationDrift`] compares an estimated
//! narration length with what the speech synthesizer actually produced.

use std::fmt;
use std::time::Instant;

/// Unique identifier of one pipeline run.
///
/// Formatted as `<utc timestamp>-<8 hex chars>`, which sorts by start time
/// and is safe to embed in file names.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RunId(String);

impl RunId {
    /// Generate a fresh identifier.
    pub fn generate() -> Self {
        let stamp = chrono::Utc::now().format("%Y%m%dT%H%M%S%3f");
        let suffix = uuid::Uuid::new_v4().simple().to_string();
        Self(format!("{stamp}-{}", &suffix[..8]))
    }

    /// Wrap an existing identifier (for tests and replays).
    pub fn from_string(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Monotonic clock anchored at run start.
#[derive(Debug, Clone)]
pub struct RunClock {
    /// The instant the run was accepted.
    epoch: Instant,

    /// Wall-clock time at epoch (RFC 3339 string).
    epoch_wall: String,
}

impl RunClock {
    /// Create a new clock anchored to now.
    pub fn start() -> Self {
        Self {
            epoch: Instant::now(),
            epoch_wall: chrono::Utc::now().to_rfc3339(),
        }
    }

    /// Milliseconds elapsed since run start.
    pub fn elapsed_ms(&self) -> u64 {
        self.epoch.elapsed().as_millis() as u64
    }

    /// Wall-clock time at run start.
    pub fn epoch_wall(&self) -> &str {
        &self.epoch_wall
    }
}

/// Disagreement between the planned and the synthesized length of a segment.
#[derive(Debug, Clone, Copy)]
pub struct DurationDrift {
    /// Duration estimated from word count (seconds).
    pub estimated_secs: f64,
    /// Duration measured on the produced audio (seconds).
    pub measured_secs: f64,
}

impl DurationDrift {
    /// Drift in seconds (positive = audio is longer than planned).
    pub fn drift_secs(&self) -> f64 {
        self.measured_secs - self.estimated_secs
    }

    /// Drift in milliseconds.
    pub fn drift_ms(&self) -> f64 {
        self.drift_secs() * 1000.0
    }

    /// Whether drift exceeds an acceptable threshold.
    pub fn exceeds_threshold_ms(&self, threshold_ms: f64) -> bool {
        self.drift_ms().abs() > threshold_ms
    }
}

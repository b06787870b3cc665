//! Progress records and the sinks that carry them to a client.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use mangarecap_common::error::RecapResult;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

/// One record on a run's progress stream.
///
/// Serialized without a tag, so the wire shape is one of
/// `{"status","progress"}`, `{"status","progress","videoUrl"}`, or
/// `{"error"}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ProgressRecord {
    Complete {
        status: String,
        progress: u8,
        #[serde(rename = "videoUrl")]
        video_url: String,
    },
    Progress {
        status: String,
        progress: u8,
    },
    Failed {
        error: String,
    },
}

impl ProgressRecord {
    pub fn progress(status: impl Into<String>, progress: u8) -> Self {
        Self::Progress {
            status: status.into(),
            progress,
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self::Failed {
            error: error.into(),
        }
    }

    /// Whether this record ends the stream.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Progress { .. })
    }

    /// Percentage carried by the record, if any.
    pub fn percent(&self) -> Option<u8> {
        match self {
            Self::Complete { progress, .. } | Self::Progress { progress, .. } => Some(*progress),
            Self::Failed { .. } => None,
        }
    }

    /// Render as a server-sent event frame.
    pub fn to_event_line(&self) -> RecapResult<String> {
        Ok(format!("data: {}\n\n", serde_json::to_string(self)?))
    }
}

/// One-way, non-blocking destination for progress records.
pub trait ProgressSink: Send + Sync {
    fn send(&self, record: ProgressRecord);
}

/// Discards every record.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopSink;

impl ProgressSink for NoopSink {
    fn send(&self, _record: ProgressRecord) {}
}

/// Forwards records over an unbounded channel.
///
/// A dropped receiver means the client went away; if a cancel flag is
/// attached it is raised so the run stops before its next stage.
#[derive(Debug, Clone)]
pub struct ChannelSink {
    tx: mpsc::UnboundedSender<ProgressRecord>,
    cancel_on_disconnect: Option<Arc<AtomicBool>>,
}

impl ChannelSink {
    pub fn new(tx: mpsc::UnboundedSender<ProgressRecord>) -> Self {
        Self {
            tx,
            cancel_on_disconnect: None,
        }
    }

    /// Raise `flag` when the receiving side disconnects.
    pub fn with_cancel_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.cancel_on_disconnect = Some(flag);
        self
    }
}

impl ProgressSink for ChannelSink {
    fn send(&self, record: ProgressRecord) {
        if self.tx.send(record).is_err() {
            tracing::debug!("Progress receiver dropped");
            if let Some(flag) = &self.cancel_on_disconnect {
                flag.store(true, Ordering::SeqCst);
            }
        }
    }
}

/// Keeps every record in memory.
#[derive(Debug, Default)]
pub struct CollectingSink {
    records: Mutex<Vec<ProgressRecord>>,
}

impl CollectingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the records received so far.
    pub fn records(&self) -> Vec<ProgressRecord> {
        match self.records.lock() {
            Ok(records) => records.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

impl ProgressSink for CollectingSink {
    fn send(&self, record: ProgressRecord) {
        match self.records.lock() {
            Ok(mut records) => records.push(record),
            Err(poisoned) => poisoned.into_inner().push(record),
        }
    }
}

//! Manga Recap Pipeline
//!
//! Turns an uploaded manga document into a narrated recap video. A
//! [`Coordinator`] owns the stage sequence for each run; every run gets its
//! own [`PipelineRun`] state and [`RunWorkspace`], so runs can proceed
//! concurrently without sharing scratch paths.
//!
//! ```text
//! document ─▶ Rasterizer ─▶ PageStore ─▶ NarrationPlanner ─▶ SpeechSynthesizer
//!                                                               │
//!          video ◀── Muxer ◀── subtitles.srt ◀── Timeline ◀─────┘
//! ```
//!
//! Progress leaves through a [`ProgressSink`] as ordered records ending in
//! exactly one terminal record.

pub mod coordinator;
pub mod progress;
pub mod run;
pub mod workspace;

pub use coordinator::*;
pub use progress::*;
pub use run::*;
pub use workspace::*;

//! Manga Recap Timeline Builder
//!
//! Turns the ordered narration segments of a run into an absolute timeline:
//! - **Build:** single left-to-right scan accumulating start times
//! - **Reconcile:** replace planned durations with measured audio durations
//!   before building, so picture, sound and subtitles stay in sync

pub mod builder;
pub mod reconcile;

pub use builder::*;
pub use reconcile::*;

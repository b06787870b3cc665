//! Manga Recap Common Utilities
//!
//! Shared infrastructure for all Manga Recap crates:
//! - Error taxonomy and result aliases
//! - Run identifiers, stage timing and duration drift measurement
//! - Tracing/logging initialization
//! - Configuration loading

pub mod clock;
pub mod config;
pub mod error;
pub mod logging;

pub use clock::*;
pub use config::*;
pub use error::*;

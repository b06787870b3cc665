//! Manga Recap Narration
//!
//! Everything that turns pages into spoken words and on-screen text:
//! - **Captioning:** Pluggable page captioners (templates or an external model)
//! - **Planning:** One narration segment per page with an estimated duration
//! - **Subtitles:** SRT/VTT output from the finished timeline

pub mod captioner;
pub mod planner;
pub mod subtitles;

pub use captioner::*;
pub use planner::*;
pub use subtitles::*;

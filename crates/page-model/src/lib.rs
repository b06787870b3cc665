//! Manga Recap Page Model
//!
//! Defines the data contracts that flow forward through a run:
//! - **Pages:** Rasterized page images in document order
//! - **Narration:** One spoken segment per page with its duration
//! - **Timeline:** Absolute start/end placement of every page
//! - **Subtitles:** Numbered cues rendered from the timeline
//! - **Audio:** Synthesized narration clips with measured duration
//!
//! All values are immutable once produced by their stage.

pub mod audio;
pub mod narration;
pub mod page;
pub mod subtitle;
pub mod timeline;

pub use audio::*;
pub use narration::*;
pub use page::*;
pub use subtitle::*;
pub use timeline::*;

//! # mangarecap-render-engine
//!
//! External media backends: document rasterization, speech synthesis, and
//! ffmpeg video assembly. Each concern sits behind an async trait so the
//! pipeline can run against fakes in tests.

pub mod mux;
pub mod probe;
pub mod raster;
pub mod speech;

pub use mux::{build_mux_plan, FfmpegMuxer, MuxJob, MuxPlan, MuxSettings, Muxer};
pub use probe::{command_exists, probe_duration};
pub use raster::{ImageDirRasterizer, PdfRasterizer, Rasterizer};
pub use speech::{CommandSynthesizer, SilentSynthesizer, SpeechSynthesizer};

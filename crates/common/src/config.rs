//! Application configuration.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Global application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Root under which each run gets its own scratch directory.
    pub work_dir: PathBuf,

    /// Directory where finished videos are written.
    pub outputs_dir: PathBuf,

    /// Public prefix used to build the `videoUrl` of a finished run.
    pub video_url_prefix: String,

    /// Narration planning settings.
    pub narration: NarrationDefaults,

    /// Rasterization and encoding settings.
    pub render: RenderDefaults,

    /// Per-collaborator call timeouts.
    pub timeouts: TimeoutConfig,

    /// Logging configuration.
    pub logging: LoggingConfig,
}

/// Narration planning parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NarrationDefaults {
    /// Fixed speaking rate used to estimate segment duration.
    pub words_per_minute: f64,

    /// Lower bound for any segment duration, in seconds.
    pub min_duration_secs: f64,

    /// External captioning program. The page image path is appended as the
    /// last argument and stdout is taken as the caption.
    pub caption_command: Option<Vec<String>>,

    /// External speech program. `{text}` and `{output}` placeholders are
    /// substituted; the program must write a WAV file to `{output}`.
    pub speech_command: Option<Vec<String>>,
}

/// Default rasterization and encoding parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderDefaults {
    /// Output width in pixels.
    pub width: u32,

    /// Output height in pixels.
    pub height: u32,

    /// Output frame rate.
    pub fps: u32,

    /// Video codec passed to ffmpeg.
    pub video_codec: String,

    /// Audio bitrate in kbps.
    pub audio_bitrate_kbps: u32,

    /// Burn subtitles into the picture instead of muxing a soft track.
    pub burn_subtitles: bool,

    /// Resolution used when rasterizing PDF pages.
    pub pdf_dpi: u32,
}

/// Upper bounds on each collaborator call, in seconds.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TimeoutConfig {
    pub rasterize_secs: f64,
    /// Per page.
    pub caption_secs: f64,
    /// Per page.
    pub synthesize_secs: f64,
    pub mux_secs: f64,
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level filter (e.g., "info", "debug", "mangarecap=debug,warn").
    pub level: String,

    /// Whether to output structured JSON logs.
    pub json: bool,

    /// Optional log file path.
    pub file: Option<PathBuf>,
}

impl Default for AppConfig {
    fn default() -> Self {
        let data_dir = dirs_default_data();
        Self {
            work_dir: data_dir.join("runs"),
            outputs_dir: data_dir.join("outputs"),
            video_url_prefix: "/outputs".to_string(),
            narration: NarrationDefaults::default(),
            render: RenderDefaults::default(),
            timeouts: TimeoutConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for NarrationDefaults {
    fn default() -> Self {
        Self {
            words_per_minute: 150.0,
            min_duration_secs: 3.0,
            caption_command: None,
            speech_command: None,
        }
    }
}

impl Default for RenderDefaults {
    fn default() -> Self {
        Self {
            width: 1280,
            height: 720,
            fps: 30,
            video_codec: "libx264".to_string(),
            audio_bitrate_kbps: 192,
            burn_subtitles: false,
            pdf_dpi: 150,
        }
    }
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            rasterize_secs: 120.0,
            caption_secs: 30.0,
            synthesize_secs: 60.0,
            mux_secs: 600.0,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
            file: None,
        }
    }
}

impl TimeoutConfig {
    pub fn rasterize(&self) -> Duration {
        secs_to_duration(self.rasterize_secs)
    }

    pub fn caption(&self) -> Duration {
        secs_to_duration(self.caption_secs)
    }

    pub fn synthesize(&self) -> Duration {
        secs_to_duration(self.synthesize_secs)
    }

    pub fn mux(&self) -> Duration {
        secs_to_duration(self.mux_secs)
    }
}

/// Non-finite or negative values collapse to zero, which times out at once.
fn secs_to_duration(secs: f64) -> Duration {
    if secs.is_finite() && secs > 0.0 {
        Duration::from_secs_f64(secs)
    } else {
        Duration::ZERO
    }
}

impl AppConfig {
    /// Load config from the standard location, falling back to defaults.
    pub fn load() -> Self {
        Self::load_from(&config_file_path())
    }

    /// Load config from an explicit path, falling back to defaults.
    pub fn load_from(config_path: &std::path::Path) -> Self {
        if config_path.exists() {
            match std::fs::read_to_string(config_path) {
                Ok(content) => match serde_json::from_str(&content) {
                    Ok(config) => return config,
                    Err(e) => {
                        tracing::warn!("Failed to parse config at {:?}: {}", config_path, e);
                    }
                },
                Err(e) => {
                    tracing::warn!("Failed to read config at {:?}: {}", config_path, e);
                }
            }
        }
        Self::default()
    }

    /// Reject settings the pipeline cannot run with.
    pub fn validate(&self) -> crate::error::RecapResult<()> {
        use crate::error::RecapError;

        if !(self.narration.words_per_minute.is_finite() && self.narration.words_per_minute > 0.0)
        {
            return Err(RecapError::config("words_per_minute must be positive"));
        }
        if !(self.narration.min_duration_secs.is_finite()
            && self.narration.min_duration_secs > 0.0)
        {
            return Err(RecapError::config("min_duration_secs must be positive"));
        }
        if self.render.fps == 0 || self.render.width == 0 || self.render.height == 0 {
            return Err(RecapError::config(
                "render width, height and fps must be non-zero",
            ));
        }
        Ok(())
    }
}

/// Standard config file location.
pub fn config_file_path() -> PathBuf {
    let base = std::env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
            PathBuf::from(home).join(".config")
        });
    base.join("mangarecap").join("config.json")
}

/// Default data directory.
fn dirs_default_data() -> PathBuf {
    let base = std::env::var("XDG_DATA_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
            PathBuf::from(home).join(".local").join("share")
        });
    base.join("mangarecap")
}

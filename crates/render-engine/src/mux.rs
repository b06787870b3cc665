//! Final video assembly with ffmpeg.
//!
//! Pages become a still-image slideshow through the concat demuxer, each
//! image held for exactly its timeline entry. Narration clips are
//! concatenated the same way, and the subtitle file is either muxed as a
//! soft `mov_text` track or burned into the picture.

use std::path::{Path, PathBuf};
use std::process::Stdio;

use async_trait::async_trait;
use mangarecap_common::config::RenderDefaults;
use mangarecap_common::error::{RecapError, RecapResult};
use mangarecap_page_model::audio::SynthesizedAudio;
use mangarecap_page_model::page::Page;
use mangarecap_page_model::timeline::Timeline;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, BufReader};
use tokio::process::Command;

use crate::probe::command_exists;

const PAGES_LIST: &str = "pages.ffconcat";
const AUDIO_LIST: &str = "audio.ffconcat";

/// Encoding parameters for the output video.
#[derive(Debug, Clone, PartialEq)]
pub struct MuxSettings {
    pub width: u32,
    pub height: u32,
    pub fps: u32,
    pub video_codec: String,
    pub audio_bitrate_kbps: u32,
    pub burn_subtitles: bool,
}

impl Default for MuxSettings {
    fn default() -> Self {
        Self::from(&RenderDefaults::default())
    }
}

impl From<&RenderDefaults> for MuxSettings {
    fn from(render: &RenderDefaults) -> Self {
        Self {
            width: render.width,
            height: render.height,
            fps: render.fps,
            video_codec: render.video_codec.clone(),
            audio_bitrate_kbps: render.audio_bitrate_kbps,
            burn_subtitles: render.burn_subtitles,
        }
    }
}

/// Everything the muxer needs for one run.
#[derive(Debug, Clone)]
pub struct MuxJob {
    pub pages: Vec<Page>,
    pub audio: Vec<SynthesizedAudio>,
    pub timeline: Timeline,
    pub subtitles_path: PathBuf,
    pub output_path: PathBuf,
    /// Where intermediate concat lists are written.
    pub scratch_dir: PathBuf,
}

/// Trait for video assembly backends.
#[async_trait]
pub trait Muxer: Send + Sync {
    /// Assemble the job's inputs into a video; returns the written path.
    async fn mux(&self, job: &MuxJob) -> RecapResult<PathBuf>;

    /// Check if this backend is available on the system.
    fn is_available(&self) -> bool;

    /// Backend name.
    fn name(&self) -> &str;
}

/// Resolved ffmpeg invocation plus the concat lists it reads.
#[derive(Debug, Clone)]
pub struct MuxPlan {
    pub ffmpeg_args: Vec<String>,
    pub pages_list_path: PathBuf,
    pub pages_list: String,
    pub audio_list_path: PathBuf,
    pub audio_list: String,
    pub expected_duration_secs: f64,
}

/// Build the ffmpeg plan for `job`.
///
/// Pages, audio clips, and timeline entries must line up one-to-one by page
/// number; anything else is a [`RecapError::MuxFailure`].
pub fn build_mux_plan(job: &MuxJob, settings: &MuxSettings) -> RecapResult<MuxPlan> {
    if job.timeline.is_empty() {
        return Err(RecapError::EmptyTimeline);
    }
    let entries = &job.timeline.entries;
    if job.pages.len() != entries.len() || job.audio.len() != entries.len() {
        return Err(RecapError::mux(format!(
            "{} pages, {} audio clips, and {} timeline entries do not line up",
            job.pages.len(),
            job.audio.len(),
            entries.len()
        )));
    }
    for ((page, clip), entry) in job.pages.iter().zip(&job.audio).zip(entries) {
        if page.page_number != entry.page_number || clip.page_number != entry.page_number {
            return Err(RecapError::mux(format!(
                "timeline entry for page {} paired with page {} and audio for page {}",
                entry.page_number, page.page_number, clip.page_number
            )));
        }
        let held = entry.duration_secs();
        if held.is_nan() || held <= 0.0 {
            return Err(RecapError::mux(format!(
                "page {} has no screen time",
                entry.page_number
            )));
        }
    }
    if settings.width == 0 || settings.height == 0 || settings.fps == 0 {
        return Err(RecapError::mux("output dimensions and fps must be positive"));
    }

    let mut pages_list = String::from("ffconcat version 1.0\n");
    for (page, entry) in job.pages.iter().zip(entries) {
        pages_list.push_str(&format!(
            "file {}\nduration {:.3}\n",
            concat_quote(&page.image_path),
            entry.duration_secs()
        ));
    }
    // The demuxer ignores the duration of the final entry unless it repeats.
    if let Some(last) = job.pages.last() {
        pages_list.push_str(&format!("file {}\n", concat_quote(&last.image_path)));
    }

    let mut audio_list = String::from("ffconcat version 1.0\n");
    for clip in &job.audio {
        audio_list.push_str(&format!("file {}\n", concat_quote(&clip.path)));
    }

    let pages_list_path = job.scratch_dir.join(PAGES_LIST);
    let audio_list_path = job.scratch_dir.join(AUDIO_LIST);
    let total = job.timeline.total_duration_secs;

    let mut video_filter = format!(
        "scale={w}:{h}:force_original_aspect_ratio=decrease,\
         pad={w}:{h}:(ow-iw)/2:(oh-ih)/2:color=black,setsar=1,fps={fps}",
        w = settings.width,
        h = settings.height,
        fps = settings.fps
    );
    if settings.burn_subtitles {
        video_filter.push_str(&format!(
            ",subtitles={}",
            filter_escape(&job.subtitles_path.to_string_lossy())
        ));
    }
    video_filter.push_str(",format=yuv420p");

    let mut args: Vec<String> = vec![
        "-y".into(),
        "-hide_banner".into(),
        "-loglevel".into(),
        "error".into(),
        "-nostats".into(),
        "-progress".into(),
        "pipe:1".into(),
        "-f".into(),
        "concat".into(),
        "-safe".into(),
        "0".into(),
        "-i".into(),
        path_arg(&pages_list_path),
        "-f".into(),
        "concat".into(),
        "-safe".into(),
        "0".into(),
        "-i".into(),
        path_arg(&audio_list_path),
    ];
    if !settings.burn_subtitles {
        args.push("-i".into());
        args.push(path_arg(&job.subtitles_path));
    }

    args.extend([
        "-vf".into(),
        video_filter,
        "-map".into(),
        "0:v".into(),
        "-map".into(),
        "1:a".into(),
    ]);
    if !settings.burn_subtitles {
        args.extend([
            "-map".into(),
            "2:s".into(),
            "-c:s".into(),
            "mov_text".into(),
            "-metadata:s:s:0".into(),
            "language=eng".into(),
        ]);
    }
    args.extend([
        "-c:v".into(),
        settings.video_codec.clone(),
        "-pix_fmt".into(),
        "yuv420p".into(),
        "-r".into(),
        settings.fps.to_string(),
        "-c:a".into(),
        "aac".into(),
        "-b:a".into(),
        format!("{}k", settings.audio_bitrate_kbps),
        "-t".into(),
        format!("{total:.3}"),
        "-movflags".into(),
        "+faststart".into(),
        path_arg(&job.output_path),
    ]);

    Ok(MuxPlan {
        ffmpeg_args: args,
        pages_list_path,
        pages_list,
        audio_list_path,
        audio_list,
        expected_duration_secs: total,
    })
}

fn path_arg(path: &Path) -> String {
    path.to_string_lossy().to_string()
}

/// Single-quoted concat-script path; embedded quotes become `'\''`.
fn concat_quote(path: &Path) -> String {
    format!("'{}'", path.to_string_lossy().replace('\'', r"'\''"))
}

/// Escape a value for use inside an ffmpeg filtergraph option.
fn filter_escape(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for ch in value.chars() {
        if matches!(ch, '\\' | ':' | '\'' | ',' | ';' | '[' | ']') {
            out.push('\\');
        }
        out.push(ch);
    }
    out
}

/// ffmpeg-based muxer.
#[derive(Debug, Clone, Default)]
pub struct FfmpegMuxer {
    settings: MuxSettings,
}

impl FfmpegMuxer {
    pub fn new(settings: MuxSettings) -> Self {
        Self { settings }
    }

    async fn run_ffmpeg(&self, plan: &MuxPlan) -> RecapResult<()> {
        tracing::debug!(args = ?plan.ffmpeg_args, "Running ffmpeg");
        let mut child = Command::new("ffmpeg")
            .args(&plan.ffmpeg_args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| RecapError::mux(format!("Failed to start ffmpeg: {e}")))?;

        tracing::info!(
            pid = child.id().unwrap_or_default(),
            expected_duration_secs = plan.expected_duration_secs,
            "ffmpeg process started"
        );

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| RecapError::mux("Failed to capture ffmpeg stdout"))?;
        let mut stderr = child
            .stderr
            .take()
            .ok_or_else(|| RecapError::mux("Failed to capture ffmpeg stderr"))?;

        let stderr_task = tokio::spawn(async move {
            let mut output = String::new();
            match stderr.read_to_string(&mut output).await {
                Ok(_) => output,
                Err(err) => format!("<failed to read ffmpeg stderr: {err}>"),
            }
        });

        let mut lines = BufReader::new(stdout).lines();
        let mut out_time_secs = 0.0f64;
        while let Some(line) = lines
            .next_line()
            .await
            .map_err(|e| RecapError::mux(format!("Failed reading ffmpeg progress: {e}")))?
        {
            if let Some(secs) = parse_out_time(&line) {
                out_time_secs = secs;
            } else if line.trim() == "progress=continue" {
                tracing::trace!(out_time_secs, "ffmpeg progress");
            }
        }

        let status = child
            .wait()
            .await
            .map_err(|e| RecapError::mux(format!("Failed to wait on ffmpeg: {e}")))?;
        let stderr_output = stderr_task
            .await
            .unwrap_or_else(|_| "<failed to join stderr reader>".to_string());

        if !status.success() {
            return Err(RecapError::mux(format!(
                "ffmpeg failed (status {status}): {}",
                stderr_output.trim()
            )));
        }
        Ok(())
    }
}

/// `out_time_us=1500000` -> 1.5. ffmpeg also emits the misnamed
/// `out_time_ms` in microseconds.
fn parse_out_time(line: &str) -> Option<f64> {
    let (key, value) = line.trim().split_once('=')?;
    match key {
        "out_time_us" | "out_time_ms" => value.parse::<i64>().ok().map(|us| us as f64 / 1e6),
        _ => None,
    }
}

#[async_trait]
impl Muxer for FfmpegMuxer {
    async fn mux(&self, job: &MuxJob) -> RecapResult<PathBuf> {
        let plan = build_mux_plan(job, &self.settings)?;

        tokio::fs::create_dir_all(&job.scratch_dir).await?;
        if let Some(parent) = job.output_path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&plan.pages_list_path, &plan.pages_list).await?;
        tokio::fs::write(&plan.audio_list_path, &plan.audio_list).await?;

        self.run_ffmpeg(&plan).await?;

        if !job.output_path.is_file() {
            return Err(RecapError::mux(format!(
                "ffmpeg reported success but {} is missing",
                job.output_path.display()
            )));
        }

        tracing::info!(
            output = %job.output_path.display(),
            duration_secs = plan.expected_duration_secs,
            "Video assembled"
        );
        Ok(job.output_path.clone())
    }

    fn is_available(&self) -> bool {
        command_exists("ffmpeg")
    }

    fn name(&self) -> &str {
        "ffmpeg"
    }
}

//! Speech synthesis backends.
//!
//! Every backend leaves a 48 kHz mono PCM WAV at the requested path so the
//! muxer can concatenate clips without resampling, and reports the duration
//! measured on that file rather than the planner's estimate.

use std::path::{Path, PathBuf};
use std::process::Stdio;

use async_trait::async_trait;
use mangarecap_common::error::{RecapError, RecapResult};
use mangarecap_page_model::audio::SynthesizedAudio;
use mangarecap_page_model::narration::NarrationSegment;
use tokio::process::Command;

use crate::probe::{command_exists, probe_duration};

pub const SAMPLE_RATE: u32 = 48_000;

/// Trait for narration-to-audio backends.
#[async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    /// Render `segment` as audio at `output_path`.
    async fn synthesize(
        &self,
        segment: &NarrationSegment,
        output_path: &Path,
    ) -> RecapResult<SynthesizedAudio>;

    /// Check if this backend is available on the system.
    fn is_available(&self) -> bool;

    /// Backend name.
    fn name(&self) -> &str;
}

/// Runs an external text-to-speech program.
///
/// `{text}` and `{output}` in the argument list are replaced with the
/// narration text and a scratch WAV path. The program's output is then
/// normalized with ffmpeg.
#[derive(Debug, Clone)]
pub struct CommandSynthesizer {
    command: Vec<String>,
}

impl CommandSynthesizer {
    pub fn new(command: Vec<String>) -> Self {
        Self { command }
    }

    fn expand_args(&self, text: &str, output: &Path) -> Vec<String> {
        let output = output.to_string_lossy();
        self.command
            .iter()
            .map(|arg| arg.replace("{text}", text).replace("{output}", &output))
            .collect()
    }
}

#[async_trait]
impl SpeechSynthesizer for CommandSynthesizer {
    async fn synthesize(
        &self,
        segment: &NarrationSegment,
        output_path: &Path,
    ) -> RecapResult<SynthesizedAudio> {
        let page = segment.page_number;
        let raw_path = raw_output_path(output_path);
        let args = self.expand_args(&segment.text, &raw_path);
        let (program, rest) = args
            .split_first()
            .ok_or_else(|| RecapError::synthesis(page, "speech command is empty"))?;

        tracing::debug!(program = %program, page, "Running speech synthesizer");
        run_tool(program, rest)
            .await
            .map_err(|e| RecapError::synthesis(page, e))?;

        if !raw_path.is_file() {
            return Err(RecapError::synthesis(
                page,
                format!("{program} did not write {}", raw_path.display()),
            ));
        }

        let normalize = normalize_args(&raw_path, output_path);
        let result = run_tool("ffmpeg", &normalize).await;
        let _ = tokio::fs::remove_file(&raw_path).await;
        result.map_err(|e| RecapError::synthesis(page, e))?;

        measured_audio(segment, output_path).await
    }

    fn is_available(&self) -> bool {
        self.command
            .first()
            .map(|program| command_exists(program))
            .unwrap_or(false)
            && command_exists("ffmpeg")
    }

    fn name(&self) -> &str {
        "command"
    }
}

/// Produces silence of the segment's estimated length.
///
/// Used when no speech program is configured; the video keeps its pacing and
/// subtitles carry the narration.
#[derive(Debug, Clone, Default)]
pub struct SilentSynthesizer;

impl SilentSynthesizer {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl SpeechSynthesizer for SilentSynthesizer {
    async fn synthesize(
        &self,
        segment: &NarrationSegment,
        output_path: &Path,
    ) -> RecapResult<SynthesizedAudio> {
        let page = segment.page_number;
        if !segment.duration_secs.is_finite() || segment.duration_secs <= 0.0 {
            return Err(RecapError::synthesis(
                page,
                format!("cannot render {}s of silence", segment.duration_secs),
            ));
        }

        let args = silence_args(segment.duration_secs, output_path);
        run_tool("ffmpeg", &args)
            .await
            .map_err(|e| RecapError::synthesis(page, e))?;

        measured_audio(segment, output_path).await
    }

    fn is_available(&self) -> bool {
        command_exists("ffmpeg")
    }

    fn name(&self) -> &str {
        "silent"
    }
}

fn raw_output_path(output_path: &Path) -> PathBuf {
    let stem = output_path
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| "speech".to_string());
    output_path.with_file_name(format!("{stem}.src.wav"))
}

fn normalize_args(input: &Path, output: &Path) -> Vec<String> {
    vec![
        "-y".to_string(),
        "-hide_banner".to_string(),
        "-loglevel".to_string(),
        "error".to_string(),
        "-i".to_string(),
        input.to_string_lossy().to_string(),
        "-ar".to_string(),
        SAMPLE_RATE.to_string(),
        "-ac".to_string(),
        "1".to_string(),
        "-c:a".to_string(),
        "pcm_s16le".to_string(),
        output.to_string_lossy().to_string(),
    ]
}

fn silence_args(duration_secs: f64, output: &Path) -> Vec<String> {
    vec![
        "-y".to_string(),
        "-hide_banner".to_string(),
        "-loglevel".to_string(),
        "error".to_string(),
        "-f".to_string(),
        "lavfi".to_string(),
        "-i".to_string(),
        format!("anullsrc=r={SAMPLE_RATE}:cl=mono"),
        "-t".to_string(),
        format!("{duration_secs:.3}"),
        "-c:a".to_string(),
        "pcm_s16le".to_string(),
        output.to_string_lossy().to_string(),
    ]
}

async fn measured_audio(
    segment: &NarrationSegment,
    path: &Path,
) -> RecapResult<SynthesizedAudio> {
    let duration_secs = probe_duration(path)
        .await
        .map_err(|e| RecapError::synthesis(segment.page_number, e.to_string()))?;

    tracing::debug!(
        page = segment.page_number,
        estimated_secs = segment.duration_secs,
        measured_secs = duration_secs,
        "Narration audio written"
    );

    Ok(SynthesizedAudio {
        page_number: segment.page_number,
        path: path.to_path_buf(),
        duration_secs,
    })
}

/// Run a program to completion, returning its stderr on failure.
async fn run_tool(program: &str, args: &[String]) -> Result<(), String> {
    let output = Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .output()
        .await
        .map_err(|e| format!("failed to start {program}: {e}"))?;

    if output.status.success() {
        Ok(())
    } else {
        Err(format!(
            "{program} exited with {}: {}",
            output.status,
            String::from_utf8_lossy(&output.stderr).trim()
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_placeholders_are_substituted() {
        let synth = CommandSynthesizer::new(vec![
            "espeak-ng".to_string(),
            "-w".to_string(),
            "{output}".to_string(),
            "{text}".to_string(),
        ]);
        let args = synth.expand_args("Hello there.", Path::new("/tmp/audio/page-1.src.wav"));
        assert_eq!(
            args,
            vec!["espeak-ng", "-w", "/tmp/audio/page-1.src.wav", "Hello there."]
        );
    }

    #[test]
    fn test_raw_output_sits_next_to_final_file() {
        assert_eq!(
            raw_output_path(Path::new("/run/audio/page-0003.wav")),
            PathBuf::from("/run/audio/page-0003.src.wav")
        );
    }

    #[test]
    fn test_silence_args_use_segment_length() {
        let args = silence_args(4.25, Path::new("out.wav"));
        let t = args.iter().position(|a| a == "-t").unwrap();
        assert_eq!(args[t + 1], "4.250");
        assert!(args.contains(&"anullsrc=r=48000:cl=mono".to_string()));
        assert_eq!(args.last().unwrap(), "out.wav");
    }

    #[tokio::test]
    async fn test_empty_command_fails_for_its_page() {
        let dir = tempfile::tempdir().unwrap();
        let segment = NarrationSegment::new(4, "Hello.", 3.0);
        let err = CommandSynthesizer::new(vec![])
            .synthesize(&segment, &dir.path().join("page-4.wav"))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            RecapError::SynthesisFailure { page_number: 4, .. }
        ));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_program_that_writes_nothing_fails() {
        let dir = tempfile::tempdir().unwrap();
        let segment = NarrationSegment::new(2, "Hello.", 3.0);
        let err = CommandSynthesizer::new(vec!["true".to_string()])
            .synthesize(&segment, &dir.path().join("page-2.wav"))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            RecapError::SynthesisFailure { page_number: 2, .. }
        ));
    }

    #[tokio::test]
    async fn test_silence_rejects_non_positive_duration() {
        let dir = tempfile::tempdir().unwrap();
        let segment = NarrationSegment::new(1, "Hello.", 0.0);
        let err = SilentSynthesizer::new()
            .synthesize(&segment, &dir.path().join("page-1.wav"))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            RecapError::SynthesisFailure { page_number: 1, .. }
        ));
    }
}

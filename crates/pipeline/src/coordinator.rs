//! Media assembly coordinator.
//!
//! Drives one run through its stages in order, reporting progress on entry
//! to each stage and exactly one terminal record at the end:
//!
//! ```text
//! Uploaded -> Rasterizing -> Narrating -> Synthesizing -> Assembling -> Complete
//!                 \______________\_____________\______________\______-> Failed | Cancelled
//! ```
//!
//! Cancellation is observed before each stage. Every collaborator call is
//! bounded by its configured timeout and never retried.

use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use mangarecap_common::clock::RunId;
use mangarecap_common::config::AppConfig;
use mangarecap_common::error::{RecapError, RecapResult, Stage};
use mangarecap_narration::captioner::{Captioner, CommandCaptioner, TemplateCaptioner};
use mangarecap_narration::planner::{DurationPolicy, NarrationPlanner};
use mangarecap_narration::subtitles::save_subtitles;
use mangarecap_page_model::audio::SynthesizedAudio;
use mangarecap_page_model::narration::NarrationSegment;
use mangarecap_page_model::page::PageStore;
use mangarecap_render_engine::mux::{FfmpegMuxer, MuxJob, MuxSettings, Muxer};
use mangarecap_render_engine::raster::{ImageDirRasterizer, PdfRasterizer, Rasterizer};
use mangarecap_render_engine::speech::{CommandSynthesizer, SilentSynthesizer, SpeechSynthesizer};
use mangarecap_timeline::builder::build_timeline;
use mangarecap_timeline::reconcile::reconcile_durations;
use tracing::Instrument;

use crate::progress::ProgressSink;
use crate::run::{PipelineRun, RunState};
use crate::workspace::RunWorkspace;

/// Kind of source document a run accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DocumentKind {
    #[default]
    Pdf,
    /// A directory of pre-rendered page images.
    ImageDir,
}

/// External collaborators a run depends on.
#[derive(Clone)]
pub struct Collaborators {
    pub rasterizer: Arc<dyn Rasterizer>,
    pub captioner: Arc<dyn Captioner>,
    pub synthesizer: Arc<dyn SpeechSynthesizer>,
    pub muxer: Arc<dyn Muxer>,
}

impl Collaborators {
    /// Production backends selected from configuration.
    pub fn from_config(config: &AppConfig, kind: DocumentKind) -> Self {
        let rasterizer: Arc<dyn Rasterizer> = match kind {
            DocumentKind::Pdf => Arc::new(PdfRasterizer::new(config.render.pdf_dpi)),
            DocumentKind::ImageDir => Arc::new(ImageDirRasterizer::new()),
        };

        let captioner: Arc<dyn Captioner> = match &config.narration.caption_command {
            Some(command) if !command.is_empty() => Arc::new(CommandCaptioner::new(command.clone())),
            _ => Arc::new(TemplateCaptioner::new()),
        };

        let synthesizer: Arc<dyn SpeechSynthesizer> = match &config.narration.speech_command {
            Some(command) if !command.is_empty() => {
                Arc::new(CommandSynthesizer::new(command.clone()))
            }
            _ => Arc::new(SilentSynthesizer::new()),
        };

        let muxer: Arc<dyn Muxer> = Arc::new(FfmpegMuxer::new(MuxSettings::from(&config.render)));

        Self {
            rasterizer,
            captioner,
            synthesizer,
            muxer,
        }
    }
}

/// A stage error tagged with the stage that raised it.
#[derive(Debug)]
struct StageFailure {
    stage: Stage,
    error: RecapError,
}

fn at(stage: Stage) -> impl FnOnce(RecapError) -> StageFailure {
    move |error| StageFailure { stage, error }
}

/// Await `fut`, turning an elapsed `limit` into a [`RecapError::StageTimeout`].
async fn bounded<T>(
    stage: Stage,
    limit: Duration,
    fut: impl Future<Output = RecapResult<T>>,
) -> Result<T, StageFailure> {
    match tokio::time::timeout(limit, fut).await {
        Ok(result) => result.map_err(at(stage)),
        Err(_) => Err(StageFailure {
            stage,
            error: RecapError::timeout(stage, limit),
        }),
    }
}

/// File name of the video produced by run `id`.
pub fn output_file_name(id: &RunId) -> String {
    format!("manga_recap_{id}.mp4")
}

/// Sequences the stages of each run. Cheap to clone; runs share nothing but
/// configuration and collaborators.
#[derive(Clone)]
pub struct Coordinator {
    config: Arc<AppConfig>,
    collaborators: Collaborators,
}

impl Coordinator {
    pub fn new(config: AppConfig, collaborators: Collaborators) -> Self {
        Self {
            config: Arc::new(config),
            collaborators,
        }
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Run the pipeline on `document` under a fresh run id.
    pub async fn run(
        &self,
        document: &Path,
        sink: &dyn ProgressSink,
        cancel: &AtomicBool,
    ) -> PipelineRun {
        self.run_with_id(RunId::generate(), document, sink, cancel)
            .await
    }

    /// Run the pipeline on `document` as run `id`.
    ///
    /// Always returns a terminal run. The scratch directory is removed on
    /// every outcome; `document` is deleted only when the run completes.
    pub async fn run_with_id(
        &self,
        id: RunId,
        document: &Path,
        sink: &dyn ProgressSink,
        cancel: &AtomicBool,
    ) -> PipelineRun {
        let span = tracing::info_span!("run", run_id = %id);
        async move {
            let mut run = PipelineRun::new(id, document);
            let mut workspace = None;
            let mut consumed = Vec::new();
            tracing::info!(
                document = %document.display(),
                started_at = run.started_at(),
                "Run accepted"
            );

            let outcome = self
                .execute(&mut run, &mut workspace, &mut consumed, sink, cancel)
                .await;

            let settled = match outcome {
                Ok(video_path) => {
                    let url = self.video_url(&video_path);
                    run.complete(video_path, url)
                }
                Err(StageFailure { stage, error }) => {
                    let kind = error.kind_in(stage);
                    if matches!(error, RecapError::Cancelled) {
                        tracing::info!(stage = %stage, "Run cancelled");
                    } else {
                        tracing::error!(stage = %stage, kind = ?kind, error = %error, "Run failed");
                    }
                    run.fail(kind, error.to_string())
                }
            };
            if let Err(e) = settled {
                tracing::error!(error = %e, "Run could not reach a terminal state cleanly");
                if !run.is_terminal() {
                    let _ = run.fail(e.kind_in(Stage::Mux), e.to_string());
                }
            }

            if let Some(ws) = workspace {
                if let Err(e) = ws.remove().await {
                    tracing::warn!(root = %ws.root().display(), error = %e, "Failed to remove run workspace");
                }
            }

            if run.state() == RunState::Complete {
                remove_consumed_input(document, &consumed).await;
            }

            if let Some(record) = run.take_terminal_record() {
                sink.send(record);
            }

            tracing::info!(
                state = ?run.state(),
                elapsed_ms = run.elapsed_ms(),
                "Run finished"
            );
            run
        }
        .instrument(span)
        .await
    }

    fn video_url(&self, video_path: &Path) -> String {
        let name = video_path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        format!(
            "{}/{}",
            self.config.video_url_prefix.trim_end_matches('/'),
            name
        )
    }

    /// Observe cancellation, then move `run` into `state` and report it.
    fn enter(
        &self,
        run: &mut PipelineRun,
        state: RunState,
        stage: Stage,
        sink: &dyn ProgressSink,
        cancel: &AtomicBool,
    ) -> Result<(), StageFailure> {
        if cancel.load(Ordering::SeqCst) {
            return Err(StageFailure {
                stage,
                error: RecapError::Cancelled,
            });
        }
        run.advance(state).map_err(at(stage))?;
        if let Some(record) = run.progress_record() {
            sink.send(record);
        }
        tracing::info!(
            state = ?state,
            progress = run.progress(),
            elapsed_ms = run.elapsed_ms(),
            "Stage started"
        );
        Ok(())
    }

    async fn execute(
        &self,
        run: &mut PipelineRun,
        workspace: &mut Option<RunWorkspace>,
        consumed: &mut Vec<PathBuf>,
        sink: &dyn ProgressSink,
        cancel: &AtomicBool,
    ) -> Result<PathBuf, StageFailure> {
        let config = &*self.config;
        let document = run.document().to_path_buf();

        if !document.exists() {
            return Err(StageFailure {
                stage: Stage::Rasterize,
                error: RecapError::unreadable(format!(
                    "No file uploaded: {} does not exist",
                    document.display()
                )),
            });
        }

        // Rasterizing
        self.enter(run, RunState::Rasterizing, Stage::Rasterize, sink, cancel)?;
        let ws = RunWorkspace::create(&config.work_dir, run.id())
            .await
            .map_err(at(Stage::Rasterize))?;
        let ws = workspace.insert(ws);
        let pages = bounded(
            Stage::Rasterize,
            config.timeouts.rasterize(),
            self.collaborators
                .rasterizer
                .rasterize(&document, &ws.pages_dir()),
        )
        .await?;
        let store = PageStore::from_pages(pages).map_err(at(Stage::Rasterize))?;
        consumed.extend(store.pages().iter().map(|p| p.image_path.clone()));
        tracing::info!(
            pages = store.len(),
            rasterizer = self.collaborators.rasterizer.name(),
            "Pages ready"
        );

        // Narrating
        self.enter(run, RunState::Narrating, Stage::Narrate, sink, cancel)?;
        let planner = NarrationPlanner::new(
            self.collaborators.captioner.clone(),
            DurationPolicy::from(&config.narration),
            config.timeouts.caption(),
        );
        let segments = planner
            .plan(store.pages())
            .await
            .map_err(at(Stage::Narrate))?;

        // Synthesizing
        self.enter(run, RunState::Synthesizing, Stage::Synthesize, sink, cancel)?;
        let audio = self.synthesize_all(&segments, ws).await?;
        let segments = reconcile_durations(&segments, &audio).map_err(at(Stage::Synthesize))?;

        // Assembling
        self.enter(run, RunState::Assembling, Stage::Timeline, sink, cancel)?;
        let timeline = build_timeline(&segments).map_err(at(Stage::Timeline))?;
        let subtitles_path = ws.subtitles_path();
        save_subtitles(&timeline.entries, &subtitles_path)
            .await
            .map_err(at(Stage::Subtitles))?;

        tokio::fs::create_dir_all(&config.outputs_dir)
            .await
            .map_err(|e| at(Stage::Mux)(e.into()))?;
        let job = MuxJob {
            pages: store.pages().to_vec(),
            audio,
            timeline,
            subtitles_path,
            output_path: config.outputs_dir.join(output_file_name(run.id())),
            scratch_dir: ws.root().to_path_buf(),
        };
        let video_path = bounded(
            Stage::Mux,
            config.timeouts.mux(),
            self.collaborators.muxer.mux(&job),
        )
        .await?;

        tracing::info!(
            video = %video_path.display(),
            duration_secs = job.timeline.total_duration_secs,
            "Video ready"
        );
        Ok(video_path)
    }

    async fn synthesize_all(
        &self,
        segments: &[NarrationSegment],
        ws: &RunWorkspace,
    ) -> Result<Vec<SynthesizedAudio>, StageFailure> {
        let limit = self.config.timeouts.synthesize();
        let mut audio = Vec::with_capacity(segments.len());
        for segment in segments {
            let output = ws.audio_path(segment.page_number);
            let clip = bounded(
                Stage::Synthesize,
                limit,
                self.collaborators.synthesizer.synthesize(segment, &output),
            )
            .await?;
            audio.push(clip);
        }
        tracing::info!(
            clips = audio.len(),
            synthesizer = self.collaborators.synthesizer.name(),
            "Narration audio ready"
        );
        Ok(audio)
    }
}

/// Delete the input of a completed run.
///
/// A document file is removed outright. For an image directory only the
/// page images the run used are removed; the directory itself goes only if
/// nothing else is left in it.
async fn remove_consumed_input(document: &Path, consumed: &[PathBuf]) {
    if !document.is_dir() {
        match tokio::fs::remove_file(document).await {
            Ok(()) => tracing::debug!(document = %document.display(), "Input document removed"),
            Err(e) => tracing::warn!(document = %document.display(), error = %e, "Failed to remove input document"),
        }
        return;
    }

    let mut removed = 0usize;
    for image in consumed.iter().filter(|p| p.starts_with(document)) {
        match tokio::fs::remove_file(image).await {
            Ok(()) => removed += 1,
            Err(e) => tracing::warn!(image = %image.display(), error = %e, "Failed to remove page image"),
        }
    }
    match tokio::fs::remove_dir(document).await {
        Ok(()) => tracing::debug!(document = %document.display(), removed, "Input directory removed"),
        Err(_) => tracing::debug!(
            document = %document.display(),
            removed,
            "Page images removed; other files kept"
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_output_file_name() {
        let id = RunId::from_string("20260101T120000000-deadbeef");
        assert_eq!(
            output_file_name(&id),
            "manga_recap_20260101T120000000-deadbeef.mp4"
        );
    }

    #[test]
    fn test_video_url_joins_prefix() {
        let config = AppConfig {
            video_url_prefix: "/outputs/".to_string(),
            ..AppConfig::default()
        };
        let coordinator = Coordinator::new(
            config.clone(),
            Collaborators::from_config(&config, DocumentKind::ImageDir),
        );
        assert_eq!(
            coordinator.video_url(Path::new("/data/outputs/manga_recap_x.mp4")),
            "/outputs/manga_recap_x.mp4"
        );
    }

    #[test]
    fn test_default_collaborators() {
        let config = AppConfig::default();
        let c = Collaborators::from_config(&config, DocumentKind::Pdf);
        assert_eq!(c.rasterizer.name(), "pdftoppm");
        assert_eq!(c.captioner.name(), "template");
        assert_eq!(c.synthesizer.name(), "silent");
        assert_eq!(c.muxer.name(), "ffmpeg");
    }

    #[test]
    fn test_configured_commands_select_command_backends() {
        let mut config = AppConfig::default();
        config.narration.caption_command = Some(vec!["blip-caption".to_string()]);
        config.narration.speech_command = Some(vec![
            "espeak-ng".to_string(),
            "-w".to_string(),
            "{output}".to_string(),
            "{text}".to_string(),
        ]);
        let c = Collaborators::from_config(&config, DocumentKind::ImageDir);
        assert_eq!(c.rasterizer.name(), "image-dir");
        assert_eq!(c.captioner.name(), "command");
        assert_eq!(c.synthesizer.name(), "command");
    }
}

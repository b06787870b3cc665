//! Narration planning: one segment per page, in page order.

use std::sync::Arc;
use std::time::Duration;

use mangarecap_common::config::NarrationDefaults;
use mangarecap_common::error::{RecapError, RecapResult};
use mangarecap_page_model::narration::{word_count, NarrationSegment};
use mangarecap_page_model::page::Page;

use crate::captioner::{Captioner, PagePosition};

/// Duration of the substitute segment used when captioning a page fails.
pub const FALLBACK_DURATION_SECS: f64 = 3.0;

/// Text of the substitute segment for `page_number`.
pub fn fallback_narration(page_number: u32) -> String {
    format!("On page {page_number}, the action intensifies.")
}

/// Converts narration text into an estimated spoken duration.
#[derive(Debug, Clone, Copy)]
pub struct DurationPolicy {
    /// Fixed speaking rate.
    pub words_per_minute: f64,
    /// Floor that keeps near-empty text playable.
    pub min_duration_secs: f64,
}

impl Default for DurationPolicy {
    fn default() -> Self {
        Self {
            words_per_minute: 150.0,
            min_duration_secs: 3.0,
        }
    }
}

impl From<&NarrationDefaults> for DurationPolicy {
    fn from(defaults: &NarrationDefaults) -> Self {
        Self {
            words_per_minute: defaults.words_per_minute,
            min_duration_secs: defaults.min_duration_secs,
        }
    }
}

impl DurationPolicy {
    /// `max(min, words / wpm * 60)`.
    pub fn estimate(&self, text: &str) -> f64 {
        let spoken = word_count(text) as f64 / self.words_per_minute * 60.0;
        spoken.max(self.min_duration_secs)
    }
}

/// Produces the narration plan for a run.
#[derive(Clone)]
pub struct NarrationPlanner {
    captioner: Arc<dyn Captioner>,
    policy: DurationPolicy,
    caption_timeout: Duration,
}

impl NarrationPlanner {
    pub fn new(
        captioner: Arc<dyn Captioner>,
        policy: DurationPolicy,
        caption_timeout: Duration,
    ) -> Self {
        Self {
            captioner,
            policy,
            caption_timeout,
        }
    }

    /// Plan one segment per page, preserving order.
    ///
    /// A page whose caption fails, times out, or comes back blank gets the
    /// fallback segment; the rest of the plan is unaffected. Only an empty
    /// page list fails the whole plan.
    pub async fn plan(&self, pages: &[Page]) -> RecapResult<Vec<NarrationSegment>> {
        if pages.is_empty() {
            return Err(RecapError::EmptyDocument);
        }

        let mut segments = Vec::with_capacity(pages.len());
        let mut fallbacks = 0usize;

        for (index, page) in pages.iter().enumerate() {
            let position = PagePosition::of(index, pages.len());
            let attempt =
                tokio::time::timeout(self.caption_timeout, self.captioner.caption(page, position))
                    .await;

            let text = match attempt {
                Ok(Ok(text)) if !text.trim().is_empty() => Some(text.trim().to_string()),
                Ok(Ok(_)) => {
                    tracing::warn!(page = page.page_number, "Captioner returned empty text");
                    None
                }
                Ok(Err(e)) => {
                    tracing::warn!(page = page.page_number, error = %e, "Captioning failed");
                    None
                }
                Err(_) => {
                    tracing::warn!(
                        page = page.page_number,
                        timeout_secs = self.caption_timeout.as_secs_f64(),
                        "Captioning timed out"
                    );
                    None
                }
            };

            let segment = match text {
                Some(text) => {
                    let duration = self.policy.estimate(&text);
                    NarrationSegment::new(page.page_number, text, duration)
                }
                None => {
                    fallbacks += 1;
                    NarrationSegment::new(
                        page.page_number,
                        fallback_narration(page.page_number),
                        FALLBACK_DURATION_SECS,
                    )
                }
            };
            segments.push(segment);
        }

        tracing::info!(
            captioner = self.captioner.name(),
            segments = segments.len(),
            fallbacks,
            "Narration planned"
        );

        Ok(segments)
    }
}

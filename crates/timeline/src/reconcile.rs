//! Reconciliation of planned narration length with synthesized audio.
//!
//! The planner estimates how long each segment takes to speak; the speech
//! synthesizer reports how long the produced clip actually plays. Audio is
//! what the viewer hears, so its measured length replaces the estimate before
//! the timeline is built.

use mangarecap_common::clock::DurationDrift;
use mangarecap_common::error::{RecapError, RecapResult};
use mangarecap_page_model::audio::SynthesizedAudio;
use mangarecap_page_model::narration::NarrationSegment;

/// Drift above this is logged as a warning.
pub const DRIFT_WARN_THRESHOLD_MS: f64 = 250.0;

/// Return `segments` with each duration replaced by its clip's measured one.
///
/// `audio` must pair one-to-one, in order, with `segments`. Mismatched
/// counts, mismatched page numbers, or a non-positive measured duration are
/// reported as [`RecapError::SynthesisFailure`].
pub fn reconcile_durations(
    segments: &[NarrationSegment],
    audio: &[SynthesizedAudio],
) -> RecapResult<Vec<NarrationSegment>> {
    if segments.len() != audio.len() {
        let page = segments
            .get(audio.len())
            .or_else(|| segments.last())
            .map(|s| s.page_number)
            .unwrap_or(0);
        return Err(RecapError::synthesis(
            page,
            format!(
                "expected {} audio clips, synthesizer produced {}",
                segments.len(),
                audio.len()
            ),
        ));
    }

    segments
        .iter()
        .zip(audio)
        .map(|(segment, clip)| {
            if segment.page_number != clip.page_number {
                return Err(RecapError::synthesis(
                    segment.page_number,
                    format!("audio clip belongs to page {}", clip.page_number),
                ));
            }
            if !(clip.duration_secs.is_finite() && clip.duration_secs > 0.0) {
                return Err(RecapError::synthesis(
                    segment.page_number,
                    format!("measured audio duration {} is not playable", clip.duration_secs),
                ));
            }

            let drift = DurationDrift {
                estimated_secs: segment.duration_secs,
                measured_secs: clip.duration_secs,
            };
            if drift.exceeds_threshold_ms(DRIFT_WARN_THRESHOLD_MS) {
                tracing::warn!(
                    page = segment.page_number,
                    estimated_secs = segment.duration_secs,
                    measured_secs = clip.duration_secs,
                    drift_ms = drift.drift_ms(),
                    "Narration audio length differs from plan; using measured length"
                );
            }

            Ok(segment.with_duration(clip.duration_secs))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::build_timeline;

    fn clip(page_number: u32, duration_secs: f64) -> SynthesizedAudio {
        SynthesizedAudio {
            page_number,
            path: format!("audio/page-{page_number}.wav").into(),
            duration_secs,
        }
    }

    #[test]
    fn test_measured_duration_wins() {
        let segments = vec![
            NarrationSegment::new(1, "Welcome.", 3.0),
            NarrationSegment::new(2, "Action.", 3.0),
        ];
        let audio = vec![clip(1, 3.6), clip(2, 2.4)];

        let reconciled = reconcile_durations(&segments, &audio).unwrap();
        assert_eq!(reconciled[0].duration_secs, 3.6);
        assert_eq!(reconciled[1].duration_secs, 2.4);

        let timeline = build_timeline(&reconciled).unwrap();
        assert_eq!(timeline.entries[1].start_secs, 3.6);
        assert_eq!(timeline.total_duration_secs, 3.6 + 2.4);
    }

    #[test]
    fn test_missing_clip_is_synthesis_failure() {
        let segments = vec![
            NarrationSegment::new(1, "Welcome.", 3.0),
            NarrationSegment::new(2, "Action.", 3.0),
        ];
        let err = reconcile_durations(&segments, &[clip(1, 3.0)]).unwrap_err();
        assert!(matches!(
            err,
            RecapError::SynthesisFailure { page_number: 2, .. }
        ));
    }

    #[test]
    fn test_out_of_order_clip_is_rejected() {
        let segments = vec![
            NarrationSegment::new(1, "Welcome.", 3.0),
            NarrationSegment::new(2, "Action.", 3.0),
        ];
        let err = reconcile_durations(&segments, &[clip(2, 3.0), clip(1, 3.0)]).unwrap_err();
        assert!(matches!(
            err,
            RecapError::SynthesisFailure { page_number: 1, .. }
        ));
    }

    #[test]
    fn test_zero_length_clip_is_rejected() {
        let segments = vec![NarrationSegment::new(1, "Welcome.", 3.0)];
        assert!(reconcile_durations(&segments, &[clip(1, 0.0)]).is_err());
        assert!(reconcile_durations(&segments, &[clip(1, f64::NAN)]).is_err());
    }
}

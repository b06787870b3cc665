//! Timeline construction.

use mangarecap_common::error::{RecapError, RecapResult};
use mangarecap_page_model::narration::NarrationSegment;
use mangarecap_page_model::timeline::{Timeline, TimelineEntry};

/// Place `segments` back to back starting at zero.
///
/// Each entry starts at the running sum of all earlier durations and ends at
/// `start + duration`; the next start is that same sum, so entries are
/// contiguous bit for bit. The total is the final running sum. Re-running on
/// the same input yields identical output.
pub fn build_timeline(segments: &[NarrationSegment]) -> RecapResult<Timeline> {
    if segments.is_empty() {
        return Err(RecapError::EmptyTimeline);
    }

    let mut entries = Vec::with_capacity(segments.len());
    let mut cursor = 0.0f64;

    for segment in segments {
        if !(segment.duration_secs.is_finite() && segment.duration_secs > 0.0) {
            return Err(RecapError::synthesis(
                segment.page_number,
                format!("invalid segment duration {}", segment.duration_secs),
            ));
        }

        let start_secs = cursor;
        let end_secs = start_secs + segment.duration_secs;
        entries.push(TimelineEntry {
            page_number: segment.page_number,
            start_secs,
            end_secs,
            text: segment.text.clone(),
        });
        cursor = end_secs;
    }

    tracing::debug!(
        entries = entries.len(),
        total_secs = cursor,
        "Timeline built"
    );

    Ok(Timeline {
        entries,
        total_duration_secs: cursor,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn segments(durations: &[f64]) -> Vec<NarrationSegment> {
        durations
            .iter()
            .enumerate()
            .map(|(i, d)| NarrationSegment::new(i as u32 + 1, format!("Page {}", i + 1), *d))
            .collect()
    }

    #[test]
    fn test_empty_segments_fail() {
        assert!(matches!(
            build_timeline(&[]).unwrap_err(),
            RecapError::EmptyTimeline
        ));
    }

    #[test]
    fn test_three_segments_start_at_running_sums() {
        let timeline = build_timeline(&segments(&[3.0, 4.4, 3.0])).unwrap();
        let starts: Vec<f64> = timeline.entries.iter().map(|e| e.start_secs).collect();
        assert_eq!(starts, vec![0.0, 3.0, 3.0 + 4.4]);
        assert_eq!(timeline.total_duration_secs, 3.0 + 4.4 + 3.0);
        assert_eq!(timeline.entries[1].text, "Page 2");
    }

    #[test]
    fn test_single_segment_covers_whole_video() {
        let timeline = build_timeline(&segments(&[5.2])).unwrap();
        assert_eq!(timeline.entries[0].start_secs, 0.0);
        assert_eq!(timeline.entries[0].end_secs, 5.2);
        assert_eq!(timeline.total_duration_secs, 5.2);
    }

    #[test]
    fn test_non_positive_duration_is_rejected() {
        let err = build_timeline(&segments(&[3.0, 0.0])).unwrap_err();
        assert!(matches!(
            err,
            RecapError::SynthesisFailure { page_number: 2, .. }
        ));
    }

    #[test]
    fn test_rebuild_is_bit_identical() {
        let input = segments(&[3.1, 0.1, 0.2, 7.77]);
        let a = build_timeline(&input).unwrap();
        let b = build_timeline(&input).unwrap();
        assert_eq!(a, b);
    }

    proptest! {
        #[test]
        fn prop_entries_are_contiguous(durations in prop::collection::vec(0.001f64..600.0, 1..64)) {
            let timeline = build_timeline(&segments(&durations)).unwrap();
            prop_assert_eq!(timeline.entries[0].start_secs, 0.0);
            for pair in timeline.entries.windows(2) {
                prop_assert_eq!(pair[0].end_secs, pair[1].start_secs);
            }
            prop_assert_eq!(timeline.entries.last().unwrap().end_secs, timeline.total_duration_secs);
        }

        #[test]
        fn prop_total_is_sum_of_durations(durations in prop::collection::vec(0.001f64..600.0, 1..64)) {
            let timeline = build_timeline(&segments(&durations)).unwrap();
            let sum = durations.iter().fold(0.0f64, |acc, d| acc + d);
            prop_assert_eq!(timeline.total_duration_secs, sum);
            prop_assert_eq!(timeline.len(), durations.len());
        }
    }
}

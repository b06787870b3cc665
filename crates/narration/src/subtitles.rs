//! Subtitle generation in SRT and VTT formats.

use mangarecap_common::error::{RecapError, RecapResult};
use mangarecap_page_model::subtitle::SubtitleCue;
use mangarecap_page_model::timeline::TimelineEntry;

/// Build numbered cues from timeline entries, one per entry.
pub fn emit_cues(entries: &[TimelineEntry]) -> RecapResult<Vec<SubtitleCue>> {
    if entries.is_empty() {
        return Err(RecapError::EmptyTimeline);
    }

    Ok(entries
        .iter()
        .enumerate()
        .map(|(i, entry)| SubtitleCue {
            index: i + 1,
            start: format_srt_time(entry.start_secs),
            end: format_srt_time(entry.end_secs),
            text: entry.text.clone(),
        })
        .collect())
}

/// Generate SRT subtitle content from timeline entries.
pub fn generate_srt(entries: &[TimelineEntry]) -> RecapResult<String> {
    let mut output = String::new();
    for cue in emit_cues(entries)? {
        output.push_str(&cue.to_string());
        output.push_str("\n\n");
    }
    Ok(output)
}

/// Generate WebVTT subtitle content from timeline entries.
pub fn generate_vtt(entries: &[TimelineEntry]) -> RecapResult<String> {
    if entries.is_empty() {
        return Err(RecapError::EmptyTimeline);
    }

    let mut output = String::from("WEBVTT\n\n");
    for entry in entries {
        output.push_str(&format!(
            "{} --> {}\n",
            format_vtt_time(entry.start_secs),
            format_vtt_time(entry.end_secs),
        ));
        output.push_str(&entry.text);
        output.push_str("\n\n");
    }
    Ok(output)
}

/// Whole milliseconds in `secs`, truncated.
///
/// `secs` is first rounded to the nearest microsecond, so binary
/// representation error (2.3 s is stored as 2.2999…) does not lose a
/// millisecond. A value within half a microsecond below a millisecond
/// boundary therefore lands on that boundary. Negative and non-finite input
/// is clamped to zero.
fn total_millis(secs: f64) -> u64 {
    if !secs.is_finite() || secs <= 0.0 {
        return 0;
    }
    let micros = (secs * 1_000_000.0).round() as u64;
    micros / 1000
}

/// Format seconds as SRT timestamp: HH:MM:SS,mmm (hours are not wrapped).
pub fn format_srt_time(secs: f64) -> String {
    let total_ms = total_millis(secs);
    let hours = total_ms / 3_600_000;
    let minutes = (total_ms % 3_600_000) / 60_000;
    let seconds = (total_ms % 60_000) / 1000;
    let millis = total_ms % 1000;
    format!("{hours:02}:{minutes:02}:{seconds:02},{millis:03}")
}

/// Format seconds as VTT timestamp: HH:MM:SS.mmm
pub fn format_vtt_time(secs: f64) -> String {
    let total_ms = total_millis(secs);
    let hours = total_ms / 3_600_000;
    let minutes = (total_ms % 3_600_000) / 60_000;
    let seconds = (total_ms % 60_000) / 1000;
    let millis = total_ms % 1000;
    format!("{hours:02}:{minutes:02}:{seconds:02}.{millis:03}")
}

/// Save subtitles to a file, choosing the format from its extension.
pub async fn save_subtitles(entries: &[TimelineEntry], path: &std::path::Path) -> RecapResult<()> {
    let content = match path.extension().and_then(|e| e.to_str()) {
        Some("vtt") => generate_vtt(entries)?,
        _ => generate_srt(entries)?, // default to SRT
    };
    tokio::fs::write(path, content).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn entries() -> Vec<TimelineEntry> {
        vec![
            TimelineEntry {
                page_number: 1,
                start_secs: 0.0,
                end_secs: 3.0,
                text: "Welcome to this manga recap.".to_string(),
            },
            TimelineEntry {
                page_number: 2,
                start_secs: 3.0,
                end_secs: 7.25,
                text: "On page 2, the story continues.".to_string(),
            },
            TimelineEntry {
                page_number: 3,
                start_secs: 7.25,
                end_secs: 3661.2005,
                text: "And that wraps up this chapter.".to_string(),
            },
        ]
    }

    #[test]
    fn test_srt_generation() {
        let srt = generate_srt(&entries()).unwrap();
        assert!(srt.starts_with("1\n00:00:00,000 --> 00:00:03,000\nWelcome to this manga recap.\n\n"));
        assert!(srt.contains("2\n00:00:03,000 --> 00:00:07,250\nOn page 2, the story continues.\n\n"));
        assert!(srt.ends_with("3\n00:00:07,250 --> 01:01:01,200\nAnd that wraps up this chapter.\n\n"));
    }

    #[test]
    fn test_cue_indices_are_sequential() {
        let cues = emit_cues(&entries()).unwrap();
        let indices: Vec<usize> = cues.iter().map(|c| c.index).collect();
        assert_eq!(indices, vec![1, 2, 3]);
        assert_eq!(cues[1].text, "On page 2, the story continues.");
    }

    #[test]
    fn test_emission_is_byte_identical() {
        let input = entries();
        assert_eq!(generate_srt(&input).unwrap(), generate_srt(&input).unwrap());
    }

    #[test]
    fn test_empty_entries_fail() {
        assert!(matches!(
            generate_srt(&[]).unwrap_err(),
            RecapError::EmptyTimeline
        ));
        assert!(matches!(
            generate_vtt(&[]).unwrap_err(),
            RecapError::EmptyTimeline
        ));
    }

    #[test]
    fn test_vtt_generation() {
        let vtt = generate_vtt(&entries()[..1]).unwrap();
        assert!(vtt.starts_with("WEBVTT\n"));
        assert!(vtt.contains("00:00:00.000 --> 00:00:03.000"));
    }

    #[test]
    fn test_time_formatting() {
        assert_eq!(format_srt_time(0.0), "00:00:00,000");
        assert_eq!(format_srt_time(3661.2005), "01:01:01,200");
        assert_eq!(format_srt_time(2.3), "00:00:02,300");
        assert_eq!(format_srt_time(59.9999), "00:00:59,999");
        assert_eq!(format_srt_time(1.0009994), "00:00:01,000");
        assert_eq!(format_srt_time(1.0009996), "00:00:01,001");
        assert_eq!(format_srt_time(1.0009999999995), "00:00:01,001");
        assert_eq!(format_vtt_time(3661.5), "01:01:01.500");
    }

    #[test]
    fn test_hours_are_not_wrapped() {
        assert_eq!(format_srt_time(100.0 * 3600.0 + 1.0), "100:00:01,000");
        assert_eq!(format_srt_time(24.0 * 3600.0), "24:00:00,000");
    }

    #[test]
    fn test_negative_and_nan_clamp_to_zero() {
        assert_eq!(format_srt_time(-4.0), "00:00:00,000");
        assert_eq!(format_srt_time(f64::NAN), "00:00:00,000");
    }

    #[tokio::test]
    async fn test_save_subtitles_picks_format_by_extension() {
        let dir = tempfile::tempdir().unwrap();
        let srt_path = dir.path().join("subtitles.srt");
        let vtt_path = dir.path().join("subtitles.vtt");

        save_subtitles(&entries(), &srt_path).await.unwrap();
        save_subtitles(&entries(), &vtt_path).await.unwrap();

        assert!(std::fs::read_to_string(srt_path).unwrap().starts_with("1\n"));
        assert!(std::fs::read_to_string(vtt_path)
            .unwrap()
            .starts_with("WEBVTT"));
    }

    proptest! {
        #[test]
        fn prop_whole_milliseconds_format_exactly(ms in 0u64..100_000_000) {
            let formatted = format_srt_time(ms as f64 / 1000.0);
            let (hms, millis) = formatted.split_once(',').unwrap();
            let parts: Vec<u64> = hms.split(':').map(|p| p.parse().unwrap()).collect();
            let parsed = parts[0] * 3_600_000 + parts[1] * 60_000 + parts[2] * 1000
                + millis.parse::<u64>().unwrap();
            prop_assert_eq!(parsed, ms);
        }
    }
}

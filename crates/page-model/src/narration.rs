//! Narration segments attached to pages.

use serde::{Deserialize, Serialize};

/// Spoken text for exactly one page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NarrationSegment {
    /// Page this segment narrates.
    pub page_number: u32,

    /// Narration text (never empty).
    pub text: String,

    /// Spoken length in seconds (always positive).
    pub duration_secs: f64,
}

impl NarrationSegment {
    pub fn new(page_number: u32, text: impl Into<String>, duration_secs: f64) -> Self {
        Self {
            page_number,
            text: text.into(),
            duration_secs,
        }
    }

    /// Copy of this segment with an authoritative duration.
    pub fn with_duration(&self, duration_secs: f64) -> Self {
        Self {
            duration_secs,
            ..self.clone()
        }
    }
}

/// Number of whitespace-separated words in `text`.
pub fn word_count(text: &str) -> usize {
    text.split_whitespace().count()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_word_count_ignores_repeated_whitespace() {
        assert_eq!(word_count("On page 2,  the story\tcontinues."), 6);
        assert_eq!(word_count("   "), 0);
    }

    #[test]
    fn test_with_duration_keeps_text() {
        let segment = NarrationSegment::new(4, "A quiet panel.", 3.0);
        let measured = segment.with_duration(3.25);
        assert_eq!(measured.text, "A quiet panel.");
        assert_eq!(measured.page_number, 4);
        assert_eq!(measured.duration_secs, 3.25);
    }
}

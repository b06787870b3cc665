//! Subtitle cues.

use std::fmt;

use serde::{Deserialize, Serialize};

/// One numbered subtitle entry with formatted timestamps.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubtitleCue {
    /// 1-based emission order.
    pub index: usize,
    /// Formatted start time.
    pub start: String,
    /// Formatted end time.
    pub end: String,
    pub text: String,
}

/// Renders the cue as a SubRip block, without the trailing blank line.
impl fmt::Display for SubtitleCue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}\n{} --> {}\n{}", self.index, self.start, self.end, self.text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cue_renders_as_srt_block() {
        let cue = SubtitleCue {
            index: 2,
            start: "00:00:03,000".to_string(),
            end: "00:00:06,000".to_string(),
            text: "The story continues.".to_string(),
        };
        assert_eq!(
            cue.to_string(),
            "2\n00:00:03,000 --> 00:00:06,000\nThe story continues."
        );
    }
}

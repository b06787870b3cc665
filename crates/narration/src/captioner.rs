//! Page captioning backends.
//!
//! A captioner produces the narration text for a single page. The planner
//! treats captioners as unreliable: any error, timeout, or empty caption is
//! replaced with fallback text for that page only.

use std::process::Stdio;

use anyhow::anyhow;
use async_trait::async_trait;
use mangarecap_common::error::RecapResult;
use mangarecap_page_model::page::Page;
use tokio::process::Command;

/// Where a page sits in the document, which selects its narration template.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PagePosition {
    /// First page. Also used for a single-page document.
    Opening,
    Interior,
    /// Last page of a multi-page document.
    Closing,
}

impl PagePosition {
    /// Position of the page at `index` in a document of `len` pages.
    ///
    /// The opening position takes precedence, so a one-page document is
    /// narrated with the opening template.
    pub fn of(index: usize, len: usize) -> Self {
        if index == 0 {
            PagePosition::Opening
        } else if index + 1 == len {
            PagePosition::Closing
        } else {
            PagePosition::Interior
        }
    }
}

/// Trait for narration text sources.
#[async_trait]
pub trait Captioner: Send + Sync {
    /// Produce narration text for `page`.
    async fn caption(&self, page: &Page, position: PagePosition) -> RecapResult<String>;

    /// Backend name for logging.
    fn name(&self) -> &str;
}

pub const OPENING_TEMPLATE: &str = "Welcome to this manga recap. Let's dive into the story.";
pub const CLOSING_TEMPLATE: &str =
    "And that wraps up this chapter. Stay tuned for more exciting developments.";

/// Interior page narration.
pub fn interior_narration(page_number: u32) -> String {
    format!("On page {page_number}, the story continues with intense action and drama.")
}

/// Deterministic rule-based captioner.
#[derive(Debug, Clone, Default)]
pub struct TemplateCaptioner;

impl TemplateCaptioner {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Captioner for TemplateCaptioner {
    async fn caption(&self, page: &Page, position: PagePosition) -> RecapResult<String> {
        Ok(match position {
            PagePosition::Opening => OPENING_TEMPLATE.to_string(),
            PagePosition::Closing => CLOSING_TEMPLATE.to_string(),
            PagePosition::Interior => interior_narration(page.page_number),
        })
    }

    fn name(&self) -> &str {
        "template"
    }
}

/// Captioner backed by an external image-to-text program.
///
/// The page image path is appended to `command` and the program's trimmed
/// stdout is taken as a raw scene caption, then expanded into narration.
#[derive(Debug, Clone)]
pub struct CommandCaptioner {
    command: Vec<String>,
}

impl CommandCaptioner {
    pub fn new(command: Vec<String>) -> Self {
        Self { command }
    }
}

/// Turn a raw scene caption into a narration sentence.
pub fn enhance_caption(caption: &str, page_number: u32) -> String {
    let caption = caption.trim().trim_end_matches('.');
    format!(
        "On page {page_number}, we see {caption}. The tension builds as our characters face new challenges."
    )
}

#[async_trait]
impl Captioner for CommandCaptioner {
    async fn caption(&self, page: &Page, _position: PagePosition) -> RecapResult<String> {
        let (program, args) = self
            .command
            .split_first()
            .ok_or_else(|| anyhow!("caption command is empty"))?;

        tracing::debug!(program = %program, page = page.page_number, "Running captioner");
        let output = Command::new(program)
            .args(args)
            .arg(page.image_path())
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| anyhow!("failed to start {program}: {e}"))?;

        if !output.status.success() {
            return Err(anyhow!(
                "{program} exited with {}: {}",
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            )
            .into());
        }

        let caption = String::from_utf8_lossy(&output.stdout).trim().to_string();
        if caption.is_empty() {
            return Err(anyhow!("{program} produced an empty caption").into());
        }

        Ok(enhance_caption(&caption, page.page_number))
    }

    fn name(&self) -> &str {
        "command"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_position_single_page_prefers_opening() {
        assert_eq!(PagePosition::of(0, 1), PagePosition::Opening);
    }

    #[test]
    fn test_position_three_pages() {
        assert_eq!(PagePosition::of(0, 3), PagePosition::Opening);
        assert_eq!(PagePosition::of(1, 3), PagePosition::Interior);
        assert_eq!(PagePosition::of(2, 3), PagePosition::Closing);
    }

    #[tokio::test]
    async fn test_template_interior_names_page() {
        let page = Page::new(7, "pages/page-7.png");
        let text = TemplateCaptioner::new()
            .caption(&page, PagePosition::Interior)
            .await
            .unwrap();
        assert_eq!(
            text,
            "On page 7, the story continues with intense action and drama."
        );
    }

    #[test]
    fn test_enhance_caption() {
        assert_eq!(
            enhance_caption("a boy holding a sword.\n", 3),
            "On page 3, we see a boy holding a sword. The tension builds as our characters face new challenges."
        );
    }

    #[tokio::test]
    async fn test_empty_command_is_an_error() {
        let page = Page::new(1, "pages/page-1.png");
        let result = CommandCaptioner::new(vec![])
            .caption(&page, PagePosition::Opening)
            .await;
        assert!(result.is_err());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_command_caption_is_enhanced() {
        let page = Page::new(2, "pages/page-2.png");
        let captioner = CommandCaptioner::new(vec![
            "sh".to_string(),
            "-c".to_string(),
            "echo 'two ninjas on a rooftop'".to_string(),
        ]);
        let text = captioner
            .caption(&page, PagePosition::Interior)
            .await
            .unwrap();
        assert!(text.starts_with("On page 2, we see two ninjas on a rooftop."));
    }
}

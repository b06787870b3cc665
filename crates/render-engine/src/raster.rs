//! Document rasterization backends.

use std::cmp::Ordering;
use std::path::{Path, PathBuf};
use std::process::Stdio;

use async_trait::async_trait;
use mangarecap_common::error::{RecapError, RecapResult};
use mangarecap_page_model::page::Page;
use tokio::process::Command;

use crate::probe::command_exists;

const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "webp", "bmp"];

/// Trait for turning a source document into ordered page images.
#[async_trait]
pub trait Rasterizer: Send + Sync {
    /// Render `document` into page images under `pages_dir`.
    async fn rasterize(&self, document: &Path, pages_dir: &Path) -> RecapResult<Vec<Page>>;

    /// Check if this backend is available on the system.
    fn is_available(&self) -> bool;

    /// Backend name.
    fn name(&self) -> &str;
}

/// Rasterizes PDFs with poppler's `pdftoppm`.
#[derive(Debug, Clone)]
pub struct PdfRasterizer {
    dpi: u32,
}

impl PdfRasterizer {
    pub fn new(dpi: u32) -> Self {
        Self { dpi: dpi.max(36) }
    }
}

#[async_trait]
impl Rasterizer for PdfRasterizer {
    async fn rasterize(&self, document: &Path, pages_dir: &Path) -> RecapResult<Vec<Page>> {
        if !document.is_file() {
            return Err(RecapError::unreadable(format!(
                "{} is not a file",
                document.display()
            )));
        }
        tokio::fs::create_dir_all(pages_dir).await?;

        let prefix = pages_dir.join("page");
        tracing::debug!(document = %document.display(), dpi = self.dpi, "Running pdftoppm");
        let output = Command::new("pdftoppm")
            .arg("-png")
            .arg("-r")
            .arg(self.dpi.to_string())
            .arg(document)
            .arg(&prefix)
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| RecapError::unreadable(format!("Failed to start pdftoppm: {e}")))?;

        if !output.status.success() {
            return Err(RecapError::unreadable(format!(
                "pdftoppm failed (status {}): {}",
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }

        let mut numbered = Vec::new();
        let mut entries = tokio::fs::read_dir(pages_dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if let Some(number) = pdftoppm_page_number(&path) {
                numbered.push((number, path));
            }
        }
        numbered.sort_by_key(|(number, _)| *number);

        tracing::info!(pages = numbered.len(), "PDF rasterized");
        Ok(numbered
            .into_iter()
            .map(|(number, path)| Page::new(number, path))
            .collect())
    }

    fn is_available(&self) -> bool {
        command_exists("pdftoppm")
    }

    fn name(&self) -> &str {
        "pdftoppm"
    }
}

/// `page-07.png` -> 7. pdftoppm zero-pads to the width of the page count.
fn pdftoppm_page_number(path: &Path) -> Option<u32> {
    if path.extension().and_then(|e| e.to_str()) != Some("png") {
        return None;
    }
    let stem = path.file_stem()?.to_str()?;
    stem.strip_prefix("page-")?.parse().ok()
}

/// Uses a directory of already-rendered page images as the document.
///
/// Images are ordered by natural file-name order (`2.png` before `10.png`)
/// and numbered from 1. Files stay where they are.
#[derive(Debug, Clone, Default)]
pub struct ImageDirRasterizer;

impl ImageDirRasterizer {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Rasterizer for ImageDirRasterizer {
    async fn rasterize(&self, document: &Path, _pages_dir: &Path) -> RecapResult<Vec<Page>> {
        if !document.is_dir() {
            return Err(RecapError::unreadable(format!(
                "{} is not a directory of page images",
                document.display()
            )));
        }

        let mut images: Vec<PathBuf> = Vec::new();
        let mut entries = tokio::fs::read_dir(document)
            .await
            .map_err(|e| RecapError::unreadable(format!("{}: {e}", document.display())))?;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            let is_image = path
                .extension()
                .and_then(|e| e.to_str())
                .map(|e| IMAGE_EXTENSIONS.contains(&e.to_ascii_lowercase().as_str()))
                .unwrap_or(false);
            if is_image && path.is_file() {
                images.push(path);
            }
        }

        images.sort_by(|a, b| natural_cmp(&file_name(a), &file_name(b)));

        tracing::info!(pages = images.len(), dir = %document.display(), "Page images collected");
        Ok(images
            .into_iter()
            .enumerate()
            .map(|(i, path)| Page::new(i as u32 + 1, path))
            .collect())
    }

    fn is_available(&self) -> bool {
        true
    }

    fn name(&self) -> &str {
        "image-dir"
    }
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default()
}

#[derive(Debug, PartialEq, Eq, PartialOrd, Ord)]
enum NameChunk {
    Number(u64),
    Text(String),
}

fn name_chunks(name: &str) -> Vec<NameChunk> {
    let mut chunks = Vec::new();
    let mut digits = String::new();
    let mut text = String::new();

    for ch in name.chars() {
        if ch.is_ascii_digit() {
            if !text.is_empty() {
                chunks.push(NameChunk::Text(std::mem::take(&mut text).to_lowercase()));
            }
            digits.push(ch);
        } else {
            if !digits.is_empty() {
                chunks.push(NameChunk::Number(
                    std::mem::take(&mut digits).parse().unwrap_or(u64::MAX),
                ));
            }
            text.push(ch);
        }
    }
    if !digits.is_empty() {
        chunks.push(NameChunk::Number(digits.parse().unwrap_or(u64::MAX)));
    }
    if !text.is_empty() {
        chunks.push(NameChunk::Text(text.to_lowercase()));
    }
    chunks
}

/// Natural ordering of file names; ties broken by plain string order.
fn natural_cmp(a: &str, b: &str) -> Ordering {
    name_chunks(a).cmp(&name_chunks(b)).then_with(|| a.cmp(b))
}

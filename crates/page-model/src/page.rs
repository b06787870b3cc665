//! Rasterized pages and the ordered store that holds them.

use std::path::{Path, PathBuf};

use mangarecap_common::error::{RecapError, RecapResult};
use serde::{Deserialize, Serialize};

/// One document page rendered to a raster image.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page {
    /// 1-based page number in document order.
    pub page_number: u32,

    /// Rendered image on disk.
    pub image_path: PathBuf,
}

impl Page {
    pub fn new(page_number: u32, image_path: impl Into<PathBuf>) -> Self {
        Self {
            page_number,
            image_path: image_path.into(),
        }
    }

    pub fn image_path(&self) -> &Path {
        &self.image_path
    }
}

/// Ordered, non-empty, read-only set of pages for one run.
#[derive(Debug, Clone)]
pub struct PageStore {
    pages: Vec<Page>,
}

impl PageStore {
    /// Populate the store from rasterizer output.
    ///
    /// Fails with [`RecapError::EmptyDocument`] when `pages` is empty and with
    /// [`RecapError::UnreadableDocument`] when page numbers are zero,
    /// duplicated, or out of order.
    pub fn from_pages(pages: Vec<Page>) -> RecapResult<Self> {
        if pages.is_empty() {
            return Err(RecapError::EmptyDocument);
        }

        let mut previous = 0u32;
        for page in &pages {
            if page.page_number == 0 {
                return Err(RecapError::unreadable("page numbers must start at 1"));
            }
            if page.page_number <= previous {
                return Err(RecapError::unreadable(format!(
                    "page {} appears after page {previous}",
                    page.page_number
                )));
            }
            if page.page_number != previous + 1 {
                tracing::warn!(
                    expected = previous + 1,
                    found = page.page_number,
                    "Gap in page numbering"
                );
            }
            previous = page.page_number;
        }

        Ok(Self { pages })
    }

    /// Pages in document order.
    pub fn pages(&self) -> &[Page] {
        &self.pages
    }

    pub fn len(&self) -> usize {
        self.pages.len()
    }

    /// Always false; an empty store cannot be constructed.
    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pages(numbers: &[u32]) -> Vec<Page> {
        numbers
            .iter()
            .map(|n| Page::new(*n, format!("pages/page-{n}.png")))
            .collect()
    }

    #[test]
    fn test_empty_document_is_rejected() {
        let err = PageStore::from_pages(vec![]).unwrap_err();
        assert!(matches!(err, RecapError::EmptyDocument));
    }

    #[test]
    fn test_pages_keep_document_order() {
        let store = PageStore::from_pages(pages(&[1, 2, 3])).unwrap();
        assert_eq!(store.len(), 3);
        let numbers: Vec<u32> = store.pages().iter().map(|p| p.page_number).collect();
        assert_eq!(numbers, vec![1, 2, 3]);
    }

    #[test]
    fn test_duplicate_page_numbers_are_unreadable() {
        let err = PageStore::from_pages(pages(&[1, 2, 2])).unwrap_err();
        assert!(matches!(err, RecapError::UnreadableDocument { .. }));
    }

    #[test]
    fn test_page_zero_is_unreadable() {
        let err = PageStore::from_pages(pages(&[0, 1])).unwrap_err();
        assert!(matches!(err, RecapError::UnreadableDocument { .. }));
    }

    #[test]
    fn test_gaps_are_accepted() {
        let store = PageStore::from_pages(pages(&[1, 3])).unwrap();
        assert_eq!(store.len(), 2);
    }
}

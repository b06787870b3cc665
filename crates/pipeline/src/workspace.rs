//! Scratch directories, one per run.

use std::path::{Path, PathBuf};

use mangarecap_common::clock::RunId;
use mangarecap_common::error::RecapResult;

/// Isolated scratch area for one run: `<work_dir>/run-<id>/`.
#[derive(Debug, Clone)]
pub struct RunWorkspace {
    root: PathBuf,
}

impl RunWorkspace {
    /// Directory a run with `id` would use under `work_dir`.
    pub fn path_for(work_dir: &Path, id: &RunId) -> PathBuf {
        work_dir.join(format!("run-{id}"))
    }

    /// Create the scratch tree for `id`.
    pub async fn create(work_dir: &Path, id: &RunId) -> RecapResult<Self> {
        let workspace = Self {
            root: Self::path_for(work_dir, id),
        };
        tokio::fs::create_dir_all(workspace.pages_dir()).await?;
        tokio::fs::create_dir_all(workspace.audio_dir()).await?;
        tracing::debug!(root = %workspace.root.display(), "Run workspace created");
        Ok(workspace)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn pages_dir(&self) -> PathBuf {
        self.root.join("pages")
    }

    pub fn audio_dir(&self) -> PathBuf {
        self.root.join("audio")
    }

    pub fn subtitles_path(&self) -> PathBuf {
        self.root.join("subtitles.srt")
    }

    /// Narration clip path for a page.
    pub fn audio_path(&self, page_number: u32) -> PathBuf {
        self.audio_dir().join(format!("page-{page_number:04}.wav"))
    }

    /// Delete the scratch tree. Already-missing is fine.
    pub async fn remove(&self) -> RecapResult<()> {
        match tokio::fs::remove_dir_all(&self.root).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_create_and_remove() {
        let dir = tempfile::tempdir().unwrap();
        let id = RunId::from_string("20260101T000000000-abcd1234");
        let ws = RunWorkspace::create(dir.path(), &id).await.unwrap();

        assert!(ws.pages_dir().is_dir());
        assert!(ws.audio_dir().is_dir());
        assert_eq!(ws.root(), dir.path().join("run-20260101T000000000-abcd1234"));
        assert_eq!(
            ws.audio_path(7),
            ws.root().join("audio").join("page-0007.wav")
        );

        ws.remove().await.unwrap();
        assert!(!ws.root().exists());
        ws.remove().await.unwrap();
    }

    #[tokio::test]
    async fn test_runs_do_not_share_scratch() {
        let dir = tempfile::tempdir().unwrap();
        let a = RunWorkspace::create(dir.path(), &RunId::generate())
            .await
            .unwrap();
        let b = RunWorkspace::create(dir.path(), &RunId::generate())
            .await
            .unwrap();
        assert_ne!(a.root(), b.root());
    }
}

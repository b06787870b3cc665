//! Render a recap video from a document.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use mangarecap_common::clock::RunId;
use mangarecap_common::config::AppConfig;
use mangarecap_pipeline::{
    ChannelSink, Collaborators, Coordinator, DocumentKind, ProgressRecord, RunState,
};
use tokio::sync::mpsc;

pub async fn run(
    mut config: AppConfig,
    document: PathBuf,
    images: bool,
    output_dir: Option<PathBuf>,
    work_dir: Option<PathBuf>,
    consume_input: bool,
) -> anyhow::Result<()> {
    if let Some(dir) = output_dir {
        config.outputs_dir = dir;
    }
    if let Some(dir) = work_dir {
        config.work_dir = dir;
    }
    config.validate()?;

    let kind = if images {
        DocumentKind::ImageDir
    } else {
        DocumentKind::Pdf
    };

    let id = RunId::generate();
    let staging = (!consume_input).then(|| config.work_dir.join("uploads").join(id.as_str()));
    let input = match &staging {
        Some(dir) => {
            let copy = copy_input(&document, dir).await?;
            tracing::debug!(copy = %copy.display(), "Working on a copy of the input");
            copy
        }
        None => document,
    };

    let collaborators = Collaborators::from_config(&config, kind);
    let coordinator = Coordinator::new(config, collaborators);

    let cancel = Arc::new(AtomicBool::new(false));
    let (tx, mut rx) = mpsc::unbounded_channel::<ProgressRecord>();
    let sink = ChannelSink::new(tx).with_cancel_flag(cancel.clone());

    let printer = tokio::spawn(async move {
        let mut stdout = std::io::stdout();
        while let Some(record) = rx.recv().await {
            match record.to_event_line() {
                Ok(line) => {
                    let _ = stdout.write_all(line.as_bytes());
                    let _ = stdout.flush();
                }
                Err(e) => tracing::warn!(error = %e, "Failed to encode progress record"),
            }
        }
    });

    let interrupt_flag = cancel.clone();
    let interrupt = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            eprintln!("Cancelling after the current stage (Ctrl-C again to abort)...");
            interrupt_flag.store(true, Ordering::SeqCst);
            if tokio::signal::ctrl_c().await.is_ok() {
                std::process::exit(130);
            }
        }
    });

    let run = coordinator.run_with_id(id, &input, &sink, &cancel).await;

    interrupt.abort();
    drop(sink);
    let _ = printer.await;

    if let Some(dir) = &staging {
        remove_staging(dir).await;
    }

    match run.state() {
        RunState::Complete => {
            if let Some(path) = run.video_path() {
                eprintln!("Video written to {}", path.display());
            }
            Ok(())
        }
        _ => {
            let message = run
                .failure()
                .map(|f| format!("{:?}: {}", f.kind, f.message))
                .unwrap_or_else(|| format!("run ended in state {:?}", run.state()));
            Err(anyhow::anyhow!(message))
        }
    }
}

/// Copy a file, or a flat directory of files, into `dest_dir`.
async fn copy_input(document: &Path, dest_dir: &Path) -> anyhow::Result<PathBuf> {
    let name = document
        .file_name()
        .ok_or_else(|| anyhow::anyhow!("{} has no file name", document.display()))?;
    let target = dest_dir.join(name);

    if document.is_dir() {
        tokio::fs::create_dir_all(&target).await?;
        let mut entries = tokio::fs::read_dir(document).await?;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.is_file() {
                tokio::fs::copy(&path, target.join(entry.file_name())).await?;
            }
        }
    } else {
        tokio::fs::create_dir_all(dest_dir).await?;
        tokio::fs::copy(document, &target)
            .await
            .map_err(|e| anyhow::anyhow!("Failed to copy {}: {e}", document.display()))?;
    }
    Ok(target)
}

/// Remove a run's staged copy, whatever state the run ended in.
async fn remove_staging(dir: &Path) {
    match tokio::fs::remove_dir_all(dir).await {
        Ok(()) => {}
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => tracing::warn!(dir = %dir.display(), error = %e, "Failed to remove staged input"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_copy_input_file() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("chapter.pdf");
        std::fs::write(&source, b"%PDF").unwrap();

        let copy = copy_input(&source, &dir.path().join("uploads"))
            .await
            .unwrap();
        assert_eq!(copy, dir.path().join("uploads").join("chapter.pdf"));
        assert_eq!(std::fs::read(copy).unwrap(), b"%PDF");
        assert!(source.exists());
    }

    #[tokio::test]
    async fn test_copy_input_image_dir() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("chapter-1");
        std::fs::create_dir_all(&source).unwrap();
        std::fs::write(source.join("01.png"), b"a").unwrap();
        std::fs::write(source.join("02.png"), b"b").unwrap();

        let copy = copy_input(&source, &dir.path().join("uploads"))
            .await
            .unwrap();
        assert!(copy.join("01.png").is_file());
        assert!(copy.join("02.png").is_file());
    }

    #[tokio::test]
    async fn test_remove_staging_clears_run_dir() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("chapter.pdf");
        std::fs::write(&source, b"%PDF").unwrap();
        let staging = dir.path().join("uploads").join("run-1");

        let copy = copy_input(&source, &staging).await.unwrap();
        // A completed run consumes the copy and leaves the directory behind.
        std::fs::remove_file(&copy).unwrap();

        remove_staging(&staging).await;
        assert!(!staging.exists());
        assert!(dir.path().join("uploads").is_dir());
        assert!(source.exists());

        // Already gone is fine.
        remove_staging(&staging).await;
    }
}

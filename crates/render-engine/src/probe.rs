//! Media tool discovery and probing.

use std::path::Path;
use std::process::{Command, Stdio};

use anyhow::anyhow;
use mangarecap_common::error::RecapResult;

/// Whether `binary` resolves on `PATH`.
pub fn command_exists(binary: &str) -> bool {
    Command::new("sh")
        .arg("-c")
        .arg(format!("command -v {binary} >/dev/null 2>&1"))
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .map(|status| status.success())
        .unwrap_or(false)
}

/// Playback duration of a media file in seconds, as reported by ffprobe.
pub async fn probe_duration(path: &Path) -> RecapResult<f64> {
    let output = tokio::process::Command::new("ffprobe")
        .args([
            "-v",
            "error",
            "-show_entries",
            "format=duration",
            "-of",
            "default=noprint_wrappers=1:nokey=1",
        ])
        .arg(path)
        .stdin(Stdio::null())
        .kill_on_drop(true)
        .output()
        .await
        .map_err(|e| anyhow!("failed to start ffprobe: {e}"))?;

    if !output.status.success() {
        return Err(anyhow!(
            "ffprobe failed on {}: {}",
            path.display(),
            String::from_utf8_lossy(&output.stderr).trim()
        )
        .into());
    }

    let raw = String::from_utf8_lossy(&output.stdout);
    parse_probe_duration(&raw)
        .ok_or_else(|| anyhow!("ffprobe reported no duration for {}", path.display()).into())
}

fn parse_probe_duration(raw: &str) -> Option<f64> {
    let value = raw.lines().next()?.trim().parse::<f64>().ok()?;
    if value.is_finite() && value > 0.0 {
        Some(value)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_probe_duration() {
        assert_eq!(parse_probe_duration("3.120000\n"), Some(3.12));
        assert_eq!(parse_probe_duration("N/A\n"), None);
        assert_eq!(parse_probe_duration("0.000000\n"), None);
        assert_eq!(parse_probe_duration(""), None);
    }

    #[cfg(unix)]
    #[test]
    fn test_command_exists() {
        assert!(command_exists("sh"));
        assert!(!command_exists("mangarecap-definitely-missing-binary"));
    }
}

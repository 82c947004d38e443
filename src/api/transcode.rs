//! FFmpeg transcoding of uploaded samples to Ogg/Opus.

use anyhow::{bail, Context, Result};
use tokio::process::Command;
use tracing::debug;

pub fn ffmpeg_available() -> bool {
    which::which("ffmpeg").is_ok()
}

/// Transcodes `input` to Ogg/Opus and returns the encoded bytes.
pub async fn transcode_to_opus(input: &[u8]) -> Result<Vec<u8>> {
    let dir = tempfile::tempdir().context("Failed to create transcode directory")?;
    let source = dir.path().join("upload.bin");
    let output = dir.path().join("sample.ogg");

    tokio::fs::write(&source, input)
        .await
        .context("Failed to write upload for transcoding")?;

    // -b:a 48k with VBR is plenty for speech
    let result = Command::new("ffmpeg")
        .arg("-i")
        .arg(&source)
        .args(["-vn", "-codec:a", "libopus", "-b:a", "48k", "-vbr", "on", "-y"])
        .arg(&output)
        .output()
        .await
        .context("Failed to run FFmpeg")?;

    if !result.status.success() {
        let stderr = String::from_utf8_lossy(&result.stderr);
        bail!("FFmpeg transcoding failed: {}", stderr);
    }

    let bytes = tokio::fs::read(&output)
        .await
        .context("FFmpeg did not produce output file")?;
    debug!("Transcoded {} bytes to {} bytes of Opus", input.len(), bytes.len());
    Ok(bytes)
}

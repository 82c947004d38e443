//! Playback of the server's copy of a recorded sample.

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use std::path::PathBuf;
use tokio::process::Command;
use tracing::{debug, info, warn};

use crate::token::UploadToken;
use crate::upload::{playback_path, resolve};

/// Candidate sources for one clip plus a format hint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaybackSource {
    pub urls: Vec<String>,
    pub format: String,
}

impl PlaybackSource {
    pub fn new(urls: Vec<String>, format: impl Into<String>) -> Self {
        Self {
            urls,
            format: format.into(),
        }
    }

    /// The transcoded Opus copy of the sample uploaded under `token`.
    pub fn for_token(base_url: &str, token: &UploadToken) -> Self {
        Self::new(vec![resolve(base_url, &playback_path(token))], "opus")
    }
}

#[async_trait]
pub trait Player: Send + Sync {
    async fn play(&self, source: &PlaybackSource) -> Result<()>;
}

/// External players tried in order, with the arguments that make them exit
/// after a single pass without opening a window.
const PLAYERS: &[(&str, &[&str])] = &[
    ("mpv", &["--no-video", "--really-quiet"]),
    ("ffplay", &["-nodisp", "-autoexit", "-loglevel", "error"]),
];

/// Downloads the first reachable source and hands it to an installed
/// command-line player. Without one, the clip is kept under `samples_dir`.
pub struct HttpPlayer {
    client: reqwest::Client,
    samples_dir: PathBuf,
}

impl HttpPlayer {
    pub fn new(samples_dir: PathBuf) -> Self {
        Self {
            client: reqwest::Client::new(),
            samples_dir,
        }
    }

    async fn download(&self, source: &PlaybackSource) -> Result<Vec<u8>> {
        for url in &source.urls {
            debug!("Fetching playback source {}", url);
            match self.client.get(url).send().await {
                Ok(response) if response.status().is_success() => {
                    let bytes = response
                        .bytes()
                        .await
                        .context("Failed to read playback body")?;
                    return Ok(bytes.to_vec());
                }
                Ok(response) => warn!("Playback source {} returned {}", url, response.status()),
                Err(e) => warn!("Playback source {} unreachable: {}", url, e),
            }
        }
        bail!("None of the playback sources could be fetched")
    }
}

fn find_player() -> Option<(PathBuf, &'static [&'static str])> {
    PLAYERS
        .iter()
        .find_map(|(name, args)| which::which(name).ok().map(|path| (path, *args)))
}

fn extension_for(format: &str) -> &str {
    match format {
        "opus" | "ogg" => "ogg",
        "wav" => "wav",
        _ => "bin",
    }
}

#[async_trait]
impl Player for HttpPlayer {
    async fn play(&self, source: &PlaybackSource) -> Result<()> {
        let bytes = self.download(source).await?;
        let suffix = format!(".{}", extension_for(&source.format));

        std::fs::create_dir_all(&self.samples_dir)
            .context("Failed to create samples directory")?;
        let mut clip = tempfile::Builder::new()
            .prefix("mic_check-")
            .suffix(&suffix)
            .tempfile_in(&self.samples_dir)
            .context("Failed to create playback file")?;
        std::io::Write::write_all(&mut clip, &bytes).context("Failed to write playback file")?;

        let Some((player, args)) = find_player() else {
            let (_, path) = clip.keep().context("Failed to keep playback file")?;
            warn!("No audio player found (tried mpv, ffplay)");
            info!("Recorded sample saved to {:?}", path);
            return Ok(());
        };

        info!("Playing back sample with {:?}", player);
        let status = Command::new(&player)
            .args(args)
            .arg(clip.path())
            .status()
            .await
            .with_context(|| format!("Failed to run {:?}", player))?;

        if !status.success() {
            bail!("Player exited with {}", status);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_source_for_token() {
        let token = UploadToken::parse("4242").unwrap();
        let source = PlaybackSource::for_token("http://localhost:3838", &token);
        assert_eq!(
            source.urls,
            vec!["http://localhost:3838/api/mic_check.ogg?4242".to_string()]
        );
        assert_eq!(source.format, "opus");
    }

    #[test]
    fn test_extension_for_format() {
        assert_eq!(extension_for("opus"), "ogg");
        assert_eq!(extension_for("wav"), "wav");
        assert_eq!(extension_for("webm"), "bin");
    }

    #[tokio::test]
    async fn test_unreachable_sources_fail() {
        let dir = tempfile::tempdir().unwrap();
        let player = HttpPlayer::new(dir.path().to_path_buf());
        let source = PlaybackSource::new(vec!["http://127.0.0.1:9/clip.ogg".into()], "opus");
        assert!(player.play(&source).await.is_err());
    }
}

//! Upload client for recorded samples.
//!
//! `POST /api/mic_check?<token>` with the raw payload as
//! `application/octet-stream`. Any 2xx is success and the body is ignored;
//! everything else counts as a connectivity failure.

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use tracing::{debug, error, info};

use crate::token::UploadToken;

pub const UPLOAD_PATH: &str = "/api/mic_check";
pub const PLAYBACK_PATH: &str = "/api/mic_check.ogg";

/// `/api/mic_check?<token>`
pub fn upload_path(token: &UploadToken) -> String {
    format!("{UPLOAD_PATH}?{token}")
}

/// `/api/mic_check.ogg?<token>`
pub fn playback_path(token: &UploadToken) -> String {
    format!("{PLAYBACK_PATH}?{token}")
}

pub fn resolve(base_url: &str, path: &str) -> String {
    format!("{}{}", base_url.trim_end_matches('/'), path)
}

#[async_trait]
pub trait UploadClient: Send + Sync {
    async fn upload(&self, token: &UploadToken, payload: Vec<u8>) -> Result<()>;
}

pub struct HttpUploadClient {
    client: reqwest::Client,
    base_url: String,
}

impl HttpUploadClient {
    pub fn new(base_url: &str) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

#[async_trait]
impl UploadClient for HttpUploadClient {
    async fn upload(&self, token: &UploadToken, payload: Vec<u8>) -> Result<()> {
        let url = resolve(&self.base_url, &upload_path(token));
        debug!("Uploading {} bytes to {}", payload.len(), url);

        let response = self
            .client
            .post(&url)
            .header(CONTENT_TYPE, "application/octet-stream")
            .body(payload)
            .send()
            .await
            .context("Failed to send recorded audio")?;

        let status = response.status();
        if !status.is_success() {
            error!("Mic check upload rejected with status {}", status);
            bail!("Upload failed with status {}", status);
        }

        info!("Recorded audio saved successfully");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_paths_carry_token_as_query() {
        let token = UploadToken::parse("123456").unwrap();
        assert_eq!(upload_path(&token), "/api/mic_check?123456");
        assert_eq!(playback_path(&token), "/api/mic_check.ogg?123456");
    }

    #[test]
    fn test_resolve_trims_trailing_slash() {
        assert_eq!(
            resolve("http://localhost:3838/", "/api/mic_check?1"),
            "http://localhost:3838/api/mic_check?1"
        );
    }

    #[tokio::test]
    async fn test_unreachable_server_is_an_error() {
        // Port 9 (discard) is not expected to accept HTTP on loopback.
        let client = HttpUploadClient::new("http://127.0.0.1:9");
        let token = UploadToken::parse("1").unwrap();
        assert!(client.upload(&token, vec![1, 2, 3]).await.is_err());
    }
}

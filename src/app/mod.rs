use crate::api::ApiServer;
use crate::banner::BannerHandle;
use crate::capture::{CpalBackend, RecorderOptions};
use crate::config::Config;
use crate::flow::MicCheck;
use crate::session::StreamRegistry;
use crate::token::RandomTokenSource;
use crate::upload::HttpUploadClient;
use anyhow::Result;
use std::sync::Arc;
use tracing::info;

/// Wires the flow to the default input device and the HTTP upload endpoint.
///
/// The returned `MicCheck` owns the process's only stream registry, so it
/// should be built once and reused for every attempt.
pub fn build_mic_check(config: &Config, base_url: &str, banner: BannerHandle) -> Result<MicCheck> {
    let options = RecorderOptions::from_config(&config.recorder)?;
    let presenter = Arc::new(banner);

    let registry = Arc::new(StreamRegistry::new(
        Arc::new(CpalBackend),
        options,
        presenter.clone(),
        config.messages.clone(),
    ));

    info!("Mic check uploads go to {}", base_url);

    Ok(MicCheck::new(
        registry,
        Arc::new(HttpUploadClient::new(base_url)),
        Arc::new(RandomTokenSource),
        presenter,
        config.messages.clone(),
    ))
}

pub async fn run_server(config: &Config) -> Result<()> {
    info!("Starting mic check server");
    ApiServer::new(&config.server).start().await
}

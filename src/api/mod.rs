//! Development server for the mic check endpoints.
//!
//! Stores uploads in memory and serves them back, transcoded to Ogg/Opus
//! when ffmpeg is installed. Meant for local testing of the client flow.

pub mod error;
pub mod routes;
pub mod store;
pub mod transcode;

use crate::config::ServerConfig;
use anyhow::Result;
use axum::{extract::DefaultBodyLimit, response::Json, routing::get, Router};
use serde_json::{json, Value};
use tower::ServiceBuilder;
use tracing::{info, warn};

pub use routes::mic_check::MicCheckState;
pub use store::SampleStore;

pub struct ApiServer {
    port: u16,
    max_upload_bytes: usize,
    state: MicCheckState,
}

impl ApiServer {
    pub fn new(config: &ServerConfig) -> Self {
        Self {
            port: config.bind_port,
            max_upload_bytes: config.max_upload_bytes,
            state: MicCheckState {
                store: SampleStore::default(),
                transcode: config.transcode,
            },
        }
    }

    pub fn router(&self) -> Router {
        build_router(self.state.clone(), self.max_upload_bytes)
    }

    pub async fn start(self) -> Result<()> {
        if self.state.transcode && !transcode::ffmpeg_available() {
            warn!("ffmpeg not found, samples will be served untranscoded");
        }

        let app = self.router();
        let listener = tokio::net::TcpListener::bind(&format!("127.0.0.1:{}", self.port)).await?;

        info!("API server listening on http://127.0.0.1:{}", self.port);
        info!("Endpoints:");
        info!("  GET  /                        - Service info");
        info!("  POST /api/mic_check?<token>     - Upload a recorded sample");
        info!("  GET  /api/mic_check.ogg?<token> - Play back a sample");

        axum::serve(listener, app).await?;

        Ok(())
    }
}

pub fn build_router(state: MicCheckState, max_upload_bytes: usize) -> Router {
    Router::new()
        .route("/", get(status))
        .merge(routes::mic_check::router(state))
        .layer(
            ServiceBuilder::new().layer(DefaultBodyLimit::max(max_upload_bytes)),
        )
}

async fn status() -> Json<Value> {
    Json(json!({
        "service": "miccheck",
        "version": env!("CARGO_PKG_VERSION"),
        "status": "running"
    }))
}

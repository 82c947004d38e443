//! Mic check endpoints.
//!
//! - `POST /api/mic_check?<token>` stores a raw recorded sample
//! - `GET /api/mic_check.ogg?<token>` serves the (transcoded) copy

use axum::{
    body::Bytes,
    extract::{RawQuery, State},
    http::header,
    response::{IntoResponse, Json},
    routing::{get, post},
    Router,
};
use serde_json::{json, Value};
use tracing::{info, warn};

use crate::api::error::{ApiError, ApiResult};
use crate::api::store::SampleStore;
use crate::api::transcode::{ffmpeg_available, transcode_to_opus};
use crate::token::UploadToken;
use crate::upload::{PLAYBACK_PATH, UPLOAD_PATH};

#[derive(Clone)]
pub struct MicCheckState {
    pub store: SampleStore,
    pub transcode: bool,
}

pub fn router(state: MicCheckState) -> Router {
    Router::new()
        .route(UPLOAD_PATH, post(upload_sample))
        .route(PLAYBACK_PATH, get(playback_sample))
        .with_state(state)
}

fn parse_token(query: Option<String>) -> ApiResult<UploadToken> {
    query
        .as_deref()
        .and_then(UploadToken::parse)
        .ok_or_else(|| ApiError::invalid_token(query.as_deref()))
}

async fn upload_sample(
    State(state): State<MicCheckState>,
    RawQuery(query): RawQuery,
    body: Bytes,
) -> ApiResult<Json<Value>> {
    let token = parse_token(query)?;
    if body.is_empty() {
        return Err(ApiError::empty_upload());
    }

    info!("Received mic check sample {} ({} bytes)", token, body.len());

    let (bytes, content_type) = if state.transcode && ffmpeg_available() {
        match transcode_to_opus(&body).await {
            Ok(opus) => (opus, "audio/ogg"),
            Err(e) => {
                warn!("Serving sample {} untranscoded: {:#}", token, e);
                (body.to_vec(), "application/octet-stream")
            }
        }
    } else {
        (body.to_vec(), "application/octet-stream")
    };

    let size = bytes.len();
    state.store.insert(token.clone(), bytes, content_type).await;

    Ok(Json(json!({
        "token": token,
        "bytes": size,
        "content_type": content_type,
    })))
}

async fn playback_sample(
    State(state): State<MicCheckState>,
    RawQuery(query): RawQuery,
) -> ApiResult<impl IntoResponse> {
    let token = parse_token(query)?;
    let sample = state
        .store
        .get(&token)
        .await
        .ok_or_else(|| ApiError::unknown_sample(token.as_str()))?;

    Ok(([(header::CONTENT_TYPE, sample.content_type)], sample.bytes))
}

//! JSON error bodies for the dev server.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    /// The query string is missing or is not a decimal token.
    pub fn invalid_token(raw: Option<&str>) -> Self {
        Self::new(
            StatusCode::BAD_REQUEST,
            format!("Invalid mic check token: {:?}", raw.unwrap_or("")),
        )
    }

    pub fn unknown_sample(token: &str) -> Self {
        Self::new(
            StatusCode::NOT_FOUND,
            format!("No mic check sample stored for token {token}"),
        )
    }

    pub fn empty_upload() -> Self {
        Self::new(StatusCode::BAD_REQUEST, "Uploaded sample is empty")
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Json(json!({
            "error": true,
            "message": self.message,
        }));
        (self.status, body).into_response()
    }
}

pub type ApiResult<T> = Result<T, ApiError>;

//! Error types for the chart series service.

use std::path::PathBuf;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use thiserror::Error;
use tracing::warn;

use crate::models::ApiResponse;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("reference time {0} is out of range")]
    InvalidNow(i64),

    #[error("{requested} windows requested, at most {max} allowed")]
    TooManyWindows { requested: usize, max: usize },
}

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::InvalidNow(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::TooManyWindows { .. } => StatusCode::BAD_REQUEST,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let code = self.status_code();
        warn!(status = %code, "request rejected: {}", self);

        let body = ApiResponse {
            status: "error".to_string(),
            message: self.to_string(),
            data: None,
        };
        (code, Json(body)).into_response()
    }
}

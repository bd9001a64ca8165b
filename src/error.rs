use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;
use tracing::error;

/// Errors surfaced by the fetch/parse pipeline and the HTTP layer
#[derive(Debug, Error)]
pub enum PlaylistError {
    #[error("Failed to fetch from origin: {0}")]
    OriginFetch(#[from] reqwest::Error),

    #[error("Origin responded with unexpected status {0}")]
    OriginStatus(reqwest::StatusCode),

    #[error("Failed to decode origin response: {0}")]
    Decode(String),

    #[error("Failed to parse origin document: {0}")]
    Parse(String),

    #[error("Origin reported no changes but no cached document is available")]
    CacheInconsistent,

    #[error("Failed to serialize response: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl PlaylistError {
    /// HTTP status used when this error reaches a client
    pub fn status_code(&self) -> StatusCode {
        match self {
            PlaylistError::OriginFetch(_)
            | PlaylistError::OriginStatus(_)
            | PlaylistError::CacheInconsistent => StatusCode::BAD_GATEWAY,
            PlaylistError::Decode(_)
            | PlaylistError::Parse(_)
            | PlaylistError::Serialization(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for PlaylistError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        error!("Request failed ({}): {}", status, self);

        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}

pub type Result<T> = std::result::Result<T, PlaylistError>;

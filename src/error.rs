use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;

/// Failures from the playlist parser/fetcher core.
///
/// `Parse` means content was retrieved but is not a usable playlist;
/// `Fetch` means the network/relay layer never produced content. Both are
/// recoverable: callers surface the message and leave prior state untouched.
#[derive(Debug, Error)]
pub enum PlaylistError {
    #[error("{0}")]
    Parse(String),
    #[error("{0}")]
    Fetch(String),
}

/// Route-level error mapped to a JSON `{ "error": ... }` body.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),
    #[error("{0}")]
    Unauthorized(String),
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    BadGateway(String),
    #[error("{0}")]
    Internal(String),
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::BadGateway(_) => StatusCode::BAD_GATEWAY,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status == StatusCode::INTERNAL_SERVER_ERROR {
            tracing::error!("Internal error: {}", self);
        }
        (status, Json(serde_json::json!({ "error": self.to_string() }))).into_response()
    }
}

impl From<PlaylistError> for ApiError {
    fn from(err: PlaylistError) -> Self {
        match err {
            // Invalid playlist content is the caller's problem (bad source)
            PlaylistError::Parse(msg) => ApiError::BadRequest(msg),
            // Relay/network failures are an upstream problem
            PlaylistError::Fetch(msg) => ApiError::BadGateway(msg),
        }
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        ApiError::Internal(err.to_string())
    }
}

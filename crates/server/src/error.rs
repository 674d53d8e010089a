use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use thiserror::Error;

use galleria_gallery::{GalleryError, UploadError};

/// Errors that can occur when running the Galleria server.
#[derive(Debug, Error)]
pub enum ServerError {
    /// A configuration error.
    #[error("configuration error: {0}")]
    Config(String),

    /// An I/O error (e.g. binding the listener).
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// The request was malformed.
    #[error("bad request: {0}")]
    BadRequest(String),

    /// The requested resource does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// The multipart body could not be read.
    #[error("multipart error: {0}")]
    Multipart(#[from] axum::extract::multipart::MultipartError),

    /// An upload was not accepted.
    #[error("upload failed: {0}")]
    Upload(#[from] UploadError),

    /// A gallery query failed. `message` is the client-facing summary.
    #[error("{message}: {source}")]
    Query {
        message: &'static str,
        #[source]
        source: GalleryError,
    },

    /// A gallery error outside a request (startup, subcommands).
    #[error("gallery error: {0}")]
    Gallery(#[from] GalleryError),
}

impl ServerError {
    /// Wrap a gallery error with the message returned to the client.
    pub fn query(message: &'static str) -> impl FnOnce(GalleryError) -> Self {
        move |source| Self::Query { message, source }
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let (status, body) = match &self {
            Self::BadRequest(msg) => (StatusCode::BAD_REQUEST, json!({ "message": msg })),
            Self::NotFound(msg) => (StatusCode::NOT_FOUND, json!({ "message": msg })),
            Self::Multipart(e) => (e.status(), json!({ "message": e.body_text() })),
            Self::Upload(UploadError::NoFile) => (
                StatusCode::BAD_REQUEST,
                json!({ "message": "No file uploaded" }),
            ),
            Self::Upload(e) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                json!({
                    "message": "Upload failed",
                    "kind": e.kind(),
                    "retryable": e.is_retryable(),
                }),
            ),
            Self::Query { message, .. } => (
                StatusCode::INTERNAL_SERVER_ERROR,
                json!({ "message": message }),
            ),
            Self::Config(_) | Self::Io(_) | Self::Gallery(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                json!({ "message": self.to_string() }),
            ),
        };

        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        } else {
            tracing::debug!(error = %self, "request rejected");
        }

        (status, Json(body)).into_response()
    }
}

use axum::extract::{Path, State};
use axum::http::header;
use axum::response::{IntoResponse, Response};

use galleria_core::StoredName;
use galleria_gallery::GalleryError;

use super::AppState;
use crate::error::ServerError;

/// `GET /uploads/{name}` -- stored bytes, for backends without a directory
/// to serve from.
pub async fn serve_blob(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Response, ServerError> {
    let not_found = || ServerError::NotFound("File not found".into());
    let name = StoredName::parse(name).map_err(|_| not_found())?;
    let bytes = state
        .blobs
        .get(&name)
        .await
        .map_err(GalleryError::from)?
        .ok_or_else(not_found)?;

    Ok(([(header::CONTENT_TYPE, content_type_for(&name))], bytes).into_response())
}

fn content_type_for(name: &StoredName) -> &'static str {
    let ext = name.extension().map(str::to_ascii_lowercase);
    match ext.as_deref() {
        Some("png") => "image/png",
        Some("jpg" | "jpeg") => "image/jpeg",
        Some("gif") => "image/gif",
        Some("webp") => "image/webp",
        Some("svg") => "image/svg+xml",
        Some("bmp") => "image/bmp",
        Some("ico") => "image/x-icon",
        Some("avif") => "image/avif",
        Some("tif" | "tiff") => "image/tiff",
        _ => "application/octet-stream",
    }
}

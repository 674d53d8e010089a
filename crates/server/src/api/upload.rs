use axum::Json;
use axum::extract::{Multipart, State};
use serde::Serialize;
use tracing::debug;

use galleria_core::ImageRecord;
use galleria_gallery::{IncomingFile, UploadError};

use super::AppState;
use crate::error::ServerError;

#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub message: &'static str,
    pub image: ImageRecord,
}

/// `POST /upload` -- accept one multipart file and store it.
///
/// Parts other than the configured file field are ignored. A request without
/// that field is answered with 400.
pub async fn upload(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>, ServerError> {
    let mut file = None;
    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some(state.upload_field.as_ref()) {
            debug!(field = ?field.name(), "ignoring multipart field");
            continue;
        }
        let original_name = field.file_name().unwrap_or_default().to_owned();
        let mime_type = field
            .content_type()
            .unwrap_or("application/octet-stream")
            .to_owned();
        let data = field.bytes().await?;
        file = Some(IncomingFile::new(data, original_name, mime_type));
        break;
    }

    let file = file.ok_or(UploadError::NoFile)?;
    let image = state.gallery.upload(file).await?;
    Ok(Json(UploadResponse {
        message: "File uploaded successfully",
        image,
    }))
}

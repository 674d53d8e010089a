use axum::Json;
use axum::extract::{Path, State};
use serde::{Deserialize, Serialize};

use galleria_core::{ImageId, ImageRecord};
use galleria_gallery::DeleteOutcome;

use super::AppState;
use crate::error::ServerError;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateImageRequest {
    pub new_original_name: String,
}

#[derive(Debug, Serialize)]
pub struct UpdateImageResponse {
    pub message: &'static str,
    /// Whether a record matched the id.
    pub updated: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteImageResponse {
    pub message: &'static str,
    /// Whether a record matched the id.
    pub deleted: bool,
    pub blob_removed: bool,
}

fn parse_id(raw: &str) -> Result<ImageId, ServerError> {
    raw.parse()
        .map_err(|_| ServerError::BadRequest(format!("Invalid image id: {raw}")))
}

/// `GET /images` -- every record, oldest first.
pub async fn list_images(
    State(state): State<AppState>,
) -> Result<Json<Vec<ImageRecord>>, ServerError> {
    let images = state
        .gallery
        .list()
        .await
        .map_err(ServerError::query("Error fetching images"))?;
    Ok(Json(images))
}

/// `GET /images/{id}`
pub async fn get_image(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ImageRecord>, ServerError> {
    let id = parse_id(&id)?;
    state
        .gallery
        .get(id)
        .await
        .map_err(ServerError::query("Error fetching image"))?
        .map(Json)
        .ok_or_else(|| ServerError::NotFound("Image not found".into()))
}

/// `PUT /images/{id}` -- replace the display name.
///
/// Succeeds whether or not a record matched; `updated` tells which.
pub async fn update_image(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(body): Json<UpdateImageRequest>,
) -> Result<Json<UpdateImageResponse>, ServerError> {
    let id = parse_id(&id)?;
    let updated = state
        .gallery
        .rename(id, &body.new_original_name)
        .await
        .map_err(ServerError::query("Error updating image record"))?;
    Ok(Json(UpdateImageResponse {
        message: "Image record updated successfully",
        updated,
    }))
}

/// `DELETE /images/{id}`
///
/// Succeeds whether or not a record matched; `deleted` tells which.
pub async fn delete_image(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<DeleteImageResponse>, ServerError> {
    let id = parse_id(&id)?;
    let outcome = state
        .gallery
        .delete(id)
        .await
        .map_err(ServerError::query("Error deleting image record"))?;
    let (deleted, blob_removed) = match outcome {
        DeleteOutcome::Deleted { blob_removed, .. } => (true, blob_removed),
        DeleteOutcome::NotFound => (false, false),
    };
    Ok(Json(DeleteImageResponse {
        message: "Image record deleted successfully",
        deleted,
        blob_removed,
    }))
}

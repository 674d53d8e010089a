pub mod files;
pub mod health;
pub mod images;
pub mod upload;
pub mod ws;

use std::path::PathBuf;
use std::sync::Arc;

use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use galleria_blob::BlobStore;
use galleria_gallery::Gallery;

/// Shared application state passed to all handlers.
#[derive(Clone)]
pub struct AppState {
    pub gallery: Arc<Gallery>,
    /// Blob store used to serve `/uploads` when there is no directory to
    /// serve from.
    pub blobs: Arc<dyn BlobStore>,
    /// Directory holding blobs, when the filesystem backend is in use.
    pub uploads_dir: Option<PathBuf>,
    /// Multipart field carrying the uploaded file.
    pub upload_field: Arc<str>,
    /// Request body limit for uploads, in bytes.
    pub max_upload_bytes: usize,
}

/// Build the Axum router with all routes and middleware.
pub fn router(state: AppState) -> Router {
    let mut router = Router::new()
        // Viewer sessions. The browser client connects at the root.
        .route("/", get(ws::viewer))
        .route("/ws", get(ws::viewer))
        .route("/health", get(health::health))
        .route(
            "/upload",
            post(upload::upload).layer(DefaultBodyLimit::max(state.max_upload_bytes)),
        )
        .route("/images", get(images::list_images))
        .route(
            "/images/{id}",
            get(images::get_image)
                .put(images::update_image)
                .delete(images::delete_image),
        );

    router = match state.uploads_dir.clone() {
        Some(dir) => router.nest_service("/uploads", ServeDir::new(dir)),
        None => router.route("/uploads/{name}", get(files::serve_blob)),
    };

    router
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

use axum::{
    extract::DefaultBodyLimit,
    middleware::from_fn_with_state,
    routing::{get, post},
    Router,
};
use std::sync::Arc;

use crate::core::middleware::identity_middleware;
use crate::features::auth::JwtValidator;
use crate::features::files::handlers::{
    download_file, get_file, get_file_content, list_public_files, upload_file,
};
use crate::features::files::services::FileService;

/// Headroom for multipart boundaries and the small text fields
const MULTIPART_OVERHEAD: usize = 1024 * 1024;

/// Create routes for the files feature.
///
/// Only upload reads the caller's identity, so only upload validates bearer
/// tokens; lookups and downloads ignore the `Authorization` header.
pub fn routes(file_service: Arc<FileService>, validator: Option<Arc<JwtValidator>>) -> Router {
    let body_limit = file_service.max_upload_size() + MULTIPART_OVERHEAD;

    Router::new()
        .route(
            "/api/upload",
            post(upload_file)
                .layer(DefaultBodyLimit::max(body_limit))
                .layer(from_fn_with_state(validator, identity_middleware)),
        )
        .route("/api/file/{code}", get(get_file))
        .route("/api/file/{code}/content", get(get_file_content))
        .route("/api/files/public", get(list_public_files))
        .route("/download/{code}", get(download_file))
        .with_state(file_service)
}

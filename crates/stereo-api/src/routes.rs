//! API route definitions

use crate::handlers;
use crate::state::AppState;

use axum::{
    extract::DefaultBodyLimit,
    routing::{delete, get, post},
    Router,
};
use std::time::Duration;
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

const MAX_UPLOAD_BYTES: usize = 512 * 1024 * 1024;

/// Create the main application router
pub fn create_router(state: AppState) -> Router {
    // CORS configuration
    let cors = if state.config.cors_permissive {
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
            .max_age(Duration::from_secs(3600))
    } else {
        CorsLayer::new()
            .allow_origin(["http://localhost:5173".parse().unwrap()])
            .allow_methods(Any)
            .allow_headers(Any)
    };

    Router::new()
        // Health & Status
        .route("/health", get(handlers::health_check))
        .route("/status", get(handlers::system_status))
        // Video storage
        .route("/upload", post(handlers::upload_video))
        .route("/video/{filename}", get(handlers::serve_video))
        .route("/cache/{filename}", delete(handlers::clear_cache))
        // Single-shot analysis
        .route("/detect-field-corners", post(handlers::detect_field_corners))
        .route("/detect-players", post(handlers::detect_players))
        .route("/segment-first-frame", post(handlers::segment_first_frame))
        // Legacy single-view path
        .route("/process-video", post(handlers::process_video))
        // Full stereo segmentation job
        .route("/segment-full-video", post(handlers::segment_full_video))
        .route(
            "/segment-progress/{filename}",
            get(handlers::segment_progress),
        )
        // Apply middleware
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .layer(CompressionLayer::new())
        .with_state(state)
}

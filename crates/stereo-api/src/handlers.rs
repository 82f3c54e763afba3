//! API request handlers

use crate::error::ApiError;
use crate::state::AppState;

use axum::{
    extract::{Multipart, Path, State},
    http::{header, StatusCode},
    response::IntoResponse,
    Json,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::json;
use stereo_core::events::{TimelineEvent, TimelineStep};
use stereo_core::{DetectionMode, TrackedObject};
use stereo_pipeline::StereoCorners;
use tracing::info;

// ============================================================================
// REQUEST & RESPONSE TYPES
// ============================================================================

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub timestamp: String,
}

#[derive(Serialize)]
pub struct StatusResponse {
    pub api: String,
    pub models: String,
    pub simulation_mode: bool,
    pub active_jobs: usize,
}

#[derive(Serialize)]
pub struct UploadResponse {
    pub filename: String,
    pub url: String,
}

#[derive(Deserialize)]
pub struct VideoRequest {
    pub filename: String,
}

/// Request for detection-backed operations. The mode is a tagged object,
/// e.g. `{"mode": "grid", "bands": 6, "overlap": 0.2}`; field-of-play
/// when omitted.
#[derive(Deserialize)]
pub struct SegmentRequest {
    pub filename: String,
    #[serde(default)]
    pub mode: Option<DetectionMode>,
}

impl SegmentRequest {
    fn mode(&self) -> DetectionMode {
        self.mode.unwrap_or_default()
    }
}

#[derive(Serialize)]
pub struct CornersResponse {
    pub filename: String,
    pub corners: StereoCorners,
}

#[derive(Serialize)]
pub struct DetectionsResponse {
    pub filename: String,
    pub top: Vec<TrackedObject>,
    pub bottom: Vec<TrackedObject>,
    pub top_count: usize,
    pub bottom_count: usize,
    pub similarity: f32,
}

#[derive(Serialize)]
pub struct PreviewResponse {
    pub filename: String,
    pub preview_url: String,
}

#[derive(Serialize)]
pub struct ProcessResponse {
    pub filename: String,
    pub url: String,
}

#[derive(Serialize)]
pub struct JobStartedResponse {
    pub filename: String,
    pub status: String,
    pub progress_url: String,
}

#[derive(Serialize)]
pub struct CacheClearedResponse {
    pub filename: String,
    pub removed: Vec<String>,
}

// ============================================================================
// HEALTH & STATUS HANDLERS
// ============================================================================

/// Health check endpoint
pub async fn health_check() -> impl IntoResponse {
    Json(HealthResponse {
        status: "healthy".into(),
        version: env!("CARGO_PKG_VERSION").into(),
        timestamp: Utc::now().to_rfc3339(),
    })
}

/// System status snapshot
pub async fn system_status(State(state): State<AppState>) -> impl IntoResponse {
    Json(StatusResponse {
        api: "running".into(),
        models: if state.models_available() {
            "available".into()
        } else {
            "unavailable".into()
        },
        simulation_mode: state.config.simulation_mode,
        active_jobs: state.pipeline.registry().len(),
    })
}

// ============================================================================
// VIDEO STORAGE HANDLERS
// ============================================================================

/// Accept a multipart video upload and store it in the uploads directory.
pub async fn upload_video(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>, ApiError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::bad_request(format!("malformed multipart body: {e}")))?
    {
        if field.name() != Some("file") {
            continue;
        }

        let filename = field
            .file_name()
            .map(sanitize_filename)
            .filter(|name| !name.is_empty())
            .ok_or_else(|| ApiError::bad_request("upload is missing a filename"))?;
        let bytes = field
            .bytes()
            .await
            .map_err(|e| ApiError::bad_request(format!("upload read failed: {e}")))?;

        tokio::fs::create_dir_all(&state.config.uploads_dir)
            .await
            .map_err(|e| ApiError::internal(format!("cannot create uploads dir: {e}")))?;
        let dest = state.config.uploads_dir.join(&filename);
        tokio::fs::write(&dest, &bytes)
            .await
            .map_err(|e| ApiError::internal(format!("cannot store upload: {e}")))?;

        state.seed_simulated(&filename);
        state
            .pipeline
            .log_upload(
                &filename,
                TimelineEvent::new(
                    TimelineStep::VideoUploaded,
                    json!({ "filename": filename, "bytes": bytes.len() }),
                ),
            )
            .await;

        info!(filename, bytes = bytes.len(), "video uploaded");
        return Ok(Json(UploadResponse {
            url: format!("/video/{filename}"),
            filename,
        }));
    }

    Err(ApiError::bad_request("no \"file\" field in upload"))
}

/// Serve a stored video from the outputs or uploads directory.
pub async fn serve_video(
    State(state): State<AppState>,
    Path(filename): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let filename = sanitize_filename(&filename);
    for dir in [&state.config.outputs_dir, &state.config.uploads_dir] {
        let path = dir.join(&filename);
        if let Ok(bytes) = tokio::fs::read(&path).await {
            return Ok(([(header::CONTENT_TYPE, "video/mp4")], bytes));
        }
    }
    Err(ApiError::not_found(format!("video {filename} not found")))
}

/// Delete the cached processed outputs derived from one source video.
pub async fn clear_cache(
    State(state): State<AppState>,
    Path(filename): Path<String>,
) -> Result<Json<CacheClearedResponse>, ApiError> {
    let filename = sanitize_filename(&filename);
    let mut removed = Vec::new();
    for name in cached_output_names(&filename) {
        let path = state.config.outputs_dir.join(&name);
        if tokio::fs::remove_file(&path).await.is_ok() {
            removed.push(name);
        }
    }
    info!(filename, count = removed.len(), "cleared cached outputs");
    Ok(Json(CacheClearedResponse { filename, removed }))
}

// ============================================================================
// ANALYSIS HANDLERS
// ============================================================================

/// Estimate the field-of-play corners on the first frame.
pub async fn detect_field_corners(
    State(state): State<AppState>,
    Json(request): Json<VideoRequest>,
) -> Result<Json<CornersResponse>, ApiError> {
    let corners = state.pipeline.field_corners(&request.filename).await?;
    Ok(Json(CornersResponse {
        filename: request.filename,
        corners,
    }))
}

/// Detect players on the first frame of both views.
pub async fn detect_players(
    State(state): State<AppState>,
    Json(request): Json<SegmentRequest>,
) -> Result<Json<DetectionsResponse>, ApiError> {
    let detections = state
        .pipeline
        .detect_first_frame(&request.filename, request.mode())
        .await?;
    Ok(Json(DetectionsResponse {
        filename: request.filename,
        top_count: detections.top.len(),
        bottom_count: detections.bottom.len(),
        similarity: detections.similarity,
        top: detections.top,
        bottom: detections.bottom,
    }))
}

/// Segment only the first frame and persist a preview clip.
pub async fn segment_first_frame(
    State(state): State<AppState>,
    Json(request): Json<SegmentRequest>,
) -> Result<Json<PreviewResponse>, ApiError> {
    let frame = state
        .pipeline
        .segment_preview(&request.filename, request.mode())
        .await?;
    let preview_url = state.pipeline.save_preview(&request.filename, &frame).await?;
    Ok(Json(PreviewResponse {
        filename: request.filename,
        preview_url,
    }))
}

/// Legacy single-view processing, inline and green-highlighted.
pub async fn process_video(
    State(state): State<AppState>,
    Json(request): Json<VideoRequest>,
) -> Result<Json<ProcessResponse>, ApiError> {
    let url = state.pipeline.process_video(&request.filename).await?;
    Ok(Json(ProcessResponse {
        filename: request.filename,
        url,
    }))
}

// ============================================================================
// FULL JOB HANDLERS
// ============================================================================

/// Launch a full stereo segmentation job in the background.
pub async fn segment_full_video(
    State(state): State<AppState>,
    Json(request): Json<SegmentRequest>,
) -> Result<impl IntoResponse, ApiError> {
    state
        .pipeline
        .start_full_job(&request.filename, request.mode())?;
    Ok((
        StatusCode::ACCEPTED,
        Json(JobStartedResponse {
            progress_url: format!("/segment-progress/{}", request.filename),
            filename: request.filename,
            status: "started".into(),
        }),
    ))
}

/// Poll a job's progress record.
///
/// An unknown filename answers 200 with `{"status": "not_found"}` so
/// pollers that race the job launch see a plain status instead of an
/// error page.
pub async fn segment_progress(
    State(state): State<AppState>,
    Path(filename): Path<String>,
) -> Json<serde_json::Value> {
    match state.pipeline.job_status(&filename) {
        Some(status) => Json(serde_json::to_value(&status).unwrap_or_else(|_| {
            json!({ "status": "error", "message": "unserializable job status" })
        })),
        None => Json(json!({
            "status": "not_found",
            "message": format!("No segmentation job found for {filename}"),
        })),
    }
}

/// Strip any path components from a client-supplied filename.
fn sanitize_filename(name: &str) -> String {
    std::path::Path::new(name)
        .file_name()
        .and_then(|s| s.to_str())
        .unwrap_or_default()
        .to_string()
}

/// Output filenames the pipeline may have produced for a source video.
fn cached_output_names(filename: &str) -> Vec<String> {
    let path = std::path::Path::new(filename);
    let stem = path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or(filename);
    let ext = path.extension().and_then(|s| s.to_str()).unwrap_or("mp4");
    ["_segmented", "_processed", "_preview"]
        .iter()
        .map(|suffix| format!("{stem}{suffix}.{ext}"))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_segment_request_mode_defaults_to_field_of_play() {
        let request: SegmentRequest =
            serde_json::from_str(r#"{"filename": "match.mp4"}"#).unwrap();
        assert_eq!(request.mode(), DetectionMode::FieldOfPlay);
    }

    #[test]
    fn test_segment_request_parses_tagged_mode() {
        let request: SegmentRequest = serde_json::from_str(
            r#"{"filename": "match.mp4", "mode": {"mode": "grid", "bands": 8, "overlap": 0.2}}"#,
        )
        .unwrap();
        assert_eq!(
            request.mode(),
            DetectionMode::Grid {
                bands: 8,
                overlap: 0.2
            }
        );
    }

    #[test]
    fn test_sanitize_filename_strips_paths() {
        assert_eq!(sanitize_filename("../../etc/passwd"), "passwd");
        assert_eq!(sanitize_filename("match.mp4"), "match.mp4");
    }

    #[test]
    fn test_cached_output_names_cover_all_suffixes() {
        let names = cached_output_names("match.mov");
        assert_eq!(
            names,
            vec![
                "match_segmented.mov",
                "match_processed.mov",
                "match_preview.mov"
            ]
        );
    }
}

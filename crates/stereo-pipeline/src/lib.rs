//! # Stereo Pipeline - Job Orchestration
//!
//! Central coordination for stereo sports-video segmentation. Drives the
//! four job phases (frame extraction, top-view tracking, bottom-view
//! tracking, rendering) over the capability traits from `stereo-cv`, and
//! owns the job registry that pollers read progress from.
//!
//! Long-running jobs are spawned onto the runtime under a supervisor so a
//! panicking phase still lands an error status instead of a silently
//! vanished job.

pub mod error;
pub mod experiment;
pub mod extract;
pub mod progress;
pub mod render;
pub mod view;

pub use error::{PipelineError, PipelineResult};
pub use experiment::{ExperimentLog, InMemoryExperimentLog};
pub use progress::{JobRegistry, Phase};

use crate::experiment::record;
use crate::extract::extract_views;
use crate::render::render_output;
use crate::view::{detect_view_objects, propagate_view};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use stereo_core::events::{TimelineEvent, TimelineStep, VideoKind, VideoRef};
use stereo_core::geometry::Quad;
use stereo_core::{
    DetectionMode, HighlightColor, JobStatus, TrackedObject, View, ViewSide,
};
use stereo_cv::config::RenderingConfig;
use stereo_cv::frame::FrameStoreProvider;
use stereo_cv::regions::estimate_field_corners;
use stereo_cv::video::VideoIo;
use stereo_cv::{CvConfig, Detector, Frame, FrameStore, MaskRenderer, MaskTracker, RegionSelector};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

/// Pipeline configuration
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Directory uploaded source videos live in.
    pub uploads_dir: PathBuf,
    /// Directory processed videos are written to.
    pub outputs_dir: PathBuf,
    /// CV layer tuning.
    pub cv: CvConfig,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            uploads_dir: PathBuf::from("uploads"),
            outputs_dir: PathBuf::from("outputs"),
            cv: CvConfig::default(),
        }
    }
}

/// Estimated field corners for both views, in global coordinates.
#[derive(Debug, Clone, Copy, serde::Serialize)]
pub struct StereoCorners {
    pub top: Quad,
    pub bottom: Quad,
}

/// First-frame detection result for both views.
#[derive(Debug, Clone, serde::Serialize)]
pub struct StereoDetections {
    pub top: Vec<TrackedObject>,
    pub bottom: Vec<TrackedObject>,
    /// How close the two per-view counts are, in [0, 1].
    pub similarity: f32,
}

/// Closeness of two detection counts: `1 - |a - b| / max(a, b, 1)`.
pub fn count_similarity(a: usize, b: usize) -> f32 {
    let denom = a.max(b).max(1) as f32;
    1.0 - (a.abs_diff(b) as f32) / denom
}

/// Main segmentation coordinator.
///
/// The detector and tracker are optional: when a model is missing the
/// service keeps running in degraded mode and full-job requests are
/// rejected up front with `ModelUnavailable`.
pub struct SegmentationPipeline {
    config: PipelineConfig,
    video_io: Arc<dyn VideoIo>,
    detector: Option<Arc<dyn Detector>>,
    tracker: Option<Arc<dyn MaskTracker>>,
    stores: Arc<dyn FrameStoreProvider>,
    registry: Arc<JobRegistry>,
    experiment: Option<Arc<dyn ExperimentLog>>,
    selector: RegionSelector,
    renderer: MaskRenderer,
    shutdown: CancellationToken,
}

impl SegmentationPipeline {
    pub fn new(
        config: PipelineConfig,
        video_io: Arc<dyn VideoIo>,
        detector: Option<Arc<dyn Detector>>,
        tracker: Option<Arc<dyn MaskTracker>>,
        stores: Arc<dyn FrameStoreProvider>,
    ) -> Self {
        let selector = RegionSelector::new(config.cv.clone());
        let renderer = MaskRenderer::new(config.cv.rendering.clone());
        Self {
            config,
            video_io,
            detector,
            tracker,
            stores,
            registry: Arc::new(JobRegistry::new()),
            experiment: None,
            selector,
            renderer,
            shutdown: CancellationToken::new(),
        }
    }

    pub fn with_experiment_log(mut self, log: Arc<dyn ExperimentLog>) -> Self {
        self.experiment = Some(log);
        self
    }

    pub fn registry(&self) -> &Arc<JobRegistry> {
        &self.registry
    }

    pub fn models_available(&self) -> bool {
        self.detector.is_some() && self.tracker.is_some()
    }

    /// Ask running job supervisors to wind down.
    pub fn shutdown(&self) {
        self.shutdown.cancel();
    }

    pub fn job_status(&self, filename: &str) -> Option<JobStatus> {
        self.registry.get(filename)
    }

    fn source_path(&self, filename: &str) -> PathBuf {
        self.config.uploads_dir.join(filename)
    }

    fn output_path(&self, filename: &str, suffix: &str) -> PathBuf {
        let path = Path::new(filename);
        let stem = path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or(filename);
        let ext = path.extension().and_then(|s| s.to_str()).unwrap_or("mp4");
        self.config.outputs_dir.join(format!("{stem}{suffix}.{ext}"))
    }

    fn require_models(&self) -> PipelineResult<(Arc<dyn Detector>, Arc<dyn MaskTracker>)> {
        let detector = self
            .detector
            .clone()
            .ok_or(PipelineError::ModelUnavailable("detector"))?;
        let tracker = self
            .tracker
            .clone()
            .ok_or(PipelineError::ModelUnavailable("tracker"))?;
        Ok((detector, tracker))
    }

    async fn log_event(&self, filename: &str, event: TimelineEvent) {
        record(self.experiment.as_deref(), filename, event).await;
    }

    /// Append a caller-supplied event, e.g. the upload record from the
    /// API layer. Best-effort like every experiment write.
    pub async fn log_upload(&self, filename: &str, event: TimelineEvent) {
        self.log_event(filename, event).await;
    }

    // ========================================================================
    // FULL VIDEO JOB
    // ========================================================================

    /// Validate and launch a full stereo segmentation job.
    ///
    /// Rejections happen synchronously: missing input, missing models, or
    /// a job for the same file still running. On success the job runs in
    /// the background and is observable through `job_status`.
    pub fn start_full_job(
        self: &Arc<Self>,
        filename: &str,
        mode: DetectionMode,
    ) -> PipelineResult<()> {
        let source = self.source_path(filename);
        if !self.video_io.exists(&source) {
            return Err(PipelineError::InputNotFound(filename.to_string()));
        }
        self.require_models()?;
        self.registry.try_start(filename)?;

        info!(filename, %mode, "starting full segmentation job");

        let pipeline = Arc::clone(self);
        let key = filename.to_string();
        let shutdown = self.shutdown.clone();
        tokio::spawn(async move {
            let mut job = tokio::spawn({
                let pipeline = Arc::clone(&pipeline);
                let key = key.clone();
                async move { pipeline.run_full_job(&key, mode).await }
            });
            tokio::select! {
                joined = &mut job => {
                    if let Err(join_err) = joined {
                        error!(filename = %key, error = %join_err, "job task aborted");
                        pipeline.registry.fail(&key, format!("job task aborted: {join_err}"));
                    }
                }
                _ = shutdown.cancelled() => {
                    warn!(filename = %key, "job interrupted by shutdown");
                    job.abort();
                    pipeline.registry.fail(&key, "service shutting down");
                }
            }
        });
        Ok(())
    }

    /// One full job, start to finish. Owns its status record: every exit
    /// path leaves the job completed or failed, and scratch frame stores
    /// are cleared best-effort either way.
    async fn run_full_job(&self, filename: &str, mode: DetectionMode) {
        let top_store = match self.stores.create(filename, "top") {
            Ok(store) => store,
            Err(err) => {
                self.registry.fail(filename, err.to_string());
                return;
            }
        };
        let bottom_store = match self.stores.create(filename, "bottom") {
            Ok(store) => store,
            Err(err) => {
                self.registry.fail(filename, err.to_string());
                return;
            }
        };

        let result = self
            .execute_full(filename, mode, &top_store, &bottom_store)
            .await;

        for (label, store) in [("top", &top_store), ("bottom", &bottom_store)] {
            if let Err(err) = store.clear() {
                warn!(filename, view = label, error = %err, "scratch cleanup failed");
            }
        }

        match result {
            Ok(()) => {}
            Err(err) => {
                error!(filename, error = %err, "segmentation job failed");
                self.registry.fail(filename, err.to_string());
                self.log_event(filename, TimelineEvent::segmentation_failed(filename, &err.to_string()))
                    .await;
            }
        }
    }

    async fn execute_full(
        &self,
        filename: &str,
        mode: DetectionMode,
        top_store: &Arc<dyn FrameStore>,
        bottom_store: &Arc<dyn FrameStore>,
    ) -> PipelineResult<()> {
        let (detector, tracker) = self.require_models()?;
        let source = self.source_path(filename);
        let output = self.output_path(filename, "_segmented");

        let extracted = extract_views(
            self.video_io.as_ref(),
            &source,
            filename,
            top_store,
            bottom_store,
            &self.registry,
        )?;

        self.registry
            .set_message(filename, "Detecting players in both views...");
        let top_objects = detect_view_objects(
            &self.selector,
            detector.as_ref(),
            top_store,
            &extracted.top,
            &mode,
        )?;
        let bottom_objects = detect_view_objects(
            &self.selector,
            detector.as_ref(),
            bottom_store,
            &extracted.bottom,
            &mode,
        )?;
        self.log_event(
            filename,
            TimelineEvent::segmentation_started(filename, top_objects.len(), bottom_objects.len()),
        )
        .await;

        let result_url = format!("/video/{}", output_file_name(&output));

        if top_objects.is_empty() && bottom_objects.is_empty() {
            // Nothing to segment: both track phases are skipped and every
            // frame passes through the render loop unmodified.
            warn!(filename, "no players detected, rendering video unchanged");
            self.registry
                .set_message(filename, "No players detected, rendering original video...");
            render_output(
                self.video_io.as_ref(),
                &output,
                &extracted.meta,
                filename,
                top_store,
                bottom_store,
                &[],
                &[],
                &self.renderer,
                extracted.frame_count,
                &self.registry,
            )?;
            self.registry.complete(
                filename,
                result_url.clone(),
                "No players detected; original video rendered unchanged",
            );
        } else {
            let top_masks = propagate_view(
                tracker.as_ref(),
                top_store,
                &extracted.top,
                &top_objects,
                Phase::TrackTop,
                &self.registry,
                filename,
                extracted.frame_count,
            )?;
            let bottom_masks = propagate_view(
                tracker.as_ref(),
                bottom_store,
                &extracted.bottom,
                &bottom_objects,
                Phase::TrackBottom,
                &self.registry,
                filename,
                extracted.frame_count,
            )?;

            render_output(
                self.video_io.as_ref(),
                &output,
                &extracted.meta,
                filename,
                top_store,
                bottom_store,
                &top_masks,
                &bottom_masks,
                &self.renderer,
                extracted.frame_count,
                &self.registry,
            )?;
            self.registry.complete(
                filename,
                result_url.clone(),
                "Full video segmentation completed successfully!",
            );
        }

        self.log_event(
            filename,
            TimelineEvent::segmentation_completed(filename, extracted.frame_count),
        )
        .await;
        if let Some(log) = &self.experiment {
            if let Err(err) = log
                .attach_video(filename, VideoRef::new(result_url, VideoKind::Processed))
                .await
            {
                warn!(filename, error = %err, "experiment video attach failed");
            }
        }
        Ok(())
    }

    // ========================================================================
    // SINGLE-SHOT OPERATIONS
    // ========================================================================

    /// Estimate the field-of-play corners for each view from the first
    /// frame, in global frame coordinates.
    pub async fn field_corners(&self, filename: &str) -> PipelineResult<StereoCorners> {
        let frame = self.first_frame(filename)?;
        let (top_view, bottom_view) = View::split(frame.width(), frame.height());
        let (top_half, bottom_half) = frame.split_at_row(top_view.height)?;

        let corners = StereoCorners {
            top: estimate_field_corners(&top_half),
            bottom: estimate_field_corners(&bottom_half)
                .translated(0.0, bottom_view.offset as f32),
        };
        self.log_event(
            filename,
            TimelineEvent::new(
                TimelineStep::CornersDetected,
                serde_json::json!({ "filename": filename }),
            ),
        )
        .await;
        Ok(corners)
    }

    /// Detect players on the first frame of both views.
    pub async fn detect_first_frame(
        &self,
        filename: &str,
        mode: DetectionMode,
    ) -> PipelineResult<StereoDetections> {
        let (detector, _) = self.require_models()?;
        let frame = self.first_frame(filename)?;
        let (top_view, bottom_view) = View::split(frame.width(), frame.height());
        let (top_half, bottom_half) = frame.split_at_row(top_view.height)?;

        let top = to_objects(&self.selector, detector.as_ref(), &top_half, &top_view, &mode)?;
        let bottom = to_objects(
            &self.selector,
            detector.as_ref(),
            &bottom_half,
            &bottom_view,
            &mode,
        )?;
        let similarity = count_similarity(top.len(), bottom.len());

        self.log_event(
            filename,
            TimelineEvent::objects_detected(filename, top.len(), bottom.len(), similarity),
        )
        .await;
        Ok(StereoDetections {
            top,
            bottom,
            similarity,
        })
    }

    /// Segment only the first frame and return the rendered preview.
    pub async fn segment_preview(
        &self,
        filename: &str,
        mode: DetectionMode,
    ) -> PipelineResult<Frame> {
        let (_, tracker) = self.require_models()?;
        let detections = self.detect_first_frame(filename, mode).await?;
        let frame = self.first_frame(filename)?;
        let (top_view, bottom_view) = View::split(frame.width(), frame.height());
        let (top_half, bottom_half) = frame.split_at_row(top_view.height)?;

        let top = self.preview_view(tracker.as_ref(), top_half, &top_view, &detections.top)?;
        let bottom = self.preview_view(
            tracker.as_ref(),
            bottom_half,
            &bottom_view,
            &detections.bottom,
        )?;
        let composed = self.renderer.compose(&top, &bottom)?;

        self.log_event(
            filename,
            TimelineEvent::new(
                TimelineStep::PreviewSegmented,
                serde_json::json!({
                    "filename": filename,
                    "objects": detections.top.len() + detections.bottom.len(),
                }),
            ),
        )
        .await;
        Ok(composed)
    }

    /// Persist a rendered preview as a one-frame clip next to the other
    /// outputs and return its URL.
    pub async fn save_preview(&self, filename: &str, frame: &Frame) -> PipelineResult<String> {
        let output = self.output_path(filename, "_preview");
        let meta = stereo_cv::VideoMeta {
            fps: 1.0,
            width: frame.width(),
            height: frame.height(),
            frame_count: 1,
        };
        let mut sink = self.video_io.create(&output, &meta)?;
        sink.write_frame(frame)?;
        sink.finish()?;

        let url = format!("/video/{}", output_file_name(&output));
        if let Some(log) = &self.experiment {
            if let Err(err) = log
                .attach_video(filename, VideoRef::new(url.clone(), VideoKind::Preview))
                .await
            {
                warn!(filename, error = %err, "experiment video attach failed");
            }
        }
        Ok(url)
    }

    fn preview_view(
        &self,
        tracker: &dyn MaskTracker,
        mut frame: Frame,
        view: &View,
        objects: &[TrackedObject],
    ) -> PipelineResult<Frame> {
        if objects.is_empty() {
            return Ok(frame);
        }

        let store = stereo_cv::MemoryFrameStore::new();
        store.put(0, &frame)?;
        let mut session = tracker.init_session(&store)?;
        for object in objects {
            session.add_box(object.id, &view.localize(object.bbox))?;
        }
        if let Some(mask_frame) = session.propagate()?.next().transpose()? {
            let masks: Vec<_> = mask_frame
                .object_ids()
                .into_iter()
                .map(|id| mask_frame.masks[&id].clone())
                .collect();
            self.renderer.apply_preview_masks(&mut frame, &masks)?;
        }
        Ok(frame)
    }

    /// Legacy single-view path: segment the whole frame without the
    /// stereo split, highlighting in green. Runs inline and returns the
    /// result URL when done.
    pub async fn process_video(&self, filename: &str) -> PipelineResult<String> {
        let (detector, tracker) = self.require_models()?;
        let source = self.source_path(filename);
        if !self.video_io.exists(&source) {
            return Err(PipelineError::InputNotFound(filename.to_string()));
        }
        let output = self.output_path(filename, "_processed");
        let result_url = format!("/video/{}", output_file_name(&output));

        let mut reader = self.video_io.open(&source)?;
        let meta = reader.meta();
        let whole = View {
            side: ViewSide::Top,
            offset: 0,
            width: meta.width,
            height: meta.height,
        };

        let store = self.stores.create(filename, "legacy")?;
        let mut index = 0;
        while let Some(frame) = reader.next_frame()? {
            store.put(index, &frame)?;
            index += 1;
        }
        if index == 0 {
            store.clear().ok();
            return Err(PipelineError::invalid_request(format!(
                "{filename} contains no frames"
            )));
        }

        let result = self.execute_legacy(
            detector.as_ref(),
            tracker.as_ref(),
            &store,
            &whole,
            &source,
            &output,
            index,
            meta,
        );
        if let Err(err) = store.clear() {
            warn!(filename, error = %err, "scratch cleanup failed");
        }
        result?;
        Ok(result_url)
    }

    #[allow(clippy::too_many_arguments)]
    fn execute_legacy(
        &self,
        detector: &dyn Detector,
        tracker: &dyn MaskTracker,
        store: &Arc<dyn FrameStore>,
        whole: &View,
        source: &Path,
        output: &Path,
        frame_count: usize,
        meta: stereo_cv::VideoMeta,
    ) -> PipelineResult<()> {
        let first = store.get(0)?;
        let detections = self
            .selector
            .detect_in_view(detector, &first, &DetectionMode::Full)?;
        if detections.is_empty() {
            self.video_io.copy(source, output)?;
            return Ok(());
        }

        let objects = TrackedObject::from_detections(whole.side, &detections);
        let mut session = tracker.init_session(store.as_ref())?;
        for object in &objects {
            session.add_box(object.id, &object.bbox)?;
        }

        let green = MaskRenderer::new(RenderingConfig {
            highlight: HighlightColor::GREEN,
            ..self.config.cv.rendering.clone()
        });
        let mut sink = self.video_io.create(output, &meta)?;
        for result in session.propagate()? {
            let mask_frame = result?;
            let mut frame = store.get(mask_frame.frame_index)?;
            green.apply_masks(&mut frame, &mask_frame);
            sink.write_frame(&frame)?;
        }
        sink.finish()?;
        info!(output = %output.display(), frames = frame_count, "legacy processing finished");
        Ok(())
    }

    fn first_frame(&self, filename: &str) -> PipelineResult<Frame> {
        let source = self.source_path(filename);
        if !self.video_io.exists(&source) {
            return Err(PipelineError::InputNotFound(filename.to_string()));
        }
        let mut reader = self.video_io.open(&source)?;
        reader
            .next_frame()?
            .ok_or_else(|| PipelineError::invalid_request(format!("{filename} contains no frames")))
    }
}

fn to_objects(
    selector: &RegionSelector,
    detector: &dyn Detector,
    half: &Frame,
    view: &View,
    mode: &DetectionMode,
) -> PipelineResult<Vec<TrackedObject>> {
    let local = selector.detect_in_view(detector, half, mode)?;
    let global: Vec<_> = local
        .into_iter()
        .map(|d| stereo_core::Detection {
            bbox: view.globalize(d.bbox),
            ..d
        })
        .collect();
    Ok(TrackedObject::from_detections(view.side, &global))
}

fn output_file_name(path: &Path) -> String {
    path.file_name()
        .and_then(|s| s.to_str())
        .unwrap_or_default()
        .to_string()
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use stereo_core::{BBox, JobState};
    use stereo_cv::frame::MemoryStoreProvider;
    use stereo_cv::sim::{synthetic_clip, MemoryVideoIo, ScanningDetector, StubTracker, TURF};

    fn build_pipeline(io: &MemoryVideoIo) -> Arc<SegmentationPipeline> {
        Arc::new(
            SegmentationPipeline::new(
                PipelineConfig::default(),
                Arc::new(io.clone()),
                Some(Arc::new(ScanningDetector::new())),
                Some(Arc::new(StubTracker::new())),
                Arc::new(MemoryStoreProvider),
            )
            .with_experiment_log(Arc::new(InMemoryExperimentLog::new())),
        )
    }

    fn degraded_pipeline(io: &MemoryVideoIo) -> Arc<SegmentationPipeline> {
        Arc::new(SegmentationPipeline::new(
            PipelineConfig::default(),
            Arc::new(io.clone()),
            None,
            None,
            Arc::new(MemoryStoreProvider),
        ))
    }

    /// Two players in the top half, none in the bottom.
    fn stereo_clip(frames: usize) -> Vec<Frame> {
        synthetic_clip(
            64,
            96,
            frames,
            &[
                BBox::new(10.0, 10.0, 18.0, 26.0),
                BBox::new(40.0, 12.0, 48.0, 28.0),
            ],
        )
    }

    async fn wait_for_terminal(pipeline: &SegmentationPipeline, key: &str) -> JobStatus {
        for _ in 0..500 {
            if let Some(status) = pipeline.job_status(key) {
                if status.is_terminal() {
                    return status;
                }
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        panic!("job {key} never reached a terminal state");
    }

    #[tokio::test]
    async fn test_full_job_completes() {
        let io = MemoryVideoIo::new();
        io.insert_video("uploads/match.mp4", 30.0, stereo_clip(10));
        let pipeline = build_pipeline(&io);

        pipeline
            .start_full_job("match.mp4", DetectionMode::Full)
            .unwrap();
        let status = wait_for_terminal(&pipeline, "match.mp4").await;

        assert_eq!(status.status, JobState::Completed);
        assert_eq!(status.percent, 100);
        assert_eq!(
            status.result_url.as_deref(),
            Some("/video/match_segmented.mp4")
        );

        let output = io.video("outputs/match_segmented.mp4").unwrap();
        assert_eq!(output.frames.len(), 10);
        assert_eq!(output.frames[0].height(), 96);

        // Top-view player pixels are tinted, bottom half stays turf.
        assert_ne!(output.frames[0].pixel(12, 12), (TURF.b, TURF.g, TURF.r));
        assert_eq!(output.frames[0].pixel(12, 70), (TURF.b, TURF.g, TURF.r));
    }

    #[tokio::test]
    async fn test_full_job_passthrough_when_no_players() {
        let io = MemoryVideoIo::new();
        io.insert_video("uploads/empty.mp4", 30.0, synthetic_clip(64, 96, 6, &[]));
        let pipeline = build_pipeline(&io);

        pipeline
            .start_full_job("empty.mp4", DetectionMode::Full)
            .unwrap();
        let status = wait_for_terminal(&pipeline, "empty.mp4").await;

        assert_eq!(status.status, JobState::Completed);
        assert_eq!(status.percent, 100);
        assert!(status.message.contains("No players detected"));

        // Every frame is rendered through untouched.
        let source = io.video("uploads/empty.mp4").unwrap();
        let output = io.video("outputs/empty_segmented.mp4").unwrap();
        assert_eq!(source.frames, output.frames);
    }

    #[tokio::test]
    async fn test_start_rejects_missing_input() {
        let io = MemoryVideoIo::new();
        let pipeline = build_pipeline(&io);
        assert!(matches!(
            pipeline.start_full_job("nope.mp4", DetectionMode::Full),
            Err(PipelineError::InputNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_start_rejects_duplicate_running_job() {
        let io = MemoryVideoIo::new();
        io.insert_video("uploads/match.mp4", 30.0, stereo_clip(4));
        let pipeline = build_pipeline(&io);

        pipeline.registry().try_start("match.mp4").unwrap();
        assert!(matches!(
            pipeline.start_full_job("match.mp4", DetectionMode::Full),
            Err(PipelineError::JobAlreadyRunning(_))
        ));
    }

    #[tokio::test]
    async fn test_start_rejects_without_models() {
        let io = MemoryVideoIo::new();
        io.insert_video("uploads/match.mp4", 30.0, stereo_clip(4));
        let pipeline = degraded_pipeline(&io);

        assert!(matches!(
            pipeline.start_full_job("match.mp4", DetectionMode::Full),
            Err(PipelineError::ModelUnavailable(_))
        ));
        // No job record is left behind by the rejection.
        assert!(pipeline.job_status("match.mp4").is_none());
    }

    #[tokio::test]
    async fn test_detect_first_frame_similarity() {
        let io = MemoryVideoIo::new();
        io.insert_video("uploads/match.mp4", 30.0, stereo_clip(2));
        let pipeline = build_pipeline(&io);

        let result = pipeline
            .detect_first_frame("match.mp4", DetectionMode::Full)
            .await
            .unwrap();
        assert_eq!(result.top.len(), 2);
        assert_eq!(result.bottom.len(), 0);
        assert_eq!(result.similarity, 0.0);

        // Ids restart per view and boxes are global.
        assert_eq!(result.top[0].id, 1);
        assert_eq!(result.top[1].id, 2);
        assert!(result.top[0].bbox.x1 < result.top[1].bbox.x1);
    }

    #[test]
    fn test_count_similarity() {
        assert_eq!(count_similarity(3, 3), 1.0);
        assert_eq!(count_similarity(0, 0), 1.0);
        assert_eq!(count_similarity(2, 1), 0.5);
        assert_eq!(count_similarity(0, 4), 0.0);
    }

    #[tokio::test]
    async fn test_segment_preview_tints_players() {
        let io = MemoryVideoIo::new();
        io.insert_video("uploads/match.mp4", 30.0, stereo_clip(2));
        let pipeline = build_pipeline(&io);

        let preview = pipeline
            .segment_preview("match.mp4", DetectionMode::Full)
            .await
            .unwrap();
        assert_eq!(preview.width(), 64);
        assert_eq!(preview.height(), 96);
        assert_ne!(preview.pixel(12, 12), (TURF.b, TURF.g, TURF.r));
        assert_eq!(preview.pixel(2, 2), (TURF.b, TURF.g, TURF.r));
    }

    #[tokio::test]
    async fn test_legacy_process_copies_without_detections() {
        let io = MemoryVideoIo::new();
        io.insert_video("uploads/empty.mp4", 30.0, synthetic_clip(64, 96, 3, &[]));
        let pipeline = build_pipeline(&io);

        let url = pipeline.process_video("empty.mp4").await.unwrap();
        assert_eq!(url, "/video/empty_processed.mp4");

        let source = io.video("uploads/empty.mp4").unwrap();
        let output = io.video("outputs/empty_processed.mp4").unwrap();
        assert_eq!(source.frames, output.frames);
    }

    #[tokio::test]
    async fn test_legacy_process_highlights_green() {
        let io = MemoryVideoIo::new();
        io.insert_video("uploads/match.mp4", 30.0, stereo_clip(3));
        let pipeline = build_pipeline(&io);

        let url = pipeline.process_video("match.mp4").await.unwrap();
        assert_eq!(url, "/video/match_processed.mp4");

        let output = io.video("outputs/match_processed.mp4").unwrap();
        assert_eq!(output.frames.len(), 3);
        // Green-shifted player pixel: more green than the jersey red.
        let (_, g, r) = output.frames[0].pixel(12, 12);
        assert!(g > r);
    }

    #[tokio::test]
    async fn test_field_corners_on_turf_clip() {
        let io = MemoryVideoIo::new();
        io.insert_video("uploads/match.mp4", 30.0, stereo_clip(1));
        let pipeline = build_pipeline(&io);

        let corners = pipeline.field_corners("match.mp4").await.unwrap();
        assert!(corners.top.near_edge_len() > 0.0);
        assert!(corners.top.far_left.y < corners.top.near_left.y);
        // Bottom-view corners are globalized below the split row.
        assert!(corners.bottom.far_left.y >= 48.0);
    }
}

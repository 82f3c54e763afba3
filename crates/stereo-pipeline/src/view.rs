//! Per-view detection and mask propagation
//!
//! Each view runs the same two steps: detect players on its first frame
//! to build prompts, then propagate masks across every extracted frame.
//! Object ids are 1-based per view and live only for the job.

use crate::error::{PipelineError, PipelineResult};
use crate::progress::{JobRegistry, Phase};
use std::sync::Arc;
use stereo_core::{Detection, DetectionMode, MaskFrame, TrackedObject, View};
use stereo_cv::{Detector, FrameStore, MaskTracker, RegionSelector};
use tracing::{debug, info};

/// Detect players on a view's first frame and promote them to tracked
/// objects with global-frame boxes.
pub fn detect_view_objects(
    selector: &RegionSelector,
    detector: &dyn Detector,
    store: &Arc<dyn FrameStore>,
    view: &View,
    mode: &DetectionMode,
) -> PipelineResult<Vec<TrackedObject>> {
    let first = store.get(0)?;
    let local = selector.detect_in_view(detector, &first, mode)?;
    let global: Vec<Detection> = local
        .into_iter()
        .map(|d| Detection {
            bbox: view.globalize(d.bbox),
            ..d
        })
        .collect();
    debug!(view = %view.side, count = global.len(), "first-frame detection finished");
    Ok(TrackedObject::from_detections(view.side, &global))
}

/// Propagate masks for one view, reporting per-frame progress into the
/// view's phase window. Returns the mask frames in index order; an empty
/// prompt list short-circuits to no masks.
pub fn propagate_view(
    tracker: &dyn MaskTracker,
    store: &Arc<dyn FrameStore>,
    view: &View,
    objects: &[TrackedObject],
    phase: Phase,
    registry: &JobRegistry,
    job_key: &str,
    frame_count: usize,
) -> PipelineResult<Vec<MaskFrame>> {
    if objects.is_empty() {
        info!(view = %view.side, "no objects in view, skipping propagation");
        registry.set_progress(
            job_key,
            phase,
            frame_count,
            frame_count,
            format!("No players found in {} view", view.side),
        );
        return Ok(Vec::new());
    }

    let mut session = tracker.init_session(store.as_ref())?;
    for object in objects {
        let local = view.localize(object.bbox);
        if !local.within(view.width, view.height) {
            return Err(PipelineError::invalid_request(format!(
                "object {} prompt outside {} view",
                object.id, view.side
            )));
        }
        session.add_box(object.id, &local)?;
    }

    registry.set_progress(
        job_key,
        phase,
        0,
        frame_count,
        format!("Tracking {} view...", view.side),
    );

    let mut mask_frames = Vec::with_capacity(frame_count);
    for result in session.propagate()? {
        let mask_frame = result?;
        let done = mask_frame.frame_index + 1;
        registry.set_progress(
            job_key,
            phase,
            done,
            frame_count,
            format!("Tracking {} view: frame {done}/{frame_count}", view.side),
        );
        mask_frames.push(mask_frame);
    }

    info!(
        view = %view.side,
        objects = objects.len(),
        frames = mask_frames.len(),
        "mask propagation finished"
    );
    Ok(mask_frames)
}

#[cfg(test)]
mod tests {
    use super::*;
    use stereo_core::{BBox, JobState};
    use stereo_cv::sim::{synthetic_field_frame, ScanningDetector, StubTracker};
    use stereo_cv::{CvConfig, MemoryFrameStore};

    fn seeded_store(players: &[BBox], frames: usize) -> Arc<dyn FrameStore> {
        let store = MemoryFrameStore::new();
        for i in 0..frames {
            store
                .put(i, &synthetic_field_frame(64, 48, players))
                .unwrap();
        }
        Arc::new(store)
    }

    fn top_view() -> View {
        View::split(64, 96).0
    }

    #[test]
    fn test_detect_view_objects_assigns_global_boxes() {
        let (_, bottom) = View::split(64, 96);
        let store = seeded_store(&[BBox::new(10.0, 10.0, 18.0, 26.0)], 1);
        let selector = RegionSelector::new(CvConfig::default());
        let detector = ScanningDetector::new();

        let objects =
            detect_view_objects(&selector, &detector, &store, &bottom, &DetectionMode::Full)
                .unwrap();
        assert_eq!(objects.len(), 1);
        assert_eq!(objects[0].id, 1);
        // Local y 10 plus the bottom view offset of 48.
        assert_eq!(objects[0].bbox.y1, 58.0);
    }

    #[test]
    fn test_propagate_view_reports_progress() {
        let view = top_view();
        let store = seeded_store(&[BBox::new(10.0, 10.0, 18.0, 26.0)], 5);
        let registry = JobRegistry::new();
        registry.try_start("clip.mp4").unwrap();

        let objects = vec![TrackedObject::new(
            1,
            view.side,
            BBox::new(10.0, 10.0, 18.0, 26.0),
        )];
        let masks = propagate_view(
            &StubTracker::new(),
            &store,
            &view,
            &objects,
            Phase::TrackTop,
            &registry,
            "clip.mp4",
            5,
        )
        .unwrap();

        assert_eq!(masks.len(), 5);
        let status = registry.get("clip.mp4").unwrap();
        assert_eq!(status.status, JobState::Processing);
        assert_eq!(status.percent, 50);
        assert_eq!(status.current_frame, 5);
    }

    #[test]
    fn test_propagate_view_empty_objects_skips() {
        let view = top_view();
        let store = seeded_store(&[], 3);
        let registry = JobRegistry::new();
        registry.try_start("clip.mp4").unwrap();

        let masks = propagate_view(
            &StubTracker::new(),
            &store,
            &view,
            &[],
            Phase::TrackBottom,
            &registry,
            "clip.mp4",
            3,
        )
        .unwrap();

        assert!(masks.is_empty());
        assert_eq!(registry.get("clip.mp4").unwrap().percent, 90);
    }

    #[test]
    fn test_propagate_rejects_out_of_view_prompt() {
        let view = top_view();
        let store = seeded_store(&[], 3);
        let registry = JobRegistry::new();

        // Box in the bottom half cannot prompt the top view.
        let objects = vec![TrackedObject::new(
            1,
            view.side,
            BBox::new(10.0, 60.0, 18.0, 80.0),
        )];
        let result = propagate_view(
            &StubTracker::new(),
            &store,
            &view,
            &objects,
            Phase::TrackTop,
            &registry,
            "clip.mp4",
            3,
        );
        assert!(matches!(result, Err(PipelineError::InvalidRequest(_))));
    }
}

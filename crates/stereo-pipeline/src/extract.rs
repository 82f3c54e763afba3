//! Frame extraction and view splitting
//!
//! Decodes the source video once, splits every frame at the stereo seam
//! and lands the halves in the per-view frame stores. Progress is
//! reported every 50 frames to keep registry churn down on long clips.

use crate::error::PipelineResult;
use crate::progress::{JobRegistry, Phase};
use std::path::Path;
use std::sync::Arc;
use stereo_core::View;
use stereo_cv::video::{VideoIo, VideoMeta};
use stereo_cv::FrameStore;
use tracing::info;

const PROGRESS_STRIDE: usize = 50;

/// Everything downstream phases need to know about the extracted clip.
#[derive(Debug, Clone)]
pub struct ExtractedViews {
    pub meta: VideoMeta,
    pub top: View,
    pub bottom: View,
    pub frame_count: usize,
}

/// Decode `path`, split each frame and fill the two frame stores.
pub fn extract_views(
    io: &dyn VideoIo,
    path: &Path,
    job_key: &str,
    top_store: &Arc<dyn FrameStore>,
    bottom_store: &Arc<dyn FrameStore>,
    registry: &JobRegistry,
) -> PipelineResult<ExtractedViews> {
    let mut source = io.open(path)?;
    let meta = source.meta();
    let (top, bottom) = View::split(meta.width, meta.height);
    let total = meta.frame_count;

    registry.set_progress(
        job_key,
        Phase::Extraction,
        0,
        total,
        "Extracting and splitting frames...",
    );

    let mut index = 0;
    while let Some(frame) = source.next_frame()? {
        let (top_half, bottom_half) = frame.split_at_row(top.height)?;
        top_store.put(index, &top_half)?;
        bottom_store.put(index, &bottom_half)?;
        index += 1;

        if index % PROGRESS_STRIDE == 0 {
            registry.set_progress(
                job_key,
                Phase::Extraction,
                index,
                total.max(index),
                format!("Extracting frames: {index}/{total}"),
            );
        }
    }

    // Container headers can overstate the frame count; trust the decode.
    let frame_count = index;
    registry.set_progress(
        job_key,
        Phase::Extraction,
        frame_count,
        frame_count,
        format!("Extracted {frame_count} frames"),
    );
    info!(job_key, frame_count, "frame extraction finished");

    Ok(ExtractedViews {
        meta,
        top,
        bottom,
        frame_count,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use stereo_cv::sim::{synthetic_clip, MemoryVideoIo};
    use stereo_cv::MemoryFrameStore;

    #[test]
    fn test_extract_splits_and_counts() {
        let io = MemoryVideoIo::new();
        io.insert_video("clip.mp4", 30.0, synthetic_clip(64, 50, 7, &[]));

        let registry = JobRegistry::new();
        registry.try_start("clip.mp4").unwrap();
        let top_store: Arc<dyn FrameStore> = Arc::new(MemoryFrameStore::new());
        let bottom_store: Arc<dyn FrameStore> = Arc::new(MemoryFrameStore::new());

        let extracted = extract_views(
            &io,
            Path::new("clip.mp4"),
            "clip.mp4",
            &top_store,
            &bottom_store,
            &registry,
        )
        .unwrap();

        assert_eq!(extracted.frame_count, 7);
        assert_eq!(extracted.top.height, 25);
        assert_eq!(extracted.bottom.offset, 25);
        assert_eq!(top_store.len(), 7);
        assert_eq!(bottom_store.get(0).unwrap().height(), 25);

        let status = registry.get("clip.mp4").unwrap();
        assert_eq!(status.percent, Phase::Extraction.percent(7, 7));
    }

    #[test]
    fn test_extract_missing_video_errors() {
        let io = MemoryVideoIo::new();
        let registry = JobRegistry::new();
        let top_store: Arc<dyn FrameStore> = Arc::new(MemoryFrameStore::new());
        let bottom_store: Arc<dyn FrameStore> = Arc::new(MemoryFrameStore::new());

        let result = extract_views(
            &io,
            Path::new("missing.mp4"),
            "missing.mp4",
            &top_store,
            &bottom_store,
            &registry,
        );
        assert!(result.is_err());
    }
}

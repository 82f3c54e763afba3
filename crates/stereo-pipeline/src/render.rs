//! Final composition and encode
//!
//! Walks the extracted frames in order, blends each view's masks, stacks
//! the views back into full frames and streams them to the output sink.
//! Frames with no mask entry pass through untouched.

use crate::error::PipelineResult;
use crate::progress::{JobRegistry, Phase};
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use stereo_core::MaskFrame;
use stereo_cv::video::{VideoIo, VideoMeta};
use stereo_cv::{FrameStore, MaskRenderer};
use tracing::info;

pub fn render_output(
    io: &dyn VideoIo,
    output_path: &Path,
    meta: &VideoMeta,
    job_key: &str,
    top_store: &Arc<dyn FrameStore>,
    bottom_store: &Arc<dyn FrameStore>,
    top_masks: &[MaskFrame],
    bottom_masks: &[MaskFrame],
    renderer: &MaskRenderer,
    frame_count: usize,
    registry: &JobRegistry,
) -> PipelineResult<()> {
    let top_by_index: HashMap<usize, &MaskFrame> =
        top_masks.iter().map(|m| (m.frame_index, m)).collect();
    let bottom_by_index: HashMap<usize, &MaskFrame> =
        bottom_masks.iter().map(|m| (m.frame_index, m)).collect();

    let mut sink = io.create(output_path, meta)?;
    registry.set_progress(
        job_key,
        Phase::Render,
        0,
        frame_count,
        "Rendering final video...",
    );

    for index in 0..frame_count {
        let mut top = top_store.get(index)?;
        let mut bottom = bottom_store.get(index)?;

        if let Some(mask_frame) = top_by_index.get(&index) {
            renderer.apply_masks(&mut top, mask_frame);
        }
        if let Some(mask_frame) = bottom_by_index.get(&index) {
            renderer.apply_masks(&mut bottom, mask_frame);
        }

        let composed = renderer.compose(&top, &bottom)?;
        sink.write_frame(&composed)?;

        let done = index + 1;
        registry.set_progress(
            job_key,
            Phase::Render,
            done,
            frame_count,
            format!("Rendering final video: {done}/{frame_count}"),
        );
    }

    sink.finish()?;
    info!(job_key, output = %output_path.display(), frame_count, "render finished");
    Ok(())
}

//! Mask blending and stereo compositing

use crate::config::RenderingConfig;
use crate::error::{CvError, CvResult};
use crate::frame::Frame;
use stereo_core::{HighlightColor, Mask, MaskFrame};
use tracing::warn;

/// Blends object masks into frames and restacks the two views.
#[derive(Debug, Clone)]
pub struct MaskRenderer {
    config: RenderingConfig,
}

impl MaskRenderer {
    pub fn new(config: RenderingConfig) -> Self {
        Self { config }
    }

    pub fn highlight(&self) -> HighlightColor {
        self.config.highlight
    }

    /// Blend one mask into the frame: masked pixels become
    /// `alpha * color + (1 - alpha) * original`.
    pub fn blend_mask(&self, frame: &mut Frame, mask: &Mask, alpha: f32) -> CvResult<()> {
        if mask.width != frame.width() || mask.height != frame.height() {
            return Err(CvError::Rendering(format!(
                "mask {}x{} does not match frame {}x{}",
                mask.width,
                mask.height,
                frame.width(),
                frame.height()
            )));
        }

        let color = self.config.highlight;
        let blend = |orig: u8, tint: u8| -> u8 {
            (alpha * tint as f32 + (1.0 - alpha) * orig as f32).round() as u8
        };

        for y in 0..mask.height {
            for x in 0..mask.width {
                if mask.get(x, y) {
                    let (b, g, r) = frame.pixel(x, y);
                    frame.set_pixel(x, y, blend(b, color.b), blend(g, color.g), blend(r, color.r));
                }
            }
        }
        Ok(())
    }

    /// Blend every object mask of one tracker output frame, using the
    /// full-video alpha. A bad mask for one object is logged and skipped
    /// so the rest of the frame still renders.
    pub fn apply_masks(&self, frame: &mut Frame, mask_frame: &MaskFrame) -> usize {
        let mut applied = 0;
        for id in mask_frame.object_ids() {
            let mask = &mask_frame.masks[&id];
            match self.blend_mask(frame, mask, self.config.alpha) {
                Ok(()) => applied += 1,
                Err(err) => {
                    warn!(
                        object_id = id,
                        frame_index = mask_frame.frame_index,
                        error = %err,
                        "skipping unrenderable object mask"
                    );
                }
            }
        }
        applied
    }

    /// Blend masks with the single-frame preview alpha.
    pub fn apply_preview_masks(&self, frame: &mut Frame, masks: &[Mask]) -> CvResult<()> {
        for mask in masks {
            self.blend_mask(frame, mask, self.config.preview_alpha)?;
        }
        Ok(())
    }

    /// Restack rendered top and bottom views into one output frame.
    pub fn compose(&self, top: &Frame, bottom: &Frame) -> CvResult<Frame> {
        Frame::vstack(top, bottom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stereo_core::BBox;

    fn renderer() -> MaskRenderer {
        MaskRenderer::new(RenderingConfig::default())
    }

    #[test]
    fn test_blend_only_touches_masked_pixels() {
        let mut frame = Frame::new(4, 4);
        let mut mask = Mask::new(4, 4);
        mask.set(1, 1, true);

        renderer().blend_mask(&mut frame, &mask, 0.6).unwrap();

        // 0.6 * (0,165,255) over black.
        assert_eq!(frame.pixel(1, 1), (0, 99, 153));
        assert_eq!(frame.pixel(0, 0), (0, 0, 0));
    }

    #[test]
    fn test_blend_rejects_dimension_mismatch() {
        let mut frame = Frame::new(4, 4);
        let mask = Mask::new(5, 4);
        assert!(renderer().blend_mask(&mut frame, &mask, 0.6).is_err());
    }

    #[test]
    fn test_apply_masks_skips_bad_object() {
        let mut frame = Frame::new(4, 4);
        let mut mask_frame = MaskFrame::new(0);

        let mut good = Mask::new(4, 4);
        good.fill_box(BBox::new(0.0, 0.0, 2.0, 2.0));
        mask_frame.masks.insert(1, good);
        mask_frame.masks.insert(2, Mask::new(8, 8));

        let applied = renderer().apply_masks(&mut frame, &mask_frame);
        assert_eq!(applied, 1);
        assert_ne!(frame.pixel(0, 0), (0, 0, 0));
    }

    #[test]
    fn test_compose_restacks_views() {
        let top = Frame::filled(4, 2, HighlightColor::GREEN);
        let bottom = Frame::new(4, 3);
        let out = renderer().compose(&top, &bottom).unwrap();
        assert_eq!(out.height(), 5);
        assert_eq!(out.pixel(0, 0), (0, 255, 0));
        assert_eq!(out.pixel(0, 4), (0, 0, 0));
    }
}

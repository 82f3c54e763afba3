//! Region selection for the four detection modes
//!
//! A view's first frame is searched for players inside mode-dependent
//! regions: the whole frame, the field of play, a band around the line of
//! scrimmage, or a set of overlapping grid bands. Detection runs per
//! region in local coordinates; boxes are translated back and merged with
//! NMS before they become tracker prompts.

use crate::config::CvConfig;
use crate::detector::Detector;
use crate::error::CvResult;
use crate::frame::Frame;
use crate::nms::apply_nms;
use stereo_core::geometry::{band_aabb, grid_bands, Point, Quad, Region};
use stereo_core::{Detection, DetectionMode};
use tracing::{debug, warn};

/// Computes detection regions and runs region-scoped detection.
pub struct RegionSelector {
    config: CvConfig,
}

impl RegionSelector {
    pub fn new(config: CvConfig) -> Self {
        Self { config }
    }

    /// Detect players in one view's first frame under the given mode.
    ///
    /// Output boxes are in view-local coordinates, merged across regions
    /// with NMS and sorted left to right.
    pub fn detect_in_view(
        &self,
        detector: &dyn Detector,
        frame: &Frame,
        mode: &DetectionMode,
    ) -> CvResult<Vec<Detection>> {
        let regions = self.regions_for(frame, mode);
        debug!(mode = %mode, regions = regions.len(), "running region-scoped detection");

        let mut all = Vec::new();
        for region in &regions {
            let crop = frame.crop(region)?;
            let detections = detector.detect(&crop, self.config.detection.confidence_threshold)?;
            for det in detections {
                if det.class_id != self.config.detection.person_class_id {
                    continue;
                }
                all.push(Detection {
                    bbox: det.bbox.translated(region.x1 as f32, region.y1 as f32),
                    ..det
                });
            }
        }

        let mut merged = apply_nms(all, self.config.nms.iou_threshold);
        merged.sort_by(|a, b| {
            a.bbox
                .x1
                .partial_cmp(&b.bbox.x1)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        Ok(merged)
    }

    /// Detection regions for a mode, clamped to the frame. Invalid regions
    /// are dropped; every mode falls back to the field of play (or the
    /// full frame) rather than returning nothing.
    pub fn regions_for(&self, frame: &Frame, mode: &DetectionMode) -> Vec<Region> {
        let w = frame.width();
        let h = frame.height();
        let full = Region::full(w, h);

        let regions = match mode {
            DetectionMode::Full => vec![full],
            DetectionMode::FieldOfPlay => {
                let quad = estimate_field_corners(frame);
                vec![quad.aabb().expand(self.config.scrimmage.margin as i32)]
            }
            DetectionMode::LineOfScrimmage { position } => {
                let quad = estimate_field_corners(frame);
                match band_aabb(
                    &quad,
                    *position,
                    self.config.scrimmage.band_width,
                    self.config.scrimmage.margin,
                ) {
                    Some(band) => vec![band],
                    None => {
                        warn!("degenerate scrimmage band, falling back to field of play");
                        vec![quad.aabb().expand(self.config.scrimmage.margin as i32)]
                    }
                }
            }
            DetectionMode::Grid { bands, overlap } => {
                let quad = estimate_field_corners(frame);
                grid_bands(&quad, *bands, *overlap)
                    .iter()
                    .map(|band| band.aabb().expand(self.config.scrimmage.margin as i32))
                    .collect()
            }
        };

        let clamped: Vec<Region> = regions
            .into_iter()
            .map(|r| r.clamp(w, h))
            .filter(Region::is_valid)
            .collect();
        if clamped.is_empty() {
            vec![full]
        } else {
            clamped
        }
    }
}

/// Estimate the field-of-play corners from a single frame.
///
/// Looks for green-dominant turf pixels and wraps their extent in a
/// trapezoid narrowed at the far edge. When too little of the frame reads
/// as turf, falls back to a 10%-inset rectangle.
pub fn estimate_field_corners(frame: &Frame) -> Quad {
    let w = frame.width();
    let h = frame.height();
    if w == 0 || h == 0 {
        return inset_quad(w, h);
    }

    let mut min_x = u32::MAX;
    let mut max_x = 0u32;
    let mut min_y = u32::MAX;
    let mut max_y = 0u32;
    let mut green = 0usize;
    let mut sampled = 0usize;

    let step = 4;
    let mut y = 0;
    while y < h {
        let mut x = 0;
        while x < w {
            sampled += 1;
            let (b, g, r) = frame.pixel(x, y);
            if g > 40 && g > b && g > r {
                green += 1;
                min_x = min_x.min(x);
                max_x = max_x.max(x);
                min_y = min_y.min(y);
                max_y = max_y.max(y);
            }
            x += step;
        }
        y += step;
    }

    // Too little turf to trust the extent.
    if sampled == 0 || (green as f32 / sampled as f32) < 0.05 || min_x >= max_x || min_y >= max_y {
        return inset_quad(w, h);
    }

    let far_inset = 0.1 * (max_x - min_x) as f32;
    Quad {
        far_left: Point {
            x: min_x as f32 + far_inset,
            y: min_y as f32,
        },
        far_right: Point {
            x: max_x as f32 - far_inset,
            y: min_y as f32,
        },
        near_right: Point {
            x: max_x as f32,
            y: max_y as f32,
        },
        near_left: Point {
            x: min_x as f32,
            y: max_y as f32,
        },
    }
}

fn inset_quad(width: u32, height: u32) -> Quad {
    let w = width as f32;
    let h = height as f32;
    Quad {
        far_left: Point { x: 0.1 * w, y: 0.1 * h },
        far_right: Point { x: 0.9 * w, y: 0.1 * h },
        near_right: Point { x: 0.9 * w, y: 0.9 * h },
        near_left: Point { x: 0.1 * w, y: 0.9 * h },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stereo_core::{BBox, HighlightColor};

    /// Test detector reporting fixed boxes regardless of input.
    struct FixedDetector(Vec<Detection>);

    impl Detector for FixedDetector {
        fn detect(&self, _frame: &Frame, threshold: f32) -> CvResult<Vec<Detection>> {
            Ok(self
                .0
                .iter()
                .filter(|d| d.confidence >= threshold)
                .cloned()
                .collect())
        }
    }

    fn det(x1: f32, y1: f32, x2: f32, y2: f32, conf: f32) -> Detection {
        Detection {
            bbox: BBox { x1, y1, x2, y2 },
            class_id: 0,
            confidence: conf,
        }
    }

    #[test]
    fn test_full_mode_single_region() {
        let selector = RegionSelector::new(CvConfig::default());
        let frame = Frame::new(640, 360);
        let regions = selector.regions_for(&frame, &DetectionMode::Full);
        assert_eq!(regions, vec![Region::full(640, 360)]);
    }

    #[test]
    fn test_grid_mode_region_count() {
        let selector = RegionSelector::new(CvConfig::default());
        let frame = Frame::filled(640, 360, HighlightColor::GREEN);
        let regions = selector.regions_for(
            &frame,
            &DetectionMode::Grid {
                bands: 6,
                overlap: 0.2,
            },
        );
        assert_eq!(regions.len(), 6);
        for r in &regions {
            assert!(r.is_valid());
            assert!(r.x1 >= 0 && r.x2 <= 640);
        }
    }

    #[test]
    fn test_regions_never_empty() {
        let selector = RegionSelector::new(CvConfig::default());
        // Tiny frame: every inset region collapses after clamping.
        let frame = Frame::new(2, 2);
        let regions = selector.regions_for(&frame, &DetectionMode::FieldOfPlay);
        assert!(!regions.is_empty());
        assert!(regions.iter().all(Region::is_valid));
    }

    #[test]
    fn test_corner_fallback_on_dark_frame() {
        let frame = Frame::new(100, 100);
        let quad = estimate_field_corners(&frame);
        assert_eq!(quad.far_left.x, 10.0);
        assert_eq!(quad.near_right.x, 90.0);
        assert_eq!(quad.near_right.y, 90.0);
    }

    #[test]
    fn test_corners_track_green_extent() {
        let mut frame = Frame::new(100, 100);
        for y in 20..80 {
            for x in 10..90 {
                frame.set_pixel(x, y, 30, 160, 40);
            }
        }
        let quad = estimate_field_corners(&frame);
        assert!(quad.near_left.y >= 70.0);
        assert!(quad.far_left.y <= 25.0);
        assert!(quad.far_left.x > quad.near_left.x);
    }

    #[test]
    fn test_detect_sorts_left_to_right() {
        let selector = RegionSelector::new(CvConfig::default());
        let frame = Frame::new(640, 360);
        let detector = FixedDetector(vec![
            det(400.0, 10.0, 420.0, 40.0, 0.9),
            det(50.0, 10.0, 70.0, 40.0, 0.8),
        ]);
        let out = selector
            .detect_in_view(&detector, &frame, &DetectionMode::Full)
            .unwrap();
        assert_eq!(out.len(), 2);
        assert!(out[0].bbox.x1 < out[1].bbox.x1);
    }

    #[test]
    fn test_detect_filters_non_person_classes() {
        let selector = RegionSelector::new(CvConfig::default());
        let frame = Frame::new(640, 360);
        let mut ball = det(100.0, 10.0, 120.0, 30.0, 0.9);
        ball.class_id = 32;
        let detector = FixedDetector(vec![ball, det(50.0, 10.0, 70.0, 40.0, 0.8)]);
        let out = selector
            .detect_in_view(&detector, &frame, &DetectionMode::Full)
            .unwrap();
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].class_id, 0);
    }
}

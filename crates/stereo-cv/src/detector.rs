//! Object detector capability trait
//!
//! The detector model lives outside this repository. The pipeline talks to
//! it through this trait; `sim::ScanningDetector` stands in when no model
//! is wired up.

use crate::error::CvResult;
use crate::frame::Frame;
use stereo_core::Detection;

/// A person detector operating on single BGR frames.
///
/// Returned boxes are in the coordinate space of the frame passed in. When
/// the caller crops a region out of a view first, it is the caller's job to
/// translate the boxes back.
pub trait Detector: Send + Sync {
    /// Detect persons in a frame, keeping detections at or above
    /// `confidence_threshold`.
    fn detect(&self, frame: &Frame, confidence_threshold: f32) -> CvResult<Vec<Detection>>;

    /// Detect across several frames. The default runs `detect` per frame;
    /// batched backends can override.
    fn detect_batch(
        &self,
        frames: &[Frame],
        confidence_threshold: f32,
    ) -> CvResult<Vec<Vec<Detection>>> {
        frames
            .iter()
            .map(|f| self.detect(f, confidence_threshold))
            .collect()
    }
}

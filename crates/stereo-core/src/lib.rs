//! # Stereo Core
//!
//! Core domain models and types for the stereo video segmentation service.
//! This crate provides shared types used across the CV, pipeline and API
//! crates: views and coordinate spaces, bounding boxes and detections,
//! tracked objects and masks, detection modes, and job status records.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

pub mod events;
pub mod geometry;

pub use events::*;
pub use geometry::{Point, Quad, Region};

// ============================================================================
// VIEWS & COORDINATE SPACES
// ============================================================================

/// Which of the two vertically stacked camera perspectives a value
/// belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ViewSide {
    Top,
    Bottom,
}

impl fmt::Display for ViewSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ViewSide::Top => write!(f, "top"),
            ViewSide::Bottom => write!(f, "bottom"),
        }
    }
}

/// One view of the stereo frame, with the vertical pixel offset needed to
/// translate between view-local and global frame coordinates.
///
/// Invariant: `global_y = local_y + offset`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct View {
    pub side: ViewSide,
    /// Vertical offset of this view's first row in the full frame.
    pub offset: u32,
    /// View-local width in pixels (same as the full frame width).
    pub width: u32,
    /// View-local height in pixels.
    pub height: u32,
}

impl View {
    /// Split a full frame's dimensions into the top and bottom views.
    ///
    /// The top view gets `floor(height / 2)` rows at offset 0; the bottom
    /// view gets the remaining rows at offset `floor(height / 2)`, so an
    /// odd-height frame gives the extra row to the bottom view.
    pub fn split(frame_width: u32, frame_height: u32) -> (View, View) {
        let half = frame_height / 2;
        let top = View {
            side: ViewSide::Top,
            offset: 0,
            width: frame_width,
            height: half,
        };
        let bottom = View {
            side: ViewSide::Bottom,
            offset: half,
            width: frame_width,
            height: frame_height - half,
        };
        (top, bottom)
    }

    /// Translate a global-coordinate box into this view's local space.
    pub fn localize(&self, bbox: BBox) -> BBox {
        bbox.translated(0.0, -(self.offset as f32))
    }

    /// Translate a view-local box back into global frame coordinates.
    pub fn globalize(&self, bbox: BBox) -> BBox {
        bbox.translated(0.0, self.offset as f32)
    }
}

// ============================================================================
// BOXES & DETECTIONS
// ============================================================================

/// Axis-aligned bounding box in pixel coordinates (x1,y1 top-left,
/// x2,y2 bottom-right, exclusive).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BBox {
    pub x1: f32,
    pub y1: f32,
    pub x2: f32,
    pub y2: f32,
}

impl BBox {
    pub fn new(x1: f32, y1: f32, x2: f32, y2: f32) -> Self {
        Self { x1, y1, x2, y2 }
    }

    pub fn width(&self) -> f32 {
        self.x2 - self.x1
    }

    pub fn height(&self) -> f32 {
        self.y2 - self.y1
    }

    pub fn area(&self) -> f32 {
        self.width().max(0.0) * self.height().max(0.0)
    }

    pub fn is_valid(&self) -> bool {
        self.x2 > self.x1 && self.y2 > self.y1
    }

    pub fn translated(&self, dx: f32, dy: f32) -> Self {
        Self::new(self.x1 + dx, self.y1 + dy, self.x2 + dx, self.y2 + dy)
    }

    /// Check the box lies fully inside an image of the given dimensions.
    pub fn within(&self, width: u32, height: u32) -> bool {
        self.x1 >= 0.0
            && self.y1 >= 0.0
            && self.x2 <= width as f32
            && self.y2 <= height as f32
            && self.is_valid()
    }
}

/// A candidate object occurrence produced by the detector.
///
/// The bounding box is in global frame coordinates once it leaves the
/// region selector; raw detector output is local to the submitted crop.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    pub bbox: BBox,
    pub class_id: u32,
    /// Confidence in [0, 1].
    pub confidence: f32,
}

impl Detection {
    pub fn new(bbox: BBox, class_id: u32, confidence: f32) -> Self {
        Self {
            bbox,
            class_id,
            confidence,
        }
    }
}

/// An object identity seeded by one first-frame bounding box, whose mask
/// is propagated by the tracker. Ids are assigned 1..N in detection order
/// and persist only for the lifetime of one job.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrackedObject {
    pub id: u32,
    pub view: ViewSide,
    /// Initial box in global frame coordinates.
    pub bbox: BBox,
}

impl TrackedObject {
    pub fn new(id: u32, view: ViewSide, bbox: BBox) -> Self {
        Self { id, view, bbox }
    }

    /// Assign 1-based ids to a list of detections for one view, in input
    /// order.
    pub fn from_detections(view: ViewSide, detections: &[Detection]) -> Vec<TrackedObject> {
        detections
            .iter()
            .enumerate()
            .map(|(i, d)| TrackedObject::new(i as u32 + 1, view, d.bbox))
            .collect()
    }
}

// ============================================================================
// MASKS
// ============================================================================

/// A boolean foreground mask matching one view's frame dimensions.
#[derive(Debug, Clone, PartialEq)]
pub struct Mask {
    pub width: u32,
    pub height: u32,
    data: Vec<bool>,
}

impl Mask {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            data: vec![false; (width * height) as usize],
        }
    }

    pub fn get(&self, x: u32, y: u32) -> bool {
        self.data[(y * self.width + x) as usize]
    }

    pub fn set(&mut self, x: u32, y: u32, value: bool) {
        self.data[(y * self.width + x) as usize] = value;
    }

    /// Mark every pixel of a box (clamped to the mask bounds) as foreground.
    pub fn fill_box(&mut self, bbox: BBox) {
        let x1 = bbox.x1.max(0.0) as u32;
        let y1 = bbox.y1.max(0.0) as u32;
        let x2 = (bbox.x2.min(self.width as f32)).max(0.0) as u32;
        let y2 = (bbox.y2.min(self.height as f32)).max(0.0) as u32;
        for y in y1..y2 {
            for x in x1..x2 {
                self.set(x, y, true);
            }
        }
    }

    pub fn any(&self) -> bool {
        self.data.iter().any(|&v| v)
    }

    pub fn count(&self) -> usize {
        self.data.iter().filter(|&&v| v).count()
    }
}

/// Per-frame tracker output: a mapping from object id to its mask for one
/// (view, frame index) pair. Produced incrementally by the tracker,
/// consumed by the compositor, not retained after the job completes.
#[derive(Debug, Clone)]
pub struct MaskFrame {
    pub frame_index: usize,
    pub masks: HashMap<u32, Mask>,
}

impl MaskFrame {
    pub fn new(frame_index: usize) -> Self {
        Self {
            frame_index,
            masks: HashMap::new(),
        }
    }

    pub fn object_ids(&self) -> Vec<u32> {
        let mut ids: Vec<u32> = self.masks.keys().copied().collect();
        ids.sort_unstable();
        ids
    }
}

// ============================================================================
// DETECTION MODES
// ============================================================================

/// Region-of-interest strategy for first-frame detection.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum DetectionMode {
    /// Entire view image.
    Full,
    /// AABB of the supplied field quadrilateral.
    FieldOfPlay,
    /// Perspective-interpolated band between the far and near edges,
    /// positioned at `position` in [0, 1] (midfield when omitted).
    LineOfScrimmage {
        #[serde(default = "default_scrimmage_position")]
        position: f32,
    },
    /// N overlapping bands covering the quadrilateral, detected
    /// independently and merged via NMS.
    Grid { bands: usize, overlap: f32 },
}

fn default_scrimmage_position() -> f32 {
    0.5
}

impl Default for DetectionMode {
    fn default() -> Self {
        Self::FieldOfPlay
    }
}

impl fmt::Display for DetectionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DetectionMode::Full => write!(f, "full"),
            DetectionMode::FieldOfPlay => write!(f, "field_of_play"),
            DetectionMode::LineOfScrimmage { position } => {
                write!(f, "line_of_scrimmage(t={position:.2})")
            }
            DetectionMode::Grid { bands, overlap } => {
                write!(f, "grid(bands={bands}, overlap={overlap:.2})")
            }
        }
    }
}

// ============================================================================
// HIGHLIGHT COLORS
// ============================================================================

/// BGR color used when blending object masks into output frames.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HighlightColor {
    pub b: u8,
    pub g: u8,
    pub r: u8,
}

impl HighlightColor {
    /// Bright orange, the full-pipeline highlight.
    pub const ORANGE: Self = Self { b: 0, g: 165, r: 255 };
    /// Green, used by the legacy single-view path.
    pub const GREEN: Self = Self { b: 0, g: 255, r: 0 };

    pub fn new(b: u8, g: u8, r: u8) -> Self {
        Self { b, g, r }
    }
}

impl Default for HighlightColor {
    fn default() -> Self {
        Self::ORANGE
    }
}

// ============================================================================
// JOB STATUS
// ============================================================================

/// Lifecycle state of one long-running segmentation job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobState {
    Starting,
    Processing,
    Completed,
    Error,
}

impl fmt::Display for JobState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JobState::Starting => write!(f, "starting"),
            JobState::Processing => write!(f, "processing"),
            JobState::Completed => write!(f, "completed"),
            JobState::Error => write!(f, "error"),
        }
    }
}

/// The single progress/result record describing one full-video job.
///
/// Overwritten wholesale or field-wise by each pipeline stage and read by
/// a polling collaborator; no history is kept.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobStatus {
    pub status: JobState,
    pub message: String,
    pub current_frame: usize,
    pub total_frames: usize,
    pub percent: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl JobStatus {
    /// Fresh status for a job that has been accepted but not yet started.
    pub fn starting() -> Self {
        Self {
            status: JobState::Starting,
            message: "Initializing full video segmentation...".into(),
            current_frame: 0,
            total_frames: 0,
            percent: 0,
            result_url: None,
            error: None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self.status, JobState::Completed | JobState::Error)
    }

    pub fn is_running(&self) -> bool {
        matches!(self.status, JobState::Starting | JobState::Processing)
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_view_split_even_height() {
        let (top, bottom) = View::split(1280, 720);
        assert_eq!(top.offset, 0);
        assert_eq!(top.height, 360);
        assert_eq!(bottom.offset, 360);
        assert_eq!(bottom.height, 360);
    }

    #[test]
    fn test_view_split_odd_height_gives_bottom_extra_row() {
        let (top, bottom) = View::split(1280, 721);
        assert_eq!(top.height, 360);
        assert_eq!(bottom.offset, 360);
        assert_eq!(bottom.height, 361);
        assert_eq!(top.height + bottom.height, 721);
    }

    #[test]
    fn test_coordinate_round_trip() {
        let (_, bottom) = View::split(1280, 720);
        let local = BBox::new(10.0, 20.0, 110.0, 220.0);
        let round_tripped = bottom.localize(bottom.globalize(local));
        assert_eq!(round_tripped, local);
    }

    #[test]
    fn test_tracked_object_ids_are_one_based() {
        let detections = vec![
            Detection::new(BBox::new(0.0, 0.0, 10.0, 10.0), 0, 0.9),
            Detection::new(BBox::new(20.0, 0.0, 30.0, 10.0), 0, 0.8),
        ];
        let objects = TrackedObject::from_detections(ViewSide::Top, &detections);
        assert_eq!(objects[0].id, 1);
        assert_eq!(objects[1].id, 2);
    }

    #[test]
    fn test_mask_fill_box_clamps() {
        let mut mask = Mask::new(10, 10);
        mask.fill_box(BBox::new(-5.0, -5.0, 3.0, 3.0));
        assert!(mask.get(0, 0));
        assert!(mask.get(2, 2));
        assert!(!mask.get(3, 3));
        assert_eq!(mask.count(), 9);
    }

    #[test]
    fn test_job_status_lifecycle_flags() {
        let mut status = JobStatus::starting();
        assert!(status.is_running());
        status.status = JobState::Completed;
        assert!(status.is_terminal());
    }

    #[test]
    fn test_detection_mode_serde_tag() {
        let mode: DetectionMode =
            serde_json::from_str(r#"{"mode":"line_of_scrimmage","position":0.3}"#).unwrap();
        assert_eq!(mode, DetectionMode::LineOfScrimmage { position: 0.3 });
    }

    #[test]
    fn test_scrimmage_mode_defaults_to_midfield() {
        let mode: DetectionMode = serde_json::from_str(r#"{"mode":"line_of_scrimmage"}"#).unwrap();
        assert_eq!(mode, DetectionMode::LineOfScrimmage { position: 0.5 });
    }
}

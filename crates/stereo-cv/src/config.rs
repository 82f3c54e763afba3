//! Configuration for the CV layer

use serde::{Deserialize, Serialize};
use stereo_core::HighlightColor;

/// Configuration for region selection, detection and rendering
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CvConfig {
    /// Detector settings
    pub detection: DetectionConfig,
    /// Non-maximum suppression settings
    pub nms: NmsConfig,
    /// Line-of-scrimmage band settings
    pub scrimmage: ScrimmageConfig,
    /// Grid-mode band settings
    pub grid: GridConfig,
    /// Mask blending settings
    pub rendering: RenderingConfig,
}

impl Default for CvConfig {
    fn default() -> Self {
        Self {
            detection: DetectionConfig::default(),
            nms: NmsConfig::default(),
            scrimmage: ScrimmageConfig::default(),
            grid: GridConfig::default(),
            rendering: RenderingConfig::default(),
        }
    }
}

/// Detector configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetectionConfig {
    /// Minimum confidence for a detection to be kept. Low by default so
    /// small, distant players survive.
    pub confidence_threshold: f32,
    /// COCO class id to keep (0 = person).
    pub person_class_id: u32,
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            confidence_threshold: 0.05,
            person_class_id: 0,
        }
    }
}

/// Non-maximum suppression configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NmsConfig {
    /// Detections with IoU at or above this threshold against a kept box
    /// are suppressed.
    pub iou_threshold: f32,
}

impl Default for NmsConfig {
    fn default() -> Self {
        Self { iou_threshold: 0.45 }
    }
}

/// Line-of-scrimmage band configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScrimmageConfig {
    /// Band width in pixels at the near edge.
    pub band_width: f32,
    /// Extra pixels added to each side of the band's AABB.
    pub margin: f32,
}

impl Default for ScrimmageConfig {
    fn default() -> Self {
        Self {
            band_width: 200.0,
            margin: 20.0,
        }
    }
}

/// Grid-mode configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GridConfig {
    /// Number of overlapping bands when the caller does not supply one.
    pub bands: usize,
    /// Fractional overlap between adjacent bands.
    pub overlap: f32,
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            bands: 6,
            overlap: 0.2,
        }
    }
}

/// Mask blending configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenderingConfig {
    /// Highlight color blended into masked pixels.
    pub highlight: HighlightColor,
    /// Color weight for the full-video path (0.6 color / 0.4 original).
    pub alpha: f32,
    /// Color weight for the single-frame preview path.
    pub preview_alpha: f32,
}

impl Default for RenderingConfig {
    fn default() -> Self {
        Self {
            highlight: HighlightColor::ORANGE,
            alpha: 0.6,
            preview_alpha: 0.5,
        }
    }
}

impl CvConfig {
    /// Preset tuned for small, distant objects: denser grid and an even
    /// lower confidence floor.
    pub fn distant_objects() -> Self {
        Self {
            detection: DetectionConfig {
                confidence_threshold: 0.03,
                ..Default::default()
            },
            grid: GridConfig {
                bands: 10,
                overlap: 0.2,
            },
            ..Default::default()
        }
    }
}

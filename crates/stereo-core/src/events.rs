//! Experiment timeline event types
//!
//! Audit-trail records appended to the experiment log side channel as a
//! job moves through its phases. The core never reads these back.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use uuid::Uuid;

/// Pipeline step recorded on an experiment timeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimelineStep {
    VideoUploaded,
    CornersDetected,
    ObjectsDetected,
    PreviewSegmented,
    SegmentationStarted,
    SegmentationCompleted,
    SegmentationFailed,
}

/// One append-only timeline entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimelineEvent {
    pub id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub step: TimelineStep,
    pub detail: serde_json::Value,
}

impl TimelineEvent {
    pub fn new(step: TimelineStep, detail: serde_json::Value) -> Self {
        Self {
            id: Uuid::new_v4(),
            timestamp: Utc::now(),
            step,
            detail,
        }
    }

    pub fn segmentation_started(filename: &str, top_objects: usize, bottom_objects: usize) -> Self {
        Self::new(
            TimelineStep::SegmentationStarted,
            json!({
                "filename": filename,
                "top_objects": top_objects,
                "bottom_objects": bottom_objects,
            }),
        )
    }

    pub fn segmentation_completed(filename: &str, total_frames: usize) -> Self {
        Self::new(
            TimelineStep::SegmentationCompleted,
            json!({ "filename": filename, "total_frames": total_frames }),
        )
    }

    pub fn segmentation_failed(filename: &str, error: &str) -> Self {
        Self::new(
            TimelineStep::SegmentationFailed,
            json!({ "filename": filename, "error": error }),
        )
    }

    pub fn objects_detected(filename: &str, top: usize, bottom: usize, similarity: f32) -> Self {
        Self::new(
            TimelineStep::ObjectsDetected,
            json!({
                "filename": filename,
                "top_count": top,
                "bottom_count": bottom,
                "similarity": similarity,
            }),
        )
    }
}

/// Role of a video referenced by an experiment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VideoKind {
    Source,
    Processed,
    Preview,
}

/// Reference to a video attached to an experiment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VideoRef {
    pub url: String,
    pub kind: VideoKind,
    pub added_at: DateTime<Utc>,
}

impl VideoRef {
    pub fn new(url: impl Into<String>, kind: VideoKind) -> Self {
        Self {
            url: url.into(),
            kind,
            added_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timeline_event_detail() {
        let event = TimelineEvent::segmentation_started("match.mp4", 3, 2);
        assert_eq!(event.step, TimelineStep::SegmentationStarted);
        assert_eq!(event.detail["top_objects"], 3);
    }

    #[test]
    fn test_video_ref_kind_serde() {
        let video = VideoRef::new("http://localhost/video/out.mp4", VideoKind::Processed);
        let encoded = serde_json::to_string(&video).unwrap();
        assert!(encoded.contains("\"processed\""));
    }
}

//! Simulation-grade implementations of the capability traits
//!
//! Runs the whole pipeline with no model assets and no system OpenCV:
//! videos live in memory, the detector scans for red-dominant player
//! blobs, and the tracker turns first-frame prompts into box-fill masks.
//! Used by tests and by the API's simulation mode.

use crate::detector::Detector;
use crate::error::{CvError, CvResult};
use crate::frame::{Frame, FrameStore};
use crate::tracker::{MaskStream, MaskTracker, TrackerSession};
use crate::video::{VideoIo, VideoMeta, VideoSink, VideoSource};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use stereo_core::{BBox, Detection, HighlightColor, Mask, MaskFrame};

// ============================================================================
// IN-MEMORY VIDEO IO
// ============================================================================

/// A decoded video held in memory.
#[derive(Debug, Clone)]
pub struct StoredVideo {
    pub meta: VideoMeta,
    pub frames: Vec<Frame>,
}

/// Video IO backed by a shared in-memory map from path to video.
#[derive(Default, Clone)]
pub struct MemoryVideoIo {
    videos: Arc<RwLock<HashMap<PathBuf, StoredVideo>>>,
}

impl MemoryVideoIo {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_video(&self, path: impl Into<PathBuf>, fps: f64, frames: Vec<Frame>) {
        let meta = VideoMeta {
            fps,
            width: frames.first().map(Frame::width).unwrap_or(0),
            height: frames.first().map(Frame::height).unwrap_or(0),
            frame_count: frames.len(),
        };
        self.videos
            .write()
            .insert(path.into(), StoredVideo { meta, frames });
    }

    /// Fetch a stored video for assertions.
    pub fn video(&self, path: impl AsRef<Path>) -> Option<StoredVideo> {
        self.videos.read().get(path.as_ref()).cloned()
    }
}

impl VideoIo for MemoryVideoIo {
    fn exists(&self, path: &Path) -> bool {
        self.videos.read().contains_key(path)
    }

    fn open(&self, path: &Path) -> CvResult<Box<dyn VideoSource>> {
        let video = self
            .videos
            .read()
            .get(path)
            .cloned()
            .ok_or_else(|| CvError::codec(format!("no such video {}", path.display())))?;
        Ok(Box::new(MemorySource { video, cursor: 0 }))
    }

    fn create(&self, path: &Path, meta: &VideoMeta) -> CvResult<Box<dyn VideoSink>> {
        Ok(Box::new(MemorySink {
            videos: Arc::clone(&self.videos),
            path: path.to_path_buf(),
            meta: *meta,
            frames: Vec::new(),
        }))
    }

    fn copy(&self, src: &Path, dst: &Path) -> CvResult<()> {
        let video = self
            .videos
            .read()
            .get(src)
            .cloned()
            .ok_or_else(|| CvError::codec(format!("no such video {}", src.display())))?;
        self.videos.write().insert(dst.to_path_buf(), video);
        Ok(())
    }
}

struct MemorySource {
    video: StoredVideo,
    cursor: usize,
}

impl VideoSource for MemorySource {
    fn meta(&self) -> VideoMeta {
        self.video.meta
    }

    fn next_frame(&mut self) -> CvResult<Option<Frame>> {
        let frame = self.video.frames.get(self.cursor).cloned();
        self.cursor += 1;
        Ok(frame)
    }
}

struct MemorySink {
    videos: Arc<RwLock<HashMap<PathBuf, StoredVideo>>>,
    path: PathBuf,
    meta: VideoMeta,
    frames: Vec<Frame>,
}

impl VideoSink for MemorySink {
    fn write_frame(&mut self, frame: &Frame) -> CvResult<()> {
        self.frames.push(frame.clone());
        Ok(())
    }

    fn finish(self: Box<Self>) -> CvResult<()> {
        let mut meta = self.meta;
        meta.frame_count = self.frames.len();
        self.videos.write().insert(
            self.path,
            StoredVideo {
                meta,
                frames: self.frames,
            },
        );
        Ok(())
    }
}

// ============================================================================
// SCANNING DETECTOR
// ============================================================================

/// Detector that finds red-dominant blobs, the "players" drawn by the
/// synthetic frame helpers.
#[derive(Default)]
pub struct ScanningDetector;

impl ScanningDetector {
    pub fn new() -> Self {
        Self
    }

    fn is_player_pixel(frame: &Frame, x: u32, y: u32) -> bool {
        let (b, g, r) = frame.pixel(x, y);
        r > 180 && g < 100 && b < 100
    }
}

impl Detector for ScanningDetector {
    fn detect(&self, frame: &Frame, confidence_threshold: f32) -> CvResult<Vec<Detection>> {
        let w = frame.width();
        let h = frame.height();
        let mut visited = vec![false; (w * h) as usize];
        let mut detections = Vec::new();

        for y in 0..h {
            for x in 0..w {
                let idx = (y * w + x) as usize;
                if visited[idx] || !Self::is_player_pixel(frame, x, y) {
                    continue;
                }

                // Flood fill one blob, tracking its extent.
                let (mut min_x, mut max_x, mut min_y, mut max_y) = (x, x, y, y);
                let mut stack = vec![(x, y)];
                visited[idx] = true;
                while let Some((cx, cy)) = stack.pop() {
                    min_x = min_x.min(cx);
                    max_x = max_x.max(cx);
                    min_y = min_y.min(cy);
                    max_y = max_y.max(cy);
                    let neighbors = [
                        (cx.wrapping_sub(1), cy),
                        (cx + 1, cy),
                        (cx, cy.wrapping_sub(1)),
                        (cx, cy + 1),
                    ];
                    for (nx, ny) in neighbors {
                        if nx < w && ny < h {
                            let nidx = (ny * w + nx) as usize;
                            if !visited[nidx] && Self::is_player_pixel(frame, nx, ny) {
                                visited[nidx] = true;
                                stack.push((nx, ny));
                            }
                        }
                    }
                }

                detections.push(Detection::new(
                    BBox::new(
                        min_x as f32,
                        min_y as f32,
                        (max_x + 1) as f32,
                        (max_y + 1) as f32,
                    ),
                    0,
                    0.9,
                ));
            }
        }

        Ok(detections
            .into_iter()
            .filter(|d| d.confidence >= confidence_threshold)
            .collect())
    }
}

// ============================================================================
// STUB TRACKER
// ============================================================================

/// Tracker that fills each prompt box as that object's mask on every
/// frame. No motion model; enough to exercise the pipeline end to end.
#[derive(Default)]
pub struct StubTracker;

impl StubTracker {
    pub fn new() -> Self {
        Self
    }
}

impl MaskTracker for StubTracker {
    fn init_session(&self, frames: &dyn FrameStore) -> CvResult<Box<dyn TrackerSession>> {
        if frames.is_empty() {
            return Err(CvError::tracker_init("frame store is empty"));
        }
        let first = frames.get(0)?;
        Ok(Box::new(StubSession {
            width: first.width(),
            height: first.height(),
            frame_count: frames.len(),
            prompts: Vec::new(),
        }))
    }
}

struct StubSession {
    width: u32,
    height: u32,
    frame_count: usize,
    prompts: Vec<(u32, BBox)>,
}

impl TrackerSession for StubSession {
    fn add_box(&mut self, object_id: u32, bbox: &BBox) -> CvResult<()> {
        if !bbox.is_valid() {
            return Err(CvError::tracker_init(format!(
                "invalid prompt box for object {object_id}"
            )));
        }
        self.prompts.push((object_id, *bbox));
        Ok(())
    }

    fn propagate(self: Box<Self>) -> CvResult<MaskStream> {
        let Self {
            width,
            height,
            frame_count,
            prompts,
        } = *self;
        let iter = (0..frame_count).map(move |frame_index| {
            let mut mask_frame = MaskFrame::new(frame_index);
            for (id, bbox) in &prompts {
                let mut mask = Mask::new(width, height);
                mask.fill_box(*bbox);
                mask_frame.masks.insert(*id, mask);
            }
            Ok(mask_frame)
        });
        Ok(Box::new(iter))
    }
}

// ============================================================================
// SYNTHETIC FRAMES
// ============================================================================

/// Turf green used by the synthetic frames.
pub const TURF: HighlightColor = HighlightColor { b: 30, g: 160, r: 40 };
/// Jersey red the scanning detector keys on.
pub const JERSEY: HighlightColor = HighlightColor { b: 20, g: 20, r: 230 };

/// A turf-colored frame with solid player boxes drawn on it.
pub fn synthetic_field_frame(width: u32, height: u32, players: &[BBox]) -> Frame {
    let mut frame = Frame::filled(width, height, TURF);
    for bbox in players {
        let x1 = bbox.x1.max(0.0) as u32;
        let y1 = bbox.y1.max(0.0) as u32;
        let x2 = (bbox.x2.min(width as f32)).max(0.0) as u32;
        let y2 = (bbox.y2.min(height as f32)).max(0.0) as u32;
        for y in y1..y2 {
            for x in x1..x2 {
                frame.set_pixel(x, y, JERSEY.b, JERSEY.g, JERSEY.r);
            }
        }
    }
    frame
}

/// A fixed-camera clip: the same player layout on every frame. Boxes are
/// in global frame coordinates.
pub fn synthetic_clip(width: u32, height: u32, frames: usize, players: &[BBox]) -> Vec<Frame> {
    (0..frames)
        .map(|_| synthetic_field_frame(width, height, players))
        .collect()
}

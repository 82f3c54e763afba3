//! # Stereo CV - Computer Vision Layer
//!
//! Vision primitives for the stereo segmentation pipeline:
//! - In-memory BGR frame buffers and scratch frame stores
//! - Non-maximum suppression for detection deduplication
//! - Region selection for the four detection modes
//! - Field-corner estimation from the first frame
//! - Capability traits for the external object detector and mask tracker
//! - Mask blending and top/bottom compositing
//! - Video decode/encode traits, OpenCV-backed behind the `opencv` feature
//!
//! The ML models themselves live outside this repository; `sim` provides
//! simulation-grade implementations so the full pipeline runs without
//! model assets or system OpenCV.

pub mod config;
pub mod detector;
pub mod error;
pub mod frame;
pub mod nms;
pub mod regions;
pub mod renderer;
pub mod sim;
pub mod tracker;
pub mod video;

pub use config::CvConfig;
pub use detector::Detector;
pub use error::{CvError, CvResult};
pub use frame::{Frame, FrameStore, FrameStoreProvider, MemoryFrameStore, MemoryStoreProvider};
pub use nms::apply_nms;
pub use regions::RegionSelector;
pub use renderer::MaskRenderer;
pub use tracker::{MaskStream, MaskTracker, TrackerSession};
pub use video::{VideoIo, VideoMeta, VideoSink, VideoSource};

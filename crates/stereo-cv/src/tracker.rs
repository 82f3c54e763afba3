//! Mask tracker capability traits
//!
//! The video mask tracker is prompted with boxes on the first frame of a
//! view, then propagates per-object masks across every stored frame. A
//! session is single pass: `propagate` consumes it, and a new session must
//! be initialized to run the same frames again.

use crate::error::CvResult;
use crate::frame::FrameStore;
use stereo_core::{BBox, MaskFrame};

/// Per-frame mask output. Yields frames in index order.
pub type MaskStream = Box<dyn Iterator<Item = CvResult<MaskFrame>> + Send>;

/// A tracker session bound to one view's frame store.
pub trait TrackerSession: Send {
    /// Register an object prompt: a box on frame zero with the id the
    /// resulting masks are keyed by.
    fn add_box(&mut self, object_id: u32, bbox: &BBox) -> CvResult<()>;

    /// Propagate masks across all frames. Consumes the session; tracker
    /// backends hold per-run state that cannot be rewound.
    fn propagate(self: Box<Self>) -> CvResult<MaskStream>;
}

/// Factory for tracker sessions.
pub trait MaskTracker: Send + Sync {
    fn init_session(&self, frames: &dyn FrameStore) -> CvResult<Box<dyn TrackerSession>>;
}

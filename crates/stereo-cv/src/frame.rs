//! BGR frame buffers and scratch frame storage
//!
//! Frames are owned, row-major, 3-byte BGR buffers — the working currency
//! of the pipeline. A `FrameStore` holds one view's extracted frames
//! between the extraction, propagation and render phases; the in-memory
//! store is always available, the on-disk JPEG store needs the `opencv`
//! feature.

use crate::error::{CvError, CvResult};
use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::path::PathBuf;
use stereo_core::{HighlightColor, Region};

/// An owned BGR image buffer.
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    width: u32,
    height: u32,
    data: Vec<u8>,
}

impl Frame {
    /// A black frame of the given dimensions.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            data: vec![0; (width * height * 3) as usize],
        }
    }

    /// A frame filled with a solid color.
    pub fn filled(width: u32, height: u32, color: HighlightColor) -> Self {
        let mut frame = Self::new(width, height);
        for chunk in frame.data.chunks_exact_mut(3) {
            chunk[0] = color.b;
            chunk[1] = color.g;
            chunk[2] = color.r;
        }
        frame
    }

    /// Wrap an existing BGR buffer. The buffer length must be
    /// `width * height * 3`.
    pub fn from_data(width: u32, height: u32, data: Vec<u8>) -> CvResult<Self> {
        if data.len() != (width * height * 3) as usize {
            return Err(CvError::invalid_region(format!(
                "buffer length {} does not match {}x{} BGR frame",
                data.len(),
                width,
                height
            )));
        }
        Ok(Self {
            width,
            height,
            data,
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn pixel(&self, x: u32, y: u32) -> (u8, u8, u8) {
        let i = ((y * self.width + x) * 3) as usize;
        (self.data[i], self.data[i + 1], self.data[i + 2])
    }

    pub fn set_pixel(&mut self, x: u32, y: u32, b: u8, g: u8, r: u8) {
        let i = ((y * self.width + x) * 3) as usize;
        self.data[i] = b;
        self.data[i + 1] = g;
        self.data[i + 2] = r;
    }

    /// Copy out a sub-rectangle. The region must be valid and inside the
    /// frame (clamp it first).
    pub fn crop(&self, region: &Region) -> CvResult<Frame> {
        if !region.is_valid()
            || region.x1 < 0
            || region.y1 < 0
            || region.x2 > self.width as i32
            || region.y2 > self.height as i32
        {
            return Err(CvError::invalid_region(format!(
                "crop {:?} outside {}x{} frame",
                region, self.width, self.height
            )));
        }
        let w = region.width() as u32;
        let h = region.height() as u32;
        let mut out = Frame::new(w, h);
        for row in 0..h {
            let src_y = region.y1 as u32 + row;
            let src_start = ((src_y * self.width + region.x1 as u32) * 3) as usize;
            let src_end = src_start + (w * 3) as usize;
            let dst_start = (row * w * 3) as usize;
            out.data[dst_start..dst_start + (w * 3) as usize]
                .copy_from_slice(&self.data[src_start..src_end]);
        }
        Ok(out)
    }

    /// Split into top rows `[0, row)` and bottom rows `[row, height)`.
    pub fn split_at_row(&self, row: u32) -> CvResult<(Frame, Frame)> {
        if row == 0 || row >= self.height {
            return Err(CvError::invalid_region(format!(
                "split row {} outside frame height {}",
                row, self.height
            )));
        }
        let top = self.crop(&Region::new(0, 0, self.width as i32, row as i32))?;
        let bottom = self.crop(&Region::new(
            0,
            row as i32,
            self.width as i32,
            self.height as i32,
        ))?;
        Ok((top, bottom))
    }

    /// Stack two frames vertically, top over bottom.
    pub fn vstack(top: &Frame, bottom: &Frame) -> CvResult<Frame> {
        if top.width != bottom.width {
            return Err(CvError::invalid_region(format!(
                "cannot stack frames of widths {} and {}",
                top.width, bottom.width
            )));
        }
        let mut data = Vec::with_capacity(top.data.len() + bottom.data.len());
        data.extend_from_slice(&top.data);
        data.extend_from_slice(&bottom.data);
        Frame::from_data(top.width, top.height + bottom.height, data)
    }
}

// ============================================================================
// FRAME STORES
// ============================================================================

/// Scratch storage for one view's extracted frames.
///
/// Frames are keyed by their zero-based index; `clear` is the best-effort
/// cleanup the orchestrator runs on every job exit path.
pub trait FrameStore: Send + Sync {
    fn put(&self, index: usize, frame: &Frame) -> CvResult<()>;
    fn get(&self, index: usize) -> CvResult<Frame>;
    fn len(&self) -> usize;
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
    fn clear(&self) -> CvResult<()>;
    /// On-disk stores expose their directory so directory-based trackers
    /// can read the frame sequence directly.
    fn scratch_dir(&self) -> Option<PathBuf>;
}

/// In-memory frame store. Used by the simulation stack and tests, and as
/// the fallback when no scratch directory is configured.
#[derive(Default)]
pub struct MemoryFrameStore {
    frames: RwLock<BTreeMap<usize, Frame>>,
}

impl MemoryFrameStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl FrameStore for MemoryFrameStore {
    fn put(&self, index: usize, frame: &Frame) -> CvResult<()> {
        self.frames.write().insert(index, frame.clone());
        Ok(())
    }

    fn get(&self, index: usize) -> CvResult<Frame> {
        self.frames
            .read()
            .get(&index)
            .cloned()
            .ok_or_else(|| CvError::frame_store(format!("frame {index} not in store")))
    }

    fn len(&self) -> usize {
        self.frames.read().len()
    }

    fn clear(&self) -> CvResult<()> {
        self.frames.write().clear();
        Ok(())
    }

    fn scratch_dir(&self) -> Option<PathBuf> {
        None
    }
}

/// On-disk frame store writing `{index:05}.jpg` files, the layout the
/// directory-based mask tracker expects.
#[cfg(feature = "opencv")]
pub struct DiskFrameStore {
    dir: PathBuf,
    count: RwLock<usize>,
}

#[cfg(feature = "opencv")]
impl DiskFrameStore {
    /// Create the store, wiping any leftover frames from a previous run.
    pub fn create(dir: impl Into<PathBuf>) -> CvResult<Self> {
        let dir = dir.into();
        if dir.exists() {
            std::fs::remove_dir_all(&dir)?;
        }
        std::fs::create_dir_all(&dir)?;
        Ok(Self {
            dir,
            count: RwLock::new(0),
        })
    }

    fn frame_path(&self, index: usize) -> PathBuf {
        self.dir.join(format!("{index:05}.jpg"))
    }
}

#[cfg(feature = "opencv")]
impl FrameStore for DiskFrameStore {
    fn put(&self, index: usize, frame: &Frame) -> CvResult<()> {
        use opencv::core::{Mat, Vector};
        use opencv::imgcodecs;

        let mat = Mat::from_slice(frame.data())?
            .reshape(3, frame.height() as i32)?
            .try_clone()?;
        imgcodecs::imwrite(
            self.frame_path(index)
                .to_str()
                .ok_or_else(|| CvError::frame_store("non-UTF8 scratch path"))?,
            &mat,
            &Vector::new(),
        )?;
        let mut count = self.count.write();
        *count = (*count).max(index + 1);
        Ok(())
    }

    fn get(&self, index: usize) -> CvResult<Frame> {
        use opencv::imgcodecs;
        use opencv::prelude::*;

        let path = self.frame_path(index);
        let mat = imgcodecs::imread(
            path.to_str()
                .ok_or_else(|| CvError::frame_store("non-UTF8 scratch path"))?,
            imgcodecs::IMREAD_COLOR,
        )?;
        if mat.empty() {
            return Err(CvError::frame_store(format!(
                "frame {index} missing from {}",
                self.dir.display()
            )));
        }
        let width = mat.cols() as u32;
        let height = mat.rows() as u32;
        let data = mat.data_bytes()?.to_vec();
        Frame::from_data(width, height, data)
    }

    fn len(&self) -> usize {
        *self.count.read()
    }

    fn clear(&self) -> CvResult<()> {
        if self.dir.exists() {
            std::fs::remove_dir_all(&self.dir)?;
        }
        *self.count.write() = 0;
        Ok(())
    }

    fn scratch_dir(&self) -> Option<PathBuf> {
        Some(self.dir.clone())
    }
}

/// Creates one frame store per (job, view) pair.
pub trait FrameStoreProvider: Send + Sync {
    fn create(&self, job_key: &str, label: &str) -> CvResult<std::sync::Arc<dyn FrameStore>>;
}

/// Provider handing out in-memory stores.
#[derive(Default)]
pub struct MemoryStoreProvider;

impl FrameStoreProvider for MemoryStoreProvider {
    fn create(&self, _job_key: &str, _label: &str) -> CvResult<std::sync::Arc<dyn FrameStore>> {
        Ok(std::sync::Arc::new(MemoryFrameStore::new()))
    }
}

/// Provider creating per-job scratch directories under a root, mirroring
/// the `temp_frames/<job>/<view>` layout.
#[cfg(feature = "opencv")]
pub struct DiskStoreProvider {
    root: PathBuf,
}

#[cfg(feature = "opencv")]
impl DiskStoreProvider {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

#[cfg(feature = "opencv")]
impl FrameStoreProvider for DiskStoreProvider {
    fn create(&self, job_key: &str, label: &str) -> CvResult<std::sync::Arc<dyn FrameStore>> {
        let stem = std::path::Path::new(job_key)
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or(job_key);
        let dir = self.root.join(stem).join(label);
        Ok(std::sync::Arc::new(DiskFrameStore::create(dir)?))
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_crop_copies_expected_pixels() {
        let mut frame = Frame::new(8, 8);
        frame.set_pixel(3, 2, 10, 20, 30);
        let crop = frame.crop(&Region::new(2, 1, 6, 5)).unwrap();
        assert_eq!(crop.width(), 4);
        assert_eq!(crop.height(), 4);
        assert_eq!(crop.pixel(1, 1), (10, 20, 30));
    }

    #[test]
    fn test_crop_rejects_out_of_bounds() {
        let frame = Frame::new(8, 8);
        assert!(frame.crop(&Region::new(0, 0, 9, 8)).is_err());
        assert!(frame.crop(&Region::new(4, 4, 4, 8)).is_err());
    }

    #[test]
    fn test_split_and_vstack_round_trip() {
        let mut frame = Frame::new(4, 6);
        frame.set_pixel(0, 0, 1, 2, 3);
        frame.set_pixel(3, 5, 4, 5, 6);

        let (top, bottom) = frame.split_at_row(3).unwrap();
        assert_eq!(top.height(), 3);
        assert_eq!(bottom.height(), 3);

        let restacked = Frame::vstack(&top, &bottom).unwrap();
        assert_eq!(restacked, frame);
    }

    #[test]
    fn test_vstack_width_mismatch() {
        let a = Frame::new(4, 2);
        let b = Frame::new(5, 2);
        assert!(Frame::vstack(&a, &b).is_err());
    }

    #[test]
    fn test_memory_store_round_trip() {
        let store = MemoryFrameStore::new();
        let frame = Frame::filled(4, 4, HighlightColor::GREEN);
        store.put(0, &frame).unwrap();
        store.put(1, &frame).unwrap();

        assert_eq!(store.len(), 2);
        assert_eq!(store.get(1).unwrap(), frame);
        assert!(store.get(2).is_err());

        store.clear().unwrap();
        assert!(store.is_empty());
    }
}

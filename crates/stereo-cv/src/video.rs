//! Video decode/encode traits
//!
//! The pipeline reads and writes videos only through these traits. The
//! OpenCV-backed implementation lives behind the `opencv` feature;
//! `sim::MemoryVideoIo` backs tests and simulation mode.

use crate::error::CvResult;
use crate::frame::Frame;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Stream-level metadata carried from source to sink.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VideoMeta {
    pub fps: f64,
    pub width: u32,
    pub height: u32,
    pub frame_count: usize,
}

/// Sequential frame reader for one video.
pub trait VideoSource: Send {
    fn meta(&self) -> VideoMeta;
    /// The next decoded frame, or `None` at end of stream.
    fn next_frame(&mut self) -> CvResult<Option<Frame>>;
}

/// Sequential frame writer for one output video.
pub trait VideoSink: Send {
    fn write_frame(&mut self, frame: &Frame) -> CvResult<()>;
    /// Flush and close the container. Consumes the sink; output is not
    /// playable until this runs.
    fn finish(self: Box<Self>) -> CvResult<()>;
}

/// Filesystem-level video operations.
pub trait VideoIo: Send + Sync {
    fn exists(&self, path: &Path) -> bool;
    fn open(&self, path: &Path) -> CvResult<Box<dyn VideoSource>>;
    fn create(&self, path: &Path, meta: &VideoMeta) -> CvResult<Box<dyn VideoSink>>;
    /// Byte-identical copy, the zero-detections fallback.
    fn copy(&self, src: &Path, dst: &Path) -> CvResult<()>;
}

#[cfg(feature = "opencv")]
pub use self::opencv_io::OpenCvVideoIo;

#[cfg(feature = "opencv")]
mod opencv_io {
    use super::*;
    use crate::error::CvError;
    use opencv::core::Mat;
    use opencv::prelude::*;
    use opencv::videoio::{self, VideoCapture, VideoWriter};

    /// OpenCV `VideoCapture`/`VideoWriter` backed IO, writing mp4v.
    #[derive(Default)]
    pub struct OpenCvVideoIo;

    impl VideoIo for OpenCvVideoIo {
        fn exists(&self, path: &Path) -> bool {
            path.is_file()
        }

        fn open(&self, path: &Path) -> CvResult<Box<dyn VideoSource>> {
            let path_str = path
                .to_str()
                .ok_or_else(|| CvError::codec("non-UTF8 video path"))?;
            let capture = VideoCapture::from_file(path_str, videoio::CAP_ANY)?;
            if !capture.is_opened()? {
                return Err(CvError::codec(format!("cannot open video {path_str}")));
            }
            let meta = VideoMeta {
                fps: capture.get(videoio::CAP_PROP_FPS)?,
                width: capture.get(videoio::CAP_PROP_FRAME_WIDTH)? as u32,
                height: capture.get(videoio::CAP_PROP_FRAME_HEIGHT)? as u32,
                frame_count: capture.get(videoio::CAP_PROP_FRAME_COUNT)? as usize,
            };
            Ok(Box::new(CaptureSource { capture, meta }))
        }

        fn create(&self, path: &Path, meta: &VideoMeta) -> CvResult<Box<dyn VideoSink>> {
            let path_str = path
                .to_str()
                .ok_or_else(|| CvError::codec("non-UTF8 video path"))?;
            let fourcc = VideoWriter::fourcc('m', 'p', '4', 'v')?;
            let writer = VideoWriter::new(
                path_str,
                fourcc,
                meta.fps,
                opencv::core::Size::new(meta.width as i32, meta.height as i32),
                true,
            )?;
            if !writer.is_opened()? {
                return Err(CvError::codec(format!("cannot create video {path_str}")));
            }
            Ok(Box::new(WriterSink { writer }))
        }

        fn copy(&self, src: &Path, dst: &Path) -> CvResult<()> {
            std::fs::copy(src, dst)?;
            Ok(())
        }
    }

    struct CaptureSource {
        capture: VideoCapture,
        meta: VideoMeta,
    }

    impl VideoSource for CaptureSource {
        fn meta(&self) -> VideoMeta {
            self.meta
        }

        fn next_frame(&mut self) -> CvResult<Option<Frame>> {
            let mut mat = Mat::default();
            if !self.capture.read(&mut mat)? || mat.empty() {
                return Ok(None);
            }
            let width = mat.cols() as u32;
            let height = mat.rows() as u32;
            Ok(Some(Frame::from_data(
                width,
                height,
                mat.data_bytes()?.to_vec(),
            )?))
        }
    }

    struct WriterSink {
        writer: VideoWriter,
    }

    impl VideoSink for WriterSink {
        fn write_frame(&mut self, frame: &Frame) -> CvResult<()> {
            let mat = Mat::from_slice(frame.data())?
                .reshape(3, frame.height() as i32)?
                .try_clone()?;
            self.writer.write(&mat)?;
            Ok(())
        }

        fn finish(mut self: Box<Self>) -> CvResult<()> {
            self.writer.release()?;
            Ok(())
        }
    }
}

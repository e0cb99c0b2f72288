use opencv::core::Mat;
use opencv::imgproc;
use opencv::prelude::*;
use opencv::videoio::{self, VideoCapture};

use crate::capture::domain::frame_source::FrameSource;
use crate::shared::frame::Frame;

/// Webcam source opened by device index via OpenCV `VideoCapture`.
///
/// Frames arrive from OpenCV in BGR order and are converted to RGB at
/// this boundary; the rest of the crate never sees BGR data.
pub struct OpenCvCamera {
    capture: VideoCapture,
}

impl OpenCvCamera {
    /// Open the camera at `index` with automatic backend selection.
    pub fn open(index: i32) -> Result<Self, Box<dyn std::error::Error>> {
        let capture = VideoCapture::new(index, videoio::CAP_ANY)?;
        if !capture.is_opened()? {
            return Err("Cannot open webcam.".into());
        }
        Ok(Self { capture })
    }
}

impl FrameSource for OpenCvCamera {
    fn grab(&mut self) -> Result<Option<Frame>, Box<dyn std::error::Error>> {
        let mut bgr = Mat::default();
        if !self.capture.read(&mut bgr)? || bgr.empty() {
            return Ok(None);
        }
        let mut rgb = Mat::default();
        imgproc::cvt_color(&bgr, &mut rgb, imgproc::COLOR_BGR2RGB, 0)?;
        let size = rgb.size()?;
        let data = rgb.data_bytes()?.to_vec();
        Ok(Some(Frame::new(
            data,
            size.width as u32,
            size.height as u32,
            3,
        )))
    }

    fn close(&mut self) {
        let _ = self.capture.release();
    }
}

// Release also runs on drop so the fatal-startup path cannot leak the
// device handle.
impl Drop for OpenCvCamera {
    fn drop(&mut self) {
        let _ = self.capture.release();
    }
}

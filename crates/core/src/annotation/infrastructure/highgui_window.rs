use opencv::core::{Mat, Point, Rect, Scalar};
use opencv::prelude::*;
use opencv::{highgui, imgproc};

use crate::annotation::domain::annotation_sink::{AnnotationSink, KeyEvent};
use crate::annotation::domain::overlay::Overlay;
use crate::shared::constants::QUIT_KEY;
use crate::shared::frame::Frame;

const OVERLAY_THICKNESS: i32 = 2;
const LABEL_SCALE: f64 = 0.6;

/// Label baseline offset above the region's top edge.
const LABEL_OFFSET_Y: i32 = 10;

/// Live display window via OpenCV `highgui`.
///
/// The window is created lazily on the first `present`, so a failed
/// startup never flashes an empty window.
pub struct HighguiWindow {
    title: String,
    created: bool,
}

impl HighguiWindow {
    pub fn new(title: &str) -> Self {
        Self {
            title: title.to_string(),
            created: false,
        }
    }
}

impl AnnotationSink for HighguiWindow {
    fn present(
        &mut self,
        frame: &Frame,
        overlays: &[Overlay],
    ) -> Result<KeyEvent, Box<dyn std::error::Error>> {
        let mut canvas = bgr_canvas(frame)?;
        for overlay in overlays {
            draw_overlay(&mut canvas, overlay)?;
        }

        if !self.created {
            highgui::named_window(&self.title, highgui::WINDOW_AUTOSIZE)?;
            self.created = true;
        }
        highgui::imshow(&self.title, &canvas)?;

        let key = highgui::wait_key(1)?;
        Ok(key_event_for(key))
    }

    fn close(&mut self) {
        let _ = highgui::destroy_all_windows();
    }
}

/// Copy the RGB frame into a drawable BGR `Mat`.
fn bgr_canvas(frame: &Frame) -> Result<Mat, Box<dyn std::error::Error>> {
    let flat = Mat::from_slice(frame.data())?;
    let rgb = flat.reshape(3, frame.height() as i32)?;
    let mut bgr = Mat::default();
    imgproc::cvt_color(&rgb, &mut bgr, imgproc::COLOR_RGB2BGR, 0)?;
    Ok(bgr)
}

fn draw_overlay(canvas: &mut Mat, overlay: &Overlay) -> Result<(), Box<dyn std::error::Error>> {
    let green = Scalar::new(0.0, 255.0, 0.0, 0.0);
    let region = &overlay.region;

    imgproc::rectangle(
        canvas,
        Rect::new(region.x, region.y, region.width, region.height),
        green,
        OVERLAY_THICKNESS,
        imgproc::LINE_8,
        0,
    )?;
    imgproc::put_text(
        canvas,
        &overlay.label,
        Point::new(region.x, region.y - LABEL_OFFSET_Y),
        imgproc::FONT_HERSHEY_SIMPLEX,
        LABEL_SCALE,
        green,
        OVERLAY_THICKNESS,
        imgproc::LINE_8,
        false,
    )?;
    Ok(())
}

/// Map a `wait_key` code to a session event. Only the low byte is
/// meaningful across platforms.
fn key_event_for(key: i32) -> KeyEvent {
    if key & 0xff == QUIT_KEY as i32 {
        KeyEvent::Quit
    } else {
        KeyEvent::None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quit_key_maps_to_quit() {
        assert_eq!(key_event_for('q' as i32), KeyEvent::Quit);
    }

    #[test]
    fn test_quit_key_with_high_bits_set_maps_to_quit() {
        assert_eq!(key_event_for(0x100_0000 | 'q' as i32), KeyEvent::Quit);
    }

    #[test]
    fn test_no_key_maps_to_none() {
        assert_eq!(key_event_for(-1), KeyEvent::None);
    }

    #[test]
    fn test_other_key_maps_to_none() {
        assert_eq!(key_event_for('x' as i32), KeyEvent::None);
    }

    #[test]
    fn test_bgr_canvas_swaps_channels() {
        // Single red RGB pixel → BGR byte order (0, 0, 255)
        let frame = Frame::new(vec![255, 0, 0], 1, 1, 3);
        let canvas = bgr_canvas(&frame).unwrap();
        assert_eq!(canvas.rows(), 1);
        assert_eq!(canvas.cols(), 1);
        let bytes = canvas.data_bytes().unwrap();
        assert_eq!(bytes, &[0, 0, 255]);
    }
}

use crate::annotation::domain::overlay::Overlay;
use crate::shared::frame::Frame;

/// Keyboard event observed while presenting a frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum KeyEvent {
    None,
    Quit,
}

/// Domain interface for the live display surface.
///
/// `present` draws the overlays onto the frame, shows the result, and
/// reports any key event observed during the poll.
pub trait AnnotationSink: Send {
    fn present(
        &mut self,
        frame: &Frame,
        overlays: &[Overlay],
    ) -> Result<KeyEvent, Box<dyn std::error::Error>>;

    /// Closes the display surface.
    fn close(&mut self);
}

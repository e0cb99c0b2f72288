use crate::shared::frame::Frame;

/// Domain interface for a live frame source.
///
/// `grab` blocks until the next frame is available. `Ok(None)` means the
/// source is exhausted (device unplugged, end of stream) and the session
/// should wind down; `Err` is reserved for read failures.
pub trait FrameSource: Send {
    fn grab(&mut self) -> Result<Option<Frame>, Box<dyn std::error::Error>>;

    /// Releases the underlying device.
    fn close(&mut self);
}

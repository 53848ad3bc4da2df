use crate::{CaptureSettings, Frame, Result};

/// A blocking capture source. The grabber moves it onto the worker thread.
pub trait CaptureDevice: Send + 'static {
    /// Open a capture source by device index or path string.
    fn open(source: &str) -> Result<Self>
    where
        Self: Sized;

    /// Whether the underlying handle is usable.
    fn is_opened(&self) -> bool {
        true
    }

    /// Request a capture geometry. Backends may ignore it.
    fn configure(&mut self, _settings: &CaptureSettings) {}

    /// Advertised frames per second, 0 when unknown.
    fn capture_rate(&self) -> u32 {
        0
    }

    /// Read the next frame. `Error::EndOfStream` when the source is exhausted.
    fn read_frame(&mut self) -> Result<Frame>;

    /// Release the underlying handle. Must tolerate repeated calls.
    fn release(&mut self);
}

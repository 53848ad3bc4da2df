//! frame-grabber: background camera capture with a latest-frame accessor
//!
//! A [`FrameGrabber`] pulls frames from a [`CaptureDevice`] on its own thread and
//! keeps the most recent one available to any number of readers. The default
//! build enables the `mock` backends so binaries and tests run without a camera;
//! the `opencv` feature adds a `VideoCapture` backend.

mod types;
pub use types::{CaptureSettings, Frame, PixelFormat};

mod error;
pub use error::{Error, Result};

mod traits;
pub use traits::CaptureDevice;

mod lifecycle;
pub use lifecycle::Lifecycle;

mod slot;

mod grabber;
pub use grabber::{FrameGrabber, FrameReader, GrabberEvent};

#[cfg(feature = "mock")]
mod mock;
#[cfg(feature = "mock")]
pub use mock::{DeviceProbe, MockCamera, ScriptedCamera};

#[cfg(feature = "opencv")]
mod opencv_backend;
#[cfg(feature = "opencv")]
pub use opencv_backend::OpenCvCamera;

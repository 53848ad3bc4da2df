//! Background capture worker with a non-blocking latest-frame accessor.
//!
//! A [`FrameGrabber`] opens a device, performs one priming read so that
//! [`FrameGrabber::read`] always has a frame to hand out, and on
//! [`FrameGrabber::start`] moves the device onto a dedicated thread that keeps
//! replacing the shared frame until it is stopped or the stream ends.

use crate::lifecycle::{Lifecycle, LifecycleFlag};
use crate::slot::FrameSlot;
use crate::{CaptureDevice, CaptureSettings, Error, Frame, Result};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use tracing::{debug, info, warn};

/// Terminal notification, emitted once per grabber.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum GrabberEvent {
    /// The device ran out of frames.
    EndOfStream { frames: u64 },
    /// The controller requested a stop.
    Stopped { frames: u64 },
    /// A read error other than end of stream ended capture.
    Failed { frames: u64, reason: String },
}

/// Holds the device and releases it exactly once, then marks the lifecycle stopped.
struct DeviceGuard<D: CaptureDevice> {
    device: D,
    state: Arc<LifecycleFlag>,
}

impl<D: CaptureDevice> Drop for DeviceGuard<D> {
    fn drop(&mut self) {
        self.device.release();
        self.state.halt();
        debug!("capture device released");
    }
}

enum Exit {
    Stopped,
    EndOfStream,
    Failed(String),
}

struct Worker<D: CaptureDevice> {
    device: DeviceGuard<D>,
    slot: Arc<FrameSlot>,
    state: Arc<LifecycleFlag>,
    events: Option<Sender<GrabberEvent>>,
}

impl<D: CaptureDevice> Worker<D> {
    fn run(mut self) {
        debug!("capture worker running");
        let exit = loop {
            if !self.state.is_running() {
                break Exit::Stopped;
            }
            match self.device.device.read_frame() {
                Ok(frame) => self.slot.publish(frame),
                Err(Error::EndOfStream) => {
                    info!("no more frames to read, capture stopping");
                    break Exit::EndOfStream;
                }
                Err(e) => {
                    warn!(error = %e, "frame read failed, capture stopping");
                    break Exit::Failed(e.to_string());
                }
            }
        };

        let Worker {
            device,
            slot,
            events,
            ..
        } = self;
        drop(device);

        let frames = slot.published();
        debug!(frames, "capture worker exited");
        let event = match exit {
            Exit::Stopped => GrabberEvent::Stopped { frames },
            Exit::EndOfStream => GrabberEvent::EndOfStream { frames },
            Exit::Failed(reason) => GrabberEvent::Failed { frames, reason },
        };
        if let Some(tx) = events {
            let _ = tx.send(event);
        }
    }
}

/// Cloneable read-only view of a grabber, for sharing across threads.
#[derive(Clone, Debug)]
pub struct FrameReader {
    slot: Arc<FrameSlot>,
    state: Arc<LifecycleFlag>,
}

impl FrameReader {
    pub fn read(&self) -> Arc<Frame> {
        self.slot.snapshot()
    }

    pub fn state(&self) -> Lifecycle {
        self.state.get()
    }

    pub fn frames_captured(&self) -> u64 {
        self.slot.published()
    }
}

pub struct FrameGrabber<D: CaptureDevice> {
    device: Option<DeviceGuard<D>>,
    slot: Arc<FrameSlot>,
    state: Arc<LifecycleFlag>,
    worker: Option<JoinHandle<()>>,
    events_tx: Option<Sender<GrabberEvent>>,
    events_rx: Option<Receiver<GrabberEvent>>,
    settings: CaptureSettings,
    capture_rate: u32,
}

impl<D: CaptureDevice> FrameGrabber<D> {
    /// Open `source` through the backend and prime the grabber.
    pub fn open(source: &str, settings: &CaptureSettings) -> Result<Self> {
        let device = D::open(source).map_err(|e| match e {
            e @ Error::DeviceUnavailable(_) => e,
            other => Error::DeviceUnavailable(format!("{source}: {other}")),
        })?;
        Self::new(device, settings)
    }

    /// Prime the grabber from an already opened device.
    ///
    /// Requests the capture geometry, checks the handle and performs one
    /// synchronous read. The device is released if any of this fails.
    pub fn new(device: D, settings: &CaptureSettings) -> Result<Self> {
        let state = Arc::new(LifecycleFlag::new());
        let mut guard = DeviceGuard {
            device,
            state: Arc::clone(&state),
        };

        guard.device.configure(settings);
        if !guard.device.is_opened() {
            return Err(Error::DeviceUnavailable(
                "device handle is not open".to_string(),
            ));
        }

        let capture_rate = guard.device.capture_rate();
        info!(fps = capture_rate, "input stream capture rate");

        let first = guard
            .device
            .read_frame()
            .map_err(|e| Error::NoFrame(e.to_string()))?;
        debug!(
            width = first.width,
            height = first.height,
            "priming frame captured"
        );

        let (tx, rx) = mpsc::channel();
        Ok(Self {
            device: Some(guard),
            slot: Arc::new(FrameSlot::new(first)),
            state,
            worker: None,
            events_tx: Some(tx),
            events_rx: Some(rx),
            settings: *settings,
            capture_rate,
        })
    }

    /// Launch the capture worker. A no-op while running; fails once stopped.
    pub fn start(&mut self) -> Result<()> {
        match self.state.begin() {
            Lifecycle::NotStarted => {}
            Lifecycle::Running => return Ok(()),
            Lifecycle::Stopped => return Err(Error::Stopped),
        }
        let Some(device) = self.device.take() else {
            self.state.halt();
            return Err(Error::Worker("capture device already consumed".to_string()));
        };

        let worker = Worker {
            device,
            slot: Arc::clone(&self.slot),
            state: Arc::clone(&self.state),
            events: self.events_tx.take(),
        };
        match thread::Builder::new()
            .name("frame-grabber".to_string())
            .spawn(move || worker.run())
        {
            Ok(handle) => {
                self.worker = Some(handle);
                Ok(())
            }
            Err(e) => {
                // The closure was dropped with the worker, which released the device.
                self.state.halt();
                Err(Error::Worker(format!("failed to spawn capture thread: {e}")))
            }
        }
    }

    /// Latest published frame. Never blocks on capture.
    pub fn read(&self) -> Arc<Frame> {
        self.slot.snapshot()
    }

    /// Signal the worker to exit. Does not wait for it.
    pub fn stop(&mut self) {
        let prev = self.state.halt();
        if prev != Lifecycle::Stopped {
            debug!(?prev, "capture stop requested");
        }
        // Never started: nobody else will release the device or send the event.
        self.device.take();
        if let Some(tx) = self.events_tx.take() {
            let _ = tx.send(GrabberEvent::Stopped {
                frames: self.slot.published(),
            });
        }
    }

    /// Block until the worker has exited and released the device.
    pub fn join(&mut self) -> Result<()> {
        match self.worker.take() {
            Some(handle) => handle
                .join()
                .map_err(|_| Error::Worker("capture worker panicked".to_string())),
            None => Ok(()),
        }
    }

    /// True when no worker thread is alive.
    pub fn is_finished(&self) -> bool {
        self.worker
            .as_ref()
            .map_or(true, |handle| handle.is_finished())
    }

    /// Receiver for the terminal event. Available once.
    ///
    /// The worker sends it on exit; a stop before `start` sends `Stopped` directly.
    pub fn take_events(&mut self) -> Option<Receiver<GrabberEvent>> {
        self.events_rx.take()
    }

    pub fn reader(&self) -> FrameReader {
        FrameReader {
            slot: Arc::clone(&self.slot),
            state: Arc::clone(&self.state),
        }
    }

    pub fn state(&self) -> Lifecycle {
        self.state.get()
    }

    pub fn is_running(&self) -> bool {
        self.state.is_running()
    }

    pub fn frames_captured(&self) -> u64 {
        self.slot.published()
    }

    /// Rate advertised by the device at construction. Not enforced.
    pub fn capture_rate(&self) -> u32 {
        self.capture_rate
    }

    pub fn settings(&self) -> &CaptureSettings {
        &self.settings
    }
}

impl<D: CaptureDevice> Drop for FrameGrabber<D> {
    fn drop(&mut self) {
        self.state.halt();
    }
}

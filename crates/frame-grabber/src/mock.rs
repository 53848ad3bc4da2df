use crate::{CaptureDevice, CaptureSettings, Error, Frame, PixelFormat, Result};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use time::OffsetDateTime;

/// Shared counters describing how a device has been driven.
#[derive(Clone, Debug, Default)]
pub struct DeviceProbe {
    reads: Arc<AtomicU64>,
    releases: Arc<AtomicU64>,
}

impl DeviceProbe {
    pub fn reads(&self) -> u64 {
        self.reads.load(Ordering::SeqCst)
    }

    pub fn releases(&self) -> u64 {
        self.releases.load(Ordering::SeqCst)
    }

    fn record_read(&self) {
        self.reads.fetch_add(1, Ordering::SeqCst);
    }

    fn record_release(&self) {
        self.releases.fetch_add(1, Ordering::SeqCst);
    }
}

/// Synthetic camera producing a moving gray ramp.
pub struct MockCamera {
    counter: u64,
    width: u32,
    height: u32,
    limit: Option<u64>,
    released: bool,
    probe: DeviceProbe,
}

impl MockCamera {
    /// Endless source.
    pub fn new() -> Self {
        Self {
            counter: 0,
            width: 320,
            height: 240,
            limit: None,
            released: false,
            probe: DeviceProbe::default(),
        }
    }

    /// Source that reports end of stream after `frames` reads.
    pub fn with_limit(frames: u64) -> Self {
        Self {
            limit: Some(frames),
            ..Self::new()
        }
    }

    pub fn probe(&self) -> DeviceProbe {
        self.probe.clone()
    }
}

impl Default for MockCamera {
    fn default() -> Self {
        Self::new()
    }
}

impl CaptureDevice for MockCamera {
    fn open(_source: &str) -> Result<Self> {
        Ok(Self::new())
    }

    fn is_opened(&self) -> bool {
        !self.released
    }

    fn configure(&mut self, settings: &CaptureSettings) {
        // Keep synthetic frames small regardless of what was asked for
        self.width = settings.width.clamp(1, 640);
        self.height = settings.height.clamp(1, 480);
    }

    fn capture_rate(&self) -> u32 {
        30
    }

    fn read_frame(&mut self) -> Result<Frame> {
        self.probe.record_read();
        if self.released {
            return Err(Error::EndOfStream);
        }
        if self.limit.is_some_and(|limit| self.counter >= limit) {
            return Err(Error::EndOfStream);
        }
        self.counter += 1;
        let (width, height) = (self.width, self.height);
        let shift = self.counter as u32;
        let mut data = vec![0u8; (width * height) as usize];
        for y in 0..height {
            for x in 0..width {
                let idx = (y * width + x) as usize;
                data[idx] = ((x + y + shift) % 256) as u8;
            }
        }
        Ok(Frame {
            width,
            height,
            pixel_format: PixelFormat::Gray8,
            data,
            ts: Some(OffsetDateTime::now_utc()),
        })
    }

    fn release(&mut self) {
        if !self.released {
            self.released = true;
            self.probe.record_release();
        }
    }
}

/// Replays a fixed list of frames, then reports end of stream.
pub struct ScriptedCamera {
    frames: VecDeque<Frame>,
    opened: bool,
    rate: u32,
    probe: DeviceProbe,
}

impl ScriptedCamera {
    pub fn new(frames: impl IntoIterator<Item = Frame>) -> Self {
        Self {
            frames: frames.into_iter().collect(),
            opened: true,
            rate: 0,
            probe: DeviceProbe::default(),
        }
    }

    /// A handle that reports itself as not opened.
    pub fn closed() -> Self {
        Self {
            opened: false,
            ..Self::new(Vec::new())
        }
    }

    pub fn with_rate(mut self, rate: u32) -> Self {
        self.rate = rate;
        self
    }

    pub fn probe(&self) -> DeviceProbe {
        self.probe.clone()
    }
}

impl CaptureDevice for ScriptedCamera {
    fn open(source: &str) -> Result<Self> {
        Err(Error::DeviceUnavailable(format!(
            "no scripted device named {source}"
        )))
    }

    fn is_opened(&self) -> bool {
        self.opened
    }

    fn capture_rate(&self) -> u32 {
        self.rate
    }

    fn read_frame(&mut self) -> Result<Frame> {
        self.probe.record_read();
        if !self.opened {
            return Err(Error::EndOfStream);
        }
        self.frames.pop_front().ok_or(Error::EndOfStream)
    }

    fn release(&mut self) {
        if self.opened {
            self.opened = false;
            self.probe.record_release();
        }
    }
}

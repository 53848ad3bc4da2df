use crate::{CaptureDevice, CaptureSettings, Error, Frame, PixelFormat, Result};
use opencv::prelude::*;
use opencv::{core, imgproc, videoio};
use time::OffsetDateTime;
use tracing::warn;

pub struct OpenCvCamera {
    cap: videoio::VideoCapture,
}

impl CaptureDevice for OpenCvCamera {
    fn open(source: &str) -> Result<Self> {
        // Parse source as index if numeric, else try to open as path or URL
        let cap = if let Ok(idx) = source.parse::<i32>() {
            videoio::VideoCapture::new(idx, videoio::CAP_ANY)
        } else {
            videoio::VideoCapture::from_file(source, videoio::CAP_ANY)
        }
        .map_err(|e| Error::DeviceUnavailable(format!("{source}: {e}")))?;
        let opened = videoio::VideoCapture::is_opened(&cap)
            .map_err(|e| Error::DeviceUnavailable(format!("{source}: {e}")))?;
        if !opened {
            return Err(Error::DeviceUnavailable(source.to_string()));
        }
        Ok(Self { cap })
    }

    fn is_opened(&self) -> bool {
        videoio::VideoCapture::is_opened(&self.cap).unwrap_or(false)
    }

    fn configure(&mut self, settings: &CaptureSettings) {
        let props = [
            (videoio::CAP_PROP_FRAME_WIDTH, settings.width),
            (videoio::CAP_PROP_FRAME_HEIGHT, settings.height),
        ];
        for (prop, value) in props {
            if let Err(e) = self.cap.set(prop, f64::from(value)) {
                warn!(prop, value, error = %e, "capture property not applied");
            }
        }
    }

    fn capture_rate(&self) -> u32 {
        self.cap
            .get(videoio::CAP_PROP_FPS)
            .map(|fps| if fps.is_finite() && fps > 0.0 { fps as u32 } else { 0 })
            .unwrap_or(0)
    }

    fn read_frame(&mut self) -> Result<Frame> {
        let mut mat = core::Mat::default();
        let grabbed = self
            .cap
            .read(&mut mat)
            .map_err(|e| Error::Backend(e.to_string()))?;
        if !grabbed || mat.empty() {
            return Err(Error::EndOfStream);
        }

        let width = mat.cols() as u32;
        let height = mat.rows() as u32;

        // Convert to RGB8
        let mut rgb = core::Mat::default();
        imgproc::cvt_color(&mat, &mut rgb, imgproc::COLOR_BGR2RGB, 0)
            .map_err(|e| Error::Backend(e.to_string()))?;

        let data = rgb
            .data_bytes()
            .map_err(|e| Error::Backend(e.to_string()))?
            .to_vec();
        Ok(Frame {
            width,
            height,
            pixel_format: PixelFormat::Rgb8,
            data,
            ts: Some(OffsetDateTime::now_utc()),
        })
    }

    fn release(&mut self) {
        if let Err(e) = self.cap.release() {
            warn!(error = %e, "video capture release failed");
        }
    }
}

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum PixelFormat {
    Bgr8,
    Rgb8,
    Gray8,
}

impl PixelFormat {
    /// Bytes per pixel for the packed layout.
    pub fn channels(self) -> usize {
        match self {
            PixelFormat::Bgr8 | PixelFormat::Rgb8 => 3,
            PixelFormat::Gray8 => 1,
        }
    }
}

/// One decoded image captured from a device.
#[derive(Clone, Debug, PartialEq)]
pub struct Frame {
    pub width: u32,
    pub height: u32,
    pub pixel_format: PixelFormat,
    pub data: Vec<u8>,
    pub ts: Option<OffsetDateTime>,
}

impl Frame {
    /// Build a frame where every byte holds `value`. Handy for synthetic sources.
    pub fn filled(width: u32, height: u32, pixel_format: PixelFormat, value: u8) -> Self {
        let len = width as usize * height as usize * pixel_format.channels();
        Self {
            width,
            height,
            pixel_format,
            data: vec![value; len],
            ts: Some(OffsetDateTime::now_utc()),
        }
    }

    /// Expected buffer length for the frame geometry.
    pub fn expected_len(&self) -> usize {
        self.width as usize * self.height as usize * self.pixel_format.channels()
    }
}

/// Requested capture geometry. Devices treat it as a hint.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptureSettings {
    pub width: u32,
    pub height: u32,
}

impl Default for CaptureSettings {
    fn default() -> Self {
        Self {
            width: 1280,
            height: 720,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filled_frame_matches_geometry() {
        let f = Frame::filled(4, 3, PixelFormat::Rgb8, 7);
        assert_eq!(f.data.len(), 36);
        assert_eq!(f.expected_len(), f.data.len());
        assert!(f.data.iter().all(|b| *b == 7));
    }

    #[test]
    fn settings_default_to_720p() {
        let s = CaptureSettings::default();
        assert_eq!((s.width, s.height), (1280, 720));
    }

    #[test]
    fn settings_fill_missing_fields() {
        let s: CaptureSettings = serde_json::from_str(r#"{"width": 640}"#).unwrap();
        assert_eq!(s.width, 640);
        assert_eq!(s.height, 720);
    }
}

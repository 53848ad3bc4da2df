use anyhow::Result;
use frame_grabber::CaptureSettings;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Device index like "0", or a file path / stream URL
    pub device: String,
    /// Use the OpenCV backend instead of the mock camera
    pub opencv: bool,
    pub capture: CaptureSettings,
    pub poll_interval_ms: u64,
    /// Stop polling after this many seconds; runs until end of stream when unset
    pub duration_s: Option<u64>,
    /// Bound the mock camera to this many frames
    pub mock_frames: Option<u64>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            device: "0".to_string(),
            opencv: false,
            capture: CaptureSettings::default(),
            poll_interval_ms: 33,
            duration_s: None,
            mock_frames: None,
        }
    }
}

impl Config {
    /// Load from a JSON file, falling back to defaults when it does not exist.
    pub fn load(path: &str) -> Result<Self> {
        if Path::new(path).exists() {
            let contents = fs::read_to_string(path)?;
            Ok(serde_json::from_str(&contents)?)
        } else {
            Ok(Self::default())
        }
    }

    pub fn save(&self, path: &str) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.json");
        let cfg = Config::load(path.to_str().unwrap()).unwrap();
        assert_eq!(cfg, Config::default());
    }

    #[test]
    fn save_then_load_preserves_values() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("grab.json");
        let path = path.to_str().unwrap();
        let cfg = Config {
            device: "/dev/video2".to_string(),
            duration_s: Some(10),
            ..Config::default()
        };
        cfg.save(path).unwrap();
        assert_eq!(Config::load(path).unwrap(), cfg);
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("grab.json");
        fs::write(&path, r#"{"capture": {"width": 640, "height": 480}}"#).unwrap();
        let cfg = Config::load(path.to_str().unwrap()).unwrap();
        assert_eq!(cfg.capture.width, 640);
        assert_eq!(cfg.device, "0");
        assert_eq!(cfg.poll_interval_ms, 33);
    }

    #[test]
    fn malformed_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("grab.json");
        fs::write(&path, "not json").unwrap();
        assert!(Config::load(path.to_str().unwrap()).is_err());
    }
}

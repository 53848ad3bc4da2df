use anyhow::Result;
use clap::{ArgAction, Args, Parser, Subcommand};
use std::path::Path;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, info};

use frame_grabber::{CaptureDevice, FrameGrabber, Lifecycle, MockCamera};

mod config;
use config::Config;

#[derive(Parser, Debug)]
#[command(
    name = "grab",
    version,
    about = "Background frame grabber",
    disable_help_subcommand = true
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// List capture backends compiled into this binary
    Backends,
    /// Open a device, read one frame, and report it without starting capture
    Probe {
        #[command(flatten)]
        source: SourceArgs,
    },
    /// Capture in the background and poll the latest frame
    Run {
        #[command(flatten)]
        source: SourceArgs,
        /// Poll interval in milliseconds
        #[arg(long)]
        interval_ms: Option<u64>,
        /// Stop after this many seconds (default: run until end of stream)
        #[arg(long)]
        duration_s: Option<u64>,
    },
    /// Write a default config file
    ConfigInit {
        /// Output path
        #[arg(long, default_value = "grab.json")]
        config: String,
        /// Overwrite an existing file
        #[arg(long, action = ArgAction::SetTrue)]
        force: bool,
    },
}

#[derive(Args, Debug, Default)]
struct SourceArgs {
    /// JSON config file; flags override its values
    #[arg(long)]
    config: Option<String>,
    /// Device source: index like 0, a file path, or a stream URL
    #[arg(long)]
    device: Option<String>,
    /// Use OpenCV backend if available; otherwise mock
    #[arg(long, action = ArgAction::SetTrue)]
    opencv: bool,
    /// Requested frame width (best-effort)
    #[arg(long)]
    width: Option<u32>,
    /// Requested frame height (best-effort)
    #[arg(long)]
    height: Option<u32>,
    /// End the mock stream after this many frames
    #[arg(long)]
    mock_frames: Option<u64>,
}

impl SourceArgs {
    fn resolve(&self) -> Result<Config> {
        let mut cfg = match &self.config {
            Some(path) => Config::load(path)
                .map_err(|e| anyhow::anyhow!("config {path} unreadable: {e}"))?,
            None => Config::default(),
        };
        if let Some(device) = &self.device {
            cfg.device = device.clone();
        }
        if self.opencv {
            cfg.opencv = true;
        }
        if let Some(width) = self.width {
            cfg.capture.width = width;
        }
        if let Some(height) = self.height {
            cfg.capture.height = height;
        }
        if self.mock_frames.is_some() {
            cfg.mock_frames = self.mock_frames;
        }
        Ok(cfg)
    }
}

fn main() -> Result<()> {
    setup_tracing();
    let cli = Cli::parse();

    match cli.command {
        Commands::Backends => list_backends(),
        Commands::Probe { source } => probe(&source.resolve()?),
        Commands::Run {
            source,
            interval_ms,
            duration_s,
        } => {
            let mut cfg = source.resolve()?;
            if let Some(ms) = interval_ms {
                cfg.poll_interval_ms = ms;
            }
            if duration_s.is_some() {
                cfg.duration_s = duration_s;
            }
            run(&cfg)
        }
        Commands::ConfigInit { config, force } => config_init(&config, force),
    }
}

fn setup_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();
}

fn list_backends() -> Result<()> {
    println!("mock\tsynthetic gray ramp");
    if cfg!(feature = "opencv") {
        println!("opencv\tvideoio VideoCapture");
    } else {
        println!("hint: rebuild with --features opencv for real cameras");
    }
    Ok(())
}

fn open_mock(cfg: &Config) -> Result<FrameGrabber<MockCamera>> {
    let grabber = match cfg.mock_frames {
        Some(frames) => FrameGrabber::new(MockCamera::with_limit(frames), &cfg.capture),
        None => FrameGrabber::<MockCamera>::open(&cfg.device, &cfg.capture),
    };
    grabber.map_err(|e| anyhow::anyhow!("mock open failed: {e}"))
}

#[cfg(feature = "opencv")]
fn open_opencv(cfg: &Config) -> Result<FrameGrabber<frame_grabber::OpenCvCamera>> {
    FrameGrabber::open(&cfg.device, &cfg.capture)
        .map_err(|e| anyhow::anyhow!("opencv open failed: {e}"))
}

fn probe(cfg: &Config) -> Result<()> {
    if cfg.opencv {
        #[cfg(feature = "opencv")]
        {
            return report_probe("opencv", open_opencv(cfg)?);
        }
        #[cfg(not(feature = "opencv"))]
        {
            println!("OpenCV backend not enabled at compile time");
            return Ok(());
        }
    }
    report_probe("mock", open_mock(cfg)?)
}

fn report_probe<D: CaptureDevice>(backend: &str, mut grabber: FrameGrabber<D>) -> Result<()> {
    let f = grabber.read();
    println!(
        "{}: {}x{} {:?} fps={} ts={:?}",
        backend,
        f.width,
        f.height,
        f.pixel_format,
        grabber.capture_rate(),
        f.ts
    );
    grabber.stop();
    Ok(())
}

fn run(cfg: &Config) -> Result<()> {
    if cfg.opencv {
        #[cfg(feature = "opencv")]
        {
            return poll_latest(open_opencv(cfg)?, cfg);
        }
        #[cfg(not(feature = "opencv"))]
        {
            return Err(anyhow::anyhow!(
                "OpenCV backend not enabled at compile time; rebuild with --features opencv"
            ));
        }
    }
    poll_latest(open_mock(cfg)?, cfg)
}

/// Start capture and sample the latest frame until the stream stops or time runs out.
fn poll_latest<D: CaptureDevice>(mut grabber: FrameGrabber<D>, cfg: &Config) -> Result<()> {
    let events = grabber.take_events();
    grabber
        .start()
        .map_err(|e| anyhow::anyhow!("start failed: {e}"))?;
    info!(device = %cfg.device, "capture started");

    let interval = Duration::from_millis(cfg.poll_interval_ms.max(1));
    let deadline = cfg
        .duration_s
        .map(|s| Instant::now() + Duration::from_secs(s));
    let mut last = grabber.read();
    let mut observed = 1u64;

    loop {
        if grabber.state() == Lifecycle::Stopped {
            info!("capture stopped");
            break;
        }
        if deadline.is_some_and(|d| Instant::now() >= d) {
            info!("duration elapsed");
            break;
        }
        let frame = grabber.read();
        if !Arc::ptr_eq(&frame, &last) {
            observed += 1;
            debug!(
                width = frame.width,
                height = frame.height,
                captured = grabber.frames_captured(),
                "new frame"
            );
            last = frame;
        }
        thread::sleep(interval);
    }

    grabber.stop();
    grabber
        .join()
        .map_err(|e| anyhow::anyhow!("capture worker: {e}"))?;
    if let Some(event) = events.and_then(|rx| rx.try_recv().ok()) {
        info!(?event, "capture worker finished");
    }
    println!(
        "captured={} observed={} last={}x{}",
        grabber.frames_captured(),
        observed,
        last.width,
        last.height
    );
    Ok(())
}

fn config_init(path: &str, force: bool) -> Result<()> {
    if Path::new(path).exists() && !force {
        return Err(anyhow::anyhow!("{path} exists; pass --force to overwrite"));
    }
    Config::default().save(path)?;
    println!("wrote {path}");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_override_config_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("grab.json");
        let path = path.to_str().unwrap().to_string();
        Config {
            device: "1".to_string(),
            mock_frames: Some(3),
            ..Config::default()
        }
        .save(&path)
        .unwrap();

        let args = SourceArgs {
            config: Some(path),
            width: Some(320),
            ..SourceArgs::default()
        };
        let cfg = args.resolve().unwrap();
        assert_eq!(cfg.device, "1");
        assert_eq!(cfg.capture.width, 320);
        assert_eq!(cfg.capture.height, 720);
        assert_eq!(cfg.mock_frames, Some(3));
    }

    #[test]
    fn bounded_mock_run_completes() {
        let cfg = Config {
            mock_frames: Some(5),
            poll_interval_ms: 1,
            duration_s: Some(5),
            ..Config::default()
        };
        assert!(run(&cfg).is_ok());
    }

    #[test]
    fn empty_stream_fails_construction() {
        let cfg = Config {
            mock_frames: Some(0),
            ..Config::default()
        };
        for result in [run(&cfg), probe(&cfg)] {
            let err = result.unwrap_err().to_string();
            assert!(err.contains("no initial frame"), "{err}");
        }
    }

    #[test]
    fn probe_reports_mock_frame() {
        assert!(probe(&Config::default()).is_ok());
    }

    #[test]
    fn cli_parses_run_flags() {
        let cli = Cli::try_parse_from([
            "grab",
            "run",
            "--device",
            "2",
            "--mock-frames",
            "10",
            "--interval-ms",
            "5",
        ])
        .unwrap();
        match cli.command {
            Commands::Run {
                source,
                interval_ms,
                ..
            } => {
                assert_eq!(source.device.as_deref(), Some("2"));
                assert_eq!(source.mock_frames, Some(10));
                assert_eq!(interval_ms, Some(5));
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn config_init_refuses_to_overwrite() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("grab.json");
        let path = path.to_str().unwrap();
        config_init(path, false).unwrap();
        assert!(config_init(path, false).is_err());
        assert!(config_init(path, true).is_ok());
    }
}

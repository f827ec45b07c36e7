//! Command-line configuration.

use std::num::NonZeroU32;
use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;

use crate::camera::{DeviceConfig, Resolution};
use crate::error::TimelapseError;
use crate::platform::AUTO;
use crate::sequence::IMAGE_PATTERN;
use crate::session::SessionConfig;
use crate::video::EncodeRequest;

/// Capture a timelapse from a local camera and optionally turn it into a video.
#[derive(Parser, Debug, Clone, PartialEq)]
#[command(name = "pi-timelapse", version, about)]
pub struct Cli {
    /// Seconds between captures.
    #[arg(short, long, default_value_t = 10.0)]
    pub interval: f64,

    /// Directory for the captured images.
    #[arg(short, long, default_value = "timelapse_output")]
    pub output: PathBuf,

    /// Stop after this many images (0 = run until interrupted).
    #[arg(short, long, default_value_t = 0)]
    pub limit: u32,

    /// Compile the images into a video with ffmpeg when capture ends.
    #[arg(long)]
    pub compile_video: bool,

    /// Frame rate of the compiled video.
    #[arg(long, default_value_t = 24, value_parser = clap::value_parser!(u32).range(1..))]
    pub fps: u32,

    /// File name of the compiled video, written inside the output directory.
    #[arg(long, default_value = "timelapse.mp4")]
    pub video_filename: String,

    /// Camera platform: auto, linux or macos.
    #[arg(long, default_value = AUTO)]
    pub platform: String,

    /// Camera device index (/dev/videoN).
    #[arg(long, default_value_t = 0)]
    pub device: u32,

    /// Requested capture resolution, e.g. 1920x1080.
    #[arg(long)]
    pub resolution: Option<Resolution>,

    /// Seconds of frames to discard after opening the camera.
    #[arg(long, default_value_t = 2.0)]
    pub warmup: f64,

    /// JPEG quality of the captured images.
    #[arg(long, default_value_t = 90, value_parser = clap::value_parser!(u8).range(1..=100))]
    pub quality: u8,
}

impl Cli {
    /// Session parameters.
    pub fn session_config(&self) -> Result<SessionConfig, TimelapseError> {
        SessionConfig::new(self.interval, self.limit, self.output.clone())
    }

    /// Camera driver parameters.
    pub fn device_config(&self) -> Result<DeviceConfig, TimelapseError> {
        let secs = self.warmup;
        if !secs.is_finite() || secs < 0.0 {
            return Err(TimelapseError::validation(format!(
                "warm-up must be zero or more seconds, got {secs}"
            )));
        }
        let warmup = Duration::try_from_secs_f64(secs)
            .map_err(|err| TimelapseError::validation(format!("warm-up {secs}s: {err}")))?;

        Ok(DeviceConfig {
            index: self.device,
            resolution: self.resolution,
            warmup,
            jpeg_quality: self.quality,
        })
    }

    /// Video request, if `--compile-video` was given.
    pub fn encode_request(&self) -> Result<Option<EncodeRequest>, TimelapseError> {
        if !self.compile_video {
            return Ok(None);
        }
        if self.video_filename.trim().is_empty() {
            return Err(TimelapseError::validation("video filename must not be empty"));
        }
        let fps = NonZeroU32::new(self.fps)
            .ok_or_else(|| TimelapseError::validation("fps must be at least 1"))?;

        Ok(Some(EncodeRequest {
            image_folder: self.output.clone(),
            pattern: IMAGE_PATTERN.to_owned(),
            output_path: self.output.join(&self.video_filename),
            fps,
        }))
    }
}

//! Platform detection and camera driver selection.

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use log::info;

use crate::camera::{Camera, CameraState, DeviceConfig, Negotiated};
use crate::device::V4L2Device;
use crate::error::TimelapseError;
use crate::signal::StopSignal;
use crate::stub::StubCamera;
use crate::traits::{DeviceError, Result};
use crate::webcam::WebcamCamera;

/// Identifier that asks for host detection instead of naming a platform.
pub const AUTO: &str = "auto";

/// Host families with a known camera driver variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Platform {
    /// Linux: V4L2 devices (USB webcams, camera modules on single-board computers).
    Linux,
    /// macOS: no native capture backend yet, served by the stub.
    MacOs,
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Linux => "linux",
            Self::MacOs => "macos",
        })
    }
}

impl FromStr for Platform {
    type Err = TimelapseError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "linux" => Ok(Self::Linux),
            "macos" => Ok(Self::MacOs),
            _ => Err(TimelapseError::validation(format!(
                "invalid platform {s:?}, supported values are 'auto', 'linux' and 'macos'"
            ))),
        }
    }
}

/// Map a host OS name (as in `std::env::consts::OS`) to a platform.
pub fn detect_platform(os: &str) -> Result<Platform> {
    if os == "macos" || os == "darwin" {
        Ok(Platform::MacOs)
    } else if os.starts_with("linux") {
        Ok(Platform::Linux)
    } else {
        Err(DeviceError::UnsupportedPlatform(os.to_owned()))
    }
}

/// Resolve `auto` or an explicit identifier to a platform.
pub fn resolve_platform(identifier: &str) -> std::result::Result<Platform, TimelapseError> {
    if identifier.trim().eq_ignore_ascii_case(AUTO) {
        let platform = detect_platform(std::env::consts::OS)?;
        info!("Detected platform: {platform}");
        Ok(platform)
    } else {
        identifier.parse()
    }
}

/// The driver variant chosen for a platform.
pub enum PlatformCamera {
    /// Real V4L2 driver.
    Webcam(WebcamCamera<V4L2Device>),
    /// No-op driver.
    Stub(StubCamera),
}

impl PlatformCamera {
    /// Let a stop request interrupt the warm-up of drivers that have one.
    #[must_use]
    pub fn with_stop_signal(self, stop: StopSignal) -> Self {
        match self {
            Self::Webcam(camera) => Self::Webcam(camera.with_stop_signal(stop)),
            stub @ Self::Stub(_) => stub,
        }
    }
}

/// Build the driver for `identifier` (`auto`, `linux` or `macos`).
///
/// Construction does not touch the hardware.
pub fn select_camera(
    identifier: &str,
    config: DeviceConfig,
) -> std::result::Result<PlatformCamera, TimelapseError> {
    let camera = match resolve_platform(identifier)? {
        Platform::Linux => {
            let index = config.index;
            info!("Selecting V4L2 webcam driver for /dev/video{index}");
            PlatformCamera::Webcam(WebcamCamera::v4l2(config))
        }
        Platform::MacOs => {
            info!("Selecting stub camera driver");
            PlatformCamera::Stub(StubCamera::new(config))
        }
    };
    Ok(camera)
}

impl Camera for PlatformCamera {
    fn name(&self) -> &'static str {
        match self {
            Self::Webcam(c) => c.name(),
            Self::Stub(c) => c.name(),
        }
    }

    fn state(&self) -> CameraState {
        match self {
            Self::Webcam(c) => c.state(),
            Self::Stub(c) => c.state(),
        }
    }

    fn initialize(&mut self) -> Result<Negotiated> {
        match self {
            Self::Webcam(c) => c.initialize(),
            Self::Stub(c) => c.initialize(),
        }
    }

    fn capture_frame(&mut self, path: &Path) -> Result<()> {
        match self {
            Self::Webcam(c) => c.capture_frame(path),
            Self::Stub(c) => c.capture_frame(path),
        }
    }

    fn shutdown(&mut self) {
        match self {
            Self::Webcam(c) => c.shutdown(),
            Self::Stub(c) => c.shutdown(),
        }
    }
}

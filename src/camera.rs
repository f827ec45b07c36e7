//! Driver-level camera contract: open, grab one still, close.
//!
//! A [`Camera`] moves through `Unopened -> Ready -> Closed`. Only a `Ready`
//! camera captures; `shutdown` is valid from every state and may be repeated.
//! [`CameraGuard`] scopes a camera so `shutdown` runs on every exit path.

use std::fmt;
use std::ops::{Deref, DerefMut};
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use log::{debug, warn};

use crate::traits::Result;

/// Requested or negotiated capture size.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Resolution {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl Resolution {
    /// Create a resolution.
    #[must_use]
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

impl fmt::Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

impl FromStr for Resolution {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let (w, h) = s
            .trim()
            .split_once(['x', 'X'])
            .ok_or_else(|| format!("expected WIDTHxHEIGHT, got {s:?}"))?;
        let parse = |part: &str| {
            part.trim()
                .parse::<u32>()
                .ok()
                .filter(|v| *v > 0)
                .ok_or_else(|| format!("invalid dimension {part:?} in {s:?}"))
        };
        Ok(Self::new(parse(w)?, parse(h)?))
    }
}

/// Tunables fixed at driver construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceConfig {
    /// Device index (`/dev/videoN`).
    pub index: u32,
    /// Resolution to request after opening, if any.
    pub resolution: Option<Resolution>,
    /// How long to discard frames after opening so exposure can settle.
    pub warmup: Duration,
    /// JPEG quality for stills (1-100).
    pub jpeg_quality: u8,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            index: 0,
            resolution: None,
            warmup: Duration::from_secs(2),
            jpeg_quality: 90,
        }
    }
}

/// Lifecycle state of a camera driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CameraState {
    /// Constructed, device not touched yet.
    Unopened,
    /// Initialized and able to capture.
    Ready,
    /// Shut down, or initialization failed.
    Closed,
}

impl fmt::Display for CameraState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Unopened => "unopened",
            Self::Ready => "ready",
            Self::Closed => "closed",
        })
    }
}

/// Outcome of resolution negotiation during initialization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Negotiated {
    /// What was asked for.
    pub requested: Option<Resolution>,
    /// What the driver settled on. `None` when the driver does no I/O.
    pub actual: Option<Resolution>,
}

impl Negotiated {
    /// A resolution was requested and the driver delivered something else.
    #[must_use]
    pub fn is_mismatch(&self) -> bool {
        matches!((self.requested, self.actual), (Some(r), Some(a)) if r != a)
    }
}

/// A camera driver able to write single stills to disk.
pub trait Camera {
    /// Short human-readable driver name for status lines.
    fn name(&self) -> &'static str;

    /// Current lifecycle state.
    fn state(&self) -> CameraState;

    /// Open the device. Valid once, from `Unopened`.
    ///
    /// On failure any partially opened resource is released and the driver
    /// is left `Closed`.
    fn initialize(&mut self) -> Result<Negotiated>;

    /// Capture one frame and write it as an image at `path`.
    ///
    /// Requires `Ready`. Either the complete image is written or the call
    /// fails without leaving a file behind.
    fn capture_frame(&mut self, path: &Path) -> Result<()>;

    /// Release the device. Idempotent; always leaves the driver `Closed`.
    fn shutdown(&mut self);
}

impl<C: Camera + ?Sized> Camera for Box<C> {
    fn name(&self) -> &'static str {
        (**self).name()
    }

    fn state(&self) -> CameraState {
        (**self).state()
    }

    fn initialize(&mut self) -> Result<Negotiated> {
        (**self).initialize()
    }

    fn capture_frame(&mut self, path: &Path) -> Result<()> {
        (**self).capture_frame(path)
    }

    fn shutdown(&mut self) {
        (**self).shutdown();
    }
}

/// Initialized camera that shuts down when dropped.
pub struct CameraGuard<'a, C: Camera + ?Sized> {
    camera: &'a mut C,
    negotiated: Negotiated,
}

impl<'a, C: Camera + ?Sized> CameraGuard<'a, C> {
    /// Initialize `camera`. If that fails, the camera is shut down before the
    /// error is returned, so no path leaves it half-open.
    pub fn acquire(camera: &'a mut C) -> Result<Self> {
        debug!("{}: initializing", camera.name());
        match camera.initialize() {
            Ok(negotiated) => Ok(Self { camera, negotiated }),
            Err(err) => {
                warn!("{}: initialization failed: {err}", camera.name());
                camera.shutdown();
                Err(err)
            }
        }
    }

    /// Resolution negotiation result from initialization.
    #[must_use]
    pub const fn negotiated(&self) -> Negotiated {
        self.negotiated
    }
}

impl<C: Camera + ?Sized> Deref for CameraGuard<'_, C> {
    type Target = C;

    fn deref(&self) -> &C {
        self.camera
    }
}

impl<C: Camera + ?Sized> DerefMut for CameraGuard<'_, C> {
    fn deref_mut(&mut self) -> &mut C {
        self.camera
    }
}

impl<C: Camera + ?Sized> Drop for CameraGuard<'_, C> {
    fn drop(&mut self) {
        debug!("{}: releasing", self.camera.name());
        self.camera.shutdown();
    }
}

//! Placeholder driver for camera families without a capture backend.
//!
//! The stub performs no I/O and writes no files. It exists so the rest of the
//! pipeline runs unchanged on such hosts; it tracks the same states and
//! rejects the same out-of-order calls as a real driver.

use std::path::Path;

use log::{info, warn};

use crate::camera::{Camera, CameraState, DeviceConfig, Negotiated};
use crate::traits::{DeviceError, Result};

/// No-op camera that reports success without capturing anything.
#[derive(Debug)]
pub struct StubCamera {
    config: DeviceConfig,
    state: CameraState,
}

impl StubCamera {
    /// Create an unopened stub.
    #[must_use]
    pub const fn new(config: DeviceConfig) -> Self {
        Self {
            config,
            state: CameraState::Unopened,
        }
    }

    /// Configuration the stub was built with.
    #[must_use]
    pub const fn config(&self) -> &DeviceConfig {
        &self.config
    }
}

impl Camera for StubCamera {
    fn name(&self) -> &'static str {
        "stub"
    }

    fn state(&self) -> CameraState {
        self.state
    }

    fn initialize(&mut self) -> Result<Negotiated> {
        if self.state != CameraState::Unopened {
            return Err(DeviceError::InvalidState {
                operation: "initialize",
                state: self.state,
            });
        }
        warn!("No capture backend for this platform, stub camera writes no images");
        self.state = CameraState::Ready;
        Ok(Negotiated {
            requested: self.config.resolution,
            actual: None,
        })
    }

    fn capture_frame(&mut self, path: &Path) -> Result<()> {
        if self.state != CameraState::Ready {
            return Err(DeviceError::InvalidState {
                operation: "capture",
                state: self.state,
            });
        }
        info!("Stub capture for {} (nothing written)", path.display());
        Ok(())
    }

    fn shutdown(&mut self) {
        info!("Stub camera shut down");
        self.state = CameraState::Closed;
    }
}

//! Pi-Timelapse: interval still capture from local cameras.
//!
//! A [`Camera`] driver is picked per platform, scoped so it is always shut
//! down, and driven by [`run_session`] to write `image_00001.jpg`,
//! `image_00002.jpg`, ... at a fixed interval. The [`VideoAssembler`] can then
//! hand the sequence to ffmpeg.

pub mod camera;
pub mod config;
pub mod device;
pub mod encode;
pub mod error;
pub mod platform;
pub mod sequence;
pub mod session;
pub mod signal;
pub mod stub;
pub mod traits;
pub mod video;
pub mod webcam;

#[cfg(test)]
pub mod mock;

pub use camera::{Camera, CameraGuard, CameraState, DeviceConfig, Negotiated, Resolution};
pub use config::Cli;
pub use device::V4L2Device;
pub use error::TimelapseError;
pub use platform::{select_camera, Platform, PlatformCamera};
pub use session::{run_session, SessionConfig, SessionReport, StopReason};
pub use signal::StopSignal;
pub use stub::StubCamera;
pub use traits::{CameraDevice, CaptureStream, DeviceError, Format, FourCC, Frame};
pub use video::{compile_captured, EncodeRequest, EncoderOutput, EncodingError, VideoAssembler};
pub use webcam::WebcamCamera;

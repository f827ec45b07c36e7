//! Core traits and types for the V4L2 camera hardware seam.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

use crate::camera::CameraState;

/// Pixel format representation (e.g., YUYV, MJPG, RGB3).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FourCC(pub [u8; 4]);

impl FourCC {
    /// Create a new `FourCC` from a 4-byte array.
    #[must_use]
    pub const fn new(code: &[u8; 4]) -> Self {
        Self(*code)
    }

    /// YUYV pixel format (4:2:2 packed).
    pub const YUYV: Self = Self::new(b"YUYV");
    /// MJPEG pixel format (Motion JPEG).
    pub const MJPG: Self = Self::new(b"MJPG");
    /// RGB3 pixel format (24-bit RGB).
    pub const RGB3: Self = Self::new(b"RGB3");

    /// Whether frames in this format can be turned into a JPEG still.
    #[must_use]
    pub fn is_encodable(self) -> bool {
        self == Self::YUYV || self == Self::MJPG || self == Self::RGB3
    }
}

impl std::fmt::Display for FourCC {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&String::from_utf8_lossy(&self.0))
    }
}

impl From<v4l::FourCC> for FourCC {
    fn from(fourcc: v4l::FourCC) -> Self {
        Self(fourcc.repr)
    }
}

impl From<FourCC> for v4l::FourCC {
    fn from(fourcc: FourCC) -> Self {
        Self::new(&fourcc.0)
    }
}

/// Video format specification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Format {
    /// Frame width in pixels.
    pub width: u32,
    /// Frame height in pixels.
    pub height: u32,
    /// Pixel format.
    pub fourcc: FourCC,
    /// Bytes per line (stride).
    pub stride: u32,
    /// Total frame size in bytes.
    pub size: u32,
}

impl Format {
    /// Create a new format specification.
    #[must_use]
    pub const fn new(width: u32, height: u32, fourcc: FourCC) -> Self {
        let stride = width * 2; // YUYV is 2 bytes per pixel
        let size = stride * height;
        Self {
            width,
            height,
            fourcc,
            stride,
            size,
        }
    }

    /// Bytes per line for a packed format of `bytes_per_pixel`.
    ///
    /// Drivers may pad lines (V4L2 `bytesperline`), so the reported stride
    /// wins when it exceeds the packed width.
    #[must_use]
    pub const fn line_bytes(&self, bytes_per_pixel: u32) -> u32 {
        let packed = self.width * bytes_per_pixel;
        if self.stride > packed {
            self.stride
        } else {
            packed
        }
    }
}

/// Device capability flags.
#[derive(Debug, Clone, Default)]
pub struct DeviceCapabilities {
    /// Driver name.
    pub driver: String,
    /// Card/device name.
    pub card: String,
    /// Bus information.
    pub bus_info: String,
    /// Whether the device can capture video.
    pub can_capture: bool,
    /// Whether the device supports streaming.
    pub can_stream: bool,
}

/// Metadata for a captured frame.
#[derive(Debug, Clone)]
pub struct FrameMetadata {
    /// Frame sequence number.
    pub sequence: u32,
    /// Capture timestamp.
    pub timestamp: Duration,
    /// Actual bytes used in the frame buffer.
    pub bytes_used: u32,
}

/// A captured video frame.
#[derive(Debug, Clone)]
pub struct Frame {
    /// Raw frame data.
    pub data: Vec<u8>,
    /// Frame metadata.
    pub metadata: FrameMetadata,
}

impl Frame {
    /// The part of the buffer the driver actually filled.
    ///
    /// Compressed formats such as MJPG use far less than the mapped buffer,
    /// so `bytes_used` bounds the payload. A zero `bytes_used` is treated as
    /// "whole buffer" since some drivers leave it unset.
    #[must_use]
    pub fn payload(&self) -> &[u8] {
        let used = self.metadata.bytes_used as usize;
        if used == 0 {
            &self.data
        } else {
            self.data.get(..used).unwrap_or(&self.data)
        }
    }

    /// Get RGB values for a pixel at the specified coordinates.
    ///
    /// # Arguments
    ///
    /// * `x` - X coordinate (0-based)
    /// * `y` - Y coordinate (0-based)
    /// * `stride` - Bytes per line, padding included (see [`Format::line_bytes`])
    ///
    /// # Returns
    ///
    /// Returns `Some((r, g, b))` if the coordinates are valid, `None` otherwise.
    ///
    /// # Notes
    ///
    /// This method assumes YUYV format (2 bytes per pixel). For odd x coordinates,
    /// it uses the Y value from the next pixel pair with the shared U/V values.
    #[must_use]
    pub fn pixel_at(&self, x: u32, y: u32, stride: u32) -> Option<(u8, u8, u8)> {
        // YUYV format: [Y0 U Y1 V] repeats
        let pair_x = x & !1;
        let offset = (y * stride + pair_x * 2) as usize;

        if offset + 3 >= self.data.len() {
            return None;
        }

        let y_val = if x % 2 == 0 {
            *self.data.get(offset)?
        } else {
            *self.data.get(offset + 2)?
        };
        let u = *self.data.get(offset + 1)?;
        let v = *self.data.get(offset + 3)?;

        Some(yuv_to_rgb(y_val, u, v))
    }
}

/// Convert YUV values to RGB.
///
/// Uses the ITU-R BT.601 conversion formula. Output is clamped to 0-255.
#[must_use]
#[allow(clippy::many_single_char_names)]
fn yuv_to_rgb(y: u8, u: u8, v: u8) -> (u8, u8, u8) {
    let y_f = f32::from(y);
    let u_f = f32::from(u) - 128.0;
    let v_f = f32::from(v) - 128.0;

    let r = 1.402f32.mul_add(v_f, y_f);
    let g = 0.714_14f32.mul_add(-v_f, 0.344_14f32.mul_add(-u_f, y_f));
    let b = 1.772f32.mul_add(u_f, y_f);

    let clamp = |val: f32| -> u8 {
        if val < 0.0 {
            0
        } else if val > 255.0 {
            255
        } else {
            #[allow(clippy::cast_possible_truncation)]
            #[allow(clippy::cast_sign_loss)]
            {
                val as u8
            }
        }
    };

    (clamp(r), clamp(g), clamp(b))
}

/// Error type for camera device operations.
#[derive(Debug, Error)]
pub enum DeviceError {
    /// Device with given index was not found.
    #[error("device {0} not found")]
    DeviceNotFound(u32),
    /// Device exists but could not be opened (busy, permissions, ...).
    #[error("failed to open device: {0}")]
    DeviceOpenFailed(String),
    /// Requested format is not supported.
    #[error("format not supported: {0:?}")]
    FormatNotSupported(Format),
    /// Error during streaming operation.
    #[error("stream error: {0}")]
    StreamError(String),
    /// The driver is not in a state that allows the operation.
    #[error("cannot {operation} while camera is {state}")]
    InvalidState {
        /// Operation that was attempted.
        operation: &'static str,
        /// State the driver was in.
        state: CameraState,
    },
    /// A frame could not be turned into an image.
    #[error("failed to encode frame: {0}")]
    Encode(String),
    /// An encoded image could not be written.
    #[error("failed to write {}: {source}", path.display())]
    WriteFailed {
        /// Destination that was being written.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },
    /// Host platform has no known camera backend.
    #[error("unsupported OS for camera detection: {0}")]
    UnsupportedPlatform(String),
    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for camera operations.
pub type Result<T> = std::result::Result<T, DeviceError>;

/// Abstraction over camera device operations.
pub trait CameraDevice {
    /// The stream type returned by `create_stream`.
    type Stream<'a>: CaptureStream
    where
        Self: 'a;

    /// Get device capabilities.
    fn capabilities(&self) -> &DeviceCapabilities;

    /// Get current format.
    fn format(&self) -> Result<Format>;

    /// Set capture format. Returns the actual format set by the driver.
    fn set_format(&mut self, format: &Format) -> Result<Format>;

    /// Create a capture stream with the specified number of buffers.
    fn create_stream(&mut self, buffer_count: u32) -> Result<Self::Stream<'_>>;
}

/// Abstraction over capture stream operations.
pub trait CaptureStream {
    /// Capture the next frame from the stream.
    fn next_frame(&mut self) -> Result<Frame>;
}

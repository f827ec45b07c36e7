//! V4L2 device implementation using the v4l crate.

use std::io::ErrorKind;
use std::time::Duration;

use v4l::buffer::Type;
use v4l::io::mmap::Stream;
use v4l::io::traits::CaptureStream as V4lCaptureStream;
use v4l::video::Capture;
use v4l::Device;

use crate::traits::{
    CameraDevice, CaptureStream, DeviceCapabilities, DeviceError, Format, FourCC, Frame,
    FrameMetadata, Result,
};

/// V4L2 device implementation wrapping the v4l crate.
pub struct V4L2Device {
    device: Device,
    capabilities: DeviceCapabilities,
}

impl V4L2Device {
    /// Open a V4L2 device by index (e.g., 0 for /dev/video0).
    ///
    /// A missing device node is reported as [`DeviceError::DeviceNotFound`];
    /// every other failure (busy, permissions, no mmap streaming) as
    /// [`DeviceError::DeviceOpenFailed`].
    pub fn open(index: u32) -> Result<Self> {
        let device = Device::new(index as usize).map_err(|err| match err.kind() {
            ErrorKind::NotFound => DeviceError::DeviceNotFound(index),
            _ => DeviceError::DeviceOpenFailed(format!("/dev/video{index}: {err}")),
        })?;

        let caps = device
            .query_caps()
            .map_err(|err| DeviceError::DeviceOpenFailed(err.to_string()))?;

        let capabilities = DeviceCapabilities {
            driver: caps.driver,
            card: caps.card,
            bus_info: caps.bus,
            can_capture: caps.capabilities.contains(v4l::capability::Flags::VIDEO_CAPTURE),
            can_stream: caps.capabilities.contains(v4l::capability::Flags::STREAMING),
        };

        check_capabilities(index, &capabilities)?;

        Ok(Self {
            device,
            capabilities,
        })
    }
}

/// Stills are read through mmap streaming, so both flags are required.
fn check_capabilities(index: u32, caps: &DeviceCapabilities) -> Result<()> {
    if caps.can_capture && caps.can_stream {
        return Ok(());
    }
    Err(DeviceError::DeviceOpenFailed(format!(
        "/dev/video{index} ({}, {}) is not a streaming capture device",
        caps.card, caps.bus_info
    )))
}

fn to_format(fmt: &v4l::Format) -> Format {
    Format {
        width: fmt.width,
        height: fmt.height,
        fourcc: FourCC::from(fmt.fourcc),
        stride: fmt.stride,
        size: fmt.size,
    }
}

impl CameraDevice for V4L2Device {
    type Stream<'a> = V4L2Stream<'a>;

    fn capabilities(&self) -> &DeviceCapabilities {
        &self.capabilities
    }

    fn format(&self) -> Result<Format> {
        let fmt = self
            .device
            .format()
            .map_err(|err| DeviceError::StreamError(err.to_string()))?;

        Ok(to_format(&fmt))
    }

    fn set_format(&mut self, format: &Format) -> Result<Format> {
        let mut fmt = self
            .device
            .format()
            .map_err(|err| DeviceError::StreamError(err.to_string()))?;

        fmt.width = format.width;
        fmt.height = format.height;
        fmt.fourcc = format.fourcc.into();

        // The driver may adjust the request; the returned format is what it settled on.
        let fmt = self
            .device
            .set_format(&fmt)
            .map_err(|_| DeviceError::FormatNotSupported(format.clone()))?;

        Ok(to_format(&fmt))
    }

    fn create_stream(&mut self, buffer_count: u32) -> Result<Self::Stream<'_>> {
        let stream = Stream::with_buffers(&self.device, Type::VideoCapture, buffer_count)
            .map_err(|err| DeviceError::StreamError(err.to_string()))?;

        Ok(V4L2Stream { stream })
    }
}

/// V4L2 capture stream wrapping mmap-based streaming.
pub struct V4L2Stream<'a> {
    stream: Stream<'a>,
}

impl CaptureStream for V4L2Stream<'_> {
    fn next_frame(&mut self) -> Result<Frame> {
        let (buf, meta) = self
            .stream
            .next()
            .map_err(|err| DeviceError::StreamError(err.to_string()))?;

        // Safe conversions: V4L2 timestamps are always non-negative in practice
        #[allow(clippy::cast_sign_loss)]
        let secs = meta.timestamp.sec.max(0) as u64;
        #[allow(clippy::cast_sign_loss, clippy::cast_possible_truncation)]
        let nanos = (meta.timestamp.usec.max(0) as u32).saturating_mul(1000);

        Ok(Frame {
            data: buf.to_vec(),
            metadata: FrameMetadata {
                sequence: meta.sequence,
                timestamp: Duration::new(secs, nanos),
                bytes_used: meta.bytesused,
            },
        })
    }
}

//! Mock device implementation for testing without hardware.

use crate::traits::{
    CameraDevice, CaptureStream, DeviceCapabilities, DeviceError, Format, FourCC, Frame,
    FrameMetadata, Result,
};
use std::time::Duration;

/// Mock device for testing without hardware.
pub struct MockDevice {
    capabilities: DeviceCapabilities,
    format: Format,
    frame_count: u32,
    pattern: TestPattern,
    max_resolution: Option<(u32, u32)>,
    reject_formats: bool,
    failing_frames: Vec<u32>,
    mjpeg_payload: Vec<u8>,
    line_padding: u32,
    startup_frames: u32,
}

impl Default for MockDevice {
    fn default() -> Self {
        Self::new()
    }
}

impl MockDevice {
    /// Create a new mock device with default settings.
    #[must_use]
    pub fn new() -> Self {
        Self {
            capabilities: DeviceCapabilities {
                driver: "mock".to_owned(),
                card: "Mock Camera".to_owned(),
                bus_info: "mock:0".to_owned(),
                can_capture: true,
                can_stream: true,
            },
            format: Format::new(64, 48, FourCC::YUYV),
            frame_count: 0,
            pattern: TestPattern::ColorBars,
            max_resolution: None,
            reject_formats: false,
            failing_frames: Vec::new(),
            mjpeg_payload: vec![0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x10, 0xFF, 0xD9],
            line_padding: 0,
            startup_frames: 0,
        }
    }

    /// Set the format for this mock device.
    #[must_use]
    pub fn with_format(mut self, format: Format) -> Self {
        self.format = self.padded(format);
        self
    }

    /// Pad every line with `padding` bytes, like drivers that align
    /// `bytesperline`.
    #[must_use]
    pub fn with_line_padding(mut self, padding: u32) -> Self {
        self.line_padding = padding;
        self.format = self.padded(self.format.clone());
        self
    }

    /// Make the first `count` frames of every stream unusable: MJPG payloads
    /// are cut short and raw frames come out black.
    #[must_use]
    pub fn with_startup_frames(mut self, count: u32) -> Self {
        self.startup_frames = count;
        self
    }

    /// Set the test pattern used for generated YUYV frames.
    #[must_use]
    pub fn with_pattern(mut self, pattern: TestPattern) -> Self {
        self.pattern = pattern;
        self
    }

    /// Clamp any requested resolution to this size, like a real driver would.
    #[must_use]
    pub fn with_max_resolution(mut self, width: u32, height: u32) -> Self {
        self.max_resolution = Some((width, height));
        self
    }

    /// Make every `set_format` call fail.
    #[must_use]
    pub fn rejecting_formats(mut self) -> Self {
        self.reject_formats = true;
        self
    }

    /// Fail the reads of the given frame numbers (0-based, counted across streams).
    #[must_use]
    pub fn with_failing_frames(mut self, frames: &[u32]) -> Self {
        self.failing_frames = frames.to_vec();
        self
    }

    /// Payload returned for every frame while the format is MJPG.
    #[must_use]
    pub fn with_mjpeg_payload(mut self, payload: &[u8]) -> Self {
        self.mjpeg_payload = payload.to_vec();
        self
    }

    /// Number of frames read so far, including failed reads.
    #[must_use]
    pub const fn frames_read(&self) -> u32 {
        self.frame_count
    }
}

impl CameraDevice for MockDevice {
    type Stream<'a> = MockStream<'a>;

    fn capabilities(&self) -> &DeviceCapabilities {
        &self.capabilities
    }

    fn format(&self) -> Result<Format> {
        Ok(self.format.clone())
    }

    fn set_format(&mut self, format: &Format) -> Result<Format> {
        if self.reject_formats {
            return Err(DeviceError::FormatNotSupported(format.clone()));
        }
        let (width, height) = match self.max_resolution {
            Some((max_w, max_h)) => (format.width.min(max_w), format.height.min(max_h)),
            None => (format.width, format.height),
        };
        self.format = self.padded(Format::new(width, height, format.fourcc));
        Ok(self.format.clone())
    }

    fn create_stream(&mut self, _buffer_count: u32) -> Result<Self::Stream<'_>> {
        Ok(MockStream {
            device: self,
            position: 0,
        })
    }
}

impl MockDevice {
    fn padded(&self, mut format: Format) -> Format {
        format.stride = format.width * bytes_per_pixel(format.fourcc) + self.line_padding;
        format.size = format.stride * format.height;
        format
    }
}

const fn bytes_per_pixel(fourcc: FourCC) -> u32 {
    if matches!(fourcc.0, [b'R', b'G', b'B', b'3']) {
        3
    } else {
        2
    }
}

/// Test pattern types for mock frame generation.
#[derive(Debug, Clone, Copy)]
pub enum TestPattern {
    /// SMPTE color bars pattern.
    ColorBars,
    /// Solid color with specified Y, U, V values.
    Solid(u8, u8, u8),
}

/// Mock capture stream for testing.
pub struct MockStream<'a> {
    device: &'a mut MockDevice,
    position: u32,
}

impl CaptureStream for MockStream<'_> {
    fn next_frame(&mut self) -> Result<Frame> {
        let seq = self.device.frame_count;
        self.device.frame_count += 1;
        let startup = self.position < self.device.startup_frames;
        self.position += 1;

        if self.device.failing_frames.contains(&seq) {
            return Err(DeviceError::StreamError(format!(
                "mock read failure on frame {seq}"
            )));
        }

        let format = &self.device.format;
        let data = if format.fourcc == FourCC::MJPG {
            let payload = &self.device.mjpeg_payload;
            if startup {
                payload[..payload.len() / 2].to_vec()
            } else {
                payload.clone()
            }
        } else if format.fourcc == FourCC::RGB3 {
            let fill = if startup { 0 } else { 200 };
            vec![fill; (format.stride * format.height) as usize]
        } else if startup {
            generate_test_frame(format, TestPattern::Solid(16, 128, 128))
        } else {
            generate_test_frame(format, self.device.pattern)
        };

        #[allow(clippy::cast_possible_truncation)]
        let bytes_used = data.len() as u32;

        Ok(Frame {
            data,
            metadata: FrameMetadata {
                sequence: seq,
                timestamp: Duration::from_millis(u64::from(seq) * 33), // ~30fps
                bytes_used,
            },
        })
    }
}

/// Generate YUYV test frame data based on pattern.
///
/// Line padding beyond `width * 2` bytes is filled with 16 so a reader that
/// ignores the stride sees dark pixels.
fn generate_test_frame(format: &Format, pattern: TestPattern) -> Vec<u8> {
    let stride = format.line_bytes(2) as usize;
    let row_len = (format.width * 2) as usize; // YUYV = 2 bytes/pixel
    let mut data = vec![16u8; stride * format.height as usize];

    for line in data.chunks_exact_mut(stride) {
        let row = &mut line[..row_len];
        match pattern {
            TestPattern::ColorBars => generate_color_bars(row, format.width),
            TestPattern::Solid(y, u, v) => generate_solid(row, y, u, v),
        }
    }

    data
}

/// Generate one line of YUYV color bars.
fn generate_color_bars(row: &mut [u8], width: u32) {
    // White, Yellow, Cyan, Green, Magenta, Red, Blue, Black
    let bars: [(u8, u8, u8); 8] = [
        (235, 128, 128),
        (210, 16, 146),
        (170, 166, 16),
        (145, 54, 34),
        (106, 202, 222),
        (81, 90, 240),
        (41, 240, 110),
        (16, 128, 128),
    ];

    let bar_width = (width / 8).max(1);

    for x in (0..width).step_by(2) {
        let bar_idx = (x / bar_width).min(7) as usize;
        let (y_val, u_val, v_val) = bars[bar_idx];

        let offset = (x * 2) as usize;
        if offset + 3 < row.len() {
            row[offset] = y_val;
            row[offset + 1] = u_val;
            row[offset + 2] = y_val;
            row[offset + 3] = v_val;
        }
    }
}

/// Generate solid color YUYV frame.
fn generate_solid(data: &mut [u8], y: u8, u: u8, v: u8) {
    for chunk in data.chunks_exact_mut(4) {
        chunk.copy_from_slice(&[y, u, y, v]);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mock_device_creation() {
        let device = MockDevice::new();
        assert_eq!(device.capabilities().driver, "mock");
        assert!(device.capabilities().can_capture);
        assert!(device.capabilities().can_stream);
    }

    #[test]
    fn test_mock_device_clamps_resolution() {
        let mut device = MockDevice::new().with_max_resolution(320, 240);
        let actual = device
            .set_format(&Format::new(1280, 720, FourCC::YUYV))
            .expect("set_format should succeed");
        assert_eq!((actual.width, actual.height), (320, 240));
    }

    #[test]
    fn test_mock_stream_failing_frames() {
        let mut device = MockDevice::new().with_failing_frames(&[1]);
        let mut stream = device.create_stream(4).expect("create_stream should succeed");

        assert!(stream.next_frame().is_ok());
        assert!(stream.next_frame().is_err());
        let frame = stream.next_frame().expect("frame 2 should succeed");
        assert_eq!(frame.metadata.sequence, 2);
        drop(stream);
        assert_eq!(device.frames_read(), 3);
    }

    #[test]
    fn test_line_padding_sets_stride_and_fills_padding() {
        let mut device = MockDevice::new()
            .with_pattern(TestPattern::Solid(235, 128, 128))
            .with_line_padding(8);
        assert_eq!(device.format().expect("format").stride, 64 * 2 + 8);

        let mut stream = device.create_stream(4).expect("create_stream should succeed");
        let frame = stream.next_frame().expect("frame");
        assert_eq!(frame.data.len(), (64 * 2 + 8) * 48);
        assert_eq!(frame.data[64 * 2], 16);
        assert_eq!(frame.data[64 * 2 + 8], 235);
    }

    #[test]
    fn test_startup_frames_restart_with_each_stream() {
        let mut device = MockDevice::new()
            .with_format(Format::new(64, 48, FourCC::MJPG))
            .with_startup_frames(1);
        for _ in 0..2 {
            let mut stream = device.create_stream(4).expect("create_stream should succeed");
            assert_eq!(stream.next_frame().expect("frame").data.len(), 4);
            assert_eq!(stream.next_frame().expect("frame").data.len(), 8);
        }
    }

    #[test]
    fn test_color_bars_pattern() {
        let format = Format::new(64, 48, FourCC::YUYV);
        let data = generate_test_frame(&format, TestPattern::ColorBars);

        assert_eq!(data.len(), (64 * 48 * 2) as usize);
        // First bar should be white (Y=235)
        assert_eq!(data[0], 235);
    }

    #[test]
    fn test_solid_pattern() {
        let format = Format::new(8, 8, FourCC::YUYV);
        let data = generate_test_frame(&format, TestPattern::Solid(128, 64, 192));

        assert_eq!(&data[..4], &[128, 64, 128, 192]);
    }
}

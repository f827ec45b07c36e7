//! Real camera driver over any [`CameraDevice`], V4L2 in production.

use std::path::Path;
use std::thread;
use std::time::{Duration, Instant};

use log::{debug, info, warn};

use crate::camera::{Camera, CameraState, DeviceConfig, Negotiated, Resolution};
use crate::device::V4L2Device;
use crate::encode::{encode_jpeg, write_image};
use crate::signal::StopSignal;
use crate::traits::{
    CameraDevice, CaptureStream, DeviceError, Format, FourCC, Frame, Result,
};

/// Wait before the single retry of a failed open.
pub const OPEN_RETRY_BACKOFF: Duration = Duration::from_millis(500);

const STREAM_BUFFERS: u32 = 4;
/// Frames dropped from each capture stream before the one that is kept.
pub const SETTLE_FRAMES: u32 = 3;
const WARMUP_ERROR_PAUSE: Duration = Duration::from_millis(50);

/// Opens the device with the given index.
pub type DeviceOpener<D> = Box<dyn FnMut(u32) -> Result<D>>;

/// Still-capture driver for USB webcams and V4L2-exposed camera modules.
pub struct WebcamCamera<D: CameraDevice> {
    config: DeviceConfig,
    opener: DeviceOpener<D>,
    device: Option<D>,
    format: Option<Format>,
    state: CameraState,
    stop: Option<StopSignal>,
    retry_backoff: Duration,
}

impl WebcamCamera<V4L2Device> {
    /// Driver for `/dev/video{config.index}`. Nothing is opened until
    /// [`Camera::initialize`].
    #[must_use]
    pub fn v4l2(config: DeviceConfig) -> Self {
        Self::with_opener(config, Box::new(V4L2Device::open))
    }
}

impl<D: CameraDevice> WebcamCamera<D> {
    /// Driver that obtains its device from `opener`.
    #[must_use]
    pub fn with_opener(config: DeviceConfig, opener: DeviceOpener<D>) -> Self {
        Self {
            config,
            opener,
            device: None,
            format: None,
            state: CameraState::Unopened,
            stop: None,
            retry_backoff: OPEN_RETRY_BACKOFF,
        }
    }

    /// Let a stop request cut the warm-up window short.
    #[must_use]
    pub fn with_stop_signal(mut self, stop: StopSignal) -> Self {
        self.stop = Some(stop);
        self
    }

    /// Override the pause before retrying a failed open.
    #[must_use]
    pub fn with_retry_backoff(mut self, backoff: Duration) -> Self {
        self.retry_backoff = backoff;
        self
    }

    /// Configuration the driver was built with.
    #[must_use]
    pub const fn config(&self) -> &DeviceConfig {
        &self.config
    }

    /// Format negotiated during initialization, while `Ready`.
    #[must_use]
    pub const fn format(&self) -> Option<&Format> {
        self.format.as_ref()
    }

    fn open_with_retry(&mut self) -> Result<D> {
        let index = self.config.index;
        match (self.opener)(index) {
            Err(DeviceError::DeviceOpenFailed(reason)) => {
                warn!(
                    "Camera {index} did not open ({reason}), retrying in {:?}",
                    self.retry_backoff
                );
                thread::sleep(self.retry_backoff);
                (self.opener)(index)
            }
            other => other,
        }
    }

    fn open_and_configure(&mut self) -> Result<(D, Format, Negotiated)> {
        let mut device = self.open_with_retry()?;
        let caps = device.capabilities();
        info!(
            "Opened camera {}: {} ({}, {})",
            self.config.index, caps.card, caps.driver, caps.bus_info
        );

        let format = negotiate_format(&mut device, self.config.resolution)?;
        let negotiated = Negotiated {
            requested: self.config.resolution,
            actual: Some(Resolution::new(format.width, format.height)),
        };
        if let (true, Some(requested)) = (negotiated.is_mismatch(), negotiated.requested) {
            warn!(
                "Requested resolution {requested} but camera negotiated {}x{}",
                format.width, format.height
            );
        }
        info!(
            "Capture format: {}x{} {}",
            format.width, format.height, format.fourcc
        );

        warm_up(&mut device, self.config.warmup, self.stop.as_ref());
        Ok((device, format, negotiated))
    }
}

/// Apply the requested resolution and make sure frames are encodable.
fn negotiate_format<D: CameraDevice>(
    device: &mut D,
    requested: Option<Resolution>,
) -> Result<Format> {
    let mut format = device.format()?;

    if let Some(res) = requested {
        format = device.set_format(&Format::new(res.width, res.height, format.fourcc))?;
    }

    if !format.fourcc.is_encodable() {
        let fourcc = format.fourcc;
        debug!("Pixel format {fourcc} not encodable, requesting YUYV");
        format = device.set_format(&Format::new(format.width, format.height, FourCC::YUYV))?;
        if !format.fourcc.is_encodable() {
            return Err(DeviceError::FormatNotSupported(format));
        }
    }

    Ok(format)
}

/// Discard frames for `window` so auto exposure and white balance settle.
///
/// Read failures are logged and skipped.
fn warm_up<D: CameraDevice>(device: &mut D, window: Duration, stop: Option<&StopSignal>) {
    if window.is_zero() {
        return;
    }

    let mut stream = match device.create_stream(STREAM_BUFFERS) {
        Ok(stream) => stream,
        Err(err) => {
            warn!("Skipping warm-up, stream did not start: {err}");
            return;
        }
    };

    let deadline = Instant::now() + window;
    let (mut discarded, mut failed) = (0u32, 0u32);
    while Instant::now() < deadline {
        if stop.is_some_and(StopSignal::is_stopped) {
            debug!("Warm-up interrupted by stop request");
            break;
        }
        match stream.next_frame() {
            Ok(_) => discarded += 1,
            Err(err) => {
                failed += 1;
                debug!("Warm-up frame read failed: {err}");
                thread::sleep(WARMUP_ERROR_PAUSE);
            }
        }
    }
    info!("Warm-up done: {discarded} frames dropped, {failed} read errors");
}

/// Read the frame that follows [`SETTLE_FRAMES`] discarded ones.
///
/// The first buffers after stream start can be dark or, for MJPG, cut
/// short. Errors on discarded frames are ignored.
fn settled_frame<S: CaptureStream>(stream: &mut S) -> Result<Frame> {
    for n in 0..SETTLE_FRAMES {
        if let Err(err) = stream.next_frame() {
            debug!("Settle frame {n} read failed: {err}");
        }
    }
    stream.next_frame()
}

impl<D: CameraDevice> Camera for WebcamCamera<D> {
    fn name(&self) -> &'static str {
        "webcam"
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

        match self.open_and_configure() {
            Ok((device, format, negotiated)) => {
                self.device = Some(device);
                self.format = Some(format);
                self.state = CameraState::Ready;
                Ok(negotiated)
            }
            Err(err) => {
                self.state = CameraState::Closed;
                Err(err)
            }
        }
    }

    fn capture_frame(&mut self, path: &Path) -> Result<()> {
        if self.state != CameraState::Ready {
            return Err(DeviceError::InvalidState {
                operation: "capture",
                state: self.state,
            });
        }
        let (Some(device), Some(format)) = (self.device.as_mut(), self.format.as_ref()) else {
            return Err(DeviceError::InvalidState {
                operation: "capture",
                state: CameraState::Closed,
            });
        };

        let frame = {
            let mut stream = device.create_stream(STREAM_BUFFERS)?;
            settled_frame(&mut stream)?
        };
        let bytes = encode_jpeg(&frame, format, self.config.jpeg_quality)?;
        write_image(path, &bytes)?;

        debug!(
            "Wrote {} ({} bytes, frame #{} at {:?})",
            path.display(),
            bytes.len(),
            frame.metadata.sequence,
            frame.metadata.timestamp
        );
        Ok(())
    }

    fn shutdown(&mut self) {
        match self.device.take() {
            Some(device) => {
                drop(device);
                info!("Camera {} released", self.config.index);
            }
            None => debug!("Shutdown while {}, no device to release", self.state),
        }
        self.format = None;
        self.state = CameraState::Closed;
    }
}

//! Still-image encoding and writing for captured frames.

use std::fs;
use std::path::{Path, PathBuf};

use image::codecs::jpeg::JpegEncoder;
use image::RgbImage;

use crate::traits::{DeviceError, Format, FourCC, Frame, Result};

const JPEG_SOI: [u8; 2] = [0xFF, 0xD8];
const JPEG_EOI: [u8; 2] = [0xFF, 0xD9];

/// Encode a frame as a JPEG still.
///
/// MJPG frames already carry a JPEG bitstream. They are passed through up to
/// the end-of-image marker, and a frame missing either marker is rejected as
/// truncated. YUYV and RGB3 frames are converted to RGB and compressed at
/// `quality` (clamped to 1-100).
pub fn encode_jpeg(frame: &Frame, format: &Format, quality: u8) -> Result<Vec<u8>> {
    let image = match format.fourcc {
        FourCC::MJPG => return mjpeg_bitstream(frame.payload()).map(<[u8]>::to_vec),
        FourCC::YUYV => yuyv_to_rgb(frame, format)?,
        FourCC::RGB3 => rgb3_to_rgb(frame, format)?,
        _ => return Err(DeviceError::FormatNotSupported(format.clone())),
    };

    let mut out = Vec::new();
    JpegEncoder::new_with_quality(&mut out, quality.clamp(1, 100))
        .encode_image(&image)
        .map_err(|err| DeviceError::Encode(err.to_string()))?;
    Ok(out)
}

fn mjpeg_bitstream(payload: &[u8]) -> Result<&[u8]> {
    if !payload.starts_with(&JPEG_SOI) {
        return Err(DeviceError::Encode(
            "MJPG frame does not start with a JPEG marker".to_owned(),
        ));
    }
    // Some drivers pad the buffer after the end-of-image marker.
    match payload.windows(2).rposition(|w| w == JPEG_EOI) {
        Some(end) if end >= JPEG_SOI.len() => Ok(&payload[..end + JPEG_EOI.len()]),
        _ => Err(DeviceError::Encode(format!(
            "MJPG frame truncated: no end-of-image marker in {} bytes",
            payload.len()
        ))),
    }
}

fn short_frame(frame: &Frame, format: &Format) -> DeviceError {
    DeviceError::Encode(format!(
        "{} frame too short: {} bytes for {}x{}",
        format.fourcc,
        frame.data.len(),
        format.width,
        format.height
    ))
}

fn yuyv_to_rgb(frame: &Frame, format: &Format) -> Result<RgbImage> {
    let (width, height) = (format.width, format.height);
    let stride = format.line_bytes(2);
    let mut rgb = Vec::with_capacity((width * height * 3) as usize);

    for y in 0..height {
        for x in 0..width {
            let (r, g, b) = frame
                .pixel_at(x, y, stride)
                .ok_or_else(|| short_frame(frame, format))?;
            rgb.extend_from_slice(&[r, g, b]);
        }
    }

    RgbImage::from_raw(width, height, rgb).ok_or_else(|| short_frame(frame, format))
}

fn rgb3_to_rgb(frame: &Frame, format: &Format) -> Result<RgbImage> {
    let stride = format.line_bytes(3) as usize;
    let row_len = (format.width * 3) as usize;
    let mut rgb = Vec::with_capacity(row_len * format.height as usize);

    for y in 0..format.height as usize {
        let start = y * stride;
        let row = frame
            .data
            .get(start..start + row_len)
            .ok_or_else(|| short_frame(frame, format))?;
        rgb.extend_from_slice(row);
    }

    RgbImage::from_raw(format.width, format.height, rgb).ok_or_else(|| short_frame(frame, format))
}

/// Write an encoded image to `path`, creating the parent directory.
///
/// The bytes go to a hidden sibling file first and are renamed into place,
/// so `path` either holds the complete image or does not exist.
pub fn write_image(path: &Path, bytes: &[u8]) -> Result<()> {
    let write_failed = |source| DeviceError::WriteFailed {
        path: path.to_path_buf(),
        source,
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(write_failed)?;
    }

    let partial = partial_path(path);
    if let Err(err) = fs::write(&partial, bytes).and_then(|()| fs::rename(&partial, path)) {
        let _ = fs::remove_file(&partial);
        return Err(write_failed(err));
    }
    Ok(())
}

fn partial_path(path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .map_or_else(|| "image".into(), |n| n.to_string_lossy().into_owned());
    path.with_file_name(format!(".{name}.partial"))
}

use image::{GrayImage, Luma, RgbImage, RgbaImage};
use ndarray::ArrayView3;

use crate::error::{MatteError, Result};

/// One decoded video frame, 8-bit RGB.
pub type Frame = RgbImage;

/// RGBA frame whose alpha channel marks foreground membership
/// (0 = background, 255 = foreground).
/// Dimensions always match the frame it was derived from.
pub type Matte = RgbaImage;

/// Single-channel mask with values in {0, 255}.
pub type BinaryMask = GrayImage;

/// Float buffers whose maximum stays at or below this are treated as
/// normalized to [0, 1].
const NORMALIZED_FLOAT_MAX: f32 = 1.1;

pub fn validate_frame(frame: &Frame) -> Result<()> {
    let (width, height) = frame.dimensions();
    if width == 0 || height == 0 {
        return Err(MatteError::invalid_frame(format!(
            "frame has no pixels ({width}x{height})"
        )));
    }
    Ok(())
}

fn check_layout(width: u32, height: u32, channels: usize, len: usize) -> Result<usize> {
    if width == 0 || height == 0 {
        return Err(MatteError::invalid_frame(format!(
            "frame has no pixels ({width}x{height})"
        )));
    }
    if channels != 3 && channels != 4 {
        return Err(MatteError::invalid_frame(format!(
            "unsupported channel count {channels} (expected 3 or 4)"
        )));
    }
    let expected = (width as usize)
        .checked_mul(height as usize)
        .and_then(|v| v.checked_mul(channels))
        .ok_or_else(|| MatteError::invalid_frame("frame buffer size overflow"))?;
    if len != expected {
        return Err(MatteError::invalid_frame(format!(
            "buffer holds {len} values, expected {expected} for {width}x{height}x{channels}"
        )));
    }
    Ok(expected)
}

/// Build a frame from interleaved 8-bit samples. A fourth channel, if present,
/// is discarded.
pub fn frame_from_u8(width: u32, height: u32, channels: usize, data: &[u8]) -> Result<Frame> {
    check_layout(width, height, channels, data.len())?;
    let rgb: Vec<u8> = data
        .chunks_exact(channels)
        .flat_map(|px| [px[0], px[1], px[2]])
        .collect();
    RgbImage::from_raw(width, height, rgb)
        .ok_or_else(|| MatteError::invalid_frame("frame buffer does not match dimensions"))
}

/// Build a frame from interleaved float samples.
///
/// Decoders hand out floats either normalized to [0, 1] or already in
/// 0..=255. If the largest value is at most 1.1 the buffer is scaled by 255,
/// otherwise it is only clipped. Values are rounded to the nearest integer.
pub fn frame_from_f32(width: u32, height: u32, channels: usize, data: &[f32]) -> Result<Frame> {
    check_layout(width, height, channels, data.len())?;
    let scale = float_scale(data.iter().copied());
    let rgb: Vec<u8> = data
        .chunks_exact(channels)
        .flat_map(|px| [px[0], px[1], px[2]])
        .map(|v| float_to_u8(v, scale))
        .collect();
    RgbImage::from_raw(width, height, rgb)
        .ok_or_else(|| MatteError::invalid_frame("frame buffer does not match dimensions"))
}

/// Same as [`frame_from_f32`] for a height x width x channels array.
pub fn frame_from_array(array: ArrayView3<'_, f32>) -> Result<Frame> {
    let (height, width, channels) = array.dim();
    let width = u32::try_from(width).map_err(|_| MatteError::invalid_frame("frame too wide"))?;
    let height = u32::try_from(height).map_err(|_| MatteError::invalid_frame("frame too tall"))?;
    check_layout(width, height, channels, array.len())?;

    let scale = float_scale(array.iter().copied());
    Ok(RgbImage::from_fn(width, height, |x, y| {
        let (x, y) = (x as usize, y as usize);
        image::Rgb([
            float_to_u8(array[[y, x, 0]], scale),
            float_to_u8(array[[y, x, 1]], scale),
            float_to_u8(array[[y, x, 2]], scale),
        ])
    }))
}

fn float_scale(values: impl Iterator<Item = f32>) -> f32 {
    let max = values.filter(|v| !v.is_nan()).fold(f32::MIN, f32::max);
    if max <= NORMALIZED_FLOAT_MAX {
        255.0
    } else {
        1.0
    }
}

fn float_to_u8(value: f32, scale: f32) -> u8 {
    if value.is_nan() {
        return 0;
    }
    (value * scale).clamp(0.0, 255.0).round() as u8
}

/// Alpha channel of a matte as a grayscale image.
pub fn matte_to_gray(matte: &Matte) -> GrayImage {
    GrayImage::from_fn(matte.width(), matte.height(), |x, y| {
        Luma([matte.get_pixel(x, y)[3]])
    })
}

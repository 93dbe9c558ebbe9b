use image::{DynamicImage, ImageFormat};
use ndarray::Array3;

use crate::error::{AnalysisError, Result};
use crate::frame::{RawFrame, SampleData};

use super::format::extension_of;

/// Decode a single still image (JPEG, PNG, ...) into one raw frame.
///
/// The format is taken from the extension when `image` knows it, otherwise
/// guessed from the content.
pub fn decode_still(name: &str, bytes: &[u8]) -> Result<RawFrame> {
    let format = extension_of(name).and_then(ImageFormat::from_extension);
    let img = match format {
        Some(format) => image::load_from_memory_with_format(bytes, format),
        None => image::load_from_memory(bytes),
    }
    .map_err(|e| AnalysisError::decode(name, e))?;

    from_dynamic(name, img)
}

/// Keep the decoded sample type and channel layout of an `image` buffer.
pub fn from_dynamic(name: &str, img: DynamicImage) -> Result<RawFrame> {
    let h = img.height() as usize;
    let w = img.width() as usize;

    let frame = match img {
        DynamicImage::ImageLuma8(buf) => {
            RawFrame::new(SampleData::U8(planar(name, h, w, 1, buf.into_raw())?), 8)
        }
        DynamicImage::ImageLumaA8(buf) => {
            RawFrame::new(SampleData::U8(planar(name, h, w, 2, buf.into_raw())?), 8)
        }
        DynamicImage::ImageRgb8(buf) => {
            RawFrame::new(SampleData::U8(planar(name, h, w, 3, buf.into_raw())?), 8)
        }
        DynamicImage::ImageRgba8(buf) => {
            RawFrame::new(SampleData::U8(planar(name, h, w, 4, buf.into_raw())?), 8)
        }
        DynamicImage::ImageLuma16(buf) => {
            RawFrame::new(SampleData::U16(planar(name, h, w, 1, buf.into_raw())?), 16)
        }
        DynamicImage::ImageLumaA16(buf) => {
            RawFrame::new(SampleData::U16(planar(name, h, w, 2, buf.into_raw())?), 16)
        }
        DynamicImage::ImageRgb16(buf) => {
            RawFrame::new(SampleData::U16(planar(name, h, w, 3, buf.into_raw())?), 16)
        }
        DynamicImage::ImageRgba16(buf) => {
            RawFrame::new(SampleData::U16(planar(name, h, w, 4, buf.into_raw())?), 16)
        }
        DynamicImage::ImageRgb32F(buf) => {
            RawFrame::new(SampleData::F32(planar(name, h, w, 3, buf.into_raw())?), 32)
        }
        other => {
            let buf = other.to_rgba32f();
            RawFrame::new(SampleData::F32(planar(name, h, w, 4, buf.into_raw())?), 32)
        }
    };
    Ok(frame)
}

/// Interleaved samples -> (height, width, channels).
pub(crate) fn planar<T>(
    name: &str,
    height: usize,
    width: usize,
    channels: usize,
    samples: Vec<T>,
) -> Result<Array3<T>> {
    Array3::from_shape_vec((height, width, channels), samples)
        .map_err(|e| AnalysisError::decode(name, format!("sample buffer mismatch: {e}")))
}

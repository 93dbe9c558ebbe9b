use std::io::{Read, Seek};

use num_traits::AsPrimitive;
use tiff::decoder::{Decoder, DecodingResult, Limits};
use tiff::ColorType;
use tracing::{debug, warn};

use crate::error::{AnalysisError, Result};
use crate::frame::{RawFrame, SampleData};

use super::extract::FrameSlot;
use super::still::planar;

/// Decode every page of a (multi-page) TIFF.
///
/// A page whose pixel data cannot be decoded becomes an error slot and the
/// next page is tried. A broken IFD chain records one error slot for the
/// unreachable page and ends the sequence.
pub fn decode_pages(name: &str, bytes: &[u8]) -> Result<Vec<FrameSlot>> {
    // Large microscopy stacks exceed the default decoder limits.
    let mut limits = Limits::default();
    limits.decoding_buffer_size = 1024 * 1024 * 1024;
    limits.ifd_value_size = 1024 * 1024 * 1024;
    limits.intermediate_buffer_size = 1024 * 1024 * 1024;

    let mut decoder = Decoder::new(std::io::Cursor::new(bytes))
        .map_err(|e| AnalysisError::decode(name, e))?
        .with_limits(limits);

    let mut slots = Vec::new();
    loop {
        let page = slots.len();
        let slot = read_page(&mut decoder, name, page);
        if let Err(ref e) = slot {
            warn!(source = name, page = page + 1, error = %e, "TIFF page failed to decode");
        }
        slots.push(slot);

        if !decoder.more_images() {
            break;
        }
        if let Err(e) = decoder.next_image() {
            slots.push(Err(AnalysisError::decode(
                name,
                format!("page {}: {e}", page + 2),
            )));
            break;
        }
    }

    debug!(source = name, pages = slots.len(), "TIFF pages read");
    Ok(slots)
}

fn read_page<R: Read + Seek>(decoder: &mut Decoder<R>, name: &str, page: usize) -> FrameSlot {
    let page_err = |e: &dyn std::fmt::Display| AnalysisError::decode(name, format!("page {}: {e}", page + 1));

    let (width, height) = decoder.dimensions().map_err(|e| page_err(&e))?;
    let color_type = decoder.colortype().map_err(|e| page_err(&e))?;
    let (channels, bits) = match color_type {
        ColorType::Gray(bits) => (1, bits),
        ColorType::GrayA(bits) => (2, bits),
        ColorType::RGB(bits) => (3, bits),
        ColorType::RGBA(bits) => (4, bits),
        other => return Err(page_err(&format!("unsupported color type {other:?}"))),
    };

    let image = decoder.read_image().map_err(|e| page_err(&e))?;
    let (h, w) = (height as usize, width as usize);

    let data = match image {
        DecodingResult::U8(buf) => SampleData::U8(planar(name, h, w, channels, buf)?),
        DecodingResult::U16(buf) => SampleData::U16(planar(name, h, w, channels, buf)?),
        DecodingResult::U32(buf) => {
            SampleData::F32(planar(name, h, w, channels, to_unit_range(&buf, u32::MAX as f64))?)
        }
        DecodingResult::U64(buf) => {
            SampleData::F32(planar(name, h, w, channels, to_unit_range(&buf, u64::MAX as f64))?)
        }
        DecodingResult::F32(buf) => SampleData::F32(planar(name, h, w, channels, buf)?),
        DecodingResult::F64(buf) => {
            SampleData::F32(planar(name, h, w, channels, to_unit_range(&buf, 1.0))?)
        }
        _ => return Err(page_err(&"signed or half-float samples are not supported")),
    };

    let bit_depth = match data {
        SampleData::U8(_) => 8,
        SampleData::U16(_) => bits.clamp(9, 16),
        SampleData::F32(_) => 32,
    };

    let mut frame = RawFrame::new(data, bit_depth);
    frame.metadata.plane_index = page;
    Ok(frame)
}

fn to_unit_range<T: AsPrimitive<f64>>(buf: &[T], full_scale: f64) -> Vec<f32> {
    buf.iter().map(|&v| (v.as_() / full_scale) as f32).collect()
}

use ndarray::{Array2, ArrayView3, Axis};
use num_traits::AsPrimitive;
use tracing::warn;

use crate::consts::{LUMINANCE_B, LUMINANCE_G, LUMINANCE_R};
use crate::frame::{NormalizedFrame, RawFrame, SampleData};

/// Collapse a raw frame to one 8-bit intensity channel.
///
/// Color frames (3 or 4 channels) go through BT.601 luminance in their native
/// sample scale; alpha is ignored. The result is then brought into 0..=255:
///
/// - `u8`: rounded as is.
/// - `u16`: cast directly when the frame maximum is at most 255, otherwise
///   scaled by `255 / (2^bits - 1)` using the frame's significant bits.
/// - `f32`: scaled by 255 when every sample lies in [0, 1], rounded when every
///   sample lies in [0, 255], clamped to [0, 255] otherwise.
///
/// Samples that have to be clamped (including NaN, which maps to 0) are
/// counted and reported with a warning.
pub fn normalize(frame: &RawFrame) -> NormalizedFrame {
    let data = match &frame.data {
        SampleData::U8(samples) if samples.dim().2 < 3 => {
            samples.index_axis(Axis(2), 0).to_owned()
        }
        SampleData::U8(samples) => intensity(samples.view()).mapv(|v| v.round().clamp(0.0, 255.0) as u8),
        SampleData::U16(samples) => rescale_u16(&intensity(samples.view()), frame.bit_depth),
        SampleData::F32(samples) => rescale_f32(&intensity(samples.view())),
    };
    NormalizedFrame::new(data)
}

/// Single intensity plane in the native sample scale.
pub fn intensity<T: AsPrimitive<f32>>(samples: ArrayView3<T>) -> Array2<f32> {
    let (h, w, channels) = samples.dim();
    if channels < 3 {
        return samples.index_axis(Axis(2), 0).mapv(|v| v.as_());
    }
    Array2::from_shape_fn((h, w), |(row, col)| {
        LUMINANCE_R * samples[[row, col, 0]].as_()
            + LUMINANCE_G * samples[[row, col, 1]].as_()
            + LUMINANCE_B * samples[[row, col, 2]].as_()
    })
}

fn rescale_u16(values: &Array2<f32>, bit_depth: u8) -> Array2<u8> {
    let max = values.iter().copied().fold(0.0_f32, f32::max);
    if max <= 255.0 {
        return values.mapv(|v| v.round() as u8);
    }

    let bits = bit_depth.clamp(9, 16) as u32;
    let full_scale = ((1u32 << bits) - 1) as f32;
    let scale = 255.0 / full_scale;

    let clamped = values.iter().filter(|&&v| v > full_scale).count();
    if clamped > 0 {
        warn!(clamped, bits, "Samples exceed declared bit depth, clamping");
    }
    values.mapv(|v| (v.min(full_scale) * scale).round() as u8)
}

fn rescale_f32(values: &Array2<f32>) -> Array2<u8> {
    let (min, max) = values
        .iter()
        .filter(|v| !v.is_nan())
        .fold((f32::INFINITY, f32::NEG_INFINITY), |(lo, hi), &v| {
            (lo.min(v), hi.max(v))
        });

    let scale = if min >= 0.0 && max <= 1.0 { 255.0 } else { 1.0 };

    let mut clamped = 0usize;
    let data = values.mapv(|v| {
        if v.is_nan() {
            clamped += 1;
            return 0;
        }
        let scaled = (v * scale).round();
        if !(0.0..=255.0).contains(&scaled) {
            clamped += 1;
        }
        scaled.clamp(0.0, 255.0) as u8
    });

    if clamped > 0 {
        warn!(clamped, min, max, "Float samples outside [0, 255], clamping");
    }
    data
}

use crate::consts::ENTROPY_EPSILON;
use crate::error::DegenerateReason;

use super::entropy::EntropyMap;

/// Otsu's thresholding over an entropy map.
///
/// Builds a `bins`-bin histogram spanning `[min, max]` of the map and returns
/// the center of the bin that maximizes between-class variance. The first
/// maximum wins, so the result is deterministic.
pub fn otsu_threshold(map: &EntropyMap, bins: usize) -> Result<f32, DegenerateReason> {
    let (min, max) = map.min_max().ok_or(DegenerateReason::EmptyFrame)?;
    if !(max - min >= ENTROPY_EPSILON) {
        return Err(DegenerateReason::ConstantEntropy);
    }

    let bins = bins.max(2);
    let bin_width = (max - min) as f64 / bins as f64;
    let mut histogram = vec![0u64; bins];

    for &v in map.data.iter() {
        let bin = (((v - min) as f64 / bin_width) as usize).min(bins - 1);
        histogram[bin] += 1;
    }

    let total = map.data.len() as f64;
    let mut sum_all: f64 = 0.0;
    for (i, &count) in histogram.iter().enumerate() {
        sum_all += i as f64 * count as f64;
    }

    let mut weight_bg: f64 = 0.0;
    let mut sum_bg: f64 = 0.0;
    let mut best_variance = 0.0_f64;
    let mut best_bin = 0usize;

    for (i, &count) in histogram.iter().enumerate() {
        weight_bg += count as f64;
        if weight_bg == 0.0 {
            continue;
        }
        let weight_fg = total - weight_bg;
        if weight_fg == 0.0 {
            break;
        }
        sum_bg += i as f64 * count as f64;
        let mean_bg = sum_bg / weight_bg;
        let mean_fg = (sum_all - sum_bg) / weight_fg;
        let between_variance = weight_bg * weight_fg * (mean_bg - mean_fg).powi(2);

        if between_variance > best_variance {
            best_variance = between_variance;
            best_bin = i;
        }
    }

    Ok((min as f64 + (best_bin as f64 + 0.5) * bin_width) as f32)
}

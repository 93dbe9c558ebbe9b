use ndarray::{Array2, ArrayViewMut1, Axis};
use rayon::prelude::*;

use crate::consts::{GRAY_LEVELS, PARALLEL_PIXEL_THRESHOLD};
use crate::frame::NormalizedFrame;

/// Per-pixel local texture score, same shape as the frame it came from.
#[derive(Clone, Debug, PartialEq)]
pub struct EntropyMap {
    pub data: Array2<f32>,
}

impl EntropyMap {
    pub fn height(&self) -> usize {
        self.data.nrows()
    }

    pub fn width(&self) -> usize {
        self.data.ncols()
    }

    /// Smallest and largest entropy value, `None` for an empty map.
    pub fn min_max(&self) -> Option<(f32, f32)> {
        if self.data.is_empty() {
            return None;
        }
        Some(self.data.iter().fold((f32::INFINITY, f32::NEG_INFINITY), |(lo, hi), &v| {
            (lo.min(v), hi.max(v))
        }))
    }
}

/// Horizontal extent of a disk footprint for every vertical offset.
///
/// Returns `(dy, half_width)` pairs so that row `dy` of the disk covers
/// `-half_width..=half_width`, with `dx^2 + dy^2 <= radius^2`.
pub fn disk_spans(radius: usize) -> Vec<(isize, usize)> {
    let r = radius as isize;
    (-r..=r)
        .map(|dy| {
            let remaining = r * r - dy * dy;
            let mut half_width = 0isize;
            while (half_width + 1) * (half_width + 1) <= remaining {
                half_width += 1;
            }
            (dy, half_width as usize)
        })
        .collect()
}

/// Number of pixels in a full (untruncated) disk footprint.
pub fn disk_area(radius: usize) -> usize {
    disk_spans(radius).iter().map(|&(_, hw)| 2 * hw + 1).sum()
}

/// Shannon entropy (bits) of the gray-level histogram in a disk around each pixel.
///
/// Neighbors that fall outside the image are left out, so border pixels see a
/// truncated disk. Each row slides one histogram from left to right; rows are
/// independent and run in parallel on large frames.
pub fn local_entropy(frame: &NormalizedFrame, radius: usize) -> EntropyMap {
    local_entropy_with(frame, radius, true)
}

/// [`local_entropy`] with row parallelism switched on or off. Both paths
/// produce bit-identical maps.
pub fn local_entropy_with(frame: &NormalizedFrame, radius: usize, parallel: bool) -> EntropyMap {
    let (h, w) = frame.data.dim();
    let mut data = Array2::<f32>::zeros((h, w));
    if h == 0 || w == 0 {
        return EntropyMap { data };
    }

    let spans = disk_spans(radius);
    let table = plogp_table(disk_area(radius));

    if parallel && h * w >= PARALLEL_PIXEL_THRESHOLD {
        data.axis_iter_mut(Axis(0))
            .into_par_iter()
            .enumerate()
            .for_each(|(row, out)| fill_row(&frame.data, row, &spans, &table, out));
    } else {
        for (row, out) in data.axis_iter_mut(Axis(0)).enumerate() {
            fill_row(&frame.data, row, &spans, &table, out);
        }
    }

    EntropyMap { data }
}

fn fill_row(
    pixels: &Array2<u8>,
    row: usize,
    spans: &[(isize, usize)],
    table: &[f64],
    mut out: ArrayViewMut1<f32>,
) {
    let (h, w) = pixels.dim();
    let rows: Vec<(usize, usize)> = spans
        .iter()
        .filter_map(|&(dy, hw)| {
            let r = row as isize + dy;
            (r >= 0 && r < h as isize).then_some((r as usize, hw))
        })
        .collect();

    let mut window = Window::new(table);
    for &(r, hw) in &rows {
        for col in 0..=hw.min(w - 1) {
            window.add(pixels[[r, col]]);
        }
    }
    out[0] = window.entropy();

    for col in 1..w {
        for &(r, hw) in &rows {
            if let Some(leaving) = (col - 1).checked_sub(hw) {
                window.remove(pixels[[r, leaving]]);
            }
            let entering = col + hw;
            if entering < w {
                window.add(pixels[[r, entering]]);
            }
        }
        out[col] = window.entropy();
    }
}

/// `k * log2(k)` for every count a footprint can hold.
fn plogp_table(max_count: usize) -> Vec<f64> {
    (0..=max_count)
        .map(|k| if k == 0 { 0.0 } else { k as f64 * (k as f64).log2() })
        .collect()
}

/// Sliding gray-level histogram with a running `sum(c * log2 c)`.
struct Window<'a> {
    histogram: [u32; GRAY_LEVELS],
    count: u32,
    occupied: u32,
    sum_plogp: f64,
    table: &'a [f64],
}

impl<'a> Window<'a> {
    fn new(table: &'a [f64]) -> Self {
        Self {
            histogram: [0; GRAY_LEVELS],
            count: 0,
            occupied: 0,
            sum_plogp: 0.0,
            table,
        }
    }

    fn add(&mut self, value: u8) {
        let c = self.histogram[value as usize] as usize;
        if c == 0 {
            self.occupied += 1;
        }
        self.sum_plogp += self.table[c + 1] - self.table[c];
        self.histogram[value as usize] += 1;
        self.count += 1;
    }

    fn remove(&mut self, value: u8) {
        let c = self.histogram[value as usize] as usize;
        if c == 1 {
            self.occupied -= 1;
        }
        self.sum_plogp += self.table[c - 1] - self.table[c];
        self.histogram[value as usize] -= 1;
        self.count -= 1;
    }

    // H = log2(n) - sum(c log2 c) / n
    fn entropy(&self) -> f32 {
        if self.occupied <= 1 {
            return 0.0;
        }
        let n = self.count as f64;
        (n.log2() - self.sum_plogp / n).max(0.0) as f32
    }
}

use image::{GrayImage, Luma};
use ndarray::Array2;

use super::entropy::EntropyMap;

/// Binary scratch classification of a frame; `true` marks scratch pixels.
#[derive(Clone, Debug, PartialEq)]
pub struct ScratchMask {
    pub data: Array2<bool>,
    /// Entropy threshold the mask was cut at.
    pub threshold: f32,
}

impl ScratchMask {
    /// Pixels strictly below `threshold` are scratch; ties stay with the cells.
    pub fn from_threshold(map: &EntropyMap, threshold: f32) -> Self {
        Self {
            data: map.data.mapv(|v| v < threshold),
            threshold,
        }
    }

    pub fn height(&self) -> usize {
        self.data.nrows()
    }

    pub fn width(&self) -> usize {
        self.data.ncols()
    }

    pub fn scratch_pixels(&self) -> usize {
        self.data.iter().filter(|&&s| s).count()
    }

    /// Scratch pixels white, cell-covered pixels black.
    pub fn to_image(&self) -> GrayImage {
        GrayImage::from_fn(self.width() as u32, self.height() as u32, |x, y| {
            Luma([if self.data[[y as usize, x as usize]] { 255 } else { 0 }])
        })
    }
}

use serde::{Deserialize, Serialize};

use crate::error::{AnalysisError, DegenerateReason, ErrorKind};
use crate::segment::ScratchMask;

/// Scratch area of one frame.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct AreaMeasurement {
    pub scratch_pixels: u64,
    pub total_pixels: u64,
    /// `scratch_pixels * 100 / total_pixels`, in [0, 100].
    pub percentage: f64,
}

/// Reduce a mask to its scratch pixel count and percentage of frame area.
pub fn measure(mask: &ScratchMask) -> Result<AreaMeasurement, DegenerateReason> {
    let total = mask.height() * mask.width();
    if total == 0 {
        return Err(DegenerateReason::EmptyFrame);
    }
    let scratch = mask.scratch_pixels();
    Ok(AreaMeasurement {
        scratch_pixels: scratch as u64,
        total_pixels: total as u64,
        percentage: scratch as f64 * 100.0 / total as f64,
    })
}

/// One row of a batch: a measured frame, a failed frame, or a failed file.
///
/// `frame` is 1-based and absent when the whole file failed before any frame
/// could be addressed.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FrameResult {
    pub sequence: usize,
    pub source: String,
    pub frame: Option<usize>,
    pub scratch_pixels: Option<u64>,
    pub total_pixels: Option<u64>,
    pub percentage: Option<f64>,
    pub error: Option<String>,
    pub error_kind: Option<ErrorKind>,
}

impl FrameResult {
    pub fn measured(
        sequence: usize,
        source: impl Into<String>,
        frame: usize,
        measurement: &AreaMeasurement,
    ) -> Self {
        Self {
            sequence,
            source: source.into(),
            frame: Some(frame),
            scratch_pixels: Some(measurement.scratch_pixels),
            total_pixels: Some(measurement.total_pixels),
            percentage: Some(measurement.percentage),
            error: None,
            error_kind: None,
        }
    }

    pub fn failed(
        sequence: usize,
        source: impl Into<String>,
        frame: Option<usize>,
        error: &AnalysisError,
    ) -> Self {
        Self {
            sequence,
            source: source.into(),
            frame,
            scratch_pixels: None,
            total_pixels: None,
            percentage: None,
            error: Some(error.to_string()),
            error_kind: Some(error.kind()),
        }
    }

    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }

    pub fn measurement(&self) -> Option<AreaMeasurement> {
        Some(AreaMeasurement {
            scratch_pixels: self.scratch_pixels?,
            total_pixels: self.total_pixels?,
            percentage: self.percentage?,
        })
    }
}

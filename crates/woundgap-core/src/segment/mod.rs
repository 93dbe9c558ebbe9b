pub mod entropy;
pub mod mask;
pub mod threshold;

use serde::{Deserialize, Serialize};

use crate::consts::{DEFAULT_ENTROPY_RADIUS, OTSU_HISTOGRAM_BINS};
use crate::error::DegenerateReason;
use crate::frame::NormalizedFrame;

pub use entropy::{local_entropy, local_entropy_with, EntropyMap};
pub use mask::ScratchMask;
pub use threshold::otsu_threshold;

/// Parameters of the entropy + Otsu segmentation.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SegmentConfig {
    /// Radius of the disk neighborhood used by the entropy filter.
    pub radius: usize,
    /// Histogram bins for Otsu's threshold over the entropy map.
    pub bins: usize,
    /// Compute entropy rows of large frames in parallel.
    pub parallel: bool,
}

impl Default for SegmentConfig {
    fn default() -> Self {
        Self {
            radius: DEFAULT_ENTROPY_RADIUS,
            bins: OTSU_HISTOGRAM_BINS,
            parallel: true,
        }
    }
}

/// Split a frame into smooth scratch and textured cell-covered regions.
///
/// Pipeline: local entropy -> Otsu threshold -> `entropy < threshold`.
pub fn segment(
    frame: &NormalizedFrame,
    config: &SegmentConfig,
) -> Result<ScratchMask, DegenerateReason> {
    if frame.pixel_count() == 0 {
        return Err(DegenerateReason::EmptyFrame);
    }
    let entropy = local_entropy_with(frame, config.radius, config.parallel);
    let threshold = otsu_threshold(&entropy, config.bins)?;
    Ok(ScratchMask::from_threshold(&entropy, threshold))
}

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::consts::{DEFAULT_ENTROPY_RADIUS, MAX_ENTROPY_RADIUS, OTSU_HISTOGRAM_BINS};
use crate::error::{AnalysisError, Result};
use crate::io::PlanePolicy;
use crate::segment::SegmentConfig;

/// Settings for one batch analysis. Every field has a default, so a TOML
/// file only needs the keys it changes.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Radius of the disk neighborhood used by the entropy filter.
    pub entropy_radius: usize,
    /// Histogram bins for Otsu's threshold.
    pub histogram_bins: usize,
    /// Which planes of multi-plane microscopy files are analyzed.
    pub planes: PlanePolicy,
    /// Process frames of one file (and entropy rows of large frames) with Rayon.
    pub parallel: bool,
    /// Write every measured frame's scratch mask as a PNG into this directory.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mask_dir: Option<PathBuf>,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            entropy_radius: DEFAULT_ENTROPY_RADIUS,
            histogram_bins: OTSU_HISTOGRAM_BINS,
            planes: PlanePolicy::All,
            parallel: true,
            mask_dir: None,
        }
    }
}

impl AnalysisConfig {
    pub fn validate(&self) -> Result<()> {
        if self.entropy_radius == 0 {
            return Err(AnalysisError::InvalidConfig(
                "entropy_radius must be at least 1".into(),
            ));
        }
        if self.entropy_radius > MAX_ENTROPY_RADIUS {
            return Err(AnalysisError::InvalidConfig(format!(
                "entropy_radius must be at most {MAX_ENTROPY_RADIUS} (got {})",
                self.entropy_radius
            )));
        }
        if self.histogram_bins < 2 {
            return Err(AnalysisError::InvalidConfig(format!(
                "histogram_bins must be at least 2 (got {})",
                self.histogram_bins
            )));
        }
        Ok(())
    }

    pub fn segment_config(&self) -> SegmentConfig {
        SegmentConfig {
            radius: self.entropy_radius,
            bins: self.histogram_bins,
            parallel: self.parallel,
        }
    }
}

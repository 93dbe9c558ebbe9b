use std::path::{Path, PathBuf};
use std::sync::Arc;

use rayon::prelude::*;
use tracing::{debug, info, warn};

use crate::consts::PARALLEL_FRAME_THRESHOLD;
use crate::error::{AnalysisError, DegenerateReason, Result};
use crate::io::archive;
use crate::io::source::join_identifier;
use crate::io::{decode_frames, FrameSlot, InputSource, LoadedSource, SourceKind};
use crate::normalize::normalize;
use crate::quantify::{measure, AreaMeasurement, FrameResult};
use crate::report::masks::save_mask;
use crate::segment::{segment, SegmentConfig};

use super::config::AnalysisConfig;
use super::enumerate::{enumerate_directory, enumerate_paths};
use super::types::{AnalysisStage, BatchResult, ProgressReporter};

/// Analyze a batch of sources, in order.
///
/// Only an invalid config, or a mask directory that cannot be created, fails
/// the call. Past that, a source that cannot be
/// read or decoded becomes a single error row, a frame that cannot be decoded
/// or segmented becomes an error row for that frame, and the batch moves on.
/// An empty list gives an empty result.
pub fn analyze(
    sources: Vec<InputSource>,
    config: &AnalysisConfig,
    reporter: Arc<dyn ProgressReporter>,
) -> Result<BatchResult> {
    prepare(config)?;
    Ok(run_batch(sources, config, reporter))
}

fn prepare(config: &AnalysisConfig) -> Result<()> {
    config.validate()?;
    if let Some(dir) = &config.mask_dir {
        std::fs::create_dir_all(dir)?;
    }
    Ok(())
}

fn run_batch(
    sources: Vec<InputSource>,
    config: &AnalysisConfig,
    reporter: Arc<dyn ProgressReporter>,
) -> BatchResult {
    let total = sources.len();
    info!(sources = total, "Analyzing batch");

    let segment_config = config.segment_config();
    let mut batch = BatchCollector::default();

    reporter.begin_stage(AnalysisStage::Analyzing, Some(total));
    for (done, source) in sources.into_iter().enumerate() {
        analyze_source(source, config, &segment_config, &mut batch);
        reporter.advance(done + 1);
    }
    reporter.finish_stage();

    let result = batch.finish();
    info!(
        rows = result.len(),
        failed = result.failures().count(),
        "Batch complete"
    );
    result
}

/// Analyze every recognized file below a directory.
pub fn analyze_directory(
    path: &Path,
    config: &AnalysisConfig,
    reporter: Arc<dyn ProgressReporter>,
) -> Result<BatchResult> {
    prepare(config)?;
    reporter.begin_stage(AnalysisStage::Enumerating, None);
    let sources = enumerate_directory(path);
    reporter.finish_stage();
    Ok(run_batch(sources?, config, reporter))
}

/// Analyze a mixed list of files and directories, in argument order.
pub fn analyze_paths(
    paths: &[PathBuf],
    config: &AnalysisConfig,
    reporter: Arc<dyn ProgressReporter>,
) -> Result<BatchResult> {
    prepare(config)?;
    reporter.begin_stage(AnalysisStage::Enumerating, Some(paths.len()));
    let sources = enumerate_paths(paths);
    reporter.finish_stage();
    Ok(run_batch(sources?, config, reporter))
}

/// Accumulates rows and hands out batch-wide sequence numbers.
#[derive(Default)]
struct BatchCollector {
    rows: Vec<FrameResult>,
}

impl BatchCollector {
    fn next_sequence(&self) -> usize {
        self.rows.len() + 1
    }

    fn file_failed(&mut self, id: &str, error: &AnalysisError) {
        warn!(source = id, error = %error, "Source failed");
        let row = FrameResult::failed(self.next_sequence(), id, None, error);
        self.rows.push(row);
    }

    fn frame_done(&mut self, id: &str, frame: usize, outcome: &Result<AreaMeasurement>) {
        let sequence = self.next_sequence();
        let row = match outcome {
            Ok(m) => FrameResult::measured(sequence, id, frame, m),
            Err(e) => {
                warn!(source = id, frame, error = %e, "Frame failed");
                FrameResult::failed(sequence, id, Some(frame), e)
            }
        };
        self.rows.push(row);
    }

    fn finish(self) -> BatchResult {
        BatchResult { rows: self.rows }
    }
}

fn analyze_source(
    source: InputSource,
    config: &AnalysisConfig,
    segment_config: &SegmentConfig,
    batch: &mut BatchCollector,
) {
    let id = source.identifier();
    let loaded = match source.load() {
        Ok(loaded) => loaded,
        Err(e) => return batch.file_failed(&id, &e),
    };
    let kind = match loaded.classify() {
        Ok(kind) => kind,
        Err(e) => return batch.file_failed(&id, &e),
    };

    if kind == SourceKind::Archive {
        analyze_archive(&loaded, config, segment_config, batch);
    } else {
        analyze_container(&loaded, kind, config, segment_config, batch);
    }
}

/// Every image member of an archive is analyzed as its own source, named
/// `<archive id>/<member path>`.
fn analyze_archive(
    archive_source: &LoadedSource,
    config: &AnalysisConfig,
    segment_config: &SegmentConfig,
    batch: &mut BatchCollector,
) {
    let members = archive_source
        .bytes()
        .and_then(|bytes| archive::members(&archive_source.id, &bytes));
    let members = match members {
        Ok(members) => members,
        Err(e) => return batch.file_failed(&archive_source.id, &e),
    };
    if members.is_empty() {
        let e = AnalysisError::decode(&archive_source.id, "archive contains no image files");
        return batch.file_failed(&archive_source.id, &e);
    }

    for (member, bytes) in members {
        let member_id = join_identifier(Some(archive_source.id.as_str()), &member);
        let loaded = match bytes {
            Ok(bytes) => LoadedSource::archive_member(&archive_source.id, &member, bytes),
            Err(e) => {
                batch.file_failed(&member_id, &e);
                continue;
            }
        };
        match loaded.classify() {
            Ok(kind) => analyze_container(&loaded, kind, config, segment_config, batch),
            Err(e) => batch.file_failed(&member_id, &e),
        }
    }
}

fn analyze_container(
    source: &LoadedSource,
    kind: SourceKind,
    config: &AnalysisConfig,
    segment_config: &SegmentConfig,
    batch: &mut BatchCollector,
) {
    let slots = match decode_frames(source, kind, config.planes) {
        Ok(slots) => slots,
        Err(e) => return batch.file_failed(&source.id, &e),
    };
    info!(source = %source.id, %kind, frames = slots.len(), "Extracted frames");

    let masks = config.mask_dir.as_deref();

    let outcomes: Vec<Result<AreaMeasurement>> =
        if config.parallel && slots.len() >= PARALLEL_FRAME_THRESHOLD {
            slots
                .into_par_iter()
                .enumerate()
                .map(|(i, slot)| analyze_frame(&source.id, i + 1, slot, segment_config, masks))
                .collect()
        } else {
            slots
                .into_iter()
                .enumerate()
                .map(|(i, slot)| analyze_frame(&source.id, i + 1, slot, segment_config, masks))
                .collect()
        };

    for (i, outcome) in outcomes.iter().enumerate() {
        batch.frame_done(&source.id, i + 1, outcome);
    }
}

/// Normalize, segment and measure one frame. `frame` is 1-based.
///
/// A mask that cannot be written is logged; the measurement still stands.
fn analyze_frame(
    source_id: &str,
    frame: usize,
    slot: FrameSlot,
    segment_config: &SegmentConfig,
    mask_dir: Option<&Path>,
) -> Result<AreaMeasurement> {
    let raw = slot?;
    let normalized = normalize(&raw);
    let degenerate = |reason: DegenerateReason| AnalysisError::DegenerateFrame {
        source_name: source_id.to_string(),
        frame,
        reason,
    };

    let mask = segment(&normalized, segment_config).map_err(degenerate)?;
    let measurement = measure(&mask).map_err(degenerate)?;
    debug!(
        source = source_id,
        frame,
        threshold = mask.threshold,
        scratch_pixels = measurement.scratch_pixels,
        percentage = measurement.percentage,
        "Frame measured"
    );

    if let Some(dir) = mask_dir {
        match save_mask(&mask, dir, source_id, frame) {
            Ok(path) => debug!(source = source_id, frame, path = %path.display(), "Mask written"),
            Err(e) => warn!(source = source_id, frame, error = %e, "Failed to write mask"),
        }
    }
    Ok(measurement)
}

pub mod chart;
mod glyphs;
pub mod masks;
pub mod table;

use serde::Serialize;

use crate::pipeline::BatchResult;

pub use chart::{ChartBar, ChartMetric, SummaryChart};
pub use table::{BatchSummary, Cell, ResultsTable, COLUMNS};

/// Everything a caller needs to present one batch.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Report {
    pub table: ResultsTable,
    pub summary: BatchSummary,
    /// Present only when a chart was requested and something is plottable.
    pub chart: Option<SummaryChart>,
}

pub fn build_report(batch: &BatchResult, chart: Option<ChartMetric>) -> Report {
    Report {
        table: ResultsTable::from_batch(batch),
        summary: BatchSummary::from_batch(batch),
        chart: chart.and_then(|metric| SummaryChart::from_batch(batch, metric)),
    }
}

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::pipeline::BatchResult;
use crate::quantify::FrameResult;

/// Column headers of the results table, in display order.
pub const COLUMNS: [&str; 7] = [
    "Sr. No.",
    "Name",
    "Frame",
    "Scratch Area",
    "Total Pixels",
    "Percentage",
    "Error",
];

/// A single scalar table cell.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Cell {
    Int(i64),
    Float(f64),
    Text(String),
    Empty,
}

impl std::fmt::Display for Cell {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Int(v) => write!(f, "{v}"),
            Self::Float(v) => write!(f, "{v:.4}"),
            Self::Text(s) => write!(f, "{s}"),
            Self::Empty => Ok(()),
        }
    }
}

impl Cell {
    fn int(value: Option<impl TryInto<i64>>) -> Self {
        value
            .and_then(|v| v.try_into().ok())
            .map(Self::Int)
            .unwrap_or(Self::Empty)
    }
}

impl FrameResult {
    /// The row as `(column, cell)` pairs keyed by [`COLUMNS`].
    pub fn record(&self) -> Vec<(&'static str, Cell)> {
        let cells = [
            Cell::int(Some(self.sequence)),
            Cell::Text(self.source.clone()),
            Cell::int(self.frame),
            Cell::int(self.scratch_pixels),
            Cell::int(self.total_pixels),
            self.percentage.map(Cell::Float).unwrap_or(Cell::Empty),
            self.error.clone().map(Cell::Text).unwrap_or(Cell::Empty),
        ];
        COLUMNS.into_iter().zip(cells).collect()
    }
}

/// Tabular view of a batch, one row per result.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ResultsTable {
    pub columns: Vec<&'static str>,
    pub rows: Vec<Vec<Cell>>,
}

impl ResultsTable {
    pub fn from_batch(batch: &BatchResult) -> Self {
        let rows = batch
            .iter()
            .map(|r| r.record().into_iter().map(|(_, cell)| cell).collect())
            .collect();
        Self {
            columns: COLUMNS.to_vec(),
            rows,
        }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Cell by row index and column name.
    pub fn cell(&self, row: usize, column: &str) -> Option<&Cell> {
        let col = self.columns.iter().position(|c| *c == column)?;
        self.rows.get(row)?.get(col)
    }
}

/// Aggregate counts and percentage statistics of a batch.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct BatchSummary {
    pub rows: usize,
    pub measured: usize,
    pub failed: usize,
    /// Number of distinct source identifiers.
    pub sources: usize,
    pub mean_percentage: Option<f64>,
    pub min_percentage: Option<f64>,
    pub max_percentage: Option<f64>,
}

impl BatchSummary {
    pub fn from_batch(batch: &BatchResult) -> Self {
        let percentages: Vec<f64> = batch.measured().filter_map(|r| r.percentage).collect();
        let sources: HashSet<&str> = batch.iter().map(|r| r.source.as_str()).collect();

        let (min, max) = percentages
            .iter()
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &p| {
                (lo.min(p), hi.max(p))
            });
        let any = !percentages.is_empty();

        Self {
            rows: batch.len(),
            measured: percentages.len(),
            failed: batch.failures().count(),
            sources: sources.len(),
            mean_percentage: any
                .then(|| percentages.iter().sum::<f64>() / percentages.len() as f64),
            min_percentage: any.then_some(min),
            max_percentage: any.then_some(max),
        }
    }
}

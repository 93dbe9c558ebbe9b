use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};

use anyhow::Result;
use serde::Serialize;
use woundgap_core::pipeline::BatchResult;
use woundgap_core::quantify::FrameResult;
use woundgap_core::report::chart::short_label;
use woundgap_core::report::{BatchSummary, ResultsTable, SummaryChart};

/// Results table as CSV: header row, then one record per table row.
pub fn write_csv(table: &ResultsTable, path: &Path) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)?;
    writer.write_record(&table.columns)?;
    for row in &table.rows {
        writer.write_record(row.iter().map(|cell| cell.to_string()))?;
    }
    writer.flush()?;
    Ok(())
}

/// `chart.png` -> `chart.legend.csv`
pub fn legend_path(chart: &Path) -> PathBuf {
    chart.with_extension("legend.csv")
}

/// One record per chart bar, left to right, with the full source identifier
/// behind each printed label.
pub fn write_legend(chart: &SummaryChart, path: &Path) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)?;
    let metric = chart.metric.to_string();
    writer.write_record(["Bar", "Label", "Source", metric.as_str(), "Frames"])?;
    for (i, bar) in chart.bars.iter().enumerate() {
        writer.write_record([
            (i + 1).to_string(),
            short_label(&bar.label).to_string(),
            bar.label.clone(),
            format!("{:.4}", bar.value),
            bar.frames.to_string(),
        ])?;
    }
    writer.flush()?;
    Ok(())
}

#[derive(Serialize)]
struct JsonReport<'a> {
    summary: &'a BatchSummary,
    results: &'a [FrameResult],
}

/// Rows and summary as pretty-printed JSON.
pub fn write_json(batch: &BatchResult, summary: &BatchSummary, path: &Path) -> Result<()> {
    let writer = BufWriter::new(File::create(path)?);
    serde_json::to_writer_pretty(
        writer,
        &JsonReport {
            summary,
            results: &batch.rows,
        },
    )?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;
    use woundgap_core::error::AnalysisError;
    use woundgap_core::quantify::AreaMeasurement;
    use woundgap_core::report::{ChartBar, ChartMetric};

    fn batch() -> BatchResult {
        let m = AreaMeasurement {
            scratch_pixels: 30,
            total_pixels: 120,
            percentage: 25.0,
        };
        let e = AnalysisError::UnsupportedFormat {
            name: "sheet.csv".into(),
        };
        BatchResult {
            rows: vec![
                FrameResult::measured(1, "a.png", 1, &m),
                FrameResult::failed(2, "sheet.csv", None, &e),
            ],
        }
    }

    #[test]
    fn test_csv_has_header_and_rows() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("out.csv");
        write_csv(&ResultsTable::from_batch(&batch()), &path).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(
            lines[0],
            "Sr. No.,Name,Frame,Scratch Area,Total Pixels,Percentage,Error"
        );
        assert_eq!(lines[1], "1,a.png,1,30,120,25.0000,");
        assert!(lines[2].starts_with("2,sheet.csv,,,,,"));
        assert_eq!(lines.len(), 3);
    }

    #[test]
    fn test_legend_lists_every_bar() {
        let dir = TempDir::new().unwrap();
        let path = legend_path(&dir.path().join("chart.png"));
        assert_eq!(path.file_name().unwrap(), "chart.legend.csv");

        let chart = SummaryChart {
            metric: ChartMetric::Percentage,
            bars: vec![
                ChartBar {
                    label: "exp/day1/a.png".into(),
                    value: 12.5,
                    frames: 2,
                },
                ChartBar {
                    label: "b.tif".into(),
                    value: 40.0,
                    frames: 1,
                },
            ],
        };
        write_legend(&chart, &path).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "Bar,Label,Source,Scratch area (%),Frames");
        assert_eq!(lines[1], "1,a.png,exp/day1/a.png,12.5000,2");
        assert_eq!(lines[2], "2,b.tif,b.tif,40.0000,1");
    }

    #[test]
    fn test_json_has_summary_and_results() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("out.json");
        let batch = batch();
        write_json(&batch, &BatchSummary::from_batch(&batch), &path).unwrap();

        let value: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(value["summary"]["rows"], 2);
        assert_eq!(value["results"][1]["error_kind"], "unsupported_format");
    }
}

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Args, ValueEnum};
use woundgap_core::consts::{DEFAULT_CHART_HEIGHT, DEFAULT_CHART_WIDTH};
use woundgap_core::io::PlanePolicy;
use woundgap_core::pipeline::{analyze_paths, AnalysisConfig, AnalysisStage, ProgressReporter};
use woundgap_core::report::{build_report, ChartMetric};

use crate::export::{legend_path, write_csv, write_json, write_legend};
use crate::progress::BarReporter;
use crate::summary::{print_analysis_header, print_batch_summary, print_results_table};

#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum ChartMetricArg {
    /// Mean scratch percentage per source
    Percentage,
    /// Mean scratch area in pixels per source
    Area,
}

impl From<ChartMetricArg> for ChartMetric {
    fn from(arg: ChartMetricArg) -> Self {
        match arg {
            ChartMetricArg::Percentage => ChartMetric::Percentage,
            ChartMetricArg::Area => ChartMetric::Area,
        }
    }
}

#[derive(Args)]
pub struct AnalyzeArgs {
    /// Image files, TIFF stacks, ND2 files, ZIP archives or directories
    #[arg(required = true)]
    pub inputs: Vec<PathBuf>,

    /// Analysis config file (TOML)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Radius of the entropy neighborhood in pixels
    #[arg(long)]
    pub radius: Option<usize>,

    /// Only analyze the first plane of ND2 files
    #[arg(long)]
    pub first_plane: bool,

    /// Process frames one at a time
    #[arg(long)]
    pub no_parallel: bool,

    /// Write the results table as CSV
    #[arg(long)]
    pub csv: Option<PathBuf>,

    /// Write the results as JSON
    #[arg(long)]
    pub json: Option<PathBuf>,

    /// Write every frame's scratch mask as a PNG into this directory
    #[arg(long)]
    pub masks: Option<PathBuf>,

    /// Write a per-source bar chart as PNG, with its legend as <CHART>.legend.csv
    #[arg(long)]
    pub chart: Option<PathBuf>,

    /// Quantity plotted in the chart
    #[arg(long, value_enum, default_value = "percentage")]
    pub chart_metric: ChartMetricArg,

    /// Chart size in pixels, WIDTHxHEIGHT [default: 800x400]
    #[arg(long, value_parser = parse_size)]
    pub chart_size: Option<(u32, u32)>,
}

fn parse_size(s: &str) -> std::result::Result<(u32, u32), String> {
    let (w, h) = s
        .split_once(['x', 'X'])
        .ok_or_else(|| format!("expected WIDTHxHEIGHT, got '{s}'"))?;
    let w: u32 = w.trim().parse().map_err(|e| format!("bad width '{w}': {e}"))?;
    let h: u32 = h.trim().parse().map_err(|e| format!("bad height '{h}': {e}"))?;
    if w == 0 || h == 0 {
        return Err("chart size must be non-zero".into());
    }
    Ok((w, h))
}

pub fn run(args: &AnalyzeArgs) -> Result<()> {
    let config = build_config(args)?;
    config.validate()?;
    print_analysis_header(&args.inputs, &config);

    let reporter = Arc::new(BarReporter::new()?);
    let batch = analyze_paths(&args.inputs, &config, reporter.clone())
        .context("Analysis failed")?;

    let chart_metric = args.chart.as_ref().map(|_| ChartMetric::from(args.chart_metric));
    reporter.begin_stage(AnalysisStage::Reporting, None);
    let report = build_report(&batch, chart_metric);

    if let Some(ref path) = args.csv {
        write_csv(&report.table, path)
            .with_context(|| format!("Failed to write CSV to {}", path.display()))?;
    }
    if let Some(ref path) = args.json {
        write_json(&batch, &report.summary, path)
            .with_context(|| format!("Failed to write JSON to {}", path.display()))?;
    }
    if let Some(ref path) = args.chart {
        match report.chart {
            Some(ref chart) => {
                let (w, h) = args
                    .chart_size
                    .unwrap_or((DEFAULT_CHART_WIDTH, DEFAULT_CHART_HEIGHT));
                chart
                    .save_png(path, w, h)
                    .with_context(|| format!("Failed to write chart to {}", path.display()))?;
                let legend = legend_path(path);
                write_legend(chart, &legend)
                    .with_context(|| format!("Failed to write legend to {}", legend.display()))?;
            }
            None => tracing::warn!("No measured frames, chart not written"),
        }
    }
    reporter.finish_stage();
    reporter.finish();

    print_results_table(&report.table);
    print_batch_summary(&report.summary);
    for (label, path) in [("CSV", &args.csv), ("JSON", &args.json)] {
        if let Some(path) = path {
            println!("  {label} saved to {}", path.display());
        }
    }
    if let (Some(path), Some(_)) = (&args.chart, &report.chart) {
        println!(
            "  Chart saved to {} (legend {})",
            path.display(),
            legend_path(path).display()
        );
    }
    if let Some(ref dir) = config.mask_dir {
        println!("  Masks saved to {}", dir.display());
    }

    Ok(())
}

fn build_config(args: &AnalyzeArgs) -> Result<AnalysisConfig> {
    let mut config = if let Some(ref config_path) = args.config {
        let contents = std::fs::read_to_string(config_path)
            .with_context(|| format!("Failed to read config {}", config_path.display()))?;
        toml::from_str(&contents).context("Invalid analysis config")?
    } else {
        AnalysisConfig::default()
    };

    if let Some(radius) = args.radius {
        config.entropy_radius = radius;
    }
    if args.first_plane {
        config.planes = PlanePolicy::First;
    }
    if args.no_parallel {
        config.parallel = false;
    }
    if let Some(ref dir) = args.masks {
        config.mask_dir = Some(dir.clone());
    }
    Ok(config)
}

use woundgap_core::error::{AnalysisError, ErrorKind};
use woundgap_core::io::{PlanePolicy, SourceKind};
use woundgap_core::pipeline::{AnalysisConfig, AnalysisStage};
use woundgap_core::report::ChartMetric;

// ---------------------------------------------------------------------------
// AnalysisConfig
// ---------------------------------------------------------------------------

#[test]
fn test_default_config() {
    let config = AnalysisConfig::default();
    assert_eq!(config.entropy_radius, 5);
    assert_eq!(config.histogram_bins, 256);
    assert_eq!(config.planes, PlanePolicy::All);
    assert!(config.parallel);
    assert!(config.validate().is_ok());
}

#[test]
fn test_config_toml_round_trip() {
    let config = AnalysisConfig {
        entropy_radius: 7,
        planes: PlanePolicy::First,
        ..AnalysisConfig::default()
    };
    let text = toml::to_string_pretty(&config).unwrap();
    assert!(text.contains("planes = \"first\""));
    let back: AnalysisConfig = toml::from_str(&text).unwrap();
    assert_eq!(back, config);
}

#[test]
fn test_mask_dir_only_serialized_when_set() {
    let text = toml::to_string_pretty(&AnalysisConfig::default()).unwrap();
    assert!(!text.contains("mask_dir"));

    let config: AnalysisConfig = toml::from_str("mask_dir = \"out/masks\"").unwrap();
    assert_eq!(config.mask_dir, Some(std::path::PathBuf::from("out/masks")));
    assert_eq!(config.entropy_radius, 5);
}

#[test]
fn test_partial_toml_uses_defaults() {
    let config: AnalysisConfig = toml::from_str("entropy_radius = 3").unwrap();
    assert_eq!(config.entropy_radius, 3);
    assert_eq!(config.histogram_bins, 256);
    assert!(config.parallel);
}

#[test]
fn test_empty_toml_is_default() {
    let config: AnalysisConfig = toml::from_str("").unwrap();
    assert_eq!(config, AnalysisConfig::default());
}

#[test]
fn test_validate_rejects_zero_radius() {
    let config = AnalysisConfig {
        entropy_radius: 0,
        ..AnalysisConfig::default()
    };
    let err = config.validate().unwrap_err();
    assert!(matches!(err, AnalysisError::InvalidConfig(_)));
    assert_eq!(err.kind(), ErrorKind::Invocation);
}

#[test]
fn test_validate_rejects_huge_radius() {
    let config = AnalysisConfig {
        entropy_radius: usize::MAX,
        ..AnalysisConfig::default()
    };
    let err = config.validate().unwrap_err();
    assert!(err.to_string().contains("at most"));
}

#[test]
fn test_validate_rejects_single_bin() {
    let config = AnalysisConfig {
        histogram_bins: 1,
        ..AnalysisConfig::default()
    };
    assert!(config.validate().is_err());
}

#[test]
fn test_segment_config_follows_analysis_config() {
    let config = AnalysisConfig {
        entropy_radius: 4,
        histogram_bins: 64,
        parallel: false,
        ..AnalysisConfig::default()
    };
    let seg = config.segment_config();
    assert_eq!(seg.radius, 4);
    assert_eq!(seg.bins, 64);
    assert!(!seg.parallel);
}

// ---------------------------------------------------------------------------
// Display / serde names
// ---------------------------------------------------------------------------

#[test]
fn test_stage_display() {
    assert_eq!(format!("{}", AnalysisStage::Enumerating), "Scanning inputs");
    assert_eq!(format!("{}", AnalysisStage::Analyzing), "Analyzing");
    assert_eq!(format!("{}", AnalysisStage::Reporting), "Writing report");
}

#[test]
fn test_source_kind_display() {
    assert_eq!(format!("{}", SourceKind::MultiPage), "Multi-page TIFF");
    assert_eq!(format!("{}", SourceKind::Microscopy), "ND2 Microscopy");
}

#[test]
fn test_error_kind_display_and_serde() {
    assert_eq!(format!("{}", ErrorKind::DegenerateFrame), "Degenerate Frame");
    assert_eq!(
        serde_json::to_string(&ErrorKind::UnsupportedFormat).unwrap(),
        "\"unsupported_format\""
    );
}

#[test]
fn test_chart_metric_serde() {
    assert_eq!(ChartMetric::default(), ChartMetric::Percentage);
    let m: ChartMetric = serde_json::from_str("\"area\"").unwrap();
    assert_eq!(m, ChartMetric::Area);
}

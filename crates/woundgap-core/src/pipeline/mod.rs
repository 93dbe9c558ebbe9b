pub mod config;
pub mod enumerate;
mod orchestrator;
mod types;

pub use config::AnalysisConfig;
pub use enumerate::{enumerate_directory, enumerate_paths};
pub use orchestrator::{analyze, analyze_directory, analyze_paths};
pub use types::{AnalysisStage, BatchResult, NoOpReporter, ProgressReporter};

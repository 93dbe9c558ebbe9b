use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Why a frame could not be segmented or measured.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum DegenerateReason {
    #[error("entropy map is constant, no threshold separates scratch from cells")]
    ConstantEntropy,

    #[error("frame has zero area")]
    EmptyFrame,
}

#[derive(Error, Debug)]
pub enum AnalysisError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("Unsupported format: {name}")]
    UnsupportedFormat { name: String },

    #[error("Failed to decode {name}: {reason}")]
    DecodeFailure { name: String, reason: String },

    #[error("Degenerate frame {frame} of {source_name}: {reason}")]
    DegenerateFrame {
        source_name: String,
        frame: usize,
        reason: DegenerateReason,
    },

    #[error("Failed to stage {name} to a temporary file: {source}")]
    Staging {
        name: String,
        #[source]
        source: std::io::Error,
    },

    #[error("No valid image files found in {0}")]
    NoValidFiles(PathBuf),

    #[error("No input provided")]
    NoInput,

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl AnalysisError {
    pub fn decode(name: impl Into<String>, reason: impl ToString) -> Self {
        Self::DecodeFailure {
            name: name.into(),
            reason: reason.to_string(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Io(_) | Self::Image(_) => ErrorKind::Io,
            Self::UnsupportedFormat { .. } => ErrorKind::UnsupportedFormat,
            Self::DecodeFailure { .. } => ErrorKind::DecodeFailure,
            Self::DegenerateFrame { .. } => ErrorKind::DegenerateFrame,
            Self::Staging { .. } => ErrorKind::Staging,
            Self::NoValidFiles(_) | Self::NoInput | Self::InvalidConfig(_) => ErrorKind::Invocation,
        }
    }
}

/// Serializable error category carried by result rows.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Io,
    UnsupportedFormat,
    DecodeFailure,
    DegenerateFrame,
    Staging,
    Invocation,
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io => write!(f, "I/O"),
            Self::UnsupportedFormat => write!(f, "Unsupported Format"),
            Self::DecodeFailure => write!(f, "Decode Failure"),
            Self::DegenerateFrame => write!(f, "Degenerate Frame"),
            Self::Staging => write!(f, "Staging"),
            Self::Invocation => write!(f, "Invocation"),
        }
    }
}

pub type Result<T> = std::result::Result<T, AnalysisError>;

//! Root error taxonomy for the extraction pipeline.
//!
//! Every fallible surface in the crate either returns one of the per-module
//! errors directly (`TokenizerError`, `FormatError`, `PromptBuilderError`,
//! `IoError`, `InferenceConfigError`/`InferenceRuntimeError`/
//! `InferenceOutputError`) or, at the `Pipeline`/`Annotator` boundary, wraps
//! them into `LangExtractError` so callers deal with a single enum.

use thiserror::Error;

use crate::config::ConfigError;
use crate::inference::{InferenceConfigError, InferenceOutputError, InferenceRuntimeError};
use crate::resolver::FormatError;

#[derive(Debug)]
pub struct InvalidDatasetError(pub String);

impl std::fmt::Display for InvalidDatasetError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "InvalidDatasetError: {}", self.0)
    }
}

impl std::error::Error for InvalidDatasetError {}

/// A single entry in a `PromptValidator` report.
#[derive(Debug, Clone)]
pub struct AlignmentReportEntry {
    pub example_index: usize,
    pub extraction_index: usize,
    pub status: crate::data::AlignmentStatus,
    pub reason: String,
}

/// Raised when prompt validation rejects an example at `ValidationLevel::Error`.
#[derive(Error, Debug, Clone)]
#[error("prompt validation failed for {} example(s): {}", .entries.len(), summarize(.entries))]
pub struct AlignmentReportError {
    pub entries: Vec<AlignmentReportEntry>,
}

fn summarize(entries: &[AlignmentReportEntry]) -> String {
    entries
        .iter()
        .map(|e| format!("example {} extraction {} ({:?})", e.example_index, e.extraction_index, e.status))
        .collect::<Vec<_>>()
        .join("; ")
}

/// Unified error type returned by `Pipeline` and `Annotator` entry points.
#[derive(Error, Debug)]
pub enum LangExtractError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("schema derivation failed: {0}")]
    Schema(String),

    #[error("inference configuration error: {0}")]
    InferenceConfig(#[from] InferenceConfigError),

    #[error("inference runtime error: {0}")]
    InferenceRuntime(#[from] InferenceRuntimeError),

    #[error("language model produced no usable output: {0}")]
    InferenceOutput(#[from] InferenceOutputError),

    #[error("format parse error: {0}")]
    FormatParse(#[from] FormatError),

    #[error(transparent)]
    AlignmentReport(#[from] AlignmentReportError),

    #[error("invalid pipeline configuration: {0}")]
    Config(#[from] ConfigError),
}

pub type Result<T> = std::result::Result<T, LangExtractError>;

//! Error types for the survey pipeline.
//!
//! Only `MissingInput` aborts a run. Every other variant is a soft condition:
//! the stage that raised it is skipped and a [`Notice`] is recorded so the
//! console and the text report can say what was left out.

use std::path::PathBuf;

use thiserror::Error;

/// Errors raised by pipeline stages.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// The input table does not exist, is not a file, or could not be parsed.
    #[error("Input file '{}' could not be read: {reason}", path.display())]
    MissingInput {
        /// Path that was requested
        path: PathBuf,
        /// Underlying cause
        reason: String,
    },

    /// The outcome column is absent, so modeling cannot run.
    #[error("Label column '{column}' not found - modeling skipped")]
    MissingLabel { column: String },

    /// The outcome column exists but is not a usable 0/1 indicator.
    #[error("Label column '{column}' is not binary: {detail}")]
    InvalidLabel { column: String, detail: String },

    /// A column needed for a derived feature or a plot is absent.
    #[error("Column '{column}' not found - {purpose} skipped")]
    MissingColumn { column: String, purpose: String },

    /// The train/test partition could not be built.
    #[error("Train/test split failed: {0}")]
    Split(String),

    /// A figure could not be rendered or written.
    #[error("Failed to render '{}': {reason}", path.display())]
    PlotRender { path: PathBuf, reason: String },

    #[error(transparent)]
    Polars(#[from] polars::error::PolarsError),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl PipelineError {
    /// Whether the run must stop when this error is raised.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            PipelineError::MissingInput { .. } | PipelineError::Polars(_) | PipelineError::Io(_)
        )
    }
}

pub type PipelineResult<T> = std::result::Result<T, PipelineError>;

/// Severity of a recorded notice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NoticeLevel {
    Info,
    Warning,
}

/// A soft condition surfaced to the console and the text report.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct Notice {
    pub level: NoticeLevel,
    pub stage: &'static str,
    pub message: String,
}

impl Notice {
    pub fn info(stage: &'static str, message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Info,
            stage,
            message: message.into(),
        }
    }

    pub fn warning(stage: &'static str, message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Warning,
            stage,
            message: message.into(),
        }
    }

    /// Record a soft pipeline error as a warning.
    pub fn from_error(stage: &'static str, err: &PipelineError) -> Self {
        Self::warning(stage, err.to_string())
    }
}

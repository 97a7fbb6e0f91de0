use thiserror::Error;

/// Failures surfaced by the flowline pipeline and the preset store.
///
/// None of these are fatal: the CLI turns every variant into a message.
#[derive(Debug, Error)]
pub enum FlowlineError {
    /// Missing rasters, identical selections or malformed numeric input.
    #[error("{0}")]
    Configuration(String),

    /// Preset file could not be read or written.
    #[error("preset store error: {0}")]
    StoreIo(String),

    /// The external tool or its runtime environment is not installed.
    #[error("{0}")]
    ToolUnavailable(String),

    /// The tool ran but exited with a non-zero status.
    #[error("grd2stream failed (exit code {code:?}): {stderr}")]
    ExecutionFailure { code: Option<i32>, stderr: String },

    /// The tool succeeded but produced no usable streamline points.
    #[error("integration produced no streamline points")]
    EmptyResult,
}

impl FlowlineError {
    pub fn config(message: impl Into<String>) -> Self {
        FlowlineError::Configuration(message.into())
    }
}

pub type Result<T> = std::result::Result<T, FlowlineError>;

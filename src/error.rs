//! Error handling for pipeflow
//!
//! Engine operations return the narrow errors in [`crate::pipeline::error`].
//! Everything around the engine (configuration, scripting, I/O) reports a
//! [`PipeflowError`].

use crate::pipeline::error::PipelineError;
use thiserror::Error;

/// Main error type for pipeflow operations
#[derive(Error, Debug)]
pub enum PipeflowError {
    /// Errors related to configuration loading/saving
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Errors related to Rhai expression compilation or evaluation
    #[error("Script error: {0}")]
    Script(String),

    /// Errors raised by graph operations
    #[error("Pipeline error: {0}")]
    Pipeline(#[from] PipelineError),

    /// Generic errors with context
    #[error("{context}: {source}")]
    WithContext {
        context: String,
        #[source]
        source: Box<PipeflowError>,
    },
}

impl PipeflowError {
    /// Add context to an error
    pub fn with_context(self, context: impl Into<String>) -> Self {
        PipeflowError::WithContext {
            context: context.into(),
            source: Box::new(self),
        }
    }

    /// Create a script error from a Rhai error
    pub fn from_rhai_error(err: Box<rhai::EvalAltResult>) -> Self {
        PipeflowError::Script(err.to_string())
    }
}

/// Result type alias for pipeflow operations
pub type Result<T> = std::result::Result<T, PipeflowError>;

/// Extension trait for adding context to Results
pub trait ResultExt<T> {
    /// Add context to an error result
    fn context(self, context: impl Into<String>) -> Result<T>;

    /// Add context lazily to an error result
    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String;
}

impl<T> ResultExt<T> for Result<T> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| e.with_context(context))
    }

    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| e.with_context(f()))
    }
}

impl<T> ResultExt<T> for std::result::Result<T, Box<rhai::EvalAltResult>> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| PipeflowError::from_rhai_error(e).with_context(context))
    }

    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| PipeflowError::from_rhai_error(e).with_context(f()))
    }
}

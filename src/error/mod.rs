//! Error handling for the simulation engine.
//!
//! The monthly updaters never fail: out-of-range values are clamped and every
//! draw produces an outcome. Errors only arise while loading and validating
//! the configuration or while writing summaries at the edge of the crate.

use std::io;
use std::path::PathBuf;

/// Specialized error type for the simulation engine
#[derive(Debug, thiserror::Error)]
pub enum SimError {
    /// Error opening or reading a file
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// Error decoding or encoding JSON
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A configuration table has the wrong shape or an impossible value
    #[error("Configuration error in {section}: {message}")]
    Config {
        /// Section of the configuration that failed validation
        section: &'static str,
        /// What was wrong
        message: String,
    },

    /// A file needed by the run could not be found
    #[error("File not found: {}", .0.display())]
    NotFound(PathBuf),

    /// The cohort worker pool could not be built
    #[error("Thread pool error: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
}

impl SimError {
    /// Build a configuration error for the named section
    pub fn config(section: &'static str, message: impl Into<String>) -> Self {
        Self::Config {
            section,
            message: message.into(),
        }
    }
}

/// Result type for simulation operations
pub type Result<T> = std::result::Result<T, SimError>;

/// Return a configuration error from the enclosing function unless `cond` holds.
#[macro_export]
macro_rules! ensure_config {
    ($cond:expr, $section:expr, $($arg:tt)+) => {
        if !$cond {
            return Err($crate::error::SimError::config($section, format!($($arg)+)));
        }
    };
}

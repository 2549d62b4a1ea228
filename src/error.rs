//! Engine error types
//!
//! Almost every failure in the engine is a logged no-op. These are the few
//! that must reach the caller.

use std::path::PathBuf;

/// Errors surfaced by engine construction and configuration
#[derive(Debug)]
pub enum EngineError {
    /// Canvas has zero, negative or non-finite area
    InvalidCanvas { width: f32, height: f32 },
    /// Settings or bubble data could not be parsed
    Config { error: serde_json::Error },
    /// Settings or bubble data could not be read
    Io {
        path: PathBuf,
        error: std::io::Error,
    },
}

impl EngineError {
    /// Fail fast unless the canvas has a usable area
    pub fn check_canvas(width: f32, height: f32) -> Result<(), EngineError> {
        if width.is_finite() && height.is_finite() && width > 0.0 && height > 0.0 {
            Ok(())
        } else {
            Err(EngineError::InvalidCanvas { width, height })
        }
    }
}

impl From<serde_json::Error> for EngineError {
    fn from(error: serde_json::Error) -> Self {
        EngineError::Config { error }
    }
}

impl std::fmt::Display for EngineError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EngineError::InvalidCanvas { width, height } => {
                write!(f, "Invalid canvas size {}x{}", width, height)
            }
            EngineError::Config { error } => write!(f, "Failed to parse config: {}", error),
            EngineError::Io { path, error } => {
                write!(f, "Failed to read '{}': {}", path.display(), error)
            }
        }
    }
}

impl std::error::Error for EngineError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            EngineError::InvalidCanvas { .. } => None,
            EngineError::Config { error } => Some(error),
            EngineError::Io { error, .. } => Some(error),
        }
    }
}

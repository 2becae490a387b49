//! Display error types

use std::path::PathBuf;

use thiserror::Error;

/// Render / recording failure
///
/// Logged and skipped for the iteration; never ends the session.
#[derive(Debug, Error)]
pub enum RenderError {
    /// Drawing collaborator failure
    #[error("canvas error: {message}")]
    Canvas { message: String },

    /// Frame does not match the recording's dimensions
    #[error("recording expects {expected:?} frames, got {actual:?}")]
    RecordingShape {
        expected: (u32, u32),
        actual: (u32, u32),
    },

    /// Image encode error
    #[error("failed to encode {path}: {source}")]
    Encode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    /// Sidecar serialization error
    #[error("failed to write recording metadata: {0}")]
    Metadata(#[from] serde_json::Error),

    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl RenderError {
    /// Create a canvas error
    pub fn canvas(message: impl Into<String>) -> Self {
        Self::Canvas {
            message: message.into(),
        }
    }
}

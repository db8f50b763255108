//! Error types for simview.
//!
//! Only loading (model, states) and starting a recording can fail. Playback,
//! rendering and widget refresh degrade in place instead of returning errors.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum SimviewError {
    /// The model payload cannot produce a complete scene.
    #[error("malformed model: {0}")]
    MalformedModel(String),

    /// A state snapshot lacks one of the model's declared scalars.
    #[error("state {state} is missing scalar '{name}'")]
    MissingScalar { state: usize, name: String },

    #[error("states payload is empty")]
    EmptyStates,

    #[error("unsupported recording format '{0}'")]
    UnsupportedRecordingFormat(String),

    /// Rejected by the scene builder before anything was written.
    #[error("invalid scene: {0}")]
    InvalidScene(String),

    #[error("transport error: {0}")]
    Transport(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("image error: {0}")]
    Image(#[from] image::ImageError),
}

impl SimviewError {
    pub(crate) fn malformed(msg: impl Into<String>) -> Self {
        Self::MalformedModel(msg.into())
    }
}

pub type Result<T> = std::result::Result<T, SimviewError>;

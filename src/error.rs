//! Error types for the inspection core.
//!
//! Contract violations (unknown methods, misuse of an unfitted model, shape
//! mismatches) fail fast with an [`InspectError`]. Degenerate data such as a
//! flat heatmap or an unresolved risk row is not an error and is handled by
//! the component that meets it.

use std::path::PathBuf;

use thiserror::Error;

/// Image shape as `(height, width, channels)`.
pub type Shape = (usize, usize, usize);

/// Errors raised by the inspection core.
#[derive(Error, Debug)]
pub enum InspectError {
    /// `fit` was called with no images.
    #[error("no training images provided")]
    EmptyTrainingSet,

    /// An image does not match the shape the model expects.
    #[error("image shape mismatch: expected {expected:?}, got {actual:?}")]
    ShapeMismatch { expected: Shape, actual: Shape },

    /// `infer` was called before `fit`.
    #[error("model not fitted")]
    ModelNotFitted,

    /// A method name that has no implementation.
    #[error("unknown {kind} method: {name:?}")]
    UnknownMethod { kind: &'static str, name: String },

    /// The action mapping has no `REVIEW_REQUIRED` entry to fall back on.
    #[error("risk_to_action has no {0:?} entry")]
    MissingFallbackAction(&'static str),

    /// A configuration value is out of range or inconsistent.
    #[error("configuration: {0}")]
    InvalidConfig(String),

    /// A dataset split directory does not exist.
    #[error("missing split folder: {}", .0.display())]
    MissingSplit(PathBuf),

    #[error("tensor shape: {0}")]
    Tensor(#[from] ndarray::ShapeError),

    #[error("image: {0}")]
    Image(#[from] image::ImageError),

    #[error("io: {0}")]
    Io(#[from] std::io::Error),

    #[error("json: {0}")]
    Json(#[from] serde_json::Error),
}

impl InspectError {
    pub fn unknown_method(kind: &'static str, name: &str) -> Self {
        Self::UnknownMethod {
            kind,
            name: name.to_string(),
        }
    }

    pub fn invalid_config(message: impl Into<String>) -> Self {
        Self::InvalidConfig(message.into())
    }
}

pub type InspectResult<T> = std::result::Result<T, InspectError>;

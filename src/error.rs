//! Error types.

use thiserror::Error;

/// Result type alias for this crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Everything that can go wrong while building, running, training or
/// persisting a network.
#[derive(Debug, Error)]
pub enum Error {
    /// The layer sizes or transfer functions do not describe a valid network.
    #[error("invalid network configuration: {0}")]
    Configuration(String),

    /// A matrix handed to the network disagrees with its layer sizes.
    #[error("shape mismatch in {context}: expected {expected}, found {found}")]
    ShapeMismatch {
        context: &'static str,
        expected: usize,
        found: usize,
    },

    #[error("invalid array shape: {0}")]
    Shape(#[from] ndarray::ShapeError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The binary codec failed to encode or decode a checkpoint.
    #[error("failed to (de)serialize checkpoint: {0}")]
    Serialization(#[from] bincode::Error),

    /// The checkpoint was written by an incompatible format version.
    #[error("checkpoint version mismatch: expected {expected}, found {found}")]
    VersionMismatch { expected: u32, found: u32 },

    /// The checkpoint decoded cleanly but does not describe a network.
    #[error("invalid checkpoint: {0}")]
    InvalidCheckpoint(String),

    /// A vector file is malformed.
    #[error("line {line}: {message}")]
    Parse { line: usize, message: String },

    /// An input vector has no target vector with the same id.
    #[error("no target vector for id `{0}`")]
    MissingTarget(String),
}

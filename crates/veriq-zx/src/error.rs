//! Error types for the ZX backend.

use thiserror::Error;

/// Errors that can occur while building or rewriting diagrams.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ZxError {
    /// The circuit contains an operation the backend cannot encode.
    #[error("Operation not encodable as a ZX-diagram: {0}")]
    Unsupported(String),

    /// The two diagrams being combined have different widths.
    #[error("Qubit count mismatch: {left} vs {right}")]
    QubitCountMismatch {
        /// Width of the left diagram.
        left: usize,
        /// Width of the right diagram.
        right: usize,
    },
}

/// Result type for ZX operations.
pub type ZxResult<T> = Result<T, ZxError>;

//! Error types for the decision-diagram package.

use thiserror::Error;

/// Errors that can occur in DD construction.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum DdError {
    /// A qubit index exceeds the package width of the operation.
    #[error("Qubit {qubit} out of range for {n}-qubit operation")]
    QubitOutOfRange {
        /// The offending qubit index.
        qubit: usize,
        /// The operation width.
        n: usize,
    },

    /// A control coincides with the target of a gate.
    #[error("Control qubit {qubit} coincides with the gate target")]
    ControlOnTarget {
        /// The offending qubit index.
        qubit: usize,
    },
}

/// Result type for DD operations.
pub type DdResult<T> = Result<T, DdError>;

//! Error types for the equivalence-checking engine.

use thiserror::Error;

/// Exception kinds that travel across worker boundaries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExceptionKind {
    /// Invalid argument in a checker.
    InvalidArgument,
    /// Internal logic error.
    LogicError,
    /// Runtime failure.
    RuntimeError,
    /// Anything else, including panics.
    Other,
}

impl ExceptionKind {
    /// Short name for diagnostics.
    pub fn as_str(self) -> &'static str {
        match self {
            ExceptionKind::InvalidArgument => "invalid_argument",
            ExceptionKind::LogicError => "logic_error",
            ExceptionKind::RuntimeError => "runtime_error",
            ExceptionKind::Other => "other",
        }
    }
}

/// Errors that can occur while checking.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum CheckError {
    /// The input circuits cannot be checked as configured.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// The configuration asks for an impossible combination.
    #[error("Unsupported configuration: {0}")]
    UnsupportedConfiguration(String),

    /// A parallel checker raised; re-thrown after terminating siblings.
    #[error("Exception in parallel checker: {}", .0.as_str())]
    Checker(ExceptionKind),

    /// IR-level failure.
    #[error(transparent)]
    Ir(#[from] veriq_ir::IrError),

    /// DD-package failure.
    #[error(transparent)]
    Dd(#[from] veriq_dd::DdError),

    /// ZX-backend failure.
    #[error(transparent)]
    Zx(#[from] veriq_zx::ZxError),

    /// I/O failure while reading the gate-cost profile.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl CheckError {
    /// The exception kind used when propagating this error across a worker
    /// boundary.
    pub fn exception_kind(&self) -> ExceptionKind {
        match self {
            CheckError::InvalidInput(_) | CheckError::UnsupportedConfiguration(_) => {
                ExceptionKind::InvalidArgument
            }
            CheckError::Ir(_) | CheckError::Dd(_) | CheckError::Zx(_) => ExceptionKind::LogicError,
            CheckError::Io(_) => ExceptionKind::RuntimeError,
            CheckError::Checker(kind) => *kind,
        }
    }
}

/// Result type for the engine.
pub type CheckResult<T> = Result<T, CheckError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exception_kinds() {
        assert_eq!(
            CheckError::InvalidInput("x".into()).exception_kind(),
            ExceptionKind::InvalidArgument
        );
        assert_eq!(
            CheckError::Checker(ExceptionKind::RuntimeError).exception_kind(),
            ExceptionKind::RuntimeError
        );
    }
}

//! Pipeline error kinds (`spec.md` §7).

use loom_diagnostics::{Category, Diagnostic, DiagnosticCode, Location};
use thiserror::Error;

/// An error that aborts the pipeline. All variants are unrecoverable — a
/// pass either completes or the driver stops the whole run.
#[derive(Debug, Error)]
pub enum LoomError {
    /// Missing attribute, wrong cell shape, or otherwise malformed IR.
    #[error("malformed input: {message}")]
    Malformed {
        /// Human-readable description.
        message: String,
        /// The offending cell or wire location.
        location: Location,
    },
    /// A construct outside the accepted set (non-constant reset value, an
    /// unsupported DPI argument type, …).
    #[error("unsupported construct: {message}")]
    Unsupported {
        /// Human-readable description.
        message: String,
        /// The offending cell or wire location.
        location: Location,
    },
    /// A downstream invariant would be violated by the current state.
    #[error("invariant violated: {message}")]
    Invariant {
        /// Human-readable description.
        message: String,
        /// The offending cell or wire location.
        location: Location,
    },
    /// Failure reading source or writing an emitted artifact.
    #[error("I/O failure: {0}")]
    Io(#[from] std::io::Error),
}

impl LoomError {
    /// Builds a [`Diagnostic`] from this error for reporting to the user.
    pub fn to_diagnostic(&self) -> Diagnostic {
        match self {
            LoomError::Malformed { message, location } => {
                Diagnostic::error(DiagnosticCode::new(Category::Malformed, 1), message.clone(), *location)
            }
            LoomError::Unsupported { message, location } => {
                Diagnostic::error(DiagnosticCode::new(Category::Unsupported, 1), message.clone(), *location)
            }
            LoomError::Invariant { message, location } => {
                Diagnostic::error(DiagnosticCode::new(Category::Invariant, 1), message.clone(), *location)
            }
            LoomError::Io(e) => Diagnostic::error(DiagnosticCode::new(Category::Io, 1), e.to_string(), Location::Global),
        }
    }
}

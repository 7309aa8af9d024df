//! Common result and error types for the Loom toolchain.

/// The standard result type for fallible internal operations.
///
/// `Ok` contains the result value (which may be partial or degraded after
/// error recovery). `Err` indicates an unrecoverable internal error (a bug
/// in Loom, not a user input problem). User-facing pipeline errors are
/// reported through [`DiagnosticSink`](../loom_diagnostics/struct.DiagnosticSink.html)
/// instead.
pub type LoomResult<T> = Result<T, InternalError>;

/// An internal error indicating a bug in Loom, not a user input problem.
///
/// These errors should never occur during normal operation. If one does
/// occur, it means there is a logic error in Loom that should be fixed.
#[derive(Debug, thiserror::Error)]
#[error("internal error: {message}")]
pub struct InternalError {
    /// Description of the internal error.
    pub message: String,
}

impl InternalError {
    /// Creates a new internal error with the given message.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl From<String> for InternalError {
    fn from(message: String) -> Self {
        Self { message }
    }
}

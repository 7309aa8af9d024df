//! Runtime error kinds (`spec.md` §7).

use thiserror::Error;

/// An error surfaced by the execution host. Most propagate to the shell,
/// which reports them and returns to the prompt (or exits non-zero in
/// script mode); [`RuntimeError::UnknownFunction`] is the one kind the
/// service loop recovers from locally (`spec.md` §7).
#[derive(Debug, Error)]
pub enum RuntimeError {
    /// The transport connection failed to read or write.
    #[error("transport I/O error: {0}")]
    Transport(#[from] std::io::Error),
    /// A message did not match the fixed 12-byte wire framing.
    #[error("protocol framing error: {0}")]
    Framing(String),
    /// The pending mask named a function ID outside the dispatch table.
    /// Recovered from locally: the service loop writes an error marker to
    /// that function's complete register and keeps servicing the round.
    #[error("unknown DPI function id {0} in pending mask")]
    UnknownFunction(u32),
    /// The DPI shared object does not export a callback the dispatch
    /// table named, or the dispatch-table symbol itself is missing.
    #[error("missing DPI callback: {0}")]
    MissingCallback(String),
    /// The transport reported a shutdown frame. Not an error condition —
    /// callers match on this variant to distinguish a clean `$finish`
    /// from every other failure.
    #[error("simulation shut down")]
    Shutdown,
    /// The operator interrupted a `run` before it completed.
    #[error("interrupted by operator")]
    Interrupted,
    /// The emulation wrapper's state register reports the `error` state.
    #[error("emulation entered error state")]
    EmulationError,
    /// Failed to load the DPI shared object or the dispatch table symbol.
    #[error("failed to load DPI module: {0}")]
    DpiLoad(#[from] libloading::Error),
    /// A project configuration or artifact document failed to parse.
    #[error("configuration error: {0}")]
    Config(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shutdown_is_not_transport_error() {
        let err = RuntimeError::Shutdown;
        assert!(!matches!(err, RuntimeError::Transport(_)));
    }

    #[test]
    fn unknown_function_formats_id() {
        let err = RuntimeError::UnknownFunction(7);
        assert_eq!(err.to_string(), "unknown DPI function id 7 in pending mask");
    }
}

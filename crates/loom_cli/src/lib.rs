//! Shared setup for the `loomc` and `loom` binaries.

/// Initializes `env_logger` at `debug` level when `verbose` is set, `info`
/// otherwise. Both binaries call this before doing anything else so that
/// `log::debug!` calls in `loom_host::transport`/`loom_pipeline` surface
/// under `-v`.
pub fn init_logging(verbose: bool) {
    let level = if verbose { log::LevelFilter::Debug } else { log::LevelFilter::Info };
    env_logger::Builder::new().filter_level(level).format_timestamp(None).init();
}

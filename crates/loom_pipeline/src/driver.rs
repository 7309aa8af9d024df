//! Runs the five-pass pipeline over a [`Design`] and collects the artifacts
//! the passes stamp along the way.

use loom_common::Interner;
use loom_diagnostics::DiagnosticSink;
use loom_ir::Design;
use loom_passes::{default_pipeline, LoomError, PassContext};
use serde::Serialize;

use crate::artifacts::Artifacts;

/// Configuration for one pipeline run.
pub struct PipelineConfig {
    /// The top module's clock port name (unresolved — interned by [`run`]).
    pub clk: String,
    /// The top module's reset port name.
    pub rst: String,
    /// Whether to log per-pass timing and diagnostics at `debug` level.
    pub verbose: bool,
}

/// The result of a successful pipeline run: the transformed design (now
/// rooted at the synthesized `loom_emu_top` wrapper) plus every artifact
/// the passes produced.
pub struct PipelineOutput {
    /// The transformed design.
    pub design: Design,
    /// DPI metadata, scan map, and memory map, if the corresponding passes
    /// found anything to stamp.
    pub artifacts: Artifacts,
}

/// Runs [`default_pipeline`] over `design` in order, failing fast on the
/// first pass that returns a [`LoomError`] (`spec.md` §5: passes run
/// synchronously and a failing pass aborts the whole run).
pub fn run_pipeline(mut design: Design, interner: &Interner, config: &PipelineConfig, diags: &DiagnosticSink) -> Result<PipelineOutput, LoomError> {
    let clk = interner.get_or_intern(&config.clk);
    let rst = interner.get_or_intern(&config.rst);
    let ctx = PassContext { interner, diags, clk, rst };

    // `emu_top` reassigns `design.top` to the synthesized wrapper, but the
    // artifact JSON (DPI metadata, scan map, memory map) is stamped on the
    // original DUT module by the earlier passes and never copied onto the
    // wrapper. Module IDs never change once allocated, so the DUT's ID
    // captured here still resolves after the wrapper swap.
    let dut = design.top;

    for pass in default_pipeline() {
        log::debug!("running pass {}", pass.name());
        pass.run(&mut design, &ctx)?;
        if config.verbose {
            log::info!("pass {} complete ({} modules)", pass.name(), design.module_count());
        }
    }

    let artifacts = Artifacts::collect(design.modules.get(dut));
    Ok(PipelineOutput { design, artifacts })
}

/// Serializes a value to pretty JSON, wrapping the serde error as a
/// [`LoomError::Io`] the way the passes already do for their own attribute
/// stamping (`mem_shadow::run`, `scan_insert::run`).
pub fn to_json_pretty<T: Serialize>(value: &T) -> Result<String, LoomError> {
    serde_json::to_string_pretty(value).map_err(|e| LoomError::Io(std::io::Error::new(std::io::ErrorKind::Other, e.to_string())))
}

//! Ties the front-end, the five-pass pipeline, and the SystemVerilog
//! back-end together into the single `compile` entry point `loomc` calls.

pub mod artifacts;
pub mod dispatch;
pub mod driver;
pub mod emit;
pub mod frontend;

use std::path::{Path, PathBuf};

use loom_common::Interner;
use loom_diagnostics::DiagnosticSink;

pub use artifacts::Artifacts;
pub use driver::{run_pipeline, PipelineConfig, PipelineOutput};
pub use frontend::{load_design, FrontendError};
pub use loom_passes::LoomError;

/// Everything a compile run produces, ready to be written to the output
/// directory by the caller.
pub struct CompileOutput {
    /// The emitted SystemVerilog source.
    pub verilog: String,
    /// The generated DPI dispatch-table C source, if the design has any
    /// DPI calls (`spec.md` §4.4.5).
    pub dispatch_source: Option<String>,
    /// The recovered artifact documents.
    pub artifacts: Artifacts,
}

/// Compile error wrapping every stage the front door can fail at.
#[derive(Debug, thiserror::Error)]
pub enum CompileError {
    /// The front-end failed to elaborate the input.
    #[error(transparent)]
    Frontend(#[from] FrontendError),
    /// A pass, or emission, failed.
    #[error(transparent)]
    Pipeline(#[from] LoomError),
}

/// Loads `sources`, runs the five-pass pipeline, and emits SystemVerilog
/// plus the DPI dispatch table and artifact documents — the whole of
/// `loomc`'s work short of writing files to disk.
///
/// `interner` is supplied by the caller rather than created here so that a
/// diagnostic emitted on a failing run (frontend or pipeline error) can
/// still be rendered afterward against the same interner idents were
/// allocated from — an interner this function owned and dropped on error
/// would leave the caller with no way to resolve them.
pub fn compile(sources: &[PathBuf], top_name: &str, config: &PipelineConfig, interner: &Interner, diags: &DiagnosticSink) -> Result<CompileOutput, CompileError> {
    let design = load_design(sources, interner, top_name)?;
    let output = run_pipeline(design, interner, config, diags)?;
    let verilog = emit::emit_design(&output.design, interner)?;
    let dispatch_source = output
        .artifacts
        .dpi_metadata
        .as_ref()
        .map(|meta| dispatch::generate_dispatch_table(meta));

    Ok(CompileOutput {
        verilog,
        dispatch_source,
        artifacts: output.artifacts,
    })
}

/// Convenience wrapper around [`compile`] that also writes every output
/// to `out_dir` (`top.sv`, `dispatch_table.c`, and whichever artifact
/// JSON files were produced).
pub fn compile_to_dir(sources: &[PathBuf], top_name: &str, config: &PipelineConfig, interner: &Interner, out_dir: &Path, diags: &DiagnosticSink) -> Result<CompileOutput, CompileError> {
    let output = compile(sources, top_name, config, interner, diags)?;
    std::fs::create_dir_all(out_dir).map_err(LoomError::from)?;
    std::fs::write(out_dir.join("top.sv"), &output.verilog).map_err(LoomError::from)?;
    if let Some(src) = &output.dispatch_source {
        std::fs::write(out_dir.join("dispatch_table.c"), src).map_err(LoomError::from)?;
    }
    output.artifacts.write_to_dir(out_dir)?;
    Ok(output)
}

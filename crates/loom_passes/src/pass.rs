//! The uniform interface every pipeline pass implements.

use loom_common::{Ident, Interner};
use loom_diagnostics::DiagnosticSink;
use loom_ir::Design;

use crate::error::LoomError;

/// Shared, read-only context every pass runs with: the interner passes use
/// to mint fresh wire/cell names, the sink for non-fatal diagnostics, and
/// the clock/reset port names from the driver's configuration
/// (`spec.md` §4.1 — "clock signal name (default `clk_i`), reset signal
/// name (default `rst_ni`)").
pub struct PassContext<'a> {
    /// The session-wide string interner.
    pub interner: &'a Interner,
    /// The diagnostic sink for warnings raised during this pass.
    pub diags: &'a DiagnosticSink,
    /// The DUT's clock port name.
    pub clk: Ident,
    /// The DUT's active-low reset port name.
    pub rst: Ident,
}

/// One ordered transformation step in the netlist pipeline.
///
/// Each pass holds exclusive mutable access to the whole [`Design`] for the
/// duration of its `run` call (`spec.md` §5: "Each pass holds exclusive
/// mutable access to the whole Design; passes are synchronous function
/// calls"). A pass either fully succeeds or returns a [`LoomError`] that
/// aborts the pipeline — there is no partial-success state.
pub trait Pass {
    /// A short, stable name for logging and diagnostics (`"mem_shadow"`,
    /// `"reset_extract"`, …).
    fn name(&self) -> &'static str;

    /// Runs this pass over the whole design.
    fn run(&self, design: &mut Design, ctx: &PassContext) -> Result<(), LoomError>;
}

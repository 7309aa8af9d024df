//! The five-pass netlist transformation pipeline (`spec.md` §4).
//!
//! Each pass module exposes a unit struct implementing [`Pass`] plus the
//! free functions that do the work, so `loom_pipeline`'s driver can run them
//! either through the trait object or (in tests) call a pass's `run_module`
//! directly against a single module.

pub mod artifacts;
pub mod emu_top;
pub mod error;
pub mod fixup;
pub mod invariants;
pub mod loom_instrument;
pub mod mem_shadow;
pub mod naming;
pub mod pass;
pub mod reset_extract;
pub mod scan_insert;
pub mod synth;

pub use emu_top::EmuTop;
pub use error::LoomError;
pub use loom_instrument::LoomInstrument;
pub use mem_shadow::MemShadow;
pub use pass::{Pass, PassContext};
pub use reset_extract::ResetExtract;
pub use scan_insert::ScanInsert;

/// The fixed pass order (`spec.md` §4.1): each pass requires the IR shape
/// the previous one leaves behind. `emu_top` "reads attributes stamped by
/// all prior passes; must run last."
pub fn default_pipeline() -> Vec<Box<dyn Pass>> {
    vec![
        Box::new(MemShadow),
        Box::new(ResetExtract),
        Box::new(LoomInstrument),
        Box::new(ScanInsert),
        Box::new(EmuTop),
    ]
}

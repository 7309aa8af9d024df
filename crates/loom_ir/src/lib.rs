//! The Loom netlist intermediate representation.
//!
//! This crate defines the post-elaboration netlist IR that the five pipeline
//! passes transform (`spec.md` §3): [`Design`], [`Module`], [`Wire`],
//! [`Cell`], [`Signal`], and the `$__loom_dpi_call`/`$__loom_finish`/`$print`
//! opaque cell kinds emitted by the (out-of-scope) front-end. Entities are
//! stored in an [`Arena`] per kind with opaque ID newtypes, following this
//! codebase's ownership discipline: a wire belongs to exactly one module,
//! and cell port maps reference bits of wires by `(wire id, bit index)`,
//! never by pointer.

#![warn(missing_docs)]

pub mod arena;
pub mod attrs;
pub mod cell;
pub mod design;
pub mod dpi;
pub mod ids;
pub mod module;
pub mod port;
pub mod signal;
pub mod wire;

pub use arena::{Arena, ArenaId};
pub use attrs::Attrs;
pub use cell::{Cell, CellKind, Connection, DffReset, MemReadPort, MemWritePort};
pub use design::Design;
pub use dpi::{ArgDirection, DpiArgDecl, DpiType, FormatSpan, NumBase};
pub use ids::{CellId, ModuleId, PortId, WireId};
pub use module::Module;
pub use port::{Port, PortDirection};
pub use signal::{constant_signal, wire_signal, Bit, Signal};
pub use wire::Wire;

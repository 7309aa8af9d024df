//! Diagnostic locations within the netlist IR.
//!
//! Loom's diagnostics contract (`spec.md` §7) anchors errors to "the
//! offending cell or wire name" rather than a source span — the front-end
//! that owns source spans is out of scope for this workspace. A [`Location`]
//! names the module plus (optionally) the cell or wire within it.

use loom_common::Ident;
use serde::{Deserialize, Serialize};

/// Where, within the netlist, a diagnostic applies.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub enum Location {
    /// Not tied to any particular design entity (e.g. a CLI-level error).
    Global,
    /// A whole module.
    Module {
        /// The module name.
        module: Ident,
    },
    /// A specific cell within a module.
    Cell {
        /// The enclosing module.
        module: Ident,
        /// The cell name.
        cell: Ident,
    },
    /// A specific wire within a module.
    Wire {
        /// The enclosing module.
        module: Ident,
        /// The wire name.
        wire: Ident,
    },
}

impl Location {
    /// Shorthand for [`Location::Module`].
    pub fn module(module: Ident) -> Self {
        Location::Module { module }
    }

    /// Shorthand for [`Location::Cell`].
    pub fn cell(module: Ident, cell: Ident) -> Self {
        Location::Cell { module, cell }
    }

    /// Shorthand for [`Location::Wire`].
    pub fn wire(module: Ident, wire: Ident) -> Self {
        Location::Wire { module, wire }
    }

    /// Returns `true` for [`Location::Global`].
    pub fn is_global(self) -> bool {
        matches!(self, Location::Global)
    }
}

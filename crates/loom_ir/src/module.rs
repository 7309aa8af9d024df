//! Module definitions — the primary organizational unit of the IR.
//!
//! A [`Module`] owns its wires and cells and exposes an ordered port list.
//! Modules form a hierarchy only insofar as `emu_top` instantiates the DUT
//! module inside the synthesized wrapper; the pipeline otherwise treats
//! each module as a standalone graph of wires and cells.

use crate::arena::Arena;
use crate::attrs::Attrs;
use crate::cell::{Cell, CellKind};
use crate::ids::{CellId, ModuleId, WireId};
use crate::port::{Port, PortDirection};
use crate::wire::Wire;
use loom_common::Ident;
use serde::{Deserialize, Serialize};

/// A single hardware module in the design: an ordered port list plus the
/// wires and cells owned by it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Module {
    /// The unique ID of this module in the design.
    pub id: ModuleId,
    /// The module name.
    pub name: Ident,
    /// The module's ordered external port interface. Re-derived from wire
    /// `port_input`/`port_output` flags by `fixup_ports` after any change.
    pub ports: Vec<Port>,
    /// All wires owned by this module.
    pub wires: Arena<WireId, Wire>,
    /// All cells (primitives and opaque call sites) owned by this module.
    pub cells: Arena<CellId, Cell>,
    /// Module-level string and bool attributes (`loom_n_dpi_funcs`,
    /// `loom_scan_chain_length`, `loom_resets_extracted`, …).
    pub attrs: Attrs,
}

impl Module {
    /// Creates a new, empty module.
    pub fn new(id: ModuleId, name: Ident) -> Self {
        Self {
            id,
            name,
            ports: Vec::new(),
            wires: Arena::new(),
            cells: Arena::new(),
            attrs: Attrs::new(),
        }
    }

    /// Finds the wire with the given name, if one exists.
    pub fn find_wire(&self, name: Ident) -> Option<WireId> {
        self.wires
            .iter()
            .find(|(_, w)| w.name == name)
            .map(|(id, _)| id)
    }

    /// Returns the input ports, in declaration order.
    pub fn input_ports(&self) -> impl Iterator<Item = &Port> {
        self.ports
            .iter()
            .filter(|p| p.direction == PortDirection::Input)
    }

    /// Returns the output ports, in declaration order.
    pub fn output_ports(&self) -> impl Iterator<Item = &Port> {
        self.ports
            .iter()
            .filter(|p| p.direction == PortDirection::Output)
    }

    /// Iterates over non-tombstoned `(CellId, &Cell)` pairs, in allocation
    /// order. Passes and emitters use this instead of `cells.iter()` so a
    /// `remove_cell`'d call site never resurfaces downstream.
    pub fn live_cells(&self) -> impl Iterator<Item = (CellId, &Cell)> {
        self.cells.iter().filter(|(_, c)| !c.is_removed())
    }

    /// Tombstones a cell (`spec.md` §4.4: "Remove the original opaque call
    /// cells"). The `CellId` stays valid but `live_cells` skips it.
    pub fn remove_cell(&mut self, id: CellId) {
        let cell = self.cells.get_mut(id);
        cell.kind = CellKind::Removed;
        cell.connections.clear();
    }
}

//! Fresh-name helpers for wires, cells, and modules synthesized by passes.
//!
//! Every pass that mints new IR entities (`loom_shadow_<memid>_ren`,
//! `loom_mem_ctrl`, the scan-chain mux chain, …) goes through these helpers
//! so uniqueness-within-scope is checked in one place instead of ad hoc at
//! each call site.

use loom_common::{Ident, Interner};
use loom_ir::{Cell, CellId, CellKind, Connection, Design, Module, Wire, WireId};

/// Allocates a fresh internal (non-port) wire in `module` named `base`, or
/// `base_N` for the smallest `N` that does not collide with an existing
/// wire name.
pub fn fresh_wire(module: &mut Module, interner: &Interner, base: &str, width: u32) -> WireId {
    let name = unique_ident(interner, base, |candidate| module.find_wire(candidate).is_some());
    let id = WireId::from_raw(module.wires.len() as u32);
    module.wires.alloc(Wire::new(id, name, width));
    id
}

/// Allocates a cell in `module` with a fresh, unique instance name derived
/// from `base`.
pub fn alloc_cell(module: &mut Module, interner: &Interner, base: &str, kind: CellKind, connections: Vec<Connection>) -> CellId {
    let name = unique_ident(interner, base, |candidate| {
        module.cells.iter().any(|(_, c)| c.name == candidate)
    });
    let id = CellId::from_raw(module.cells.len() as u32);
    module.cells.alloc(Cell { id, name, kind, connections });
    id
}

/// Adds a synthesized module to the design with a fresh, unique name
/// derived from `base` (e.g. `loom_mem_ctrl`, `loom_emu_ctrl`).
pub fn alloc_module(design: &mut Design, interner: &Interner, base: &str) -> loom_ir::ModuleId {
    let name = unique_ident(interner, base, |candidate| design.find_module(candidate).is_some());
    let id = loom_ir::ModuleId::from_raw(design.modules.len() as u32);
    design.modules.alloc(Module::new(id, name));
    id
}

/// Allocates a fresh wire in `module` and flags it as an input port. Callers
/// still need [`crate::fixup::fixup_ports`] afterward to rebuild
/// `module.ports`.
pub fn add_input_port(module: &mut Module, interner: &Interner, base: &str, width: u32) -> WireId {
    let w = fresh_wire(module, interner, base, width);
    module.wires.get_mut(w).port_input = true;
    w
}

/// Allocates a fresh wire in `module` and flags it as an output port. Same
/// `fixup_ports` caveat as [`add_input_port`].
pub fn add_output_port(module: &mut Module, interner: &Interner, base: &str, width: u32) -> WireId {
    let w = fresh_wire(module, interner, base, width);
    module.wires.get_mut(w).port_output = true;
    w
}

fn unique_ident(interner: &Interner, base: &str, taken: impl Fn(Ident) -> bool) -> Ident {
    let mut candidate = base.to_string();
    let mut suffix = 0u32;
    loop {
        let ident = interner.get_or_intern(&candidate);
        if !taken(ident) {
            return ident;
        }
        suffix += 1;
        candidate = format!("{base}_{suffix}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use loom_ir::ModuleId;

    #[test]
    fn fresh_wire_avoids_collision() {
        let interner = Interner::new();
        let mut module = Module::new(ModuleId::from_raw(0), interner.get_or_intern("top"));
        let a = fresh_wire(&mut module, &interner, "loom_en", 1);
        let b = fresh_wire(&mut module, &interner, "loom_en", 1);
        assert_ne!(a, b);
        assert_eq!(interner.resolve(module.wires.get(b).name), "loom_en_1");
    }

    #[test]
    fn alloc_module_names_are_unique() {
        let interner = Interner::new();
        let top_name = interner.get_or_intern("top");
        let mut modules = loom_ir::Arena::new();
        let top = modules.alloc(Module::new(ModuleId::from_raw(0), top_name));
        let mut design = Design { modules, top };
        let m1 = alloc_module(&mut design, &interner, "loom_mem_ctrl");
        let m2 = alloc_module(&mut design, &interner, "loom_mem_ctrl");
        assert_ne!(m1, m2);
    }
}

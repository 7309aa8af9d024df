//! `reset_extract` — strip async/sync reset, record initial values.
//!
//! Removes hardware reset from every flip-flop so initial state can
//! instead be scanned in from the host (`spec.md` §4.3). The reset value
//! moves from a cell parameter to a `loom_reset_value` attribute on the
//! Q-output wire, and the cell's reset field is cleared.

use loom_common::LogicVec;
use loom_diagnostics::{Category, Diagnostic, DiagnosticCode, DiagnosticSink, Location};
use loom_ir::{CellId, CellKind, Connection, Design, Module, PortDirection, WireId};

use crate::error::LoomError;
use crate::pass::{Pass, PassContext};

/// The `reset_extract` pass.
pub struct ResetExtract;

impl Pass for ResetExtract {
    fn name(&self) -> &'static str {
        "reset_extract"
    }

    fn run(&self, design: &mut Design, ctx: &PassContext) -> Result<(), LoomError> {
        run(design, ctx.diags)
    }
}

/// Runs `reset_extract` over every module in the design.
pub fn run(design: &mut Design, diags: &DiagnosticSink) -> Result<(), LoomError> {
    for (_, module) in design.modules.iter_mut() {
        run_module(module, diags)?;
    }
    Ok(())
}

fn run_module(module: &mut Module, diags: &DiagnosticSink) -> Result<(), LoomError> {
    let dff_ids: Vec<CellId> = module
        .cells
        .iter()
        .filter(|(_, c)| matches!(&c.kind, CellKind::Dff { reset: Some(_), .. }))
        .map(|(id, _)| id)
        .collect();

    for cell_id in dff_ids {
        let module_name = module.name;
        let cell_name = module.cells.get(cell_id).name;

        let (width, reset_value) = match &mut module.cells.get_mut(cell_id).kind {
            CellKind::Dff { width, reset, .. } => {
                let r = reset.take().expect("filtered to reset-bearing Dff cells above");
                (*width, r.value)
            }
            _ => unreachable!("filtered to Dff cells above"),
        };

        if reset_value.width() != width {
            return Err(LoomError::Malformed {
                message: format!(
                    "reset value width {} does not match flip-flop width {width}",
                    reset_value.width()
                ),
                location: Location::cell(module_name, cell_name),
            });
        }

        match find_q_wire(module, cell_id) {
            Some(q_wire) => {
                let bitstring = reset_value_bitstring(&reset_value);
                module.wires.get_mut(q_wire).attrs.set_string("loom_reset_value", bitstring);
            }
            None => diags.emit(Diagnostic::warning(
                DiagnosticCode::new(Category::Lint, 1),
                "flip-flop has no Q connection to stamp a reset value on",
                Location::cell(module_name, cell_name),
            )),
        }
    }

    module.attrs.set_bool("loom_resets_extracted", true);
    Ok(())
}

/// Finds the wire driven by a Dff cell's output connection.
fn find_q_wire(module: &Module, cell_id: CellId) -> Option<WireId> {
    let cell = module.cells.get(cell_id);
    cell.connections
        .iter()
        .find(|c: &&Connection| c.direction == PortDirection::Output)
        .and_then(|c| c.signal.first())
        .and_then(|bit| bit.wire_id())
}

fn reset_value_bitstring(value: &LogicVec) -> String {
    let mut s = String::with_capacity(value.width() as usize);
    for i in (0..value.width()).rev() {
        s.push_str(&value.get(i).to_string());
    }
    s
}

#[cfg(test)]
mod tests {
    use super::*;
    use loom_common::{Ident, Logic};
    use loom_ir::{Cell, Connection, DffReset, Module, ModuleId, Wire, WireId};

    fn build_module_with_reset_dff() -> (Module, WireId) {
        let mut module = Module::new(ModuleId::from_raw(0), Ident::from_raw(1));
        let q_wire = module.wires.alloc(Wire::new(WireId::from_raw(0), Ident::from_raw(2), 1));
        module.cells.alloc(Cell {
            id: CellId::from_raw(0),
            name: Ident::from_raw(3),
            kind: CellKind::Dff {
                width: 1,
                clk_polarity: true,
                has_enable: false,
                en_polarity: true,
                reset: Some(DffReset {
                    is_async: true,
                    polarity: true,
                    value: LogicVec::all_zero(1),
                }),
                has_set: false,
                set_polarity: true,
                has_clr: false,
                clr_polarity: true,
                has_aload: false,
                aload_polarity: true,
            },
            connections: vec![Connection {
                port_name: Ident::from_raw(4),
                direction: PortDirection::Output,
                signal: loom_ir::wire_signal(q_wire, 1),
            }],
        });
        (module, q_wire)
    }

    #[test]
    fn clears_reset_and_stamps_wire() {
        let (mut module, q_wire) = build_module_with_reset_dff();
        let diags = DiagnosticSink::new();
        run_module(&mut module, &diags).unwrap();

        if let CellKind::Dff { reset, .. } = &module.cells.get(CellId::from_raw(0)).kind {
            assert!(reset.is_none());
        } else {
            panic!("expected Dff");
        }
        assert_eq!(module.wires.get(q_wire).attrs.get_string("loom_reset_value"), Some("0"));
        assert!(module.attrs.get_bool("loom_resets_extracted"));
    }

    #[test]
    fn module_without_resets_is_unchanged() {
        let mut module = Module::new(ModuleId::from_raw(0), Ident::from_raw(1));
        let diags = DiagnosticSink::new();
        run_module(&mut module, &diags).unwrap();
        assert!(module.attrs.get_bool("loom_resets_extracted"));
    }

    #[test]
    fn width_mismatch_is_malformed() {
        let mut module = Module::new(ModuleId::from_raw(0), Ident::from_raw(1));
        let q_wire = module.wires.alloc(Wire::new(WireId::from_raw(0), Ident::from_raw(2), 4));
        module.cells.alloc(Cell {
            id: CellId::from_raw(0),
            name: Ident::from_raw(3),
            kind: CellKind::Dff {
                width: 4,
                clk_polarity: true,
                has_enable: false,
                en_polarity: true,
                reset: Some(DffReset {
                    is_async: false,
                    polarity: true,
                    value: LogicVec::all_zero(1),
                }),
                has_set: false,
                set_polarity: true,
                has_clr: false,
                clr_polarity: true,
                has_aload: false,
                aload_polarity: true,
            },
            connections: vec![Connection {
                port_name: Ident::from_raw(4),
                direction: PortDirection::Output,
                signal: loom_ir::wire_signal(q_wire, 4),
            }],
        });
        let diags = DiagnosticSink::new();
        let err = run_module(&mut module, &diags).unwrap_err();
        assert!(matches!(err, LoomError::Malformed { .. }));
    }

    #[test]
    fn reset_value_bitstring_matches_bit_order() {
        let mut v = LogicVec::all_zero(3);
        v.set(0, Logic::One);
        assert_eq!(reset_value_bitstring(&v), "001");
    }
}

//! `scan_insert` — serial scan chain insertion (`spec.md` §4.5).
//!
//! Runs strictly after `loom_instrument`: it expects every non-memory
//! flip-flop to already carry the widened `loom_en`-gated enable that pass
//! installs, and gates scan shifting in on top of it via the `EN`
//! connection `instrument_ff_enables` built — `loom_scan_enable`'s OR term
//! is baked into `EN` there, not here; this pass only threads `D`.

use loom_common::{Interner, Logic};
use loom_diagnostics::Location;
use loom_ir::{constant_signal, wire_signal, Bit, CellId, CellKind, Connection, Design, Module, PortDirection, Signal};

use crate::artifacts::{EnumMember, ScanMap, ScanVariable, SCAN_MAP_ATTR};
use crate::error::LoomError;
use crate::fixup::fixup_ports;
use crate::naming::{add_input_port, add_output_port};
use crate::pass::{Pass, PassContext};
use crate::synth::{emit_assign, emit_mux};

/// The `scan_insert` pass.
pub struct ScanInsert;

impl Pass for ScanInsert {
    fn name(&self) -> &'static str {
        "scan_insert"
    }

    fn run(&self, design: &mut Design, ctx: &PassContext) -> Result<(), LoomError> {
        for (_, module) in design.modules.iter_mut() {
            run_module(module, ctx);
        }
        Ok(())
    }
}

fn run_module(module: &mut Module, ctx: &PassContext) {
    let scan_in_w = add_input_port(module, ctx.interner, "loom_scan_in", 1);
    let scan_en_w = add_input_port(module, ctx.interner, "loom_scan_enable", 1);
    fixup_ports(module);

    let d_name = ctx.interner.get_or_intern("D");
    let q_name = ctx.interner.get_or_intern("Q");
    let scan_en_sig = wire_signal(scan_en_w, 1);

    let dff_ids: Vec<CellId> = module.live_cells().filter(|(_, c)| c.is_dff()).map(|(id, _)| id).collect();

    let mut previous_q: Signal = wire_signal(scan_in_w, 1);
    let mut offset = 0u32;
    let mut variables = Vec::with_capacity(dff_ids.len());

    for cell_id in dff_ids {
        let (width, q_sig, d_sig, cell_name) = {
            let cell = module.cells.get(cell_id);
            let width = match &cell.kind {
                CellKind::Dff { width, .. } => *width,
                _ => unreachable!("filtered to Dff cells above"),
            };
            let q_sig = cell.connection(q_name).cloned().expect("every Dff carries a Q connection");
            let d_sig = cell.connection(d_name).cloned().expect("every Dff carries a D connection");
            (width, q_sig, d_sig, cell.name)
        };

        let last_prev_bit = *previous_q.last().expect("previous_q is never empty");
        let mut scan_data: Signal = vec![last_prev_bit];
        scan_data.extend_from_slice(&q_sig[..width as usize - 1]);

        let new_d = emit_mux(module, ctx.interner, scan_en_sig.clone(), d_sig, scan_data, width);
        let cell = module.cells.get_mut(cell_id);
        match cell.connections.iter().position(|c| c.port_name == d_name) {
            Some(i) => cell.connections[i].signal = new_d,
            None => cell.connections.push(Connection {
                port_name: d_name,
                direction: PortDirection::Input,
                signal: new_d,
            }),
        }

        variables.push(scan_variable(module, ctx.interner, &q_sig, cell_name, width, offset));
        offset += width;
        previous_q = q_sig;
    }

    let scan_out_w = add_output_port(module, ctx.interner, "loom_scan_out", 1);
    fixup_ports(module);
    let msb = *previous_q.last().unwrap_or(&Bit::Const(Logic::Zero));
    emit_assign(module, ctx.interner, scan_out_w, vec![msb]);

    module.attrs.set_string("loom_scan_chain_length", offset.to_string());
    let scan_map = ScanMap {
        chain_length: offset,
        variables,
    };
    let json = serde_json::to_string(&scan_map).expect("ScanMap always serializes");
    module.attrs.set_string(SCAN_MAP_ATTR, json);
}

fn scan_variable(
    module: &Module,
    interner: &Interner,
    q_sig: &Signal,
    cell_name: loom_common::Ident,
    width: u32,
    offset: u32,
) -> ScanVariable {
    let q_wire = q_sig.first().and_then(|b| b.wire_id());
    let name = q_wire
        .and_then(|w| module.wires.get(w).attrs.get_string("hdlname"))
        .map(str::to_string)
        .unwrap_or_else(|| interner.resolve(cell_name).to_string());
    let enum_members = q_wire
        .and_then(|w| module.wires.get(w).attrs.get_string("loom_enum_members"))
        .map(parse_enum_members);
    ScanVariable {
        name,
        width,
        offset,
        enum_members,
    }
}

fn parse_enum_members(raw: &str) -> Vec<EnumMember> {
    raw.split(',')
        .filter_map(|pair| {
            let (name, value) = pair.split_once(':')?;
            let value = value.trim().parse().ok()?;
            Some(EnumMember {
                name: name.trim().to_string(),
                value,
            })
        })
        .collect()
}

/// External inductive-equivalence checker invoked by the optional,
/// test-only scan-transparency check.
pub trait EquivalenceChecker {
    /// Returns `Ok(())` if `gold` and `gate` are functionally equivalent,
    /// else an error describing the mismatch.
    fn check(&self, gold: &Module, gate: &Module) -> Result<(), String>;
}

/// Verifies that, with scan disabled, `scan_insert`'s transformation of
/// `module` is functionally transparent (`spec.md` §4.5, "Equivalence
/// check (optional, test-only)"): clones `module` untransformed as `gold`,
/// transforms a second clone and ties its scan ports to constant 0 as
/// `gate`, then asks `checker` to prove the two equivalent.
pub fn check_scan_transparency(module: &Module, ctx: &PassContext, checker: &dyn EquivalenceChecker) -> Result<(), LoomError> {
    let gold = module.clone();
    let mut gate = module.clone();
    run_module(&mut gate, ctx);
    tie_scan_ports_to_zero(&mut gate, ctx);
    checker
        .check(&gold, &gate)
        .map_err(|message| LoomError::Invariant {
            message,
            location: Location::module(module.name),
        })
}

fn tie_scan_ports_to_zero(module: &mut Module, ctx: &PassContext) {
    for name in ["loom_scan_enable", "loom_scan_in"] {
        if let Some(w) = module.find_wire(ctx.interner.get_or_intern(name)) {
            let width = module.wires.get(w).width;
            emit_assign(
                module,
                ctx.interner,
                w,
                constant_signal(std::iter::repeat(Logic::Zero).take(width as usize)),
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use loom_diagnostics::DiagnosticSink;
    use loom_ir::{Arena, Cell, CellId as IrCellId, ModuleId, Wire, WireId};

    fn ctx<'a>(interner: &'a Interner, diags: &'a DiagnosticSink) -> PassContext<'a> {
        PassContext {
            interner,
            diags,
            clk: interner.get_or_intern("clk_i"),
            rst: interner.get_or_intern("rst_ni"),
        }
    }

    fn dff(interner: &Interner, module: &mut Module, name: &str, width: u32, d: Signal, q_wire: WireId) -> CellId {
        module.cells.alloc(Cell {
            id: IrCellId::from_raw(0),
            name: interner.get_or_intern(name),
            kind: CellKind::Dff {
                width,
                clk_polarity: true,
                has_enable: true,
                en_polarity: true,
                reset: None,
                has_set: false,
                set_polarity: true,
                has_clr: false,
                clr_polarity: true,
                has_aload: false,
                aload_polarity: true,
            },
            connections: vec![
                Connection {
                    port_name: interner.get_or_intern("D"),
                    direction: PortDirection::Input,
                    signal: d,
                },
                Connection {
                    port_name: interner.get_or_intern("Q"),
                    direction: PortDirection::Output,
                    signal: wire_signal(q_wire, width),
                },
                Connection {
                    port_name: interner.get_or_intern("EN"),
                    direction: PortDirection::Input,
                    signal: constant_signal([Logic::One]),
                },
            ],
        })
    }

    #[test]
    fn no_op_on_design_with_no_ffs() {
        let interner = Interner::new();
        let mut module = Module::new(ModuleId::from_raw(0), interner.get_or_intern("top"));
        run_module(&mut module, &ctx(&interner, &DiagnosticSink::new()));
        assert_eq!(module.attrs.get_string("loom_scan_chain_length"), Some("0"));
        assert!(module.find_wire(interner.get_or_intern("loom_scan_out")).is_some());
    }

    #[test]
    fn chain_length_sums_ff_widths() {
        let interner = Interner::new();
        let mut module = Module::new(ModuleId::from_raw(0), interner.get_or_intern("top"));
        let d0 = module.wires.alloc(Wire::new(WireId::from_raw(0), interner.get_or_intern("d0"), 4));
        let q0 = module.wires.alloc(Wire::new(WireId::from_raw(1), interner.get_or_intern("q0"), 4));
        let d1 = module.wires.alloc(Wire::new(WireId::from_raw(2), interner.get_or_intern("d1"), 8));
        let q1 = module.wires.alloc(Wire::new(WireId::from_raw(3), interner.get_or_intern("q1"), 8));
        dff(&interner, &mut module, "ff0", 4, wire_signal(d0, 4), q0);
        dff(&interner, &mut module, "ff1", 8, wire_signal(d1, 8), q1);

        run_module(&mut module, &ctx(&interner, &DiagnosticSink::new()));

        assert_eq!(module.attrs.get_string("loom_scan_chain_length"), Some("12"));
        let map: ScanMap = serde_json::from_str(module.attrs.get_string(SCAN_MAP_ATTR).unwrap()).unwrap();
        assert_eq!(map.chain_length, 12);
        assert_eq!(map.variables.len(), 2);
        assert_eq!(map.variables[0].offset, 0);
        assert_eq!(map.variables[1].offset, 4);
    }

    #[test]
    fn scan_variable_uses_hdlname_when_present() {
        let interner = Interner::new();
        let mut module = Module::new(ModuleId::from_raw(0), interner.get_or_intern("top"));
        let d0 = module.wires.alloc(Wire::new(WireId::from_raw(0), interner.get_or_intern("d0"), 1));
        let q0 = module.wires.alloc(Wire::new(WireId::from_raw(1), interner.get_or_intern("q0"), 1));
        module.wires.get_mut(q0).attrs.set_string("hdlname", "top.fsm.state");
        dff(&interner, &mut module, "ff0", 1, wire_signal(d0, 1), q0);

        run_module(&mut module, &ctx(&interner, &DiagnosticSink::new()));

        let map: ScanMap = serde_json::from_str(module.attrs.get_string(SCAN_MAP_ATTR).unwrap()).unwrap();
        assert_eq!(map.variables[0].name, "top.fsm.state");
    }

    #[test]
    fn enum_members_are_parsed() {
        let interner = Interner::new();
        let mut module = Module::new(ModuleId::from_raw(0), interner.get_or_intern("top"));
        let d0 = module.wires.alloc(Wire::new(WireId::from_raw(0), interner.get_or_intern("d0"), 2));
        let q0 = module.wires.alloc(Wire::new(WireId::from_raw(1), interner.get_or_intern("q0"), 2));
        module.wires.get_mut(q0).attrs.set_string("loom_enum_members", "IDLE:0,RUN:1,DONE:2");
        dff(&interner, &mut module, "ff0", 2, wire_signal(d0, 2), q0);

        run_module(&mut module, &ctx(&interner, &DiagnosticSink::new()));

        let map: ScanMap = serde_json::from_str(module.attrs.get_string(SCAN_MAP_ATTR).unwrap()).unwrap();
        let members = map.variables[0].enum_members.as_ref().unwrap();
        assert_eq!(members.len(), 3);
        assert_eq!(members[1].name, "RUN");
        assert_eq!(members[1].value, 1);
    }

    struct AlwaysEqual;
    impl EquivalenceChecker for AlwaysEqual {
        fn check(&self, _gold: &Module, _gate: &Module) -> Result<(), String> {
            Ok(())
        }
    }

    #[test]
    fn equivalence_check_passes_with_stub_checker() {
        let interner = Interner::new();
        let diags = DiagnosticSink::new();
        let mut module = Module::new(ModuleId::from_raw(0), interner.get_or_intern("top"));
        let d0 = module.wires.alloc(Wire::new(WireId::from_raw(0), interner.get_or_intern("d0"), 1));
        let q0 = module.wires.alloc(Wire::new(WireId::from_raw(1), interner.get_or_intern("q0"), 1));
        dff(&interner, &mut module, "ff0", 1, wire_signal(d0, 1), q0);

        let result = check_scan_transparency(&module, &ctx(&interner, &diags), &AlwaysEqual);
        assert!(result.is_ok());
    }

    struct AlwaysMismatched;
    impl EquivalenceChecker for AlwaysMismatched {
        fn check(&self, _gold: &Module, _gate: &Module) -> Result<(), String> {
            Err("gold/gate mismatch".to_string())
        }
    }

    #[test]
    fn equivalence_check_surfaces_checker_error() {
        let interner = Interner::new();
        let diags = DiagnosticSink::new();
        let module = Module::new(ModuleId::from_raw(0), interner.get_or_intern("top"));
        let result = check_scan_transparency(&module, &ctx(&interner, &diags), &AlwaysMismatched);
        assert!(matches!(result, Err(LoomError::Invariant { .. })));
    }

    #[test]
    fn full_pass_stamps_zero_length_chain_without_ffs() {
        let interner = Interner::new();
        let diags = DiagnosticSink::new();
        let mut modules = Arena::new();
        let top = modules.alloc(Module::new(ModuleId::from_raw(0), interner.get_or_intern("top")));
        let mut design = Design { modules, top };
        ScanInsert.run(&mut design, &ctx(&interner, &diags)).unwrap();
        assert_eq!(design.top_module().attrs.get_string("loom_scan_chain_length"), Some("0"));
    }
}

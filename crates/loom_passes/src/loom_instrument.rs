//! `loom_instrument` — DPI bridge synthesis, `$print`/`$finish` lowering,
//! and flip-flop enable instrumentation (`spec.md` §4.4).
//!
//! The largest of the five passes. Three responsibilities run in order per
//! module: lower `$print` cells into synthesized DPI calls, collect every
//! `$__loom_dpi_call` cell (front-end-supplied and just-synthesized alike)
//! into a single bridge interface, lower `$__loom_finish` cells into
//! `loom_finish_o`, then widen every non-memory flip-flop's enable.

use loom_common::{Ident, Interner, Logic};
use loom_diagnostics::{Category, Diagnostic, DiagnosticCode, Location};
use loom_ir::{
    constant_signal, wire_signal, ArgDirection, CellId, CellKind, Connection, Design, DpiArgDecl, DpiType, FormatSpan, Module,
    NumBase, PortDirection, Signal, WireId,
};

use crate::artifacts::{DpiArgRecord, DpiFunctionRecord, DpiMetadata, DpiReturnRecord, DPI_METADATA_ATTR};
use crate::error::LoomError;
use crate::naming::{add_input_port, add_output_port, alloc_cell};
use crate::pass::{Pass, PassContext};
use crate::synth::{
    const_bits, emit_and, emit_assign, emit_extend, emit_not, emit_or, emit_or_many, emit_priority_cascade, emit_reduce_or,
};

/// Byte offset of the DPI register region within the controller's AXI-Lite
/// map (`spec.md` §6.1: "offset `0x00100`").
pub const DPI_BASE: u32 = 0x0010_0;
/// Bytes occupied by each function's register block (`spec.md` §6.1/§6.3).
pub const FUNC_BLOCK_SIZE: u32 = 64;
/// Byte offset of the single-word pending mask. Chosen below `DPI_BASE` so
/// it never overlaps a function's register block; the controller region
/// below it is sized per design by `emu_top`.
pub const MAILBOX_BASE: u32 = 0x0000_f0;

/// Substring left in a Q-wire's name by the memory subsystem, marking an
/// output register that `loom_instrument` must not re-gate (`spec.md`
/// §4.4.4: "Skip memory-output registers").
const MEMORY_OUTPUT_MARKER: &str = "__loom_mem_q";

/// The `loom_instrument` pass.
pub struct LoomInstrument;

impl Pass for LoomInstrument {
    fn name(&self) -> &'static str {
        "loom_instrument"
    }

    fn run(&self, design: &mut Design, ctx: &PassContext) -> Result<(), LoomError> {
        for (_, module) in design.modules.iter_mut() {
            lower_prints(module, ctx);
            bridge_dpi_calls(module, ctx)?;
            lower_finish(module, ctx);
            instrument_ff_enables(module, ctx);
        }
        Ok(())
    }
}

// --- 4.4.1 `$print` lowering ---

fn lower_prints(module: &mut Module, ctx: &PassContext) {
    let print_ids: Vec<CellId> = module
        .live_cells()
        .filter(|(_, c)| matches!(c.kind, CellKind::Print { .. }))
        .map(|(id, _)| id)
        .collect();
    let en_name = ctx.interner.get_or_intern("EN");
    let mut counter = 0u32;

    for cell_id in print_ids {
        let cell = module.cells.get(cell_id);
        let format = match &cell.kind {
            CellKind::Print { format } => format.clone(),
            _ => unreachable!("filtered to Print cells above"),
        };
        let en_sig = cell.connection(en_name).cloned();
        let n_int_spans = format.iter().filter(|s| matches!(s, FormatSpan::Integer { .. })).count();
        let arg_sigs: Vec<Signal> = (0..n_int_spans)
            .map(|i| {
                let name = ctx.interner.get_or_intern(&format!("ARG{i}"));
                cell.connection(name).cloned().unwrap_or_default()
            })
            .collect();

        let printf_fmt = render_printf_format(&format);
        let mut args = vec![DpiArgDecl {
            name: ctx.interner.get_or_intern("fmt"),
            ty: DpiType::CString,
            direction: ArgDirection::Input,
            const_value: Some(printf_fmt),
        }];
        let mut connections = Vec::new();
        if let Some(en) = &en_sig {
            connections.push(Connection {
                port_name: en_name,
                direction: PortDirection::Input,
                signal: en.clone(),
            });
        }
        for (i, sig) in arg_sigs.iter().enumerate() {
            let width = sig.len().max(1) as u32;
            args.push(DpiArgDecl {
                name: ctx.interner.get_or_intern(&format!("arg{i}")),
                ty: DpiType::Logic(width),
                direction: ArgDirection::Input,
                const_value: None,
            });
            connections.push(Connection {
                port_name: ctx.interner.get_or_intern(&format!("ARG{i}")),
                direction: PortDirection::Input,
                signal: sig.clone(),
            });
        }

        let func_name = ctx.interner.get_or_intern(&format!("$__loom_display_{counter}"));
        counter += 1;
        alloc_cell(
            module,
            ctx.interner,
            "loom_display",
            CellKind::DpiCall {
                func_name,
                args,
                return_ty: None,
                func_id: None,
                is_builtin: true,
            },
            connections,
        );

        module.remove_cell(cell_id);
    }
}

/// Reconstructs the C `printf` format string from a parsed format
/// descriptor, escaping any literal `%` so the result is printf-safe.
/// Decimal/hex/octal map onto standard conversions; `%b` is not a standard C
/// conversion — the host runtime's printf shim recognizes it as an
/// extension for binary rendering.
fn render_printf_format(format: &[FormatSpan]) -> String {
    let mut out = String::new();
    for span in format {
        match span {
            FormatSpan::Literal(text) => out.push_str(&text.replace('%', "%%")),
            FormatSpan::Integer { base, signed, upper_case } => {
                out.push('%');
                out.push_str(match base {
                    NumBase::Dec if *signed => "d",
                    NumBase::Dec => "u",
                    NumBase::Hex if *upper_case => "X",
                    NumBase::Hex => "x",
                    NumBase::Octal => "o",
                    NumBase::Binary => "b",
                });
            }
        }
    }
    out
}

// --- 4.4.2 DPI call transformation ---

struct CallInfo {
    func_id: u32,
    func_name: Ident,
    args: Vec<DpiArgDecl>,
    return_ty: Option<DpiType>,
    is_builtin: bool,
    arg_bus: Signal,
    result_sig: Option<Signal>,
    valid: Signal,
}

fn bridge_dpi_calls(module: &mut Module, ctx: &PassContext) -> Result<(), LoomError> {
    let call_ids: Vec<CellId> = module
        .live_cells()
        .filter(|(_, c)| matches!(c.kind, CellKind::DpiCall { .. }))
        .map(|(id, _)| id)
        .collect();

    if call_ids.is_empty() {
        module.attrs.set_string("loom_n_dpi_funcs", "0");
        return Ok(());
    }

    let en_name = ctx.interner.get_or_intern("EN");
    let result_name = ctx.interner.get_or_intern("RESULT");

    let mut calls = Vec::with_capacity(call_ids.len());
    for (func_id, &cell_id) in call_ids.iter().enumerate() {
        let (func_name, args, return_ty, is_builtin) = match &module.cells.get(cell_id).kind {
            CellKind::DpiCall { func_name, args, return_ty, is_builtin, .. } => (*func_name, args.clone(), *return_ty, *is_builtin),
            _ => unreachable!("filtered to DpiCall cells above"),
        };
        let arg_bus = concat_hw_args(module, ctx.interner, cell_id, &args);
        let result_sig = module.cells.get(cell_id).connection(result_name).cloned();
        let valid = derive_valid_condition(module, ctx, cell_id, en_name, result_name);
        calls.push(CallInfo {
            func_id: func_id as u32,
            func_name,
            args,
            return_ty,
            is_builtin,
            arg_bus,
            result_sig,
            valid,
        });
    }

    let max_arg_width = calls.iter().map(|c| c.arg_bus.len() as u32).max().unwrap_or(0);
    let max_ret_width = calls
        .iter()
        .map(|c| c.return_ty.and_then(DpiType::hw_width).unwrap_or(0))
        .max()
        .unwrap_or(0);

    let valid_w = add_output_port(module, ctx.interner, "loom_dpi_valid", 1);
    let func_id_w = add_output_port(module, ctx.interner, "loom_dpi_func_id", 8);
    let args_w = (max_arg_width > 0).then(|| add_output_port(module, ctx.interner, "loom_dpi_args", max_arg_width));
    let result_w = (max_ret_width > 0).then(|| add_input_port(module, ctx.interner, "loom_dpi_result", max_ret_width));
    crate::fixup::fixup_ports(module);

    if calls.len() == 1 {
        let call = &calls[0];
        emit_assign(module, ctx.interner, valid_w, call.valid.clone());
        emit_assign(module, ctx.interner, func_id_w, const_bits(call.func_id as u64, 8));
        if let Some(args_w) = args_w {
            let width = call.arg_bus.len() as u32;
            let padded = emit_extend(module, ctx.interner, call.arg_bus.clone(), width, max_arg_width, false);
            emit_assign(module, ctx.interner, args_w, padded);
        }
        if let (Some(result_w), Some(result_sig)) = (result_w, call.result_sig.clone()) {
            drive_truncated_result(module, ctx.interner, &result_sig, result_w, max_ret_width);
        }
    } else {
        let conds_1bit: Vec<Signal> = calls.iter().map(|c| reduce_to_1bit(module, ctx.interner, &c.valid)).collect();

        let valid_all = emit_or_many(module, ctx.interner, conds_1bit.clone());
        emit_assign(module, ctx.interner, valid_w, valid_all);

        let func_id_cases: Vec<Signal> = calls.iter().map(|c| const_bits(c.func_id as u64, 8)).collect();
        let func_id_cascade = emit_priority_cascade(module, ctx.interner, &conds_1bit, func_id_cases, const_bits(0, 8), 8);
        emit_assign(module, ctx.interner, func_id_w, func_id_cascade);

        if let Some(args_w) = args_w {
            let arg_cases: Vec<Signal> = calls
                .iter()
                .map(|c| {
                    let width = c.arg_bus.len() as u32;
                    emit_extend(module, ctx.interner, c.arg_bus.clone(), width, max_arg_width, false)
                })
                .collect();
            let default = constant_signal(std::iter::repeat(Logic::Zero).take(max_arg_width as usize));
            let cascade = emit_priority_cascade(module, ctx.interner, &conds_1bit, arg_cases, default, max_arg_width);
            emit_assign(module, ctx.interner, args_w, cascade);
        }

        // `result` is not cascaded: the bus carries one shared value per
        // cycle and only the function whose own `valid` fired captures it
        // (every other function's flip-flops hold, since their enable is
        // low that cycle) — routing it through the same priority-mux
        // construction as `func_id`/`args` would select among copies of an
        // identical broadcast value for no behavioral difference.
        if let Some(result_w) = result_w {
            for call in &calls {
                if let Some(result_sig) = call.result_sig.clone() {
                    drive_truncated_result(module, ctx.interner, &result_sig, result_w, max_ret_width);
                }
            }
        }
    }

    let functions: Vec<DpiFunctionRecord> = calls
        .iter()
        .map(|c| DpiFunctionRecord {
            id: c.func_id,
            name: ctx.interner.resolve(c.func_name).to_string(),
            base_addr: DPI_BASE + c.func_id * FUNC_BLOCK_SIZE,
            return_ty: c.return_ty.map(|ty| DpiReturnRecord {
                ty: dpi_type_name(ty),
                width: ty.hw_width().unwrap_or(0),
            }),
            args: c
                .args
                .iter()
                .map(|a| DpiArgRecord {
                    name: ctx.interner.resolve(a.name).to_string(),
                    direction: arg_direction_name(a.direction),
                    ty: dpi_type_name(a.ty),
                    width: a.ty.hw_width(),
                    value: a.const_value.clone(),
                })
                .collect(),
            is_builtin: c.is_builtin,
        })
        .collect();

    let metadata = DpiMetadata {
        functions,
        mailbox_base: MAILBOX_BASE,
        dpi_base: DPI_BASE,
        func_block_size: FUNC_BLOCK_SIZE,
    };
    let json = serde_json::to_string(&metadata).map_err(|e| LoomError::Io(std::io::Error::new(std::io::ErrorKind::Other, e.to_string())))?;
    module.attrs.set_string(DPI_METADATA_ATTR, json);
    module.attrs.set_string("loom_n_dpi_funcs", calls.len().to_string());

    for cell_id in call_ids {
        module.remove_cell(cell_id);
    }

    Ok(())
}

/// Concatenates a call's hardware-routed argument signals in declaration
/// order, skipping `string`-typed arguments (never routed through
/// hardware — see [`DpiArgDecl::const_value`]). Connection names follow the
/// same `ARG0..ARGk` convention `lower_prints` uses for its synthesized
/// calls.
fn concat_hw_args(module: &Module, interner: &Interner, cell_id: CellId, args: &[DpiArgDecl]) -> Signal {
    let cell = module.cells.get(cell_id);
    let mut bus = Vec::new();
    let mut idx = 0u32;
    for arg in args {
        if arg.ty == DpiType::CString {
            continue;
        }
        let name = interner.get_or_intern(&format!("ARG{idx}"));
        if let Some(sig) = cell.connection(name) {
            bus.extend(sig.iter().copied());
        }
        idx += 1;
    }
    bus
}

/// Derives a DPI call's activation condition (`spec.md` §4.4.2): the
/// front-end-supplied `EN`, else a dataflow trace of the result signal
/// through a `pmux` case or a `mux` `B`-input, else constant 1 with a
/// warning.
fn derive_valid_condition(module: &Module, ctx: &PassContext, cell_id: CellId, en_name: Ident, result_name: Ident) -> Signal {
    let cell = module.cells.get(cell_id);
    if let Some(sig) = cell.connection(en_name) {
        return sig.clone();
    }

    let b_name = ctx.interner.get_or_intern("B");
    let s_name = ctx.interner.get_or_intern("S");

    if let Some(result_sig) = cell.connection(result_name).cloned() {
        for (_, other) in module.live_cells() {
            if let CellKind::Pmux { width, n_cases } = &other.kind {
                let (Some(b_sig), Some(s_sig)) = (other.connection(b_name), other.connection(s_name)) else {
                    continue;
                };
                for case in 0..*n_cases {
                    let start = (case * *width) as usize;
                    let end = start + *width as usize;
                    if b_sig.len() >= end && b_sig[start..end] == result_sig[..] {
                        return vec![s_sig[case as usize]];
                    }
                }
            }
        }
        for (_, other) in module.live_cells() {
            if matches!(other.kind, CellKind::Mux { .. }) {
                if let Some(b_sig) = other.connection(b_name) {
                    if *b_sig == result_sig {
                        if let Some(s_sig) = other.connection(s_name) {
                            return s_sig.clone();
                        }
                    }
                }
            }
        }
    }

    ctx.diags.emit(
        Diagnostic::warning(
            DiagnosticCode::new(Category::Lint, 1),
            format!(
                "could not derive a valid condition for DPI call {:?}; defaulting to constant 1",
                ctx.interner.resolve(cell.name)
            ),
            Location::cell(module.name, cell.name),
        )
        .with_note("no EN port, matching pmux case, or matching 2:1 mux B-input was found for the result signal"),
    );
    constant_signal([Logic::One])
}

fn reduce_to_1bit(module: &mut Module, interner: &Interner, sig: &Signal) -> Signal {
    if sig.len() <= 1 {
        sig.clone()
    } else {
        emit_reduce_or(module, interner, sig.clone(), sig.len() as u32)
    }
}

/// Drives `result_sig`'s backing wire (assumed, like every other
/// pass-synthesized output, to be a plain low-bits slice of one wire) with
/// the low `result_sig.len()` bits of the shared `loom_dpi_result` bus.
fn drive_truncated_result(module: &mut Module, interner: &Interner, result_sig: &Signal, result_w: WireId, max_ret_width: u32) {
    let Some(target) = result_sig.first().and_then(|b| b.wire_id()) else {
        return;
    };
    let width = result_sig.len() as u32;
    let bus = wire_signal(result_w, max_ret_width);
    let truncated = bus[..width as usize].to_vec();
    emit_assign(module, interner, target, truncated);
}

fn dpi_type_name(ty: DpiType) -> String {
    match ty {
        DpiType::Byte => "byte",
        DpiType::Shortint => "shortint",
        DpiType::Int => "int",
        DpiType::Longint => "longint",
        DpiType::Logic(_) => "logic",
        DpiType::CString => "string",
    }
    .to_string()
}

fn arg_direction_name(dir: ArgDirection) -> String {
    match dir {
        ArgDirection::Input => "input",
        ArgDirection::Output => "output",
        ArgDirection::InOut => "inout",
    }
    .to_string()
}

// --- 4.4.3 `$finish` lowering ---

fn lower_finish(module: &mut Module, ctx: &PassContext) {
    let finish_ids: Vec<CellId> = module
        .live_cells()
        .filter(|(_, c)| matches!(c.kind, CellKind::Finish { .. }))
        .map(|(id, _)| id)
        .collect();
    if finish_ids.is_empty() {
        return;
    }

    let en_name = ctx.interner.get_or_intern("EN");
    let mut conds = Vec::with_capacity(finish_ids.len());
    for &cell_id in &finish_ids {
        let cell = module.cells.get(cell_id);
        if let CellKind::Finish { exit_code: Some(code) } = &cell.kind {
            log::info!("'$finish' cell {:?} carries exit code {code}", ctx.interner.resolve(cell.name));
        }
        conds.push(cell.connection(en_name).cloned().unwrap_or_else(|| constant_signal([Logic::One])));
    }
    let conds_1bit: Vec<Signal> = conds.into_iter().map(|s| reduce_to_1bit(module, ctx.interner, &s)).collect();
    let combined = emit_or_many(module, ctx.interner, conds_1bit);

    let finish_w = add_output_port(module, ctx.interner, "loom_finish_o", 1);
    crate::fixup::fixup_ports(module);
    emit_assign(module, ctx.interner, finish_w, combined);

    for cell_id in finish_ids {
        module.remove_cell(cell_id);
    }
}

// --- 4.4.4 Flip-flop enable instrumentation ---

fn instrument_ff_enables(module: &mut Module, ctx: &PassContext) {
    let loom_en = add_input_port(module, ctx.interner, "loom_en", 1);
    crate::fixup::fixup_ports(module);
    let loom_en_sig = wire_signal(loom_en, 1);

    let scan_en_name = ctx.interner.get_or_intern("loom_scan_enable");
    let scan_en_sig = module.find_wire(scan_en_name).map(|w| wire_signal(w, 1));
    let en_name = ctx.interner.get_or_intern("EN");
    let q_name = ctx.interner.get_or_intern("Q");

    let dff_ids: Vec<CellId> = module.live_cells().filter(|(_, c)| c.is_dff()).map(|(id, _)| id).collect();

    for cell_id in dff_ids {
        let is_memory_output = module
            .cells
            .get(cell_id)
            .connection(q_name)
            .and_then(|sig| sig.first())
            .and_then(|b| b.wire_id())
            .map(|w| ctx.interner.resolve(module.wires.get(w).name).contains(MEMORY_OUTPUT_MARKER))
            .unwrap_or(false);
        if is_memory_output {
            continue;
        }

        let (has_enable, en_polarity) = match &module.cells.get(cell_id).kind {
            CellKind::Dff { has_enable, en_polarity, .. } => (*has_enable, *en_polarity),
            _ => unreachable!("filtered to Dff cells above"),
        };

        let new_en: Signal = if !has_enable {
            match &scan_en_sig {
                Some(scan_en) => emit_or(module, ctx.interner, loom_en_sig.clone(), scan_en.clone(), 1),
                None => loom_en_sig.clone(),
            }
        } else {
            let existing_en = module
                .cells
                .get(cell_id)
                .connection(en_name)
                .cloned()
                .expect("has_enable implies an EN connection");
            let active_en = if en_polarity {
                existing_en
            } else {
                emit_not(module, ctx.interner, existing_en, 1)
            };
            let gated = emit_and(module, ctx.interner, active_en, loom_en_sig.clone(), 1);
            match &scan_en_sig {
                Some(scan_en) => emit_or(module, ctx.interner, gated, scan_en.clone(), 1),
                None => gated,
            }
        };

        let cell = module.cells.get_mut(cell_id);
        if let CellKind::Dff { has_enable, en_polarity, .. } = &mut cell.kind {
            *has_enable = true;
            *en_polarity = true;
        }
        match cell.connections.iter().position(|c| c.port_name == en_name) {
            Some(i) => cell.connections[i].signal = new_en,
            None => cell.connections.push(Connection {
                port_name: en_name,
                direction: PortDirection::Input,
                signal: new_en,
            }),
        }
    }
}

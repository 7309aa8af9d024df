//! Combinational-cell emission helpers shared by the passes that synthesize
//! new logic from scratch (`mem_shadow`'s address decode/data mux,
//! `loom_instrument`'s DPI bridge cascade, `scan_insert`'s mux chain,
//! `emu_top`'s IRQ/finish aggregation).
//!
//! Each helper allocates one fresh output wire plus one primitive cell and
//! returns the resulting [`Signal`], so call sites read as ordinary
//! expression-building rather than manual cell/wire bookkeeping.

use loom_common::{Interner, Logic};
use loom_ir::{constant_signal, wire_signal, Bit, CellKind, Connection, Module, PortDirection, Signal, WireId};

use crate::naming::{alloc_cell, fresh_wire};

fn conn(port_name: &str, interner: &Interner, direction: PortDirection, signal: Signal) -> Connection {
    Connection {
        port_name: interner.get_or_intern(port_name),
        direction,
        signal,
    }
}

/// Emits a bitwise AND of two equal-width signals.
pub fn emit_and(module: &mut Module, interner: &Interner, a: Signal, b: Signal, width: u32) -> Signal {
    let y = fresh_wire(module, interner, "loom_and_y", width);
    alloc_cell(
        module,
        interner,
        "loom_and",
        CellKind::And { width },
        vec![
            conn("A", interner, PortDirection::Input, a),
            conn("B", interner, PortDirection::Input, b),
            conn("Y", interner, PortDirection::Output, wire_signal(y, width)),
        ],
    );
    wire_signal(y, width)
}

/// Emits a bitwise OR of two equal-width signals.
pub fn emit_or(module: &mut Module, interner: &Interner, a: Signal, b: Signal, width: u32) -> Signal {
    let y = fresh_wire(module, interner, "loom_or_y", width);
    alloc_cell(
        module,
        interner,
        "loom_or",
        CellKind::Or { width },
        vec![
            conn("A", interner, PortDirection::Input, a),
            conn("B", interner, PortDirection::Input, b),
            conn("Y", interner, PortDirection::Output, wire_signal(y, width)),
        ],
    );
    wire_signal(y, width)
}

/// Emits an OR-reduction of an arbitrary-width signal list. Returns the
/// constant-0 signal for an empty list (the identity for OR).
pub fn emit_or_many(module: &mut Module, interner: &Interner, signals: Vec<Signal>) -> Signal {
    let mut iter = signals.into_iter();
    let Some(first) = iter.next() else {
        return constant_signal([Logic::Zero]);
    };
    iter.fold(first, |acc, s| emit_or(module, interner, acc, s, 1))
}

/// Emits a bitwise NOT.
pub fn emit_not(module: &mut Module, interner: &Interner, a: Signal, width: u32) -> Signal {
    let y = fresh_wire(module, interner, "loom_not_y", width);
    alloc_cell(
        module,
        interner,
        "loom_not",
        CellKind::Not { width },
        vec![
            conn("A", interner, PortDirection::Input, a),
            conn("Y", interner, PortDirection::Output, wire_signal(y, width)),
        ],
    );
    wire_signal(y, width)
}

/// Emits a reduction-OR, collapsing `a` to 1 bit.
pub fn emit_reduce_or(module: &mut Module, interner: &Interner, a: Signal, width: u32) -> Signal {
    let y = fresh_wire(module, interner, "loom_redor_y", 1);
    alloc_cell(
        module,
        interner,
        "loom_redor",
        CellKind::ReduceOr { width },
        vec![
            conn("A", interner, PortDirection::Input, a),
            conn("Y", interner, PortDirection::Output, wire_signal(y, 1)),
        ],
    );
    wire_signal(y, 1)
}

/// Emits a 2:1 multiplexer: `Y = sel ? b : a` (Yosys `$mux` convention —
/// `S=1` selects `B`).
pub fn emit_mux(module: &mut Module, interner: &Interner, sel: Signal, a: Signal, b: Signal, width: u32) -> Signal {
    let y = fresh_wire(module, interner, "loom_mux_y", width);
    alloc_cell(
        module,
        interner,
        "loom_mux",
        CellKind::Mux { width },
        vec![
            conn("A", interner, PortDirection::Input, a),
            conn("B", interner, PortDirection::Input, b),
            conn("S", interner, PortDirection::Input, sel),
            conn("Y", interner, PortDirection::Output, wire_signal(y, width)),
        ],
    );
    wire_signal(y, width)
}

/// Emits a priority cascade of 2:1 muxes over `cases` (earliest entry wins
/// ties), selected by the corresponding 1-bit condition in `conds`.
/// `default` drives the output when no condition is asserted.
///
/// This is the "priority cascade of 2:1 multiplexers keyed on the 1-bit
/// conditions (earliest-declared function wins ties)" construction
/// `spec.md` §4.4.2 calls for in the multi-function DPI bridge.
pub fn emit_priority_cascade(
    module: &mut Module,
    interner: &Interner,
    conds: &[Signal],
    cases: Vec<Signal>,
    default: Signal,
    width: u32,
) -> Signal {
    assert_eq!(conds.len(), cases.len(), "one condition per case");
    let mut acc = default;
    for (cond, case) in conds.iter().zip(cases.into_iter()).rev() {
        acc = emit_mux(module, interner, cond.clone(), acc, case, width);
    }
    acc
}

/// Emits an N-way priority multiplexer primitive directly (`$pmux`): the
/// first asserted bit of `select`, from the LSB, chooses the matching
/// entry of `cases`. Used where the spec calls for a `pmux` specifically
/// (`mem_shadow`'s read-data cascade) rather than a cascade of binary muxes.
pub fn emit_pmux(module: &mut Module, interner: &Interner, select: Signal, default: Signal, cases: Vec<Signal>, width: u32) -> Signal {
    let n_cases = cases.len() as u32;
    let y = fresh_wire(module, interner, "loom_pmux_y", width);
    let b: Signal = cases.into_iter().flatten().collect();
    alloc_cell(
        module,
        interner,
        "loom_pmux",
        CellKind::Pmux { width, n_cases },
        vec![
            conn("A", interner, PortDirection::Input, default),
            conn("B", interner, PortDirection::Input, b),
            conn("S", interner, PortDirection::Input, select),
            conn("Y", interner, PortDirection::Output, wire_signal(y, width)),
        ],
    );
    wire_signal(y, width)
}

/// Emits an equality comparator, 1-bit output.
pub fn emit_eq(module: &mut Module, interner: &Interner, a: Signal, b: Signal, width: u32) -> Signal {
    let y = fresh_wire(module, interner, "loom_eq_y", 1);
    alloc_cell(
        module,
        interner,
        "loom_eq",
        CellKind::Eq { width },
        vec![
            conn("A", interner, PortDirection::Input, a),
            conn("B", interner, PortDirection::Input, b),
            conn("Y", interner, PortDirection::Output, wire_signal(y, 1)),
        ],
    );
    wire_signal(y, 1)
}

/// Emits a subtractor, `width`-bit output (`a - b`, two's complement).
pub fn emit_sub(module: &mut Module, interner: &Interner, a: Signal, b: Signal, width: u32) -> Signal {
    let y = fresh_wire(module, interner, "loom_sub_y", width);
    alloc_cell(
        module,
        interner,
        "loom_sub",
        CellKind::Sub { width },
        vec![
            conn("A", interner, PortDirection::Input, a),
            conn("B", interner, PortDirection::Input, b),
            conn("Y", interner, PortDirection::Output, wire_signal(y, width)),
        ],
    );
    wire_signal(y, width)
}

/// Emits a zero/sign extension from `in_width` to `out_width`. Returns `a`
/// unchanged if the widths already match.
pub fn emit_extend(module: &mut Module, interner: &Interner, a: Signal, in_width: u32, out_width: u32, signed: bool) -> Signal {
    if in_width == out_width {
        return a;
    }
    let y = fresh_wire(module, interner, "loom_ext_y", out_width);
    alloc_cell(
        module,
        interner,
        "loom_ext",
        CellKind::Extend { in_width, out_width, signed },
        vec![
            conn("A", interner, PortDirection::Input, a),
            conn("Y", interner, PortDirection::Output, wire_signal(y, out_width)),
        ],
    );
    wire_signal(y, out_width)
}

/// `a >= b`, both zero-extended to `width + 1` bits and compared via a
/// guard-bit subtraction: the MSB of `a_ext - b_ext` is the borrow, set
/// exactly when `a < b`.
pub fn emit_ge(module: &mut Module, interner: &Interner, a: Signal, b: Signal, width: u32) -> Signal {
    let a_ext = emit_extend(module, interner, a, width, width + 1, false);
    let b_ext = emit_extend(module, interner, b, width, width + 1, false);
    let diff = emit_sub(module, interner, a_ext, b_ext, width + 1);
    let borrow = vec![diff[width as usize]];
    emit_not(module, interner, borrow, 1)
}

/// `a < b`, the mirror image of [`emit_ge`].
pub fn emit_lt(module: &mut Module, interner: &Interner, a: Signal, b: Signal, width: u32) -> Signal {
    let a_ext = emit_extend(module, interner, a, width, width + 1, false);
    let b_ext = emit_extend(module, interner, b, width, width + 1, false);
    let diff = emit_sub(module, interner, a_ext, b_ext, width + 1);
    vec![diff[width as usize]]
}

/// `ceil(log2(n))`, floored at `min_bits`. Used throughout sizing
/// calculations (`spec.md` §4.2's address-bits and global-address-width
/// formulas, which both specify a minimum).
pub fn ceil_log2(n: u64, min_bits: u32) -> u32 {
    if n <= 1 {
        return min_bits;
    }
    let bits = 64 - (n - 1).leading_zeros();
    bits.max(min_bits)
}

/// `ceil(a / b)`.
pub fn ceil_div(a: u32, b: u32) -> u32 {
    a.div_ceil(b)
}

/// Builds a constant `Signal` of `width` bits from an integer value, LSB first.
pub fn const_bits(value: u64, width: u32) -> Signal {
    (0..width)
        .map(|i| Bit::Const(if (value >> i) & 1 != 0 { Logic::One } else { Logic::Zero }))
        .collect()
}

/// Drives `target` with `signal` (which must already be `target`'s width).
/// The IR has no plain wire-to-wire assignment primitive, so this folds the
/// value through a zero-OR buffer cell — `Y = signal | 0`.
pub fn emit_assign(module: &mut Module, interner: &Interner, target: WireId, signal: Signal) {
    let width = signal.len() as u32;
    let zero = constant_signal(std::iter::repeat(Logic::Zero).take(width as usize));
    alloc_cell(
        module,
        interner,
        "loom_assign",
        CellKind::Or { width },
        vec![
            conn("A", interner, PortDirection::Input, signal),
            conn("B", interner, PortDirection::Input, zero),
            conn("Y", interner, PortDirection::Output, wire_signal(target, width)),
        ],
    );
}

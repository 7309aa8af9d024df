//! Cell definitions: primitives and the opaque front-end call cells.
//!
//! A [`Cell`] is a primitive gate, a flip-flop, a memory, or one of the
//! three opaque cell kinds the (out-of-scope) front-end emits for DPI call
//! sites, `$finish`, and `$display`/`$print`. Each opaque kind is a distinct
//! variant with typed fields rather than an attribute bag on a generic
//! cell — this is deliberate: it turns "missing attribute" mistakes into
//! compile errors.

use crate::dpi::{DpiArgDecl, DpiType, FormatSpan};
use crate::ids::{CellId, ModuleId, WireId};
use crate::port::PortDirection;
use crate::signal::Signal;
use loom_common::{Ident, LogicVec};
use serde::{Deserialize, Serialize};

/// The kind of reset on a flip-flop, read from the cell's reset-value
/// parameter before `reset_extract` removes it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DffReset {
    /// `true` for an asynchronous reset (`$adff`/`$adffe`), `false` for a
    /// synchronous one (`$sdff`/`$sdffe`).
    pub is_async: bool,
    /// Active level of the reset port.
    pub polarity: bool,
    /// The constant value the Q output takes when reset is asserted.
    /// `reset_extract` fails the pass if this cannot be resolved to a
    /// constant.
    pub value: LogicVec,
}

/// One read port of a [`CellKind::Memory`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemReadPort {
    /// Clock wire, if this read port is synchronous. `None` for an
    /// asynchronous (combinational) read port.
    pub clk: Option<WireId>,
    /// Address signal.
    pub addr: Signal,
    /// Data output signal.
    pub data: Signal,
    /// Optional read-enable signal.
    pub en: Option<Signal>,
}

/// One write port of a [`CellKind::Memory`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemWritePort {
    /// Clock wire.
    pub clk: WireId,
    /// Address signal.
    pub addr: Signal,
    /// Write-data signal.
    pub data: Signal,
    /// Write-enable signal.
    pub en: Signal,
}

/// The kind of a cell: a primitive operation or one of the opaque
/// front-end call sites.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum CellKind {
    // --- Sequential ---
    /// Flip-flop, generalized over the full combination of optional
    /// ports described in `spec.md` §3: every instance has `CLK`, `D`,
    /// `Q` (in `connections`) and a `WIDTH`; these flags say which of
    /// `EN`, `ARST`/`SRST`, `SET`, `CLR`, `ALOAD`/`AD` are also present.
    Dff {
        /// Data width in bits.
        width: u32,
        /// Active clock edge polarity (`true` = rising).
        clk_polarity: bool,
        /// Whether an `EN` port is present.
        has_enable: bool,
        /// Active level of `EN`, if present.
        en_polarity: bool,
        /// Reset configuration, if any.
        reset: Option<DffReset>,
        /// Whether an asynchronous `SET` port is present.
        has_set: bool,
        /// Active level of `SET`, if present.
        set_polarity: bool,
        /// Whether an asynchronous `CLR` port is present.
        has_clr: bool,
        /// Active level of `CLR`, if present.
        clr_polarity: bool,
        /// Whether an asynchronous load (`ALOAD`/`AD`) port pair is present.
        has_aload: bool,
        /// Active level of `ALOAD`, if present.
        aload_polarity: bool,
    },

    // --- Memory ---
    /// A memory primitive: backing storage plus its read/write ports.
    /// Rewritten in place by `mem_shadow`; invisible to later passes.
    Memory {
        /// Word width in bits.
        width: u32,
        /// Depth in words.
        depth: u32,
        /// Read ports, in declaration order.
        read_ports: Vec<MemReadPort>,
        /// Write ports, in declaration order.
        write_ports: Vec<MemWritePort>,
        /// Initial content, little-endian packed, if any.
        init: Option<LogicVec>,
        /// `$readmemh`/`$readmemb` init-file reference, if the front-end
        /// supplied one instead of (or alongside) a constant `init`.
        init_file: Option<String>,
        /// Whether `init_file` is hex-formatted (`$readmemh`) vs.
        /// binary (`$readmemb`).
        init_file_hex: bool,
    },

    // --- Combinational primitives ---
    /// Bitwise AND.
    And {
        /// Operand width in bits.
        width: u32,
    },
    /// Bitwise OR.
    Or {
        /// Operand width in bits.
        width: u32,
    },
    /// Bitwise NOT.
    Not {
        /// Operand width in bits.
        width: u32,
    },
    /// 2:1 multiplexer.
    Mux {
        /// Data width in bits.
        width: u32,
    },
    /// Priority multiplexer: the first asserted bit of `select` (from the
    /// LSB) chooses which of `n_cases` data inputs drives the output.
    Pmux {
        /// Data width in bits.
        width: u32,
        /// Number of cases (and width of the one-hot/priority select bus).
        n_cases: u32,
    },
    /// Reduction-OR (collapses a bus to 1 bit).
    ReduceOr {
        /// Input width in bits.
        width: u32,
    },
    /// Equality comparator.
    Eq {
        /// Operand width in bits.
        width: u32,
    },
    /// Subtractor.
    Sub {
        /// Operand width in bits.
        width: u32,
    },
    /// Zero/sign extension.
    Extend {
        /// Input width in bits.
        in_width: u32,
        /// Output width in bits.
        out_width: u32,
        /// Whether the extension is sign-preserving.
        signed: bool,
    },
    /// Constant value source.
    Const {
        /// The constant value.
        value: LogicVec,
    },

    // --- Opaque front-end cells ---
    /// `$__loom_dpi_call` — a DPI import call site. Connections carry the
    /// argument signals (keyed by argument name) and `RESULT`; `EN`, if
    /// present, is the front-end-supplied valid condition.
    DpiCall {
        /// The imported function's name.
        func_name: Ident,
        /// Argument declarations, in declaration order.
        args: Vec<DpiArgDecl>,
        /// The return type, if the function is non-`void`.
        return_ty: Option<DpiType>,
        /// The function ID assigned by `loom_instrument`, once assigned.
        func_id: Option<u32>,
        /// `true` for a call synthesized by `loom_instrument` itself (the
        /// `$__loom_display_<N>` wrapper a `$print` cell lowers into) rather
        /// than one the front-end emitted from a source-level DPI import.
        /// Kept as a typed field rather than an attribute, per this
        /// module's discipline (see the module doc comment).
        is_builtin: bool,
    },
    /// `$__loom_finish` — a termination call site. `EN` (if present) is
    /// the condition under which this call fires; absence means
    /// unconditional.
    Finish {
        /// The exit code argument, if the source supplied one.
        exit_code: Option<i64>,
    },
    /// `$print` — a formatted-print call site, lowered by
    /// `loom_instrument` into a synthesized `DpiCall`.
    Print {
        /// The parsed format descriptor.
        format: Vec<FormatSpan>,
    },

    /// A submodule instantiation: the synthesized controller, register
    /// file, scan controller, and AXI-Lite demux `mem_shadow`/`emu_top`
    /// build from scratch, or the instrumented DUT itself inside
    /// `loom_emu_top`. `connections` maps the instantiated module's port
    /// names to signals in the enclosing module, same as every other
    /// cell kind.
    Instance {
        /// The instantiated module.
        module: ModuleId,
    },

    /// A tombstoned cell. The [`Arena`](crate::arena::Arena) backing
    /// `Module::cells` never reorders or removes entries, so a pass that
    /// needs to "remove" a cell (`spec.md` §4.4: "Remove the original
    /// opaque call cells") replaces its kind with `Removed` instead —
    /// cheaper than compacting the arena, and safe because nothing else
    /// in the IR addresses a cell by [`CellId`](crate::ids::CellId).
    Removed,
}

/// A connection between a cell port and a signal.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Connection {
    /// The name of the port on the cell (`CLK`, `D`, `Q`, `EN`, `ARG0`, …).
    pub port_name: Ident,
    /// The direction of data flow.
    pub direction: PortDirection,
    /// The signal connected to this port.
    pub signal: Signal,
}

/// A cell in the netlist: a primitive operation or an opaque front-end
/// call site.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Cell {
    /// The unique ID of this cell within its module.
    pub id: CellId,
    /// The cell instance name. Unique within the module.
    pub name: Ident,
    /// The kind of cell.
    pub kind: CellKind,
    /// The port-to-signal connections.
    pub connections: Vec<Connection>,
}

impl Cell {
    /// Returns the signal connected to the given port name, if any.
    pub fn connection(&self, port_name: Ident) -> Option<&Signal> {
        self.connections
            .iter()
            .find(|c| c.port_name == port_name)
            .map(|c| &c.signal)
    }

    /// Returns `true` if this is a non-memory flip-flop cell.
    pub fn is_dff(&self) -> bool {
        matches!(self.kind, CellKind::Dff { .. })
    }

    /// Returns `true` if this cell has been tombstoned by a pass.
    pub fn is_removed(&self) -> bool {
        matches!(self.kind, CellKind::Removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signal::wire_signal;

    fn plain_dff(width: u32) -> CellKind {
        CellKind::Dff {
            width,
            clk_polarity: true,
            has_enable: false,
            en_polarity: true,
            reset: None,
            has_set: false,
            set_polarity: true,
            has_clr: false,
            clr_polarity: true,
            has_aload: false,
            aload_polarity: true,
        }
    }

    fn dummy_cell(kind: CellKind) -> Cell {
        Cell {
            id: CellId::from_raw(0),
            name: Ident::from_raw(1),
            kind,
            connections: Vec::new(),
        }
    }

    #[test]
    fn plain_dff_is_dff() {
        let cell = dummy_cell(plain_dff(8));
        assert!(cell.is_dff());
    }

    #[test]
    fn non_dff_is_not_dff() {
        let cell = dummy_cell(CellKind::And { width: 8 });
        assert!(!cell.is_dff());
    }

    #[test]
    fn dff_with_async_reset() {
        let mut kind = plain_dff(4);
        if let CellKind::Dff { reset, .. } = &mut kind {
            *reset = Some(DffReset {
                is_async: true,
                polarity: true,
                value: LogicVec::all_zero(4),
            });
        }
        let cell = dummy_cell(kind);
        if let CellKind::Dff { reset, .. } = &cell.kind {
            assert!(reset.as_ref().unwrap().is_async);
        } else {
            panic!("expected Dff");
        }
    }

    #[test]
    fn cell_connection_lookup() {
        let cell = Cell {
            id: CellId::from_raw(0),
            name: Ident::from_raw(1),
            kind: CellKind::And { width: 1 },
            connections: vec![
                Connection {
                    port_name: Ident::from_raw(2),
                    direction: PortDirection::Input,
                    signal: wire_signal(WireId::from_raw(0), 1),
                },
                Connection {
                    port_name: Ident::from_raw(3),
                    direction: PortDirection::Output,
                    signal: wire_signal(WireId::from_raw(1), 1),
                },
            ],
        };
        assert!(cell.connection(Ident::from_raw(2)).is_some());
        assert!(cell.connection(Ident::from_raw(99)).is_none());
    }

    #[test]
    fn memory_cell_with_ports() {
        let kind = CellKind::Memory {
            width: 16,
            depth: 8,
            read_ports: vec![MemReadPort {
                clk: Some(WireId::from_raw(0)),
                addr: wire_signal(WireId::from_raw(1), 3),
                data: wire_signal(WireId::from_raw(2), 16),
                en: None,
            }],
            write_ports: vec![],
            init: None,
            init_file: Some("init.hex".to_string()),
            init_file_hex: true,
        };
        let cell = dummy_cell(kind);
        if let CellKind::Memory {
            depth,
            read_ports,
            init_file_hex,
            ..
        } = &cell.kind
        {
            assert_eq!(*depth, 8);
            assert_eq!(read_ports.len(), 1);
            assert!(*init_file_hex);
        } else {
            panic!("expected Memory");
        }
    }

    #[test]
    fn dpi_call_cell() {
        let kind = CellKind::DpiCall {
            func_name: Ident::from_raw(10),
            args: vec![],
            return_ty: Some(DpiType::Int),
            func_id: Some(0),
            is_builtin: false,
        };
        let cell = dummy_cell(kind);
        if let CellKind::DpiCall { func_id, .. } = &cell.kind {
            assert_eq!(*func_id, Some(0));
        } else {
            panic!("expected DpiCall");
        }
    }

    #[test]
    fn instance_cell_references_module() {
        use crate::ids::ModuleId;
        let cell = dummy_cell(CellKind::Instance {
            module: ModuleId::from_raw(3),
        });
        if let CellKind::Instance { module } = &cell.kind {
            assert_eq!(module.as_raw(), 3);
        } else {
            panic!("expected Instance");
        }
    }

    #[test]
    fn removed_cell_is_removed() {
        let cell = dummy_cell(CellKind::Removed);
        assert!(cell.is_removed());
        assert!(!dummy_cell(CellKind::And { width: 1 }).is_removed());
    }

    #[test]
    fn finish_cell_with_exit_code() {
        let cell = dummy_cell(CellKind::Finish { exit_code: Some(7) });
        if let CellKind::Finish { exit_code } = &cell.kind {
            assert_eq!(*exit_code, Some(7));
        } else {
            panic!("expected Finish");
        }
    }
}

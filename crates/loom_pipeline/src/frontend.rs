//! A minimal JSON-based stand-in for the front-end this workspace does not
//! implement.
//!
//! `spec.md` §1 draws the parser that turns SystemVerilog-with-DPI into the
//! post-elaboration netlist IR (yosys-slang) as an external collaborator,
//! the same trust boundary it draws around the Verilator simulation binary.
//! `loomc` needs *something* upstream of the five passes to hand it a
//! [`Design`], so this module reads a plain, hand-writable JSON schema —
//! `SourceFile` — and interns it into the real IR through the session
//! [`Interner`], the same way a real front-end plugin would. Swapping this
//! for an actual yosys-slang binding is a drop-in replacement at the
//! [`load_design`] boundary; nothing downstream (the five passes, the
//! wrapper generator, the artifact emitters) depends on how the `Design`
//! was produced.

use std::collections::HashMap;
use std::path::Path;

use loom_common::{Interner, Logic, LogicVec};
use loom_ir::{
    ArgDirection, Cell, CellId, CellKind, Connection, Design, DffReset, DpiArgDecl, DpiType, FormatSpan, MemReadPort, MemWritePort, Module,
    ModuleId, NumBase, PortDirection, Signal, Wire, WireId,
};
use serde::Deserialize;
use thiserror::Error;

/// An error loading or resolving a [`SourceFile`] into a [`Design`].
#[derive(Debug, Error)]
pub enum FrontendError {
    /// The file could not be read.
    #[error("reading {path}: {source}")]
    Io {
        /// The path that failed to read.
        path: String,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },
    /// The file did not parse as a [`SourceFile`].
    #[error("parsing {path}: {source}")]
    Parse {
        /// The path that failed to parse.
        path: String,
        /// The underlying JSON error.
        #[source]
        source: serde_json::Error,
    },
    /// A cell connection referenced a wire name not declared in its module.
    #[error("module {module}: cell {cell} references undeclared wire {wire}")]
    UndeclaredWire {
        /// The enclosing module name.
        module: String,
        /// The cell name.
        cell: String,
        /// The undeclared wire name.
        wire: String,
    },
    /// A `-top` module name was not present in any loaded source file.
    #[error("top module {0:?} not found in loaded sources")]
    TopNotFound(String),
    /// A port's `dir` field was neither `"input"` nor `"output"`.
    #[error("module {module}: port {port} has invalid direction {direction:?}")]
    BadPortDirection {
        /// The enclosing module name.
        module: String,
        /// The port name.
        port: String,
        /// The offending direction string.
        direction: String,
    },
}

/// The root of one source file: a set of module declarations.
#[derive(Debug, Deserialize)]
pub struct SourceFile {
    /// Modules declared in this file.
    pub modules: Vec<ModuleDecl>,
}

/// One module, in the plain JSON front-end schema.
#[derive(Debug, Deserialize)]
pub struct ModuleDecl {
    /// Module name.
    pub name: String,
    /// Ports. Each port also implies a wire of the same name.
    #[serde(default)]
    pub ports: Vec<PortDecl>,
    /// Internal (non-port) wires.
    #[serde(default)]
    pub wires: Vec<WireDecl>,
    /// Cells, in declaration order.
    #[serde(default)]
    pub cells: Vec<CellDecl>,
}

/// One port declaration.
#[derive(Debug, Deserialize)]
pub struct PortDecl {
    /// Port (and backing wire) name.
    pub name: String,
    /// `"input"` or `"output"`.
    pub dir: String,
    /// Bit width.
    pub width: u32,
}

/// One internal wire declaration.
#[derive(Debug, Deserialize)]
pub struct WireDecl {
    /// Wire name.
    pub name: String,
    /// Bit width.
    pub width: u32,
    /// Source-level hierarchical name, stamped as the `hdlname` attribute.
    #[serde(default)]
    pub hdlname: Option<String>,
    /// Comma-separated `Name:Value` enum decode table, stamped as
    /// `loom_enum_members`.
    #[serde(default)]
    pub enum_members: Option<String>,
}

/// One cell declaration: a name, a typed kind, and its port connections.
#[derive(Debug, Deserialize)]
pub struct CellDecl {
    /// Cell instance name.
    pub name: String,
    /// The cell's kind and type-specific parameters.
    pub kind: CellDeclKind,
    /// Port-to-signal connections, by port name.
    #[serde(default)]
    pub connections: Vec<ConnDecl>,
}

/// One port connection in a [`CellDecl`].
#[derive(Debug, Deserialize)]
pub struct ConnDecl {
    /// Cell port name (`"CLK"`, `"D"`, `"Q"`, `"EN"`, `"ARG0"`, …).
    pub port: String,
    /// `"input"` or `"output"`.
    pub dir: String,
    /// The signal, as an ordered list of bits.
    pub signal: Vec<BitDecl>,
}

/// One bit of a [`ConnDecl`]'s signal.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum BitDecl {
    /// A constant bit: `"0"`, `"1"`, `"x"`, or `"z"`.
    Const(String),
    /// Bit `bit` of wire `wire`.
    Wire {
        /// The referenced wire's name.
        wire: String,
        /// The bit index within that wire.
        bit: u32,
    },
}

fn default_true() -> bool {
    true
}

/// A cell's kind in the plain JSON schema, mirroring [`CellKind`].
#[derive(Debug, Deserialize)]
#[serde(tag = "type")]
pub enum CellDeclKind {
    /// A flip-flop.
    Dff {
        /// Data width.
        width: u32,
        /// Active clock edge; defaults to rising.
        #[serde(default = "default_true")]
        clk_polarity: bool,
        /// Whether an `EN` port is present.
        #[serde(default)]
        has_enable: bool,
        /// `EN` active level; defaults to active-high.
        #[serde(default = "default_true")]
        en_polarity: bool,
        /// Reset configuration, if any.
        #[serde(default)]
        reset: Option<DffResetDecl>,
    },
    /// A memory primitive.
    Memory {
        /// Word width.
        width: u32,
        /// Depth in words.
        depth: u32,
        /// Read ports.
        #[serde(default)]
        read_ports: Vec<MemReadPortDecl>,
        /// Write ports.
        #[serde(default)]
        write_ports: Vec<MemWritePortDecl>,
        /// Constant initial content, as a binary string (MSB first,
        /// word-major), if any.
        #[serde(default)]
        init: Option<String>,
        /// `$readmemh`/`$readmemb` init-file path, if any.
        #[serde(default)]
        init_file: Option<String>,
        /// Whether `init_file` is hex-formatted.
        #[serde(default)]
        init_file_hex: bool,
    },
    /// Bitwise AND.
    And {
        /// Operand width.
        width: u32,
    },
    /// Bitwise OR.
    Or {
        /// Operand width.
        width: u32,
    },
    /// Bitwise NOT.
    Not {
        /// Operand width.
        width: u32,
    },
    /// 2:1 multiplexer.
    Mux {
        /// Data width.
        width: u32,
    },
    /// Priority multiplexer.
    Pmux {
        /// Data width.
        width: u32,
        /// Number of cases.
        n_cases: u32,
    },
    /// Reduction-OR.
    ReduceOr {
        /// Input width.
        width: u32,
    },
    /// Equality comparator.
    Eq {
        /// Operand width.
        width: u32,
    },
    /// Subtractor.
    Sub {
        /// Operand width.
        width: u32,
    },
    /// Zero/sign extension.
    Extend {
        /// Input width.
        in_width: u32,
        /// Output width.
        out_width: u32,
        /// Whether the extension preserves sign.
        #[serde(default)]
        signed: bool,
    },
    /// A constant source, as a binary string (MSB first).
    Const {
        /// The constant value.
        value: String,
    },
    /// A `$__loom_dpi_call` opaque front-end cell.
    DpiCall {
        /// Imported function name.
        func_name: String,
        /// Argument declarations.
        #[serde(default)]
        args: Vec<ArgDeclJson>,
        /// The return type, if non-`void`.
        #[serde(default)]
        return_ty: Option<TypeDeclJson>,
    },
    /// A `$__loom_finish` opaque front-end cell.
    Finish {
        /// Exit code argument, if any.
        #[serde(default)]
        exit_code: Option<i64>,
    },
    /// A `$print` opaque front-end cell.
    Print {
        /// The parsed format descriptor.
        format: Vec<FormatSpanJson>,
    },
}

/// JSON mirror of [`DffReset`].
#[derive(Debug, Deserialize)]
pub struct DffResetDecl {
    /// `true` for async (`$adff`), `false` for sync (`$sdff`).
    pub is_async: bool,
    /// Active level.
    #[serde(default = "default_true")]
    pub polarity: bool,
    /// Constant reset value, as a binary string.
    pub value: String,
}

/// JSON mirror of [`MemReadPort`].
#[derive(Debug, Deserialize)]
pub struct MemReadPortDecl {
    /// Clock wire name, for a synchronous read port.
    #[serde(default)]
    pub clk: Option<String>,
    /// Address signal.
    pub addr: Vec<BitDecl>,
    /// Data output signal.
    pub data: Vec<BitDecl>,
    /// Optional read-enable signal.
    #[serde(default)]
    pub en: Option<Vec<BitDecl>>,
}

/// JSON mirror of [`MemWritePort`].
#[derive(Debug, Deserialize)]
pub struct MemWritePortDecl {
    /// Clock wire name.
    pub clk: String,
    /// Address signal.
    pub addr: Vec<BitDecl>,
    /// Write-data signal.
    pub data: Vec<BitDecl>,
    /// Write-enable signal.
    pub en: Vec<BitDecl>,
}

/// JSON mirror of [`DpiArgDecl`].
#[derive(Debug, Deserialize)]
pub struct ArgDeclJson {
    /// Argument name.
    pub name: String,
    /// DPI type.
    pub ty: TypeDeclJson,
    /// `"input"`, `"output"`, or `"inout"`.
    pub direction: String,
    /// Compile-time constant value, for `string`-typed args.
    #[serde(default)]
    pub const_value: Option<String>,
}

/// JSON mirror of [`DpiType`].
#[derive(Debug, Deserialize)]
#[serde(tag = "type")]
pub enum TypeDeclJson {
    /// `byte`.
    Byte,
    /// `shortint`.
    Shortint,
    /// `int`.
    Int,
    /// `longint`.
    Longint,
    /// `bit`/`logic` vector.
    Logic {
        /// Bit width.
        width: u32,
    },
    /// `string`.
    CString,
}

/// JSON mirror of [`FormatSpan`].
#[derive(Debug, Deserialize)]
#[serde(tag = "type")]
pub enum FormatSpanJson {
    /// A literal run of characters.
    Literal {
        /// The literal text.
        text: String,
    },
    /// A `%`-conversion substituting a signal.
    Integer {
        /// Numeric base.
        base: String,
        /// Whether sign-extended.
        #[serde(default)]
        signed: bool,
        /// Whether hex digits are upper-case.
        #[serde(default)]
        upper_case: bool,
    },
}

/// Loads one source file and interns its modules into `interner`, returning
/// the parsed `(name -> ModuleDecl)` pairs in declaration order (callers
/// merge multiple files before resolving into a [`Design`]).
pub fn parse_source_file(path: &Path) -> Result<SourceFile, FrontendError> {
    let content = std::fs::read_to_string(path).map_err(|source| FrontendError::Io {
        path: path.display().to_string(),
        source,
    })?;
    serde_json::from_str(&content).map_err(|source| FrontendError::Parse {
        path: path.display().to_string(),
        source,
    })
}

/// Loads a file list of JSON source files and elaborates them into a
/// [`Design`] rooted at `top_name`.
pub fn load_design(paths: &[std::path::PathBuf], interner: &Interner, top_name: &str) -> Result<Design, FrontendError> {
    let mut decls = Vec::new();
    for path in paths {
        decls.extend(parse_source_file(path)?.modules);
    }
    elaborate(decls, interner, top_name)
}

/// Builds a [`Design`] from parsed module declarations.
pub fn elaborate(decls: Vec<ModuleDecl>, interner: &Interner, top_name: &str) -> Result<Design, FrontendError> {
    let mut modules = loom_ir::Arena::new();
    let mut name_to_id: HashMap<String, ModuleId> = HashMap::new();

    // Pass 1: allocate every module (empty), independent of declaration order.
    for decl in &decls {
        let id = ModuleId::from_raw(modules.len() as u32);
        let name = interner.get_or_intern(&decl.name);
        modules.alloc(Module::new(id, name));
        name_to_id.insert(decl.name.clone(), id);
    }

    // Pass 2: populate each module's wires, ports, and cells.
    for decl in &decls {
        let id = name_to_id[&decl.name];
        populate_module(&mut modules, id, decl, interner)?;
    }

    let top = *name_to_id.get(top_name).ok_or_else(|| FrontendError::TopNotFound(top_name.to_string()))?;
    Ok(Design { modules, top })
}

fn populate_module(
    modules: &mut loom_ir::Arena<ModuleId, Module>,
    id: ModuleId,
    decl: &ModuleDecl,
    interner: &Interner,
) -> Result<(), FrontendError> {
    let mut wire_names: HashMap<String, WireId> = HashMap::new();
    {
        let module = &mut modules[id];
        for p in &decl.ports {
            let wid = module.wires.alloc(Wire::new(WireId::from_raw(module.wires.len() as u32), interner.get_or_intern(&p.name), p.width));
            let w = module.wires.get_mut(wid);
            match p.dir.as_str() {
                "input" => w.port_input = true,
                "output" => w.port_output = true,
                other => {
                    return Err(FrontendError::BadPortDirection {
                        module: decl.name.clone(),
                        port: p.name.clone(),
                        direction: other.to_string(),
                    })
                }
            }
            wire_names.insert(p.name.clone(), wid);
        }
        for w in &decl.wires {
            let wid = module.wires.alloc(Wire::new(WireId::from_raw(module.wires.len() as u32), interner.get_or_intern(&w.name), w.width));
            if let Some(hdlname) = &w.hdlname {
                module.wires.get_mut(wid).attrs.set_string("hdlname", hdlname.clone());
            }
            if let Some(members) = &w.enum_members {
                module.wires.get_mut(wid).attrs.set_string("loom_enum_members", members.clone());
            }
            wire_names.insert(w.name.clone(), wid);
        }
        loom_passes::fixup::fixup_ports(module);
    }

    for c in &decl.cells {
        let kind = resolve_cell_kind(&c.kind, &wire_names, interner, &decl.name, &c.name)?;
        let mut connections = Vec::with_capacity(c.connections.len());
        for conn in &c.connections {
            let signal = resolve_signal(&conn.signal, &wire_names, &decl.name, &c.name)?;
            connections.push(Connection {
                port_name: interner.get_or_intern(&conn.port),
                direction: if conn.dir == "input" { PortDirection::Input } else { PortDirection::Output },
                signal,
            });
        }
        let module = &mut modules[id];
        let cid = CellId::from_raw(module.cells.len() as u32);
        module.cells.alloc(Cell {
            id: cid,
            name: interner.get_or_intern(&c.name),
            kind,
            connections,
        });
    }
    Ok(())
}

fn resolve_signal(bits: &[BitDecl], wire_names: &HashMap<String, WireId>, module: &str, cell: &str) -> Result<Signal, FrontendError> {
    bits.iter()
        .map(|b| match b {
            BitDecl::Const(s) => {
                let logic = Logic::from_char(s.chars().next().unwrap_or('0')).unwrap_or(Logic::X);
                Ok(loom_ir::Bit::Const(logic))
            }
            BitDecl::Wire { wire, bit } => {
                let wid = wire_names.get(wire).copied().ok_or_else(|| FrontendError::UndeclaredWire {
                    module: module.to_string(),
                    cell: cell.to_string(),
                    wire: wire.clone(),
                })?;
                Ok(loom_ir::Bit::wire(wid, *bit))
            }
        })
        .collect()
}

fn resolve_cell_kind(
    kind: &CellDeclKind,
    wire_names: &HashMap<String, WireId>,
    interner: &Interner,
    module: &str,
    cell: &str,
) -> Result<CellKind, FrontendError> {
    let resolve_opt_sig = |bits: &Option<Vec<BitDecl>>| -> Result<Option<Signal>, FrontendError> {
        bits.as_ref().map(|b| resolve_signal(b, wire_names, module, cell)).transpose()
    };
    let resolve_clk = |name: &str| -> Result<WireId, FrontendError> {
        wire_names.get(name).copied().ok_or_else(|| FrontendError::UndeclaredWire {
            module: module.to_string(),
            cell: cell.to_string(),
            wire: name.to_string(),
        })
    };

    Ok(match kind {
        CellDeclKind::Dff { width, clk_polarity, has_enable, en_polarity, reset } => CellKind::Dff {
            width: *width,
            clk_polarity: *clk_polarity,
            has_enable: *has_enable,
            en_polarity: *en_polarity,
            reset: reset.as_ref().map(|r| DffReset {
                is_async: r.is_async,
                polarity: r.polarity,
                value: LogicVec::from_binary_str(&r.value).unwrap_or_else(|| LogicVec::all_zero(*width)),
            }),
            has_set: false,
            set_polarity: true,
            has_clr: false,
            clr_polarity: true,
            has_aload: false,
            aload_polarity: true,
        },
        CellDeclKind::Memory { width, depth, read_ports, write_ports, init, init_file, init_file_hex } => CellKind::Memory {
            width: *width,
            depth: *depth,
            read_ports: read_ports
                .iter()
                .map(|rp| {
                    Ok(MemReadPort {
                        clk: rp.clk.as_deref().map(resolve_clk).transpose()?,
                        addr: resolve_signal(&rp.addr, wire_names, module, cell)?,
                        data: resolve_signal(&rp.data, wire_names, module, cell)?,
                        en: resolve_opt_sig(&rp.en)?,
                    })
                })
                .collect::<Result<Vec<_>, FrontendError>>()?,
            write_ports: write_ports
                .iter()
                .map(|wp| {
                    Ok(MemWritePort {
                        clk: resolve_clk(&wp.clk)?,
                        addr: resolve_signal(&wp.addr, wire_names, module, cell)?,
                        data: resolve_signal(&wp.data, wire_names, module, cell)?,
                        en: resolve_signal(&wp.en, wire_names, module, cell)?,
                    })
                })
                .collect::<Result<Vec<_>, FrontendError>>()?,
            init: init.as_deref().and_then(LogicVec::from_binary_str),
            init_file: init_file.clone(),
            init_file_hex: *init_file_hex,
        },
        CellDeclKind::And { width } => CellKind::And { width: *width },
        CellDeclKind::Or { width } => CellKind::Or { width: *width },
        CellDeclKind::Not { width } => CellKind::Not { width: *width },
        CellDeclKind::Mux { width } => CellKind::Mux { width: *width },
        CellDeclKind::Pmux { width, n_cases } => CellKind::Pmux { width: *width, n_cases: *n_cases },
        CellDeclKind::ReduceOr { width } => CellKind::ReduceOr { width: *width },
        CellDeclKind::Eq { width } => CellKind::Eq { width: *width },
        CellDeclKind::Sub { width } => CellKind::Sub { width: *width },
        CellDeclKind::Extend { in_width, out_width, signed } => CellKind::Extend {
            in_width: *in_width,
            out_width: *out_width,
            signed: *signed,
        },
        CellDeclKind::Const { value } => CellKind::Const {
            value: LogicVec::from_binary_str(value).unwrap_or_else(|| LogicVec::all_zero(value.len() as u32)),
        },
        CellDeclKind::DpiCall { func_name, args, return_ty } => CellKind::DpiCall {
            func_name: interner.get_or_intern(func_name),
            args: args
                .iter()
                .map(|a| DpiArgDecl {
                    name: interner.get_or_intern(&a.name),
                    ty: resolve_type(&a.ty),
                    direction: match a.direction.as_str() {
                        "output" => ArgDirection::Output,
                        "inout" => ArgDirection::InOut,
                        _ => ArgDirection::Input,
                    },
                    const_value: a.const_value.clone(),
                })
                .collect(),
            return_ty: return_ty.as_ref().map(resolve_type),
            func_id: None,
            is_builtin: false,
        },
        CellDeclKind::Finish { exit_code } => CellKind::Finish { exit_code: *exit_code },
        CellDeclKind::Print { format } => CellKind::Print {
            format: format
                .iter()
                .map(|f| match f {
                    FormatSpanJson::Literal { text } => FormatSpan::Literal(text.clone()),
                    FormatSpanJson::Integer { base, signed, upper_case } => FormatSpan::Integer {
                        base: match base.as_str() {
                            "hex" => NumBase::Hex,
                            "octal" => NumBase::Octal,
                            "binary" => NumBase::Binary,
                            _ => NumBase::Dec,
                        },
                        signed: *signed,
                        upper_case: *upper_case,
                    },
                })
                .collect(),
        },
    })
}

fn resolve_type(ty: &TypeDeclJson) -> DpiType {
    match ty {
        TypeDeclJson::Byte => DpiType::Byte,
        TypeDeclJson::Shortint => DpiType::Shortint,
        TypeDeclJson::Int => DpiType::Int,
        TypeDeclJson::Longint => DpiType::Longint,
        TypeDeclJson::Logic { width } => DpiType::Logic(*width),
        TypeDeclJson::CString => DpiType::CString,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn elaborate_simple_module() {
        let interner = Interner::new();
        let decls = vec![ModuleDecl {
            name: "top".to_string(),
            ports: vec![
                PortDecl {
                    name: "clk_i".to_string(),
                    dir: "input".to_string(),
                    width: 1,
                },
                PortDecl {
                    name: "q_o".to_string(),
                    dir: "output".to_string(),
                    width: 1,
                },
            ],
            wires: vec![],
            cells: vec![],
        }];
        let design = elaborate(decls, &interner, "top").unwrap();
        assert_eq!(design.module_count(), 1);
        assert_eq!(design.top_module().ports.len(), 2);
    }

    #[test]
    fn missing_top_errors() {
        let interner = Interner::new();
        let decls = vec![ModuleDecl {
            name: "top".to_string(),
            ports: vec![],
            wires: vec![],
            cells: vec![],
        }];
        assert!(matches!(elaborate(decls, &interner, "nope"), Err(FrontendError::TopNotFound(_))));
    }

    #[test]
    fn dff_cell_with_reset() {
        let interner = Interner::new();
        let decls = vec![ModuleDecl {
            name: "top".to_string(),
            ports: vec![
                PortDecl { name: "clk_i".into(), dir: "input".into(), width: 1 },
                PortDecl { name: "rst_ni".into(), dir: "input".into(), width: 1 },
            ],
            wires: vec![WireDecl {
                name: "q".to_string(),
                width: 8,
                hdlname: Some("top.q".to_string()),
                enum_members: None,
            }],
            cells: vec![CellDecl {
                name: "ff0".to_string(),
                kind: CellDeclKind::Dff {
                    width: 8,
                    clk_polarity: true,
                    has_enable: false,
                    en_polarity: true,
                    reset: Some(DffResetDecl {
                        is_async: true,
                        polarity: true,
                        value: "00000000".to_string(),
                    }),
                },
                connections: vec![
                    ConnDecl {
                        port: "CLK".to_string(),
                        dir: "input".to_string(),
                        signal: vec![BitDecl::Wire { wire: "clk_i".to_string(), bit: 0 }],
                    },
                    ConnDecl {
                        port: "Q".to_string(),
                        dir: "output".to_string(),
                        signal: (0..8).map(|b| BitDecl::Wire { wire: "q".to_string(), bit: b }).collect(),
                    },
                ],
            }],
        }];
        let design = elaborate(decls, &interner, "top").unwrap();
        let top = design.top_module();
        assert_eq!(top.cells.len(), 1);
        if let CellKind::Dff { reset, .. } = &top.cells.get(CellId::from_raw(0)).kind {
            assert!(reset.as_ref().unwrap().is_async);
        } else {
            panic!("expected Dff");
        }
    }

    #[test]
    fn undeclared_wire_errors() {
        let interner = Interner::new();
        let decls = vec![ModuleDecl {
            name: "top".to_string(),
            ports: vec![],
            wires: vec![],
            cells: vec![CellDecl {
                name: "c0".to_string(),
                kind: CellDeclKind::And { width: 1 },
                connections: vec![ConnDecl {
                    port: "A".to_string(),
                    dir: "input".to_string(),
                    signal: vec![BitDecl::Wire { wire: "nope".to_string(), bit: 0 }],
                }],
            }],
        }];
        assert!(matches!(elaborate(decls, &interner, "top"), Err(FrontendError::UndeclaredWire { .. })));
    }

    #[test]
    fn parse_source_file_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("top.json");
        std::fs::write(
            &path,
            r#"{"modules":[{"name":"top","ports":[{"name":"clk_i","dir":"input","width":1}]}]}"#,
        )
        .unwrap();
        let parsed = parse_source_file(&path).unwrap();
        assert_eq!(parsed.modules.len(), 1);
        assert_eq!(parsed.modules[0].name, "top");
    }
}

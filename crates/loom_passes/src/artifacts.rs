//! Machine-readable side documents emitted alongside the transformed netlist
//! (`spec.md` §6.3). Each struct here is the serializable shape of one
//! artifact; passes stamp their artifact as a JSON string attribute on the
//! top module (`loom_dpi_metadata_json`, `loom_scan_map_json`,
//! `loom_memory_map_json`) so `loom_pipeline` can pull it back out once the
//! run completes, without requiring every [`Pass`](crate::pass::Pass) call
//! to return a bespoke result type.

use serde::{Deserialize, Serialize};

/// The attribute key `mem_shadow` stamps its [`MemoryMap`] JSON under.
pub const MEMORY_MAP_ATTR: &str = "loom_memory_map_json";
/// The attribute key `loom_instrument` stamps its [`DpiMetadata`] JSON under.
pub const DPI_METADATA_ATTR: &str = "loom_dpi_metadata_json";
/// The attribute key `scan_insert` stamps its [`ScanMap`] JSON under.
pub const SCAN_MAP_ATTR: &str = "loom_scan_map_json";

/// One DPI function argument, as emitted to the metadata document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DpiArgRecord {
    /// Argument name.
    pub name: String,
    /// `"input"`, `"output"`, or `"inout"`.
    pub direction: String,
    /// The DPI type name (`"int"`, `"byte"`, `"logic"`, `"string"`, …).
    pub ty: String,
    /// Bit width, absent for `string` arguments.
    pub width: Option<u32>,
    /// The compile-time constant value, for `string`-typed arguments.
    pub value: Option<String>,
}

/// A function's return type, or absence (`void`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DpiReturnRecord {
    /// The DPI type name.
    pub ty: String,
    /// Bit width.
    pub width: u32,
}

/// One DPI function record in the metadata document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DpiFunctionRecord {
    /// Monotonically increasing function ID, starting at 0.
    pub id: u32,
    /// The function name.
    pub name: String,
    /// The byte offset of this function's register block
    /// (`dpi_base + id * func_block_size`).
    pub base_addr: u32,
    /// The return type, or `None` for `void`.
    pub return_ty: Option<DpiReturnRecord>,
    /// Argument declarations, in declaration order.
    pub args: Vec<DpiArgRecord>,
    /// Whether this function was synthesized by `loom_instrument` (a
    /// `$display`/`$print` call) rather than declared by the user. The
    /// dispatch-table generator uses this to emit an inline `printf` body
    /// instead of an `extern` call to a user-provided symbol.
    pub is_builtin: bool,
}

/// The DPI metadata document (`spec.md` §6.3).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DpiMetadata {
    /// One entry per DPI function.
    pub functions: Vec<DpiFunctionRecord>,
    /// The address of the single-word pending mask.
    pub mailbox_base: u32,
    /// The base address of the DPI register region.
    pub dpi_base: u32,
    /// Bytes occupied by each function's register block.
    pub func_block_size: u32,
}

/// One symbolic enum member for a scan variable (from `loom_enum_members`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnumMember {
    /// The symbolic name.
    pub name: String,
    /// The underlying integer value.
    pub value: i64,
}

/// One flip-flop's entry in the scan map.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScanVariable {
    /// Hierarchical name (from the Q-wire's `hdlname` attribute, or the
    /// cell name as a fallback).
    pub name: String,
    /// Bit width.
    pub width: u32,
    /// Bit offset within the chain.
    pub offset: u32,
    /// Symbolic decode table, if the source wire carried one.
    pub enum_members: Option<Vec<EnumMember>>,
}

/// The scan map document (`spec.md` §6.3).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScanMap {
    /// Total chain length in bits.
    pub chain_length: u32,
    /// Scan variables, in chain order (`loom_scan_in` side first).
    pub variables: Vec<ScanVariable>,
}

/// One memory's entry in the memory map.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemoryMapEntry {
    /// The memory cell's name.
    pub name: String,
    /// Depth in words.
    pub depth: u32,
    /// Word width in bits.
    pub width: u32,
    /// `ceil(log2(depth))`, at least 1.
    pub addr_bits: u32,
    /// Byte offset of this memory's region on the shadow bus.
    pub base_addr: u32,
    /// Exclusive end byte offset of this memory's region.
    pub end_addr: u32,
    /// Little-endian packed constant initial content, if any.
    pub initial_content: Option<String>,
    /// `$readmemh`/`$readmemb` init-file reference, if any.
    pub init_file: Option<String>,
    /// Whether `init_file` is hex-formatted.
    pub init_file_hex: bool,
}

/// The memory map document (`spec.md` §6.3), present only if the design has
/// memories.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemoryMap {
    /// Total byte size of the unified shadow bus.
    pub total_bytes: u32,
    /// Global address width in bits.
    pub addr_bits: u32,
    /// Global data width in bits.
    pub data_bits: u32,
    /// Number of memories.
    pub num_memories: u32,
    /// Per-memory entries, in pass order.
    pub memories: Vec<MemoryMapEntry>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dpi_metadata_roundtrip() {
        let meta = DpiMetadata {
            functions: vec![DpiFunctionRecord {
                id: 0,
                name: "dpi_add".to_string(),
                base_addr: 0x100,
                return_ty: Some(DpiReturnRecord {
                    ty: "int".to_string(),
                    width: 32,
                }),
                args: vec![DpiArgRecord {
                    name: "a".to_string(),
                    direction: "input".to_string(),
                    ty: "int".to_string(),
                    width: Some(32),
                    value: None,
                }],
                is_builtin: false,
            }],
            mailbox_base: 0x0f0,
            dpi_base: 0x100,
            func_block_size: 64,
        };
        let json = serde_json::to_string(&meta).unwrap();
        let restored: DpiMetadata = serde_json::from_str(&json).unwrap();
        assert_eq!(restored, meta);
    }

    #[test]
    fn scan_map_with_enum_members() {
        let map = ScanMap {
            chain_length: 33,
            variables: vec![ScanVariable {
                name: "top.state".to_string(),
                width: 1,
                offset: 0,
                enum_members: Some(vec![EnumMember {
                    name: "IDLE".to_string(),
                    value: 0,
                }]),
            }],
        };
        let json = serde_json::to_string(&map).unwrap();
        let restored: ScanMap = serde_json::from_str(&json).unwrap();
        assert_eq!(restored.variables[0].enum_members.as_ref().unwrap().len(), 1);
    }

    #[test]
    fn memory_map_end_addr_exclusive() {
        let entry = MemoryMapEntry {
            name: "m".to_string(),
            depth: 8,
            width: 16,
            addr_bits: 3,
            base_addr: 0,
            end_addr: 32,
            initial_content: None,
            init_file: Some("init.hex".to_string()),
            init_file_hex: true,
        };
        assert!(entry.end_addr > entry.base_addr);
    }
}

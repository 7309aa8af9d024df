//! `mem_shadow` — shadow-port insertion for memories (`spec.md` §4.2).
//!
//! Adds a random-access read/write port pair to every memory cell and
//! synthesizes `loom_mem_ctrl`, an address-decoded controller that
//! multiplexes a single unified bus over all of a module's memories.

use loom_common::LogicVec;
use loom_ir::{constant_signal, wire_signal, Bit, CellId, CellKind, Design, MemReadPort, MemWritePort, Module, Signal};

use crate::artifacts::{MemoryMap, MemoryMapEntry, MEMORY_MAP_ATTR};
use crate::error::LoomError;
use crate::naming::fresh_wire;
use crate::pass::{Pass, PassContext};
use crate::synth::{ceil_div, ceil_log2, const_bits, emit_and, emit_assign, emit_extend, emit_ge, emit_lt, emit_pmux, emit_sub};

/// The `mem_shadow` pass.
pub struct MemShadow;

impl Pass for MemShadow {
    fn name(&self) -> &'static str {
        "mem_shadow"
    }

    fn run(&self, design: &mut Design, ctx: &PassContext) -> Result<(), LoomError> {
        for (_, module) in design.modules.iter_mut() {
            if let Some(map) = run_module(module, ctx)? {
                let json = serde_json::to_string(&map)
                    .map_err(|e| LoomError::Io(std::io::Error::new(std::io::ErrorKind::Other, e.to_string())))?;
                module.attrs.set_string(MEMORY_MAP_ATTR, json);
            }
        }
        Ok(())
    }
}

struct MemInfo {
    cell_id: CellId,
    width: u32,
    addr_bits: u32,
    base_addr: u32,
    byte_size: u32,
}

fn run_module(module: &mut Module, ctx: &PassContext) -> Result<Option<MemoryMap>, LoomError> {
    let mem_ids: Vec<CellId> = module
        .cells
        .iter()
        .filter(|(_, c)| matches!(&c.kind, CellKind::Memory { .. }))
        .map(|(id, _)| id)
        .collect();
    if mem_ids.is_empty() {
        return Ok(None);
    }

    let clk_wire = module
        .find_wire(ctx.clk)
        .ok_or_else(|| LoomError::Malformed {
            message: format!("module has no clock wire named {:?}", ctx.interner.resolve(ctx.clk)),
            location: loom_diagnostics::Location::module(module.name),
        })?;

    let mut infos = Vec::with_capacity(mem_ids.len());
    let mut entries = Vec::with_capacity(mem_ids.len());
    let mut base = 0u32;
    let mut max_width = 0u32;

    for (idx, cell_id) in mem_ids.iter().copied().enumerate() {
        let (width, depth) = match &module.cells.get(cell_id).kind {
            CellKind::Memory { width, depth, .. } => (*width, *depth),
            _ => unreachable!("filtered to Memory cells above"),
        };
        let addr_bits = ceil_log2(depth as u64, 1);
        let words_per_entry = ceil_div(width, 32);
        let byte_size = depth * words_per_entry * 4;
        let name_str = ctx.interner.resolve(module.cells.get(cell_id).name).to_string();

        let ren = fresh_wire(module, ctx.interner, &format!("loom_shadow_{idx}_ren"), 1);
        let wen = fresh_wire(module, ctx.interner, &format!("loom_shadow_{idx}_wen"), 1);
        let addr_w = fresh_wire(module, ctx.interner, &format!("loom_shadow_{idx}_addr"), addr_bits);
        let rdata_w = fresh_wire(module, ctx.interner, &format!("loom_shadow_{idx}_rdata"), width);
        let wdata_w = fresh_wire(module, ctx.interner, &format!("loom_shadow_{idx}_wdata"), width);

        let (initial_content, init_file, init_file_hex) = match &mut module.cells.get_mut(cell_id).kind {
            CellKind::Memory {
                read_ports,
                write_ports,
                init,
                init_file,
                init_file_hex,
                ..
            } => {
                read_ports.push(MemReadPort {
                    clk: Some(clk_wire),
                    addr: wire_signal(addr_w, addr_bits),
                    data: wire_signal(rdata_w, width),
                    en: Some(wire_signal(ren, 1)),
                });
                write_ports.push(MemWritePort {
                    clk: clk_wire,
                    addr: wire_signal(addr_w, addr_bits),
                    data: wire_signal(wdata_w, width),
                    en: wire_signal(wen, 1),
                });
                let packed = init.take().map(|v| pack_little_endian(&v, width, depth));
                (packed, init_file.clone(), *init_file_hex)
            }
            _ => unreachable!("filtered to Memory cells above"),
        };

        entries.push(MemoryMapEntry {
            name: name_str.clone(),
            depth,
            width,
            addr_bits,
            base_addr: base,
            end_addr: base + byte_size,
            initial_content,
            init_file,
            init_file_hex,
        });
        infos.push(MemInfo {
            cell_id,
            width,
            addr_bits,
            base_addr: base,
            byte_size,
        });
        max_width = max_width.max(width);
        base += byte_size;
    }

    let total_bytes = base;
    let global_addr_bits = ceil_log2(total_bytes as u64, 2);
    let global_data_bits = max_width;

    let addr_i = fresh_wire(module, ctx.interner, "loom_mem_addr", global_addr_bits);
    let wdata_i = fresh_wire(module, ctx.interner, "loom_mem_wdata", global_data_bits);
    let rdata_o = fresh_wire(module, ctx.interner, "loom_mem_rdata", global_data_bits);
    let wen_i = fresh_wire(module, ctx.interner, "loom_mem_wen", 1);
    let ren_i = fresh_wire(module, ctx.interner, "loom_mem_ren", 1);
    for (w, is_input) in [(addr_i, true), (wdata_i, true), (rdata_o, false), (wen_i, true), (ren_i, true)] {
        let wire = module.wires.get_mut(w);
        if is_input {
            wire.port_input = true;
        } else {
            wire.port_output = true;
        }
    }
    crate::fixup::fixup_ports(module);

    let addr_sig = wire_signal(addr_i, global_addr_bits);
    let wdata_sig = wire_signal(wdata_i, global_data_bits);

    let mut read_cases = Vec::with_capacity(infos.len());
    let mut select_bits: Vec<Bit> = Vec::with_capacity(infos.len());

    for info in &infos {
        let base_const = const_bits(info.base_addr as u64, global_addr_bits);
        let end_const = const_bits((info.base_addr + info.byte_size) as u64, global_addr_bits);

        let ge_base = emit_ge(module, ctx.interner, addr_sig.clone(), base_const, global_addr_bits);
        let lt_end = emit_lt(module, ctx.interner, addr_sig.clone(), end_const, global_addr_bits);
        let select = emit_and(module, ctx.interner, ge_base, lt_end, 1);
        select_bits.push(select[0]);

        let local_base = const_bits(info.base_addr as u64, global_addr_bits);
        let diff = emit_sub(module, ctx.interner, addr_sig.clone(), local_base, global_addr_bits);
        let word_addr: Signal = diff[2..(2 + info.addr_bits as usize)].to_vec();

        let wen_local = emit_and(module, ctx.interner, wire_signal(wen_i, 1), select.clone(), 1);
        let ren_local = emit_and(module, ctx.interner, wire_signal(ren_i, 1), select.clone(), 1);
        let wdata_local = wdata_sig[..info.width as usize].to_vec();

        match &mut module.cells.get_mut(info.cell_id).kind {
            CellKind::Memory { read_ports, write_ports, .. } => {
                let rp = read_ports.last_mut().expect("shadow read port just pushed");
                rp.addr = word_addr.clone();
                rp.en = Some(ren_local);
                let wp = write_ports.last_mut().expect("shadow write port just pushed");
                wp.addr = word_addr;
                wp.en = wen_local;
                wp.data = wdata_local;
            }
            _ => unreachable!(),
        }

        let rdata_sig = wire_signal(
            match &module.cells.get(info.cell_id).kind {
                CellKind::Memory { read_ports, .. } => read_ports
                    .last()
                    .unwrap()
                    .data
                    .first()
                    .and_then(|b| b.wire_id())
                    .expect("shadow read data is a plain wire signal"),
                _ => unreachable!(),
            },
            info.width,
        );
        let rdata_ext = emit_extend(module, ctx.interner, rdata_sig, info.width, global_data_bits, false);
        read_cases.push(rdata_ext);
    }

    let select_signal: Signal = select_bits;
    let default = constant_signal(std::iter::repeat(loom_common::Logic::Zero).take(global_data_bits as usize));
    let muxed = emit_pmux(module, ctx.interner, select_signal, default, read_cases, global_data_bits);
    emit_assign(module, ctx.interner, rdata_o, muxed);

    module.attrs.set_string("loom_n_memories", infos.len().to_string());
    module.attrs.set_string("loom_shadow_addr_bits", global_addr_bits.to_string());
    module.attrs.set_string("loom_shadow_data_bits", global_data_bits.to_string());
    module.attrs.set_string("loom_shadow_total_bytes", total_bytes.to_string());

    Ok(Some(MemoryMap {
        total_bytes,
        addr_bits: global_addr_bits,
        data_bits: global_data_bits,
        num_memories: infos.len() as u32,
        memories: entries,
    }))
}

/// Packs a memory's constant initial content into a little-endian byte
/// string, `ceil(width / 8)` bytes per word, `depth` words
/// (`spec.md` §4.2: "byte-size = depth · ⌈width/8⌉").
fn pack_little_endian(value: &LogicVec, width: u32, depth: u32) -> String {
    let bytes_per_word = width.div_ceil(8);
    let mut bytes = Vec::with_capacity((bytes_per_word * depth) as usize);
    for word in 0..depth {
        for byte_idx in 0..bytes_per_word {
            let mut byte = 0u8;
            for bit in 0..8 {
                let global_bit = word * width + byte_idx * 8 + bit;
                if global_bit >= value.width() {
                    break;
                }
                if value.get(global_bit) == loom_common::Logic::One {
                    byte |= 1 << bit;
                }
            }
            bytes.push(byte);
        }
    }
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

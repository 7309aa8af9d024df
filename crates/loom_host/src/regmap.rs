//! The AXI-Lite register map the emulation wrapper exposes (`spec.md`
//! §6.1). Byte-addressed, 32-bit data, little-endian. This module holds
//! the fixed layout constants plus the per-function block addressing the
//! DPI metadata document parameterizes.

use loom_passes::artifacts::DpiMetadata;

/// Controller region base address. Low addresses: state, cycle counter,
/// design ID, version, DPI-function count, max-args, finish-code, and
/// run/stop/reset control bits.
pub const CTRL_BASE: u32 = 0x0000;
pub const CTRL_STATE: u32 = CTRL_BASE + 0x00;
pub const CTRL_CYCLE_LO: u32 = CTRL_BASE + 0x04;
pub const CTRL_CYCLE_HI: u32 = CTRL_BASE + 0x08;
pub const CTRL_DESIGN_ID: u32 = CTRL_BASE + 0x0c;
pub const CTRL_VERSION: u32 = CTRL_BASE + 0x10;
pub const CTRL_N_DPI_FUNCS: u32 = CTRL_BASE + 0x14;
pub const CTRL_MAX_ARGS: u32 = CTRL_BASE + 0x18;
pub const CTRL_FINISH_CODE: u32 = CTRL_BASE + 0x1c;
pub const CTRL_COMMAND: u32 = CTRL_BASE + 0x20;

/// The controller's `idle`/`running`/`frozen`/`error` state codes, as
/// read from [`CTRL_STATE`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControllerState {
    Idle,
    Running,
    Frozen,
    Error,
}

impl ControllerState {
    pub fn from_word(word: u32) -> Option<Self> {
        match word {
            0 => Some(Self::Idle),
            1 => Some(Self::Running),
            2 => Some(Self::Frozen),
            3 => Some(Self::Error),
            _ => None,
        }
    }
}

/// Command bits written to [`CTRL_COMMAND`].
pub const CMD_RUN: u32 = 1 << 0;
pub const CMD_STOP: u32 = 1 << 1;
pub const CMD_RESET: u32 = 1 << 2;

/// DPI region base address (`spec.md` §6.1, §6.3's `dpi_base`).
pub const DPI_BASE: u32 = 0x0_0100;
/// Bytes occupied by each function's register block.
pub const FUNC_BLOCK_SIZE: u32 = 64;
/// Offsets within a function's 64-byte block.
pub const FUNC_STATUS_OFFSET: u32 = 0x00;
pub const FUNC_ARGS_OFFSET: u32 = 0x04;
pub const FUNC_RET_LO_OFFSET: u32 = 0x38;
pub const FUNC_RET_HI_OFFSET: u32 = 0x3c;

/// Status word bits within a function's block.
pub const STATUS_PENDING: u32 = 1 << 0;
pub const STATUS_DONE: u32 = 1 << 1;
pub const STATUS_ERROR: u32 = 1 << 2;

/// The single-word pending mask, one bit per DPI function ID
/// (`spec.md` §6.1, §6.3's `mailbox_base`).
pub const MAILBOX_BASE: u32 = 0x0_00f0;

/// Scan-controller region base address. `spec.md` §6.1 names the scan
/// controller as one of the demux's three (here: four) master segments
/// but doesn't fix its register layout the way it does the controller and
/// DPI regions; this workspace's `loom_emu_ctrl`/`loom_scan_ctrl` wiring
/// (`loom_passes::emu_top`) exposes scan shift as a one-bit-per-cycle
/// bit-bang interface at these addresses.
pub const SCAN_BASE: u32 = 0x0_0200;
/// Scan control register: write [`SCAN_ENABLE`]`|`[`SCAN_STROBE`] to shift
/// one bit; read back [`SCAN_BUSY`] to know when the shift has settled.
pub const SCAN_CTRL: u32 = SCAN_BASE + 0x00;
/// Scan data register: write bit 0 as `loom_scan_in` before strobing;
/// read bit 0 as the `loom_scan_out` value latched by the same strobe.
pub const SCAN_DATA: u32 = SCAN_BASE + 0x04;
pub const SCAN_ENABLE: u32 = 1 << 0;
pub const SCAN_STROBE: u32 = 1 << 1;
pub const SCAN_BUSY: u32 = 1 << 2;

/// Shadow-memory region base address (`spec.md` §4.2's unified shadow bus,
/// exposed as DUT ports `loom_mem_{addr,wdata,rdata,wen,ren}` and wired to
/// a fourth demux segment by `loom_passes::emu_top`). Byte-addressed
/// within this region exactly as the unified shadow bus is byte-addressed
/// in `mem_shadow`'s own address-decode math.
pub const MEM_SHADOW_BASE: u32 = 0x0_1000;

/// The byte address of `func`'s status register.
pub fn func_status_addr(func_id: u32) -> u32 {
    DPI_BASE + func_id * FUNC_BLOCK_SIZE + FUNC_STATUS_OFFSET
}

/// The byte address of the `index`-th argument register of `func`.
pub fn func_arg_addr(func_id: u32, index: u32) -> u32 {
    DPI_BASE + func_id * FUNC_BLOCK_SIZE + FUNC_ARGS_OFFSET + index * 4
}

/// The byte address of `func`'s low return-value register.
pub fn func_ret_lo_addr(func_id: u32) -> u32 {
    DPI_BASE + func_id * FUNC_BLOCK_SIZE + FUNC_RET_LO_OFFSET
}

/// The byte address of `func`'s high return-value register.
pub fn func_ret_hi_addr(func_id: u32) -> u32 {
    DPI_BASE + func_id * FUNC_BLOCK_SIZE + FUNC_RET_HI_OFFSET
}

/// Confirms `metadata`'s declared layout constants agree with this
/// module's fixed addresses, so a stale compiler/host pairing fails loud
/// rather than silently reading the wrong register.
pub fn validate_layout(metadata: &DpiMetadata) -> Result<(), String> {
    if metadata.mailbox_base != MAILBOX_BASE {
        return Err(format!(
            "DPI metadata mailbox_base {:#x} does not match the host's fixed address {:#x}; recompile with a matching loomc",
            metadata.mailbox_base, MAILBOX_BASE
        ));
    }
    if metadata.dpi_base != DPI_BASE {
        return Err(format!(
            "DPI metadata dpi_base {:#x} does not match the host's fixed address {:#x}",
            metadata.dpi_base, DPI_BASE
        ));
    }
    if metadata.func_block_size != FUNC_BLOCK_SIZE {
        return Err(format!(
            "DPI metadata func_block_size {} does not match the host's fixed size {}",
            metadata.func_block_size, FUNC_BLOCK_SIZE
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn func_blocks_dont_overlap() {
        assert_eq!(func_status_addr(1) - func_status_addr(0), FUNC_BLOCK_SIZE);
    }

    #[test]
    fn controller_state_round_trip() {
        assert_eq!(ControllerState::from_word(2), Some(ControllerState::Frozen));
        assert_eq!(ControllerState::from_word(9), None);
    }

    #[test]
    fn validate_layout_rejects_mismatched_base() {
        let meta = DpiMetadata {
            functions: vec![],
            mailbox_base: 0xdead,
            dpi_base: DPI_BASE,
            func_block_size: FUNC_BLOCK_SIZE,
        };
        assert!(validate_layout(&meta).is_err());
    }

    #[test]
    fn validate_layout_accepts_matching_constants() {
        let meta = DpiMetadata {
            functions: vec![],
            mailbox_base: MAILBOX_BASE,
            dpi_base: DPI_BASE,
            func_block_size: FUNC_BLOCK_SIZE,
        };
        assert!(validate_layout(&meta).is_ok());
    }
}

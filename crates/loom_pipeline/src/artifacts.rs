//! Recovers the typed artifact documents the passes stamp as JSON strings
//! on the DUT module's attributes, and writes them out as files.

use std::path::Path;

use loom_ir::Module;
use loom_passes::artifacts::{DpiMetadata, MemoryMap, ScanMap, DPI_METADATA_ATTR, MEMORY_MAP_ATTR, SCAN_MAP_ATTR};
use loom_passes::LoomError;

/// The machine-readable outputs of one pipeline run, each present only if
/// the corresponding pass found something to stamp (`mem_shadow` skips a
/// module with no memories; DPI metadata and the scan map are always
/// present once `loom_instrument`/`scan_insert` have run over a module with
/// at least one flip-flop or DPI call).
#[derive(Debug, Default)]
pub struct Artifacts {
    /// DPI function table, if the DUT contains any `DpiCall` cells.
    pub dpi_metadata: Option<DpiMetadata>,
    /// Scan chain layout, if `scan_insert` found flip-flops to chain.
    pub scan_map: Option<ScanMap>,
    /// Memory address map, if the DUT contains any memories.
    pub memory_map: Option<MemoryMap>,
}

impl Artifacts {
    /// Parses whichever artifact attributes are present on `dut`.
    pub fn collect(dut: &Module) -> Self {
        Self {
            dpi_metadata: dut.attrs.get_string(DPI_METADATA_ATTR).and_then(|s| serde_json::from_str(s).ok()),
            scan_map: dut.attrs.get_string(SCAN_MAP_ATTR).and_then(|s| serde_json::from_str(s).ok()),
            memory_map: dut.attrs.get_string(MEMORY_MAP_ATTR).and_then(|s| serde_json::from_str(s).ok()),
        }
    }

    /// Writes every present artifact to `dir` as pretty JSON
    /// (`dpi_metadata.json`, `scan_map.json`, `memory_map.json`), per
    /// `spec.md` §6.3's description of the compiler's machine-readable
    /// outputs.
    pub fn write_to_dir(&self, dir: &Path) -> Result<(), LoomError> {
        std::fs::create_dir_all(dir)?;
        if let Some(meta) = &self.dpi_metadata {
            write_json(&dir.join("dpi_metadata.json"), meta)?;
        }
        if let Some(map) = &self.scan_map {
            write_json(&dir.join("scan_map.json"), map)?;
        }
        if let Some(map) = &self.memory_map {
            write_json(&dir.join("memory_map.json"), map)?;
        }
        Ok(())
    }
}

fn write_json<T: serde::Serialize>(path: &Path, value: &T) -> Result<(), LoomError> {
    let json = crate::driver::to_json_pretty(value)?;
    std::fs::write(path, json)?;
    Ok(())
}

//! Configuration types deserialized from `loom.toml`.
//!
//! `loom.toml` supplies project-level defaults for both Loom binaries: the
//! compiler (top module, clock/reset names, output directory) and the
//! execution host (transport kind, simulation binary, DPI shared object).
//! CLI flags always override file-supplied defaults (`spec.md` §6.4,
//! `SPEC_FULL.md` §6 expansion).

use serde::Deserialize;

/// The top-level project configuration parsed from `loom.toml`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProjectConfig {
    /// Core project metadata.
    #[serde(default)]
    pub project: ProjectMeta,
    /// Transport configuration for the execution host.
    #[serde(default)]
    pub transport: TransportConfig,
    /// Runtime/host-loaded module configuration.
    #[serde(default)]
    pub runtime: RuntimeConfig,
}

/// Core project metadata.
#[derive(Debug, Clone, Deserialize)]
pub struct ProjectMeta {
    /// The project name.
    #[serde(default)]
    pub name: String,
    /// The top module name, e.g. `"top"`.
    pub top: Option<String>,
    /// The clock port name. Defaults to `clk_i`.
    #[serde(default = "default_clk")]
    pub clk: String,
    /// The active-low reset port name. Defaults to `rst_ni`.
    #[serde(default = "default_rst")]
    pub rst: String,
    /// The output directory for emitted artifacts. Defaults to `build`.
    #[serde(default = "default_out_dir")]
    pub out_dir: String,
}

impl Default for ProjectMeta {
    fn default() -> Self {
        Self {
            name: String::new(),
            top: None,
            clk: default_clk(),
            rst: default_rst(),
            out_dir: default_out_dir(),
        }
    }
}

fn default_clk() -> String {
    "clk_i".to_string()
}

fn default_rst() -> String {
    "rst_ni".to_string()
}

fn default_out_dir() -> String {
    "build".to_string()
}

/// The wire-protocol transport the execution host uses to reach the
/// simulation (`spec.md` §6.2).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransportKind {
    /// Framed UNIX-domain socket (the only transport implemented end-to-end
    /// in this workspace; PCIe is a trait-level extension point).
    #[default]
    Unix,
    /// PCIe BAR-mapped register access, for running against real FPGA
    /// hardware rather than a simulation child process.
    Pcie,
}

/// Transport configuration for the execution host.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TransportConfig {
    /// Which transport to use.
    #[serde(default)]
    pub kind: TransportKind,
    /// UNIX-domain socket path, for [`TransportKind::Unix`].
    pub socket: Option<String>,
    /// Path to the Verilator simulation binary to spawn as a child process.
    pub sim: Option<String>,
    /// Skip spawning a simulation child process (connect to one already running).
    #[serde(default)]
    pub no_sim: bool,
}

/// Runtime/host-loaded module configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RuntimeConfig {
    /// Path to the compiled user DPI shared object (`cdylib`), loaded via
    /// [`DpiModule`](../loom_host/dpi_module/struct.DpiModule.html).
    pub sv_lib: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::load_config_from_str;

    #[test]
    fn defaults_without_project_table() {
        let config = load_config_from_str("").unwrap();
        assert_eq!(config.project.clk, "clk_i");
        assert_eq!(config.project.rst, "rst_ni");
        assert_eq!(config.project.out_dir, "build");
        assert_eq!(config.transport.kind, TransportKind::Unix);
        assert!(!config.transport.no_sim);
    }

    #[test]
    fn custom_clk_rst() {
        let toml = r#"
[project]
top = "top"
clk = "clock"
rst = "reset_n"
"#;
        let config = load_config_from_str(toml).unwrap();
        assert_eq!(config.project.top.as_deref(), Some("top"));
        assert_eq!(config.project.clk, "clock");
        assert_eq!(config.project.rst, "reset_n");
    }

    #[test]
    fn transport_pcie() {
        let toml = r#"
[transport]
kind = "pcie"
"#;
        let config = load_config_from_str(toml).unwrap();
        assert_eq!(config.transport.kind, TransportKind::Pcie);
    }
}

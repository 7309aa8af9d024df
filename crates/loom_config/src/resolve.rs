//! Merging CLI-supplied overrides on top of `loom.toml` defaults.

use crate::types::{ProjectConfig, TransportKind};

/// CLI-supplied overrides, one per resolvable setting. `None` means "use the
/// `loom.toml` default (or the built-in default if there is no file)".
///
/// Every field mirrors a CLI flag from `spec.md` §6.4: `-top`, `-clk`,
/// `-rst`, `-work` on the compiler; `-sv_lib`, `-sim`, `-s`, `--no-sim` on
/// the execution host.
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    /// `-top MODULE`
    pub top: Option<String>,
    /// `-clk NAME`
    pub clk: Option<String>,
    /// `-rst NAME`
    pub rst: Option<String>,
    /// `-work DIR`
    pub out_dir: Option<String>,
    /// `-sv_lib NAME`
    pub sv_lib: Option<String>,
    /// `-sim BINARY`
    pub sim: Option<String>,
    /// `-s SOCKET`
    pub socket: Option<String>,
    /// `--no-sim`
    pub no_sim: bool,
}

/// The fully resolved settings a binary runs with, after merging
/// `loom.toml` with CLI overrides. CLI flags always win (`spec.md` §6.4,
/// `SPEC_FULL.md` §6 expansion).
#[derive(Debug, Clone)]
pub struct ResolvedSettings {
    /// The top module name. Required; absence is a CLI-level usage error.
    pub top: Option<String>,
    /// The clock port name.
    pub clk: String,
    /// The active-low reset port name.
    pub rst: String,
    /// The output directory for artifacts.
    pub out_dir: String,
    /// Path to the compiled user DPI shared object.
    pub sv_lib: Option<String>,
    /// Transport kind.
    pub transport_kind: TransportKind,
    /// Simulation binary path.
    pub sim: Option<String>,
    /// UNIX socket path.
    pub socket: Option<String>,
    /// Whether to skip spawning a simulation child process.
    pub no_sim: bool,
}

/// Merges `loom.toml` defaults with CLI overrides, CLI winning on conflict.
pub fn resolve(config: &ProjectConfig, overrides: &CliOverrides) -> ResolvedSettings {
    ResolvedSettings {
        top: overrides.top.clone().or_else(|| config.project.top.clone()),
        clk: overrides.clk.clone().unwrap_or_else(|| config.project.clk.clone()),
        rst: overrides.rst.clone().unwrap_or_else(|| config.project.rst.clone()),
        out_dir: overrides
            .out_dir
            .clone()
            .unwrap_or_else(|| config.project.out_dir.clone()),
        sv_lib: overrides.sv_lib.clone().or_else(|| config.runtime.sv_lib.clone()),
        transport_kind: config.transport.kind,
        sim: overrides.sim.clone().or_else(|| config.transport.sim.clone()),
        socket: overrides.socket.clone().or_else(|| config.transport.socket.clone()),
        no_sim: overrides.no_sim || config.transport.no_sim,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::load_config_from_str;

    #[test]
    fn cli_overrides_file() {
        let config = load_config_from_str(
            r#"
[project]
top = "from_file"
clk = "clk_i"
"#,
        )
        .unwrap();
        let overrides = CliOverrides {
            top: Some("from_cli".to_string()),
            ..Default::default()
        };
        let resolved = resolve(&config, &overrides);
        assert_eq!(resolved.top.as_deref(), Some("from_cli"));
        assert_eq!(resolved.clk, "clk_i");
    }

    #[test]
    fn file_fills_in_when_no_override() {
        let config = load_config_from_str(
            r#"
[project]
top = "dut"
"#,
        )
        .unwrap();
        let resolved = resolve(&config, &CliOverrides::default());
        assert_eq!(resolved.top.as_deref(), Some("dut"));
        assert_eq!(resolved.out_dir, "build");
    }

    #[test]
    fn no_sim_is_sticky_true() {
        let config = load_config_from_str("[transport]\nno_sim = true\n").unwrap();
        let resolved = resolve(&config, &CliOverrides::default());
        assert!(resolved.no_sim);
    }

    #[test]
    fn missing_top_is_none() {
        let config = ProjectConfig::default();
        let resolved = resolve(&config, &CliOverrides::default());
        assert!(resolved.top.is_none());
    }
}

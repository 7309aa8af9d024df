//! Configuration file discovery and loading.

use crate::error::ConfigError;
use crate::types::ProjectConfig;
use std::path::{Path, PathBuf};

/// Walks up from `start_dir` looking for a `loom.toml`, returning its path
/// if found.
pub fn find_config(start_dir: &Path) -> Option<PathBuf> {
    let mut dir = start_dir.to_path_buf();
    loop {
        let candidate = dir.join("loom.toml");
        if candidate.is_file() {
            return Some(candidate);
        }
        if !dir.pop() {
            return None;
        }
    }
}

/// Loads a `loom.toml` from an explicit path.
pub fn load_config(path: &Path) -> Result<ProjectConfig, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    load_config_from_str(&content)
}

/// Discovers and loads a `loom.toml` by walking up from `start_dir`. Returns
/// the default configuration if none is found — all fields have sensible
/// defaults and CLI flags can supply the rest.
pub fn discover_config(start_dir: &Path) -> Result<ProjectConfig, ConfigError> {
    match find_config(start_dir) {
        Some(path) => load_config(&path),
        None => Ok(ProjectConfig::default()),
    }
}

/// Parses a `loom.toml` configuration from a string.
pub fn load_config_from_str(content: &str) -> Result<ProjectConfig, ConfigError> {
    toml::from_str(content).map_err(|e| ConfigError::Parse(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::tempdir;

    #[test]
    fn parse_minimal_config() {
        let config = load_config_from_str("").unwrap();
        assert_eq!(config.project.out_dir, "build");
    }

    #[test]
    fn find_config_walks_up() {
        let root = tempdir().unwrap();
        std::fs::write(root.path().join("loom.toml"), "[project]\ntop = \"top\"\n").unwrap();
        let nested = root.path().join("a/b/c");
        std::fs::create_dir_all(&nested).unwrap();

        let found = find_config(&nested).unwrap();
        assert_eq!(found, root.path().join("loom.toml"));
    }

    #[test]
    fn find_config_none_when_absent() {
        let root = tempdir().unwrap();
        assert!(find_config(root.path()).is_none());
    }

    #[test]
    fn discover_config_falls_back_to_default() {
        let root = tempdir().unwrap();
        let config = discover_config(root.path()).unwrap();
        assert_eq!(config.project.clk, "clk_i");
    }

    #[test]
    fn load_config_from_path() {
        let root = tempdir().unwrap();
        let path = root.path().join("loom.toml");
        let mut f = std::fs::File::create(&path).unwrap();
        writeln!(f, "[project]\ntop = \"dut\"\nclk = \"clock\"").unwrap();

        let config = load_config(&path).unwrap();
        assert_eq!(config.project.top.as_deref(), Some("dut"));
        assert_eq!(config.project.clk, "clock");
    }

    #[test]
    fn invalid_toml_errors() {
        let err = load_config_from_str("this is not valid toml {{{}}}").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }
}

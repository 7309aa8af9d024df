//! Parsing, discovery, and resolution of `loom.toml` project configuration.
//!
//! This crate reads the optional project configuration file and produces a
//! strongly-typed [`ProjectConfig`], then merges it with CLI-supplied
//! overrides to produce the [`ResolvedSettings`] both Loom binaries run
//! with.

#![warn(missing_docs)]

pub mod error;
pub mod loader;
pub mod resolve;
pub mod types;

pub use error::ConfigError;
pub use loader::{discover_config, find_config, load_config, load_config_from_str};
pub use resolve::{resolve, CliOverrides, ResolvedSettings};
pub use types::*;

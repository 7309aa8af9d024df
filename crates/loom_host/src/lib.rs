//! The host runtime (`spec.md` §4's "Host runtime" box, §5, §6.1–6.2): a
//! transport-agnostic DPI service loop plus the shell that drives it.
//!
//! [`transport`] and [`protocol`] implement the wire-level contract to the
//! simulation child process. [`regmap`] holds the AXI-Lite register layout.
//! [`dpi_module`] loads the compiled user DPI shared object. [`service`]
//! drains pending DPI calls each round. [`session`] ties all of the above
//! into the object the `run`/`stop`/`step`/`status`/`dump`/`reset` shell
//! commands act on; [`shell`] is the REPL/script reader loop itself.

pub mod dpi_module;
pub mod error;
pub mod protocol;
pub mod regmap;
pub mod service;
pub mod session;
pub mod shell;
pub mod transport;

pub use dpi_module::DpiModule;
pub use error::RuntimeError;
pub use session::{Session, SessionStatus};

//! Port definitions for module interfaces.
//!
//! A [`Port`] is one entry of a module's ordered external interface, backed
//! by a [`Wire`](crate::wire::Wire) that carries the matching `port_input`/
//! `port_output` flag. `fixup_ports` (in `loom_passes`) re-derives this
//! ordered list from wire flags after any pass changes them.

use crate::ids::{PortId, WireId};
use loom_common::Ident;
use serde::{Deserialize, Serialize};

/// The direction of a port on a module boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PortDirection {
    /// An input port (data flows into the module).
    Input,
    /// An output port (data flows out of the module).
    Output,
}

/// A port in a module's ordered external interface.
///
/// Each port is backed by a [`WireId`] inside the same module.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Port {
    /// The unique ID of this port.
    pub id: PortId,
    /// The port name. Matches the backing wire's name.
    pub name: Ident,
    /// The direction of data flow.
    pub direction: PortDirection,
    /// The wire within the module that backs this port.
    pub wire: WireId,
}

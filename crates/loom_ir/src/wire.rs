//! Named bit-vector wires.

use crate::attrs::Attrs;
use crate::ids::WireId;
use loom_common::Ident;
use serde::{Deserialize, Serialize};

/// A named bit vector owned by exactly one module.
///
/// A wire is referenced by cell connections and by [`Bit::Wire`](crate::signal::Bit::Wire)
/// as `(WireId, bit index)` pairs, never by pointer — this is the ownership
/// discipline the whole IR is built on.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Wire {
    /// The unique ID of this wire within its module.
    pub id: WireId,
    /// The wire name. User-visible names come from the front-end; passes
    /// that synthesize fresh wires (e.g. `loom_shadow_<memid>_ren`) use a
    /// generated name guaranteed unique within the module.
    pub name: Ident,
    /// The bit width. Always at least 1.
    pub width: u32,
    /// Whether this wire backs an input port of the enclosing module.
    pub port_input: bool,
    /// Whether this wire backs an output port of the enclosing module.
    pub port_output: bool,
    /// String and bool attributes (`hdlname`, `loom_reset_value`,
    /// `loom_enum_members`, …).
    pub attrs: Attrs,
}

impl Wire {
    /// Creates a new internal (non-port) wire of the given width.
    pub fn new(id: WireId, name: Ident, width: u32) -> Self {
        Self {
            id,
            name,
            width,
            port_input: false,
            port_output: false,
            attrs: Attrs::new(),
        }
    }

    /// Returns `true` if this wire backs a module port in either direction.
    pub fn is_port(&self) -> bool {
        self.port_input || self.port_output
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn internal_wire_is_not_a_port() {
        let w = Wire::new(WireId::from_raw(0), Ident::from_raw(1), 8);
        assert!(!w.is_port());
        assert_eq!(w.width, 8);
    }

    #[test]
    fn port_wire() {
        let mut w = Wire::new(WireId::from_raw(0), Ident::from_raw(1), 1);
        w.port_output = true;
        assert!(w.is_port());
    }

    #[test]
    fn hdlname_attribute() {
        let mut w = Wire::new(WireId::from_raw(0), Ident::from_raw(1), 32);
        w.attrs.set_string("hdlname", "top.mem.q");
        assert_eq!(w.attrs.get_string("hdlname"), Some("top.mem.q"));
    }
}

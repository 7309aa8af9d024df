//! Re-canonicalizes a module's ordered port list from wire flags.
//!
//! Every pass that flips a wire's `port_input`/`port_output` flag calls
//! this afterward, per the invariant in `spec.md` §3: "Port lists are
//! re-canonicalized (`fixup_ports`) after any change to port flags."

use loom_ir::{Module, Port, PortDirection, PortId};

/// Rebuilds `module.ports` from the `port_input`/`port_output` flags of
/// `module.wires`, in wire allocation order (inputs before outputs for a
/// wire that is, unusually, flagged both ways).
pub fn fixup_ports(module: &mut Module) {
    let mut ports = Vec::new();
    let mut next_id = 0u32;
    for (wire_id, wire) in module.wires.iter() {
        if wire.port_input {
            ports.push(Port {
                id: PortId::from_raw(next_id),
                name: wire.name,
                direction: PortDirection::Input,
                wire: wire_id,
            });
            next_id += 1;
        }
        if wire.port_output {
            ports.push(Port {
                id: PortId::from_raw(next_id),
                name: wire.name,
                direction: PortDirection::Output,
                wire: wire_id,
            });
            next_id += 1;
        }
    }
    module.ports = ports;
}

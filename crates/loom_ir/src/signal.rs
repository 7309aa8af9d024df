//! Bit-level signal values connected to cell and port maps.
//!
//! A [`Signal`] is an ordered sequence of [`Bit`]s; each bit is either a
//! compile-time constant or a reference to one bit of one wire. There is no
//! expression tree here — by the time a netlist reaches this IR, every
//! value has already been elaborated down to individual bit connections.

use crate::ids::WireId;
use loom_common::Logic;
use serde::{Deserialize, Serialize};

/// A single bit of a [`Signal`]: either a constant or one bit of a wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Bit {
    /// A compile-time constant bit (`0`, `1`, `x`, or `z`).
    Const(Logic),
    /// Bit `index` of wire `wire`.
    Wire {
        /// The wire this bit reads or drives.
        wire: WireId,
        /// The bit index within that wire, 0 being the LSB.
        index: u32,
    },
}

impl Bit {
    /// Builds a reference to bit `index` of `wire`.
    pub fn wire(wire: WireId, index: u32) -> Self {
        Bit::Wire { wire, index }
    }

    /// Returns the wire this bit references, if it is not a constant.
    pub fn wire_id(&self) -> Option<WireId> {
        match self {
            Bit::Wire { wire, .. } => Some(*wire),
            Bit::Const(_) => None,
        }
    }
}

/// An ordered sequence of bits connected to a cell port or module wire.
///
/// Index 0 is the LSB. A `Signal` is a value type: it is freely constructed,
/// sliced, and concatenated by passes without touching the wires it
/// references.
pub type Signal = Vec<Bit>;

/// Builds a `Signal` of all-constant bits from a [`Logic`] value repeated or
/// individually supplied. Used for tying off unused DUT inputs to zero
/// (`emu_top`) and for representing immediate cell parameters.
pub fn constant_signal(bits: impl IntoIterator<Item = Logic>) -> Signal {
    bits.into_iter().map(Bit::Const).collect()
}

/// Builds a `Signal` referencing the low `width` bits of a wire, in order.
pub fn wire_signal(wire: WireId, width: u32) -> Signal {
    (0..width).map(|index| Bit::wire(wire, index)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wire_signal_is_in_order() {
        let sig = wire_signal(WireId::from_raw(0), 4);
        assert_eq!(sig.len(), 4);
        for (i, bit) in sig.iter().enumerate() {
            assert_eq!(*bit, Bit::wire(WireId::from_raw(0), i as u32));
        }
    }

    #[test]
    fn constant_signal_from_logic() {
        let sig = constant_signal([Logic::Zero, Logic::One, Logic::X]);
        assert_eq!(sig, vec![Bit::Const(Logic::Zero), Bit::Const(Logic::One), Bit::Const(Logic::X)]);
    }

    #[test]
    fn bit_wire_id() {
        let b = Bit::wire(WireId::from_raw(2), 3);
        assert_eq!(b.wire_id(), Some(WireId::from_raw(2)));
        assert_eq!(Bit::Const(Logic::Zero).wire_id(), None);
    }

    #[test]
    fn serde_roundtrip() {
        let sig = wire_signal(WireId::from_raw(1), 2);
        let json = serde_json::to_string(&sig).unwrap();
        let restored: Signal = serde_json::from_str(&json).unwrap();
        assert_eq!(restored, sig);
    }
}

//! The framed UNIX-domain-socket wire protocol (`spec.md` §6.2):
//! little-endian, fixed 12-byte messages in both directions.

use crate::error::RuntimeError;

/// Host → simulation request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Request {
    /// Read the 32-bit register at `offset`.
    Read { offset: u32 },
    /// Write `wdata` to the 32-bit register at `offset`.
    Write { offset: u32, wdata: u32 },
}

impl Request {
    /// Packs this request into its 12-byte wire form.
    pub fn encode(self) -> [u8; 12] {
        let mut buf = [0u8; 12];
        let (ty, offset, wdata) = match self {
            Request::Read { offset } => (0u8, offset, 0u32),
            Request::Write { offset, wdata } => (1u8, offset, wdata),
        };
        buf[0] = ty;
        // bytes 1..4 are reserved, always zero.
        buf[4..8].copy_from_slice(&offset.to_le_bytes());
        buf[8..12].copy_from_slice(&wdata.to_le_bytes());
        buf
    }
}

/// Simulation → host response or asynchronous event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    /// Acknowledges a [`Request::Read`]; `rdata` is the register value.
    ReadAck { rdata: u32 },
    /// Acknowledges a [`Request::Write`].
    WriteAck,
    /// An interrupt edge; `irq` is the rising-edge bitmask of
    /// [`spec.md`] §6.1's two-bit IRQ bus (bit 0 = DPI pending, bit 1 =
    /// state-change), zero-extended to 32 bits.
    IrqEdge { irq: u32 },
    /// The simulation produced `$finish` and is closing the connection.
    ShutdownComplete,
}

impl Event {
    /// Parses a 12-byte frame into an [`Event`].
    pub fn decode(buf: &[u8; 12]) -> Result<Self, RuntimeError> {
        let rdata = u32::from_le_bytes(buf[4..8].try_into().unwrap());
        let irq = u32::from_le_bytes(buf[8..12].try_into().unwrap());
        match buf[0] {
            0 => Ok(Event::ReadAck { rdata }),
            1 => Ok(Event::WriteAck),
            2 => Ok(Event::IrqEdge { irq }),
            3 => Ok(Event::ShutdownComplete),
            other => Err(RuntimeError::Framing(format!("unknown event type byte {other}"))),
        }
    }
}

/// The fixed frame size both directions of this protocol use.
pub const FRAME_SIZE: usize = 12;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn read_request_encodes_type_zero() {
        let buf = Request::Read { offset: 0x100 }.encode();
        assert_eq!(buf[0], 0);
        assert_eq!(u32::from_le_bytes(buf[4..8].try_into().unwrap()), 0x100);
    }

    #[test]
    fn write_request_carries_wdata() {
        let buf = Request::Write { offset: 0x10, wdata: 0xdead_beef }.encode();
        assert_eq!(buf[0], 1);
        assert_eq!(u32::from_le_bytes(buf[8..12].try_into().unwrap()), 0xdead_beef);
    }

    #[test]
    fn decode_read_ack() {
        let mut buf = [0u8; 12];
        buf[0] = 0;
        buf[4..8].copy_from_slice(&42u32.to_le_bytes());
        assert_eq!(Event::decode(&buf).unwrap(), Event::ReadAck { rdata: 42 });
    }

    #[test]
    fn decode_irq_edge() {
        let mut buf = [0u8; 12];
        buf[0] = 2;
        buf[8..12].copy_from_slice(&0b11u32.to_le_bytes());
        assert_eq!(Event::decode(&buf).unwrap(), Event::IrqEdge { irq: 0b11 });
    }

    #[test]
    fn decode_rejects_unknown_type() {
        let buf = [9u8; 12];
        assert!(Event::decode(&buf).is_err());
    }
}

//! Instruction set and command frame encoding.
//!
//! A command frame is an opcode, optionally followed by a 16-bit big-endian
//! address and data bytes. Frames are built per operation and shifted out
//! within a single chip-select window by [`Bus`](crate::bus::Bus).

use bitflags::bitflags;
use core::fmt;
use core::iter;

/// An address didn't fit into the 16 address bits of a command frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InvalidAddress;

/// Instruction bytes understood by the EEPROM.
///
/// These come from the datasheet. Chip families using a different
/// instruction set can supply their own table via
/// [`Eeprom::with_opcodes`](crate::series95::Eeprom::with_opcodes).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Opcodes {
    /// Read data, sequentially across page boundaries.
    pub read: u8,
    /// Write up to one page of data.
    pub write: u8,
    /// Set the write enable latch.
    pub write_enable: u8,
    /// Read the 8-bit status register.
    pub read_status: u8,
}

impl Opcodes {
    /// Instruction set of the ST M95 family (and most other 95-series parts).
    pub const M95: Opcodes = Opcodes {
        read: 0x03,
        write: 0x02,
        write_enable: 0x06,
        read_status: 0x05,
    };

    /// `[READ, addr_hi, addr_lo]`
    pub fn encode_read(&self, addr: u32) -> Result<Frame<'static>, InvalidAddress> {
        Frame::addressed(self.read, addr, Payload::None)
    }

    /// `[WRITE, addr_hi, addr_lo, data...]`
    pub fn encode_write<'a>(&self, addr: u32, data: &'a [u8]) -> Result<Frame<'a>, InvalidAddress> {
        Frame::addressed(self.write, addr, Payload::Data(data))
    }

    /// `[WRITE, addr_hi, addr_lo, value, value, ...]` with `count` data bytes.
    pub fn encode_fill(
        &self,
        addr: u32,
        value: u8,
        count: usize,
    ) -> Result<Frame<'static>, InvalidAddress> {
        Frame::addressed(self.write, addr, Payload::Fill { value, count })
    }

    /// `[WREN]`
    pub fn encode_write_enable(&self) -> Frame<'static> {
        Frame::opcode(self.write_enable)
    }

    /// `[RDSR]`
    pub fn encode_read_status(&self) -> Frame<'static> {
        Frame::opcode(self.read_status)
    }
}

impl Default for Opcodes {
    fn default() -> Self {
        Opcodes::M95
    }
}

/// Splits `addr` into its high and low byte.
pub fn split_address(addr: u32) -> Result<[u8; 2], InvalidAddress> {
    if addr > 0xFFFF {
        return Err(InvalidAddress);
    }
    Ok([(addr >> 8) as u8, (addr & 0xFF) as u8])
}

/// Data following the header of a command frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Payload<'a> {
    None,
    Data(&'a [u8]),
    /// `count` copies of `value`.
    Fill { value: u8, count: usize },
}

impl Payload<'_> {
    pub fn len(&self) -> usize {
        match *self {
            Payload::None => 0,
            Payload::Data(data) => data.len(),
            Payload::Fill { count, .. } => count,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A single instruction sent to the device.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct Frame<'a> {
    header: [u8; 3],
    header_len: usize,
    payload: Payload<'a>,
}

impl<'a> Frame<'a> {
    fn opcode(opcode: u8) -> Self {
        Self {
            header: [opcode, 0, 0],
            header_len: 1,
            payload: Payload::None,
        }
    }

    fn addressed(opcode: u8, addr: u32, payload: Payload<'a>) -> Result<Self, InvalidAddress> {
        let [hi, lo] = split_address(addr)?;
        Ok(Self {
            header: [opcode, hi, lo],
            header_len: 3,
            payload,
        })
    }

    /// The opcode and address bytes.
    pub fn header(&self) -> &[u8] {
        &self.header[..self.header_len]
    }

    pub fn payload(&self) -> Payload<'a> {
        self.payload
    }

    /// Total number of bytes shifted out for this frame.
    pub fn len(&self) -> usize {
        self.header_len + self.payload.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Iterates over every byte of the frame in transmission order.
    pub fn bytes(&self) -> impl Iterator<Item = u8> + 'a {
        let header = self.header;
        let header_len = self.header_len;
        let data: &'a [u8] = match self.payload {
            Payload::Data(data) => data,
            _ => &[],
        };
        let fill = match self.payload {
            Payload::Fill { value, count } => iter::repeat(value).take(count),
            _ => iter::repeat(0).take(0),
        };
        (0..header_len)
            .map(move |i| header[i])
            .chain(data.iter().copied())
            .chain(fill)
    }
}

impl fmt::Debug for Frame<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut s = f.debug_struct("Frame");
        s.field("header", &HexSlice(self.header()));
        match self.payload {
            Payload::None => {}
            Payload::Data(data) => {
                s.field("data", &HexSlice(data));
            }
            Payload::Fill { value, count } => {
                s.field("fill", &value).field("count", &count);
            }
        }
        s.finish()
    }
}

/// Formats bytes as a list of two-digit hex values.
pub(crate) struct HexSlice<T>(pub T)
where
    T: AsRef<[u8]>;

impl<T: AsRef<[u8]>> fmt::Debug for HexSlice<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[")?;
        for (i, byte) in self.0.as_ref().iter().enumerate() {
            if i != 0 {
                f.write_str(", ")?;
            }
            write!(f, "{:02x}", byte)?;
        }
        f.write_str("]")
    }
}

bitflags! {
    /// Status register bits.
    pub struct Status: u8 {
        /// **W**rite **I**n **P**rogress.
        const WIP = 1 << 0;
        /// Status of the **W**rite **E**nable **L**atch.
        const WEL = 1 << 1;
        /// The 2 block protection bits.
        const PROT = 0b0000_1100;
        /// **S**tatus **R**egister **W**rite **D**isable bit.
        const SRWD = 1 << 7;
    }
}

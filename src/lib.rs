//! An [`embedded-hal`]-based driver for 95-series SPI EEPROM chips.
//!
//! The driver speaks the common 95-series instruction set (READ, WRITE,
//! WREN, RDSR) with 16-bit addresses, as used by the ST M95xxx parts and many
//! compatibles. It handles write enabling, page boundaries and write cycle
//! timing, and can fill the whole array or dump it as text.
//!
//! ```no_run
//! # fn example<SPI, CS, D>(spi: SPI, cs: CS, delay: D) -> Result<(), spi_eeprom::Error<SPI, CS>>
//! # where
//! #     SPI: embedded_hal::blocking::spi::Transfer<u8>,
//! #     CS: embedded_hal::digital::v2::OutputPin,
//! #     D: embedded_hal::blocking::delay::DelayMs<u32>,
//! # {
//! use spi_eeprom::prelude::*;
//! use spi_eeprom::{series95::Eeprom, Geometry};
//!
//! let mut eeprom = Eeprom::init(spi, cs, delay, Geometry::M95640)?;
//! eeprom.write_page(0x0040, b"hello")?;
//!
//! let mut buf = [0; 5];
//! eeprom.read(0x0040, &mut buf)?;
//! # Ok(())
//! # }
//! ```
//!
//! [`embedded-hal`]: https://docs.rs/embedded-hal/

#![doc(html_root_url = "https://docs.rs/spi-eeprom/0.1.0")]
#![warn(missing_debug_implementations, rust_2018_idioms)]
#![cfg_attr(not(test), no_std)]

#[macro_use]
mod log;
mod bus;
pub mod command;
pub mod dump;
mod error;
mod geometry;
pub mod prelude;
pub mod readiness;
pub mod series95;
#[cfg(test)]
mod sim;

pub use crate::command::{Opcodes, Status};
pub use crate::error::Error;
pub use crate::geometry::Geometry;
pub use crate::readiness::Readiness;

use embedded_hal::blocking::spi::Transfer;
use embedded_hal::digital::v2::OutputPin;

/// A trait for reading operations from a memory chip.
pub trait Read<Addr, SPI: Transfer<u8>, CS: OutputPin> {
    /// Reads bytes from a memory chip.
    ///
    /// # Parameters
    /// * `addr`: The address to start reading at.
    /// * `buf`: The buffer to read `buf.len()` bytes into.
    fn read(&mut self, addr: Addr, buf: &mut [u8]) -> Result<(), Error<SPI, CS>>;
}

/// A trait for writing and erasing operations on a memory chip.
///
/// EEPROMs have no erase instruction; erasing means programming pages with
/// a fill value.
pub trait BlockDevice<Addr, SPI: Transfer<u8>, CS: OutputPin> {
    /// Fills pages of the memory chip with `value`.
    ///
    /// # Parameters
    /// * `addr`: An address in the first page to fill. The lower bits are
    ///   ignored in order to make it fit a page boundary.
    /// * `amount`: The number of pages to fill.
    /// * `value`: The byte written to every location.
    fn erase(&mut self, addr: Addr, amount: usize, value: u8) -> Result<(), Error<SPI, CS>>;

    /// Fills the whole memory chip with `value`, one page at a time.
    ///
    /// Warning: This waits for a full write cycle per page. Check your
    /// device's datasheet for precise numbers.
    fn erase_all(&mut self, value: u8) -> Result<(), Error<SPI, CS>>;

    /// Writes bytes onto the memory chip, splitting them at page boundaries.
    ///
    /// # Parameters
    /// * `addr`: The address to write to.
    /// * `data`: The bytes to write to `addr`.
    fn write_bytes(&mut self, addr: Addr, data: &[u8]) -> Result<(), Error<SPI, CS>>;
}

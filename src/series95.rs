//! Driver for 95-series SPI EEPROM chips.

use crate::bus::Bus;
use crate::command::{Frame, HexSlice, Opcodes, Status};
use crate::dump::format_dump_at;
use crate::readiness::Readiness;
use crate::{BlockDevice, Error, Geometry, Read};
use core::convert::TryFrom;
use core::fmt;
use core::ops::Range;
use embedded_hal::blocking::delay::DelayMs;
use embedded_hal::blocking::spi::Transfer;
use embedded_hal::digital::v2::OutputPin;

/// Driver for 95-series SPI EEPROM chips.
///
/// # Type Parameters
///
/// * **`SPI`**: The SPI master to which the EEPROM is attached.
/// * **`CS`**: The **C**hip-**S**elect line attached to the `\S` pin of the
///   EEPROM.
/// * **`D`**: Delay provider used to wait for write cycles to complete.
#[derive(Debug)]
pub struct Eeprom<SPI: Transfer<u8>, CS: OutputPin, D> {
    bus: Bus<SPI, CS>,
    delay: D,
    geometry: Geometry,
    opcodes: Opcodes,
    readiness: Readiness,
}

impl<SPI: Transfer<u8>, CS: OutputPin, D: DelayMs<u32>> Eeprom<SPI, CS, D> {
    /// Creates a new 95-series EEPROM driver without talking to the device.
    ///
    /// The driver uses the M95 instruction set and waits a fixed 5 ms after
    /// every write. Use [`with_opcodes`](Self::with_opcodes) and
    /// [`with_readiness`](Self::with_readiness) to change that.
    ///
    /// # Parameters
    ///
    /// * **`spi`**: An SPI master. Must be configured to operate in the correct
    ///   mode for the device (mode 0 or 3, MSB first).
    /// * **`cs`**: The **C**hip-**S**elect Pin connected to the `\S` pin of
    ///   the EEPROM. Will be driven low when accessing the device, and should
    ///   already be high when passed in.
    /// * **`delay`**: A blocking millisecond delay.
    /// * **`geometry`**: Page size and page count of the memory array.
    pub fn new(spi: SPI, cs: CS, delay: D, geometry: Geometry) -> Self {
        Self {
            bus: Bus::new(spi, cs),
            delay,
            geometry,
            opcodes: Opcodes::default(),
            readiness: Readiness::default(),
        }
    }

    /// Creates a new driver and checks that the device is idle.
    ///
    /// Fails with [`Error::UnexpectedStatus`] if a write cycle is still in
    /// progress.
    pub fn init(spi: SPI, cs: CS, delay: D, geometry: Geometry) -> Result<Self, Error<SPI, CS>> {
        let mut this = Self::new(spi, cs, delay, geometry);
        let status = this.read_status()?;
        info!("Eeprom::init: status = {:?}", status);

        if status.contains(Status::WIP) {
            return Err(Error::UnexpectedStatus);
        }
        if status.contains(Status::WEL) {
            warn!("Eeprom::init: write enable latch is set");
        }

        Ok(this)
    }

    /// Replaces the instruction set.
    pub fn with_opcodes(mut self, opcodes: Opcodes) -> Self {
        self.opcodes = opcodes;
        self
    }

    /// Replaces the strategy used to wait for write cycles.
    pub fn with_readiness(mut self, readiness: Readiness) -> Self {
        self.readiness = readiness;
        self
    }

    pub fn geometry(&self) -> Geometry {
        self.geometry
    }

    pub fn opcodes(&self) -> Opcodes {
        self.opcodes
    }

    pub fn readiness(&self) -> Readiness {
        self.readiness
    }

    /// Returns the SPI, chip select and delay objects so they can be used
    /// elsewhere.
    pub fn free(self) -> (SPI, CS, D) {
        let (spi, cs) = self.bus.free();
        (spi, cs, self.delay)
    }

    /// Reads the status register.
    pub fn read_status(&mut self) -> Result<Status, Error<SPI, CS>> {
        let mut buf = [0];
        self.bus
            .transact(&self.opcodes.encode_read_status(), &mut buf)?;
        Ok(Status::from_bits_truncate(buf[0]))
    }

    /// Returns `true` when no write cycle is in progress.
    pub fn is_ready(&mut self) -> Result<bool, Error<SPI, CS>> {
        Ok(!self.read_status()?.contains(Status::WIP))
    }

    /// Writes a single byte.
    pub fn write_byte(&mut self, addr: u32, value: u8) -> Result<(), Error<SPI, CS>> {
        self.geometry.span(addr, 1).ok_or(Error::OutOfRange)?;
        let data = [value];
        let frame = self.opcodes.encode_write(addr, &data)?;
        self.program(&frame)
    }

    /// Writes up to one page of data with a single WRITE instruction.
    ///
    /// `addr..addr + data.len()` must lie within one page. The device would
    /// otherwise wrap around to the start of the page, so such writes are
    /// rejected with [`Error::PageBoundaryViolation`] before anything is sent.
    /// Use [`BlockDevice::write_bytes`] to write across pages.
    pub fn write_page(&mut self, addr: u32, data: &[u8]) -> Result<(), Error<SPI, CS>> {
        self.geometry
            .span(addr, data.len())
            .ok_or(Error::OutOfRange)?;
        if !self.geometry.within_page(addr, data.len()) {
            return Err(Error::PageBoundaryViolation);
        }
        if data.is_empty() {
            return Ok(());
        }
        let frame = self.opcodes.encode_write(addr, data)?;
        self.program(&frame)
    }

    /// Fills every page in `pages` with `value`, in ascending order.
    ///
    /// Each page is programmed with one page write, followed by a full write
    /// cycle wait.
    pub fn erase_pages(&mut self, pages: Range<u32>, value: u8) -> Result<(), Error<SPI, CS>> {
        if pages.end > self.geometry.page_count() {
            return Err(Error::OutOfRange);
        }
        if pages.start >= pages.end {
            return Ok(());
        }

        info!(
            "filling pages {}..{} with 0x{:02x}",
            pages.start, pages.end, value
        );
        let page_size = self.geometry.page_size() as usize;
        for page in pages {
            let addr = self.geometry.page_base(page);
            let frame = self.opcodes.encode_fill(addr, value, page_size)?;
            self.program(&frame)?;
        }
        Ok(())
    }

    /// Reads `buf.len()` bytes starting at `addr` with a single READ
    /// instruction.
    ///
    /// Reads continue across page boundaries, so no chunking is needed.
    pub fn dump_range(&mut self, addr: u32, buf: &mut [u8]) -> Result<(), Error<SPI, CS>> {
        self.read(addr, buf)
    }

    /// Reads `buf.len()` bytes starting at `addr` and appends them to `sink`,
    /// one line per page (see [`dump`](crate::dump)).
    pub fn dump<W: fmt::Write>(
        &mut self,
        sink: &mut W,
        addr: u32,
        buf: &mut [u8],
    ) -> Result<(), Error<SPI, CS>> {
        self.dump_range(addr, buf)?;
        format_dump_at(sink, addr, buf, self.geometry.page_size() as usize)
            .map_err(|_| Error::Io)
    }

    fn write_enable(&mut self) -> Result<(), Error<SPI, CS>> {
        self.bus
            .transact(&self.opcodes.encode_write_enable(), &mut [])
    }

    /// Sends a WRITE frame and waits for the resulting write cycle.
    fn program(&mut self, frame: &Frame<'_>) -> Result<(), Error<SPI, CS>> {
        debug!("program {:?}", frame);
        self.write_enable()?;
        self.bus.transact(frame, &mut [])?;
        self.wait_done()
    }

    fn wait_done(&mut self) -> Result<(), Error<SPI, CS>> {
        match self.readiness {
            Readiness::FixedDelay { ms } => {
                self.delay.delay_ms(ms);
                Ok(())
            }
            Readiness::PollStatus {
                max_retries,
                interval_ms,
            } => {
                let polls = max_retries.max(1);
                for poll in 0..polls {
                    if self.is_ready()? {
                        return Ok(());
                    }
                    if poll + 1 < polls {
                        self.delay.delay_ms(interval_ms);
                    }
                }
                warn!("write cycle still in progress after {} polls", polls);
                Err(Error::DeviceNotReady)
            }
        }
    }
}

impl<SPI: Transfer<u8>, CS: OutputPin, D: DelayMs<u32>> Read<u32, SPI, CS> for Eeprom<SPI, CS, D> {
    /// Reads EEPROM contents into `buf`, starting at `addr`.
    ///
    /// The whole range must lie inside the memory array. Unlike flash chips
    /// the addresses are not mirrored; out-of-range accesses fail with
    /// [`Error::OutOfRange`] without touching the bus.
    ///
    /// # Parameters
    ///
    /// * `addr`: 16-bit address to start reading at.
    /// * `buf`: Destination buffer to fill.
    fn read(&mut self, addr: u32, buf: &mut [u8]) -> Result<(), Error<SPI, CS>> {
        self.geometry
            .span(addr, buf.len())
            .ok_or(Error::OutOfRange)?;
        if buf.is_empty() {
            return Ok(());
        }

        let frame = self.opcodes.encode_read(addr)?;
        self.bus.transact(&frame, buf)?;
        debug!("read 0x{:04x}: {:?}", addr, HexSlice(&*buf));
        Ok(())
    }
}

impl<SPI: Transfer<u8>, CS: OutputPin, D: DelayMs<u32>> BlockDevice<u32, SPI, CS>
    for Eeprom<SPI, CS, D>
{
    fn erase(&mut self, addr: u32, amount: usize, value: u8) -> Result<(), Error<SPI, CS>> {
        self.geometry.span(addr, 0).ok_or(Error::OutOfRange)?;
        let first = self.geometry.page_of(addr);
        let end = u32::try_from(amount)
            .ok()
            .and_then(|amount| amount.checked_add(first))
            .ok_or(Error::OutOfRange)?;
        self.erase_pages(first..end, value)
    }

    fn erase_all(&mut self, value: u8) -> Result<(), Error<SPI, CS>> {
        self.erase_pages(0..self.geometry.page_count(), value)
    }

    fn write_bytes(&mut self, addr: u32, data: &[u8]) -> Result<(), Error<SPI, CS>> {
        self.geometry
            .span(addr, data.len())
            .ok_or(Error::OutOfRange)?;

        let page_size = self.geometry.page_size();
        let mut addr = addr;
        let mut rest = data;
        while !rest.is_empty() {
            let room = (page_size - addr % page_size) as usize;
            let (chunk, tail) = rest.split_at(room.min(rest.len()));
            self.write_page(addr, chunk)?;
            addr += chunk.len() as u32;
            rest = tail;
        }
        Ok(())
    }
}

//! Chip-select gated SPI transactions.

use crate::command::{Frame, Payload};
use crate::Error;
use embedded_hal::blocking::spi::Transfer;
use embedded_hal::digital::v2::OutputPin;

/// Payload bytes are shifted out through a stack buffer of this size.
const SCRATCH: usize = 32;

/// The SPI master and the chip-select line of one device.
#[derive(Debug)]
pub(crate) struct Bus<SPI: Transfer<u8>, CS: OutputPin> {
    spi: SPI,
    cs: CS,
}

impl<SPI: Transfer<u8>, CS: OutputPin> Bus<SPI, CS> {
    pub(crate) fn new(spi: SPI, cs: CS) -> Self {
        Self { spi, cs }
    }

    pub(crate) fn free(self) -> (SPI, CS) {
        (self.spi, self.cs)
    }

    /// Runs one transaction: selects the chip, shifts out `frame`, clocks in
    /// `readback.len()` bytes and deselects the chip again.
    ///
    /// The chip is deselected even if a transfer fails.
    pub(crate) fn transact(
        &mut self,
        frame: &Frame<'_>,
        readback: &mut [u8],
    ) -> Result<(), Error<SPI, CS>> {
        self.cs.set_low().map_err(Error::Gpio)?;
        let mut spi_result = self.shift_out(frame);
        if spi_result.is_ok() && !readback.is_empty() {
            for byte in readback.iter_mut() {
                *byte = 0;
            }
            spi_result = self.spi.transfer(readback).map(|_| ());
        }
        self.cs.set_high().map_err(Error::Gpio)?;
        spi_result.map_err(Error::Spi)
    }

    fn shift_out(&mut self, frame: &Frame<'_>) -> Result<(), SPI::Error> {
        let mut header = [0; 3];
        let header_len = frame.header().len();
        header[..header_len].copy_from_slice(frame.header());
        self.spi.transfer(&mut header[..header_len])?;

        let mut scratch = [0; SCRATCH];
        match frame.payload() {
            Payload::None => {}
            Payload::Data(data) => {
                for chunk in data.chunks(SCRATCH) {
                    let buf = &mut scratch[..chunk.len()];
                    buf.copy_from_slice(chunk);
                    self.spi.transfer(buf)?;
                }
            }
            Payload::Fill { value, count } => {
                let mut remaining = count;
                while remaining > 0 {
                    let n = remaining.min(SCRATCH);
                    let buf = &mut scratch[..n];
                    for byte in buf.iter_mut() {
                        *byte = value;
                    }
                    self.spi.transfer(buf)?;
                    remaining -= n;
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::Opcodes;
    use crate::sim::SimEeprom;
    use crate::Geometry;
    use embedded_hal_mock::pin::{Mock as PinMock, State as PinState, Transaction as PinTransaction};
    use embedded_hal_mock::spi::{Mock as SpiMock, Transaction as SpiTransaction};

    fn select_once() -> Vec<PinTransaction> {
        vec![
            PinTransaction::set(PinState::Low),
            PinTransaction::set(PinState::High),
        ]
    }

    #[test]
    fn header_then_readback_in_one_window() {
        let spi = SpiMock::new(&[
            SpiTransaction::transfer(vec![0x03, 0x00, 0x10], vec![0xFF, 0xFF, 0xFF]),
            SpiTransaction::transfer(vec![0, 0], vec![0xAB, 0xCD]),
        ]);
        let cs = PinMock::new(&select_once());
        let mut bus = Bus::new(spi, cs);

        let mut buf = [0x55; 2];
        bus.transact(&Opcodes::M95.encode_read(0x10).unwrap(), &mut buf)
            .unwrap();
        assert_eq!(buf, [0xAB, 0xCD]);

        let (mut spi, mut cs) = bus.free();
        spi.done();
        cs.done();
    }

    #[test]
    fn long_payload_is_chunked_within_one_window() {
        let data: Vec<u8> = (0..40).collect();
        let spi = SpiMock::new(&[
            SpiTransaction::transfer(vec![0x02, 0x00, 0x00], vec![0; 3]),
            SpiTransaction::transfer(data[..32].to_vec(), vec![0; 32]),
            SpiTransaction::transfer(data[32..].to_vec(), vec![0; 8]),
        ]);
        let cs = PinMock::new(&select_once());
        let mut bus = Bus::new(spi, cs);

        bus.transact(&Opcodes::M95.encode_write(0, &data).unwrap(), &mut [])
            .unwrap();

        let (mut spi, mut cs) = bus.free();
        spi.done();
        cs.done();
    }

    #[test]
    fn deselects_on_transfer_failure() {
        let sim = SimEeprom::new(Geometry::M95640);
        sim.fail_next_transfer();
        let mut bus = Bus::new(sim.spi(), sim.cs());

        let mut buf = [0; 4];
        let result = bus.transact(&Opcodes::M95.encode_read(0).unwrap(), &mut buf);
        assert!(matches!(result, Err(Error::Spi(_))));
        assert_eq!(sim.selects(), 1);
        assert_eq!(sim.releases(), 1);
        assert!(!sim.is_selected());
    }
}

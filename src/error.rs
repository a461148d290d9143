use core::fmt::{self, Debug, Display};
use embedded_hal::blocking::spi::Transfer;
use embedded_hal::digital::v2::OutputPin;

use crate::command::InvalidAddress;

mod private {
    #[derive(Debug)]
    pub enum Private {}
}

/// The error type used by this library.
///
/// This can encapsulate an SPI or GPIO error, and adds its own protocol errors
/// on top of that.
pub enum Error<SPI: Transfer<u8>, CS: OutputPin> {
    /// An SPI transfer failed.
    Spi(SPI::Error),

    /// A GPIO could not be set.
    Gpio(CS::Error),

    /// The address, or the address plus the length of the access, lies
    /// outside of the device's memory array.
    ///
    /// Nothing was sent to the device.
    OutOfRange,

    /// The address does not fit into the 16 address bits of a command frame.
    InvalidAddress,

    /// A page write would cross a physical page boundary, or is longer than a
    /// page.
    ///
    /// The device would wrap around within the page and overwrite data at the
    /// start of it, so the write is rejected before anything is sent.
    PageBoundaryViolation,

    /// The write-in-progress bit did not clear within the polling budget.
    DeviceNotReady,

    /// Status register contained unexpected flags.
    ///
    /// This can happen when the chip is faulty, incorrectly connected, or the
    /// driver wasn't constructed or destructed properly (eg. while there is
    /// still a write in progress).
    UnexpectedStatus,

    /// The dump sink refused to accept data.
    Io,

    #[doc(hidden)]
    __NonExhaustive(private::Private),
}

impl<SPI: Transfer<u8>, CS: OutputPin> From<InvalidAddress> for Error<SPI, CS> {
    fn from(_: InvalidAddress) -> Self {
        Error::InvalidAddress
    }
}

impl<SPI: Transfer<u8>, CS: OutputPin> Debug for Error<SPI, CS>
where
    SPI::Error: Debug,
    CS::Error: Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Spi(spi) => write!(f, "Error::Spi({:?})", spi),
            Error::Gpio(gpio) => write!(f, "Error::Gpio({:?})", gpio),
            Error::OutOfRange => f.write_str("Error::OutOfRange"),
            Error::InvalidAddress => f.write_str("Error::InvalidAddress"),
            Error::PageBoundaryViolation => f.write_str("Error::PageBoundaryViolation"),
            Error::DeviceNotReady => f.write_str("Error::DeviceNotReady"),
            Error::UnexpectedStatus => f.write_str("Error::UnexpectedStatus"),
            Error::Io => f.write_str("Error::Io"),
            Error::__NonExhaustive(_) => unreachable!(),
        }
    }
}

impl<SPI: Transfer<u8>, CS: OutputPin> Display for Error<SPI, CS>
where
    SPI::Error: Display,
    CS::Error: Display,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Spi(spi) => write!(f, "SPI error: {}", spi),
            Error::Gpio(gpio) => write!(f, "GPIO error: {}", gpio),
            Error::OutOfRange => f.write_str("address range exceeds the memory array"),
            Error::InvalidAddress => f.write_str("address does not fit into 16 bits"),
            Error::PageBoundaryViolation => f.write_str("page write crosses a page boundary"),
            Error::DeviceNotReady => f.write_str("device did not finish its write cycle"),
            Error::UnexpectedStatus => f.write_str("unexpected value in status register"),
            Error::Io => f.write_str("dump sink is not writable"),
            Error::__NonExhaustive(_) => unreachable!(),
        }
    }
}

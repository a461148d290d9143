//! Brings the crate's traits into scope.
//!
//! ```
//! use spi_eeprom::prelude::*;
//! ```

pub use crate::BlockDevice as _;
pub use crate::Read as _;

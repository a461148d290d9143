//! Text dumps of memory contents.
//!
//! Each page becomes one line: its address range followed by the decimal
//! value of every byte, all separated by `;`:
//!
//! ```text
//! 0 to 31;255;255;...;255;
//! 32 to 63;0;1;...;31;
//! ```

use core::fmt::{self, Write};

/// Appends `data` to `sink`, one line per `bytes_per_page` bytes.
///
/// Offsets are relative to the start of `data`. A trailing partial page is
/// written as a shorter line whose range ends at its last byte.
///
/// # Panics
///
/// This function will panic when `bytes_per_page` is 0.
pub fn format_dump<W: Write>(sink: &mut W, data: &[u8], bytes_per_page: usize) -> fmt::Result {
    format_dump_at(sink, 0, data, bytes_per_page)
}

/// Like [`format_dump`], but the first byte of `data` is labelled `base`.
pub fn format_dump_at<W: Write>(
    sink: &mut W,
    base: u32,
    data: &[u8],
    bytes_per_page: usize,
) -> fmt::Result {
    assert!(bytes_per_page > 0, "bytes_per_page must not be 0");

    for (i, chunk) in data.chunks(bytes_per_page).enumerate() {
        let start = base as usize + i * bytes_per_page;
        let end = start + chunk.len() - 1;
        write!(sink, "{} to {};", start, end)?;
        for byte in chunk {
            write!(sink, "{};", byte)?;
        }
        sink.write_char('\n')?;
    }
    Ok(())
}

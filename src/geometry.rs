//! Memory array layout of an EEPROM.

use core::convert::TryFrom;
use core::ops::Range;

/// Largest memory array reachable with 16 address bits.
const MAX_CAPACITY: u32 = 1 << 16;

/// Page size and page count of an EEPROM's memory array.
///
/// A page is the largest block of bytes the chip accepts in a single WRITE
/// command. Reads are not limited by it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Geometry {
    page_size: u32,
    page_count: u32,
}

impl Geometry {
    /// ST M95640: 64 Kbit, 256 pages of 32 bytes.
    pub const M95640: Geometry = Geometry {
        page_size: 32,
        page_count: 256,
    };

    /// ST M95256: 256 Kbit, 512 pages of 64 bytes.
    pub const M95256: Geometry = Geometry {
        page_size: 64,
        page_count: 512,
    };

    /// Creates a geometry from a page size in bytes and a number of pages.
    ///
    /// Returns `None` if either value is zero or if the resulting capacity
    /// can't be addressed with 16 bits.
    pub fn new(page_size: u32, page_count: u32) -> Option<Self> {
        if page_size == 0 || page_count == 0 {
            return None;
        }
        let capacity = page_size.checked_mul(page_count)?;
        if capacity > MAX_CAPACITY {
            return None;
        }
        Some(Self {
            page_size,
            page_count,
        })
    }

    pub fn page_size(&self) -> u32 {
        self.page_size
    }

    pub fn page_count(&self) -> u32 {
        self.page_count
    }

    /// Total size of the memory array in bytes.
    pub fn capacity(&self) -> u32 {
        self.page_size * self.page_count
    }

    /// Index of the page containing `addr`.
    pub fn page_of(&self, addr: u32) -> u32 {
        addr / self.page_size
    }

    /// Address of the first byte of page `page`.
    pub fn page_base(&self, page: u32) -> u32 {
        page * self.page_size
    }

    /// Returns the byte range `addr..addr + len` if it lies completely inside
    /// the memory array.
    ///
    /// `addr` itself must always be a valid address, even when `len` is zero.
    pub(crate) fn span(&self, addr: u32, len: usize) -> Option<Range<u32>> {
        if addr >= self.capacity() {
            return None;
        }
        let end = addr.checked_add(u32::try_from(len).ok()?)?;
        if end > self.capacity() {
            return None;
        }
        Some(addr..end)
    }

    /// Whether `addr..addr + len` fits into a single page.
    pub(crate) fn within_page(&self, addr: u32, len: usize) -> bool {
        if len == 0 {
            return true;
        }
        if len > self.page_size as usize {
            return false;
        }
        self.page_of(addr) == self.page_of(addr + len as u32 - 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn presets() {
        assert_eq!(Geometry::M95640.capacity(), 8192);
        assert_eq!(Geometry::M95256.capacity(), 32768);
        assert_eq!(Geometry::new(32, 256), Some(Geometry::M95640));
    }

    #[test]
    fn rejects_unaddressable() {
        assert_eq!(Geometry::new(0, 256), None);
        assert_eq!(Geometry::new(32, 0), None);
        assert_eq!(Geometry::new(256, 257), None);
        assert!(Geometry::new(256, 256).is_some());
    }

    #[test]
    fn span_checks() {
        let g = Geometry::M95640;
        assert_eq!(g.span(0, 8192), Some(0..8192));
        assert_eq!(g.span(8191, 1), Some(8191..8192));
        assert_eq!(g.span(8191, 2), None);
        assert_eq!(g.span(8192, 0), None);
        assert_eq!(g.span(10, 0), Some(10..10));
    }

    #[test]
    fn page_containment() {
        let g = Geometry::M95640;
        assert!(g.within_page(0, 32));
        assert!(g.within_page(40, 24));
        assert!(!g.within_page(40, 25));
        assert!(!g.within_page(0, 33));
        assert!(g.within_page(31, 1));
        assert!(!g.within_page(31, 2));
        assert_eq!(g.page_of(95), 2);
        assert_eq!(g.page_base(3), 96);
    }
}

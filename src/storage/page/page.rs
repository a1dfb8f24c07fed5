//! Page - the fundamental 4KB unit of storage.
//!
//! A [`Page`] is a raw byte buffer that serves as the unit of I/O between
//! disk and memory. Pages are held in frames inside the buffer pool; the
//! pool hands out borrows of them while a pin is outstanding.

use crate::common::config::PAGE_SIZE;

/// A page of data (4KB, 4KB-aligned).
///
/// Alignment matches the OS page size so the buffer is usable with Direct
/// I/O. The byte content is opaque to this layer; access methods above the
/// buffer pool impose their own layouts on it.
///
/// `Page` does not implement `Clone` outside of tests: copying 4KB should
/// be an explicit decision, not an accident of `.clone()`.
#[repr(align(4096))]
pub struct Page {
    data: [u8; PAGE_SIZE],
}

impl Page {
    /// Create a new zeroed page.
    #[inline]
    pub fn new() -> Self {
        Self {
            data: [0u8; PAGE_SIZE],
        }
    }

    /// Immutable view of the page bytes.
    #[inline]
    pub fn as_slice(&self) -> &[u8] {
        &self.data
    }

    /// Mutable view of the page bytes.
    #[inline]
    pub fn as_mut_slice(&mut self) -> &mut [u8] {
        &mut self.data
    }

    /// Zero out the entire page.
    pub fn reset(&mut self) {
        self.data.fill(0);
    }

    /// Size of a page in bytes.
    #[inline]
    pub const fn size() -> usize {
        PAGE_SIZE
    }
}

impl Default for Page {
    fn default() -> Self {
        Self::new()
    }
}

// Clone only available in tests - forces explicit copying in production.
#[cfg(test)]
impl Clone for Page {
    fn clone(&self) -> Self {
        let mut copy = Page::new();
        copy.data.copy_from_slice(&self.data);
        copy
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_size_and_alignment() {
        assert_eq!(std::mem::size_of::<Page>(), PAGE_SIZE);
        assert_eq!(std::mem::align_of::<Page>(), 4096);
    }

    #[test]
    fn test_page_starts_zeroed() {
        let page = Page::new();
        assert!(page.as_slice().iter().all(|&b| b == 0));
    }

    #[test]
    fn test_page_read_write() {
        let mut page = Page::new();
        page.as_mut_slice()[0] = 0xFF;
        page.as_mut_slice()[4095] = 0xCD;

        assert_eq!(page.as_slice()[0], 0xFF);
        assert_eq!(page.as_slice()[4095], 0xCD);
    }

    #[test]
    fn test_page_reset() {
        let mut page = Page::new();
        page.as_mut_slice()[100] = 0xAB;

        page.reset();

        assert_eq!(page.as_slice()[100], 0);
    }

    #[test]
    fn test_clone_copies_bytes_independently() {
        let mut page = Page::new();
        page.as_mut_slice()[0] = 0xAB;

        let mut copy = page.clone();
        assert_eq!(copy.as_slice()[0], 0xAB);

        copy.as_mut_slice()[0] = 0xCD;
        assert_eq!(page.as_slice()[0], 0xAB);
        assert_eq!(copy.as_slice()[0], 0xCD);
    }
}

//! Frame - a slot in the buffer pool.
//!
//! A [`Frame`] holds one [`Page`] worth of bytes plus the metadata the pool
//! needs to manage it: which page is loaded, how many pins are outstanding,
//! and whether the bytes diverged from disk.

use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};

use parking_lot::{Mutex, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::common::PageId;
use crate::storage::page::Page;

/// A fixed slot of the buffer pool.
///
/// A frame is always in one of three states:
/// - *free*: no page loaded, index sits on the pool's free list
/// - *pinned*: holds a page with `pin_count > 0`; never evicted
/// - *unpinned-resident*: holds a page with `pin_count == 0`; evictable
///
/// All fields use interior mutability so the pool can hand out `&Frame`
/// freely: the page bytes sit behind an `RwLock`, the pin count and dirty
/// flag are atomics, and the page id has its own small mutex.
pub struct Frame {
    page: RwLock<Page>,

    /// Loaded page, or `None` while the frame is free.
    page_id: Mutex<Option<PageId>>,

    /// Outstanding borrows of this frame's page.
    pin_count: AtomicU32,

    /// Whether the page bytes changed since they were last on disk.
    is_dirty: AtomicBool,
}

impl Frame {
    /// Create an empty frame.
    pub fn new() -> Self {
        Self {
            page: RwLock::new(Page::new()),
            page_id: Mutex::new(None),
            pin_count: AtomicU32::new(0),
            is_dirty: AtomicBool::new(false),
        }
    }

    /// Shared access to the page bytes.
    #[inline]
    pub fn page(&self) -> RwLockReadGuard<'_, Page> {
        self.page.read()
    }

    /// Exclusive access to the page bytes.
    #[inline]
    pub fn page_mut(&self) -> RwLockWriteGuard<'_, Page> {
        self.page.write()
    }

    #[inline]
    pub fn page_id(&self) -> Option<PageId> {
        *self.page_id.lock()
    }

    #[inline]
    pub fn set_page_id(&self, page_id: Option<PageId>) {
        *self.page_id.lock() = page_id;
    }

    /// Increment the pin count, returning the new value.
    #[inline]
    pub fn pin(&self) -> u32 {
        self.pin_count.fetch_add(1, Ordering::Relaxed) + 1
    }

    /// Decrement the pin count, returning the new value.
    ///
    /// # Panics
    /// Panics if the pin count is already 0: every unpin must pair with a
    /// pin.
    #[inline]
    pub fn unpin(&self) -> u32 {
        let old = self.pin_count.fetch_sub(1, Ordering::Relaxed);
        assert!(old > 0, "pin count underflow");
        old - 1
    }

    #[inline]
    pub fn pin_count(&self) -> u32 {
        self.pin_count.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn is_pinned(&self) -> bool {
        self.pin_count() > 0
    }

    #[inline]
    pub fn mark_dirty(&self) {
        self.is_dirty.store(true, Ordering::Relaxed);
    }

    #[inline]
    pub fn clear_dirty(&self) {
        self.is_dirty.store(false, Ordering::Relaxed);
    }

    #[inline]
    pub fn is_dirty(&self) -> bool {
        self.is_dirty.load(Ordering::Relaxed)
    }

    /// Whether the frame holds no page.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.page_id().is_none()
    }

    /// Whether the replacer may hand this frame out as a victim.
    #[inline]
    pub fn is_evictable(&self) -> bool {
        self.page_id().is_some() && !self.is_pinned()
    }

    /// Return the frame to the free state: zeroed bytes, no page id, no
    /// pins, clean.
    pub fn reset(&self) {
        self.page_mut().reset();
        self.set_page_id(None);
        self.pin_count.store(0, Ordering::Relaxed);
        self.is_dirty.store(false, Ordering::Relaxed);
    }
}

impl Default for Frame {
    fn default() -> Self {
        Self::new()
    }
}

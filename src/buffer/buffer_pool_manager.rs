//! Buffer Pool Manager - the core page caching layer.
//!
//! The [`BufferPoolManager`] sits between a block-addressable database file
//! and the access methods above it:
//! - caches pages in a fixed set of frames
//! - reference-counts pins so resident pages cannot vanish under a caller
//! - writes dirty pages back before their frame is reused
//! - picks victims with an LRU-K replacer

use std::sync::atomic::{AtomicU32, Ordering};

use log::{debug, trace};
use parking_lot::Mutex;

use crate::buffer::replacer::LruKReplacer;
use crate::buffer::{BufferPoolStats, Frame, PageReadGuard, PageWriteGuard};
use crate::common::config::{DEFAULT_BUCKET_SIZE, DEFAULT_REPLACER_K};
use crate::common::{Error, FrameId, PageId, Result};
use crate::container::ExtendibleHashTable;
use crate::storage::DiskManager;

/// Manages a pool of buffer frames caching disk pages.
///
/// # Structure
/// - `frames` - fixed array of slots, allocated at startup
/// - `page_table` - extendible hash from `PageId` to `FrameId`
/// - `free_list` - indices of frames holding no page
/// - `replacer` - LRU-K ranking of evictable frames
/// - `disk` - the database file
///
/// # Locking
/// The free-list mutex doubles as the pool latch: every public operation
/// holds it while it touches the mappings, and the page table's and
/// replacer's own locks are only ever taken underneath it. Miss and
/// eviction I/O runs under the latch, which serializes it across threads
/// but keeps the residency invariants trivial; explicit flushes instead
/// pin the frame and release the latch around the write.
///
/// Page *bytes* are outside the latch. Each frame carries its own `RwLock`,
/// acquired by guards after the pool call returns, so readers and writers
/// of pinned pages proceed while the pool serves other requests.
///
/// # Usage
/// ```ignore
/// let dm = DiskManager::create("test.db")?;
/// let bpm = BufferPoolManager::new(64, 2, dm);
///
/// let mut guard = bpm.new_page()?;
/// let page_id = guard.page_id();
/// guard.as_mut_slice()[0] = 0xAB;
/// drop(guard); // unpins, marks dirty
///
/// let guard = bpm.fetch_page_read(page_id)?;
/// ```
pub struct BufferPoolManager {
    /// Fixed pool of frames.
    frames: Vec<Frame>,

    /// Maps resident page ids to frame indices.
    page_table: ExtendibleHashTable<PageId, FrameId>,

    /// Free frame indices. Its mutex is the pool latch.
    free_list: Mutex<Vec<FrameId>>,

    /// Eviction policy; locked only under the pool latch.
    replacer: Mutex<LruKReplacer>,

    /// Database file; locked only under the pool latch.
    disk: Mutex<DiskManager>,

    /// Next page id to hand out. Never recycled.
    next_page_id: AtomicU32,

    stats: BufferPoolStats,

    pool_size: usize,
}

impl BufferPoolManager {
    /// Bucket capacity of the page table.
    const PAGE_TABLE_BUCKET_SIZE: usize = DEFAULT_BUCKET_SIZE;

    /// Create a buffer pool of `pool_size` frames with the default LRU-K
    /// parameter ([`DEFAULT_REPLACER_K`]).
    ///
    /// # Panics
    /// Panics if `pool_size` is 0.
    pub fn with_default_k(pool_size: usize, disk_manager: DiskManager) -> Self {
        Self::new(pool_size, DEFAULT_REPLACER_K, disk_manager)
    }

    /// Create a buffer pool of `pool_size` frames with an LRU-K replacer
    /// of parameter `replacer_k`.
    ///
    /// # Panics
    /// Panics if `pool_size` is 0.
    pub fn new(pool_size: usize, replacer_k: usize, disk_manager: DiskManager) -> Self {
        assert!(pool_size > 0, "pool_size must be > 0");

        let frames: Vec<Frame> = (0..pool_size).map(|_| Frame::new()).collect();
        let free_list: Vec<FrameId> = (0..pool_size).map(FrameId::new).collect();

        Self {
            frames,
            page_table: ExtendibleHashTable::new(Self::PAGE_TABLE_BUCKET_SIZE),
            free_list: Mutex::new(free_list),
            replacer: Mutex::new(LruKReplacer::new(pool_size, replacer_k)),
            disk: Mutex::new(disk_manager),
            next_page_id: AtomicU32::new(0),
            stats: BufferPoolStats::new(),
            pool_size,
        }
    }

    // ========================================================================
    // Public API: create, fetch
    // ========================================================================

    /// Allocate a fresh page id and pin its zeroed page in a frame.
    ///
    /// # Errors
    /// - `Error::NoFreeFrames` if every frame is pinned
    /// - I/O errors from writing back the victim
    pub fn new_page(&self) -> Result<PageWriteGuard<'_>> {
        let (page_id, frame_id) = {
            let mut free_list = self.free_list.lock();

            let frame_id = self.take_frame(&mut free_list)?;
            let page_id = PageId::new(self.next_page_id.fetch_add(1, Ordering::Relaxed));
            if let Err(e) = self.install_page(page_id, frame_id) {
                free_list.push(frame_id);
                return Err(e);
            }
            (page_id, frame_id)
        };

        let lock = self.frames[frame_id.0].page_mut();
        Ok(PageWriteGuard::new(self, frame_id, page_id, lock))
    }

    /// Fetch a page for reading (shared access).
    ///
    /// # Errors
    /// - `Error::NoFreeFrames` if the page is absent and every frame is
    ///   pinned
    /// - I/O errors from the disk read or the victim write-back
    pub fn fetch_page_read(&self, page_id: PageId) -> Result<PageReadGuard<'_>> {
        let frame_id = self.fetch_frame(page_id)?;
        let lock = self.frames[frame_id.0].page();
        Ok(PageReadGuard::new(self, frame_id, page_id, lock))
    }

    /// Fetch a page for writing (exclusive access). The page is marked
    /// dirty when the guard is released.
    ///
    /// # Errors
    /// Same conditions as [`fetch_page_read`](Self::fetch_page_read).
    pub fn fetch_page_write(&self, page_id: PageId) -> Result<PageWriteGuard<'_>> {
        let frame_id = self.fetch_frame(page_id)?;
        let lock = self.frames[frame_id.0].page_mut();
        Ok(PageWriteGuard::new(self, frame_id, page_id, lock))
    }

    /// Option form of [`fetch_page_read`](Self::fetch_page_read): `None`
    /// when no frame can be made available.
    pub fn checked_read_page(&self, page_id: PageId) -> Option<PageReadGuard<'_>> {
        self.fetch_page_read(page_id).ok()
    }

    /// Option form of [`fetch_page_write`](Self::fetch_page_write).
    pub fn checked_write_page(&self, page_id: PageId) -> Option<PageWriteGuard<'_>> {
        self.fetch_page_write(page_id).ok()
    }

    // ========================================================================
    // Public API: unpin, flush, delete
    // ========================================================================

    /// Drop one pin on `page_id`, or-ing in `is_dirty`.
    ///
    /// The dirty bit is sticky: unpinning with `false` never cleans a page
    /// an earlier pin dirtied. Returns `false` if the page is not resident
    /// or has no outstanding pin.
    ///
    /// Guards call this on drop; the raw form exists for callers managing
    /// pins by hand.
    pub fn unpin_page(&self, page_id: PageId, is_dirty: bool) -> bool {
        let _latch = self.free_list.lock();

        let frame_id = match self.page_table.find(&page_id) {
            Some(fid) => fid,
            None => return false,
        };

        let frame = &self.frames[frame_id.0];
        if frame.pin_count() == 0 {
            return false;
        }

        if is_dirty {
            frame.mark_dirty();
        }
        if frame.unpin() == 0 {
            self.replacer.lock().set_evictable(frame_id, true);
        }
        true
    }

    /// Write `page_id`'s bytes to disk, dirty or not, and clear the dirty
    /// flag. Pins and evictability are unchanged once the call returns.
    ///
    /// Returns `Ok(false)` if the page is not resident.
    ///
    /// The frame is pinned for the duration of the write and the pool latch
    /// is released around the I/O. Holding the latch while waiting for the
    /// page lock would deadlock against a caller that holds a write guard
    /// and is fetching another page.
    pub fn flush_page(&self, page_id: PageId) -> Result<bool> {
        let frame_id = {
            let _latch = self.free_list.lock();
            match self.page_table.find(&page_id) {
                Some(fid) => {
                    self.frames[fid.0].pin();
                    self.replacer.lock().set_evictable(fid, false);
                    fid
                }
                None => return Ok(false),
            }
        };

        let result = self.flush_frame(frame_id, page_id);
        self.unpin_frame(frame_id, false);

        result.map(|_| true)
    }

    /// Flush every resident page. Each page is written unconditionally,
    /// dirty or not.
    pub fn flush_all_pages(&self) -> Result<()> {
        for i in 0..self.frames.len() {
            let frame_id = FrameId::new(i);

            // Same transit pin as flush_page, frame by frame.
            let page_id = {
                let _latch = self.free_list.lock();
                match self.frames[i].page_id() {
                    Some(pid) => {
                        self.frames[i].pin();
                        self.replacer.lock().set_evictable(frame_id, false);
                        pid
                    }
                    None => continue,
                }
            };

            let result = self.flush_frame(frame_id, page_id);
            self.unpin_frame(frame_id, false);
            result?;
        }
        Ok(())
    }

    /// Drop `page_id` from the pool and return its frame to the free list.
    ///
    /// Returns `Ok(true)` if the page is absent (nothing to do) or was
    /// deleted, `Ok(false)` if it is still pinned. Dirty bytes are written
    /// back first. The page id itself is not recycled.
    pub fn delete_page(&self, page_id: PageId) -> Result<bool> {
        let mut free_list = self.free_list.lock();

        let frame_id = match self.page_table.find(&page_id) {
            Some(fid) => fid,
            None => return Ok(true),
        };

        let frame = &self.frames[frame_id.0];
        if frame.is_pinned() {
            return Ok(false);
        }

        if frame.is_dirty() {
            self.flush_frame(frame_id, page_id)?;
        }

        frame.reset();
        self.page_table.remove(&page_id);
        self.replacer.lock().remove(frame_id);
        free_list.push(frame_id);

        Ok(true)
    }

    // ========================================================================
    // Public API: introspection
    // ========================================================================

    /// Pin count of `page_id`, or `None` if it is not resident.
    pub fn get_pin_count(&self, page_id: PageId) -> Option<u32> {
        let _latch = self.free_list.lock();
        let frame_id = self.page_table.find(&page_id)?;
        Some(self.frames[frame_id.0].pin_count())
    }

    /// Whether `page_id` is resident.
    pub fn contains_page(&self, page_id: PageId) -> bool {
        let _latch = self.free_list.lock();
        self.page_table.find(&page_id).is_some()
    }

    pub fn pool_size(&self) -> usize {
        self.pool_size
    }

    pub fn free_frame_count(&self) -> usize {
        self.free_list.lock().len()
    }

    /// Number of resident pages.
    pub fn page_count(&self) -> usize {
        self.page_table.len()
    }

    pub fn stats(&self) -> &BufferPoolStats {
        &self.stats
    }

    // ========================================================================
    // Internal: guard release
    // ========================================================================

    /// Unpin by frame index. Called by guards, which already resolved the
    /// page to its frame when they were created.
    pub(crate) fn unpin_frame(&self, frame_id: FrameId, is_dirty: bool) {
        let _latch = self.free_list.lock();

        let frame = &self.frames[frame_id.0];
        if is_dirty {
            frame.mark_dirty();
        }
        if frame.unpin() == 0 {
            self.replacer.lock().set_evictable(frame_id, true);
        }
    }

    // ========================================================================
    // Internal: fetch and victim selection
    // ========================================================================

    /// Resolve `page_id` to a pinned frame, loading from disk on a miss.
    fn fetch_frame(&self, page_id: PageId) -> Result<FrameId> {
        let mut free_list = self.free_list.lock();

        if let Some(frame_id) = self.page_table.find(&page_id) {
            self.frames[frame_id.0].pin();
            let mut replacer = self.replacer.lock();
            replacer.record_access(frame_id);
            replacer.set_evictable(frame_id, false);

            self.stats.cache_hits.fetch_add(1, Ordering::Relaxed);
            return Ok(frame_id);
        }

        self.stats.cache_misses.fetch_add(1, Ordering::Relaxed);

        let frame_id = self.take_frame(&mut free_list)?;

        // Fill the frame before it becomes visible in the page table. The
        // frame is unmapped and unpinned, so its page lock is uncontended.
        let read_result = {
            let mut page = self.frames[frame_id.0].page_mut();
            self.disk.lock().read_page(page_id, &mut page)
        };
        if let Err(e) = read_result {
            free_list.push(frame_id);
            return Err(e);
        }
        self.stats.pages_read.fetch_add(1, Ordering::Relaxed);

        if let Err(e) = self.install_page(page_id, frame_id) {
            free_list.push(frame_id);
            return Err(e);
        }
        Ok(frame_id)
    }

    /// Get an empty frame: pop the free list, else evict.
    ///
    /// Must be called with the pool latch held; `free_list` is the latched
    /// guard's contents.
    fn take_frame(&self, free_list: &mut Vec<FrameId>) -> Result<FrameId> {
        if let Some(frame_id) = free_list.pop() {
            return Ok(frame_id);
        }
        self.evict_frame()
    }

    /// Reclaim a frame through the replacer, writing back dirty bytes and
    /// unmapping the old page.
    fn evict_frame(&self) -> Result<FrameId> {
        let frame_id = self
            .replacer
            .lock()
            .evict()
            .ok_or(Error::NoFreeFrames)?;

        self.stats.evictions.fetch_add(1, Ordering::Relaxed);

        let frame = &self.frames[frame_id.0];
        if let Some(old_page_id) = frame.page_id() {
            if frame.is_dirty() {
                debug!("write-back of dirty {} on eviction", old_page_id);
                self.flush_frame(frame_id, old_page_id)?;
            }
            self.page_table.remove(&old_page_id);
            trace!("evicted {} from {}", old_page_id, frame_id);
        }

        frame.reset();
        Ok(frame_id)
    }

    /// Map `page_id` into `frame_id` with an initial pin.
    ///
    /// Must be called with the pool latch held and the frame unmapped.
    fn install_page(&self, page_id: PageId, frame_id: FrameId) -> Result<()> {
        self.page_table.insert(page_id, frame_id)?;

        let frame = &self.frames[frame_id.0];
        frame.set_page_id(Some(page_id));
        frame.pin();

        let mut replacer = self.replacer.lock();
        replacer.record_access(frame_id);
        replacer.set_evictable(frame_id, false);

        Ok(())
    }

    /// Write a frame's bytes out and clear its dirty flag.
    ///
    /// The frame's page lock is taken shared for the duration of the write.
    /// A caller holding the pool latch may only flush a frame with no
    /// outstanding pins; otherwise the transit-pin protocol of
    /// [`flush_page`](Self::flush_page) applies.
    fn flush_frame(&self, frame_id: FrameId, page_id: PageId) -> Result<()> {
        let frame = &self.frames[frame_id.0];

        {
            let page = frame.page();
            self.disk.lock().write_page(page_id, &page)?;
        }

        frame.clear_dirty();
        self.stats.pages_written.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }
}

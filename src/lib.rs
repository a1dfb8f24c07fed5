//! tidepool - the storage-engine core of a teaching relational database.
//!
//! Three components carry the weight here, and everything else serves them:
//!
//! - **[`BufferPoolManager`]** (`buffer/`) - a fixed pool of frames caching
//!   disk pages, with pin-based lifetimes, dirty write-back, and RAII page
//!   guards.
//! - **[`LruKReplacer`]** (`buffer/replacer/`) - the eviction policy:
//!   frames with fewer than K recorded accesses leave before frames with a
//!   real access history.
//! - **[`ExtendibleHashTable`]** (`container/`) - the page table mapping
//!   resident page ids to frame indices, with dynamic bucket splitting.
//!
//! ```text
//! callers ──► BufferPoolManager ──► page_table (ExtendibleHashTable)
//!                    │        └───► replacer   (LruKReplacer)
//!                    ▼
//!               DiskManager ──► single database file of 4KB pages
//! ```
//!
//! # Quick start
//! ```no_run
//! use tidepool::buffer::BufferPoolManager;
//! use tidepool::storage::DiskManager;
//!
//! let dm = DiskManager::create("my.db").unwrap();
//! let bpm = BufferPoolManager::new(64, 2, dm);
//!
//! let page_id = {
//!     let mut guard = bpm.new_page().unwrap();
//!     guard.as_mut_slice()[0] = 0xAB;
//!     guard.page_id()
//! }; // guard drops: page unpinned, marked dirty
//!
//! let guard = bpm.fetch_page_read(page_id).unwrap();
//! assert_eq!(guard.as_slice()[0], 0xAB);
//! ```

pub mod buffer;
pub mod common;
pub mod container;
pub mod storage;

// Re-export the items most callers touch.
pub use buffer::replacer::LruKReplacer;
pub use buffer::{BufferPoolManager, BufferPoolStats, Frame, PageReadGuard, PageWriteGuard};
pub use common::config::PAGE_SIZE;
pub use common::{Error, FrameId, PageId, Result};
pub use container::ExtendibleHashTable;
pub use storage::{DiskManager, Page};

//! Disk Manager - low-level file I/O for database pages.
//!
//! The [`DiskManager`] owns the database file and moves whole pages between
//! it and memory. It knows nothing about caching, pinning, or page
//! allocation; the buffer pool layers all of that on top.

use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::Path;

use log::warn;

use crate::common::config::PAGE_SIZE;
use crate::common::{PageId, Result};
use crate::storage::page::Page;

/// Manages disk I/O for a single database file.
///
/// # File Layout
/// Pages are laid out back to back; page `n` starts at byte offset
/// `n * PAGE_SIZE`. The file grows on demand: writing a page past the
/// current end extends the file.
///
/// # Thread Safety
/// `DiskManager` is single-threaded (`&mut self` everywhere). The buffer
/// pool serializes access to it behind a mutex.
pub struct DiskManager {
    file: File,
}

impl DiskManager {
    /// Create a new database file.
    ///
    /// # Errors
    /// Fails if the file already exists or cannot be created.
    pub fn create<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create_new(true)
            .open(path)?;

        Ok(Self { file })
    }

    /// Open an existing database file.
    ///
    /// # Errors
    /// Fails if the file doesn't exist or cannot be opened.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = OpenOptions::new().read(true).write(true).open(path)?;

        Ok(Self { file })
    }

    /// Open an existing database file, or create one if it doesn't exist.
    pub fn open_or_create<P: AsRef<Path>>(path: P) -> Result<Self> {
        if path.as_ref().exists() {
            Self::open(path)
        } else {
            Self::create(path)
        }
    }

    /// Read a page from disk into `page`.
    ///
    /// Reading a page the file does not cover yet yields zeroed bytes: the
    /// buffer pool allocates page ids from a counter, so a freshly
    /// allocated page may be fetched before its first write-back.
    pub fn read_page(&mut self, page_id: PageId, page: &mut Page) -> Result<()> {
        let offset = (page_id.0 as u64) * (PAGE_SIZE as u64);
        let file_len = self.file.metadata()?.len();
        let buf = page.as_mut_slice();

        if offset >= file_len {
            buf.fill(0);
            return Ok(());
        }

        self.file.seek(SeekFrom::Start(offset))?;
        let available = ((file_len - offset) as usize).min(PAGE_SIZE);
        self.file.read_exact(&mut buf[..available])?;

        if available < PAGE_SIZE {
            // Only reachable if the file was truncated mid-page externally.
            warn!(
                "short read of {}: {} of {} bytes present",
                page_id, available, PAGE_SIZE
            );
            buf[available..].fill(0);
        }

        Ok(())
    }

    /// Write a page to disk, extending the file if needed.
    ///
    /// The write is followed by `fsync` so that a completed call means the
    /// bytes are on stable storage.
    pub fn write_page(&mut self, page_id: PageId, page: &Page) -> Result<()> {
        let offset = (page_id.0 as u64) * (PAGE_SIZE as u64);
        self.file.seek(SeekFrom::Start(offset))?;
        self.file.write_all(page.as_slice())?;
        self.file.sync_all()?;

        Ok(())
    }

    /// Number of whole pages the file currently covers.
    pub fn page_count(&self) -> Result<u32> {
        let len = self.file.metadata()?.len();
        Ok((len / PAGE_SIZE as u64) as u32)
    }

    /// Current size of the database file in bytes.
    pub fn file_size(&self) -> Result<u64> {
        Ok(self.file.metadata()?.len())
    }
}

//! Error types for tidepool.

use std::fmt;

/// Convenient Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Every failure the storage core can surface as a value.
///
/// Absence conditions ("page not resident", "page still pinned") are not
/// errors here; the pool reports them through `bool`/`Option` returns.
/// Programmer errors such as an out-of-range frame index or a pin-count
/// underflow are panics, not variants.
#[derive(Debug)]
pub enum Error {
    /// I/O failure from the disk manager. Fatal at this layer: the frame
    /// involved is left in an undefined state and nothing is retried.
    Io(std::io::Error),

    /// Every frame is pinned; neither the free list nor the replacer can
    /// produce a victim.
    NoFreeFrames,

    /// An extendible-hash insert kept splitting until the directory depth
    /// hit the hash width. All colliding keys share every hash bit, so no
    /// split can separate them.
    CapacityExceeded,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Io(e) => write!(f, "I/O error: {}", e),
            Error::NoFreeFrames => write!(f, "no evictable frame in the buffer pool"),
            Error::CapacityExceeded => {
                write!(f, "extendible hash directory exhausted the hash width")
            }
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Io(err)
    }
}

//! # Medium interface
//!
//! A medium is fixed-length storage addressed by byte offset, e.g. a disk
//! image, a partition or a buffer in memory. [`BlockDevice`] abstracts
//! reading and writing such a medium; types implementing it are the
//! drivers a file system sits on.

use std::any::Any;
use std::io;

mod ram_disk;

pub use self::ram_disk::RamDisk;

/// Medium driver trait
pub trait BlockDevice: Send + Sync + Any {
    /// Fills `buf` with the bytes starting at `offset`.
    fn read_at(&self, offset: usize, buf: &mut [u8]) -> io::Result<()>;

    /// Stores `buf` starting at `offset`.
    fn write_at(&self, offset: usize, buf: &[u8]) -> io::Result<()>;

    /// Total length of the medium in bytes.
    fn len(&self) -> io::Result<usize>;

    fn is_empty(&self) -> io::Result<bool> {
        self.len().map(|len| len == 0)
    }
}

/// Rejects accesses that would run past the end of a medium of `len` bytes.
pub fn check_range(offset: usize, count: usize, len: usize) -> io::Result<()> {
    match offset.checked_add(count) {
        Some(end) if end <= len => Ok(()),
        _ => Err(io::Error::new(
            io::ErrorKind::UnexpectedEof,
            format!("access {offset}..+{count} past end of medium ({len} bytes)"),
        )),
    }
}

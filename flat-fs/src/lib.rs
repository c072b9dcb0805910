/* flat-fs, layered top-down */

// File-system engine: create, open, read, write and block allocation
mod fs;

// Block device layer: fixed-geometry regions over a raw medium
mod disk;

// On-disk data structures
mod layout;

// Disk geometry, fixed at format time
mod geometry;

mod error;

pub use self::{
    disk::Disk,
    error::{Error, Result},
    fs::{Descriptor, FileSystem},
    geometry::Geometry,
    layout::{FreeBlockBitmap, InodeRecord},
};

/// Longest file name in bytes.
pub const NAME_CAP: usize = 28;
/// Pointer value meaning "no block assigned".
pub const UNALLOCATED: i32 = -1;

//! # On-disk data structures
//!
//! flat-fs layout:
//! inode table | free-block bitmap | data blocks

mod bitmap;
pub use bitmap::FreeBlockBitmap;

mod inode;
pub use inode::InodeRecord;

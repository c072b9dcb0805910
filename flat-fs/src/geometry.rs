//! # Disk geometry
//!
//! The on-disk layout, from offset 0:
//! inode table | free-block bitmap | data blocks

use crate::NAME_CAP;
use crate::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Geometry {
    /// Capacity of the inode table
    pub inodes: usize,
    /// Number of data blocks
    pub blocks: usize,
    /// Bytes per data block
    pub block_size: usize,
    /// Block pointers per inode
    pub pointers: usize,
}

impl Default for Geometry {
    fn default() -> Self {
        Self {
            inodes: 64,
            blocks: 2048,
            block_size: 512,
            pointers: 13,
        }
    }
}

impl Geometry {
    pub fn validate(&self) -> Result<()> {
        let invalid = |reason: &str| Err(Error::InvalidGeometry(reason.to_owned()));

        if self.inodes == 0 || self.blocks == 0 || self.block_size == 0 || self.pointers == 0 {
            return invalid("every dimension must be non-zero");
        }
        if self.block_size % 4 != 0 {
            return invalid("block size must be a multiple of 4");
        }
        // pointers are stored as i32 with -1 reserved
        if i32::try_from(self.blocks).is_err() {
            return invalid("too many blocks for 32-bit pointers");
        }
        if self.total_len().is_none() {
            return invalid("disk size overflows");
        }

        Ok(())
    }

    /// Bytes of one inode record: name, size, pointers
    #[inline]
    pub fn inode_size(&self) -> usize {
        NAME_CAP + 4 + 4 * self.pointers
    }

    #[inline]
    pub fn bitmap_len(&self) -> usize {
        self.blocks.div_ceil(8)
    }

    /// Block indices an indirect block can hold
    #[inline]
    pub fn indirect_count(&self) -> usize {
        self.block_size / 4
    }

    /// Most data blocks one file can address once the last pointer
    /// becomes an indirect block
    #[inline]
    pub fn max_file_blocks(&self) -> usize {
        self.pointers - 1 + self.indirect_count()
    }

    #[inline]
    pub fn max_file_size(&self) -> usize {
        self.max_file_blocks() * self.block_size
    }

    #[inline]
    pub fn inode_offset(&self, index: usize) -> usize {
        index * self.inode_size()
    }

    #[inline]
    pub fn bitmap_offset(&self) -> usize {
        self.inodes * self.inode_size()
    }

    #[inline]
    pub fn data_offset(&self) -> usize {
        self.bitmap_offset() + self.bitmap_len()
    }

    #[inline]
    pub fn block_offset(&self, index: usize) -> usize {
        self.data_offset() + index * self.block_size
    }

    /// Bytes the medium must provide, or `None` on overflow.
    pub fn total_len(&self) -> Option<usize> {
        self.inodes
            .checked_mul(self.inode_size())?
            .checked_add(self.bitmap_len())?
            .checked_add(self.blocks.checked_mul(self.block_size)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn regions_are_contiguous() {
        let geometry = Geometry {
            inodes: 4,
            blocks: 10,
            block_size: 64,
            pointers: 3,
        };
        geometry.validate().unwrap();

        assert_eq!(geometry.inode_size(), 28 + 4 + 12);
        assert_eq!(geometry.bitmap_offset(), 4 * 44);
        assert_eq!(geometry.bitmap_len(), 2);
        assert_eq!(geometry.data_offset(), 4 * 44 + 2);
        assert_eq!(geometry.block_offset(9), 4 * 44 + 2 + 9 * 64);
        assert_eq!(geometry.total_len(), Some(4 * 44 + 2 + 10 * 64));
        assert_eq!(geometry.max_file_blocks(), 2 + 16);
    }

    #[test]
    fn rejects_bad_geometry() {
        let base = Geometry::default();
        assert!(Geometry { block_size: 510, ..base }.validate().is_err());
        assert!(Geometry { pointers: 0, ..base }.validate().is_err());
        assert!(Geometry { inodes: 0, ..base }.validate().is_err());
        assert!(base.validate().is_ok());
    }
}

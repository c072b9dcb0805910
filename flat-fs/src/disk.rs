//! # Block device layer
//!
//! Presents a raw medium as the three regions of the layout and moves
//! inode records, the bitmap and data blocks in and out of them.
//! Indices outside the geometry are caller bugs and panic.

use std::fmt;
use std::sync::Arc;

use block_dev::BlockDevice;
use log::info;

use crate::layout::{FreeBlockBitmap, InodeRecord};
use crate::{Error, Geometry, Result};

pub struct Disk {
    device: Arc<dyn BlockDevice>,
    geometry: Geometry,
}

impl Disk {
    /// Attaches to a medium that already holds a formatted layout.
    pub fn open(device: Arc<dyn BlockDevice>, geometry: Geometry) -> Result<Self> {
        geometry.validate()?;
        // validate() guarantees the total length exists
        let needed = geometry.total_len().unwrap_or(usize::MAX);
        let len = device.len()?;
        if len < needed {
            return Err(Error::InvalidGeometry(format!(
                "medium holds {len} bytes, layout needs {needed}"
            )));
        }

        Ok(Self { device, geometry })
    }

    /// Attaches to a medium and wipes it into an empty file system.
    pub fn format(device: Arc<dyn BlockDevice>, geometry: Geometry) -> Result<Self> {
        let disk = Self::open(device, geometry)?;
        disk.wipe()?;
        Ok(disk)
    }

    /// Every inode slot free, every bitmap bit clear, every block zero.
    pub fn wipe(&self) -> Result<()> {
        let geometry = &self.geometry;

        let free = InodeRecord::empty(geometry.pointers).encode();
        let table: Vec<u8> = free.iter().copied().cycle().take(free.len() * geometry.inodes).collect();
        self.device.write_at(0, &table)?;

        self.write_bitmap(&FreeBlockBitmap::new(geometry.blocks))?;

        let zero = vec![0; geometry.block_size];
        for block in 0..geometry.blocks {
            self.device.write_at(geometry.block_offset(block), &zero)?;
        }

        info!(
            "formatted {} inodes, {} blocks of {} bytes",
            geometry.inodes, geometry.blocks, geometry.block_size
        );
        Ok(())
    }

    #[inline]
    pub fn geometry(&self) -> &Geometry {
        &self.geometry
    }

    pub fn read_inode(&self, index: usize) -> Result<InodeRecord> {
        self.check_inode(index);
        let mut buf = vec![0; self.geometry.inode_size()];
        self.device.read_at(self.geometry.inode_offset(index), &mut buf)?;
        Ok(InodeRecord::decode(&buf, self.geometry.pointers))
    }

    pub fn write_inode(&self, index: usize, inode: &InodeRecord) -> Result<()> {
        self.check_inode(index);
        assert_eq!(inode.pointers().len(), self.geometry.pointers);
        self.device
            .write_at(self.geometry.inode_offset(index), &inode.encode())?;
        Ok(())
    }

    /// Reads one whole data block.
    pub fn read_block(&self, index: usize) -> Result<Vec<u8>> {
        self.check_block(index);
        let mut buf = vec![0; self.geometry.block_size];
        self.device.read_at(self.geometry.block_offset(index), &mut buf)?;
        Ok(buf)
    }

    /// Writes one data block; a short `data` is zero padded to a full block.
    pub fn write_block(&self, index: usize, data: &[u8]) -> Result<()> {
        self.check_block(index);
        let block_size = self.geometry.block_size;
        assert!(data.len() <= block_size, "{} bytes do not fit one block", data.len());

        let mut buf = vec![0; block_size];
        buf[..data.len()].copy_from_slice(data);
        self.device.write_at(self.geometry.block_offset(index), &buf)?;
        Ok(())
    }

    pub fn read_bitmap(&self) -> Result<FreeBlockBitmap> {
        let mut buf = vec![0; self.geometry.bitmap_len()];
        self.device.read_at(self.geometry.bitmap_offset(), &mut buf)?;
        Ok(FreeBlockBitmap::from_bytes(self.geometry.blocks, &buf))
    }

    /// Rewrites the whole bitmap region.
    pub fn write_bitmap(&self, bitmap: &FreeBlockBitmap) -> Result<()> {
        assert_eq!(bitmap.len(), self.geometry.blocks);
        self.device
            .write_at(self.geometry.bitmap_offset(), bitmap.as_bytes())?;
        Ok(())
    }

    #[inline]
    fn check_inode(&self, index: usize) {
        assert!(
            index < self.geometry.inodes,
            "inode {index} out of range (table holds {})",
            self.geometry.inodes
        );
    }

    #[inline]
    fn check_block(&self, index: usize) {
        assert!(
            index < self.geometry.blocks,
            "block {index} out of range (disk holds {})",
            self.geometry.blocks
        );
    }
}

impl fmt::Debug for Disk {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Disk")
            .field("geometry", &self.geometry)
            .finish_non_exhaustive()
    }
}

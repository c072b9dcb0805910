//! # File-system engine
//!
//! Builds files out of the block device layer: a flat namespace of inode
//! slots, block allocation through the free-block bitmap, and an open-file
//! table holding in-memory inode copies until they are closed.
//!
//! Allocation works on a copy of the bitmap. The copy is written back only
//! once every block has been found, so a failed allocation leaves the
//! device untouched.

use std::collections::BTreeMap;
use std::sync::Arc;

use block_dev::BlockDevice;
use log::{debug, error, info, warn};

use crate::layout::{FreeBlockBitmap, InodeRecord};
use crate::{Disk, Error, Geometry, NAME_CAP, Result, UNALLOCATED};

/// Handle to a file, equal to its inode slot index.
pub type Descriptor = usize;

#[derive(Debug)]
pub struct FileSystem {
    disk: Disk,
    /// In-memory inode of every open file
    open_files: BTreeMap<Descriptor, InodeRecord>,
}

impl FileSystem {
    /// Formats `device` and builds an empty file system on it.
    pub fn format(device: Arc<dyn BlockDevice>, geometry: Geometry) -> Result<Self> {
        let disk = Disk::format(device, geometry)?;
        Ok(Self::with_disk(disk))
    }

    /// Attaches to a device formatted earlier with the same geometry.
    pub fn mount(device: Arc<dyn BlockDevice>, geometry: Geometry) -> Result<Self> {
        let disk = Disk::open(device, geometry)?;
        info!("mounted {} inodes, {} blocks", geometry.inodes, geometry.blocks);
        Ok(Self::with_disk(disk))
    }

    pub fn with_disk(disk: Disk) -> Self {
        Self {
            disk,
            open_files: BTreeMap::new(),
        }
    }

    #[inline]
    pub fn disk(&self) -> &Disk {
        &self.disk
    }

    #[inline]
    pub fn geometry(&self) -> &Geometry {
        self.disk.geometry()
    }

    #[inline]
    pub fn is_open(&self, fd: Descriptor) -> bool {
        self.open_files.contains_key(&fd)
    }

    /// Creates an empty file and opens it.
    ///
    /// The inode only reaches the device on [`close`](Self::close). Until
    /// then the name is invisible to other lookups, so a second `create`
    /// of the same name succeeds as well.
    pub fn create(&mut self, name: &str) -> Result<Descriptor> {
        if name.trim().is_empty() || name.len() > NAME_CAP || name.contains('\0') {
            return Err(Error::InvalidName(name.to_owned()));
        }

        let pointers = self.geometry().pointers;
        // the scan stops at the first usable slot; conflicts past it go unseen
        for index in 0..self.geometry().inodes {
            let inode = self.disk.read_inode(index)?;
            if inode.is_named(name) {
                return Err(Error::AlreadyExists(name.to_owned()));
            }
            if inode.is_free() && !self.open_files.contains_key(&index) {
                self.open_files.insert(index, InodeRecord::new(name, pointers));
                debug!("create {name:?} in slot {index}");
                return Ok(index);
            }
        }

        Err(Error::NoFreeInode)
    }

    /// Opens the file called `name`. Opening an open file hands back the
    /// same descriptor and keeps its in-memory state.
    pub fn open(&mut self, name: &str) -> Result<Descriptor> {
        let (index, inode) = self
            .find(name)?
            .ok_or_else(|| Error::NotFound(name.to_owned()))?;
        self.open_files.entry(index).or_insert(inode);
        Ok(index)
    }

    /// Commits the open file's inode to the device and forgets it.
    pub fn close(&mut self, fd: Descriptor) -> Result<()> {
        let inode = self
            .open_files
            .get(&fd)
            .ok_or(Error::DescriptorMismatch(fd))?;
        self.disk.write_inode(fd, inode)?;
        self.open_files.remove(&fd);
        Ok(())
    }

    /// Removes `name` and releases its blocks. Removing a missing file
    /// does nothing.
    pub fn delete(&mut self, name: &str) -> Result<()> {
        let Some((index, _)) = self.find(name)? else {
            return Ok(());
        };

        self.deallocate_blocks_for_file(index);
        self.disk
            .write_inode(index, &InodeRecord::empty(self.geometry().pointers))?;
        self.open_files.remove(&index);
        debug!("delete {name:?} from slot {index}");
        Ok(())
    }

    /// Reads the whole committed content of the file behind `fd`.
    ///
    /// Only direct pointers are followed.
    pub fn read(&self, fd: Descriptor) -> Result<Vec<u8>> {
        if fd >= self.geometry().inodes {
            return Err(Error::InvalidDescriptor(fd));
        }
        let inode = self.disk.read_inode(fd)?;
        if inode.is_free() {
            return Err(Error::InvalidDescriptor(fd));
        }

        let block_size = self.geometry().block_size;
        let size = inode.size() as usize;
        let full_blocks = size / block_size;
        let remainder = size % block_size;

        let mut content = Vec::with_capacity(size.min(inode.pointers().len() * block_size));
        for slot in 0..full_blocks {
            let block = self.direct_block(fd, &inode, slot)?;
            content.extend_from_slice(&self.disk.read_block(block)?);
        }
        if remainder > 0 {
            let block = self.direct_block(fd, &inode, full_blocks)?;
            content.extend_from_slice(&self.disk.read_block(block)?[..remainder]);
        }

        Ok(content)
    }

    /// Replaces the content of the open file `fd` with `data`.
    ///
    /// Only direct pointers are used, so `data` may span at most one block
    /// per pointer.
    pub fn write(&mut self, fd: Descriptor, data: &[u8]) -> Result<()> {
        let Some(mut inode) = self.open_files.get(&fd).cloned() else {
            return Err(Error::InvalidDescriptor(fd));
        };

        let geometry = *self.geometry();
        let blocks_needed = data.len().div_ceil(geometry.block_size);
        if blocks_needed > geometry.pointers {
            return Err(Error::FileTooLarge {
                blocks: blocks_needed,
                max: geometry.pointers,
            });
        }
        let size = u32::try_from(data.len()).map_err(|_| Error::FileTooLarge {
            blocks: blocks_needed,
            max: geometry.pointers,
        })?;

        let mut bitmap = self.disk.read_bitmap()?;
        let free = bitmap.count_free();
        if blocks_needed > free {
            return Err(Error::InsufficientSpace {
                needed: blocks_needed,
                free,
            });
        }

        // the old content goes away, so its blocks are up for reuse
        for &block in inode.pointers().iter().flatten() {
            if (block as usize) < bitmap.len() {
                bitmap.free(block as usize);
            }
        }
        inode.clear_pointers();

        let blocks: Vec<usize> = bitmap.free_blocks().take(blocks_needed).collect();
        let chunks = data.chunks(geometry.block_size);
        for (slot, (&block, chunk)) in blocks.iter().zip(chunks).enumerate() {
            bitmap.allocate(block);
            self.disk.write_block(block, chunk)?;
            inode.set_pointer(slot, Some(block as u32));
        }
        inode.set_size(size);

        self.disk.write_inode(fd, &inode)?;
        self.disk.write_bitmap(&bitmap)?;
        debug!("write {} bytes to inode {fd} over blocks {blocks:?}", data.len());

        self.open_files.insert(fd, inode);
        Ok(())
    }

    /// Allocates blocks for `num_bytes` bytes and records them in inode
    /// `index`, returning the data blocks in file order.
    ///
    /// When the file needs more blocks than it has pointers, one extra
    /// block becomes the indirect block: the last pointer names it, and it
    /// lists every data block past the other direct pointers.
    pub fn allocate_blocks_for_file(&mut self, index: usize, num_bytes: usize) -> Result<Vec<u32>> {
        let geometry = *self.geometry();
        let blocks_needed = num_bytes.div_ceil(geometry.block_size);
        if blocks_needed > geometry.max_file_blocks() {
            return Err(Error::FileTooLarge {
                blocks: blocks_needed,
                max: geometry.max_file_blocks(),
            });
        }

        let mut bitmap = self.disk.read_bitmap()?;
        let Some(blocks) = take_free_blocks(&mut bitmap, blocks_needed) else {
            // nothing was written, dropping the working copy is enough
            return Err(Error::InsufficientSpace {
                needed: blocks_needed,
                free: bitmap.count_free(),
            });
        };

        let mut inode = self.disk.read_inode(index)?;
        if blocks_needed <= geometry.pointers {
            for (slot, &block) in blocks.iter().enumerate() {
                inode.set_pointer(slot, Some(block));
            }
        } else {
            let indirect = bitmap.first_free().ok_or(Error::IndexAllocationFailure)?;
            bitmap.allocate(indirect);

            let last = geometry.pointers - 1;
            let (direct, rest) = blocks.split_at(last);
            for (slot, &block) in direct.iter().enumerate() {
                inode.set_pointer(slot, Some(block));
            }
            self.disk
                .write_block(indirect, &pack_indices(rest, geometry.indirect_count()))?;
            inode.set_pointer(last, Some(indirect as u32));
            debug!("inode {index} uses block {indirect} as indirect block");
        }

        self.disk.write_inode(index, &inode)?;
        self.disk.write_bitmap(&bitmap)?;
        debug!("allocate {blocks:?} to inode {index}");

        if let Some(open) = self.open_files.get_mut(&index) {
            for (slot, &pointer) in inode.pointers().iter().enumerate() {
                open.set_pointer(slot, pointer);
            }
        }
        Ok(blocks)
    }

    /// Frees every block named by inode `index`'s direct pointers.
    ///
    /// Failures are logged and swallowed, possibly leaving the inode and
    /// bitmap disagreeing. An indirect block, and everything it lists, is
    /// not followed.
    pub fn deallocate_blocks_for_file(&mut self, index: usize) {
        match self.try_deallocate(index) {
            Ok(inode) => {
                if let Some(open) = self.open_files.get_mut(&index) {
                    open.release_pointers();
                }
                debug!("deallocate inode {index} ({:?})", inode.name());
            }
            Err(err) => error!("failed to deallocate blocks of inode {index}: {err}"),
        }
    }

    /// Every file on the device: descriptor, name and size.
    pub fn entries(&self) -> Result<Vec<(Descriptor, String, u32)>> {
        let mut entries = Vec::new();
        for index in 0..self.geometry().inodes {
            let inode = self.disk.read_inode(index)?;
            match inode.name() {
                Some(name) if !inode.is_free() => {
                    entries.push((index, name.to_owned(), inode.size()))
                }
                _ => {}
            }
        }
        Ok(entries)
    }

    pub fn free_block_count(&self) -> Result<usize> {
        Ok(self.disk.read_bitmap()?.count_free())
    }

    /// Block indices stored in the indirect block `block`.
    pub fn indirect_entries(&self, block: usize) -> Result<Vec<u32>> {
        Ok(unpack_indices(&self.disk.read_block(block)?))
    }
}

impl FileSystem {
    /// First committed inode called `name`
    fn find(&self, name: &str) -> Result<Option<(usize, InodeRecord)>> {
        for index in 0..self.geometry().inodes {
            let inode = self.disk.read_inode(index)?;
            if inode.matches(name) {
                return Ok(Some((index, inode)));
            }
        }
        Ok(None)
    }

    fn direct_block(&self, fd: Descriptor, inode: &InodeRecord, slot: usize) -> Result<usize> {
        inode
            .pointers()
            .get(slot)
            .copied()
            .flatten()
            .map(|block| block as usize)
            .filter(|&block| block < self.geometry().blocks)
            .ok_or(Error::CorruptPointer { inode: fd, slot })
    }

    fn try_deallocate(&self, index: usize) -> Result<InodeRecord> {
        let mut inode = self.disk.read_inode(index)?;
        let mut bitmap = self.disk.read_bitmap()?;

        for slot in 0..inode.pointers().len() {
            let Some(block) = inode.pointer(slot) else {
                continue;
            };
            let block = block as usize;
            if block >= bitmap.len() {
                warn!("inode {index} points past the disk at slot {slot}: {block}");
            } else {
                bitmap.free(block);
                self.disk.write_bitmap(&bitmap)?;
            }
            inode.set_pointer(slot, None);
        }

        self.disk.write_inode(index, &inode)?;
        Ok(inode)
    }
}

/// Takes the lowest `count` free blocks, or `None` if there are fewer.
fn take_free_blocks(bitmap: &mut FreeBlockBitmap, count: usize) -> Option<Vec<u32>> {
    let blocks: Vec<usize> = bitmap.free_blocks().take(count).collect();
    if blocks.len() < count {
        return None;
    }
    blocks.iter().for_each(|&block| bitmap.allocate(block));
    Some(blocks.into_iter().map(|block| block as u32).collect())
}

/// Lays out block indices as 4-byte little-endian integers, filling the
/// rest of the `capacity` entries with [`UNALLOCATED`].
fn pack_indices(blocks: &[u32], capacity: usize) -> Vec<u8> {
    assert!(blocks.len() <= capacity);
    blocks
        .iter()
        .map(|&block| block as i32)
        .chain(std::iter::repeat(UNALLOCATED))
        .take(capacity)
        .flat_map(i32::to_le_bytes)
        .collect()
}

/// Reads packed block indices up to the first unused entry.
fn unpack_indices(block: &[u8]) -> Vec<u32> {
    block
        .chunks_exact(4)
        .map(|raw| i32::from_le_bytes([raw[0], raw[1], raw[2], raw[3]]))
        .map_while(|raw| u32::try_from(raw).ok())
        .collect()
}

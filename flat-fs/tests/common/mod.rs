#![allow(dead_code)]

use std::sync::Arc;

use block_dev::RamDisk;
use flat_fs::{FileSystem, Geometry};

/// Four blocks of 512 bytes, small enough to run out of space quickly.
pub const TINY: Geometry = Geometry {
    inodes: 8,
    blocks: 4,
    block_size: 512,
    pointers: 4,
};

/// Small blocks so that indirection kicks in after a few hundred bytes.
pub const NARROW: Geometry = Geometry {
    inodes: 8,
    blocks: 32,
    block_size: 64,
    pointers: 3,
};

pub fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

pub fn ram_fs(geometry: Geometry) -> (Arc<RamDisk>, FileSystem) {
    init_logger();
    let ram = Arc::new(RamDisk::new(geometry.total_len().unwrap()));
    let fs = FileSystem::format(ram.clone(), geometry).unwrap();
    (ram, fs)
}

/// Bytes that differ from block to block, so misplaced blocks show up.
pub fn pattern(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i % 251) as u8).collect()
}

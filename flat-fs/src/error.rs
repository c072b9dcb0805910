use std::io;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("file {0:?} already exists")]
    AlreadyExists(String),
    #[error("inode table is full")]
    NoFreeInode,
    #[error("file {0:?} not found")]
    NotFound(String),
    #[error("descriptor {0} does not match any open file")]
    DescriptorMismatch(usize),
    #[error("descriptor {0} is invalid or names a free inode")]
    InvalidDescriptor(usize),
    #[error("inode {inode} has no block behind pointer {slot}")]
    CorruptPointer { inode: usize, slot: usize },
    #[error("insufficient space: {needed} blocks needed, {free} free")]
    InsufficientSpace { needed: usize, free: usize },
    #[error("no free block left for the indirect block")]
    IndexAllocationFailure,
    #[error("file needs {blocks} blocks, at most {max} addressable")]
    FileTooLarge { blocks: usize, max: usize },
    #[error("invalid file name {0:?}")]
    InvalidName(String),
    #[error("invalid geometry: {0}")]
    InvalidGeometry(String),
    #[error("device I/O error")]
    Device(#[from] io::Error),
}

pub type Result<T> = core::result::Result<T, Error>;


use std::fs::{File, OpenOptions};
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use block_dev::{BlockDevice, check_range};

/// Disk image kept in a host file.
#[derive(Debug)]
pub struct BlockFile(pub Mutex<File>);

impl BlockFile {
    /// Creates (or truncates) an image of exactly `len` bytes.
    pub fn create(path: &Path, len: usize) -> io::Result<Self> {
        let fd = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(true)
            .open(path)?;
        fd.set_len(len as u64)?;

        Ok(Self(Mutex::new(fd)))
    }

    /// Opens an existing image for reading and writing.
    pub fn open(path: &Path) -> io::Result<Self> {
        let fd = OpenOptions::new().read(true).write(true).open(path)?;
        Ok(Self(Mutex::new(fd)))
    }

    fn lock(&self) -> io::Result<MutexGuard<'_, File>> {
        self.0
            .lock()
            .map_err(|_| io::Error::other("image file lock poisoned"))
    }
}

impl BlockDevice for BlockFile {
    fn read_at(&self, offset: usize, buf: &mut [u8]) -> io::Result<()> {
        let mut file = self.lock()?;
        check_range(offset, buf.len(), file.metadata()?.len() as usize)?;
        file.seek(SeekFrom::Start(offset as u64))?;
        file.read_exact(buf)
    }

    fn write_at(&self, offset: usize, buf: &[u8]) -> io::Result<()> {
        let mut file = self.lock()?;
        check_range(offset, buf.len(), file.metadata()?.len() as usize)?;
        file.seek(SeekFrom::Start(offset as u64))?;
        file.write_all(buf)
    }

    fn len(&self) -> io::Result<usize> {
        Ok(self.lock()?.metadata()?.len() as usize)
    }
}

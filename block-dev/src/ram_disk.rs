use std::io;
use std::sync::atomic::{AtomicBool, Ordering};

use spin::Mutex;

use crate::{BlockDevice, check_range};

/// Medium kept entirely in memory.
///
/// A `RamDisk` can be ejected, after which every access fails as if the
/// underlying hardware went away.
#[derive(Debug)]
pub struct RamDisk {
    data: Mutex<Vec<u8>>,
    ejected: AtomicBool,
}

impl RamDisk {
    pub fn new(len: usize) -> Self {
        Self {
            data: Mutex::new(vec![0; len]),
            ejected: AtomicBool::new(false),
        }
    }

    /// Makes every later access fail with [`io::ErrorKind::NotConnected`].
    pub fn eject(&self) {
        self.ejected.store(true, Ordering::Release);
    }

    pub fn insert(&self) {
        self.ejected.store(false, Ordering::Release);
    }

    /// Copy of the whole medium.
    pub fn snapshot(&self) -> Vec<u8> {
        self.data.lock().clone()
    }

    fn online(&self) -> io::Result<()> {
        if self.ejected.load(Ordering::Acquire) {
            return Err(io::Error::new(
                io::ErrorKind::NotConnected,
                "ram disk has been ejected",
            ));
        }
        Ok(())
    }
}

impl BlockDevice for RamDisk {
    fn read_at(&self, offset: usize, buf: &mut [u8]) -> io::Result<()> {
        self.online()?;
        let data = self.data.lock();
        check_range(offset, buf.len(), data.len())?;
        buf.copy_from_slice(&data[offset..offset + buf.len()]);
        Ok(())
    }

    fn write_at(&self, offset: usize, buf: &[u8]) -> io::Result<()> {
        self.online()?;
        let mut data = self.data.lock();
        check_range(offset, buf.len(), data.len())?;
        data[offset..offset + buf.len()].copy_from_slice(buf);
        Ok(())
    }

    fn len(&self) -> io::Result<usize> {
        self.online()?;
        Ok(self.data.lock().len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn write_then_read() {
        let disk = RamDisk::new(64);
        disk.write_at(10, b"hello").unwrap();

        let mut buf = [0; 5];
        disk.read_at(10, &mut buf).unwrap();
        assert_eq!(&buf, b"hello");
        assert_eq!(disk.len().unwrap(), 64);
    }

    #[test]
    fn out_of_range() {
        let disk = RamDisk::new(16);
        let mut buf = [0; 8];
        let err = disk.read_at(12, &mut buf).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::UnexpectedEof);
        assert!(disk.write_at(usize::MAX, b"x").is_err());
    }

    #[test]
    fn ejected_disk_fails() {
        let disk = RamDisk::new(16);
        disk.eject();
        let err = disk.write_at(0, b"x").unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::NotConnected);
        assert!(disk.len().is_err());

        disk.insert();
        disk.write_at(0, b"x").unwrap();
        assert_eq!(disk.snapshot()[0], b'x');
    }
}

//! Inode record
//!
//! On disk a record is `NAME_CAP + 4 + 4 * pointers` bytes:
//! - name, zero padded; all zero means the slot is free
//! - size, u32 little endian
//! - block pointers, i32 little endian, [`UNALLOCATED`] for none
//!
//! Once a file outgrows its pointers, the last one names an indirect block
//! instead of a data block. Resolving it is up to the file system.

use crate::{NAME_CAP, UNALLOCATED};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InodeRecord {
    name: Option<String>,
    size: u32,
    pointers: Vec<Option<u32>>,
}

impl InodeRecord {
    /// A free slot.
    pub fn empty(pointers: usize) -> Self {
        Self {
            name: None,
            size: 0,
            pointers: vec![None; pointers],
        }
    }

    /// A fresh, empty file.
    pub fn new(name: &str, pointers: usize) -> Self {
        Self {
            name: Some(name.to_owned()),
            ..Self::empty(pointers)
        }
    }

    #[inline]
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    #[inline]
    pub fn set_name(&mut self, name: Option<&str>) {
        self.name = name.map(str::to_owned);
    }

    /// Absent or empty names mark a free slot.
    #[inline]
    pub fn is_free(&self) -> bool {
        self.name.as_deref().is_none_or(str::is_empty)
    }

    /// Whether this slot is in use under `name`, ignoring surrounding
    /// whitespace on both sides.
    pub fn matches(&self, name: &str) -> bool {
        !self.is_free() && self.name.as_deref().map(str::trim) == Some(name.trim())
    }

    /// Whether this slot is in use and its trimmed name equals `name`
    /// exactly as given.
    pub fn is_named(&self, name: &str) -> bool {
        !self.is_free() && self.name.as_deref().map(str::trim) == Some(name)
    }

    #[inline]
    pub fn size(&self) -> u32 {
        self.size
    }

    #[inline]
    pub fn set_size(&mut self, size: u32) {
        self.size = size;
    }

    #[inline]
    pub fn pointer(&self, slot: usize) -> Option<u32> {
        self.pointers[slot]
    }

    #[inline]
    pub fn set_pointer(&mut self, slot: usize, block: Option<u32>) {
        self.pointers[slot] = block;
    }

    #[inline]
    pub fn pointers(&self) -> &[Option<u32>] {
        &self.pointers
    }

    /// Releases every pointer, leaving the size as it was.
    pub fn release_pointers(&mut self) {
        self.pointers.fill(None);
    }

    /// Releases every pointer and truncates to zero bytes.
    pub fn clear_pointers(&mut self) {
        self.release_pointers();
        self.size = 0;
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(NAME_CAP + 4 + 4 * self.pointers.len());

        let mut name = [0; NAME_CAP];
        if let Some(src) = self.name.as_deref() {
            let src = src.as_bytes();
            let len = src.len().min(NAME_CAP);
            name[..len].copy_from_slice(&src[..len]);
        }
        bytes.extend_from_slice(&name);
        bytes.extend_from_slice(&self.size.to_le_bytes());
        for pointer in &self.pointers {
            let raw = pointer.map_or(UNALLOCATED, |block| block as i32);
            bytes.extend_from_slice(&raw.to_le_bytes());
        }

        bytes
    }

    /// `bytes` must hold exactly one record with `pointers` pointers.
    pub fn decode(bytes: &[u8], pointers: usize) -> Self {
        assert_eq!(bytes.len(), NAME_CAP + 4 + 4 * pointers, "inode record size mismatch");

        let (name, rest) = bytes.split_at(NAME_CAP);
        let len = name.iter().position(|&c| c == 0).unwrap_or(NAME_CAP);
        let name = (len > 0).then(|| String::from_utf8_lossy(&name[..len]).into_owned());

        let (size, rest) = rest.split_at(4);
        let size = u32::from_le_bytes(size.try_into().unwrap());

        let pointers = rest
            .chunks_exact(4)
            .map(|raw| {
                let raw = i32::from_le_bytes(raw.try_into().unwrap());
                // anything negative is treated as unallocated
                u32::try_from(raw).ok()
            })
            .collect();

        Self {
            name,
            size,
            pointers,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encoded_layout() {
        let mut inode = InodeRecord::new("a.txt", 3);
        inode.set_size(600);
        inode.set_pointer(0, Some(7));

        let bytes = inode.encode();
        assert_eq!(bytes.len(), NAME_CAP + 4 + 12);
        assert_eq!(&bytes[..5], b"a.txt");
        assert!(bytes[5..NAME_CAP].iter().all(|&c| c == 0));
        assert_eq!(&bytes[NAME_CAP..NAME_CAP + 4], &600u32.to_le_bytes());
        assert_eq!(&bytes[NAME_CAP + 4..NAME_CAP + 8], &7i32.to_le_bytes());
        assert_eq!(&bytes[NAME_CAP + 8..NAME_CAP + 12], &[0xff; 4]);

        assert_eq!(InodeRecord::decode(&bytes, 3), inode);
    }

    #[test]
    fn empty_record_is_free() {
        let inode = InodeRecord::empty(4);
        assert!(inode.is_free());
        assert!(inode.pointers().iter().all(Option::is_none));

        let decoded = InodeRecord::decode(&inode.encode(), 4);
        assert_eq!(decoded.name(), None);
        assert!(decoded.is_free());
    }

    #[test]
    fn names_compare_trimmed() {
        let inode = InodeRecord::new("  notes ", 1);
        assert!(inode.matches("notes"));
        assert!(inode.matches(" notes"));
        assert!(!inode.matches("Notes"));

        let mut freed = inode.clone();
        freed.set_name(None);
        assert!(!freed.matches("notes"));
        assert!(!InodeRecord::new("", 1).matches(""));
    }

    #[test]
    fn is_named_trims_stored_side_only() {
        let inode = InodeRecord::new(" notes ", 1);
        assert!(inode.is_named("notes"));
        assert!(!inode.is_named(" notes"));
        assert!(!InodeRecord::empty(1).is_named(""));
    }

    #[test]
    fn clear_pointers_truncates() {
        let mut inode = InodeRecord::new("x", 2);
        inode.set_pointer(1, Some(3));
        inode.set_size(10);
        inode.clear_pointers();
        assert_eq!(inode.size(), 0);
        assert_eq!(inode.pointers(), &[None, None]);
        assert_eq!(inode.name(), Some("x"));
    }

    #[test]
    fn release_pointers_keeps_size() {
        let mut inode = InodeRecord::new("x", 2);
        inode.set_pointer(0, Some(7));
        inode.set_size(10);
        inode.release_pointers();
        assert_eq!(inode.size(), 10);
        assert_eq!(inode.pointers(), &[None, None]);
    }
}

/// Free-block bitmap, one bit per data block.
///
/// Block `b` lives in byte `b / 8`, bit `b % 8`; a set bit means the block
/// is allocated. Bits past `len` in the last byte are padding and never
/// count as free.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FreeBlockBitmap {
    bytes: Vec<u8>,
    /// Number of blocks tracked
    len: usize,
}

/// Position of a block inside the bitmap
struct BitPos(usize);

impl FreeBlockBitmap {
    /// All blocks free.
    pub fn new(len: usize) -> Self {
        Self {
            bytes: vec![0; len.div_ceil(8)],
            len,
        }
    }

    /// Rebuilds a bitmap of `len` blocks from its persisted region.
    pub fn from_bytes(len: usize, bytes: &[u8]) -> Self {
        assert_eq!(bytes.len(), len.div_ceil(8), "bitmap region size mismatch");
        Self {
            bytes: bytes.to_vec(),
            len,
        }
    }

    #[inline]
    pub fn to_bytes(&self) -> Vec<u8> {
        self.bytes.clone()
    }

    #[inline]
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn is_free(&self, index: usize) -> bool {
        let (byte, bit) = self.locate(index);
        self.bytes[byte] & (1 << bit) == 0
    }

    /// Marks a block as in use; setting an allocated block again is harmless.
    pub fn allocate(&mut self, index: usize) {
        let (byte, bit) = self.locate(index);
        self.bytes[byte] |= 1 << bit;
    }

    pub fn free(&mut self, index: usize) {
        let (byte, bit) = self.locate(index);
        self.bytes[byte] &= !(1 << bit);
    }

    /// Lowest free block.
    pub fn first_free(&self) -> Option<usize> {
        // skip fully allocated bytes, then take the lowest clear bit
        self.bytes
            .iter()
            .enumerate()
            .find_map(|(byte, &bits)| {
                (bits != u8::MAX).then_some(BitPos::encode(byte, bits.trailing_ones() as usize))
            })
            .filter(|&index| index < self.len)
    }

    /// Free blocks in ascending order.
    pub fn free_blocks(&self) -> impl Iterator<Item = usize> + '_ {
        (0..self.len).filter(|&index| self.is_free(index))
    }

    pub fn count_free(&self) -> usize {
        let full = self.len / 8;
        let mut used: usize = self.bytes[..full]
            .iter()
            .map(|bits| bits.count_ones() as usize)
            .sum();
        // a persisted region may carry stray padding bits, mask them off
        let tail = self.len % 8;
        if tail > 0 {
            used += (self.bytes[full] & ((1 << tail) - 1)).count_ones() as usize;
        }
        self.len - used
    }

    fn locate(&self, index: usize) -> (usize, usize) {
        assert!(
            index < self.len,
            "block {index} out of range (bitmap tracks {} blocks)",
            self.len
        );
        BitPos(index).decode()
    }
}

impl BitPos {
    #[inline]
    fn encode(byte: usize, bit: usize) -> usize {
        byte * 8 + bit
    }

    #[inline]
    fn decode(self) -> (usize, usize) {
        (self.0 / 8, self.0 % 8)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allocate_and_free() {
        let mut bitmap = FreeBlockBitmap::new(10);
        assert_eq!(bitmap.count_free(), 10);

        bitmap.allocate(3);
        bitmap.allocate(3);
        assert!(!bitmap.is_free(3));
        assert_eq!(bitmap.count_free(), 9);
        assert_eq!(bitmap.as_bytes(), &[0b0000_1000, 0]);

        bitmap.free(3);
        assert!(bitmap.is_free(3));
        assert_eq!(bitmap.count_free(), 10);
    }

    #[test]
    fn first_free_skips_full_bytes() {
        let mut bitmap = FreeBlockBitmap::new(12);
        (0..9).for_each(|index| bitmap.allocate(index));
        assert_eq!(bitmap.first_free(), Some(9));

        bitmap.free(4);
        assert_eq!(bitmap.first_free(), Some(4));
        assert_eq!(bitmap.free_blocks().collect::<Vec<_>>(), vec![4, 9, 10, 11]);
    }

    #[test]
    fn padding_is_never_free() {
        let mut bitmap = FreeBlockBitmap::new(3);
        (0..3).for_each(|index| bitmap.allocate(index));
        assert_eq!(bitmap.first_free(), None);
        assert_eq!(bitmap.count_free(), 0);
        assert_eq!(bitmap.free_blocks().count(), 0);

        let stray = FreeBlockBitmap::from_bytes(3, &[0b1111_1010]);
        assert_eq!(stray.count_free(), 2);
        assert_eq!(stray.first_free(), Some(0));
    }

    #[test]
    fn restores_from_bytes() {
        let mut bitmap = FreeBlockBitmap::new(16);
        bitmap.allocate(0);
        bitmap.allocate(15);

        let restored = FreeBlockBitmap::from_bytes(16, &bitmap.to_bytes());
        assert_eq!(restored, bitmap);
        assert!(!restored.is_free(15));
    }

    #[test]
    #[should_panic]
    fn out_of_range_panics() {
        FreeBlockBitmap::new(4).is_free(4);
    }
}

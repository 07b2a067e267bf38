//! A bounds-checked reader over a byte buffer.

/// A reader for reading bytes and numbers from a byte buffer.
#[derive(Debug, Clone)]
pub struct ByteReader<'a> {
    data: &'a [u8],
    offset: usize,
}

impl<'a> ByteReader<'a> {
    /// Create a new byte reader.
    #[inline]
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, offset: 0 }
    }

    /// The current offset into the data.
    #[inline]
    pub fn offset(&self) -> usize {
        self.offset
    }

    /// The total length of the data.
    #[inline]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Whether the underlying data is empty.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// The number of bytes that are left to read.
    #[inline]
    pub fn remaining(&self) -> usize {
        self.data.len() - self.offset
    }

    /// Whether all bytes have been read.
    #[inline]
    pub fn at_end(&self) -> bool {
        self.offset >= self.data.len()
    }

    /// The unread part of the data.
    #[inline]
    pub fn tail(&self) -> &'a [u8] {
        &self.data[self.offset..]
    }

    /// Jump to an absolute offset.
    #[inline]
    pub fn jump(&mut self, offset: usize) -> Option<()> {
        if offset > self.data.len() {
            return None;
        }

        self.offset = offset;

        Some(())
    }

    /// Peek the given number of bytes.
    #[inline]
    pub fn peek_bytes(&self, len: usize) -> Option<&'a [u8]> {
        let end = self.offset.checked_add(len)?;
        self.data.get(self.offset..end)
    }

    /// Read the given number of bytes.
    #[inline]
    pub fn read_bytes(&mut self, len: usize) -> Option<&'a [u8]> {
        let bytes = self.peek_bytes(len)?;
        self.offset += len;

        Some(bytes)
    }

    /// Skip the given number of bytes.
    #[inline]
    pub fn skip_bytes(&mut self, len: usize) -> Option<()> {
        self.read_bytes(len).map(|_| ())
    }

    /// Split off the next `len` bytes as a separate reader.
    #[inline]
    pub fn sub_reader(&mut self, len: usize) -> Option<Self> {
        Some(Self::new(self.read_bytes(len)?))
    }

    #[inline(always)]
    fn read_array<const N: usize>(&mut self) -> Option<[u8; N]> {
        self.read_bytes(N)?.try_into().ok()
    }

    /// Read a single byte.
    #[inline]
    pub fn read_u8(&mut self) -> Option<u8> {
        let byte = *self.data.get(self.offset)?;
        self.offset += 1;

        Some(byte)
    }

    /// Peek a single byte.
    #[inline]
    pub fn peek_u8(&self) -> Option<u8> {
        self.data.get(self.offset).copied()
    }

    /// Read a big-endian u16 number.
    #[inline]
    pub fn read_u16_be(&mut self) -> Option<u16> {
        Some(u16::from_be_bytes(self.read_array()?))
    }

    /// Read a little-endian u16 number.
    #[inline]
    pub fn read_u16_le(&mut self) -> Option<u16> {
        Some(u16::from_le_bytes(self.read_array()?))
    }

    /// Read a big-endian u32 number.
    #[inline]
    pub fn read_u32_be(&mut self) -> Option<u32> {
        Some(u32::from_be_bytes(self.read_array()?))
    }

    /// Read a little-endian u32 number.
    #[inline]
    pub fn read_u32_le(&mut self) -> Option<u32> {
        Some(u32::from_le_bytes(self.read_array()?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numbers() {
        let data = [0x12, 0x34, 0x56, 0x78, 0x9A, 0xBC, 0xDE, 0xF0, 0x01, 0x02, 0x03, 0x04, 0x05];
        let mut reader = ByteReader::new(&data);
        assert_eq!(reader.read_u16_be(), Some(0x1234));
        assert_eq!(reader.read_u16_le(), Some(0x7856));
        assert_eq!(reader.read_u32_be(), Some(0x9ABCDEF0));
        assert_eq!(reader.read_u32_le(), Some(0x04030201));
        assert_eq!(reader.remaining(), 1);
        assert_eq!(reader.read_u16_be(), None);
        assert_eq!(reader.read_u8(), Some(0x05));
        assert!(reader.at_end());
        assert_eq!(reader.read_u8(), None);
    }

    #[test]
    fn sub_reader_and_jump() {
        let data = [1, 2, 3, 4, 5, 6];
        let mut reader = ByteReader::new(&data);
        reader.skip_bytes(1).unwrap();

        let mut sub = reader.sub_reader(3).unwrap();
        assert_eq!(sub.len(), 3);
        assert_eq!(sub.read_bytes(3), Some(&[2, 3, 4][..]));
        assert!(sub.at_end());

        assert_eq!(reader.offset(), 4);
        assert_eq!(reader.tail(), &[5, 6]);
        assert!(reader.sub_reader(3).is_none());
        assert_eq!(reader.offset(), 4);

        reader.jump(0).unwrap();
        assert_eq!(reader.peek_u8(), Some(1));
        assert!(reader.jump(7).is_none());
        assert!(reader.skip_bytes(usize::MAX).is_none());
    }
}

//! Little-endian integer helpers
//!
//! All ASPH headers and the metadata trailer store integers as fixed-width
//! little-endian values. Reads are bounds-checked and return `None` instead of
//! panicking when the input runs out.

/// Append `value` as four little-endian bytes
pub fn put_u32_le(buf: &mut Vec<u8>, value: u32) {
    buf.extend_from_slice(&value.to_le_bytes());
}

/// Decode a little-endian u32 at `offset`, if four bytes are available
pub fn get_u32_le(bytes: &[u8], offset: usize) -> Option<u32> {
    let end = offset.checked_add(4)?;
    let raw: [u8; 4] = bytes.get(offset..end)?.try_into().ok()?;
    Some(u32::from_le_bytes(raw))
}

/// Sequential reader over a byte slice
///
/// Every accessor advances the cursor only on success, so a failed read
/// leaves the reader where it was.
#[derive(Debug, Clone)]
pub struct ByteReader<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> ByteReader<'a> {
    pub fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, pos: 0 }
    }

    /// Bytes not yet consumed
    pub fn remaining(&self) -> usize {
        self.bytes.len() - self.pos
    }

    /// Current cursor offset
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Take the next `len` bytes
    pub fn take(&mut self, len: usize) -> Option<&'a [u8]> {
        if len > self.remaining() {
            return None;
        }
        let slice = &self.bytes[self.pos..self.pos + len];
        self.pos += len;
        Some(slice)
    }

    pub fn read_u8(&mut self) -> Option<u8> {
        self.take(1).map(|b| b[0])
    }

    pub fn read_u32_le(&mut self) -> Option<u32> {
        let value = get_u32_le(self.bytes, self.pos)?;
        self.pos += 4;
        Some(value)
    }

    /// Everything after the cursor
    pub fn rest(&mut self) -> &'a [u8] {
        let slice = &self.bytes[self.pos..];
        self.pos = self.bytes.len();
        slice
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_put_u32_le_layout() {
        let mut buf = Vec::new();
        put_u32_le(&mut buf, 0x1234_5678);
        assert_eq!(buf, vec![0x78, 0x56, 0x34, 0x12]);
    }

    #[test]
    fn test_get_u32_le_out_of_bounds() {
        let bytes = [1, 0, 0];
        assert_eq!(get_u32_le(&bytes, 0), None);
        assert_eq!(get_u32_le(&bytes, usize::MAX), None);
        assert_eq!(get_u32_le(&[1, 0, 0, 0], 0), Some(1));
    }

    #[test]
    fn test_reader_does_not_advance_on_failure() {
        let bytes = [0xAA, 0x01, 0x00];
        let mut reader = ByteReader::new(&bytes);
        assert_eq!(reader.read_u8(), Some(0xAA));
        assert_eq!(reader.read_u32_le(), None);
        assert_eq!(reader.position(), 1);
        assert_eq!(reader.take(2), Some(&[0x01, 0x00][..]));
        assert_eq!(reader.remaining(), 0);
        assert!(reader.rest().is_empty());
    }
}

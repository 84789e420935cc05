//! Byte images and the forward-only cursor the decoders read from.

use crate::arch::DecodeError;
use crate::operand::Width;
use crate::Address;

/// A run of bytes loaded at `base`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Image<'a> {
    bytes: &'a [u8],
    base: Address,
}

impl<'a> Image<'a> {
    pub fn new(bytes: &'a [u8], base: Address) -> Self {
        Self { bytes, base }
    }

    pub fn base(&self) -> Address {
        self.base
    }

    /// First address past the image, saturating at the top of the address
    /// space.
    pub fn end(&self) -> Address {
        self.base.saturating_add(self.bytes.len() as Address)
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn bytes(&self) -> &'a [u8] {
        self.bytes
    }

    pub fn contains(&self, addr: Address) -> bool {
        addr >= self.base && addr - self.base < self.bytes.len() as Address
    }

    fn offset_of(&self, addr: Address) -> Option<usize> {
        if self.contains(addr) {
            usize::try_from(addr - self.base).ok()
        } else {
            None
        }
    }

    /// `len` bytes starting at `addr`, if all of them are inside the image.
    pub fn slice(&self, addr: Address, len: usize) -> Option<&'a [u8]> {
        let start = self.offset_of(addr)?;
        self.bytes.get(start..start.checked_add(len)?)
    }

    pub fn read_u16(&self, addr: Address) -> Option<u16> {
        self.slice(addr, 2).map(|b| u16::from_le_bytes([b[0], b[1]]))
    }

    /// A cursor positioned at `at`. Reads fail with `Truncated` once they
    /// run past the end of the image.
    pub fn cursor(&self, at: Address) -> Cursor<'a> {
        let data: &'a [u8] = match self.offset_of(at) {
            Some(start) => &self.bytes[start..],
            None => &[],
        };
        Cursor { data, start: at, pos: 0 }
    }
}

/// Sequential little-endian reader over one instruction.
///
/// The number of bytes consumed is the instruction length.
#[derive(Debug, Clone)]
pub struct Cursor<'a> {
    data: &'a [u8],
    start: Address,
    pos: usize,
}

impl<'a> Cursor<'a> {
    /// Address of the first byte read.
    pub fn start(&self) -> Address {
        self.start
    }

    /// Bytes consumed so far.
    pub fn consumed(&self) -> usize {
        self.pos
    }

    /// Address of the next unread byte.
    pub fn position(&self) -> Address {
        self.start.wrapping_add(self.pos as Address)
    }

    fn take<const N: usize>(&mut self) -> Result<[u8; N], DecodeError> {
        let end = self.pos + N;
        let chunk = self
            .data
            .get(self.pos..end)
            .ok_or(DecodeError::Truncated { at: self.position() })?;
        let mut out = [0u8; N];
        out.copy_from_slice(chunk);
        self.pos = end;
        Ok(out)
    }

    pub fn next_u8(&mut self) -> Result<u8, DecodeError> {
        self.take::<1>().map(|[b]| b)
    }

    pub fn next_u16(&mut self) -> Result<u16, DecodeError> {
        self.take::<2>().map(u16::from_le_bytes)
    }

    pub fn next_u32(&mut self) -> Result<u32, DecodeError> {
        self.take::<4>().map(u32::from_le_bytes)
    }

    pub fn next_u64(&mut self) -> Result<u64, DecodeError> {
        self.take::<8>().map(u64::from_le_bytes)
    }

    /// Read one unsigned value of the given width.
    pub fn next_sized(&mut self, width: Width) -> Result<u64, DecodeError> {
        match width {
            Width::Byte => self.next_u8().map(u64::from),
            Width::Word => self.next_u16().map(u64::from),
            Width::Dword => self.next_u32().map(u64::from),
            Width::Qword => self.next_u64(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cursor_reads_little_endian() {
        let bytes = [0x01, 0x34, 0x12, 0x78, 0x56, 0x34, 0x12];
        let image = Image::new(&bytes, 0x1000);
        let mut cur = image.cursor(0x1000);

        assert_eq!(cur.next_u8().unwrap(), 0x01);
        assert_eq!(cur.next_u16().unwrap(), 0x1234);
        assert_eq!(cur.next_u32().unwrap(), 0x1234_5678);
        assert_eq!(cur.consumed(), 7);
        assert_eq!(cur.position(), 0x1007);
    }

    #[test]
    fn test_cursor_fails_cleanly_at_end() {
        let bytes = [0xAA, 0xBB, 0xCC];
        let image = Image::new(&bytes, 0);
        let mut cur = image.cursor(1);

        assert_eq!(cur.next_u32(), Err(DecodeError::Truncated { at: 1 }));
        // a failed read consumes nothing
        assert_eq!(cur.consumed(), 0);
        assert_eq!(cur.next_u16().unwrap(), 0xCCBB);
        assert!(cur.next_u8().is_err());
    }

    #[test]
    fn test_cursor_outside_image() {
        let bytes = [0u8; 4];
        let image = Image::new(&bytes, 0x100);
        assert!(image.cursor(0x50).next_u8().is_err());
        assert!(image.cursor(0x104).next_u8().is_err());
        assert_eq!(image.read_u16(0x103), None);
        assert_eq!(image.read_u16(0x102), Some(0));
    }

    #[test]
    fn test_image_at_top_of_address_space() {
        let bytes = [0x04, 0x00, 0xAA, 0xBB];
        let image = Image::new(&bytes, u64::MAX - 3);
        assert_eq!(image.end(), u64::MAX);
        assert!(image.contains(u64::MAX));
        assert_eq!(image.read_u16(u64::MAX - 1), Some(0xBBAA));
        assert_eq!(image.slice(u64::MAX, 2), None);
    }
}

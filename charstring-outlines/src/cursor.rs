//! Sequential reading of big-endian data.

/// A cursor for validating bytes during parsing.
///
/// Reads return `None` when the requested value extends past the end of the
/// data; callers map that to the error appropriate for what they are reading.
#[derive(Clone, Debug)]
pub(crate) struct Cursor<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Cursor<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    pub fn remaining_bytes(&self) -> usize {
        self.data.len().saturating_sub(self.pos)
    }

    pub fn read_u8(&mut self) -> Option<u8> {
        let [b0] = self.read_bytes::<1>()?;
        Some(b0)
    }

    pub fn read_u16(&mut self) -> Option<u16> {
        self.read_bytes().map(u16::from_be_bytes)
    }

    pub fn read_i16(&mut self) -> Option<i16> {
        self.read_bytes().map(i16::from_be_bytes)
    }

    pub fn read_i32(&mut self) -> Option<i32> {
        self.read_bytes().map(i32::from_be_bytes)
    }

    /// Reads a big-endian unsigned integer of 1 to 4 bytes.
    pub fn read_uint(&mut self, size: u8) -> Option<u32> {
        let bytes = self.read_array(size as usize)?;
        Some(bytes.iter().fold(0u32, |acc, b| (acc << 8) | *b as u32))
    }

    pub fn read_array(&mut self, len: usize) -> Option<&'a [u8]> {
        let end = self.pos.checked_add(len)?;
        let bytes = self.data.get(self.pos..end)?;
        self.pos = end;
        Some(bytes)
    }

    fn read_bytes<const N: usize>(&mut self) -> Option<[u8; N]> {
        self.read_array(N)?.try_into().ok()
    }
}

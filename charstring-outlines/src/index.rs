//! Parsing for CFF INDEX objects.
//!
//! See "5 INDEX Data" at <https://adobe-type-tools.github.io/font-tech-notes/pdfs/5176.CFF.pdf#page=12>

use crate::{cursor::Cursor, error::FontDataError};

/// An array of variable sized objects, as used for charstrings and
/// subroutines.
#[derive(Clone, Default, Debug)]
pub struct Index<'a> {
    count: u16,
    off_size: u8,
    offsets: &'a [u8],
    data: &'a [u8],
}

impl<'a> Index<'a> {
    /// Creates a new index from the given data.
    ///
    /// The data may extend beyond the end of the index.
    pub fn new(data: &'a [u8]) -> Result<Self, FontDataError> {
        let mut cursor = Cursor::new(data);
        let count = cursor.read_u16().ok_or(FontDataError::OutOfBounds)?;
        if count == 0 {
            // An empty CFF index contains only a 2 byte count field
            return Ok(Self::default());
        }
        let off_size = cursor.read_u8().ok_or(FontDataError::OutOfBounds)?;
        if !(1..=4).contains(&off_size) {
            return Err(FontDataError::InvalidIndexOffsetSize(off_size));
        }
        // There are count + 1 entries in the offset array
        let offsets_len = (count as usize + 1) * off_size as usize;
        let offsets = cursor
            .read_array(offsets_len)
            .ok_or(FontDataError::OutOfBounds)?;
        let mut index = Self {
            count,
            off_size,
            offsets,
            data: &[],
        };
        let data_len = index.get_offset(count as usize)?;
        index.data = cursor
            .read_array(data_len)
            .ok_or(FontDataError::OutOfBounds)?;
        Ok(index)
    }

    /// Returns the number of objects in the index.
    pub fn count(&self) -> u32 {
        self.count as u32
    }

    /// Computes a bias that is added to a subroutine operator in a
    /// charstring.
    ///
    /// See "16 Local/Global Subrs INDEXes" at <https://adobe-type-tools.github.io/font-tech-notes/pdfs/5176.CFF.pdf#page=25>
    pub fn subr_bias(&self) -> i32 {
        let count = self.count();
        if count < 1240 {
            107
        } else if count < 33900 {
            1131
        } else {
            32768
        }
    }

    /// Returns the total size in bytes of the index table.
    pub fn size_in_bytes(&self) -> usize {
        // 2 byte count + 1 byte off_size
        const HEADER_SIZE: usize = 3;
        // An empty CFF index contains only a 2 byte count field
        const EMPTY_SIZE: usize = 2;
        match self.count {
            0 => EMPTY_SIZE,
            _ => HEADER_SIZE + self.offsets.len() + self.data.len(),
        }
    }

    /// Returns the data for the object at the given index.
    pub fn get(&self, index: usize) -> Result<&'a [u8], FontDataError> {
        if index >= self.count as usize {
            return Err(FontDataError::OutOfBounds);
        }
        let start = self.get_offset(index)?;
        let end = self.get_offset(index + 1)?;
        if start > end {
            return Err(FontDataError::UnorderedOffsets(index));
        }
        self.data.get(start..end).ok_or(FontDataError::OutOfBounds)
    }

    /// Reads an offset which is encoded as a variable sized integer.
    fn get_offset(&self, index: usize) -> Result<usize, FontDataError> {
        // "Offsets in the offset array are relative to the byte that precedes
        // the object data. Therefore the first element of the offset array is
        // always 1."
        let start = index * self.off_size as usize;
        let mut cursor = Cursor::new(self.offsets.get(start..).unwrap_or_default());
        let offset = cursor
            .read_uint(self.off_size)
            .ok_or(FontDataError::OutOfBounds)?;
        // Subtract one to get the actual offset.
        (offset as usize)
            .checked_sub(1)
            .ok_or(FontDataError::ZeroOffset)
    }
}

//! Parsing for CFF FDSelect tables.
//!
//! See "19 FDSelect" at <https://adobe-type-tools.github.io/font-tech-notes/pdfs/5176.CFF.pdf#page=28>

use font_types::GlyphId;

use crate::{cursor::Cursor, error::FontDataError};

/// Size of a format 3 range record: u16 first glyph followed by a u8 font
/// DICT index.
const RANGE3_SIZE: usize = 3;

/// Maps glyph identifiers to font DICT indices in CID-keyed fonts.
#[derive(Clone, Debug)]
pub enum FdSelect<'a> {
    /// One font DICT index per glyph.
    Format0(&'a [u8]),
    /// Ranges of glyphs sharing a font DICT index.
    Format3 { ranges: &'a [u8], sentinel: u16 },
}

impl<'a> FdSelect<'a> {
    /// Reads an FDSelect table for a font with `glyph_count` glyphs.
    pub fn new(data: &'a [u8], glyph_count: u32) -> Result<Self, FontDataError> {
        let mut cursor = Cursor::new(data);
        let format = cursor.read_u8().ok_or(FontDataError::OutOfBounds)?;
        match format {
            0 => {
                let fds = cursor
                    .read_array(glyph_count as usize)
                    .ok_or(FontDataError::OutOfBounds)?;
                Ok(Self::Format0(fds))
            }
            3 => {
                let n_ranges = cursor.read_u16().ok_or(FontDataError::OutOfBounds)?;
                let ranges = cursor
                    .read_array(n_ranges as usize * RANGE3_SIZE)
                    .ok_or(FontDataError::OutOfBounds)?;
                let sentinel = cursor.read_u16().ok_or(FontDataError::OutOfBounds)?;
                Ok(Self::Format3 { ranges, sentinel })
            }
            _ => Err(FontDataError::InvalidFdSelectFormat(format)),
        }
    }

    /// Returns the associated font DICT index for the given glyph identifier.
    pub fn font_index(&self, glyph_id: GlyphId) -> Option<u16> {
        let gid = glyph_id.to_u32();
        match self {
            Self::Format0(fds) => fds.get(gid as usize).map(|fd| *fd as u16),
            Self::Format3 { ranges, sentinel } => {
                if gid >= *sentinel as u32 {
                    return None;
                }
                let range = |ix: usize| ranges.get(ix * RANGE3_SIZE..(ix + 1) * RANGE3_SIZE);
                // Find the last range starting at or before the glyph
                let (mut lo, mut hi) = (0, ranges.len() / RANGE3_SIZE);
                while lo < hi {
                    let mid = (lo + hi) / 2;
                    let first = range(mid).map(|r| u16::from_be_bytes([r[0], r[1]]))?;
                    if first as u32 <= gid {
                        lo = mid + 1;
                    } else {
                        hi = mid;
                    }
                }
                // lo == 0 means the glyph precedes the first range
                Some(range(lo.checked_sub(1)?)?[2] as u16)
            }
        }
    }
}

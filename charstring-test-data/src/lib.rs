//! Test data shared between the charstring crates.

pub mod bebuffer;
pub mod charstring;

pub use bebuffer::{BeBuffer, U24};
pub use charstring::{op, CharstringBuilder};

/// Builds a CFF INDEX containing the given objects, using the smallest
/// offset size that can represent the data.
pub fn index<T: AsRef<[u8]>>(objects: &[T]) -> Vec<u8> {
    let data_len: usize = objects.iter().map(|obj| obj.as_ref().len()).sum();
    let off_size = match data_len + 1 {
        0..=0xFF => 1,
        0x100..=0xFFFF => 2,
        0x10000..=0xFFFFFF => 3,
        _ => 4,
    };
    index_with_off_size(objects, off_size)
}

/// Builds a CFF INDEX with an explicit offset size.
pub fn index_with_off_size<T: AsRef<[u8]>>(objects: &[T], off_size: u8) -> Vec<u8> {
    let mut buf = BeBuffer::new().push(objects.len() as u16);
    if objects.is_empty() {
        return buf.to_vec();
    }
    buf = buf.push(off_size);
    // Offsets start at 1.
    let mut offset = 1u32;
    let push_offset = |buf: BeBuffer, offset: u32| match off_size {
        1 => buf.push(offset as u8),
        2 => buf.push(offset as u16),
        3 => buf.push(U24(offset)),
        4 => buf.push(offset),
        _ => panic!("off_size should be 1-4"),
    };
    buf = push_offset(buf, offset);
    for obj in objects {
        offset += obj.as_ref().len() as u32;
        buf = push_offset(buf, offset);
    }
    for obj in objects {
        buf = buf.extend(obj.as_ref().iter().copied());
    }
    buf.to_vec()
}

/// Builds a format 0 FDSelect with one font DICT index per glyph.
pub fn fd_select_format0(fds: &[u8]) -> Vec<u8> {
    BeBuffer::new().push(0u8).extend(fds.iter().copied()).to_vec()
}

/// Builds a format 3 FDSelect from (first glyph, font DICT index) ranges
/// followed by the sentinel glyph.
pub fn fd_select_format3(ranges: &[(u16, u8)], sentinel: u16) -> Vec<u8> {
    let mut buf = BeBuffer::new().push(3u8).push(ranges.len() as u16);
    for (first, fd) in ranges {
        buf = buf.push(*first).push(*fd);
    }
    buf.push(sentinel).to_vec()
}

/// Canned charstrings.
pub mod charstrings {
    /// `500 100 0 rmoveto 50 0 rlineto 0 50 rlineto endchar`
    ///
    /// One triangular contour with an advance width operand of 500.
    #[rustfmt::skip]
    pub static TRIANGLE: &[u8] = &[
        248, 136,       // 500 (width)
        239, 139,       // 100 0
        21,             // rmoveto
        189, 139,       // 50 0
        5,              // rlineto
        139, 189,       // 0 50
        5,              // rlineto
        14,             // endchar
    ];

    /// `0 0 rmoveto 100 hlineto 100 vlineto -100 hlineto endchar`
    ///
    /// A 100 unit square without a width operand.
    #[rustfmt::skip]
    pub static SQUARE: &[u8] = &[
        139, 139, 21,   // 0 0 rmoveto
        239, 6,         // 100 hlineto
        239, 7,         // 100 vlineto
        39, 6,          // -100 hlineto
        14,             // endchar
    ];

    /// `10 20 rmoveto 0 0 30 40 50 60 rrcurveto endchar`
    #[rustfmt::skip]
    pub static CURVE: &[u8] = &[
        149, 159, 21,                   // 10 20 rmoveto
        139, 139, 169, 179, 189, 199,   // 0 0 30 40 50 60
        8,                              // rrcurveto
        14,                             // endchar
    ];

    /// A subroutine that calls itself through `callsubr`.
    ///
    /// With a local subrs INDEX of one entry the bias is 107, so the operand
    /// -107 selects subroutine 0.
    #[rustfmt::skip]
    pub static SELF_CALLING_SUBR: &[u8] = &[
        32,     // -107
        10,     // callsubr
        11,     // return
    ];
}

//! Locating the charstring and subfont for a glyph.

use std::borrow::Cow;

use font_types::{Fixed, GlyphId};

use crate::{
    error::{Error, FontDataError},
    fd_select::FdSelect,
    index::Index,
};

/// Number of codes in the Adobe standard encoding.
const STANDARD_ENCODING_LEN: usize = 256;

/// Backing storage for charstrings.
///
/// Every successful [`fetch`](Self::fetch) is balanced by exactly one call
/// to [`release`](Self::release) once the loader is finished with the
/// bytes, whether or not the load succeeds.
pub trait CharstringStore {
    /// Returns the number of glyphs in the store.
    fn count(&self) -> u32;

    /// Returns the charstring for the given glyph. Memory resident stores
    /// return borrowed data; streamed stores may return owned data.
    fn fetch(&self, glyph_id: GlyphId) -> Result<Cow<'_, [u8]>, Error>;

    /// Signals that the data returned by `fetch` for the glyph is no longer
    /// in use.
    fn release(&self, glyph_id: GlyphId) {
        let _ = glyph_id;
    }
}

impl CharstringStore for Index<'_> {
    fn count(&self) -> u32 {
        Index::count(self)
    }

    fn fetch(&self, glyph_id: GlyphId) -> Result<Cow<'_, [u8]>, Error> {
        Ok(Cow::Borrowed(self.get(glyph_id.to_u32() as usize)?))
    }
}

/// Data associated with a single font DICT.
///
/// Non CID-keyed fonts have exactly one subfont.
#[derive(Clone, Debug)]
pub struct Subfont<'a> {
    local_subrs: Option<Index<'a>>,
    default_width_x: Fixed,
    nominal_width_x: Fixed,
}

impl<'a> Subfont<'a> {
    /// Creates a subfont with no local subroutines and zero widths.
    pub fn new() -> Self {
        Self {
            local_subrs: None,
            default_width_x: Fixed::ZERO,
            nominal_width_x: Fixed::ZERO,
        }
    }

    pub fn with_local_subrs(mut self, local_subrs: Index<'a>) -> Self {
        self.local_subrs = Some(local_subrs);
        self
    }

    /// Sets the `defaultWidthX` and `nominalWidthX` values from the
    /// Private DICT.
    pub fn with_widths(mut self, default_width_x: Fixed, nominal_width_x: Fixed) -> Self {
        self.default_width_x = default_width_x;
        self.nominal_width_x = nominal_width_x;
        self
    }

    pub fn local_subrs(&self) -> Option<&Index<'a>> {
        self.local_subrs.as_ref()
    }

    pub fn default_width_x(&self) -> Fixed {
        self.default_width_x
    }

    pub fn nominal_width_x(&self) -> Fixed {
        self.nominal_width_x
    }
}

impl Default for Subfont<'_> {
    fn default() -> Self {
        Self::new()
    }
}

/// Immutable tables required to load glyphs from a single font.
///
/// These are parsed once by the caller and may be shared between threads;
/// loading never mutates them.
#[derive(Clone, Debug)]
pub struct FontTables<'a, S = Index<'a>> {
    charstrings: S,
    global_subrs: Index<'a>,
    subfonts: Vec<Subfont<'a>>,
    fd_select: Option<FdSelect<'a>>,
    seac_map: Option<Vec<Option<GlyphId>>>,
    units_per_em: u16,
    vertical_advance: Option<Fixed>,
}

impl<'a, S: CharstringStore> FontTables<'a, S> {
    /// Creates tables for a font with a single Private DICT.
    pub fn new(charstrings: S, global_subrs: Index<'a>, subfont: Subfont<'a>) -> Self {
        Self {
            charstrings,
            global_subrs,
            subfonts: vec![subfont],
            fd_select: None,
            seac_map: None,
            units_per_em: 1000,
            vertical_advance: None,
        }
    }

    /// Creates tables for a CID-keyed font where each glyph selects one of
    /// `subfonts` through `fd_select`.
    pub fn new_cid(
        charstrings: S,
        global_subrs: Index<'a>,
        subfonts: Vec<Subfont<'a>>,
        fd_select: FdSelect<'a>,
    ) -> Self {
        Self {
            subfonts,
            fd_select: Some(fd_select),
            ..Self::new(charstrings, global_subrs, Subfont::new())
        }
    }

    /// Sets the mapping from standard encoding codes to glyphs used to
    /// resolve the components of accented glyphs.
    ///
    /// Codes without an entry do not map to a glyph. Without a map, codes
    /// are used directly as glyph identifiers.
    pub fn with_seac_map(mut self, entries: impl IntoIterator<Item = (u8, GlyphId)>) -> Self {
        let mut map = vec![None; STANDARD_ENCODING_LEN];
        for (code, glyph_id) in entries {
            map[code as usize] = Some(glyph_id);
        }
        self.seac_map = Some(map);
        self
    }

    pub fn with_units_per_em(mut self, units_per_em: u16) -> Self {
        self.units_per_em = units_per_em;
        self
    }

    /// Sets the vertical advance used when synthesizing vertical metrics.
    pub fn with_vertical_advance(mut self, advance: Fixed) -> Self {
        self.vertical_advance = Some(advance);
        self
    }

    pub fn charstrings(&self) -> &S {
        &self.charstrings
    }

    pub fn global_subrs(&self) -> &Index<'a> {
        &self.global_subrs
    }

    pub fn is_cid(&self) -> bool {
        self.fd_select.is_some()
    }

    pub fn units_per_em(&self) -> u16 {
        self.units_per_em
    }

    /// Returns the vertical advance, defaulting to the units per em.
    pub fn vertical_advance(&self) -> Fixed {
        self.vertical_advance
            .unwrap_or_else(|| Fixed::from_i32(self.units_per_em as i32))
    }

    /// Returns the number of glyphs in the font.
    pub fn glyph_count(&self) -> u32 {
        self.charstrings.count()
    }

    /// Maps a standard encoding code from an accented glyph to a glyph
    /// identifier.
    pub fn seac_glyph(&self, code: i32) -> Option<GlyphId> {
        let code = usize::try_from(code)
            .ok()
            .filter(|code| *code < STANDARD_ENCODING_LEN)?;
        match &self.seac_map {
            // CID-keyed fonts have no encoding
            _ if self.is_cid() => Some(GlyphId::new(code as u32)),
            Some(map) => map[code],
            None => Some(GlyphId::new(code as u32)),
        }
    }

    /// Returns the subfont that supplies subroutines and widths for the
    /// given glyph.
    pub fn subfont(&self, glyph_id: GlyphId) -> Result<&Subfont<'a>, Error> {
        let fd_index = match &self.fd_select {
            Some(fd_select) => fd_select
                .font_index(glyph_id)
                .ok_or(FontDataError::MissingFontDict(glyph_id))?,
            None => 0,
        };
        Ok(self
            .subfonts
            .get(fd_index as usize)
            .ok_or(FontDataError::InvalidFontDictIndex(fd_index))?)
    }

    /// Returns the charstring and subfont for the given glyph.
    ///
    /// The charstring is released back to the store when the returned
    /// value is dropped.
    pub fn locate(&self, glyph_id: GlyphId) -> Result<GlyphData<'_, S>, Error> {
        if glyph_id.to_u32() >= self.glyph_count() {
            return Err(Error::InvalidGlyphIndex(glyph_id));
        }
        let subfont = self.subfont(glyph_id)?;
        let charstring = self.charstrings.fetch(glyph_id)?;
        log::trace!(
            "located glyph {glyph_id}: {} bytes, streamed: {}",
            charstring.len(),
            matches!(charstring, Cow::Owned(_))
        );
        Ok(GlyphData {
            store: &self.charstrings,
            glyph_id,
            charstring,
            subfont,
        })
    }
}

/// Charstring for a located glyph along with its subfont.
///
/// Dropping this releases the charstring back to its store.
pub struct GlyphData<'t, S: CharstringStore> {
    store: &'t S,
    glyph_id: GlyphId,
    charstring: Cow<'t, [u8]>,
    subfont: &'t Subfont<'t>,
}

impl<'t, S: CharstringStore> GlyphData<'t, S> {
    pub fn glyph_id(&self) -> GlyphId {
        self.glyph_id
    }

    pub fn charstring(&self) -> &[u8] {
        &self.charstring
    }

    pub fn subfont(&self) -> &'t Subfont<'t> {
        self.subfont
    }
}

impl<S: CharstringStore> Drop for GlyphData<'_, S> {
    fn drop(&mut self) {
        self.store.release(self.glyph_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use charstring_test_data::{charstrings, fd_select_format3, index};
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Store that hands out owned copies and counts outstanding fetches.
    struct StreamedStore {
        glyphs: Vec<Vec<u8>>,
        outstanding: AtomicUsize,
    }

    impl CharstringStore for StreamedStore {
        fn count(&self) -> u32 {
            self.glyphs.len() as u32
        }

        fn fetch(&self, glyph_id: GlyphId) -> Result<Cow<'_, [u8]>, Error> {
            let data = self
                .glyphs
                .get(glyph_id.to_u32() as usize)
                .ok_or(Error::InvalidGlyphIndex(glyph_id))?;
            self.outstanding.fetch_add(1, Ordering::SeqCst);
            Ok(Cow::Owned(data.clone()))
        }

        fn release(&self, _glyph_id: GlyphId) {
            self.outstanding.fetch_sub(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn locate_from_index() {
        let charstrings = index(&[charstrings::TRIANGLE, charstrings::SQUARE]);
        let empty = index::<&[u8]>(&[]);
        let tables = FontTables::new(
            Index::new(&charstrings).unwrap(),
            Index::new(&empty).unwrap(),
            Subfont::new(),
        );
        let glyph = tables.locate(GlyphId::new(1)).unwrap();
        assert_eq!(glyph.charstring(), charstrings::SQUARE);
        assert!(matches!(
            tables.locate(GlyphId::new(2)),
            Err(Error::InvalidGlyphIndex(_))
        ));
    }

    #[test]
    fn streamed_data_is_released_on_drop() {
        let empty = index::<&[u8]>(&[]);
        let store = StreamedStore {
            glyphs: vec![charstrings::TRIANGLE.to_vec()],
            outstanding: AtomicUsize::new(0),
        };
        let tables = FontTables::new(store, Index::new(&empty).unwrap(), Subfont::new());
        let glyph = tables.locate(GlyphId::new(0)).unwrap();
        assert_eq!(glyph.charstring(), charstrings::TRIANGLE);
        assert_eq!(tables.charstrings().outstanding.load(Ordering::SeqCst), 1);
        drop(glyph);
        assert_eq!(tables.charstrings().outstanding.load(Ordering::SeqCst), 0);
        // failed lookups never fetch
        assert!(tables.locate(GlyphId::new(1)).is_err());
        assert_eq!(tables.charstrings().outstanding.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn cid_subfont_selection() {
        let charstrings = index(&[charstrings::TRIANGLE; 4]);
        let empty = index::<&[u8]>(&[]);
        let fd_select_data = fd_select_format3(&[(0, 1), (2, 0), (3, 5)], 4);
        let subfonts = vec![
            Subfont::new().with_widths(Fixed::from_i32(100), Fixed::ZERO),
            Subfont::new().with_widths(Fixed::from_i32(200), Fixed::ZERO),
        ];
        let tables = FontTables::new_cid(
            Index::new(&charstrings).unwrap(),
            Index::new(&empty).unwrap(),
            subfonts,
            FdSelect::new(&fd_select_data, 4).unwrap(),
        );
        let width_for = |gid: u32| {
            tables
                .locate(GlyphId::new(gid))
                .map(|glyph| glyph.subfont().default_width_x())
        };
        assert_eq!(width_for(0), Ok(Fixed::from_i32(200)));
        assert_eq!(width_for(1), Ok(Fixed::from_i32(200)));
        assert_eq!(width_for(2), Ok(Fixed::from_i32(100)));
        assert_eq!(
            width_for(3),
            Err(Error::InvalidFontData(FontDataError::InvalidFontDictIndex(5)))
        );
    }

    #[test]
    fn seac_codes() {
        let charstrings = index(&[charstrings::TRIANGLE]);
        let empty = index::<&[u8]>(&[]);
        let tables = FontTables::new(
            Index::new(&charstrings).unwrap(),
            Index::new(&empty).unwrap(),
            Subfont::new(),
        );
        assert_eq!(tables.seac_glyph(65), Some(GlyphId::new(65)));
        assert_eq!(tables.seac_glyph(256), None);
        assert_eq!(tables.seac_glyph(-1), None);
        let tables = tables.with_seac_map([(65, GlyphId::new(3))]);
        assert_eq!(tables.seac_glyph(65), Some(GlyphId::new(3)));
        assert_eq!(tables.seac_glyph(66), None);
    }
}

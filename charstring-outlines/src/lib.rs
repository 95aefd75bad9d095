//! Glyph outlines from CFF Type 2 charstrings.
//!
//! This crate evaluates the charstring programs found in the `CFF ` table
//! and produces a glyph [`Outline`] along with its advance width and
//! bounding box. It does not parse the containing font: callers describe
//! where charstrings and subroutines live with [`FontTables`] and then
//! call [`load`] for each glyph.
//!
//! ```
//! use charstring_outlines::{load, FontTables, Index, LoadSettings, Subfont};
//! use charstring_outlines::types::GlyphId;
//!
//! // An INDEX holding a single charstring: `100 0 rmoveto 50 0 rlineto
//! // 0 50 rlineto endchar`
//! let data: &[u8] = &[
//!     0, 1, 1, 1, 11, 239, 139, 21, 189, 139, 5, 139, 189, 5, 14,
//! ];
//! let empty: &[u8] = &[0, 0];
//! let tables = FontTables::new(
//!     Index::new(data).unwrap(),
//!     Index::new(empty).unwrap(),
//!     Subfont::new(),
//! );
//! let glyph = load(&tables, GlyphId::new(0), &LoadSettings::default(), None).unwrap();
//! assert_eq!(glyph.outline.points().len(), 3);
//! ```
//!
//! Hinting is delegated to an optional [`HintHook`] which receives stem
//! hints and masks as they are encountered.

#![forbid(unsafe_code)]

pub mod error;
pub mod outline;

mod builder;
mod charstring;
mod composite;
mod cursor;
mod fd_select;
mod hint;
mod index;
mod load;
mod locate;
mod pen;
mod stack;

/// Expose the underlying font types crate.
pub extern crate font_types as types;

pub use builder::OutlineBuilder;
pub use charstring::{NESTING_DEPTH_LIMIT, TRANSIENT_ARRAY_SIZE};
pub use error::{CharstringError, Error, FontDataError, StackFault};
pub use fd_select::FdSelect;
pub use hint::{HintError, HintHook, StemKind};
pub use index::Index;
pub use load::{load, Component, LoadFlags, LoadSettings, LoadedGlyph, VerticalMetrics};
pub use locate::{CharstringStore, FontTables, GlyphData, Subfont};
pub use outline::{Contour, Outline, PointTag, ToPathError};
pub use pen::{OutlinePen, PathElement};
pub use stack::MAX_STACK;

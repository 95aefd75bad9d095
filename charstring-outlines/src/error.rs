//! Error types associated with loading charstring outlines.

use font_types::GlyphId;
use thiserror::Error;

pub use crate::hint::HintError;

/// Errors that may occur when loading a glyph.
#[derive(Clone, PartialEq, Eq, Debug, Error)]
pub enum Error {
    /// The requested glyph was not present in the charstrings INDEX.
    #[error("glyph {0} is out of range")]
    InvalidGlyphIndex(GlyphId),
    /// An INDEX, FDSelect or font DICT array was malformed.
    #[error("invalid font data: {0}")]
    InvalidFontData(#[from] FontDataError),
    /// The charstring program itself was malformed.
    #[error("malformed charstring: {0}")]
    MalformedCharstring(#[from] CharstringError),
    /// Operand stack overflow or underflow, or an invalid arithmetic
    /// operation.
    #[error("operand stack fault: {0}")]
    StackFault(#[from] StackFault),
    /// Subroutine calls or composite components were nested too deeply.
    #[error("nesting depth limit ({limit}) exceeded")]
    RecursionTooDeep { limit: u32 },
    /// Growing the outline storage failed.
    #[error("exceeded memory limits while building the outline")]
    OutOfMemory,
    /// The hint hook reported a fatal condition.
    #[error("hinting failed: {0}")]
    Hinting(HintError),
}

/// Errors produced when reading the tables that locate charstrings.
#[derive(Clone, PartialEq, Eq, Debug, Error)]
pub enum FontDataError {
    #[error("read out of bounds")]
    OutOfBounds,
    #[error("invalid offset size of {0} for INDEX (expected 1-4)")]
    InvalidIndexOffsetSize(u8),
    #[error("invalid offset of 0 in INDEX (must be >= 1)")]
    ZeroOffset,
    #[error("offsets for INDEX object {0} are not in ascending order")]
    UnorderedOffsets(usize),
    #[error("unsupported FDSelect format {0}")]
    InvalidFdSelectFormat(u8),
    #[error("FDSelect has no font DICT for glyph {0}")]
    MissingFontDict(GlyphId),
    #[error("font DICT index {0} is out of range")]
    InvalidFontDictIndex(u16),
}

/// Structural problems found while executing a charstring.
#[derive(Clone, PartialEq, Eq, Debug, Error)]
pub enum CharstringError {
    #[error("invalid charstring operator {0}")]
    InvalidOperator(u8),
    #[error("invalid charstring operator 12 {0}")]
    InvalidEscapeOperator(u8),
    #[error("unexpected end of charstring data")]
    UnexpectedEnd,
    #[error("charstring ended without endchar")]
    Unterminated,
    #[error("wrong number of operands for {0}")]
    OperandCount(&'static str),
    #[error("callsubr used without a local subroutine INDEX")]
    MissingSubroutines,
    #[error("subroutine index {0} is out of range")]
    InvalidSubroutine(i32),
    #[error("point added with no open contour")]
    NoOpenContour,
    #[error("accent composition code {0} does not map to a glyph")]
    InvalidSeacCode(i32),
}

/// Faults detected by the operand stack machine.
#[derive(Clone, PartialEq, Eq, Debug, Error)]
pub enum StackFault {
    #[error("stack overflow")]
    Overflow,
    #[error("stack underflow")]
    Underflow,
    #[error("division by zero")]
    DivideByZero,
    #[error("transient array index {0} is out of range")]
    InvalidTransientIndex(i32),
    #[error("invalid operand for {0}")]
    InvalidOperand(&'static str),
}

//! Interface to an external hinting engine.
//!
//! The loader does not interpret hints itself. Stem hints and masks are
//! forwarded, as they appear in the charstring, to a caller supplied
//! [`HintHook`].

use font_types::{Fixed, GlyphId};
use thiserror::Error;

use crate::{error::Error, outline::Outline};

/// Direction of a stem hint.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum StemKind {
    /// Stems from `hstem` and `hstemhm`.
    Horizontal,
    /// Stems from `vstem`, `vstemhm` and the implied stems preceding a
    /// hint or counter mask.
    Vertical,
}

/// Failure reported by a hint hook.
#[derive(Clone, PartialEq, Eq, Debug, Error)]
pub enum HintError {
    /// Hinting could not be applied but the unhinted outline is usable.
    #[error("{0}")]
    Advisory(String),
    /// The hook requires the load to fail.
    #[error("{0}")]
    Fatal(String),
}

impl HintError {
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Fatal(_))
    }
}

/// Receiver for the hinting operators of a charstring.
///
/// All methods have empty default implementations.
pub trait HintHook {
    /// Called once before the glyph is evaluated.
    fn open(&mut self, glyph_id: GlyphId) -> Result<(), HintError> {
        let _ = glyph_id;
        Ok(())
    }

    /// Receives the operands of a stem hint operator. Values are
    /// alternating edge and width deltas, exactly as they appear on the
    /// operand stack with any advance width removed.
    fn stems(&mut self, kind: StemKind, values: &[Fixed]) -> Result<(), HintError> {
        let _ = (kind, values);
        Ok(())
    }

    /// Receives the mask bytes following a `hintmask` operator.
    fn hint_mask(&mut self, mask: &[u8]) -> Result<(), HintError> {
        let _ = mask;
        Ok(())
    }

    /// Receives the mask bytes following a `cntrmask` operator.
    fn counter_mask(&mut self, mask: &[u8]) -> Result<(), HintError> {
        let _ = mask;
        Ok(())
    }

    /// Discards all hints received so far. Called before each component of
    /// an accented glyph.
    fn clear_hints(&mut self) -> Result<(), HintError> {
        Ok(())
    }

    /// Called with the completed outline, which the hook may modify.
    fn close(&mut self, outline: &mut Outline) -> Result<(), HintError> {
        let _ = outline;
        Ok(())
    }
}

/// Dispatches to an optional hint hook.
///
/// An advisory failure disables the hook for the remainder of the glyph.
pub(crate) struct HintSink<'h> {
    hook: Option<&'h mut dyn HintHook>,
}

impl<'h> HintSink<'h> {
    pub fn new(hook: Option<&'h mut dyn HintHook>) -> Self {
        Self { hook }
    }

    pub fn is_active(&self) -> bool {
        self.hook.is_some()
    }

    pub fn call(
        &mut self,
        f: impl FnOnce(&mut dyn HintHook) -> Result<(), HintError>,
    ) -> Result<(), Error> {
        let Some(hook) = self.hook.as_deref_mut() else {
            return Ok(());
        };
        match f(hook) {
            Ok(()) => Ok(()),
            Err(e) if e.is_fatal() => Err(Error::Hinting(e)),
            Err(e) => {
                log::warn!("hinting disabled for this glyph: {e}");
                self.hook = None;
                Ok(())
            }
        }
    }
}

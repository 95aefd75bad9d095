//! Composition of accented glyphs.
//!
//! A charstring may end with the operands of the legacy `seac` operator,
//! which builds the glyph from a base and an accent glyph, both named by
//! their code in the Adobe standard encoding.
//!
//! See "Appendix C Compatibility and Deprecated Operators" at
//! <https://adobe-type-tools.github.io/font-tech-notes/pdfs/5177.Type2.pdf#page=35>

use font_types::{Fixed, GlyphId, Point};

use crate::{
    charstring::Interpreter,
    error::{CharstringError, Error},
    load::{Component, LoadContext},
    locate::CharstringStore,
};

/// Operands of an accented character.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub(crate) struct Accent {
    pub base_code: i32,
    pub accent_code: i32,
    /// Position of the accent relative to the base glyph.
    pub offset: Point<Fixed>,
}

/// Loads the base and accent glyphs into the shared outline.
///
/// The base is placed at the current origin and the accent at its offset.
/// When the builder does not recurse, the components are recorded instead.
pub(crate) fn compose<S: CharstringStore>(
    ctx: &mut LoadContext<'_, '_, S>,
    accent: Accent,
    depth: u32,
) -> Result<(), Error> {
    let tables = ctx.tables;
    let resolve = |code: i32| -> Result<GlyphId, Error> {
        tables
            .seac_glyph(code)
            .ok_or_else(|| CharstringError::InvalidSeacCode(code).into())
    };
    let components = [
        Component {
            glyph_id: resolve(accent.base_code)?,
            offset: Point::default(),
        },
        Component {
            glyph_id: resolve(accent.accent_code)?,
            offset: accent.offset,
        },
    ];
    log::debug!(
        "composing glyph {} + {} at ({}, {})",
        components[0].glyph_id,
        components[1].glyph_id,
        accent.offset.x,
        accent.offset.y
    );
    if ctx.builder.no_recurse() {
        ctx.components.extend(components);
        return Ok(());
    }
    let depth = depth + 1;
    if depth > ctx.depth_limit {
        return Err(Error::RecursionTooDeep {
            limit: ctx.depth_limit,
        });
    }
    ctx.builder.commit_current()?;
    let origin = ctx.builder.translation();
    let result = components
        .iter()
        .try_for_each(|component| load_component(ctx, component, origin, depth));
    ctx.builder.set_translation(origin.0, origin.1);
    result
}

fn load_component<S: CharstringStore>(
    ctx: &mut LoadContext<'_, '_, S>,
    component: &Component,
    origin: (Fixed, Fixed),
    depth: u32,
) -> Result<(), Error> {
    let tables = ctx.tables;
    ctx.hints.call(|hook| hook.clear_hints())?;
    ctx.builder.set_translation(
        origin.0.wrapping_add(component.offset.x),
        origin.1.wrapping_add(component.offset.y),
    );
    let glyph = tables.locate(component.glyph_id)?;
    Interpreter::new(ctx, glyph.subfont(), true).run(glyph.charstring(), depth)?;
    ctx.builder.commit_current()
}

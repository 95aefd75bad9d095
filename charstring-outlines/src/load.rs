//! Loading glyph outlines and metrics.

use font_types::{BoundingBox, Fixed, GlyphId, Point};

use crate::{
    builder::OutlineBuilder,
    charstring::{Interpreter, NESTING_DEPTH_LIMIT},
    error::Error,
    hint::{HintHook, HintSink},
    locate::{CharstringStore, FontTables},
    outline::Outline,
};

/// Flags that control how a glyph is loaded.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Default)]
pub struct LoadFlags(u32);

impl LoadFlags {
    /// Leave the outline and metrics in font units, ignoring any scale in
    /// the load settings.
    pub const NO_SCALE: Self = Self(0x0001);

    /// Do not invoke the hint hook.
    pub const NO_HINTING: Self = Self(0x0002);

    /// Report the components of accented glyphs instead of loading their
    /// outlines.
    pub const NO_RECURSE: Self = Self(0x0004);

    /// Compute only the advance and bounding box. Implies `NO_HINTING`.
    pub const METRICS_ONLY: Self = Self(0x0008);

    /// Synthesize vertical metrics.
    pub const VERTICAL_LAYOUT: Self = Self(0x0010);

    const ALL: u32 = 0x001F;

    pub const fn empty() -> Self {
        Self(0)
    }

    pub const fn bits(self) -> u32 {
        self.0
    }

    /// Creates flags from raw bits, dropping any that are undefined.
    pub const fn from_bits_truncate(bits: u32) -> Self {
        Self(bits & Self::ALL)
    }

    /// Returns `true` if all of the flags in `other` are contained within `self`.
    #[inline]
    pub const fn contains(self, other: Self) -> bool {
        (self.0 & other.0) == other.0
    }
}

impl std::ops::BitOr for LoadFlags {
    type Output = Self;

    /// Returns the union of the two sets of flags.
    #[inline]
    fn bitor(self, other: LoadFlags) -> Self {
        Self(self.0 | other.0)
    }
}

impl std::ops::BitOrAssign for LoadFlags {
    /// Adds the set of flags.
    #[inline]
    fn bitor_assign(&mut self, other: Self) {
        self.0 |= other.0;
    }
}

impl std::fmt::Debug for LoadFlags {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        const NAMES: [(LoadFlags, &str); 5] = [
            (LoadFlags::NO_SCALE, "NO_SCALE"),
            (LoadFlags::NO_HINTING, "NO_HINTING"),
            (LoadFlags::NO_RECURSE, "NO_RECURSE"),
            (LoadFlags::METRICS_ONLY, "METRICS_ONLY"),
            (LoadFlags::VERTICAL_LAYOUT, "VERTICAL_LAYOUT"),
        ];
        let mut set = f.debug_set();
        for (flag, name) in NAMES {
            if self.contains(flag) {
                set.entry(&format_args!("{name}"));
            }
        }
        set.finish()
    }
}

/// Configuration for loading a glyph.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub struct LoadSettings {
    flags: LoadFlags,
    scale: Option<Fixed>,
    depth_limit: u32,
    random_seed: u32,
}

impl LoadSettings {
    pub fn new(flags: LoadFlags) -> Self {
        Self {
            flags,
            ..Default::default()
        }
    }

    /// Multiplies the outline and metrics by the given 16.16 scale factor
    /// unless `NO_SCALE` is set.
    pub fn with_scale(mut self, scale: Fixed) -> Self {
        self.scale = Some(scale);
        self
    }

    /// Lowers the nesting limit for subroutine calls and accent
    /// components. Values above [`NESTING_DEPTH_LIMIT`] are clamped.
    pub fn with_depth_limit(mut self, limit: u32) -> Self {
        self.depth_limit = limit.min(NESTING_DEPTH_LIMIT);
        self
    }

    /// Sets the seed for the charstring `random` operator.
    pub fn with_random_seed(mut self, seed: u32) -> Self {
        self.random_seed = seed;
        self
    }

    pub fn flags(&self) -> LoadFlags {
        self.flags
    }

    pub fn scale(&self) -> Option<Fixed> {
        self.scale
    }

    pub fn depth_limit(&self) -> u32 {
        self.depth_limit
    }

    pub fn random_seed(&self) -> u32 {
        self.random_seed
    }
}

impl Default for LoadSettings {
    fn default() -> Self {
        Self {
            flags: LoadFlags::empty(),
            scale: None,
            depth_limit: NESTING_DEPTH_LIMIT,
            random_seed: 0,
        }
    }
}

/// Glyph referenced by an accented glyph that was loaded with
/// [`LoadFlags::NO_RECURSE`].
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub struct Component {
    pub glyph_id: GlyphId,
    /// Offset of the component relative to the glyph origin.
    pub offset: Point<Fixed>,
}

/// Metrics for vertical layout.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub struct VerticalMetrics {
    /// Offset from the vertical origin to the top left of the bounding box.
    pub bearing: Point<Fixed>,
    pub advance: Fixed,
}

/// Result of loading a glyph.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct LoadedGlyph {
    /// Empty for metrics-only loads.
    pub outline: Outline,
    /// Components of an accented glyph loaded with `NO_RECURSE`.
    pub components: Vec<Component>,
    pub left_side_bearing: Point<Fixed>,
    pub advance: Point<Fixed>,
    /// Control box of the outline, or `None` if the glyph has no points.
    pub bbox: Option<BoundingBox<Fixed>>,
    /// Present when loaded with `VERTICAL_LAYOUT`.
    pub vertical: Option<VerticalMetrics>,
}

/// State shared by everything that runs while loading a single glyph.
pub(crate) struct LoadContext<'a, 'h, S> {
    pub tables: &'a FontTables<'a, S>,
    pub builder: OutlineBuilder,
    pub hints: HintSink<'h>,
    pub depth_limit: u32,
    pub random_state: u32,
    pub components: Vec<Component>,
}

/// Loads the outline and metrics for a glyph.
///
/// Hinting operators are forwarded to `hints` unless the settings include
/// `NO_HINTING` or `METRICS_ONLY`. Any charstring data fetched from the
/// store is released before this returns, whether or not the load
/// succeeds.
pub fn load<S: CharstringStore>(
    tables: &FontTables<'_, S>,
    glyph_id: GlyphId,
    settings: &LoadSettings,
    hints: Option<&mut dyn HintHook>,
) -> Result<LoadedGlyph, Error> {
    let flags = settings.flags();
    let metrics_only = flags.contains(LoadFlags::METRICS_ONLY);
    let hints = if metrics_only || flags.contains(LoadFlags::NO_HINTING) {
        None
    } else {
        hints
    };
    log::debug!("loading glyph {glyph_id} with flags {flags:?}");
    let glyph = tables.locate(glyph_id)?;
    let mut ctx = LoadContext {
        tables,
        builder: OutlineBuilder::new(!metrics_only)
            .with_no_recurse(flags.contains(LoadFlags::NO_RECURSE)),
        hints: HintSink::new(hints),
        depth_limit: settings.depth_limit(),
        random_state: settings.random_seed(),
        components: Vec::new(),
    };
    ctx.hints.call(|hook| hook.open(glyph_id))?;
    Interpreter::new(&mut ctx, glyph.subfont(), false).run(glyph.charstring(), 0)?;
    drop(glyph);
    let LoadContext {
        builder,
        mut hints,
        components,
        ..
    } = ctx;
    let mut advance = builder.advance();
    let mut left_bearing = builder.left_bearing();
    let (mut outline, mut bbox) = builder.finish()?;
    hints.call(|hook| hook.close(&mut outline))?;
    let mut vertical_advance = tables.vertical_advance();
    if let Some(scale) = settings.scale() {
        if !flags.contains(LoadFlags::NO_SCALE) {
            outline.scale(scale);
            advance = advance * scale;
            left_bearing = left_bearing * scale;
            bbox = bbox.map(|bbox| bbox.scale(scale));
            vertical_advance = vertical_advance * scale;
        }
    }
    // The bearing follows the control box when the glyph has points
    let left_side_bearing = match bbox {
        Some(bbox) => Point::new(bbox.x_min, Fixed::ZERO),
        None => left_bearing,
    };
    let vertical = flags
        .contains(LoadFlags::VERTICAL_LAYOUT)
        .then(|| synthesize_vertical_metrics(left_side_bearing, advance, bbox, vertical_advance));
    log::debug!(
        "loaded glyph {glyph_id}: {} points, {} contours, advance {}",
        outline.points().len(),
        outline.contour_ends().len(),
        advance.x
    );
    Ok(LoadedGlyph {
        outline,
        components,
        left_side_bearing,
        advance,
        bbox,
        vertical,
    })
}

/// Computes vertical metrics from horizontal ones, centering the glyph
/// horizontally and vertically within the vertical advance, as FreeType
/// does for fonts without vertical metrics tables.
fn synthesize_vertical_metrics(
    left_side_bearing: Point<Fixed>,
    advance: Point<Fixed>,
    bbox: Option<BoundingBox<Fixed>>,
    vertical_advance: Fixed,
) -> VerticalMetrics {
    let half = |value: Fixed| Fixed::from_bits(value.to_bits() / 2);
    let height = bbox
        .map(|bbox| bbox.y_max.wrapping_sub(bbox.y_min))
        .unwrap_or(Fixed::ZERO);
    VerticalMetrics {
        bearing: Point::new(
            left_side_bearing.x.wrapping_sub(half(advance.x)),
            half(vertical_advance.wrapping_sub(height)),
        ),
        advance: vertical_advance,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags() {
        let flags = LoadFlags::NO_HINTING | LoadFlags::METRICS_ONLY;
        assert!(flags.contains(LoadFlags::METRICS_ONLY));
        assert!(!flags.contains(LoadFlags::NO_SCALE));
        assert_eq!(LoadFlags::from_bits_truncate(0xFFFF_FFFF).bits(), 0x1F);
        assert_eq!(format!("{flags:?}"), "{NO_HINTING, METRICS_ONLY}");
    }

    #[test]
    fn depth_limit_only_lowers() {
        assert_eq!(LoadSettings::default().depth_limit(), NESTING_DEPTH_LIMIT);
        assert_eq!(LoadSettings::default().with_depth_limit(3).depth_limit(), 3);
        assert_eq!(
            LoadSettings::default().with_depth_limit(64).depth_limit(),
            NESTING_DEPTH_LIMIT
        );
    }

    #[test]
    fn vertical_metrics() {
        let fixed = Fixed::from_i32;
        let bbox = BoundingBox {
            x_min: fixed(100),
            y_min: fixed(0),
            x_max: fixed(150),
            y_max: fixed(600),
        };
        let metrics = synthesize_vertical_metrics(
            Point::new(fixed(100), fixed(0)),
            Point::new(fixed(500), fixed(0)),
            Some(bbox),
            fixed(1000),
        );
        assert_eq!(metrics.bearing, Point::new(fixed(-150), fixed(200)));
        assert_eq!(metrics.advance, fixed(1000));
    }
}

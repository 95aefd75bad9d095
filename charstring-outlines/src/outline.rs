//! Outline representation produced by the loader.

use font_types::{BoundingBox, Fixed, Point};
use thiserror::Error;

use crate::pen::OutlinePen;

/// Tag for a point in an outline.
///
/// This is the same encoding FreeType uses: quadratic off-curve points are
/// signified by the absence of both the on-curve and cubic bits.
#[derive(Copy, Clone, PartialEq, Eq, Default, Debug)]
pub struct PointTag(u8);

impl PointTag {
    const ON_CURVE: u8 = 0x01;
    const OFF_CURVE_CUBIC: u8 = 0x80;
    const CURVE_MASK: u8 = Self::ON_CURVE | Self::OFF_CURVE_CUBIC;

    /// Creates a new on curve point tag.
    pub const fn on_curve() -> Self {
        Self(Self::ON_CURVE)
    }

    /// Creates a new off curve quadratic point tag.
    pub const fn off_curve_quad() -> Self {
        Self(0)
    }

    /// Creates a new off curve cubic point tag.
    pub const fn off_curve_cubic() -> Self {
        Self(Self::OFF_CURVE_CUBIC)
    }

    /// Creates a point tag from the given bits. Unknown bits are dropped.
    pub const fn from_bits(bits: u8) -> Self {
        Self(bits & Self::CURVE_MASK)
    }

    pub const fn to_bits(self) -> u8 {
        self.0
    }

    #[inline]
    pub const fn is_on_curve(self) -> bool {
        self.0 & Self::ON_CURVE != 0
    }

    #[inline]
    pub const fn is_off_curve_quad(self) -> bool {
        self.0 & Self::CURVE_MASK == 0
    }

    #[inline]
    pub const fn is_off_curve_cubic(self) -> bool {
        self.0 & Self::OFF_CURVE_CUBIC != 0
    }
}

/// Errors that can occur when converting an outline to a sequence of
/// path commands.
#[derive(Clone, PartialEq, Eq, Debug, Error)]
pub enum ToPathError {
    #[error("expected quadratic off-curve point at index {0}")]
    ExpectedQuad(usize),
    #[error("expected quadratic off-curve or on-curve point at index {0}")]
    ExpectedQuadOrOnCurve(usize),
    #[error("expected cubic off-curve point at index {0}")]
    ExpectedCubic(usize),
}

/// Glyph outline as a set of contours of tagged points.
///
/// Points, tags and contour end indices are stored in parallel, in the
/// layout used by TrueType outlines. Each entry in `contours` is the index
/// of the last point of a contour; the entries are strictly increasing and
/// the last one is always `points.len() - 1`.
#[derive(Clone, PartialEq, Eq, Default, Debug)]
pub struct Outline {
    pub(crate) points: Vec<Point<Fixed>>,
    pub(crate) tags: Vec<PointTag>,
    pub(crate) contours: Vec<u16>,
}

impl Outline {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn points(&self) -> &[Point<Fixed>] {
        &self.points
    }

    pub fn tags(&self) -> &[PointTag] {
        &self.tags
    }

    /// Returns the index of the final point of each contour.
    pub fn contour_ends(&self) -> &[u16] {
        &self.contours
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Returns an iterator over the contours of the outline.
    pub fn contours(&self) -> impl Iterator<Item = Contour<'_>> + '_ {
        let mut start = 0;
        self.contours.iter().map(move |end| {
            let end = *end as usize + 1;
            let contour = Contour {
                points: &self.points[start..end],
                tags: &self.tags[start..end],
            };
            start = end;
            contour
        })
    }

    /// Returns the bounding box of all points, or `None` for an empty
    /// outline.
    pub fn control_box(&self) -> Option<BoundingBox<Fixed>> {
        let (first, rest) = self.points.split_first()?;
        let init = BoundingBox {
            x_min: first.x,
            y_min: first.y,
            x_max: first.x,
            y_max: first.y,
        };
        Some(rest.iter().fold(init, |bbox, p| BoundingBox {
            x_min: bbox.x_min.min(p.x),
            y_min: bbox.y_min.min(p.y),
            x_max: bbox.x_max.max(p.x),
            y_max: bbox.y_max.max(p.y),
        }))
    }

    pub fn translate(&mut self, dx: Fixed, dy: Fixed) {
        for point in &mut self.points {
            point.x = point.x.wrapping_add(dx);
            point.y = point.y.wrapping_add(dy);
        }
    }

    /// Multiplies every coordinate by the given 16.16 factor.
    pub fn scale(&mut self, factor: Fixed) {
        for point in &mut self.points {
            point.x = point.x * factor;
            point.y = point.y * factor;
        }
    }

    pub(crate) fn clear(&mut self) {
        self.points.clear();
        self.tags.clear();
        self.contours.clear();
    }

    /// Emits the outline as a sequence of path commands to the given pen.
    ///
    /// Consecutive quadratic off-curve points produce implied on-curve
    /// midpoints. Each contour is explicitly closed.
    pub fn draw(&self, pen: &mut impl OutlinePen) -> Result<(), ToPathError> {
        let mut first = 0;
        for end in &self.contours {
            let end = *end as usize + 1;
            draw_contour(&self.points[first..end], &self.tags[first..end], first, pen)?;
            first = end;
        }
        Ok(())
    }

    /// Converts the outline to a [`kurbo::BezPath`].
    #[cfg(feature = "kurbo")]
    pub fn to_bez_path(&self) -> Result<kurbo::BezPath, ToPathError> {
        let mut pen = BezPathPen(kurbo::BezPath::new());
        self.draw(&mut pen)?;
        Ok(pen.0)
    }
}

/// A single closed contour borrowed from an [`Outline`].
#[derive(Copy, Clone, Debug)]
pub struct Contour<'a> {
    pub points: &'a [Point<Fixed>],
    pub tags: &'a [PointTag],
}

fn draw_contour(
    points: &[Point<Fixed>],
    tags: &[PointTag],
    base_ix: usize,
    pen: &mut impl OutlinePen,
) -> Result<(), ToPathError> {
    let (Some(first_point), Some(first_tag)) = (points.first(), tags.first()) else {
        return Ok(());
    };
    let last_ix = points.len() - 1;
    // Pick a starting on-curve point. When the contour begins with a
    // quadratic control point, start at the final point if it is on the
    // curve, otherwise at the implied midpoint of the first and last.
    let (start, mut ix, end) = if first_tag.is_on_curve() {
        (*first_point, 1, points.len())
    } else if first_tag.is_off_curve_cubic() {
        return Err(ToPathError::ExpectedQuadOrOnCurve(base_ix));
    } else if tags[last_ix].is_on_curve() {
        (points[last_ix], 0, last_ix)
    } else {
        (midpoint(*first_point, points[last_ix]), 0, points.len())
    };
    pen.move_to(start.x.to_f32(), start.y.to_f32());
    while ix < end {
        let tag = tags[ix];
        if tag.is_on_curve() {
            let p = points[ix];
            pen.line_to(p.x.to_f32(), p.y.to_f32());
            ix += 1;
        } else if tag.is_off_curve_cubic() {
            if ix + 1 >= end || !tags[ix + 1].is_off_curve_cubic() {
                return Err(ToPathError::ExpectedCubic(base_ix + ix + 1));
            }
            let (c0, c1) = (points[ix], points[ix + 1]);
            let p = points.get(ix + 2).filter(|_| ix + 2 < end).unwrap_or(&start);
            pen.curve_to(
                c0.x.to_f32(),
                c0.y.to_f32(),
                c1.x.to_f32(),
                c1.y.to_f32(),
                p.x.to_f32(),
                p.y.to_f32(),
            );
            ix += 3;
        } else {
            let control = points[ix];
            let p = if ix + 1 < end {
                let next_tag = tags[ix + 1];
                if next_tag.is_on_curve() {
                    ix += 1;
                    points[ix]
                } else if next_tag.is_off_curve_quad() {
                    midpoint(control, points[ix + 1])
                } else {
                    return Err(ToPathError::ExpectedQuad(base_ix + ix + 1));
                }
            } else {
                start
            };
            pen.quad_to(
                control.x.to_f32(),
                control.y.to_f32(),
                p.x.to_f32(),
                p.y.to_f32(),
            );
            ix += 1;
        }
    }
    pen.close();
    Ok(())
}

fn midpoint(a: Point<Fixed>, b: Point<Fixed>) -> Point<Fixed> {
    let half = |a: Fixed, b: Fixed| {
        Fixed::from_bits(((a.to_bits() as i64 + b.to_bits() as i64) >> 1) as i32)
    };
    Point::new(half(a.x, b.x), half(a.y, b.y))
}

#[cfg(feature = "kurbo")]
struct BezPathPen(kurbo::BezPath);

#[cfg(feature = "kurbo")]
impl OutlinePen for BezPathPen {
    fn move_to(&mut self, x: f32, y: f32) {
        self.0.move_to((x as f64, y as f64));
    }

    fn line_to(&mut self, x: f32, y: f32) {
        self.0.line_to((x as f64, y as f64));
    }

    fn quad_to(&mut self, cx0: f32, cy0: f32, x: f32, y: f32) {
        self.0.quad_to((cx0 as f64, cy0 as f64), (x as f64, y as f64));
    }

    fn curve_to(&mut self, cx0: f32, cy0: f32, cx1: f32, cy1: f32, x: f32, y: f32) {
        self.0.curve_to(
            (cx0 as f64, cy0 as f64),
            (cx1 as f64, cy1 as f64),
            (x as f64, y as f64),
        );
    }

    fn close(&mut self) {
        self.0.close_path();
    }
}

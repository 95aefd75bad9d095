//! Incremental construction of glyph outlines.

use font_types::{BoundingBox, Fixed, Point};

use crate::{
    error::{CharstringError, Error},
    outline::{Outline, PointTag},
};

/// Maximum number of points in a single glyph outline.
pub const MAX_POINTS: usize = 32767;

/// Maximum number of contours in a single glyph outline.
pub const MAX_CONTOURS: usize = 32767;

/// Accumulates contours and points while a glyph is loaded.
///
/// Points are added to the `current` outline with the active translation
/// applied. Completed components are moved into the `base` outline by
/// [`commit_current`](Self::commit_current) so that each composite
/// component keeps its own contours.
///
/// When `load_points` is false, no point storage is touched but the bounding
/// box, point and contour counts are maintained exactly as they would be for
/// a full load.
#[derive(Debug)]
pub struct OutlineBuilder {
    base: Outline,
    current: Outline,
    pos_x: Fixed,
    pos_y: Fixed,
    path_begun: bool,
    bbox: Option<BoundingBox<Fixed>>,
    load_points: bool,
    no_recurse: bool,
    left_bearing: Point<Fixed>,
    advance: Point<Fixed>,
    point_count: usize,
    contour_count: usize,
}

impl OutlineBuilder {
    pub fn new(load_points: bool) -> Self {
        Self {
            base: Outline::default(),
            current: Outline::default(),
            pos_x: Fixed::ZERO,
            pos_y: Fixed::ZERO,
            path_begun: false,
            bbox: None,
            load_points,
            no_recurse: false,
            left_bearing: Point::default(),
            advance: Point::default(),
            point_count: 0,
            contour_count: 0,
        }
    }

    /// Sets whether composite components are reported rather than loaded.
    pub fn with_no_recurse(mut self, no_recurse: bool) -> Self {
        self.no_recurse = no_recurse;
        self
    }

    pub fn load_points(&self) -> bool {
        self.load_points
    }

    pub fn no_recurse(&self) -> bool {
        self.no_recurse
    }

    /// Returns true if a contour is open.
    pub fn path_begun(&self) -> bool {
        self.path_begun
    }

    /// Returns the bounding box of all points added so far.
    pub fn bbox(&self) -> Option<BoundingBox<Fixed>> {
        self.bbox
    }

    /// Returns the total number of points added, including those of
    /// committed components.
    pub fn point_count(&self) -> usize {
        self.point_count
    }

    /// Returns the total number of contours started.
    pub fn contour_count(&self) -> usize {
        self.contour_count
    }

    pub fn translation(&self) -> (Fixed, Fixed) {
        (self.pos_x, self.pos_y)
    }

    /// Sets the offset applied to every subsequently added point.
    pub fn set_translation(&mut self, x: Fixed, y: Fixed) {
        self.pos_x = x;
        self.pos_y = y;
    }

    pub fn left_bearing(&self) -> Point<Fixed> {
        self.left_bearing
    }

    pub fn set_left_bearing(&mut self, left_bearing: Point<Fixed>) {
        self.left_bearing = left_bearing;
    }

    pub fn advance(&self) -> Point<Fixed> {
        self.advance
    }

    pub fn set_advance(&mut self, advance: Point<Fixed>) {
        self.advance = advance;
    }

    /// Ensures that `n` more points can be added without reallocating.
    ///
    /// On failure the existing points are left untouched.
    pub fn ensure_capacity(&mut self, n: usize) -> Result<(), Error> {
        if self
            .point_count
            .checked_add(n)
            .is_none_or(|count| count > MAX_POINTS)
        {
            return Err(Error::OutOfMemory);
        }
        if self.load_points {
            self.current
                .points
                .try_reserve(n)
                .map_err(|_| Error::OutOfMemory)?;
            self.current
                .tags
                .try_reserve(n)
                .map_err(|_| Error::OutOfMemory)?;
        }
        Ok(())
    }

    /// Adds a point to the open contour.
    ///
    /// The builder's translation is applied to the given coordinates.
    pub fn add_point(&mut self, x: Fixed, y: Fixed, tag: PointTag) -> Result<(), Error> {
        if !self.path_begun {
            return Err(CharstringError::NoOpenContour.into());
        }
        if self.point_count >= MAX_POINTS {
            return Err(Error::OutOfMemory);
        }
        let point = Point::new(x.wrapping_add(self.pos_x), y.wrapping_add(self.pos_y));
        if self.load_points {
            if self.current.points.len() == self.current.points.capacity() {
                self.ensure_capacity(1)?;
            }
            self.current.points.push(point);
            self.current.tags.push(tag);
        }
        self.point_count += 1;
        self.update_bbox(point);
        Ok(())
    }

    /// Adds a single on curve point to the open contour.
    pub fn add_point1(&mut self, x: Fixed, y: Fixed) -> Result<(), Error> {
        self.ensure_capacity(1)?;
        self.add_point(x, y, PointTag::on_curve())
    }

    /// Closes any open contour and starts a new one at the given point.
    pub fn start_point(&mut self, x: Fixed, y: Fixed) -> Result<(), Error> {
        self.close_contour();
        if self.contour_count >= MAX_CONTOURS {
            return Err(Error::OutOfMemory);
        }
        if self.load_points {
            self.current
                .contours
                .try_reserve(1)
                .map_err(|_| Error::OutOfMemory)?;
        }
        self.ensure_capacity(1)?;
        self.path_begun = true;
        self.contour_count += 1;
        self.add_point(x, y, PointTag::on_curve())
    }

    /// Closes the open contour, if any.
    pub fn close_contour(&mut self) {
        if !self.path_begun {
            return;
        }
        self.path_begun = false;
        if self.load_points {
            // start_point always adds the first point so the contour is
            // never empty here
            let end = self.current.points.len().saturating_sub(1);
            self.current.contours.push(end as u16);
        }
    }

    /// Closes the open contour and moves the current outline into the base
    /// outline.
    pub fn commit_current(&mut self) -> Result<(), Error> {
        self.close_contour();
        if !self.load_points || self.current.is_empty() {
            return Ok(());
        }
        if self.base.is_empty() {
            std::mem::swap(&mut self.base, &mut self.current);
            return Ok(());
        }
        let offset = self.base.points.len();
        let base = &mut self.base;
        let current = &self.current;
        base.points
            .try_reserve(current.points.len())
            .map_err(|_| Error::OutOfMemory)?;
        base.tags
            .try_reserve(current.tags.len())
            .map_err(|_| Error::OutOfMemory)?;
        base.contours
            .try_reserve(current.contours.len())
            .map_err(|_| Error::OutOfMemory)?;
        base.points.extend_from_slice(&current.points);
        base.tags.extend_from_slice(&current.tags);
        base.contours
            .extend(current.contours.iter().map(|end| *end + offset as u16));
        self.current.clear();
        Ok(())
    }

    /// Closes and commits any pending contour and returns the completed
    /// outline with its bounding box.
    pub fn finish(mut self) -> Result<(Outline, Option<BoundingBox<Fixed>>), Error> {
        self.commit_current()?;
        Ok((self.base, self.bbox))
    }

    fn update_bbox(&mut self, point: Point<Fixed>) {
        let bbox = self.bbox.get_or_insert(BoundingBox {
            x_min: point.x,
            y_min: point.y,
            x_max: point.x,
            y_max: point.y,
        });
        bbox.x_min = bbox.x_min.min(point.x);
        bbox.y_min = bbox.y_min.min(point.y);
        bbox.x_max = bbox.x_max.max(point.x);
        bbox.y_max = bbox.y_max.max(point.y);
    }
}

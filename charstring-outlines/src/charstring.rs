//! Type 2 charstring evaluation.
//!
//! See <https://adobe-type-tools.github.io/font-tech-notes/pdfs/5177.Type2.pdf>

use font_types::{Fixed, Point};

use crate::{
    composite::{self, Accent},
    cursor::Cursor,
    error::{CharstringError, Error, StackFault},
    hint::StemKind,
    load::LoadContext,
    locate::{CharstringStore, Subfont},
    outline::PointTag,
    stack::{Number, Stack, MAX_STACK},
};

/// Maximum nesting depth for subroutine calls and accent components.
///
/// See "Appendix B Type 2 Charstring Implementation Limits" at
/// <https://adobe-type-tools.github.io/font-tech-notes/pdfs/5177.Type2.pdf#page=33>
pub const NESTING_DEPTH_LIMIT: u32 = 10;

/// Number of entries in the transient array used by `put` and `get`.
pub const TRANSIENT_ARRAY_SIZE: usize = 32;

/// What to do after an operator has been evaluated.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
enum Flow {
    Continue,
    /// Return from the current subroutine.
    Return,
    /// The glyph is complete.
    End,
}

/// Transient state for evaluating a charstring and handling recursive
/// subroutine calls.
///
/// A new interpreter is created for the glyph and for each component of an
/// accented glyph. The operand stack, stem count and transient array are
/// shared by all subroutines called from the same charstring.
pub(crate) struct Interpreter<'c, 'a, 'h, S> {
    ctx: &'c mut LoadContext<'a, 'h, S>,
    subfont: &'a Subfont<'a>,
    is_component: bool,
    stack: Stack,
    transient: [Number; TRANSIENT_ARRAY_SIZE],
    stem_count: usize,
    have_read_width: bool,
    width: Option<Fixed>,
    x: Fixed,
    y: Fixed,
}

impl<'c, 'a, 'h, S> Interpreter<'c, 'a, 'h, S>
where
    S: CharstringStore,
{
    /// Creates an interpreter for a glyph using the subroutines and widths
    /// of `subfont`.
    ///
    /// The advance width of a component is ignored.
    pub fn new(
        ctx: &'c mut LoadContext<'a, 'h, S>,
        subfont: &'a Subfont<'a>,
        is_component: bool,
    ) -> Self {
        Self {
            ctx,
            subfont,
            is_component,
            stack: Stack::new(),
            transient: [Number::I32(0); TRANSIENT_ARRAY_SIZE],
            stem_count: 0,
            have_read_width: false,
            width: None,
            x: Fixed::ZERO,
            y: Fixed::ZERO,
        }
    }

    /// Evaluates a complete glyph charstring at the given nesting depth.
    pub fn run(mut self, charstring: &[u8], depth: u32) -> Result<(), Error> {
        if !self.evaluate(charstring, depth)? {
            return Err(CharstringError::Unterminated.into());
        }
        if !self.is_component {
            let advance = match self.width {
                Some(width) => self.subfont.nominal_width_x().wrapping_add(width),
                None => self.subfont.default_width_x(),
            };
            self.ctx.builder.set_advance(Point::new(advance, Fixed::ZERO));
        }
        Ok(())
    }

    /// Returns true if the glyph was terminated by `endchar`.
    fn evaluate(&mut self, charstring: &[u8], depth: u32) -> Result<bool, Error> {
        let mut cursor = Cursor::new(charstring);
        while cursor.remaining_bytes() != 0 {
            let b0 = cursor.read_u8().ok_or(CharstringError::UnexpectedEnd)?;
            match b0 {
                // See "3.2 Charstring Number Encoding" <https://adobe-type-tools.github.io/font-tech-notes/pdfs/5177.Type2.pdf#page=12>
                //
                // Push an integer to the stack
                28 | 32..=254 => {
                    self.stack.push(parse_int(&mut cursor, b0)?)?;
                }
                // Push a fixed point value to the stack
                255 => {
                    let bits = cursor.read_i32().ok_or(CharstringError::UnexpectedEnd)?;
                    self.stack.push(Fixed::from_bits(bits))?;
                }
                _ => {
                    let operator = Operator::read(&mut cursor, b0)?;
                    match self.evaluate_operator(operator, &mut cursor, depth)? {
                        Flow::Continue => {}
                        Flow::Return => return Ok(false),
                        Flow::End => return Ok(true),
                    }
                }
            }
        }
        // Falling off the end is an implicit return
        Ok(false)
    }

    fn evaluate_operator(
        &mut self,
        operator: Operator,
        cursor: &mut Cursor,
        depth: u32,
    ) -> Result<Flow, Error> {
        use Operator::*;
        log::trace!("{operator:?} with {} operands", self.stack.len());
        match operator {
            // Emits a sequence of stem hints
            // Spec: <https://adobe-type-tools.github.io/font-tech-notes/pdfs/5177.Type2.pdf#page=21>
            HStem | VStem | HStemHm | VStemHm => {
                let first = self.read_width(self.stack.len_is_odd())?;
                let count = self.stack.len() - first;
                if count % 2 != 0 {
                    return Err(CharstringError::OperandCount(operator.name()).into());
                }
                let kind = if matches!(operator, HStem | HStemHm) {
                    StemKind::Horizontal
                } else {
                    StemKind::Vertical
                };
                self.stem_count += count / 2;
                self.forward_stems(kind, first)?;
                self.stack.clear();
            }
            // Applies a hint or counter mask.
            // If there are arguments on the stack, this is also an
            // implied series of VSTEMHM operators.
            // Spec: <https://adobe-type-tools.github.io/font-tech-notes/pdfs/5177.Type2.pdf#page=24>
            HintMask | CntrMask => {
                let first = self.read_width(self.stack.len_is_odd())?;
                let count = self.stack.len() - first;
                if count % 2 != 0 {
                    return Err(CharstringError::OperandCount(operator.name()).into());
                }
                if count != 0 {
                    self.stem_count += count / 2;
                    self.forward_stems(StemKind::Vertical, first)?;
                }
                let mask_len = self.stem_count.div_ceil(8);
                let mask = cursor
                    .read_array(mask_len)
                    .ok_or(CharstringError::UnexpectedEnd)?;
                if operator == HintMask {
                    self.ctx.hints.call(|hook| hook.hint_mask(mask))?;
                } else {
                    self.ctx.hints.call(|hook| hook.counter_mask(mask))?;
                }
                self.stack.clear();
            }
            // Starts a new contour
            // Spec: <https://adobe-type-tools.github.io/font-tech-notes/pdfs/5177.Type2.pdf#page=16>
            RMoveTo => {
                let first = self.read_width(self.stack.len() > 2)?;
                self.expect_len(first + 2, operator)?;
                let [dx, dy] = self.stack.fixed_array::<2>(first)?;
                self.x = self.x.wrapping_add(dx);
                self.y = self.y.wrapping_add(dy);
                self.ctx.builder.start_point(self.x, self.y)?;
                self.stack.clear();
            }
            // Starts a new contour by moving the current point in the
            // horizontal or vertical direction
            HMoveTo | VMoveTo => {
                let first = self.read_width(self.stack.len() > 1)?;
                self.expect_len(first + 1, operator)?;
                let delta = self.stack.get_fixed(first)?;
                if operator == HMoveTo {
                    self.x = self.x.wrapping_add(delta);
                } else {
                    self.y = self.y.wrapping_add(delta);
                }
                self.ctx.builder.start_point(self.x, self.y)?;
                self.stack.clear();
            }
            // Emits a sequence of lines
            // Spec: <https://adobe-type-tools.github.io/font-tech-notes/pdfs/5177.Type2.pdf#page=16>
            RLineTo => {
                self.expect_groups(2, 0, operator)?;
                self.ensure_open()?;
                let mut i = 0;
                while i < self.stack.len() {
                    let [dx, dy] = self.stack.fixed_array::<2>(i)?;
                    self.line_to(self.x.wrapping_add(dx), self.y.wrapping_add(dy))?;
                    i += 2;
                }
                self.stack.clear();
            }
            // Emits a sequence of alternating horizontal and vertical
            // lines
            HLineTo | VLineTo => {
                self.stack.verify_at_least_len(1)?;
                self.ensure_open()?;
                let mut is_x = operator == HLineTo;
                for i in 0..self.stack.len() {
                    let delta = self.stack.get_fixed(i)?;
                    if is_x {
                        self.line_to(self.x.wrapping_add(delta), self.y)?;
                    } else {
                        self.line_to(self.x, self.y.wrapping_add(delta))?;
                    }
                    is_x = !is_x;
                }
                self.stack.clear();
            }
            // Emits a sequence of curves possibly followed by a line
            // Spec: <https://adobe-type-tools.github.io/font-tech-notes/pdfs/5177.Type2.pdf#page=17>
            RrCurveTo | RCurveLine => {
                let trailing = if operator == RCurveLine { 2 } else { 0 };
                self.expect_groups(6, trailing, operator)?;
                self.ensure_open()?;
                let curve_end = self.stack.len() - trailing;
                let mut i = 0;
                while i < curve_end {
                    let args = self.stack.fixed_array::<6>(i)?;
                    self.rel_curve_to(args)?;
                    i += 6;
                }
                if operator == RCurveLine {
                    let [dx, dy] = self.stack.fixed_array::<2>(i)?;
                    self.line_to(self.x.wrapping_add(dx), self.y.wrapping_add(dy))?;
                }
                self.stack.clear();
            }
            // Emits a sequence of lines followed by a curve
            // Spec: <https://adobe-type-tools.github.io/font-tech-notes/pdfs/5177.Type2.pdf#page=18>
            RLineCurve => {
                self.expect_groups(2, 6, operator)?;
                self.ensure_open()?;
                let line_end = self.stack.len() - 6;
                let mut i = 0;
                while i < line_end {
                    let [dx, dy] = self.stack.fixed_array::<2>(i)?;
                    self.line_to(self.x.wrapping_add(dx), self.y.wrapping_add(dy))?;
                    i += 2;
                }
                let args = self.stack.fixed_array::<6>(i)?;
                self.rel_curve_to(args)?;
                self.stack.clear();
            }
            // Emits curves that start and end horizontal, unless
            // the stack count is odd, in which case the first
            // curve may start with a vertical tangent
            // Spec: <https://adobe-type-tools.github.io/font-tech-notes/pdfs/5177.Type2.pdf#page=17>
            HhCurveTo => {
                self.expect_groups(4, self.stack.len() % 2, operator)?;
                self.ensure_open()?;
                let mut i = 0;
                let mut dy1 = Fixed::ZERO;
                if self.stack.len_is_odd() {
                    dy1 = self.stack.get_fixed(0)?;
                    i = 1;
                }
                while i < self.stack.len() {
                    let [dx1, dx2, dy2, dx3] = self.stack.fixed_array::<4>(i)?;
                    self.rel_curve_to([dx1, dy1, dx2, dy2, dx3, Fixed::ZERO])?;
                    dy1 = Fixed::ZERO;
                    i += 4;
                }
                self.stack.clear();
            }
            // Emits curves that start and end vertical, unless
            // the stack count is odd, in which case the first
            // curve may start with a horizontal tangent
            // Spec: <https://adobe-type-tools.github.io/font-tech-notes/pdfs/5177.Type2.pdf#page=18>
            VvCurveTo => {
                self.expect_groups(4, self.stack.len() % 2, operator)?;
                self.ensure_open()?;
                let mut i = 0;
                let mut dx1 = Fixed::ZERO;
                if self.stack.len_is_odd() {
                    dx1 = self.stack.get_fixed(0)?;
                    i = 1;
                }
                while i < self.stack.len() {
                    let [dy1, dx2, dy2, dy3] = self.stack.fixed_array::<4>(i)?;
                    self.rel_curve_to([dx1, dy1, dx2, dy2, Fixed::ZERO, dy3])?;
                    dx1 = Fixed::ZERO;
                    i += 4;
                }
                self.stack.clear();
            }
            // Alternates between curves with horizontal and vertical
            // tangents. An odd count supplies a final delta for the last
            // curve.
            // Spec: <https://adobe-type-tools.github.io/font-tech-notes/pdfs/5177.Type2.pdf#page=17>
            HvCurveTo | VhCurveTo => {
                let count = self.stack.len();
                self.expect_groups(4, count % 2, operator)?;
                self.ensure_open()?;
                let mut horizontal = operator == HvCurveTo;
                let mut i = 0;
                while i + 4 <= count {
                    let [d1, d2, d3, d4] = self.stack.fixed_array::<4>(i)?;
                    let last = if count - i == 5 {
                        self.stack.get_fixed(i + 4)?
                    } else {
                        Fixed::ZERO
                    };
                    let args = if horizontal {
                        [d1, Fixed::ZERO, d2, d3, last, d4]
                    } else {
                        [Fixed::ZERO, d1, d2, d3, d4, last]
                    };
                    self.rel_curve_to(args)?;
                    horizontal = !horizontal;
                    i += 4;
                }
                self.stack.clear();
            }
            // The flex operators emit two curves. The flex depth
            // parameter is ignored, following FreeType.
            // Spec: <https://adobe-type-tools.github.io/font-tech-notes/pdfs/5177.Type2.pdf#page=18>
            Flex => {
                self.expect_len(13, operator)?;
                self.ensure_open()?;
                let args = self.stack.fixed_array::<12>(0)?;
                self.rel_curve_to([args[0], args[1], args[2], args[3], args[4], args[5]])?;
                self.rel_curve_to([args[6], args[7], args[8], args[9], args[10], args[11]])?;
                self.stack.clear();
            }
            // Spec: <https://adobe-type-tools.github.io/font-tech-notes/pdfs/5177.Type2.pdf#page=19>
            HFlex => {
                self.expect_len(7, operator)?;
                self.ensure_open()?;
                let [dx1, dx2, dy2, dx3, dx4, dx5, dx6] = self.stack.fixed_array::<7>(0)?;
                let zero = Fixed::ZERO;
                self.rel_curve_to([dx1, zero, dx2, dy2, dx3, zero])?;
                self.rel_curve_to([dx4, zero, dx5, zero.wrapping_sub(dy2), dx6, zero])?;
                self.stack.clear();
            }
            // Spec: <https://adobe-type-tools.github.io/font-tech-notes/pdfs/5177.Type2.pdf#page=19>
            HFlex1 => {
                self.expect_len(9, operator)?;
                self.ensure_open()?;
                let [dx1, dy1, dx2, dy2, dx3, dx4, dx5, dy5, dx6] =
                    self.stack.fixed_array::<9>(0)?;
                let start_y = self.y;
                let zero = Fixed::ZERO;
                self.rel_curve_to([dx1, dy1, dx2, dy2, dx3, zero])?;
                // The final point returns to the starting y
                let dy6 = start_y.wrapping_sub(self.y.wrapping_add(dy5));
                self.rel_curve_to([dx4, zero, dx5, dy5, dx6, dy6])?;
                self.stack.clear();
            }
            // Spec: <https://adobe-type-tools.github.io/font-tech-notes/pdfs/5177.Type2.pdf#page=20>
            Flex1 => {
                self.expect_len(11, operator)?;
                self.ensure_open()?;
                let args = self.stack.fixed_array::<11>(0)?;
                let sum = |first: usize| {
                    (first..10)
                        .step_by(2)
                        .fold(Fixed::ZERO, |sum, i| sum.wrapping_add(args[i]))
                };
                let (dx, dy) = (sum(0), sum(1));
                // The last delta is horizontal or vertical depending on
                // the larger overall displacement
                let magnitude = |value: Fixed| value.to_bits().unsigned_abs();
                let (dx6, dy6) = if magnitude(dx) > magnitude(dy) {
                    (args[10], Fixed::ZERO.wrapping_sub(dy))
                } else {
                    (Fixed::ZERO.wrapping_sub(dx), args[10])
                };
                self.rel_curve_to([args[0], args[1], args[2], args[3], args[4], args[5]])?;
                self.rel_curve_to([args[6], args[7], args[8], args[9], dx6, dy6])?;
                self.stack.clear();
            }
            // Call local or global subroutine
            // Spec: <https://adobe-type-tools.github.io/font-tech-notes/pdfs/5177.Type2.pdf#page=29>
            CallSubr | CallGsubr => {
                let subrs = if operator == CallSubr {
                    let subfont = self.subfont;
                    subfont
                        .local_subrs()
                        .ok_or(CharstringError::MissingSubroutines)?
                } else {
                    let tables = self.ctx.tables;
                    tables.global_subrs()
                };
                let biased_index = self.stack.pop_i32()?.saturating_add(subrs.subr_bias());
                let subr_index = usize::try_from(biased_index)
                    .ok()
                    .filter(|ix| (*ix as u32) < subrs.count())
                    .ok_or(CharstringError::InvalidSubroutine(biased_index))?;
                let subr_charstring = subrs.get(subr_index)?;
                let depth = depth + 1;
                if depth > self.ctx.depth_limit {
                    return Err(Error::RecursionTooDeep {
                        limit: self.ctx.depth_limit,
                    });
                }
                log::trace!("{operator:?} {subr_index} at depth {depth}");
                if self.evaluate(subr_charstring, depth)? {
                    return Ok(Flow::End);
                }
            }
            // Return from the current subroutine without touching the
            // stack
            Return => return Ok(Flow::Return),
            // Ends the glyph. Four remaining operands describe an accented
            // character built from two standard encoding glyphs.
            // Spec: <https://adobe-type-tools.github.io/font-tech-notes/pdfs/5177.Type2.pdf#page=21>
            EndChar => {
                let first = self.read_width(matches!(self.stack.len(), 1 | 5))?;
                let count = self.stack.len() - first;
                self.ctx.builder.close_contour();
                match count {
                    0 => {}
                    4 => {
                        let accent = self.pop_accent(Fixed::ZERO)?;
                        composite::compose(&mut *self.ctx, accent, depth)?;
                    }
                    _ => return Err(CharstringError::OperandCount(operator.name()).into()),
                }
                self.stack.clear();
                return Ok(Flow::End);
            }
            // Type 1 style accented character: `asb adx ady bchar achar`
            Seac => {
                self.have_read_width = true;
                self.expect_len(5, operator)?;
                self.ctx.builder.close_contour();
                let asb = self.stack.get_fixed(0)?;
                if !self.is_component {
                    self.ctx.builder.set_left_bearing(Point::new(asb, Fixed::ZERO));
                }
                let accent = self.pop_accent(asb)?;
                composite::compose(&mut *self.ctx, accent, depth)?;
                self.stack.clear();
                return Ok(Flow::End);
            }
            DotSection => self.stack.clear(),
            And | Or => {
                let b = self.stack.pop_fixed()?;
                let a = self.stack.pop_fixed()?;
                let result = if operator == And {
                    a != Fixed::ZERO && b != Fixed::ZERO
                } else {
                    a != Fixed::ZERO || b != Fixed::ZERO
                };
                self.stack.push(result as i32)?;
            }
            Not => {
                let a = self.stack.pop_fixed()?;
                self.stack.push((a == Fixed::ZERO) as i32)?;
            }
            Abs => {
                let result = match self.stack.pop()? {
                    Number::I32(a) => Number::I32(a.wrapping_abs()),
                    Number::Fixed(a) => {
                        Number::Fixed(Fixed::from_bits(a.to_bits().wrapping_abs()))
                    }
                };
                self.stack.push(result)?;
            }
            Neg => {
                let result = match self.stack.pop()? {
                    Number::I32(a) => Number::I32(a.wrapping_neg()),
                    Number::Fixed(a) => {
                        Number::Fixed(Fixed::from_bits(a.to_bits().wrapping_neg()))
                    }
                };
                self.stack.push(result)?;
            }
            Add | Sub => {
                let b = self.stack.pop()?;
                let a = self.stack.pop()?;
                let result = match (a, b) {
                    (Number::I32(a), Number::I32(b)) if operator == Add => {
                        Number::I32(a.wrapping_add(b))
                    }
                    (Number::I32(a), Number::I32(b)) => Number::I32(a.wrapping_sub(b)),
                    (a, b) if operator == Add => {
                        Number::Fixed(a.to_fixed().wrapping_add(b.to_fixed()))
                    }
                    (a, b) => Number::Fixed(a.to_fixed().wrapping_sub(b.to_fixed())),
                };
                self.stack.push(result)?;
            }
            Mul => {
                let b = self.stack.pop_fixed()?;
                let a = self.stack.pop_fixed()?;
                self.stack.push(a * b)?;
            }
            Div => {
                let b = self.stack.pop_fixed()?;
                let a = self.stack.pop_fixed()?;
                if b == Fixed::ZERO {
                    return Err(StackFault::DivideByZero.into());
                }
                self.stack.push(a.mul_div(Fixed::ONE, b))?;
            }
            Sqrt => {
                let a = self.stack.pop_fixed()?;
                if a < Fixed::ZERO {
                    return Err(StackFault::InvalidOperand(operator.name()).into());
                }
                self.stack.push(Fixed::from_f64(a.to_f64().sqrt()))?;
            }
            Eq => {
                let b = self.stack.pop_fixed()?;
                let a = self.stack.pop_fixed()?;
                self.stack.push((a == b) as i32)?;
            }
            IfElse => {
                let v2 = self.stack.pop_fixed()?;
                let v1 = self.stack.pop_fixed()?;
                let s2 = self.stack.pop()?;
                let s1 = self.stack.pop()?;
                self.stack.push(if v1 <= v2 { s1 } else { s2 })?;
            }
            Random => {
                let value = next_random(&mut self.ctx.random_state);
                self.stack.push(value)?;
            }
            Drop => {
                self.stack.pop()?;
            }
            Dup => self.stack.dup()?,
            Exch => self.stack.exch()?,
            Index => {
                let n = self.stack.pop_i32()?;
                self.stack.copy_from_depth(n)?;
            }
            Roll => {
                let shift = self.stack.pop_i32()?;
                let count = self.stack.pop_i32()?;
                self.stack.roll(count, shift)?;
            }
            Put => {
                let index = self.stack.pop_i32()?;
                let value = self.stack.pop()?;
                *self.transient_entry(index)? = value;
            }
            Get => {
                let index = self.stack.pop_i32()?;
                let value = *self.transient_entry(index)?;
                self.stack.push(value)?;
            }
        }
        Ok(Flow::Continue)
    }

    /// Consumes the advance width if this is the first stack clearing
    /// operator and `present` indicates an extra leading operand.
    ///
    /// Returns the index of the first operand following the width.
    fn read_width(&mut self, present: bool) -> Result<usize, Error> {
        if self.have_read_width {
            return Ok(0);
        }
        self.have_read_width = true;
        if !present {
            return Ok(0);
        }
        self.width = Some(self.stack.get_fixed(0)?);
        Ok(1)
    }

    /// Checks for exactly `len` operands.
    fn expect_len(&self, len: usize, operator: Operator) -> Result<(), Error> {
        self.stack.verify_at_least_len(len)?;
        if self.stack.len() != len {
            return Err(CharstringError::OperandCount(operator.name()).into());
        }
        Ok(())
    }

    /// Checks for one or more groups of `group_len` operands along with
    /// `extra` operands outside of the groups.
    fn expect_groups(
        &self,
        group_len: usize,
        extra: usize,
        operator: Operator,
    ) -> Result<(), Error> {
        self.stack.verify_at_least_len(group_len + extra)?;
        if (self.stack.len() - extra) % group_len != 0 {
            return Err(CharstringError::OperandCount(operator.name()).into());
        }
        Ok(())
    }

    /// Opens a contour at the current point when a drawing operator is
    /// not preceded by a move.
    fn ensure_open(&mut self) -> Result<(), Error> {
        if !self.ctx.builder.path_begun() {
            self.ctx.builder.start_point(self.x, self.y)?;
        }
        Ok(())
    }

    fn line_to(&mut self, x: Fixed, y: Fixed) -> Result<(), Error> {
        self.x = x;
        self.y = y;
        self.ctx.builder.add_point1(x, y)
    }

    /// Emits a cubic curve from relative deltas
    /// `[dx1, dy1, dx2, dy2, dx3, dy3]`.
    fn rel_curve_to(&mut self, args: [Fixed; 6]) -> Result<(), Error> {
        let x1 = self.x.wrapping_add(args[0]);
        let y1 = self.y.wrapping_add(args[1]);
        let x2 = x1.wrapping_add(args[2]);
        let y2 = y1.wrapping_add(args[3]);
        self.x = x2.wrapping_add(args[4]);
        self.y = y2.wrapping_add(args[5]);
        let builder = &mut self.ctx.builder;
        builder.ensure_capacity(3)?;
        builder.add_point(x1, y1, PointTag::off_curve_cubic())?;
        builder.add_point(x2, y2, PointTag::off_curve_cubic())?;
        builder.add_point(self.x, self.y, PointTag::on_curve())
    }

    fn forward_stems(&mut self, kind: StemKind, first: usize) -> Result<(), Error> {
        if !self.ctx.hints.is_active() {
            return Ok(());
        }
        let mut values = [Fixed::ZERO; MAX_STACK];
        let count = self.stack.len() - first;
        for (value, operand) in values.iter_mut().zip(self.stack.fixed_values().skip(first)) {
            *value = operand;
        }
        self.ctx
            .hints
            .call(|hook| hook.stems(kind, &values[..count]))
    }

    /// Pops the `adx ady bchar achar` operands of an accented character,
    /// subtracting `asb` from the horizontal offset.
    fn pop_accent(&mut self, asb: Fixed) -> Result<Accent, Error> {
        let accent_code = self.stack.pop_i32()?;
        let base_code = self.stack.pop_i32()?;
        let ady = self.stack.pop_fixed()?;
        let adx = self.stack.pop_fixed()?;
        Ok(Accent {
            base_code,
            accent_code,
            offset: Point::new(adx.wrapping_sub(asb), ady),
        })
    }

    fn transient_entry(&mut self, index: i32) -> Result<&mut Number, Error> {
        usize::try_from(index)
            .ok()
            .and_then(|ix| self.transient.get_mut(ix))
            .ok_or_else(|| StackFault::InvalidTransientIndex(index).into())
    }
}

/// Decodes an integer operand.
///
/// See "Table 3 Charstring Number Encoding" at <https://adobe-type-tools.github.io/font-tech-notes/pdfs/5177.Type2.pdf#page=12>
fn parse_int(cursor: &mut Cursor, b0: u8) -> Result<i32, Error> {
    let end = CharstringError::UnexpectedEnd;
    Ok(match b0 {
        28 => cursor.read_i16().ok_or(end)? as i32,
        32..=246 => b0 as i32 - 139,
        247..=250 => (b0 as i32 - 247) * 256 + cursor.read_u8().ok_or(end)? as i32 + 108,
        251..=254 => -(b0 as i32 - 251) * 256 - cursor.read_u8().ok_or(end)? as i32 - 108,
        _ => return Err(CharstringError::InvalidOperator(b0).into()),
    })
}

/// Advances the generator and returns a value in the range (0, 1].
fn next_random(state: &mut u32) -> Fixed {
    *state = state.wrapping_mul(1_103_515_245).wrapping_add(12_345);
    Fixed::from_bits(((*state >> 16) & 0xFFFF) as i32 + 1)
}

/// Type 2 charstring operator.
///
/// See "Appendix A Type 2 Charstring Command Codes" at <https://adobe-type-tools.github.io/font-tech-notes/pdfs/5177.Type2.pdf#page=31>
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
enum Operator {
    HStem,
    VStem,
    VMoveTo,
    RLineTo,
    HLineTo,
    VLineTo,
    RrCurveTo,
    CallSubr,
    Return,
    EndChar,
    HStemHm,
    HintMask,
    CntrMask,
    RMoveTo,
    HMoveTo,
    VStemHm,
    RCurveLine,
    RLineCurve,
    VvCurveTo,
    HhCurveTo,
    CallGsubr,
    VhCurveTo,
    HvCurveTo,
    DotSection,
    And,
    Or,
    Not,
    Seac,
    Abs,
    Add,
    Sub,
    Div,
    Neg,
    Eq,
    Drop,
    Put,
    Get,
    IfElse,
    Random,
    Mul,
    Sqrt,
    Dup,
    Exch,
    Index,
    Roll,
    HFlex,
    Flex,
    HFlex1,
    Flex1,
}

impl Operator {
    fn read(cursor: &mut Cursor, b0: u8) -> Result<Self, Error> {
        // Escape opcode for accessing two byte operators
        const ESCAPE: u8 = 12;
        if b0 == ESCAPE {
            let b1 = cursor.read_u8().ok_or(CharstringError::UnexpectedEnd)?;
            Self::from_two_byte_opcode(b1)
                .ok_or_else(|| CharstringError::InvalidEscapeOperator(b1).into())
        } else {
            Self::from_opcode(b0).ok_or_else(|| CharstringError::InvalidOperator(b0).into())
        }
    }

    /// Creates an operator from the given opcode.
    fn from_opcode(opcode: u8) -> Option<Self> {
        use Operator::*;
        Some(match opcode {
            1 => HStem,
            3 => VStem,
            4 => VMoveTo,
            5 => RLineTo,
            6 => HLineTo,
            7 => VLineTo,
            8 => RrCurveTo,
            10 => CallSubr,
            11 => Return,
            14 => EndChar,
            18 => HStemHm,
            19 => HintMask,
            20 => CntrMask,
            21 => RMoveTo,
            22 => HMoveTo,
            23 => VStemHm,
            24 => RCurveLine,
            25 => RLineCurve,
            26 => VvCurveTo,
            27 => HhCurveTo,
            29 => CallGsubr,
            30 => VhCurveTo,
            31 => HvCurveTo,
            _ => return None,
        })
    }

    /// Creates an operator from the given extended opcode.
    ///
    /// These are preceded by a byte containing the escape value of 12.
    fn from_two_byte_opcode(opcode: u8) -> Option<Self> {
        use Operator::*;
        Some(match opcode {
            0 => DotSection,
            3 => And,
            4 => Or,
            5 => Not,
            6 => Seac,
            9 => Abs,
            10 => Add,
            11 => Sub,
            12 => Div,
            14 => Neg,
            15 => Eq,
            18 => Drop,
            20 => Put,
            21 => Get,
            22 => IfElse,
            23 => Random,
            24 => Mul,
            26 => Sqrt,
            27 => Dup,
            28 => Exch,
            29 => Index,
            30 => Roll,
            34 => HFlex,
            35 => Flex,
            36 => HFlex1,
            37 => Flex1,
            _ => return None,
        })
    }

    fn name(self) -> &'static str {
        use Operator::*;
        match self {
            HStem => "hstem",
            VStem => "vstem",
            VMoveTo => "vmoveto",
            RLineTo => "rlineto",
            HLineTo => "hlineto",
            VLineTo => "vlineto",
            RrCurveTo => "rrcurveto",
            CallSubr => "callsubr",
            Return => "return",
            EndChar => "endchar",
            HStemHm => "hstemhm",
            HintMask => "hintmask",
            CntrMask => "cntrmask",
            RMoveTo => "rmoveto",
            HMoveTo => "hmoveto",
            VStemHm => "vstemhm",
            RCurveLine => "rcurveline",
            RLineCurve => "rlinecurve",
            VvCurveTo => "vvcurveto",
            HhCurveTo => "hhcurveto",
            CallGsubr => "callgsubr",
            VhCurveTo => "vhcurveto",
            HvCurveTo => "hvcurveto",
            DotSection => "dotsection",
            And => "and",
            Or => "or",
            Not => "not",
            Seac => "seac",
            Abs => "abs",
            Add => "add",
            Sub => "sub",
            Div => "div",
            Neg => "neg",
            Eq => "eq",
            Drop => "drop",
            Put => "put",
            Get => "get",
            IfElse => "ifelse",
            Random => "random",
            Mul => "mul",
            Sqrt => "sqrt",
            Dup => "dup",
            Exch => "exch",
            Index => "index",
            Roll => "roll",
            HFlex => "hflex",
            Flex => "flex",
            HFlex1 => "hflex1",
            Flex1 => "flex1",
        }
    }
}

#[cfg(test)]
mod tests {
    use charstring_test_data::{charstrings, index, op, CharstringBuilder};
    use font_types::GlyphId;

    use super::*;
    use crate::{
        hint::{HintError, HintHook},
        index::Index,
        load::{load, LoadSettings, LoadedGlyph},
        locate::FontTables,
    };

    struct TestFont {
        charstrings: Vec<u8>,
        local_subrs: Option<Vec<u8>>,
        global_subrs: Vec<u8>,
    }

    impl TestFont {
        fn new(charstring: &[u8]) -> Self {
            Self {
                charstrings: index(&[charstring]),
                local_subrs: None,
                global_subrs: index::<&[u8]>(&[]),
            }
        }

        fn with_local_subrs(mut self, subrs: &[&[u8]]) -> Self {
            self.local_subrs = Some(index(subrs));
            self
        }

        fn with_global_subrs(mut self, subrs: &[&[u8]]) -> Self {
            self.global_subrs = index(subrs);
            self
        }

        fn load(&self) -> Result<LoadedGlyph, Error> {
            self.load_with(&LoadSettings::default(), None)
        }

        fn load_with(
            &self,
            settings: &LoadSettings,
            hints: Option<&mut dyn HintHook>,
        ) -> Result<LoadedGlyph, Error> {
            let mut subfont =
                Subfont::new().with_widths(Fixed::from_i32(300), Fixed::from_i32(20));
            if let Some(local_subrs) = &self.local_subrs {
                subfont = subfont.with_local_subrs(Index::new(local_subrs).unwrap());
            }
            let tables = FontTables::new(
                Index::new(&self.charstrings).unwrap(),
                Index::new(&self.global_subrs).unwrap(),
                subfont,
            );
            load(&tables, GlyphId::new(0), settings, hints)
        }
    }

    fn points(coords: &[(i32, i32)]) -> Vec<Point<Fixed>> {
        coords
            .iter()
            .map(|(x, y)| Point::new(Fixed::from_i32(*x), Fixed::from_i32(*y)))
            .collect()
    }

    /// Evaluates the given operand program followed by `rmoveto endchar`
    /// and returns the position of the move.
    fn eval_to_point(program: CharstringBuilder) -> Point<Fixed> {
        let cs = program.op(op::RMOVETO).op(op::ENDCHAR).build();
        let glyph = TestFont::new(&cs).load().unwrap();
        glyph.outline.points()[0]
    }

    #[test]
    fn width_operand_adds_nominal_width() {
        let glyph = TestFont::new(charstrings::TRIANGLE).load().unwrap();
        assert_eq!(glyph.advance.x, Fixed::from_i32(520));
        assert_eq!(glyph.outline.points(), points(&[(100, 0), (150, 0), (150, 50)]));
        assert_eq!(glyph.outline.contour_ends(), &[2]);
    }

    #[test]
    fn missing_width_uses_default() {
        let glyph = TestFont::new(charstrings::SQUARE).load().unwrap();
        assert_eq!(glyph.advance.x, Fixed::from_i32(300));
        assert_eq!(
            glyph.outline.points(),
            points(&[(0, 0), (100, 0), (100, 100), (0, 100)])
        );
    }

    #[test]
    fn width_only_read_by_first_operator() {
        // vstem consumes no width so the odd count on the later hmoveto is
        // an operand count error
        let cs = CharstringBuilder::new()
            .ints(&[10, 20])
            .op(op::VSTEM)
            .ints(&[5, 5])
            .op(op::HMOVETO)
            .op(op::ENDCHAR)
            .build();
        assert_eq!(
            TestFont::new(&cs).load(),
            Err(CharstringError::OperandCount("hmoveto").into())
        );
    }

    #[test]
    fn endchar_width() {
        let cs = CharstringBuilder::new().int(40).op(op::ENDCHAR).build();
        let glyph = TestFont::new(&cs).load().unwrap();
        assert!(glyph.outline.is_empty());
        assert_eq!(glyph.bbox, None);
        assert_eq!(glyph.advance.x, Fixed::from_i32(60));
    }

    #[test]
    fn arithmetic() {
        let fixed = Fixed::from_i32;
        // (7 - 3) * 2
        let pt = eval_to_point(
            CharstringBuilder::new()
                .ints(&[7, 3])
                .op(op::SUB)
                .int(2)
                .op(op::MUL)
                .int(0),
        );
        assert_eq!(pt, Point::new(fixed(8), fixed(0)));
        let pt = eval_to_point(CharstringBuilder::new().ints(&[7, 2]).op(op::DIV).int(1));
        assert_eq!(pt, Point::new(Fixed::from_f64(3.5), fixed(1)));
        let pt = eval_to_point(
            CharstringBuilder::new()
                .int(5)
                .op(op::NEG)
                .op(op::ABS)
                .int(5)
                .op(op::NEG),
        );
        assert_eq!(pt, Point::new(fixed(5), fixed(-5)));
        let pt = eval_to_point(
            CharstringBuilder::new()
                .int(16)
                .op(op::SQRT)
                .ints(&[3, 4])
                .op(op::ADD),
        );
        assert_eq!(pt, Point::new(fixed(4), fixed(7)));
    }

    #[test]
    fn fixed_operands() {
        let pt = eval_to_point(
            CharstringBuilder::new()
                .fixed(1.5)
                .fixed(0.25)
                .op(op::ADD)
                .int(0),
        );
        assert_eq!(pt, Point::new(Fixed::from_f64(1.75), Fixed::ZERO));
    }

    #[test]
    fn logic_and_conditionals() {
        let fixed = Fixed::from_i32;
        let pt = eval_to_point(
            CharstringBuilder::new()
                .ints(&[1, 0])
                .op(op::AND)
                .ints(&[1, 0])
                .op(op::OR),
        );
        assert_eq!(pt, Point::new(fixed(0), fixed(1)));
        let pt = eval_to_point(
            CharstringBuilder::new()
                .ints(&[5, 5])
                .op(op::EQ)
                .int(0)
                .op(op::NOT),
        );
        assert_eq!(pt, Point::new(fixed(1), fixed(1)));
        // s1 s2 v1 v2 ifelse selects s1 when v1 <= v2
        let pt = eval_to_point(
            CharstringBuilder::new()
                .ints(&[1, 2, 3, 4])
                .op(op::IFELSE)
                .ints(&[1, 2, 4, 3])
                .op(op::IFELSE),
        );
        assert_eq!(pt, Point::new(fixed(1), fixed(2)));
    }

    #[test]
    fn stack_manipulation() {
        let fixed = Fixed::from_i32;
        let pt = eval_to_point(CharstringBuilder::new().ints(&[1, 2]).op(op::EXCH));
        assert_eq!(pt, Point::new(fixed(2), fixed(1)));
        let pt = eval_to_point(CharstringBuilder::new().int(3).op(op::DUP));
        assert_eq!(pt, Point::new(fixed(3), fixed(3)));
        let pt = eval_to_point(CharstringBuilder::new().ints(&[9, 1, 2]).op(op::DROP));
        assert_eq!(pt, Point::new(fixed(9), fixed(1)));
        // 10 20 1 index -> 10 20 10
        let pt = eval_to_point(
            CharstringBuilder::new()
                .ints(&[10, 20, 1])
                .op(op::INDEX)
                .op(op::ADD),
        );
        assert_eq!(pt, Point::new(fixed(10), fixed(30)));
        // 1 2 3 3 1 roll -> 3 1 2
        let pt = eval_to_point(
            CharstringBuilder::new()
                .ints(&[1, 2, 3, 3, 1])
                .op(op::ROLL)
                .op(op::DROP),
        );
        assert_eq!(pt, Point::new(fixed(3), fixed(1)));
    }

    #[test]
    fn transient_array() {
        let pt = eval_to_point(
            CharstringBuilder::new()
                .ints(&[42, 3])
                .op(op::PUT)
                .int(3)
                .op(op::GET)
                .int(0),
        );
        assert_eq!(pt, Point::new(Fixed::from_i32(42), Fixed::ZERO));
        let cs = CharstringBuilder::new()
            .ints(&[1, 32])
            .op(op::PUT)
            .op(op::ENDCHAR)
            .build();
        assert_eq!(
            TestFont::new(&cs).load(),
            Err(StackFault::InvalidTransientIndex(32).into())
        );
    }

    #[test]
    fn random_is_seeded() {
        let cs = CharstringBuilder::new()
            .op(op::RANDOM)
            .int(0)
            .op(op::RMOVETO)
            .op(op::ENDCHAR)
            .build();
        let font = TestFont::new(&cs);
        let glyph = font.load().unwrap();
        // 0 * 1103515245 + 12345 = 12345, whose high 16 bits are zero
        assert_eq!(glyph.outline.points()[0].x, Fixed::from_bits(1));
        let settings = LoadSettings::default().with_random_seed(0x1234_5678);
        let a = font.load_with(&settings, None).unwrap();
        let b = font.load_with(&settings, None).unwrap();
        assert_eq!(a, b);
        let x = a.outline.points()[0].x;
        assert!(x > Fixed::ZERO && x <= Fixed::ONE);
    }

    #[test]
    fn divide_by_zero() {
        let cs = CharstringBuilder::new()
            .ints(&[1, 0])
            .op(op::DIV)
            .op(op::ENDCHAR)
            .build();
        assert_eq!(
            TestFont::new(&cs).load(),
            Err(StackFault::DivideByZero.into())
        );
    }

    #[test]
    fn negative_sqrt() {
        let cs = CharstringBuilder::new()
            .int(-4)
            .op(op::SQRT)
            .op(op::ENDCHAR)
            .build();
        assert_eq!(
            TestFont::new(&cs).load(),
            Err(StackFault::InvalidOperand("sqrt").into())
        );
    }

    #[test]
    fn stack_underflow() {
        let cs = CharstringBuilder::new()
            .ints(&[0, 0])
            .op(op::RMOVETO)
            .int(5)
            .op(op::RLINETO)
            .op(op::ENDCHAR)
            .build();
        assert_eq!(TestFont::new(&cs).load(), Err(StackFault::Underflow.into()));
        let cs = CharstringBuilder::new().op(op::ADD).build();
        assert_eq!(TestFont::new(&cs).load(), Err(StackFault::Underflow.into()));
    }

    #[test]
    fn stack_overflow() {
        let operands = [1; MAX_STACK + 1];
        let cs = CharstringBuilder::new().ints(&operands).build();
        assert_eq!(TestFont::new(&cs).load(), Err(StackFault::Overflow.into()));
    }

    #[test]
    fn wrong_operand_count() {
        let cs = CharstringBuilder::new()
            .ints(&[0, 0])
            .op(op::RMOVETO)
            .ints(&[1, 2, 3])
            .op(op::RLINETO)
            .op(op::ENDCHAR)
            .build();
        assert_eq!(
            TestFont::new(&cs).load(),
            Err(CharstringError::OperandCount("rlineto").into())
        );
        let cs = CharstringBuilder::new()
            .ints(&[0, 0])
            .op(op::RMOVETO)
            .ints(&[1, 2, 3, 4, 5, 6, 7])
            .op(op::RRCURVETO)
            .op(op::ENDCHAR)
            .build();
        assert_eq!(
            TestFont::new(&cs).load(),
            Err(CharstringError::OperandCount("rrcurveto").into())
        );
    }

    #[test]
    fn unterminated() {
        let cs = CharstringBuilder::new().ints(&[0, 0]).op(op::RMOVETO).build();
        assert_eq!(
            TestFont::new(&cs).load(),
            Err(CharstringError::Unterminated.into())
        );
    }

    #[test]
    fn invalid_operators() {
        assert_eq!(
            TestFont::new(&[2]).load(),
            Err(CharstringError::InvalidOperator(2).into())
        );
        assert_eq!(
            TestFont::new(&[12, 99]).load(),
            Err(CharstringError::InvalidEscapeOperator(99).into())
        );
        // Truncated two byte integer
        assert_eq!(
            TestFont::new(&[247]).load(),
            Err(CharstringError::UnexpectedEnd.into())
        );
    }

    #[test]
    fn curve_operators() {
        let cs = CharstringBuilder::new()
            .ints(&[0, 0])
            .op(op::RMOVETO)
            .ints(&[10, 20, 30, 40])
            .op(op::HVCURVETO)
            .op(op::ENDCHAR)
            .build();
        let glyph = TestFont::new(&cs).load().unwrap();
        assert_eq!(
            glyph.outline.points(),
            points(&[(0, 0), (10, 0), (30, 30), (30, 70)])
        );
        let tags = glyph.outline.tags();
        assert!(tags[0].is_on_curve());
        assert!(tags[1].is_off_curve_cubic());
        assert!(tags[2].is_off_curve_cubic());
        assert!(tags[3].is_on_curve());
        // Odd count supplies an initial dy for hhcurveto
        let cs = CharstringBuilder::new()
            .ints(&[0, 0])
            .op(op::RMOVETO)
            .ints(&[5, 10, 20, 30, 40])
            .op(op::HHCURVETO)
            .op(op::ENDCHAR)
            .build();
        let glyph = TestFont::new(&cs).load().unwrap();
        assert_eq!(
            glyph.outline.points(),
            points(&[(0, 0), (10, 5), (30, 35), (70, 35)])
        );
        let cs = CharstringBuilder::new()
            .ints(&[0, 0])
            .op(op::RMOVETO)
            .ints(&[10, 10, 10, 10, 10, 10, 20, 0])
            .op(op::RCURVELINE)
            .ints(&[5, 5, 0, 10, 10, 10, 10, 0])
            .op(op::RLINECURVE)
            .op(op::ENDCHAR)
            .build();
        let glyph = TestFont::new(&cs).load().unwrap();
        assert_eq!(
            glyph.outline.points(),
            points(&[
                (0, 0),
                (10, 10),
                (20, 20),
                (30, 30),
                (50, 30),
                (55, 35),
                (55, 45),
                (65, 55),
                (75, 55)
            ])
        );
    }

    #[test]
    fn flex_operators() {
        let cs = CharstringBuilder::new()
            .ints(&[0, 0])
            .op(op::RMOVETO)
            .ints(&[10, 0, 10, 0, 10, 0, 10, 0, 10, 0, 10, 0, 50])
            .op(op::FLEX)
            .op(op::ENDCHAR)
            .build();
        let glyph = TestFont::new(&cs).load().unwrap();
        assert_eq!(glyph.outline.points().len(), 7);
        assert_eq!(glyph.outline.points()[6], points(&[(60, 0)])[0]);
        // hflex1 returns to the starting y
        let cs = CharstringBuilder::new()
            .ints(&[0, 0])
            .op(op::RMOVETO)
            .ints(&[10, 5, 10, 5, 10, 10, 10, -5, 10])
            .op(op::HFLEX1)
            .op(op::ENDCHAR)
            .build();
        let glyph = TestFont::new(&cs).load().unwrap();
        assert_eq!(glyph.outline.points()[6], points(&[(60, 0)])[0]);
        // flex1 with a dominant horizontal displacement ends at the
        // starting y
        let cs = CharstringBuilder::new()
            .ints(&[0, 0])
            .op(op::RMOVETO)
            .ints(&[10, 10, 10, 10, 10, 0, 10, -10, 10, -5, 5])
            .op(op::FLEX1)
            .op(op::ENDCHAR)
            .build();
        let glyph = TestFont::new(&cs).load().unwrap();
        assert_eq!(glyph.outline.points()[6], points(&[(55, 0)])[0]);
        let cs = CharstringBuilder::new()
            .ints(&[0, 0])
            .op(op::RMOVETO)
            .ints(&[10; 12])
            .op(op::FLEX)
            .op(op::ENDCHAR)
            .build();
        assert_eq!(TestFont::new(&cs).load(), Err(StackFault::Underflow.into()));
    }

    #[test]
    fn flex1_extreme_deltas_do_not_overflow() {
        let cs = CharstringBuilder::new()
            .ints(&[0, 0])
            .op(op::RMOVETO)
            .fixed(-32768.0)
            .ints(&[0; 10])
            .op(op::FLEX1)
            .op(op::ENDCHAR)
            .build();
        let glyph = TestFont::new(&cs).load().unwrap();
        assert_eq!(glyph.outline.points()[6], Point::new(Fixed::MIN, Fixed::ZERO));
        // deltas that overflow when summed wrap around
        let cs = CharstringBuilder::new()
            .ints(&[0, 0])
            .op(op::RMOVETO)
            .fixed(32767.0)
            .int(0)
            .fixed(32767.0)
            .ints(&[0; 8])
            .op(op::FLEX1)
            .op(op::ENDCHAR)
            .build();
        assert!(TestFont::new(&cs).load().is_ok());
    }

    #[test]
    fn drawing_without_move_opens_contour() {
        let cs = CharstringBuilder::new()
            .ints(&[10, 0])
            .op(op::RLINETO)
            .op(op::ENDCHAR)
            .build();
        let glyph = TestFont::new(&cs).load().unwrap();
        assert_eq!(glyph.outline.points(), points(&[(0, 0), (10, 0)]));
        assert_eq!(glyph.outline.contour_ends(), &[1]);
    }

    #[test]
    fn each_move_starts_a_contour() {
        let cs = CharstringBuilder::new()
            .ints(&[0, 0])
            .op(op::RMOVETO)
            .int(10)
            .op(op::HLINETO)
            .int(20)
            .op(op::VMOVETO)
            .int(10)
            .op(op::VLINETO)
            .op(op::ENDCHAR)
            .build();
        let glyph = TestFont::new(&cs).load().unwrap();
        assert_eq!(
            glyph.outline.points(),
            points(&[(0, 0), (10, 0), (10, 20), (10, 30)])
        );
        assert_eq!(glyph.outline.contour_ends(), &[1, 3]);
    }

    #[test]
    fn local_and_global_subroutines() {
        let local = CharstringBuilder::new()
            .ints(&[50, 0])
            .op(op::RLINETO)
            .op(op::RETURN)
            .build();
        let global = CharstringBuilder::new()
            .ints(&[0, 50])
            .op(op::RLINETO)
            .op(op::ENDCHAR)
            .build();
        // Both INDEXes have a single entry so the bias is 107
        let cs = CharstringBuilder::new()
            .ints(&[0, 0])
            .op(op::RMOVETO)
            .int(-107)
            .op(op::CALLSUBR)
            .int(-107)
            .op(op::CALLGSUBR)
            .build();
        let glyph = TestFont::new(&cs)
            .with_local_subrs(&[local.as_slice()])
            .with_global_subrs(&[global.as_slice()])
            .load()
            .unwrap();
        assert_eq!(glyph.outline.points(), points(&[(0, 0), (50, 0), (50, 50)]));
    }

    #[test]
    fn subroutine_errors() {
        let cs = CharstringBuilder::new()
            .int(-107)
            .op(op::CALLSUBR)
            .op(op::ENDCHAR)
            .build();
        assert_eq!(
            TestFont::new(&cs).load(),
            Err(CharstringError::MissingSubroutines.into())
        );
        let cs = CharstringBuilder::new()
            .int(5)
            .op(op::CALLSUBR)
            .op(op::ENDCHAR)
            .build();
        assert_eq!(
            TestFont::new(&cs)
                .with_local_subrs(&[&[11u8][..]])
                .load(),
            Err(CharstringError::InvalidSubroutine(112).into())
        );
        let cs = CharstringBuilder::new()
            .int(-107)
            .op(op::CALLGSUBR)
            .op(op::ENDCHAR)
            .build();
        assert_eq!(
            TestFont::new(&cs).load(),
            Err(CharstringError::InvalidSubroutine(0).into())
        );
    }

    #[test]
    fn recursive_subroutine() {
        let cs = CharstringBuilder::new()
            .int(-107)
            .op(op::CALLSUBR)
            .op(op::ENDCHAR)
            .build();
        let font = TestFont::new(&cs).with_local_subrs(&[charstrings::SELF_CALLING_SUBR]);
        assert_eq!(
            font.load(),
            Err(Error::RecursionTooDeep {
                limit: NESTING_DEPTH_LIMIT
            })
        );
        let settings = LoadSettings::default().with_depth_limit(2);
        assert_eq!(
            font.load_with(&settings, None),
            Err(Error::RecursionTooDeep { limit: 2 })
        );
    }

    #[derive(Default)]
    struct HintRecorder {
        stems: Vec<(StemKind, Vec<Fixed>)>,
        hint_masks: Vec<Vec<u8>>,
        counter_masks: Vec<Vec<u8>>,
    }

    impl HintHook for HintRecorder {
        fn stems(&mut self, kind: StemKind, values: &[Fixed]) -> Result<(), HintError> {
            self.stems.push((kind, values.to_vec()));
            Ok(())
        }

        fn hint_mask(&mut self, mask: &[u8]) -> Result<(), HintError> {
            self.hint_masks.push(mask.to_vec());
            Ok(())
        }

        fn counter_mask(&mut self, mask: &[u8]) -> Result<(), HintError> {
            self.counter_masks.push(mask.to_vec());
            Ok(())
        }
    }

    #[test]
    fn hints_are_forwarded() {
        // Nine stems need a two byte mask. The mask bytes would be misread
        // as operands if they were not consumed.
        let cs = CharstringBuilder::new()
            .ints(&[600])
            .ints(&[0, 10, 20, 10, 40, 10, 60, 10, 80, 10, 100, 10, 120, 10])
            .op(op::HSTEMHM)
            .ints(&[0, 10, 30, 10])
            .op(op::HINTMASK)
            .bytes(&[0xFF, 0x80])
            .op(op::CNTRMASK)
            .bytes(&[0xFF, 0xFF])
            .ints(&[0, 0])
            .op(op::RMOVETO)
            .op(op::ENDCHAR)
            .build();
        let mut recorder = HintRecorder::default();
        let glyph = TestFont::new(&cs)
            .load_with(&LoadSettings::default(), Some(&mut recorder))
            .unwrap();
        assert_eq!(glyph.advance.x, Fixed::from_i32(620));
        assert_eq!(glyph.outline.points().len(), 1);
        assert_eq!(recorder.stems.len(), 2);
        assert_eq!(recorder.stems[0].0, StemKind::Horizontal);
        assert_eq!(recorder.stems[0].1.len(), 14);
        assert_eq!(recorder.stems[0].1[2], Fixed::from_i32(20));
        assert_eq!(
            recorder.stems[1],
            (
                StemKind::Vertical,
                vec![
                    Fixed::ZERO,
                    Fixed::from_i32(10),
                    Fixed::from_i32(30),
                    Fixed::from_i32(10)
                ]
            )
        );
        assert_eq!(recorder.hint_masks, vec![vec![0xFF, 0x80]]);
        assert_eq!(recorder.counter_masks, vec![vec![0xFF, 0xFF]]);
    }

    #[test]
    fn mask_bytes_consumed_without_hook() {
        let cs = CharstringBuilder::new()
            .ints(&[0, 10])
            .op(op::HSTEM)
            .op(op::HINTMASK)
            .bytes(&[0x80])
            .ints(&[0, 0])
            .op(op::RMOVETO)
            .op(op::ENDCHAR)
            .build();
        let glyph = TestFont::new(&cs).load().unwrap();
        assert_eq!(glyph.outline.points(), points(&[(0, 0)]));
        let cs = CharstringBuilder::new()
            .ints(&[0, 10])
            .op(op::HSTEM)
            .op(op::HINTMASK)
            .build();
        assert_eq!(
            TestFont::new(&cs).load(),
            Err(CharstringError::UnexpectedEnd.into())
        );
    }
}

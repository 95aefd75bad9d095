//! Operand stack for charstring evaluation.

use font_types::Fixed;

use crate::error::StackFault;

/// Maximum size of the operand stack.
///
/// "Appendix B Type 2 Charstring Implementation Limits" at
/// <https://adobe-type-tools.github.io/font-tech-notes/pdfs/5177.Type2.pdf#page=33>
pub const MAX_STACK: usize = 48;

/// Operand stack for charstrings.
///
/// The operand stack can contain either 32-bit integers or 16.16 fixed point
/// values. The type is known when pushing to the stack and the expected type
/// is also known (based on the operator) when reading from the stack, so the
/// conversion is performed on demand at read time.
///
/// Entries are stored in parallel arrays holding the raw 32-bit value and a
/// flag that tracks which values are fixed point.
pub struct Stack {
    values: [i32; MAX_STACK],
    value_is_fixed: [bool; MAX_STACK],
    top: usize,
}

impl Stack {
    pub fn new() -> Self {
        Self {
            values: [0; MAX_STACK],
            value_is_fixed: [false; MAX_STACK],
            top: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.top
    }

    /// Returns true if the number of elements on the stack is odd.
    ///
    /// Used for processing some charstring operators where an odd
    /// count represents the presence of the glyph advance width at the
    /// bottom of the stack.
    pub fn len_is_odd(&self) -> bool {
        self.top & 1 != 0
    }

    pub fn verify_at_least_len(&self, len: usize) -> Result<(), StackFault> {
        if self.top < len {
            Err(StackFault::Underflow)
        } else {
            Ok(())
        }
    }

    pub fn clear(&mut self) {
        self.top = 0;
    }

    pub fn push(&mut self, number: impl Into<Number>) -> Result<(), StackFault> {
        match number.into() {
            Number::I32(value) => self.push_impl(value, false),
            Number::Fixed(value) => self.push_impl(value.to_bits(), true),
        }
    }

    /// Returns the 16.16 fixed point value at the given index on the stack.
    ///
    /// If the value was pushed as an integer, it will be automatically
    /// converted to 16.16 fixed point.
    pub fn get_fixed(&self, index: usize) -> Result<Fixed, StackFault> {
        if index >= self.top {
            return Err(StackFault::Underflow);
        }
        Ok(self.fixed_at(index))
    }

    /// Returns an array of `N` 16.16 fixed point values starting at
    /// `first_index`.
    pub fn fixed_array<const N: usize>(
        &self,
        first_index: usize,
    ) -> Result<[Fixed; N], StackFault> {
        let end = first_index.checked_add(N).ok_or(StackFault::Underflow)?;
        if end > self.top {
            return Err(StackFault::Underflow);
        }
        let mut result = [Fixed::ZERO; N];
        for (i, dest) in result.iter_mut().enumerate() {
            *dest = self.fixed_at(first_index + i);
        }
        Ok(result)
    }

    /// Returns an iterator yielding all elements on the stack
    /// as 16.16 fixed point values.
    pub fn fixed_values(&self) -> impl Iterator<Item = Fixed> + '_ {
        (0..self.top).map(|i| self.fixed_at(i))
    }

    /// Pops a number from the top of the stack, preserving its type.
    pub fn pop(&mut self) -> Result<Number, StackFault> {
        let i = self.pop_index()?;
        Ok(Number::from_stack(self.values[i], self.value_is_fixed[i]))
    }

    /// Pops a 16.16 fixed point value from the top of the stack.
    pub fn pop_fixed(&mut self) -> Result<Fixed, StackFault> {
        self.pop().map(Number::to_fixed)
    }

    /// Pops an integer from the top of the stack.
    ///
    /// Fixed point values are truncated toward negative infinity, matching
    /// the `>> 16` used for integer operands by FreeType's CFF decoder.
    pub fn pop_i32(&mut self) -> Result<i32, StackFault> {
        self.pop().map(Number::to_i32)
    }

    /// Duplicates the top element.
    pub fn dup(&mut self) -> Result<(), StackFault> {
        let top = self.top.checked_sub(1).ok_or(StackFault::Underflow)?;
        self.push_impl(self.values[top], self.value_is_fixed[top])
    }

    /// Exchanges the top two elements.
    pub fn exch(&mut self) -> Result<(), StackFault> {
        self.verify_at_least_len(2)?;
        let (a, b) = (self.top - 1, self.top - 2);
        self.values.swap(a, b);
        self.value_is_fixed.swap(a, b);
        Ok(())
    }

    /// Pushes a copy of the element `depth` entries below the top.
    ///
    /// A negative depth copies the top element.
    pub fn copy_from_depth(&mut self, depth: i32) -> Result<(), StackFault> {
        let depth = depth.max(0) as usize;
        if depth >= self.top {
            return Err(StackFault::InvalidOperand("index"));
        }
        let i = self.top - 1 - depth;
        self.push_impl(self.values[i], self.value_is_fixed[i])
    }

    /// Rotates the top `count` elements by `shift` positions toward the
    /// top of the stack.
    pub fn roll(&mut self, count: i32, shift: i32) -> Result<(), StackFault> {
        if count < 0 || count as usize > self.top {
            return Err(StackFault::InvalidOperand("roll"));
        }
        let count = count as usize;
        if count == 0 {
            return Ok(());
        }
        let start = self.top - count;
        let shift = shift.rem_euclid(count as i32) as usize;
        self.values[start..self.top].rotate_right(shift);
        self.value_is_fixed[start..self.top].rotate_right(shift);
        Ok(())
    }

    fn fixed_at(&self, index: usize) -> Fixed {
        Number::from_stack(self.values[index], self.value_is_fixed[index]).to_fixed()
    }

    fn push_impl(&mut self, value: i32, is_fixed: bool) -> Result<(), StackFault> {
        if self.top == MAX_STACK {
            return Err(StackFault::Overflow);
        }
        self.values[self.top] = value;
        self.value_is_fixed[self.top] = is_fixed;
        self.top += 1;
        Ok(())
    }

    fn pop_index(&mut self) -> Result<usize, StackFault> {
        if self.top > 0 {
            self.top -= 1;
            Ok(self.top)
        } else {
            Err(StackFault::Underflow)
        }
    }
}

impl Default for Stack {
    fn default() -> Self {
        Self::new()
    }
}

/// Either a signed 32-bit integer or a 16.16 fixed point number.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum Number {
    I32(i32),
    Fixed(Fixed),
}

impl Number {
    fn from_stack(raw: i32, is_fixed: bool) -> Self {
        if is_fixed {
            Self::Fixed(Fixed::from_bits(raw))
        } else {
            Self::I32(raw)
        }
    }

    pub fn to_fixed(self) -> Fixed {
        match self {
            Self::I32(value) => Fixed::from_i32(value),
            Self::Fixed(value) => value,
        }
    }

    pub fn to_i32(self) -> i32 {
        match self {
            Self::I32(value) => value,
            Self::Fixed(value) => value.to_bits() >> 16,
        }
    }
}

impl From<i32> for Number {
    fn from(value: i32) -> Self {
        Self::I32(value)
    }
}

impl From<Fixed> for Number {
    fn from(value: Fixed) -> Self {
        Self::Fixed(value)
    }
}

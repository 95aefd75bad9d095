//! A buffer of big-endian bytes, for building test inputs.

/// Types that can be written to a [`BeBuffer`].
pub trait BeScalar {
    fn write_be(&self, out: &mut Vec<u8>);
}

macro_rules! be_scalar {
    ($($ty:ty),*) => {
        $(
            impl BeScalar for $ty {
                fn write_be(&self, out: &mut Vec<u8>) {
                    out.extend_from_slice(&self.to_be_bytes());
                }
            }
        )*
    };
}

be_scalar!(u8, i8, u16, i16, u32, i32);

/// A 24-bit unsigned integer, used for 3 byte INDEX offsets.
#[derive(Copy, Clone, Debug)]
pub struct U24(pub u32);

impl BeScalar for U24 {
    fn write_be(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(&self.0.to_be_bytes()[1..]);
    }
}

/// A convenience type for generating a buffer of big-endian bytes.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct BeBuffer(Vec<u8>);

impl BeBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// The current length of the buffer in bytes.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns `true` if the buffer contains zero bytes.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Write any scalar to this buffer.
    pub fn push(mut self, item: impl BeScalar) -> Self {
        item.write_be(&mut self.0);
        self
    }

    /// Write multiple scalars into the buffer.
    pub fn extend<T: BeScalar>(mut self, iter: impl IntoIterator<Item = T>) -> Self {
        for item in iter {
            item.write_be(&mut self.0);
        }
        self
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.0
    }

    pub fn to_vec(&self) -> Vec<u8> {
        self.0.clone()
    }
}

impl std::ops::Deref for BeBuffer {
    type Target = [u8];

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

//! Bit-field tools for fixed-width hardware records
//!
//! Record layouts are written as tables of [`Field`]s counted from the least
//! significant bit, and read with shift and mask. Nothing here depends on how
//! a compiler would lay out a bit-field struct.

use num_traits::{PrimInt, Unsigned};

/// A run of `width` bits starting at bit `lsb`
#[derive(Clone, Copy, Eq, PartialEq, Debug)]
pub struct Field {
    pub lsb: u32,
    pub width: u32,
}

impl Field {
    pub const fn new(lsb: u32, width: u32) -> Self {
        Field { lsb, width }
    }

    /// First bit above this field, for chaining layouts
    pub const fn next(&self) -> u32 {
        self.lsb + self.width
    }
}

/// Read fields and single bits out of an unsigned word.
pub trait BitField: PrimInt + Unsigned {
    fn field(self, f: Field) -> Self;
    fn check(self, b: u32) -> bool;
}

impl<T: PrimInt + Unsigned> BitField for T {
    #[inline]
    fn field(self, f: Field) -> Self {
        let bits = (std::mem::size_of::<T>() * 8) as u32;
        debug_assert!(f.width > 0 && f.next() <= bits);
        let shifted = self >> f.lsb as usize;
        if f.width >= bits {
            shifted
        } else {
            shifted & ((T::one() << f.width as usize) - T::one())
        }
    }

    #[inline]
    fn check(self, b: u32) -> bool {
        return (self >> b as usize) & T::one() == T::one();
    }
}

/// Assemble a word from `(field, value)` pairs; values are masked to width.
/// Used to build synthetic records.
pub fn pack(fields: &[(Field, u32)]) -> u32 {
    let mut w = 0u32;
    for &(f, v) in fields {
        let mask = if f.width >= 32 { u32::MAX } else { (1u32 << f.width) - 1 };
        w |= (v & mask) << f.lsb;
    }
    return w;
}

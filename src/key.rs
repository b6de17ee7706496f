//! Keys whose representable range is exactly `[0, 64)`.
//!
//! A `Key` can only be built from an in-range integer, so the map operations
//! never have to check bounds and can never shift a `u64` by 64 or more.

use std::fmt;

use crate::error::{Error, Result};

/// Number of distinct keys a map can hold.
pub const CAPACITY: usize = 64;

/// A key in `[0, 64)`.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Key(u8);

impl Key {
    /// The smallest key, `0`.
    pub const MIN: Key = Key(0);

    /// The largest key, `63`.
    pub const MAX: Key = Key(CAPACITY as u8 - 1);

    /// Create a key, failing with [`Error::KeyOutOfRange`] when `raw >= 64`.
    pub const fn new(raw: u8) -> Result<Self> {
        if (raw as usize) < CAPACITY {
            Ok(Key(raw))
        } else {
            Err(Error::KeyOutOfRange(raw as i128))
        }
    }

    /// Build a key from the low six bits of `raw`. Never fails.
    pub const fn from_low_bits(raw: u8) -> Self {
        Key(raw & (CAPACITY as u8 - 1))
    }

    /// The key as an integer.
    #[inline]
    pub const fn get(self) -> u8 {
        self.0
    }

    /// Single-bit mask selecting this key in a presence bitmap.
    #[inline]
    pub const fn bit(self) -> u64 {
        1u64 << self.0
    }

    /// Mask of all bits strictly below this key.
    #[inline]
    pub const fn below(self) -> u64 {
        self.bit() - 1
    }

    /// All 64 keys in ascending order.
    pub fn all() -> impl DoubleEndedIterator<Item = Key> + ExactSizeIterator {
        (0..CAPACITY as u8).map(Key)
    }

    /// Lowest key set in `bits`, if any.
    #[inline]
    pub(crate) fn lowest_in(bits: u64) -> Option<Key> {
        if bits == 0 {
            None
        } else {
            Some(Key(bits.trailing_zeros() as u8))
        }
    }

    /// Highest key set in `bits`, if any.
    #[inline]
    pub(crate) fn highest_in(bits: u64) -> Option<Key> {
        if bits == 0 {
            None
        } else {
            Some(Key(Key::MAX.0 - bits.leading_zeros() as u8))
        }
    }
}

impl fmt::Debug for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&self.0, f)
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

macro_rules! impl_try_from_int {
    ($($t:ty),*) => {
        $(
            impl TryFrom<$t> for Key {
                type Error = Error;

                fn try_from(raw: $t) -> Result<Self> {
                    let wide = raw as i128;
                    if (0..CAPACITY as i128).contains(&wide) {
                        Ok(Key(wide as u8))
                    } else {
                        Err(Error::KeyOutOfRange(wide))
                    }
                }
            }
        )*
    };
}

impl_try_from_int!(u8, u16, u32, u64, usize, i8, i16, i32, i64, isize);

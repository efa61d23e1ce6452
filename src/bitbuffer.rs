//! Growable bit sequences used to assemble segment data and codewords.

use crate::error::{QrError, Result};

/// The largest number of bits any [`BitSet`] may hold (2^31 - 1).
pub const MAX_BIT_LENGTH: usize = i32::MAX as usize;

/// A sequence of bits that can be read, written and appended to.
///
/// Only `len`, `get_bit` and `set_bit` need implementing; appending is
/// built on top of them so segment and codeword code stays independent of
/// how the bits are stored.
pub trait BitSet {
    /// Returns the number of bits held.
    fn len(&self) -> usize;

    /// Returns the bit at `index`, or `false` if `index` is past the end.
    fn get_bit(&self, index: usize) -> bool;

    /// Sets the bit at `index`, growing the sequence with `false` bits if
    /// `index` is past the end.
    fn set_bit(&mut self, index: usize, value: bool);

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Appends the low `len` bits of `val`, most significant bit first.
    ///
    /// # Errors
    ///
    /// [`QrError::BitValueOutOfRange`] if `len > 31` or `val` has bits set
    /// at or above position `len`; [`QrError::BufferOverflow`] if the
    /// result would exceed [`MAX_BIT_LENGTH`].
    fn append_bits(&mut self, val: u32, len: u8) -> Result<()> {
        if len > 31 || (val >> len) != 0 {
            return Err(QrError::BitValueOutOfRange {
                value: val,
                bits: len,
            });
        }
        if MAX_BIT_LENGTH.saturating_sub(self.len()) < usize::from(len) {
            return Err(QrError::BufferOverflow);
        }
        for i in (0..len).rev() {
            let end = self.len();
            self.set_bit(end, get_bit(val, i));
        }
        Ok(())
    }

    /// Appends every bit of `other`, in order.
    fn append_from(&mut self, other: &dyn BitSet) -> Result<()> {
        if MAX_BIT_LENGTH.saturating_sub(self.len()) < other.len() {
            return Err(QrError::BufferOverflow);
        }
        for i in 0..other.len() {
            let end = self.len();
            self.set_bit(end, other.get_bit(i));
        }
        Ok(())
    }
}

/// A `Vec<bool>`-backed [`BitSet`].
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct BitBuffer {
    bits: Vec<bool>,
}

impl BitBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty buffer with room for `capacity` bits.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            bits: Vec::with_capacity(capacity),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = bool> + '_ {
        self.bits.iter().copied()
    }

    /// Packs the bits into bytes, most significant bit first. A trailing
    /// partial byte is padded with zero bits.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut result = vec![0u8; (self.bits.len() + 7) / 8];
        for (i, &bit) in self.bits.iter().enumerate() {
            result[i >> 3] |= u8::from(bit) << (7 - (i & 7));
        }
        result
    }
}

impl BitSet for BitBuffer {
    fn len(&self) -> usize {
        self.bits.len()
    }

    fn get_bit(&self, index: usize) -> bool {
        self.bits.get(index).copied().unwrap_or(false)
    }

    fn set_bit(&mut self, index: usize, value: bool) {
        if index >= self.bits.len() {
            self.bits.resize(index + 1, false);
        }
        self.bits[index] = value;
    }
}

/// Returns true iff the i'th bit of x is set to 1.
pub(crate) fn get_bit(x: u32, i: u8) -> bool {
    ((x >> i) & 1) != 0
}

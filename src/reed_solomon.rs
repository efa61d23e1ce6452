//! Reed–Solomon error correction over GF(2^8/0x11D).

use crate::error::{QrError, Result};

/// Computes the Reed-Solomon divisor polynomials for a given degree once,
/// and the remainders of any number of data blocks against it.
#[derive(Clone, Debug)]
pub struct ReedSolomonGenerator {
    /// Coefficients of the divisor polynomial, highest to lowest power,
    /// excluding the leading term which is always 1.
    divisor: Vec<u8>,
}

impl ReedSolomonGenerator {
    /// Creates a generator for the given number of ECC codewords.
    ///
    /// # Errors
    ///
    /// [`QrError::DegreeOutOfRange`] unless `1 <= degree <= 255`.
    pub fn new(degree: usize) -> Result<Self> {
        Ok(Self {
            divisor: compute_divisor(degree)?,
        })
    }

    pub fn degree(&self) -> usize {
        self.divisor.len()
    }

    /// Returns the divisor coefficients, highest power first, without the leading 1.
    pub fn divisor(&self) -> &[u8] {
        &self.divisor
    }

    /// Returns the ECC codewords for the given data block.
    pub fn compute_remainder(&self, data: &[u8]) -> Vec<u8> {
        compute_remainder(data, &self.divisor)
    }
}

/// Returns the divisor polynomial of the given degree, the product
/// (x - r^0) * (x - r^1) * ... * (x - r^{degree-1}) with r = 0x02.
///
/// # Errors
///
/// [`QrError::DegreeOutOfRange`] unless `1 <= degree <= 255`.
pub fn compute_divisor(degree: usize) -> Result<Vec<u8>> {
    if !(1..=255).contains(&degree) {
        return Err(QrError::DegreeOutOfRange(degree));
    }
    // Start off with the monomial x^0
    let mut result = vec![0u8; degree];
    result[degree - 1] = 1;

    // Multiply the current product by (x - r^i) for each i, dropping the
    // highest monomial term which is always 1x^degree.
    let mut root: u8 = 1;
    for _ in 0..degree {
        for j in 0..degree {
            result[j] = multiply(result[j], root);
            if j + 1 < degree {
                result[j] ^= result[j + 1];
            }
        }
        root = multiply(root, 0x02);
    }
    Ok(result)
}

/// Returns the remainder of `data` divided by `divisor`. The result has
/// the same length as `divisor`.
pub fn compute_remainder(data: &[u8], divisor: &[u8]) -> Vec<u8> {
    let mut result = vec![0u8; divisor.len()];
    if result.is_empty() {
        return result;
    }
    for b in data {
        let factor: u8 = b ^ result[0];
        result.copy_within(1.., 0);
        let last = result.len() - 1;
        result[last] = 0;
        for (x, &y) in result.iter_mut().zip(divisor) {
            *x ^= multiply(y, factor);
        }
    }
    result
}

/// Returns the product of the two given field elements modulo GF(2^8/0x11D).
pub fn multiply(x: u8, y: u8) -> u8 {
    // Russian peasant multiplication
    let mut z: u8 = 0;
    for i in (0..8).rev() {
        z = (z << 1) ^ ((z >> 7) * 0x1D);
        z ^= ((y >> i) & 1) * x;
    }
    z
}

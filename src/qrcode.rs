//! QR Code symbol construction.
//!
//! This module turns segments into a finished QR Code Model 2 symbol
//! (versions 1–40, four error correction levels). It packs segment bits
//! into data codewords, adds interleaved Reed–Solomon error correction,
//! draws the function patterns, places the codewords and picks the mask
//! with the lowest penalty score.

use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::bitbuffer::{get_bit, BitBuffer, BitSet};
use crate::config::{EncodeOptions, Segmentation};
use crate::error::{QrError, Result};
use crate::reed_solomon::ReedSolomonGenerator;
use crate::segment::QrSegment;

/// A QR Code symbol, representing a square grid of dark and light modules.
///
/// Instances are immutable after creation and can be shared freely
/// between threads. Renderers need only [`QrCode::size`] and
/// [`QrCode::get_module`].
///
/// # Creation
///
/// - High-level: [`QrCode::encode_text`] or [`QrCode::encode_binary`].
/// - Mid-level: [`QrCode::encode_segments`], [`QrCode::encode_segments_advanced`]
///   or [`QrCode::encode_text_with`] for a full set of [`EncodeOptions`].
/// - Low-level: [`QrCode::encode_segments_to_codewords`] followed by
///   [`QrCode::encode_codewords`].
///
/// # Example
///
/// ```rust
/// use qrmatrix::{QrCode, QrCodeEcc};
///
/// let qr = QrCode::encode_text("Hello, world!", QrCodeEcc::Low).unwrap();
/// assert_eq!(qr.version().value(), 1);
/// assert_eq!(qr.size(), 21);
/// ```
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct QrCode {
    version: Version,

    /// The width and height of this QR Code, measured in modules, between
    /// 21 and 177 (inclusive). This is equal to version * 4 + 17.
    size: i32,

    errorcorrectionlevel: QrCodeEcc,

    mask: Mask,

    /// The modules of this QR Code (false = light, true = dark), row-major.
    modules: Vec<bool>,
}

impl QrCode {
    /// Returns a QR Code representing the given Unicode text at the given
    /// error correction level.
    ///
    /// The whole text is encoded in a single mode (see
    /// [`QrSegment::make_segments`]); the smallest version that fits is
    /// used and the ECC level may be raised if that costs no extra version.
    pub fn encode_text(text: &str, ecl: QrCodeEcc) -> Result<Self> {
        let segs: Vec<QrSegment> = QrSegment::make_segments(text)?;
        QrCode::encode_segments(&segs, ecl)
    }

    /// Returns a QR Code representing the given binary data in byte mode.
    pub fn encode_binary(data: &[u8], ecl: QrCodeEcc) -> Result<Self> {
        let segs: [QrSegment; 1] = [QrSegment::make_bytes(data)];
        QrCode::encode_segments(&segs, ecl)
    }

    /// Returns a QR Code representing the given segments at the given error
    /// correction level, with automatic version, mask and ECC boost.
    pub fn encode_segments(segs: &[QrSegment], ecl: QrCodeEcc) -> Result<Self> {
        QrCode::encode_segments_advanced(segs, ecl, Version::MIN, Version::MAX, None, true)
    }

    /// Returns a QR Code for the given text using every setting in `options`,
    /// including the choice between single-mode and optimal segmentation.
    pub fn encode_text_with(text: &str, options: &EncodeOptions) -> Result<Self> {
        let (minversion, maxversion, mask) = options.validate()?;
        let segs: Vec<QrSegment> = match options.segmentation {
            Segmentation::Single => QrSegment::make_segments(text)?,
            Segmentation::Optimal => {
                QrSegment::make_segments_optimally(text, options.ecl, minversion, maxversion)?
            }
        };
        QrCode::encode_segments_advanced(
            &segs,
            options.ecl,
            minversion,
            maxversion,
            mask,
            options.boost_ecl,
        )
    }

    /// Returns a QR Code for the given segments using the version, mask and
    /// ECC settings in `options`. `options.segmentation` is not consulted.
    pub fn encode_segments_with(segs: &[QrSegment], options: &EncodeOptions) -> Result<Self> {
        let (minversion, maxversion, mask) = options.validate()?;
        QrCode::encode_segments_advanced(
            segs,
            options.ecl,
            minversion,
            maxversion,
            mask,
            options.boost_ecl,
        )
    }

    /// Returns a QR Code representing the given segments with the given encoding parameters.
    ///
    /// The smallest possible version within `minversion..=maxversion` is
    /// chosen. If `boostecl` is `true`, the ECC level of the result may be
    /// higher than `ecl` if that can be done without increasing the
    /// version. `mask` is `None` for automatic selection (slower) or a
    /// fixed mask pattern.
    pub fn encode_segments_advanced(
        segs: &[QrSegment],
        ecl: QrCodeEcc,
        minversion: Version,
        maxversion: Version,
        mask: Option<Mask>,
        boostecl: bool,
    ) -> Result<Self> {
        let (datacodewords, ecl, version) =
            QrCode::encode_segments_to_codewords(segs, ecl, minversion, maxversion, boostecl)?;
        QrCode::encode_codewords(version, ecl, &datacodewords, mask)
    }

    /// Packs the given segments into data codewords for the smallest
    /// version that fits, returning the codewords together with the
    /// (possibly boosted) ECC level and the chosen version.
    ///
    /// # Errors
    ///
    /// [`QrError::InvalidVersionRange`] if `minversion > maxversion`;
    /// [`QrError::SegmentTooLong`] if a character count never fits its
    /// field; [`QrError::DataOverCapacity`] if the bits exceed the capacity
    /// of `maxversion`.
    pub fn encode_segments_to_codewords(
        segs: &[QrSegment],
        mut ecl: QrCodeEcc,
        minversion: Version,
        maxversion: Version,
        boostecl: bool,
    ) -> Result<(Vec<u8>, QrCodeEcc, Version)> {
        if minversion > maxversion {
            return Err(QrError::InvalidVersionRange {
                min: minversion.value(),
                max: maxversion.value(),
            });
        }

        // Find the minimal version number to use
        let mut version: Version = minversion;
        let datausedbits: usize = loop {
            let datacapacitybits: usize = QrCode::get_num_data_codewords(version, ecl) * 8;
            let dataused: Option<usize> = QrSegment::get_total_bits(segs, version);
            match dataused {
                Some(n) if n <= datacapacitybits => break n,
                _ if version >= maxversion => {
                    return Err(match dataused {
                        None => QrError::SegmentTooLong,
                        Some(n) => QrError::DataOverCapacity {
                            used: n,
                            capacity: datacapacitybits,
                        },
                    });
                }
                _ => version = Version::new(version.value() + 1)?,
            }
        };

        // Increase the error correction level while the data still fits in the current version number
        for &newecl in &[QrCodeEcc::Medium, QrCodeEcc::Quartile, QrCodeEcc::High] {
            if boostecl && datausedbits <= QrCode::get_num_data_codewords(version, newecl) * 8 {
                ecl = newecl;
            }
        }
        debug!(
            version = version.value(),
            ecl = ?ecl,
            used_bits = datausedbits,
            "selected symbol version"
        );

        // Concatenate all segments to create the data bit string
        let datacapacitybits: usize = QrCode::get_num_data_codewords(version, ecl) * 8;
        let mut bb = BitBuffer::with_capacity(datacapacitybits);
        for seg in segs {
            bb.append_bits(seg.mode().mode_bits(), 4)?;
            let numchars = u32::try_from(seg.num_chars()).map_err(|_| QrError::SegmentTooLong)?;
            bb.append_bits(numchars, seg.mode().num_char_count_bits(version))?;
            bb.append_from(seg.data())?;
        }
        debug_assert_eq!(bb.len(), datausedbits);

        // Add terminator and pad up to a byte if applicable
        let numzerobits: usize = core::cmp::min(4, datacapacitybits - bb.len());
        bb.append_bits(0, numzerobits as u8)?;
        let numzerobits: usize = bb.len().wrapping_neg() & 7;
        bb.append_bits(0, numzerobits as u8)?;
        debug_assert_eq!(bb.len() % 8, 0);

        // Pad with alternating bytes until data capacity is reached
        for &padbyte in [0xEC, 0x11].iter().cycle() {
            if bb.len() >= datacapacitybits {
                break;
            }
            bb.append_bits(padbyte, 8)?;
        }
        Ok((bb.to_bytes(), ecl, version))
    }

    /// Creates a QR Code with the given version, error correction level,
    /// data codeword bytes and mask.
    ///
    /// This is a low-level API that most users should not use directly.
    /// `datacodewords` must hold exactly
    /// [`QrCode::get_num_data_codewords`]`(version, ecl)` bytes, as produced by
    /// [`QrCode::encode_segments_to_codewords`].
    ///
    /// # Errors
    ///
    /// [`QrError::CodewordLengthMismatch`] if the codeword count is wrong.
    pub fn encode_codewords(
        version: Version,
        ecl: QrCodeEcc,
        datacodewords: &[u8],
        mask: Option<Mask>,
    ) -> Result<Self> {
        let allcodewords: Vec<u8> = add_ecc_and_interleave(datacodewords, version, ecl)?;

        let mut canvas = Canvas::new(version);
        canvas.draw_function_patterns(ecl);
        canvas.draw_codewords(&allcodewords)?;

        let mask: Mask = match mask {
            Some(m) => m,
            None => canvas.choose_mask(ecl),
        };
        canvas.apply_mask(mask);
        canvas.draw_format_bits(ecl, mask);
        debug!(mask = mask.value(), "applied mask");
        Ok(canvas.finish(ecl, mask))
    }

    /// Returns this QR Code's version, in the range [1, 40].
    pub fn version(&self) -> Version {
        self.version
    }

    /// Returns this QR Code's size, in the range [21, 177].
    pub fn size(&self) -> i32 {
        self.size
    }

    /// Returns this QR Code's error correction level.
    pub fn error_correction_level(&self) -> QrCodeEcc {
        self.errorcorrectionlevel
    }

    /// Returns this QR Code's mask, in the range [0, 7].
    pub fn mask(&self) -> Mask {
        self.mask
    }

    /// Returns the color of the module at the given coordinates.
    ///
    /// Returns `true` for dark modules and `false` for light modules. Coordinates outside the QR
    /// code's bounds return `false`.
    ///
    /// # Arguments
    ///
    /// * `x` - X-coordinate (0 is left).
    /// * `y` - Y-coordinate (0 is top).
    pub fn get_module(&self, x: i32, y: i32) -> bool {
        let range = 0..self.size;
        range.contains(&x)
            && range.contains(&y)
            && self.modules[(y * self.size + x) as usize]
    }

    /// Returns the number of data bits that can be stored in a QR Code of the
    /// given version number, after all function modules are excluded. This
    /// includes remainder bits, so it might not be a multiple of 8.
    /// The result is in the range [208, 29648].
    pub fn get_num_raw_data_modules(ver: Version) -> usize {
        let ver = usize::from(ver.value());
        let mut result: usize = (16 * ver + 128) * ver + 64;
        if ver >= 2 {
            let numalign: usize = ver / 7 + 2;
            result -= (25 * numalign - 10) * numalign - 55;
            if ver >= 7 {
                result -= 36;
            }
        }
        result
    }

    /// Returns the number of 8-bit data (i.e. not error correction) codewords
    /// contained in any QR Code of the given version and error correction level,
    /// with remainder bits discarded.
    pub fn get_num_data_codewords(ver: Version, ecl: QrCodeEcc) -> usize {
        QrCode::get_num_raw_data_modules(ver) / 8
            - table_get(&ECC_CODEWORDS_PER_BLOCK, ver, ecl)
                * table_get(&NUM_ERROR_CORRECTION_BLOCKS, ver, ecl)
    }
}

/// Splits the data codewords into blocks, appends each block's ECC
/// codewords and interleaves the bytes of all blocks.
fn add_ecc_and_interleave(data: &[u8], ver: Version, ecl: QrCodeEcc) -> Result<Vec<u8>> {
    let expected: usize = QrCode::get_num_data_codewords(ver, ecl);
    if data.len() != expected {
        return Err(QrError::CodewordLengthMismatch {
            expected,
            actual: data.len(),
        });
    }

    // Calculate parameter numbers
    let numblocks: usize = table_get(&NUM_ERROR_CORRECTION_BLOCKS, ver, ecl);
    let blockecclen: usize = table_get(&ECC_CODEWORDS_PER_BLOCK, ver, ecl);
    let rawcodewords: usize = QrCode::get_num_raw_data_modules(ver) / 8;
    let numshortblocks: usize = numblocks - rawcodewords % numblocks;
    let shortblocklen: usize = rawcodewords / numblocks;

    // Split data into blocks and append ECC to each block
    let rs = ReedSolomonGenerator::new(blockecclen)?;
    let mut blocks = Vec::<Vec<u8>>::with_capacity(numblocks);
    let mut k: usize = 0;
    for i in 0..numblocks {
        let datlen: usize = shortblocklen - blockecclen + usize::from(i >= numshortblocks);
        let mut dat = data[k..k + datlen].to_vec();
        k += datlen;
        let ecc: Vec<u8> = rs.compute_remainder(&dat);
        if i < numshortblocks {
            dat.push(0);
        }
        dat.extend_from_slice(&ecc);
        blocks.push(dat);
    }

    // Interleave (not concatenate) the bytes from every block into a single sequence
    let mut result = Vec::<u8>::with_capacity(rawcodewords);
    for i in 0..=shortblocklen {
        for (j, block) in blocks.iter().enumerate() {
            // Skip the padding byte in short blocks
            if i != shortblocklen - blockecclen || j >= numshortblocks {
                result.push(block[i]);
            }
        }
    }
    Ok(result)
}

fn table_get(table: &'static [[i8; 41]; 4], ver: Version, ecl: QrCodeEcc) -> usize {
    table[ecl.ordinal()][usize::from(ver.value())] as usize
}

/// Returns the 15-bit format information for an ECC level and mask:
/// 5 data bits, 10 BCH error correction bits, XOR-masked with 0x5412.
pub(crate) fn format_info_bits(ecl: QrCodeEcc, mask: Mask) -> u32 {
    let data = u32::from((ecl.format_bits() << 3) | mask.value());
    let mut rem: u32 = data;
    for _ in 0..10 {
        rem = (rem << 1) ^ ((rem >> 9) * 0x537);
    }
    ((data << 10) | rem) ^ 0x5412
}

/// Returns the 18-bit version information: 6 data bits, 12 BCH error correction bits.
pub(crate) fn version_info_bits(ver: Version) -> u32 {
    let ver = u32::from(ver.value());
    let mut rem: u32 = ver;
    for _ in 0..12 {
        rem = (rem << 1) ^ ((rem >> 11) * 0x1F25);
    }
    (ver << 12) | rem
}

/// The grid a symbol is drawn on while it is being built. Alongside the
/// modules it marks which cells belong to function patterns; that overlay
/// is dropped by [`Canvas::finish`].
#[derive(Clone)]
struct Canvas {
    version: Version,
    size: i32,
    modules: Vec<bool>,
    isfunction: Vec<bool>,
}

impl Canvas {
    fn new(version: Version) -> Self {
        let size: i32 = version.size();
        let cells = (size * size) as usize;
        Self {
            version,
            size,
            modules: vec![false; cells],
            isfunction: vec![false; cells],
        }
    }

    fn index(&self, x: i32, y: i32) -> usize {
        debug_assert!((0..self.size).contains(&x) && (0..self.size).contains(&y));
        (y * self.size + x) as usize
    }

    fn get_module(&self, x: i32, y: i32) -> bool {
        self.modules[self.index(x, y)]
    }

    fn is_function(&self, x: i32, y: i32) -> bool {
        self.isfunction[self.index(x, y)]
    }

    fn set_function_module(&mut self, x: i32, y: i32, isdark: bool) {
        let i = self.index(x, y);
        self.modules[i] = isdark;
        self.isfunction[i] = true;
    }

    fn finish(self, ecl: QrCodeEcc, mask: Mask) -> QrCode {
        QrCode {
            version: self.version,
            size: self.size,
            errorcorrectionlevel: ecl,
            mask,
            modules: self.modules,
        }
    }

    /// Draws timing, finder and alignment patterns, placeholder format
    /// bits and (for version 7 and up) the version information.
    fn draw_function_patterns(&mut self, ecl: QrCodeEcc) {
        // Draw horizontal and vertical timing patterns
        let size: i32 = self.size;
        for i in 0..size {
            self.set_function_module(6, i, i % 2 == 0);
            self.set_function_module(i, 6, i % 2 == 0);
        }

        // Draw 3 finder patterns (all corners except bottom right; overwrites some timing modules)
        self.draw_finder_pattern(3, 3);
        self.draw_finder_pattern(size - 4, 3);
        self.draw_finder_pattern(3, size - 4);

        // Draw numerous alignment patterns, skipping the three finder corners
        let alignpatpos: Vec<i32> = self.get_alignment_pattern_positions();
        let numalign: usize = alignpatpos.len();
        for i in 0..numalign {
            for j in 0..numalign {
                if !((i == 0 && j == 0) || (i == 0 && j == numalign - 1) || (i == numalign - 1 && j == 0)) {
                    self.draw_alignment_pattern(alignpatpos[i], alignpatpos[j]);
                }
            }
        }

        // Reserve the format bits; overwritten once the mask is known
        self.draw_format_bits(ecl, Mask(0));
        self.draw_version();
    }

    /// Draws a 9*9 finder pattern including the border separator,
    /// with the center module at (x, y). Modules can be out of bounds.
    fn draw_finder_pattern(&mut self, x: i32, y: i32) {
        for dy in -4..=4 {
            for dx in -4..=4 {
                let xx: i32 = x + dx;
                let yy: i32 = y + dy;
                if (0..self.size).contains(&xx) && (0..self.size).contains(&yy) {
                    let dist: i32 = dx.abs().max(dy.abs());
                    self.set_function_module(xx, yy, dist != 2 && dist != 4);
                }
            }
        }
    }

    /// Draws a 5*5 alignment pattern, with the center module
    /// at (x, y). All modules must be in bounds.
    fn draw_alignment_pattern(&mut self, x: i32, y: i32) {
        for dy in -2..=2 {
            for dx in -2..=2 {
                self.set_function_module(x + dx, y + dy, dx.abs().max(dy.abs()) != 1);
            }
        }
    }

    fn draw_format_bits(&mut self, ecl: QrCodeEcc, mask: Mask) {
        let bits: u32 = format_info_bits(ecl, mask);

        // Draw first copy
        for i in 0..6 {
            self.set_function_module(8, i, get_bit(bits, i as u8));
        }
        self.set_function_module(8, 7, get_bit(bits, 6));
        self.set_function_module(8, 8, get_bit(bits, 7));
        self.set_function_module(7, 8, get_bit(bits, 8));
        for i in 9..15 {
            self.set_function_module(14 - i, 8, get_bit(bits, i as u8));
        }

        // Draw second copy
        let size: i32 = self.size;
        for i in 0..8 {
            self.set_function_module(size - 1 - i, 8, get_bit(bits, i as u8));
        }
        for i in 8..15 {
            self.set_function_module(8, size - 15 + i, get_bit(bits, i as u8));
        }
        self.set_function_module(8, size - 8, true); // Always dark
    }

    /// Draws two copies of the version bits (with its own error correction code),
    /// based on this object's version field, iff 7 <= version <= 40.
    fn draw_version(&mut self) {
        if self.version.value() < 7 {
            return;
        }
        let bits: u32 = version_info_bits(self.version);
        for i in 0..18 {
            let bit: bool = get_bit(bits, i as u8);
            let a: i32 = self.size - 11 + i % 3;
            let b: i32 = i / 3;
            self.set_function_module(a, b, bit);
            self.set_function_module(b, a, bit);
        }
    }

    /// Returns the ascending list of alignment pattern center positions
    /// used on both axes for this version.
    fn get_alignment_pattern_positions(&self) -> Vec<i32> {
        let ver = i32::from(self.version.value());
        if ver == 1 {
            return Vec::new();
        }
        let numalign: i32 = ver / 7 + 2;
        let step: i32 = if ver == 32 {
            26
        } else {
            (ver * 4 + numalign * 2 + 1) / (numalign * 2 - 2) * 2
        };
        let mut result: Vec<i32> = (0..numalign - 1)
            .map(|i| self.size - 7 - i * step)
            .collect();
        result.push(6);
        result.reverse();
        result
    }

    /// Draws the given sequence of 8-bit codewords (data and error correction) onto the entire
    /// data area. Function modules need to be marked off before this is called.
    fn draw_codewords(&mut self, data: &[u8]) -> Result<()> {
        let expected: usize = QrCode::get_num_raw_data_modules(self.version) / 8;
        if data.len() != expected {
            return Err(QrError::CodewordLengthMismatch {
                expected,
                actual: data.len(),
            });
        }

        let size: i32 = self.size;
        let mut i: usize = 0; // Bit index into the data
        // Do the funny zigzag scan
        let mut right: i32 = size - 1; // Index of right column in each column pair
        while right >= 1 {
            if right == 6 {
                right = 5;
            }
            for vert in 0..size {
                for j in 0..2 {
                    let x: i32 = right - j;
                    let upward: bool = ((right + 1) & 2) == 0;
                    let y: i32 = if upward { size - 1 - vert } else { vert };
                    if !self.is_function(x, y) && i < data.len() * 8 {
                        let idx = self.index(x, y);
                        self.modules[idx] = get_bit(data[i >> 3].into(), 7 - ((i as u8) & 7));
                        i += 1;
                    }
                    // Any remainder bits (0 to 7) were left light when the grid was created
                }
            }
            right -= 2;
        }
        debug_assert_eq!(i, data.len() * 8);
        Ok(())
    }

    /// XORs the codeword modules in this canvas with the given mask pattern.
    /// Applying the same mask twice restores the previous state, and
    /// function modules are never touched.
    fn apply_mask(&mut self, mask: Mask) {
        for y in 0..self.size {
            for x in 0..self.size {
                let invert: bool = match mask.value() {
                    0 => (x + y) % 2 == 0,
                    1 => y % 2 == 0,
                    2 => x % 3 == 0,
                    3 => (x + y) % 3 == 0,
                    4 => (x / 3 + y / 2) % 2 == 0,
                    5 => x * y % 2 + x * y % 3 == 0,
                    6 => (x * y % 2 + x * y % 3) % 2 == 0,
                    7 => ((x + y) % 2 + x * y % 3) % 2 == 0,
                    _ => unreachable!(),
                };
                let i = self.index(x, y);
                self.modules[i] ^= invert & !self.isfunction[i];
            }
        }
    }

    /// Tries all 8 masks and returns the one with the lowest penalty score,
    /// the lowest-numbered one on ties. Leaves the codeword modules unmasked.
    #[cfg(not(feature = "parallel"))]
    fn choose_mask(&mut self, ecl: QrCodeEcc) -> Mask {
        let mut best = Mask(0);
        let mut minpenalty = i32::MAX;
        for i in 0u8..8 {
            let msk = Mask(i);
            self.apply_mask(msk);
            self.draw_format_bits(ecl, msk);
            let penalty: i32 = self.get_penalty_score();
            trace!(mask = i, penalty, "scored mask");
            if penalty < minpenalty {
                best = msk;
                minpenalty = penalty;
            }
            self.apply_mask(msk); // Undoes the mask due to XOR
        }
        best
    }

    /// Scores the 8 masks on independent copies of the canvas in parallel.
    /// Picks the same mask as the sequential search.
    #[cfg(feature = "parallel")]
    fn choose_mask(&self, ecl: QrCodeEcc) -> Mask {
        use rayon::prelude::*;

        (0u8..8)
            .into_par_iter()
            .map(|i| {
                let msk = Mask(i);
                let mut trial = self.clone();
                trial.apply_mask(msk);
                trial.draw_format_bits(ecl, msk);
                let penalty: i32 = trial.get_penalty_score();
                trace!(mask = i, penalty, "scored mask");
                (penalty, msk)
            })
            .min()
            .map_or(Mask(0), |(_, msk)| msk)
    }

    /// Calculates the penalty score of the current module grid. Used by
    /// automatic mask choice to find the pattern that yields the lowest score.
    fn get_penalty_score(&self) -> i32 {
        let mut result: i32 = 0;
        let size: i32 = self.size;

        // Adjacent modules in row/column having same color, and finder-like patterns
        for y in 0..size {
            result += self.line_penalty((0..size).map(|x| self.get_module(x, y)));
        }
        for x in 0..size {
            result += self.line_penalty((0..size).map(|y| self.get_module(x, y)));
        }

        // 2*2 blocks of modules having same color
        for y in 0..size - 1 {
            for x in 0..size - 1 {
                let color: bool = self.get_module(x, y);
                if color == self.get_module(x + 1, y)
                    && color == self.get_module(x, y + 1)
                    && color == self.get_module(x + 1, y + 1)
                {
                    result += PENALTY_N2;
                }
            }
        }

        // Balance of dark and light modules
        let dark: i32 = self.modules.iter().filter(|&&m| m).count() as i32;
        let total: i32 = size * size; // Note that size is odd, so dark/total != 1/2
        // Compute the smallest integer k >= 0 such that (45-5k)% <= dark/total <= (55+5k)%
        let k: i32 = ((dark * 20 - total * 10).abs() + total - 1) / total - 1;
        debug_assert!((0..=9).contains(&k));
        result += k * PENALTY_N4;
        result
    }

    /// Scores runs of same-colored modules and finder-like patterns along one row or column.
    fn line_penalty(&self, line: impl Iterator<Item = bool>) -> i32 {
        let mut result: i32 = 0;
        let mut runcolor = false;
        let mut runlen: i32 = 0;
        let mut runhistory = FinderPenalty::new(self.size);
        for color in line {
            if color == runcolor {
                runlen += 1;
                if runlen == 5 {
                    result += PENALTY_N1;
                } else if runlen > 5 {
                    result += 1;
                }
            } else {
                runhistory.add_history(runlen);
                if !runcolor {
                    result += runhistory.count_patterns() * PENALTY_N3;
                }
                runcolor = color;
                runlen = 1;
            }
        }
        result + runhistory.terminate_and_count(runcolor, runlen) * PENALTY_N3
    }
}

/// Helper for the finder-like pattern penalty: the lengths of the last 7
/// runs in the current row or column, most recent first.
struct FinderPenalty {
    qr_size: i32,
    run_history: [i32; 7],
}

impl FinderPenalty {
    fn new(size: i32) -> Self {
        Self {
            qr_size: size,
            run_history: [0; 7],
        }
    }

    /// Pushes the given value to the front and drops the last value.
    fn add_history(&mut self, mut currentrunlength: i32) {
        if self.run_history[0] == 0 {
            currentrunlength += self.qr_size; // Add light border to initial run
        }
        let len: usize = self.run_history.len();
        self.run_history.copy_within(0..len - 1, 1);
        self.run_history[0] = currentrunlength;
    }

    /// Can only be called immediately after a light run is added, and returns either 0, 1, or 2.
    fn count_patterns(&self) -> i32 {
        let rh = &self.run_history;
        let n = rh[1];
        debug_assert!(n <= self.qr_size * 3);
        let core = n > 0 && rh[2] == n && rh[3] == n * 3 && rh[4] == n && rh[5] == n;
        i32::from(core && rh[0] >= n * 4 && rh[6] >= n)
            + i32::from(core && rh[6] >= n * 4 && rh[0] >= n)
    }

    /// Must be called at the end of a line (row or column) of modules.
    fn terminate_and_count(mut self, currentruncolor: bool, mut currentrunlength: i32) -> i32 {
        if currentruncolor {
            // Terminate dark run
            self.add_history(currentrunlength);
            currentrunlength = 0;
        }
        currentrunlength += self.qr_size; // Add light border to final run
        self.add_history(currentrunlength);
        self.count_patterns()
    }
}

// For use in get_penalty_score(), when evaluating which mask is best.
const PENALTY_N1: i32 = 3;
const PENALTY_N2: i32 = 3;
const PENALTY_N3: i32 = 40;
const PENALTY_N4: i32 = 10;

static ECC_CODEWORDS_PER_BLOCK: [[i8; 41]; 4] = [
    // Version: (note that index 0 is for padding, and is set to an illegal value)
    //0,  1,  2,  3,  4,  5,  6,  7,  8,  9, 10, 11, 12, 13, 14, 15, 16, 17, 18, 19, 20, 21, 22, 23, 24, 25, 26, 27, 28, 29, 30, 31, 32, 33, 34, 35, 36, 37, 38, 39, 40    Error correction level
    [-1,  7, 10, 15, 20, 26, 18, 20, 24, 30, 18, 20, 24, 26, 30, 22, 24, 28, 30, 28, 28, 28, 28, 30, 30, 26, 28, 30, 30, 30, 30, 30, 30, 30, 30, 30, 30, 30, 30, 30, 30],  // Low
    [-1, 10, 16, 26, 18, 24, 16, 18, 22, 22, 26, 30, 22, 22, 24, 24, 28, 28, 26, 26, 26, 26, 28, 28, 28, 28, 28, 28, 28, 28, 28, 28, 28, 28, 28, 28, 28, 28, 28, 28, 28],  // Medium
    [-1, 13, 22, 18, 26, 18, 24, 18, 22, 20, 24, 28, 26, 24, 20, 30, 24, 28, 28, 26, 30, 28, 30, 30, 30, 30, 28, 30, 30, 30, 30, 30, 30, 30, 30, 30, 30, 30, 30, 30, 30],  // Quartile
    [-1, 17, 28, 22, 16, 22, 28, 26, 26, 24, 28, 24, 28, 22, 24, 24, 30, 28, 28, 26, 28, 30, 24, 30, 30, 30, 30, 30, 30, 30, 30, 30, 30, 30, 30, 30, 30, 30, 30, 30, 30],  // High
];

static NUM_ERROR_CORRECTION_BLOCKS: [[i8; 41]; 4] = [
    // Version: (note that index 0 is for padding, and is set to an illegal value)
    //0, 1, 2, 3, 4, 5, 6, 7, 8, 9,10, 11, 12, 13, 14, 15, 16, 17, 18, 19, 20, 21, 22, 23, 24, 25, 26, 27, 28, 29, 30, 31, 32, 33, 34, 35, 36, 37, 38, 39, 40    Error correction level
    [-1, 1, 1, 1, 1, 1, 2, 2, 2, 2, 4,  4,  4,  4,  4,  6,  6,  6,  6,  7,  8,  8,  9,  9, 10, 12, 12, 12, 13, 14, 15, 16, 17, 18, 19, 19, 20, 21, 22, 24, 25],  // Low
    [-1, 1, 1, 1, 2, 2, 4, 4, 4, 5, 5,  5,  8,  9,  9, 10, 10, 11, 13, 14, 16, 17, 17, 18, 20, 21, 23, 25, 26, 28, 29, 31, 33, 35, 37, 38, 40, 43, 45, 47, 49],  // Medium
    [-1, 1, 1, 2, 2, 4, 4, 6, 6, 8, 8,  8, 10, 12, 16, 12, 17, 16, 18, 21, 20, 23, 23, 25, 27, 29, 34, 34, 35, 38, 40, 43, 45, 48, 51, 53, 56, 59, 62, 65, 68],  // Quartile
    [-1, 1, 1, 2, 4, 4, 4, 5, 6, 8, 8, 11, 11, 16, 16, 18, 16, 19, 21, 25, 25, 25, 34, 30, 32, 35, 37, 40, 42, 45, 48, 51, 54, 57, 60, 63, 66, 70, 74, 77, 81],  // High
];

/// Error correction level for a QR code.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QrCodeEcc {
    /// Tolerates ~7% erroneous codewords.
    Low,
    /// Tolerates ~15% erroneous codewords.
    Medium,
    /// Tolerates ~25% erroneous codewords.
    Quartile,
    /// Tolerates ~30% erroneous codewords.
    High,
}

impl QrCodeEcc {
    /// Returns an unsigned 2-bit integer (in the range 0 to 3).
    fn ordinal(self) -> usize {
        use QrCodeEcc::*;
        match self {
            Low => 0,
            Medium => 1,
            Quartile => 2,
            High => 3,
        }
    }

    /// Returns the 2-bit value written into the format information.
    pub fn format_bits(self) -> u8 {
        use QrCodeEcc::*;
        match self {
            Low => 1,
            Medium => 0,
            Quartile => 3,
            High => 2,
        }
    }
}

/// A QR code version (1–40).
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub struct Version(u8);

impl Version {
    /// The minimum version number supported in the QR Code Model 2 standard.
    pub const MIN: Version = Version(1);

    /// The maximum version number supported in the QR Code Model 2 standard.
    pub const MAX: Version = Version(40);

    /// Creates a version object from the given number.
    ///
    /// # Errors
    ///
    /// [`QrError::InvalidVersion`] if the number is outside the range [1, 40].
    pub fn new(ver: u8) -> Result<Self> {
        if (Version::MIN.value()..=Version::MAX.value()).contains(&ver) {
            Ok(Self(ver))
        } else {
            Err(QrError::InvalidVersion(ver))
        }
    }

    /// Returns the value, which is in the range [1, 40].
    pub const fn value(self) -> u8 {
        self.0
    }

    /// Returns the side length of a symbol of this version, `4 * version + 17`.
    pub const fn size(self) -> i32 {
        self.0 as i32 * 4 + 17
    }
}

/// A mask pattern (0–7).
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub struct Mask(u8);

impl Mask {
    /// Creates a mask object from the given number.
    ///
    /// # Errors
    ///
    /// [`QrError::InvalidMask`] if the number is outside the range [0, 7].
    pub fn new(mask: u8) -> Result<Self> {
        if mask <= 7 {
            Ok(Self(mask))
        } else {
            Err(QrError::InvalidMask(mask))
        }
    }

    /// Returns the value, which is in the range [0, 7].
    pub const fn value(self) -> u8 {
        self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn v(n: u8) -> Version {
        Version::new(n).unwrap()
    }

    fn canvas_with_data(ver: Version) -> Canvas {
        let mut canvas = Canvas::new(ver);
        canvas.draw_function_patterns(QrCodeEcc::Low);
        let rawcodewords = QrCode::get_num_raw_data_modules(ver) / 8;
        let data: Vec<u8> = (0..rawcodewords).map(|i| (i * 37 + 11) as u8).collect();
        canvas.draw_codewords(&data).unwrap();
        canvas
    }

    #[test]
    fn test_version_and_mask_bounds() {
        assert_eq!(Version::new(0), Err(QrError::InvalidVersion(0)));
        assert_eq!(Version::new(41), Err(QrError::InvalidVersion(41)));
        assert_eq!(v(1), Version::MIN);
        assert_eq!(v(40).size(), 177);
        assert_eq!(Mask::new(8), Err(QrError::InvalidMask(8)));
        assert_eq!(Mask::new(7).unwrap().value(), 7);
    }

    #[test]
    fn test_num_raw_data_modules() {
        assert_eq!(QrCode::get_num_raw_data_modules(v(1)), 208);
        assert_eq!(QrCode::get_num_raw_data_modules(v(2)), 359);
        assert_eq!(QrCode::get_num_raw_data_modules(v(7)), 1568);
        assert_eq!(QrCode::get_num_raw_data_modules(v(40)), 29648);
    }

    #[test]
    fn test_raw_data_modules_match_grid() {
        for ver in [1, 2, 6, 7, 14, 32, 40] {
            let mut canvas = Canvas::new(v(ver));
            canvas.draw_function_patterns(QrCodeEcc::Low);
            let free = canvas.isfunction.iter().filter(|&&f| !f).count();
            assert_eq!(free, QrCode::get_num_raw_data_modules(v(ver)), "version {}", ver);
        }
    }

    #[test]
    fn test_num_data_codewords() {
        assert_eq!(QrCode::get_num_data_codewords(v(1), QrCodeEcc::Low), 19);
        assert_eq!(QrCode::get_num_data_codewords(v(1), QrCodeEcc::Medium), 16);
        assert_eq!(QrCode::get_num_data_codewords(v(1), QrCodeEcc::Quartile), 13);
        assert_eq!(QrCode::get_num_data_codewords(v(1), QrCodeEcc::High), 9);
        assert_eq!(QrCode::get_num_data_codewords(v(40), QrCodeEcc::Low), 2956);
        assert_eq!(QrCode::get_num_data_codewords(v(40), QrCodeEcc::High), 1276);
    }

    #[test]
    fn test_alignment_pattern_positions() {
        assert!(Canvas::new(v(1)).get_alignment_pattern_positions().is_empty());
        assert_eq!(Canvas::new(v(2)).get_alignment_pattern_positions(), vec![6, 18]);
        assert_eq!(Canvas::new(v(7)).get_alignment_pattern_positions(), vec![6, 22, 38]);
        assert_eq!(
            Canvas::new(v(32)).get_alignment_pattern_positions(),
            vec![6, 34, 60, 86, 112, 138]
        );
        assert_eq!(
            Canvas::new(v(40)).get_alignment_pattern_positions(),
            vec![6, 30, 58, 86, 114, 142, 170]
        );
    }

    #[test]
    fn test_format_and_version_info() {
        assert_eq!(format_info_bits(QrCodeEcc::Medium, Mask(0)), 0x5412);
        assert_eq!(format_info_bits(QrCodeEcc::Low, Mask(0)), 0x77C4);
        assert_eq!(version_info_bits(v(7)), 0x07C94);
    }

    #[test]
    fn test_hello_world_codewords() {
        let segs = [QrSegment::make_alphanumeric("HELLO WORLD").unwrap()];
        let (data, ecl, ver) = QrCode::encode_segments_to_codewords(
            &segs,
            QrCodeEcc::Medium,
            Version::MIN,
            Version::MAX,
            false,
        )
        .unwrap();
        assert_eq!(ecl, QrCodeEcc::Medium);
        assert_eq!(ver, Version::MIN);
        assert_eq!(
            data,
            vec![32, 91, 11, 120, 209, 114, 220, 77, 67, 64, 236, 17, 236, 17, 236, 17]
        );

        let all = add_ecc_and_interleave(&data, ver, ecl).unwrap();
        assert_eq!(&all[..16], &data[..]);
        assert_eq!(&all[16..], &[196, 35, 39, 119, 235, 215, 231, 226, 93, 23]);
    }

    #[test]
    fn test_empty_payload_is_all_padding() {
        let (data, ecl, ver) =
            QrCode::encode_segments_to_codewords(&[], QrCodeEcc::Low, Version::MIN, Version::MAX, true)
                .unwrap();
        assert_eq!(ver, Version::MIN);
        assert_eq!(ecl, QrCodeEcc::High);
        assert_eq!(data, vec![0x00, 0xEC, 0x11, 0xEC, 0x11, 0xEC, 0x11, 0xEC, 0x11]);
    }

    #[test]
    fn test_interleave_uneven_blocks() {
        // Version 5-Q: 2 blocks of 15 and 2 blocks of 16 data codewords
        let ver = v(5);
        let ecl = QrCodeEcc::Quartile;
        let n = QrCode::get_num_data_codewords(ver, ecl);
        assert_eq!(n, 62);
        let data: Vec<u8> = (0..n as u8).collect();
        let all = add_ecc_and_interleave(&data, ver, ecl).unwrap();
        assert_eq!(all.len(), QrCode::get_num_raw_data_modules(ver) / 8);
        assert_eq!(&all[..4], &[0, 15, 30, 46]);
        // Column 15 exists only in the long blocks
        assert_eq!(&all[60..62], &[45, 61]);
    }

    #[test]
    fn test_codeword_length_mismatch() {
        assert_eq!(
            add_ecc_and_interleave(&[0u8; 18], v(1), QrCodeEcc::Low),
            Err(QrError::CodewordLengthMismatch {
                expected: 19,
                actual: 18
            })
        );
        let mut canvas = Canvas::new(v(1));
        canvas.draw_function_patterns(QrCodeEcc::Low);
        assert!(canvas.draw_codewords(&[0u8; 25]).is_err());
    }

    #[test]
    fn test_mask_is_involution() {
        for ver in [1, 7] {
            let original = canvas_with_data(v(ver));
            for m in 0..8 {
                let mut canvas = original.clone();
                canvas.apply_mask(Mask(m));
                assert_ne!(canvas.modules, original.modules, "mask {} changed nothing", m);
                canvas.apply_mask(Mask(m));
                assert_eq!(canvas.modules, original.modules, "mask {} not undone", m);
            }
        }
    }

    #[test]
    fn test_mask_skips_function_modules() {
        let original = canvas_with_data(v(3));
        let mut canvas = original.clone();
        canvas.apply_mask(Mask(0));
        for (i, &func) in original.isfunction.iter().enumerate() {
            if func {
                assert_eq!(canvas.modules[i], original.modules[i]);
            }
        }
    }

    #[test]
    fn test_finder_penalty_counts_both_sides() {
        // light border, dark 1, light 1, dark 3, light 1, dark 1, light border
        let mut fp = FinderPenalty::new(21);
        for run in [0, 1, 1, 3, 1, 1] {
            fp.add_history(run);
        }
        assert_eq!(fp.terminate_and_count(false, 4), 2);

        let mut fp = FinderPenalty::new(21);
        for run in [0, 1, 1, 3, 1, 1] {
            fp.add_history(run);
        }
        fp.add_history(1);
        assert_eq!(fp.count_patterns(), 1);
    }

    #[test]
    fn test_penalty_of_uniform_grid() {
        let mut canvas = Canvas::new(v(1));
        canvas.modules.fill(false);
        // Each of 42 lines: one run of 21 light modules, 3 + 16 points
        let runs = 42 * (PENALTY_N1 + 16);
        let blocks = 20 * 20 * PENALTY_N2;
        // k = (4410 + 440) / 441 - 1 = 9
        let balance = 9 * PENALTY_N4;
        assert_eq!(canvas.get_penalty_score(), runs + blocks + balance);
    }
}

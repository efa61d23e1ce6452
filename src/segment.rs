//! Data segments and their bit-level encodings.
//!
//! A segment is a run of input represented in one [`Mode`]. The factory
//! functions on [`QrSegment`] turn text or bytes into segments, and
//! [`QrSegment::make_segments`] picks a single mode for a whole string.
//! See [`crate::segment_advanced`] for Kanji and optimal mixed-mode segmentation.

use crate::bitbuffer::{BitBuffer, BitSet, MAX_BIT_LENGTH};
use crate::error::{QrError, Result};
use crate::qrcode::Version;

/// The set of all legal characters in alphanumeric mode,
/// where each character value maps to the index in the string.
pub(crate) static ALPHANUMERIC_CHARSET: &str = "0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZ $%*+-./:";

/// Describes how a segment's data bits are interpreted.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum Mode {
    Numeric,
    Alphanumeric,
    Byte,
    Kanji,
    Eci,
}

impl Mode {
    /// Returns the 4-bit mode indicator.
    pub const fn mode_bits(self) -> u32 {
        use Mode::*;
        match self {
            Numeric => 0x1,
            Alphanumeric => 0x2,
            Byte => 0x4,
            Kanji => 0x8,
            Eci => 0x7,
        }
    }

    /// Returns the bit width of the character count field for a segment in
    /// this mode in a QR Code at the given version number.
    pub fn num_char_count_bits(self, ver: Version) -> u8 {
        use Mode::*;
        (match self {
            Numeric => [10, 12, 14],
            Alphanumeric => [9, 11, 13],
            Byte => [8, 16, 16],
            Kanji => [8, 10, 12],
            Eci => [0, 0, 0],
        })[usize::from((ver.value() + 7) / 17)]
    }
}

/// A segment of character/binary/control data in a QR Code symbol.
///
/// Instances are immutable and own a private copy of their data bits. The
/// mid-level way to create a segment is one of the factory functions; the
/// low-level way is [`QrSegment::new`].
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct QrSegment {
    mode: Mode,
    numchars: usize,
    data: BitBuffer,
}

impl QrSegment {
    /// Creates a segment from already-encoded bits. The bits are copied,
    /// so later changes to `data` do not affect the segment.
    pub fn new(mode: Mode, numchars: usize, data: &BitBuffer) -> Self {
        Self {
            mode,
            numchars,
            data: data.clone(),
        }
    }

    /// Returns a segment representing the given binary data encoded in byte mode.
    ///
    /// Any text string can be converted to UTF-8 bytes and encoded as a byte mode segment.
    pub fn make_bytes(data: &[u8]) -> Self {
        let mut bb = BitBuffer::with_capacity(data.len() * 8);
        for &b in data {
            for i in (0..8).rev() {
                let end = bb.len();
                bb.set_bit(end, (b >> i) & 1 != 0);
            }
        }
        Self {
            mode: Mode::Byte,
            numchars: data.len(),
            data: bb,
        }
    }

    /// Returns a segment representing the given string of decimal digits encoded in numeric mode.
    ///
    /// # Errors
    ///
    /// [`QrError::InvalidCharacter`] if the string contains anything but `0`-`9`.
    pub fn make_numeric(text: &str) -> Result<Self> {
        let mut bb = BitBuffer::with_capacity(text.len() * 3 + (text.len() + 2) / 3);
        let mut accumdata: u32 = 0;
        let mut accumcount: u8 = 0;
        for c in text.chars() {
            let digit = c.to_digit(10).ok_or(
                QrError::InvalidCharacter {
                    mode: Mode::Numeric,
                    ch: c,
                },
            )?;
            accumdata = accumdata * 10 + digit;
            accumcount += 1;
            if accumcount == 3 {
                bb.append_bits(accumdata, 10)?;
                accumdata = 0;
                accumcount = 0;
            }
        }
        if accumcount > 0 {
            // 1 or 2 digits remaining
            bb.append_bits(accumdata, accumcount * 3 + 1)?;
        }
        Ok(Self {
            mode: Mode::Numeric,
            numchars: text.len(),
            data: bb,
        })
    }

    /// Returns a segment representing the given text string encoded in alphanumeric mode.
    ///
    /// Allowed characters: 0–9, A–Z (uppercase only), space, `$`, `%`, `*`, `+`, `-`, `.`, `/`, `:`.
    ///
    /// # Errors
    ///
    /// [`QrError::InvalidCharacter`] on the first character outside that set.
    pub fn make_alphanumeric(text: &str) -> Result<Self> {
        let mut bb = BitBuffer::with_capacity(text.len() * 6);
        let mut accumdata: u32 = 0;
        let mut accumcount: u32 = 0;
        let mut numchars: usize = 0;
        for c in text.chars() {
            let i = alphanumeric_index(c).ok_or(QrError::InvalidCharacter {
                mode: Mode::Alphanumeric,
                ch: c,
            })?;
            accumdata = accumdata * 45 + i;
            accumcount += 1;
            numchars += 1;
            if accumcount == 2 {
                bb.append_bits(accumdata, 11)?;
                accumdata = 0;
                accumcount = 0;
            }
        }
        if accumcount > 0 {
            // 1 character remaining
            bb.append_bits(accumdata, 6)?;
        }
        Ok(Self {
            mode: Mode::Alphanumeric,
            numchars,
            data: bb,
        })
    }

    /// Returns a segment representing an Extended Channel Interpretation
    /// (ECI) designator with the given assignment value.
    ///
    /// # Errors
    ///
    /// [`QrError::EciOutOfRange`] unless `assignval < 1_000_000`.
    pub fn make_eci(assignval: u32) -> Result<Self> {
        let mut bb = BitBuffer::with_capacity(24);
        if assignval < 1 << 7 {
            bb.append_bits(assignval, 8)?;
        } else if assignval < 1 << 14 {
            bb.append_bits(0b10, 2)?;
            bb.append_bits(assignval, 14)?;
        } else if assignval < 1_000_000 {
            bb.append_bits(0b110, 3)?;
            bb.append_bits(assignval, 21)?;
        } else {
            return Err(QrError::EciOutOfRange(assignval));
        }
        Ok(Self {
            mode: Mode::Eci,
            numchars: 0,
            data: bb,
        })
    }

    /// Returns a list of zero or more segments to represent the given text.
    ///
    /// The whole string gets one mode: numeric if every character is a
    /// digit, else alphanumeric if every character is in the alphanumeric
    /// set, else byte mode over its UTF-8 encoding. The result may use
    /// more bits than [`QrSegment::make_segments_optimally`].
    pub fn make_segments(text: &str) -> Result<Vec<Self>> {
        if text.is_empty() {
            Ok(Vec::new())
        } else if QrSegment::is_numeric(text) {
            Ok(vec![QrSegment::make_numeric(text)?])
        } else if QrSegment::is_alphanumeric(text) {
            Ok(vec![QrSegment::make_alphanumeric(text)?])
        } else {
            Ok(vec![QrSegment::make_bytes(text.as_bytes())])
        }
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    /// Returns the character count field value: characters, bytes or
    /// Kanji represented, not the bit length.
    pub fn num_chars(&self) -> usize {
        self.numchars
    }

    pub fn data(&self) -> &BitBuffer {
        &self.data
    }

    /// Calculates the number of bits needed to encode the given segments at
    /// the given version. Returns `None` if a segment has too many
    /// characters to fit its length field, or the total exceeds
    /// [`MAX_BIT_LENGTH`].
    pub fn get_total_bits(segs: &[Self], version: Version) -> Option<usize> {
        let mut result: usize = 0;
        for seg in segs {
            let ccbits: u8 = seg.mode.num_char_count_bits(version);
            // ccbits can be as large as 16, but usize can be as small as 16
            if let Some(limit) = 1usize.checked_shl(ccbits.into()) {
                if seg.numchars >= limit {
                    return None;
                }
            }
            result = result.checked_add(4 + usize::from(ccbits))?;
            result = result.checked_add(seg.data.len())?;
            if result > MAX_BIT_LENGTH {
                return None;
            }
        }
        Some(result)
    }

    /// Tests whether the given string can be encoded as a segment in numeric mode.
    pub fn is_numeric(text: &str) -> bool {
        text.chars().all(|c| c.is_ascii_digit())
    }

    /// Tests whether the given string can be encoded as a segment in alphanumeric mode.
    pub fn is_alphanumeric(text: &str) -> bool {
        text.chars().all(|c| ALPHANUMERIC_CHARSET.contains(c))
    }
}

pub(crate) fn alphanumeric_index(c: char) -> Option<u32> {
    ALPHANUMERIC_CHARSET
        .find(c)
        .and_then(|i| u32::try_from(i).ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bits_of(seg: &QrSegment) -> String {
        seg.data()
            .iter()
            .map(|b| if b { '1' } else { '0' })
            .collect()
    }

    #[test]
    fn test_is_numeric() {
        assert_eq!(QrSegment::is_numeric("1234567890"), true);
        assert_eq!(QrSegment::is_numeric("1234abc"), false);
        assert_eq!(QrSegment::is_numeric("١٢٣"), false);
    }

    #[test]
    fn test_is_alphanumeric() {
        assert_eq!(QrSegment::is_alphanumeric("HELLO WORLD"), true);
        assert_eq!(QrSegment::is_alphanumeric("12345"), true);
        assert_eq!(QrSegment::is_alphanumeric("$%*+-./:"), true);
        assert_eq!(QrSegment::is_alphanumeric("Hello World"), false);
        assert_eq!(QrSegment::is_alphanumeric("_NotValid"), false);
        assert_eq!(QrSegment::is_alphanumeric("Mixed123CASE$"), false);
        assert_eq!(QrSegment::is_alphanumeric("://www.apple.com"), false);
    }

    #[test]
    fn test_make_numeric() {
        let seg = QrSegment::make_numeric("5").unwrap();
        assert_eq!(bits_of(&seg), "0101");
        assert_eq!(seg.num_chars(), 1);

        let seg = QrSegment::make_numeric("123456").unwrap();
        assert_eq!(bits_of(&seg), format!("{:010b}{:010b}", 123, 456));

        let seg = QrSegment::make_numeric("01234567").unwrap();
        assert_eq!(bits_of(&seg), "000000110001010110011000011");
        assert_eq!(seg.data().len(), 27);
    }

    #[test]
    fn test_make_numeric_rejects_non_digits() {
        assert_eq!(
            QrSegment::make_numeric("12a"),
            Err(QrError::InvalidCharacter {
                mode: Mode::Numeric,
                ch: 'a'
            })
        );
    }

    #[test]
    fn test_make_alphanumeric() {
        let seg = QrSegment::make_alphanumeric("A").unwrap();
        assert_eq!(bits_of(&seg), "001010");

        let seg = QrSegment::make_alphanumeric("AB").unwrap();
        assert_eq!(bits_of(&seg), format!("{:011b}", 10 * 45 + 11));

        let seg = QrSegment::make_alphanumeric("HELLO WORLD").unwrap();
        assert_eq!(seg.num_chars(), 11);
        assert_eq!(seg.data().len(), 61);
        assert!(QrSegment::make_alphanumeric("hello").is_err());
    }

    #[test]
    fn test_make_bytes() {
        let seg = QrSegment::make_bytes(&[0x00, 0xFF, 0x41]);
        assert_eq!(seg.mode(), Mode::Byte);
        assert_eq!(seg.num_chars(), 3);
        assert_eq!(seg.data().to_bytes(), vec![0x00, 0xFF, 0x41]);
    }

    #[test]
    fn test_make_eci() {
        let seg = QrSegment::make_eci(26).unwrap();
        assert_eq!(bits_of(&seg), "00011010");
        assert_eq!(seg.num_chars(), 0);

        assert_eq!(QrSegment::make_eci(127).unwrap().data().len(), 8);
        assert_eq!(QrSegment::make_eci(128).unwrap().data().len(), 16);
        assert_eq!(QrSegment::make_eci(16_383).unwrap().data().len(), 16);
        assert_eq!(QrSegment::make_eci(16_384).unwrap().data().len(), 24);
        assert_eq!(QrSegment::make_eci(999_999).unwrap().data().len(), 24);
        assert_eq!(
            QrSegment::make_eci(1_000_000),
            Err(QrError::EciOutOfRange(1_000_000))
        );
    }

    #[test]
    fn test_make_segments_classification() {
        assert!(QrSegment::make_segments("").unwrap().is_empty());
        let modes = |s: &str| {
            QrSegment::make_segments(s)
                .unwrap()
                .iter()
                .map(QrSegment::mode)
                .collect::<Vec<_>>()
        };
        assert_eq!(modes("0123"), vec![Mode::Numeric]);
        assert_eq!(modes("HELLO 123"), vec![Mode::Alphanumeric]);
        assert_eq!(modes("Hello, world!"), vec![Mode::Byte]);
        let segs = QrSegment::make_segments("é").unwrap();
        assert_eq!(segs[0].num_chars(), 2);
    }

    #[test]
    fn test_segment_owns_its_data() {
        let mut bb = BitBuffer::new();
        bb.append_bits(0b101, 3).unwrap();
        let seg = QrSegment::new(Mode::Numeric, 1, &bb);
        bb.append_bits(0b1, 1).unwrap();
        assert_eq!(seg.data().len(), 3);
    }

    #[test]
    fn test_char_count_bits_by_version() {
        let v = |n| Version::new(n).unwrap();
        assert_eq!(Mode::Numeric.num_char_count_bits(v(9)), 10);
        assert_eq!(Mode::Numeric.num_char_count_bits(v(10)), 12);
        assert_eq!(Mode::Numeric.num_char_count_bits(v(26)), 12);
        assert_eq!(Mode::Numeric.num_char_count_bits(v(27)), 14);
        assert_eq!(Mode::Byte.num_char_count_bits(v(40)), 16);
        assert_eq!(Mode::Eci.num_char_count_bits(v(1)), 0);
    }

    #[test]
    fn test_get_total_bits() {
        let v1 = Version::MIN;
        let segs = [QrSegment::make_alphanumeric("HELLO WORLD").unwrap()];
        assert_eq!(QrSegment::get_total_bits(&segs, v1), Some(4 + 9 + 61));
        assert_eq!(QrSegment::get_total_bits(&[], v1), Some(0));

        // 256 bytes overflow the 8-bit count field of versions 1-9
        let long = [QrSegment::make_bytes(&[0u8; 256])];
        assert_eq!(QrSegment::get_total_bits(&long, v1), None);
        assert_eq!(
            QrSegment::get_total_bits(&long, Version::new(10).unwrap()),
            Some(4 + 16 + 256 * 8)
        );
    }
}

//! Kanji mode and optimal mixed-mode segmentation.
//!
//! Kanji mode encodes double-byte Shift JIS characters in 13 bits each.
//! Optimal segmentation chooses a mode per character by dynamic
//! programming, so that switching modes mid-string (say, from byte mode
//! to numeric mode for a long run of digits) happens exactly when it
//! saves bits.

use encoding_rs::SHIFT_JIS;

use crate::bitbuffer::{BitBuffer, BitSet};
use crate::error::{QrError, Result};
use crate::qrcode::{QrCode, QrCodeEcc, Version};
use crate::segment::{alphanumeric_index, Mode, QrSegment};

// Candidate modes for each character, in tie-breaking order
const MODE_TYPES: [Mode; 4] = [Mode::Byte, Mode::Alphanumeric, Mode::Numeric, Mode::Kanji];

impl QrSegment {
    /// Returns a segment representing the given text encoded in kanji mode.
    ///
    /// Every character must map to a double-byte Shift JIS code in the
    /// ranges 0x8140-0x9FFC or 0xE040-0xEBBF.
    ///
    /// # Errors
    ///
    /// [`QrError::InvalidCharacter`] on the first character without such a code.
    pub fn make_kanji(text: &str) -> Result<Self> {
        let mut bb = BitBuffer::with_capacity(text.len() * 13 / 3);
        let mut numchars: usize = 0;
        for c in text.chars() {
            let val = kanji_value(c).ok_or(QrError::InvalidCharacter {
                mode: Mode::Kanji,
                ch: c,
            })?;
            bb.append_bits(val, 13)?;
            numchars += 1;
        }
        Ok(QrSegment::new(Mode::Kanji, numchars, &bb))
    }

    /// Returns a list of segments representing the given text at the given
    /// error correction level, using the fewest bits of any mode
    /// assignment. The smallest version in `minversion..=maxversion` that
    /// fits the result decides the character count field widths.
    ///
    /// # Errors
    ///
    /// [`QrError::InvalidVersionRange`] if `minversion > maxversion`, a
    /// capacity error if the text fits no version in range.
    pub fn make_segments_optimally(
        text: &str,
        ecl: QrCodeEcc,
        minversion: Version,
        maxversion: Version,
    ) -> Result<Vec<Self>> {
        if minversion > maxversion {
            return Err(QrError::InvalidVersionRange {
                min: minversion.value(),
                max: maxversion.value(),
            });
        }
        if text.is_empty() {
            return Ok(Vec::new());
        }
        let codepoints: Vec<char> = text.chars().collect();

        let mut version = minversion;
        let mut segs = split_into_segments(
            &codepoints,
            &compute_character_modes(&codepoints, version),
        )?;
        loop {
            let datacapacitybits: usize = QrCode::get_num_data_codewords(version, ecl) * 8;
            let dataused: Option<usize> = QrSegment::get_total_bits(&segs, version);
            if let Some(n) = dataused {
                if n <= datacapacitybits {
                    return Ok(segs);
                }
            }
            if version >= maxversion {
                return Err(match dataused {
                    None => QrError::SegmentTooLong,
                    Some(n) => QrError::DataOverCapacity {
                        used: n,
                        capacity: datacapacitybits,
                    },
                });
            }
            version = Version::new(version.value() + 1)?;
            // Count field widths only change at these versions
            if version.value() == 10 || version.value() == 27 {
                segs = split_into_segments(
                    &codepoints,
                    &compute_character_modes(&codepoints, version),
                )?;
            }
        }
    }
}

/// Tests whether the given character can be encoded in kanji mode.
pub fn is_kanji(c: char) -> bool {
    kanji_value(c).is_some()
}

/// Returns the 13-bit kanji mode value of a character, if it has one.
///
/// The Unicode to Shift JIS step follows the WHATWG Shift_JIS encoder, not
/// the JIS X 0208 / SHIFTJIS.TXT table. The two disagree on a few code
/// points: U+FF3C FULLWIDTH REVERSE SOLIDUS and U+FF5E FULLWIDTH TILDE map
/// to kanji values here, where SHIFTJIS.TXT maps U+005C and U+301C to the
/// same codes instead.
pub fn kanji_value(c: char) -> Option<u32> {
    let mut buf = [0u8; 4];
    let (bytes, _, had_errors) = SHIFT_JIS.encode(c.encode_utf8(&mut buf));
    if had_errors || bytes.len() != 2 {
        return None;
    }
    let sjis = (u32::from(bytes[0]) << 8) | u32::from(bytes[1]);
    let offset = match sjis {
        0x8140..=0x9FFC => sjis - 0x8140,
        0xE040..=0xEBBF => sjis - 0xC140,
        _ => return None,
    };
    Some((offset >> 8) * 0xC0 + (offset & 0xFF))
}

fn mode_index(mode: Mode) -> usize {
    MODE_TYPES
        .iter()
        .position(|&m| m == mode)
        .expect("character modes are drawn from MODE_TYPES")
}

/// Returns the cheapest mode for each character at the given version.
/// All costs are in units of 1/6 bit so that numeric (10/3 bits per
/// digit) and alphanumeric (11/2 bits per char) costs stay integral.
fn compute_character_modes(codepoints: &[char], version: Version) -> Vec<Mode> {
    let headcosts: [usize; 4] =
        MODE_TYPES.map(|m| (4 + usize::from(m.num_char_count_bits(version))) * 6);

    // charmodes[i][j] is the mode of character i on the cheapest encoding
    // of the prefix 0..=i whose final segment is MODE_TYPES[j]
    let mut charmodes: Vec<[Option<Mode>; 4]> = vec![[None; 4]; codepoints.len()];

    // prevcosts[j] is the minimum cost of the prefix so far ending in MODE_TYPES[j]
    let mut prevcosts: [usize; 4] = headcosts;

    for (&c, modes) in codepoints.iter().zip(charmodes.iter_mut()) {
        let mut curcosts = [0usize; 4];

        // Byte mode can always be extended
        curcosts[0] = prevcosts[0] + c.len_utf8() * 8 * 6;
        modes[0] = Some(Mode::Byte);
        if alphanumeric_index(c).is_some() {
            curcosts[1] = prevcosts[1] + 33;
            modes[1] = Some(Mode::Alphanumeric);
        }
        if c.is_ascii_digit() {
            curcosts[2] = prevcosts[2] + 20;
            modes[2] = Some(Mode::Numeric);
        }
        if is_kanji(c) {
            curcosts[3] = prevcosts[3] + 78;
            modes[3] = Some(Mode::Kanji);
        }

        // Close the segment after this character and open a new one
        for j in 0..MODE_TYPES.len() {
            for k in 0..MODE_TYPES.len() {
                let newcost: usize = (curcosts[k] + 5) / 6 * 6 + headcosts[j];
                if modes[k].is_some() && (modes[j].is_none() || newcost < curcosts[j]) {
                    curcosts[j] = newcost;
                    modes[j] = Some(MODE_TYPES[k]);
                }
            }
        }
        prevcosts = curcosts;
    }

    let mut curmode = Mode::Byte;
    if let Some(last) = charmodes.last() {
        let mut mincost = prevcosts[0];
        for (i, &mode) in MODE_TYPES.iter().enumerate().skip(1) {
            if last[i].is_some() && prevcosts[i] < mincost {
                mincost = prevcosts[i];
                curmode = mode;
            }
        }
    }

    let mut result = vec![Mode::Byte; codepoints.len()];
    for i in (0..codepoints.len()).rev() {
        curmode = charmodes[i][mode_index(curmode)]
            .expect("trace-back only follows modes recorded for each character");
        result[i] = curmode;
    }
    result
}

/// Groups consecutive characters of equal mode into segments.
fn split_into_segments(codepoints: &[char], charmodes: &[Mode]) -> Result<Vec<QrSegment>> {
    debug_assert_eq!(codepoints.len(), charmodes.len());
    let mut result = Vec::new();
    let mut start: usize = 0;
    while start < codepoints.len() {
        let mode = charmodes[start];
        let runlen = charmodes[start..].iter().take_while(|&&m| m == mode).count();
        let run: String = codepoints[start..start + runlen].iter().collect();
        result.push(match mode {
            Mode::Byte => QrSegment::make_bytes(run.as_bytes()),
            Mode::Numeric => QrSegment::make_numeric(&run)?,
            Mode::Alphanumeric => QrSegment::make_alphanumeric(&run)?,
            Mode::Kanji => QrSegment::make_kanji(&run)?,
            Mode::Eci => unreachable!(),
        });
        start += runlen;
    }
    Ok(result)
}

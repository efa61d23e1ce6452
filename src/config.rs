//! Encoding settings.

use serde::{Deserialize, Serialize};

use crate::error::{QrError, Result};
use crate::qrcode::{Mask, QrCodeEcc, Version};

/// How text is split into segments before encoding.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Segmentation {
    /// One segment in the narrowest mode that covers the whole text.
    #[default]
    Single,
    /// Per-character mode choice minimising the total bit count.
    Optimal,
}

/// Settings for [`QrCode::encode_text_with`](crate::QrCode::encode_text_with).
///
/// Plain numbers are kept here so the settings can be loaded from any
/// serde format; [`EncodeOptions::validate`] turns them into typed values.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EncodeOptions {
    pub ecl: QrCodeEcc,
    pub min_version: u8,
    pub max_version: u8,
    /// A fixed mask pattern (0-7), or `None` to pick the best one.
    pub mask: Option<u8>,
    /// Raise the ECC level when that needs no larger version.
    pub boost_ecl: bool,
    pub segmentation: Segmentation,
}

impl Default for EncodeOptions {
    fn default() -> Self {
        Self {
            ecl: QrCodeEcc::Low,
            min_version: Version::MIN.value(),
            max_version: Version::MAX.value(),
            mask: None,
            boost_ecl: true,
            segmentation: Segmentation::Single,
        }
    }
}

impl EncodeOptions {
    /// Create options with the given error correction level and defaults otherwise
    pub fn new(ecl: QrCodeEcc) -> Self {
        Self {
            ecl,
            ..Self::default()
        }
    }

    pub fn with_versions(mut self, min_version: u8, max_version: u8) -> Self {
        self.min_version = min_version;
        self.max_version = max_version;
        self
    }

    pub fn with_mask(mut self, mask: Option<u8>) -> Self {
        self.mask = mask;
        self
    }

    pub fn with_boost_ecl(mut self, boost_ecl: bool) -> Self {
        self.boost_ecl = boost_ecl;
        self
    }

    pub fn with_segmentation(mut self, segmentation: Segmentation) -> Self {
        self.segmentation = segmentation;
        self
    }

    /// Checks the numeric settings and returns the version bounds and mask.
    ///
    /// # Errors
    ///
    /// [`QrError::InvalidVersion`], [`QrError::InvalidVersionRange`] or
    /// [`QrError::InvalidMask`].
    pub fn validate(&self) -> Result<(Version, Version, Option<Mask>)> {
        let minversion = Version::new(self.min_version)?;
        let maxversion = Version::new(self.max_version)?;
        if minversion > maxversion {
            return Err(QrError::InvalidVersionRange {
                min: self.min_version,
                max: self.max_version,
            });
        }
        let mask = self.mask.map(Mask::new).transpose()?;
        Ok((minversion, maxversion, mask))
    }
}

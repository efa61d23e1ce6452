//! # qrmatrix
//!
//! A Rust library for encoding text or binary data into QR Code symbols.
//!
//! `qrmatrix` builds the module grid of a QR Code Model 2 symbol: versions 1 to 40, four error
//! correction levels, numeric, alphanumeric, byte, kanji and ECI segments. It stops at the grid;
//! drawing it as an image, SVG or terminal art is left to the caller, which needs only
//! [`QrCode::size`] and [`QrCode::get_module`].
//!
//! ## Features
//!
//! - Encode data in numeric, alphanumeric, byte, kanji or ECI modes.
//! - Single-mode or optimal mixed-mode segmentation of text.
//! - Support four error correction levels: Low, Medium, Quartile, High.
//! - Automatic or fixed mask selection; the `parallel` feature scores masks with rayon.
//! - Safe Rust implementation with no unsafe code.
//!
//! ## Installation
//!
//! Add to your `Cargo.toml`:
//!
//! ```toml
//! [dependencies]
//! qrmatrix = "0.1" # Replace with the latest version
//! ```
//!
//! ## Example
//!
//! Print a QR code to the console:
//!
//! ```rust
//! use qrmatrix::{QrCode, QrCodeEcc};
//!
//! let qr = QrCode::encode_text("https://example.com", QrCodeEcc::Medium).unwrap();
//! let border: i32 = 4;
//! for y in -border..qr.size() + border {
//!     let line: String = (-border..qr.size() + border)
//!         .map(|x| if qr.get_module(x, y) { "██" } else { "  " })
//!         .collect();
//!     println!("{}", line);
//! }
//! ```
//!
//! Encode with explicit settings:
//!
//! ```rust
//! use qrmatrix::{EncodeOptions, QrCode, QrCodeEcc, Segmentation};
//!
//! let options = EncodeOptions::new(QrCodeEcc::Quartile)
//!     .with_versions(1, 10)
//!     .with_segmentation(Segmentation::Optimal);
//! let qr = QrCode::encode_text_with("Order 0012345678901234 shipped", &options).unwrap();
//! assert!(qr.version().value() <= 10);
//! ```
//!
//! ## Modules
//!
//! - [`qrcode`]: Symbol construction and the finished [`QrCode`].
//! - [`segment`] and [`segment_advanced`]: Data segments, kanji and optimal segmentation.
//! - [`bitbuffer`]: The bit sequences segments are built from.
//! - [`reed_solomon`]: Error correction codewords.
//! - [`config`]: Serializable encoding settings.

#![forbid(unsafe_code)]

pub mod bitbuffer;
pub mod config;
pub mod error;
pub mod qrcode;
pub mod reed_solomon;
pub mod segment;
pub mod segment_advanced;

pub use bitbuffer::{BitBuffer, BitSet};
pub use config::{EncodeOptions, Segmentation};
pub use error::{QrError, Result};
pub use qrcode::{Mask, QrCode, QrCodeEcc, Version};
pub use segment::{Mode, QrSegment};

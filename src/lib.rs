//! # exif-copy
//!
//! Read well-known EXIF metadata fields (capture date, camera make and
//! model, exposure, dimensions, ...) from JPEG files, and copy a complete
//! EXIF tag set losslessly from one JPEG to another.
//!
//! The TIFF/EXIF decoding and re-encoding is implemented in this crate:
//! a JPEG segment scanner isolates the APP1 block, an IFD decoder walks
//! the directory chain into typed entries, and the rewriter re-serializes
//! the set with every relocated offset recomputed — leaving all bytes of
//! the destination outside the Exif segment untouched.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::path::Path;
//!
//! fn main() -> Result<(), exif_copy::Error> {
//!     // Read the fields of a photo.
//!     let record = exif_copy::read_metadata(Path::new("photo.jpg"))?;
//!     println!("{} {} — ISO {:?}", record.make, record.model, record.iso);
//!     if let Some(date) = record.date_taken {
//!         println!("taken {date}");
//!     }
//!
//!     // Carry the photo's metadata over to a resized copy of it.
//!     exif_copy::copy_metadata(Path::new("photo.jpg"), Path::new("photo-small.jpg"))?;
//!     Ok(())
//! }
//! ```
//!
//! A failed copy never leaves the destination half-written: the rewritten
//! image is staged in a temp file beside it and renamed into place only
//! once complete.
//!
//! ## Modules
//!
//! - [`exif`] — the public read and copy operations
//! - [`jpeg`] — JPEG marker scanning
//! - [`tiff`] — TIFF/IFD decoding, typed values, and re-serialization
//! - [`error`] — the error kinds

pub mod error;
pub mod exif;
pub mod jpeg;
pub mod tiff;

pub use error::{Error, Result};
pub use exif::{MetadataRecord, copy_metadata, read_capture_date, read_metadata};

//! The public Exif operations.
//!
//! - [`read_metadata`] — decode the well-known fields of a JPEG into a
//!   [`MetadataRecord`]
//! - [`read_capture_date`] — shortcut for just the capture date
//! - [`copy_metadata`] — losslessly replace one JPEG's Exif tag set with
//!   another's
//!
//! The reader degrades gracefully (absent fields stay absent); the copier
//! is strict, because a structural problem in either file would otherwise
//! produce a silently wrong rewrite.

mod reader;
mod writer;

pub use reader::{MetadataRecord, read_capture_date, read_metadata};
pub use writer::copy_metadata;

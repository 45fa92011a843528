use std::io;
use std::path::{Path, PathBuf};

/// Errors surfaced by the read and copy operations.
///
/// Per-field coercion failures (an unparseable date string, a tag with a
/// non-numeric type where a number is expected) are *not* errors: they
/// leave the affected field absent and the rest of the record intact.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The file is not framed as a valid JPEG, or its Exif block is not
    /// valid TIFF (bad header, truncated segment, out-of-bounds offsets,
    /// cyclic IFD chain).
    #[error("malformed image data: {0}")]
    Format(&'static str),

    /// The source file could not be opened or read.
    #[error("cannot read {}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The operation requires Exif metadata the source does not carry.
    #[error("no Exif metadata in {}", .path.display())]
    NoExif { path: PathBuf },

    /// The destination could not be rewritten. The original destination
    /// file is left untouched; only the temp file is discarded.
    #[error("cannot write {}", .path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl Error {
    pub(crate) fn read(path: &Path, source: io::Error) -> Self {
        Error::Read { path: path.to_path_buf(), source }
    }

    pub(crate) fn no_exif(path: &Path) -> Self {
        Error::NoExif { path: path.to_path_buf() }
    }

    pub(crate) fn write(path: &Path, source: io::Error) -> Self {
        Error::Write { path: path.to_path_buf(), source }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

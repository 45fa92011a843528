use std::fs;
use std::io::Write;
use std::path::Path;

use crate::error::{Error, Result};
use crate::jpeg;
use crate::tiff::{self, TiffOutputSet};

/// Copy (replace) the Exif metadata of one JPEG into another.
///
/// The source's complete IFD set — including sub-IFDs and an embedded
/// thumbnail — is re-serialized and spliced into the destination, whose
/// every byte outside the Exif APP1 segment is preserved verbatim: pixel
/// data is never re-encoded.
///
/// The rewritten image is built in a temp file next to the destination and
/// only renamed into place once fully written, so an interrupted or failed
/// copy leaves the destination untouched.
///
/// Errors: [`Error::Read`] / [`Error::NoExif`] for an unreadable or
/// Exif-less source, [`Error::Format`] for broken JPEG/TIFF structure on
/// either side, [`Error::Write`] when the destination cannot be rewritten.
///
/// # Example
///
/// ```rust,no_run
/// exif_copy::copy_metadata("original.jpg".as_ref(), "resized.jpg".as_ref())?;
/// # Ok::<(), exif_copy::Error>(())
/// ```
pub fn copy_metadata(source: &Path, dest: &Path) -> Result<()> {
    let src_data = fs::read(source).map_err(|e| Error::read(source, e))?;
    let Some(block) = jpeg::exif_tiff_bytes(&src_data)? else {
        return Err(Error::no_exif(source));
    };
    let output_set = TiffOutputSet::from(&tiff::decode(block)?);

    let dst_data = fs::read(dest).map_err(|e| Error::write(dest, e))?;
    let rewritten = jpeg::splice_exif(&dst_data, &output_set.encode()?)?;

    replace_file(dest, &rewritten)?;
    log::info!(
        "copied Exif metadata ({} bytes) from {} to {}",
        block.len(),
        source.display(),
        dest.display(),
    );
    Ok(())
}

/// Write `data` over `path` through a temp file in the same directory.
/// The rename is the only non-interruptible moment; everything before it
/// leaves the original file intact, and the temp file is deleted on every
/// early-exit path by its guard.
fn replace_file(path: &Path, data: &[u8]) -> Result<()> {
    let dir = path.parent().filter(|p| !p.as_os_str().is_empty());
    let mut tmp = tempfile::Builder::new()
        .prefix(".exif-copy.")
        .suffix(".tmp")
        .tempfile_in(dir.unwrap_or_else(|| Path::new(".")))
        .map_err(|e| Error::write(path, e))?;
    tmp.write_all(data).map_err(|e| Error::write(path, e))?;
    tmp.flush().map_err(|e| Error::write(path, e))?;
    tmp.persist(path).map_err(|e| Error::write(path, e.error))?;
    Ok(())
}

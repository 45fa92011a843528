use chrono::NaiveDateTime;
use std::fs;
use std::path::Path;

use crate::error::{Error, Result};
use crate::jpeg;
use crate::tiff::{self, TiffData};

// Capture date candidates, in fixed priority order: the moment the shutter
// fired, then digitization, then the file-level modification stamp.
const TAGS_DATE: &[u16] = &[0x9003, 0x9004, 0x0132];
// Dimensions: the IFD0 tags, then the Exif pixel-dimension tags.
const TAGS_WIDTH: &[u16] = &[0x0100, 0xA002];
const TAGS_HEIGHT: &[u16] = &[0x0101, 0xA003];
const TAGS_MAKE: &[u16] = &[0x010F];
const TAGS_MODEL: &[u16] = &[0x0110, 0x1000];
const TAGS_SOFTWARE: &[u16] = &[0x0131];
const TAGS_ISO: &[u16] = &[0x8827];
const TAGS_EXPOSURE: &[u16] = &[0x829A];
const TAGS_APERTURE: &[u16] = &[0x9202, 0x829D];
const TAGS_FOCAL_LENGTH: &[u16] = &[0x920A];

/// Exif date strings use one fixed layout.
const DATE_FORMAT: &str = "%Y:%m:%d %H:%M:%S";

/// The metadata fields extracted from one JPEG file.
///
/// Fully owned scalar and string values — no borrows into the file buffer.
/// String fields are empty when the tag is absent or unusable; optional
/// fields are `None`. One malformed tag never affects the others.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MetadataRecord {
    /// File name component of the path.
    pub file_name: String,
    /// File size in bytes.
    pub file_size: u64,
    /// Capture date, from the first parseable date candidate.
    pub date_taken: Option<NaiveDateTime>,
    pub width: Option<u32>,
    pub height: Option<u32>,
    /// Camera manufacturer (Make).
    pub make: String,
    /// Camera model.
    pub model: String,
    /// Creating/editing software.
    pub software: String,
    pub iso: Option<u32>,
    /// Exposure time, e.g. `1/250`.
    pub exposure: String,
    /// Aperture (APEX ApertureValue, falling back to FNumber).
    pub aperture: String,
    /// Focal length in millimetres, as recorded.
    pub focal_length: String,
}

/// Read the metadata record of a JPEG file.
///
/// An unreadable file fails with [`Error::Read`]; broken JPEG framing with
/// [`Error::Format`]. A file with no Exif segment — or one whose TIFF
/// block does not decode — yields a record with every Exif-derived field
/// absent rather than an error.
///
/// # Example
///
/// ```rust,no_run
/// let record = exif_copy::read_metadata("photo.jpg".as_ref())?;
/// if let Some(date) = record.date_taken {
///     println!("{} shot {date}", record.model);
/// }
/// # Ok::<(), exif_copy::Error>(())
/// ```
pub fn read_metadata(path: &Path) -> Result<MetadataRecord> {
    let data = fs::read(path).map_err(|e| Error::read(path, e))?;

    let mut record = MetadataRecord {
        file_name: path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default(),
        file_size: data.len() as u64,
        ..MetadataRecord::default()
    };

    let Some(tiff) = decode_exif_block(path, &data)? else {
        return Ok(record);
    };

    record.date_taken = field_as_date(&tiff, TAGS_DATE);
    record.width = field_as_u32(&tiff, TAGS_WIDTH);
    record.height = field_as_u32(&tiff, TAGS_HEIGHT);
    record.make = field_as_string(&tiff, TAGS_MAKE);
    record.model = field_as_string(&tiff, TAGS_MODEL);
    record.software = field_as_string(&tiff, TAGS_SOFTWARE);
    record.iso = field_as_u32(&tiff, TAGS_ISO);
    record.exposure = field_as_string(&tiff, TAGS_EXPOSURE);
    record.aperture = field_as_string(&tiff, TAGS_APERTURE);
    record.focal_length = field_as_string(&tiff, TAGS_FOCAL_LENGTH);
    Ok(record)
}

/// Read just the capture date of a JPEG file, with the same fallback
/// order as [`read_metadata`].
pub fn read_capture_date(path: &Path) -> Result<Option<NaiveDateTime>> {
    let data = fs::read(path).map_err(|e| Error::read(path, e))?;
    Ok(decode_exif_block(path, &data)?.and_then(|tiff| field_as_date(&tiff, TAGS_DATE)))
}

/// Scan and decode the Exif block of an in-memory JPEG. Framing errors
/// surface; a missing or undecodable TIFF block degrades to `None` on the
/// read path (the copy path re-decodes strictly).
fn decode_exif_block(path: &Path, data: &[u8]) -> Result<Option<TiffData>> {
    let Some(block) = jpeg::exif_tiff_bytes(data)? else {
        log::debug!("no Exif segment in {}", path.display());
        return Ok(None);
    };
    match tiff::decode(block) {
        Ok(tiff) => Ok(Some(tiff)),
        Err(e) => {
            log::debug!("undecodable Exif block in {}: {e}", path.display());
            Ok(None)
        }
    }
}

/// First matching candidate tag, candidate-major: earlier candidates win
/// over earlier directories.
fn find_field<'a>(tiff: &'a TiffData, candidates: &[u16]) -> Option<&'a tiff::IfdEntry> {
    candidates.iter().find_map(|&tag| tiff.find_entry(tag))
}

fn field_as_date(tiff: &TiffData, candidates: &[u16]) -> Option<NaiveDateTime> {
    let entry = find_field(tiff, candidates)?;
    let value = entry.value(tiff.endian);
    let text = value.as_text()?;
    match NaiveDateTime::parse_from_str(text.trim(), DATE_FORMAT) {
        Ok(date) => Some(date),
        Err(_) => {
            log::debug!("unparseable Exif date {text:?} in tag {:#06X}", entry.tag);
            None
        }
    }
}

fn field_as_u32(tiff: &TiffData, candidates: &[u16]) -> Option<u32> {
    find_field(tiff, candidates)?.value(tiff.endian).as_u32()
}

fn field_as_string(tiff: &TiffData, candidates: &[u16]) -> String {
    find_field(tiff, candidates)
        .and_then(|entry| entry.value(tiff.endian).to_display())
        .unwrap_or_default()
}

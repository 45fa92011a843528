//! End-to-end read and copy tests over real JPEG files.
//!
//! Fixtures are generated on the fly: the `image` crate produces a valid
//! baseline JPEG, and an Exif APP1 segment built from a `TiffOutputSet`
//! is inserted after SOI. Pixel-preservation checks decode the scan data
//! before and after a copy.

use std::fs;
use std::path::PathBuf;

use anyhow::Result;
use exif_copy::tiff::{
    Endian, Ifd, IfdEntry, TYPE_ASCII, TYPE_RATIONAL, TYPE_SHORT, TiffOutputSet,
};
use exif_copy::{Error, copy_metadata, read_capture_date, read_metadata};

fn ascii(tag: u16, text: &str) -> IfdEntry {
    let mut raw = text.as_bytes().to_vec();
    raw.push(0);
    IfdEntry { tag, type_code: TYPE_ASCII, count: raw.len() as u32, raw }
}

fn short(tag: u16, value: u16) -> IfdEntry {
    IfdEntry { tag, type_code: TYPE_SHORT, count: 1, raw: value.to_le_bytes().to_vec() }
}

fn rational(tag: u16, num: u32, den: u32) -> IfdEntry {
    IfdEntry {
        tag,
        type_code: TYPE_RATIONAL,
        count: 1,
        raw: [num.to_le_bytes(), den.to_le_bytes()].concat(),
    }
}

/// The Exif tag set used by most tests, as a serialized TIFF block.
fn sample_tiff() -> Vec<u8> {
    tiff_with_dates("2014:11:09 14:45:18", "2014:11:10 08:00:00")
}

fn tiff_with_dates(original: &str, digitized: &str) -> Vec<u8> {
    let ifd0 = Ifd {
        entries: vec![
            ascii(0x010F, "NIKON CORPORATION"),
            ascii(0x0110, "NIKON D90"),
            ascii(0x0131, "Ver.1.00"),
            short(0x0100, 640),
            short(0x0101, 480),
        ],
    };
    let exif = Ifd {
        entries: vec![
            ascii(0x9003, original),
            ascii(0x9004, digitized),
            short(0x8827, 200),
            rational(0x829A, 1, 250),
            rational(0x9202, 5, 1),
            rational(0x920A, 50, 1),
        ],
    };
    let set = TiffOutputSet {
        endian: Endian::Little,
        chain: vec![ifd0],
        exif: Some(exif),
        gps: None,
        interop: None,
        thumbnail: None,
    };
    set.encode().unwrap()
}

/// A real JPEG (scan data included) with no Exif segment.
fn base_jpeg(width: u32, height: u32) -> Vec<u8> {
    let img = image::RgbImage::from_fn(width, height, |x, y| {
        image::Rgb([(x * 31 % 256) as u8, (y * 53 % 256) as u8, 0x80])
    });
    let mut buf = Vec::new();
    image::DynamicImage::ImageRgb8(img)
        .write_to(&mut std::io::Cursor::new(&mut buf), image::ImageFormat::Jpeg)
        .unwrap();
    buf
}

/// Insert an Exif APP1 segment directly after SOI.
fn with_exif(jpeg: &[u8], tiff: &[u8]) -> Vec<u8> {
    let mut out = jpeg[..2].to_vec();
    out.extend_from_slice(&[0xFF, 0xE1]);
    out.extend_from_slice(&((tiff.len() + 8) as u16).to_be_bytes());
    out.extend_from_slice(b"Exif\0\0");
    out.extend_from_slice(tiff);
    out.extend_from_slice(&jpeg[2..]);
    out
}

/// Pull the TIFF block back out of a written file, independent of the
/// crate's own scanner.
fn exif_block(jpeg: &[u8]) -> Vec<u8> {
    let pos = jpeg.windows(6).position(|w| w == b"Exif\0\0").expect("no Exif segment");
    let seglen = u16::from_be_bytes([jpeg[pos - 2], jpeg[pos - 1]]) as usize;
    jpeg[pos + 6..pos - 2 + seglen].to_vec()
}

struct Fixture {
    _dir: tempfile::TempDir,
    source: PathBuf,
    dest: PathBuf,
}

/// Source: 24x16 JPEG with the sample Exif set. Destination: 12x8 JPEG
/// without Exif (a "resized copy").
fn fixture() -> Result<Fixture> {
    let dir = tempfile::tempdir()?;
    let source = dir.path().join("original.jpg");
    let dest = dir.path().join("resized.jpg");
    fs::write(&source, with_exif(&base_jpeg(24, 16), &sample_tiff()))?;
    fs::write(&dest, base_jpeg(12, 8))?;
    Ok(Fixture { _dir: dir, source, dest })
}

#[test]
fn read_is_idempotent() -> Result<()> {
    let fx = fixture()?;
    let first = read_metadata(&fx.source)?;
    let second = read_metadata(&fx.source)?;
    assert_eq!(first, second);
    Ok(())
}

#[test]
fn read_decodes_all_sample_fields() -> Result<()> {
    let fx = fixture()?;
    let record = read_metadata(&fx.source)?;
    assert_eq!(record.file_name, "original.jpg");
    assert_eq!(record.file_size, fs::metadata(&fx.source)?.len());
    assert_eq!(record.make, "NIKON CORPORATION");
    assert_eq!(record.model, "NIKON D90");
    assert_eq!(record.software, "Ver.1.00");
    assert_eq!(record.width, Some(640));
    assert_eq!(record.height, Some(480));
    assert_eq!(record.iso, Some(200));
    assert_eq!(record.exposure, "1/250");
    assert_eq!(record.aperture, "5");
    assert_eq!(record.focal_length, "50");
    let date = record.date_taken.expect("capture date");
    assert_eq!(date.format("%Y:%m:%d %H:%M:%S").to_string(), "2014:11:09 14:45:18");
    Ok(())
}

#[test]
fn read_without_exif_yields_default_fields() -> Result<()> {
    let fx = fixture()?;
    let record = read_metadata(&fx.dest)?;
    assert_eq!(record.file_name, "resized.jpg");
    assert!(record.file_size > 0);
    assert_eq!(record.date_taken, None);
    assert_eq!(record.width, None);
    assert_eq!(record.make, "");
    assert_eq!(record.exposure, "");
    Ok(())
}

#[test]
fn copy_transfers_every_present_field() -> Result<()> {
    let fx = fixture()?;
    copy_metadata(&fx.source, &fx.dest)?;

    let src = read_metadata(&fx.source)?;
    let dst = read_metadata(&fx.dest)?;
    assert_eq!(dst.date_taken, src.date_taken);
    assert_eq!(dst.width, src.width);
    assert_eq!(dst.height, src.height);
    assert_eq!(dst.make, src.make);
    assert_eq!(dst.model, src.model);
    assert_eq!(dst.software, src.software);
    assert_eq!(dst.iso, src.iso);
    assert_eq!(dst.exposure, src.exposure);
    Ok(())
}

#[test]
fn copy_replaces_an_existing_exif_set() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let source = dir.path().join("a.jpg");
    let dest = dir.path().join("b.jpg");
    fs::write(&source, with_exif(&base_jpeg(24, 16), &sample_tiff()))?;

    let old_set = TiffOutputSet {
        endian: Endian::Little,
        chain: vec![Ifd { entries: vec![ascii(0x0110, "OLD CAMERA")] }],
        exif: None,
        gps: None,
        interop: None,
        thumbnail: None,
    };
    fs::write(&dest, with_exif(&base_jpeg(12, 8), &old_set.encode()?))?;

    copy_metadata(&source, &dest)?;
    let record = read_metadata(&dest)?;
    assert_eq!(record.model, "NIKON D90");
    Ok(())
}

#[test]
fn copy_never_touches_pixel_data() -> Result<()> {
    let fx = fixture()?;
    let before = fs::read(&fx.dest)?;
    let pixels_before = image::load_from_memory(&before)?.to_rgb8();

    copy_metadata(&fx.source, &fx.dest)?;

    let after = fs::read(&fx.dest)?;
    let decoded = image::load_from_memory(&after)?.to_rgb8();
    assert_eq!(decoded.dimensions(), pixels_before.dimensions());
    assert_eq!(decoded.as_raw(), pixels_before.as_raw());

    // Pure insertion: everything around the new segment is byte-identical.
    let added = after.len() - before.len();
    let split = before
        .iter()
        .zip(after.iter())
        .position(|(a, b)| a != b)
        .unwrap_or(before.len());
    assert_eq!(&after[split + added..], &before[split..]);
    Ok(())
}

#[test]
fn copy_from_exifless_source_fails_and_leaves_dest_intact() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let source = dir.path().join("plain.jpg");
    let dest = dir.path().join("dest.jpg");
    fs::write(&source, base_jpeg(4, 4))?;
    fs::write(&dest, base_jpeg(12, 8))?;
    let before = fs::read(&dest)?;

    assert!(matches!(copy_metadata(&source, &dest), Err(Error::NoExif { .. })));
    assert_eq!(fs::read(&dest)?, before);
    // The failed attempt must not leak a temp file either.
    assert_eq!(fs::read_dir(dir.path())?.count(), 2);
    Ok(())
}

#[test]
fn date_fallback_prefers_date_time_original() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("p.jpg");
    fs::write(
        &path,
        with_exif(
            &base_jpeg(4, 4),
            &tiff_with_dates("2014:11:09 14:45:18", "2020:06:01 12:00:00"),
        ),
    )?;
    let date = read_capture_date(&path)?.expect("capture date");
    assert_eq!(date.format("%Y:%m:%d %H:%M:%S").to_string(), "2014:11:09 14:45:18");
    Ok(())
}

#[test]
fn unparseable_date_leaves_other_fields_decoded() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("p.jpg");
    fs::write(
        &path,
        with_exif(&base_jpeg(4, 4), &tiff_with_dates("not-a-date", "also-bad")),
    )?;
    let record = read_metadata(&path)?;
    assert_eq!(record.date_taken, None);
    assert_eq!(record.make, "NIKON CORPORATION");
    assert_eq!(record.iso, Some(200));
    assert_eq!(record.exposure, "1/250");
    Ok(())
}

#[test]
fn thumbnail_survives_a_copy() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let source = dir.path().join("a.jpg");
    let dest = dir.path().join("b.jpg");

    let thumb = base_jpeg(2, 2);
    let set = TiffOutputSet {
        endian: Endian::Little,
        chain: vec![
            Ifd { entries: vec![ascii(0x0110, "NIKON D90")] },
            Ifd { entries: vec![short(0x0103, 6)] },
        ],
        exif: None,
        gps: None,
        interop: None,
        thumbnail: Some(thumb.clone()),
    };
    fs::write(&source, with_exif(&base_jpeg(8, 8), &set.encode()?))?;
    fs::write(&dest, base_jpeg(4, 4))?;

    copy_metadata(&source, &dest)?;

    let rewritten = exif_copy::tiff::decode(&exif_block(&fs::read(&dest)?))?;
    assert_eq!(rewritten.thumbnail.as_deref(), Some(thumb.as_slice()));
    Ok(())
}

#[test]
fn truncated_jpeg_is_a_format_error() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("broken.jpg");
    let mut data = with_exif(&base_jpeg(4, 4), &sample_tiff());
    data.truncate(12); // cut inside the APP1 header
    fs::write(&path, &data)?;
    assert!(matches!(read_metadata(&path), Err(Error::Format(_))));
    Ok(())
}

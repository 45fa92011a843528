//! TIFF/IFD decoding: header, directory chain, sub-IFD descent, and
//! bounds/cycle guards for malformed files.

use std::collections::HashSet;

use crate::error::{Error, Result};

use super::value::Value;
use super::{
    Endian, IFD_ENTRY_LEN, MAX_IFD_COUNT, TAG_EXIF_IFD, TAG_GPS_IFD, TAG_INTEROP_IFD,
    TAG_THUMBNAIL_LENGTH, TAG_THUMBNAIL_OFFSET, parse_header, type_size,
};

/// One directory entry: identity plus the raw value bytes in file byte
/// order. The typed value is decoded on demand.
#[derive(Debug, Clone, PartialEq)]
pub struct IfdEntry {
    pub tag: u16,
    pub type_code: u16,
    pub count: u32,
    /// Value bytes as stored in the file. For unknown type codes this is
    /// the 4-byte inline field, carried through verbatim.
    pub raw: Vec<u8>,
}

impl IfdEntry {
    /// Decode the typed value.
    pub fn value(&self, endian: Endian) -> Value {
        Value::decode(self.type_code, &self.raw, endian)
    }
}

/// One Image File Directory.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Ifd {
    pub entries: Vec<IfdEntry>,
}

impl Ifd {
    pub fn entry(&self, tag: u16) -> Option<&IfdEntry> {
        self.entries.iter().find(|e| e.tag == tag)
    }
}

/// A fully decoded TIFF block: the linked main chain (IFD0, IFD1, ...),
/// the sub-IFDs reached through pointer tags, and the IFD1 thumbnail
/// bytes when present. Owns all of its data; no borrows into the source.
#[derive(Debug, Clone)]
pub struct TiffData {
    pub endian: Endian,
    /// IFD0 and any further directories linked by next-IFD offsets.
    pub chain: Vec<Ifd>,
    /// Exif sub-IFD (IFD0 tag 0x8769).
    pub exif: Option<Ifd>,
    /// GPS sub-IFD (IFD0 tag 0x8825).
    pub gps: Option<Ifd>,
    /// Interoperability sub-IFD (Exif tag 0xA005).
    pub interop: Option<Ifd>,
    /// Compressed thumbnail referenced from IFD1.
    pub thumbnail: Option<Vec<u8>>,
}

impl TiffData {
    /// Directories in resolution order: IFD0, the Exif/Interop/GPS
    /// sub-IFDs, then the rest of the main chain.
    pub fn directories(&self) -> Vec<&Ifd> {
        let mut dirs = Vec::new();
        dirs.extend(self.chain.first());
        dirs.extend(self.exif.as_ref());
        dirs.extend(self.interop.as_ref());
        dirs.extend(self.gps.as_ref());
        dirs.extend(self.chain.iter().skip(1));
        dirs
    }

    /// First entry with the given tag across [`Self::directories`].
    pub fn find_entry(&self, tag: u16) -> Option<&IfdEntry> {
        self.directories().into_iter().find_map(|d| d.entry(tag))
    }
}

/// Decode an isolated TIFF block (the Exif APP1 payload after `Exif\0\0`).
pub fn decode(data: &[u8]) -> Result<TiffData> {
    let (endian, ifd0_offset) = parse_header(data)?;

    let mut walker = Walker { data, endian, visited: HashSet::new() };

    let mut chain = Vec::new();
    let mut next = ifd0_offset;
    while next != 0 {
        if chain.len() >= MAX_IFD_COUNT {
            return Err(Error::Format("IFD chain exceeds the directory limit"));
        }
        let (ifd, following) = walker.read_ifd(next)?;
        chain.push(ifd);
        next = following;
    }
    if chain.is_empty() {
        return Err(Error::Format("TIFF block has no IFD0"));
    }

    let exif = walker.read_sub_ifd(&chain[0], TAG_EXIF_IFD)?;
    let gps = walker.read_sub_ifd(&chain[0], TAG_GPS_IFD)?;
    let interop = match &exif {
        Some(exif) => walker.read_sub_ifd(exif, TAG_INTEROP_IFD)?,
        None => None,
    };

    let thumbnail = chain.get(1).and_then(|ifd1| read_thumbnail(data, endian, ifd1));

    Ok(TiffData { endian, chain, exif, gps, interop, thumbnail })
}

struct Walker<'a> {
    data: &'a [u8],
    endian: Endian,
    visited: HashSet<u32>,
}

impl Walker<'_> {
    /// Read one directory, returning it and the next-IFD offset.
    fn read_ifd(&mut self, offset: u32) -> Result<(Ifd, u32)> {
        if !self.visited.insert(offset) {
            return Err(Error::Format("cyclic IFD chain"));
        }
        if self.visited.len() > MAX_IFD_COUNT {
            return Err(Error::Format("IFD chain exceeds the directory limit"));
        }
        let offset = offset as usize;
        let count = self
            .endian
            .read_u16(self.data, offset)
            .ok_or(Error::Format("IFD offset out of bounds"))? as usize;
        let entries_start = offset + 2;
        let entries_end = entries_start + count * IFD_ENTRY_LEN;
        if entries_end > self.data.len() {
            return Err(Error::Format("IFD entry table out of bounds"));
        }

        let mut entries = Vec::with_capacity(count);
        for i in 0..count {
            entries.push(self.read_entry(entries_start + i * IFD_ENTRY_LEN)?);
        }

        // Some writers truncate the final next-IFD field; treat it as the
        // end of the chain.
        let next = self.endian.read_u32(self.data, entries_end).unwrap_or(0);
        Ok((Ifd { entries }, next))
    }

    fn read_entry(&self, offset: usize) -> Result<IfdEntry> {
        let tag = self.endian.read_u16(self.data, offset).unwrap_or_default();
        let type_code = self.endian.read_u16(self.data, offset + 2).unwrap_or_default();
        let count = self.endian.read_u32(self.data, offset + 4).unwrap_or_default();
        let inline = &self.data[offset + 8..offset + 12];

        let raw = match type_size(type_code) {
            // Unknown type: the 4-byte field is all we can carry.
            None => inline.to_vec(),
            Some(unit) => {
                let total = unit as u64 * u64::from(count);
                if total <= 4 {
                    inline[..total as usize].to_vec()
                } else {
                    let value_offset = self.endian.read_u32(inline, 0).unwrap_or_default() as u64;
                    let end = value_offset + total;
                    if end > self.data.len() as u64 {
                        return Err(Error::Format("tag value out of bounds"));
                    }
                    self.data[value_offset as usize..end as usize].to_vec()
                }
            }
        };

        Ok(IfdEntry { tag, type_code, count, raw })
    }

    /// Follow a sub-IFD pointer tag out of `parent`, if present.
    fn read_sub_ifd(&mut self, parent: &Ifd, pointer_tag: u16) -> Result<Option<Ifd>> {
        let Some(entry) = parent.entry(pointer_tag) else {
            return Ok(None);
        };
        let Some(offset) = entry.value(self.endian).as_u32() else {
            return Err(Error::Format("sub-IFD pointer is not an integer"));
        };
        let (ifd, _next) = self.read_ifd(offset)?;
        Ok(Some(ifd))
    }
}

/// Pull the compressed-thumbnail bytes referenced from IFD1. A range that
/// falls outside the buffer degrades to "no thumbnail" rather than failing
/// the whole decode.
fn read_thumbnail(data: &[u8], endian: Endian, ifd1: &Ifd) -> Option<Vec<u8>> {
    let offset = ifd1.entry(TAG_THUMBNAIL_OFFSET)?.value(endian).as_u32()? as usize;
    let length = ifd1.entry(TAG_THUMBNAIL_LENGTH)?.value(endian).as_u32()? as usize;
    match data.get(offset..offset + length) {
        Some(bytes) => Some(bytes.to_vec()),
        None => {
            log::debug!("thumbnail range {offset}+{length} out of bounds, dropping");
            None
        }
    }
}

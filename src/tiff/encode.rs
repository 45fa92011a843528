//! Serialization of an IFD set into a fresh TIFF block.
//!
//! Insertion into a different JPEG shifts every absolute position, so all
//! offset-bearing fields are recomputed here: sub-IFD pointers, next-IFD
//! links, value-overflow offsets, and the relocated thumbnail range.

use crate::error::{Error, Result};

use super::decode::{Ifd, IfdEntry, TiffData};
use super::{
    Endian, TAG_EXIF_IFD, TAG_GPS_IFD, TAG_INTEROP_IFD, TAG_STRIP_BYTE_COUNTS,
    TAG_STRIP_OFFSETS, TAG_THUMBNAIL_LENGTH, TAG_THUMBNAIL_OFFSET, TIFF_HEADER_LEN,
    TIFF_MAGIC, TYPE_LONG,
};

/// A mutable set of IFDs destined for a rewrite, detached from any file.
///
/// Constructed by cloning a decoded chain; the source's byte order is kept
/// so raw value bytes can be carried through unconverted.
#[derive(Debug, Clone)]
pub struct TiffOutputSet {
    pub endian: Endian,
    pub chain: Vec<Ifd>,
    pub exif: Option<Ifd>,
    pub gps: Option<Ifd>,
    pub interop: Option<Ifd>,
    pub thumbnail: Option<Vec<u8>>,
}

impl From<&TiffData> for TiffOutputSet {
    fn from(tiff: &TiffData) -> Self {
        TiffOutputSet {
            endian: tiff.endian,
            chain: tiff.chain.clone(),
            exif: tiff.exif.clone(),
            gps: tiff.gps.clone(),
            interop: tiff.interop.clone(),
            thumbnail: tiff.thumbnail.clone(),
        }
    }
}

/// A directory with its assigned position in the output block.
struct DirPlan {
    entries: Vec<IfdEntry>,
    offset: u32,
    next: u32,
    /// Per entry: assigned overflow offset, 0 when the value is inline.
    value_offsets: Vec<u32>,
}

impl TiffOutputSet {
    /// Serialize to a TIFF block suitable for an `Exif\0\0` APP1 payload.
    pub fn encode(&self) -> Result<Vec<u8>> {
        if self.chain.is_empty() {
            return Err(Error::Format("output set has no IFD0"));
        }
        let endian = self.endian;
        let thumbnail = match (&self.thumbnail, self.chain.len() > 1) {
            (Some(bytes), true) => Some(bytes.as_slice()),
            _ => None,
        };

        // Directory entry lists in write order, pointer tags synthesized
        // fresh so stale offsets can never leak through.
        let mut dir_list: Vec<Vec<IfdEntry>> = Vec::new();
        let mut ifd0 = strip_offset_tags(&self.chain[0]);
        if self.exif.is_some() {
            ifd0.push(pointer_entry(TAG_EXIF_IFD));
        }
        if self.gps.is_some() {
            ifd0.push(pointer_entry(TAG_GPS_IFD));
        }
        ifd0.sort_by_key(|e| e.tag);
        dir_list.push(ifd0);

        let mut exif_idx = None;
        if let Some(exif) = &self.exif {
            let mut dir = strip_offset_tags(exif);
            if self.interop.is_some() {
                dir.push(pointer_entry(TAG_INTEROP_IFD));
            }
            dir.sort_by_key(|e| e.tag);
            exif_idx = Some(dir_list.len());
            dir_list.push(dir);
        }
        let mut interop_idx = None;
        if let Some(interop) = &self.interop {
            let mut dir = strip_offset_tags(interop);
            dir.sort_by_key(|e| e.tag);
            interop_idx = Some(dir_list.len());
            dir_list.push(dir);
        }
        let mut gps_idx = None;
        if let Some(gps) = &self.gps {
            let mut dir = strip_offset_tags(gps);
            dir.sort_by_key(|e| e.tag);
            gps_idx = Some(dir_list.len());
            dir_list.push(dir);
        }

        let tail_start = dir_list.len();
        for (i, ifd) in self.chain.iter().enumerate().skip(1) {
            let mut dir = strip_offset_tags(ifd);
            if i == 1 {
                if let Some(bytes) = thumbnail {
                    dir.push(pointer_entry(TAG_THUMBNAIL_OFFSET));
                    dir.push(IfdEntry {
                        tag: TAG_THUMBNAIL_LENGTH,
                        type_code: TYPE_LONG,
                        count: 1,
                        raw: endian.u32_bytes(bytes.len() as u32).to_vec(),
                    });
                }
            }
            dir.sort_by_key(|e| e.tag);
            dir_list.push(dir);
        }

        // Layout pass: assign directory and overflow-value positions.
        let mut cursor = TIFF_HEADER_LEN as u32;
        let mut plans: Vec<DirPlan> = Vec::with_capacity(dir_list.len());
        for entries in dir_list {
            let offset = cursor;
            cursor += 2 + entries.len() as u32 * 12 + 4;
            let mut value_offsets = vec![0u32; entries.len()];
            for (i, entry) in entries.iter().enumerate() {
                if entry.raw.len() > 4 {
                    cursor += cursor % 2; // keep values word-aligned
                    value_offsets[i] = cursor;
                    cursor += entry.raw.len() as u32;
                }
            }
            plans.push(DirPlan { entries, offset, next: 0, value_offsets });
        }
        let thumbnail_offset = thumbnail.map(|bytes| {
            cursor += cursor % 2;
            let offset = cursor;
            cursor += bytes.len() as u32;
            offset
        });

        // Link the main chain; sub-IFDs terminate their own chains.
        plans[0].next = plans.get(tail_start).map(|p| p.offset).unwrap_or(0);
        for i in tail_start..plans.len().saturating_sub(1) {
            let next = plans[i + 1].offset;
            plans[i].next = next;
        }

        // Write pass.
        let mut out = Vec::with_capacity(cursor as usize);
        out.extend_from_slice(&endian.marker());
        out.extend_from_slice(&endian.u16_bytes(TIFF_MAGIC));
        out.extend_from_slice(&endian.u32_bytes(plans[0].offset));
        for plan in &plans {
            debug_assert_eq!(out.len() as u32, plan.offset);
            out.extend_from_slice(&endian.u16_bytes(plan.entries.len() as u16));
            for (i, entry) in plan.entries.iter().enumerate() {
                out.extend_from_slice(&endian.u16_bytes(entry.tag));
                out.extend_from_slice(&endian.u16_bytes(entry.type_code));
                out.extend_from_slice(&endian.u32_bytes(entry.count));
                let relocated = match entry.tag {
                    TAG_EXIF_IFD => exif_idx.map(|idx| plans[idx].offset),
                    TAG_GPS_IFD => gps_idx.map(|idx| plans[idx].offset),
                    TAG_INTEROP_IFD => interop_idx.map(|idx| plans[idx].offset),
                    TAG_THUMBNAIL_OFFSET => thumbnail_offset,
                    _ => None,
                };
                if let Some(target) = relocated {
                    out.extend_from_slice(&endian.u32_bytes(target));
                } else if entry.raw.len() <= 4 {
                    let mut field = [0u8; 4];
                    field[..entry.raw.len()].copy_from_slice(&entry.raw);
                    out.extend_from_slice(&field);
                } else {
                    out.extend_from_slice(&endian.u32_bytes(plan.value_offsets[i]));
                }
            }
            out.extend_from_slice(&endian.u32_bytes(plan.next));
            for (i, entry) in plan.entries.iter().enumerate() {
                if entry.raw.len() > 4 {
                    while (out.len() as u32) < plan.value_offsets[i] {
                        out.push(0);
                    }
                    out.extend_from_slice(&entry.raw);
                }
            }
        }
        if let (Some(bytes), Some(offset)) = (thumbnail, thumbnail_offset) {
            while (out.len() as u32) < offset {
                out.push(0);
            }
            out.extend_from_slice(bytes);
        }
        Ok(out)
    }
}

/// Clone an IFD's entries minus every offset-bearing tag. Sub-IFD and
/// thumbnail pointers are synthesized again at encode time; strip tables
/// of uncompressed thumbnails cannot be relocated without their pixel
/// strips and are dropped instead of left dangling.
fn strip_offset_tags(ifd: &Ifd) -> Vec<IfdEntry> {
    ifd.entries
        .iter()
        .filter(|e| {
            !matches!(
                e.tag,
                TAG_EXIF_IFD
                    | TAG_GPS_IFD
                    | TAG_INTEROP_IFD
                    | TAG_THUMBNAIL_OFFSET
                    | TAG_THUMBNAIL_LENGTH
                    | TAG_STRIP_OFFSETS
                    | TAG_STRIP_BYTE_COUNTS
            )
        })
        .cloned()
        .collect()
}

fn pointer_entry(tag: u16) -> IfdEntry {
    IfdEntry { tag, type_code: TYPE_LONG, count: 1, raw: vec![0; 4] }
}

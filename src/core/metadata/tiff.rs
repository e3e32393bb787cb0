//! Bounds-checked TIFF IFD scan for truncated prefixes.
//!
//! `kamadak-exif` rejects a TIFF structure as soon as any IFD or value
//! points past the end of the buffer, which is routine for a 256 KiB
//! slice of a RAW file. This scan only follows IFD0 and the Exif
//! sub-IFD, ignores anything out of range and returns as soon as
//! `DateTimeOriginal` is known.

use super::{MetadataSummary, MetadataTag};

const TYPE_ASCII: u16 = 2;
const TAG_EXIF_IFD_POINTER: u16 = 0x8769;
const ENTRY_LEN: usize = 12;
/// Real IFDs are far smaller; anything bigger is garbage
const MAX_ENTRIES: usize = 1024;

/// Whether `data` starts with a TIFF header in either byte order
pub fn has_tiff_header(data: &[u8]) -> bool {
    data.starts_with(b"II*\0") || data.starts_with(b"MM\0*")
}

struct Tiff<'a> {
    data: &'a [u8],
    big_endian: bool,
}

impl<'a> Tiff<'a> {
    fn u16_at(&self, offset: usize) -> Option<u16> {
        let bytes: [u8; 2] = self.data.get(offset..offset + 2)?.try_into().ok()?;
        Some(if self.big_endian {
            u16::from_be_bytes(bytes)
        } else {
            u16::from_le_bytes(bytes)
        })
    }

    fn u32_at(&self, offset: usize) -> Option<u32> {
        let bytes: [u8; 4] = self.data.get(offset..offset + 4)?.try_into().ok()?;
        Some(if self.big_endian {
            u32::from_be_bytes(bytes)
        } else {
            u32::from_le_bytes(bytes)
        })
    }

    /// Value bytes of an ASCII entry, inline when it fits in four bytes
    fn ascii_value(&self, entry: usize) -> Option<&'a [u8]> {
        if self.u16_at(entry + 2)? != TYPE_ASCII {
            return None;
        }
        let count = self.u32_at(entry + 4)? as usize;
        let start = if count <= 4 {
            entry + 8
        } else {
            self.u32_at(entry + 8)? as usize
        };
        self.data.get(start..start.checked_add(count)?)
    }

    /// Scan one IFD. Returns the Exif sub-IFD offset if one is referenced.
    fn scan_ifd(&self, offset: usize, summary: &mut MetadataSummary) -> Option<usize> {
        let count = (self.u16_at(offset)? as usize).min(MAX_ENTRIES);
        let mut exif_ifd = None;

        for index in 0..count {
            let entry = offset + 2 + index * ENTRY_LEN;
            let Some(tag) = self.u16_at(entry) else {
                break;
            };

            if tag == TAG_EXIF_IFD_POINTER {
                exif_ifd = self.u32_at(entry + 8).map(|o| o as usize);
                continue;
            }

            if let Some(known) = MetadataTag::from_tiff_id(tag) {
                if let Some(raw) = self.ascii_value(entry) {
                    summary.record(known, raw);
                }
                if summary.date_time_original.is_some() {
                    return None;
                }
            }
        }

        exif_ifd
    }
}

/// Scan `data` (starting at a TIFF header) for the capture-time tags.
pub fn scan(data: &[u8]) -> Result<MetadataSummary, String> {
    let big_endian = match data.get(0..4) {
        Some(b"II*\0") => false,
        Some(b"MM\0*") => true,
        _ => return Err("missing TIFF header".to_string()),
    };

    let tiff = Tiff { data, big_endian };
    let ifd0 = tiff
        .u32_at(4)
        .ok_or_else(|| "truncated TIFF header".to_string())? as usize;
    if ifd0 >= data.len() {
        return Err(format!("IFD0 offset {} beyond {} byte prefix", ifd0, data.len()));
    }

    let mut summary = MetadataSummary::default();
    if let Some(exif_ifd) = tiff.scan_ifd(ifd0, &mut summary) {
        if exif_ifd != ifd0 {
            tiff.scan_ifd(exif_ifd, &mut summary);
        }
    }
    Ok(summary)
}

#[cfg(test)]
pub(crate) mod fixtures {
    //! Minimal little-endian TIFF/EXIF builders for tests.

    const HEADER_LEN: usize = 8;

    fn ascii(value: &str) -> Vec<u8> {
        let mut bytes = value.as_bytes().to_vec();
        bytes.push(0);
        bytes
    }

    fn entry(out: &mut Vec<u8>, tag: u16, kind: u16, count: u32, value: u32) {
        out.extend_from_slice(&tag.to_le_bytes());
        out.extend_from_slice(&kind.to_le_bytes());
        out.extend_from_slice(&count.to_le_bytes());
        out.extend_from_slice(&value.to_le_bytes());
    }

    /// TIFF structure with `DateTime` in IFD0 and `DateTimeOriginal` in the
    /// Exif sub-IFD.
    pub fn tiff_with_dates(date_time: Option<&str>, original: Option<&str>) -> Vec<u8> {
        let date_time = date_time.map(ascii);
        let original = original.map(ascii);

        let ifd0_entries = date_time.is_some() as usize + original.is_some() as usize;
        let ifd0_len = 2 + ifd0_entries * 12 + 4;
        let date_time_at = HEADER_LEN + ifd0_len;
        let exif_ifd_at = date_time_at + date_time.as_ref().map_or(0, Vec::len);
        let exif_ifd_len = 2 + 12 + 4;
        let original_at = exif_ifd_at + exif_ifd_len;

        let mut out = Vec::new();
        out.extend_from_slice(b"II*\0");
        out.extend_from_slice(&(HEADER_LEN as u32).to_le_bytes());

        out.extend_from_slice(&(ifd0_entries as u16).to_le_bytes());
        if let Some(ref value) = date_time {
            entry(&mut out, 0x0132, 2, value.len() as u32, date_time_at as u32);
        }
        if original.is_some() {
            entry(&mut out, 0x8769, 4, 1, exif_ifd_at as u32);
        }
        out.extend_from_slice(&0u32.to_le_bytes());

        if let Some(ref value) = date_time {
            out.extend_from_slice(value);
        }

        if let Some(ref value) = original {
            out.extend_from_slice(&1u16.to_le_bytes());
            entry(&mut out, 0x9003, 2, value.len() as u32, original_at as u32);
            out.extend_from_slice(&0u32.to_le_bytes());
            out.extend_from_slice(value);
        }

        out
    }

    /// A JPEG whose APP1 segment carries the given TIFF structure
    pub fn jpeg_with_exif(tiff: &[u8]) -> Vec<u8> {
        let mut out = vec![0xFF, 0xD8, 0xFF, 0xE1];
        let segment_len = (2 + 6 + tiff.len()) as u16;
        out.extend_from_slice(&segment_len.to_be_bytes());
        out.extend_from_slice(b"Exif\0\0");
        out.extend_from_slice(tiff);
        out.extend_from_slice(&[0xFF, 0xD9]);
        out
    }
}

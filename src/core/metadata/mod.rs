//! # Metadata Module
//!
//! Extracts capture-time tags from a bounded prefix of a photo file.
//!
//! ## Extracted Fields
//! Only the capture-timestamp family is kept:
//! - `DateTimeOriginal` (0x9003), when the shutter fired
//! - `DateTime` (0x0132), last modification recorded by the camera
//!
//! Every other tag is dropped at the parser boundary.
//!
//! ## Read Budget
//! RAW files get a 256 KiB prefix, everything else 64 KiB. TIFF-based
//! RAWs keep their IFDs near the start; JPEG-family files carry the
//! APP1 `Exif` segment in the first few kilobytes.

mod extractor;
mod tiff;

pub use extractor::{
    find_exif_marker, parse_summary, prefix_len, MetadataExtractor, RetryPolicy,
    NON_RAW_PREFIX_BYTES, RAW_PREFIX_BYTES,
};

use serde::{Deserialize, Serialize};

/// The fixed set of tags the reconciler cares about
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MetadataTag {
    DateTimeOriginal,
    DateTime,
}

impl MetadataTag {
    pub const ALL: [MetadataTag; 2] = [MetadataTag::DateTimeOriginal, MetadataTag::DateTime];

    /// Numeric TIFF/EXIF tag id
    pub fn tiff_id(self) -> u16 {
        match self {
            MetadataTag::DateTimeOriginal => 0x9003,
            MetadataTag::DateTime => 0x0132,
        }
    }

    pub fn from_tiff_id(id: u16) -> Option<Self> {
        match id {
            0x9003 => Some(MetadataTag::DateTimeOriginal),
            0x0132 => Some(MetadataTag::DateTime),
            _ => None,
        }
    }
}

impl std::fmt::Display for MetadataTag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MetadataTag::DateTimeOriginal => write!(f, "DateTimeOriginal"),
            MetadataTag::DateTime => write!(f, "DateTime"),
        }
    }
}

/// Capture-time tags rendered as strings.
///
/// The empty summary is a valid value meaning "no usable metadata".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetadataSummary {
    pub date_time_original: Option<String>,
    pub date_time: Option<String>,
}

impl MetadataSummary {
    pub fn get(&self, tag: MetadataTag) -> Option<&str> {
        match tag {
            MetadataTag::DateTimeOriginal => self.date_time_original.as_deref(),
            MetadataTag::DateTime => self.date_time.as_deref(),
        }
    }

    /// Record a tag value. Blank values are ignored; the first value wins.
    pub(crate) fn record(&mut self, tag: MetadataTag, raw: &[u8]) {
        let Some(value) = render_ascii(raw) else {
            return;
        };
        let slot = match tag {
            MetadataTag::DateTimeOriginal => &mut self.date_time_original,
            MetadataTag::DateTime => &mut self.date_time,
        };
        if slot.is_none() {
            *slot = Some(value);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.date_time_original.is_none() && self.date_time.is_none()
    }

    /// Whether two summaries agree on a present `DateTimeOriginal`.
    ///
    /// Absent values never confirm a match.
    pub fn same_capture_time(&self, other: &MetadataSummary) -> bool {
        match (
            self.get(MetadataTag::DateTimeOriginal),
            other.get(MetadataTag::DateTimeOriginal),
        ) {
            (Some(a), Some(b)) => a == b,
            _ => false,
        }
    }
}

/// EXIF ASCII values are NUL-terminated and sometimes space padded
fn render_ascii(raw: &[u8]) -> Option<String> {
    let text = String::from_utf8_lossy(raw);
    let trimmed = text.trim_end_matches('\0').trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

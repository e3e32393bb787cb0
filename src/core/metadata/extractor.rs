//! Bounded-prefix metadata extraction with retry.

use super::tiff;
use super::MetadataSummary;
use super::MetadataTag;
use crate::core::scanner::{extension_of, is_raw_extension};
use crate::error::MetadataError;
use crate::events::EventSender;
use exif::{In, Reader, Value};
use std::fs::File;
use std::io::Read;
use std::path::Path;
use std::thread;
use std::time::Duration;

/// Prefix read for RAW-family files
pub const RAW_PREFIX_BYTES: usize = 256 * 1024;
/// Prefix read for everything else
pub const NON_RAW_PREFIX_BYTES: usize = 64 * 1024;

const EXIF_MARKER: &[u8] = b"Exif\0\0";

/// How many times to try a file, and how long to wait in between
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    max_attempts: u32,
    initial_delay: Duration,
}

impl RetryPolicy {
    /// `max_attempts` is clamped to at least one attempt
    pub fn new(max_attempts: u32, initial_delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            initial_delay,
        }
    }

    /// Build from the user-facing seconds value; invalid delays become zero
    pub fn from_secs_f64(max_attempts: u32, delay_secs: f64) -> Self {
        let delay = Duration::try_from_secs_f64(delay_secs).unwrap_or(Duration::ZERO);
        Self::new(max_attempts, delay)
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Delay before the attempt following `attempt` (1-based), doubling each time
    pub fn delay_after(&self, attempt: u32) -> Duration {
        let factor = 1u32 << attempt.saturating_sub(1).min(16);
        self.initial_delay.saturating_mul(factor)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(3, Duration::from_millis(100))
    }
}

/// Number of bytes to read from `path`, chosen by extension
pub fn prefix_len(path: &Path) -> usize {
    match extension_of(path) {
        Some(ext) if is_raw_extension(&ext) => RAW_PREFIX_BYTES,
        _ => NON_RAW_PREFIX_BYTES,
    }
}

/// Offset of the TIFF structure following an `Exif\0\0` marker
pub fn find_exif_marker(buffer: &[u8]) -> Option<usize> {
    buffer
        .windows(EXIF_MARKER.len())
        .position(|window| window == EXIF_MARKER)
        .map(|at| at + EXIF_MARKER.len())
}

/// Extract the capture-time tags from an in-memory prefix.
///
/// With an `Exif` marker the TIFF block after it is parsed in full by
/// `kamadak-exif`, falling back to the bounded scan when the block is
/// cut off. Without a marker, a TIFF header at the buffer start (most
/// RAW formats) is scanned directly.
pub fn parse_summary(path: &Path, buffer: &[u8]) -> Result<MetadataSummary, MetadataError> {
    let tiff_block = match find_exif_marker(buffer) {
        Some(offset) => &buffer[offset..],
        None if tiff::has_tiff_header(buffer) => buffer,
        None => {
            return Err(MetadataError::NoMetadataSegment {
                path: path.to_path_buf(),
            })
        }
    };

    match Reader::new().read_raw(tiff_block.to_vec()) {
        Ok(exif) => {
            let mut summary = MetadataSummary::default();
            for tag in MetadataTag::ALL {
                let field = match tag {
                    MetadataTag::DateTimeOriginal => {
                        exif.get_field(exif::Tag::DateTimeOriginal, In::PRIMARY)
                    }
                    MetadataTag::DateTime => exif.get_field(exif::Tag::DateTime, In::PRIMARY),
                };
                if let Some(Value::Ascii(parts)) = field.map(|f| &f.value) {
                    if let Some(first) = parts.first() {
                        summary.record(tag, first);
                    }
                }
            }
            Ok(summary)
        }
        Err(e) => {
            tracing::debug!("{}: full EXIF parse failed ({}), scanning IFDs", path.display(), e);
            tiff::scan(tiff_block).map_err(|reason| MetadataError::Parse {
                path: path.to_path_buf(),
                reason,
            })
        }
    }
}

fn read_prefix(path: &Path) -> Result<Vec<u8>, MetadataError> {
    let io_error = |source| MetadataError::Io {
        path: path.to_path_buf(),
        source,
    };
    let limit = prefix_len(path);
    let file = File::open(path).map_err(io_error)?;
    let mut buffer = Vec::with_capacity(limit);
    file.take(limit as u64)
        .read_to_end(&mut buffer)
        .map_err(io_error)?;
    Ok(buffer)
}

/// Extracts `MetadataSummary` values, retrying transient failures.
///
/// Holds no mutable state, so one extractor can be shared by every worker.
#[derive(Clone)]
pub struct MetadataExtractor {
    retry: RetryPolicy,
    events: EventSender,
}

impl MetadataExtractor {
    pub fn new(retry: RetryPolicy, events: EventSender) -> Self {
        Self { retry, events }
    }

    /// One attempt: read the prefix and parse it
    pub fn try_extract(&self, path: &Path) -> Result<MetadataSummary, MetadataError> {
        let buffer = read_prefix(path)?;
        parse_summary(path, &buffer)
    }

    /// Extract with retry and backoff.
    ///
    /// Never fails: exhausted retries yield an empty summary and a warning,
    /// a missing metadata segment yields an empty summary silently.
    pub fn extract(&self, path: &Path) -> MetadataSummary {
        let mut attempt = 1;
        loop {
            match self.try_extract(path) {
                Ok(summary) => return summary,
                Err(e) if !e.is_retryable() => {
                    tracing::debug!("{}", e);
                    return MetadataSummary::default();
                }
                Err(e) if attempt < self.retry.max_attempts() => {
                    let delay = self.retry.delay_after(attempt);
                    tracing::debug!(
                        "Retrying metadata read (attempt {}/{}) after {:?}: {}",
                        attempt + 1,
                        self.retry.max_attempts(),
                        delay,
                        e
                    );
                    thread::sleep(delay);
                    attempt += 1;
                }
                Err(e) => {
                    self.events.warn(format!(
                        "Giving up on metadata after {} attempts: {}",
                        attempt, e
                    ));
                    return MetadataSummary::default();
                }
            }
        }
    }
}

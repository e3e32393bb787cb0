//! Shared fixtures for integration tests.

#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};

/// Big-endian TIFF whose Exif sub-IFD carries `DateTimeOriginal`
pub fn tiff_with_capture_time(original: &str) -> Vec<u8> {
    let mut value = original.as_bytes().to_vec();
    value.push(0);

    // header (8) + IFD0 with one entry (2 + 12 + 4) = 26
    let exif_ifd_at: u32 = 26;
    // Exif IFD with one entry (2 + 12 + 4)
    let value_at = exif_ifd_at + 18;

    let mut out = Vec::new();
    out.extend_from_slice(b"MM\0*");
    out.extend_from_slice(&8u32.to_be_bytes());

    out.extend_from_slice(&1u16.to_be_bytes());
    out.extend_from_slice(&0x8769u16.to_be_bytes());
    out.extend_from_slice(&4u16.to_be_bytes());
    out.extend_from_slice(&1u32.to_be_bytes());
    out.extend_from_slice(&exif_ifd_at.to_be_bytes());
    out.extend_from_slice(&0u32.to_be_bytes());

    out.extend_from_slice(&1u16.to_be_bytes());
    out.extend_from_slice(&0x9003u16.to_be_bytes());
    out.extend_from_slice(&2u16.to_be_bytes());
    out.extend_from_slice(&(value.len() as u32).to_be_bytes());
    out.extend_from_slice(&value_at.to_be_bytes());
    out.extend_from_slice(&0u32.to_be_bytes());
    out.extend_from_slice(&value);
    out
}

/// JPEG with an APP1 Exif segment holding `tiff`
pub fn jpeg_with_exif(tiff: &[u8]) -> Vec<u8> {
    let mut out = vec![0xFF, 0xD8, 0xFF, 0xE1];
    out.extend_from_slice(&((2 + 6 + tiff.len()) as u16).to_be_bytes());
    out.extend_from_slice(b"Exif\0\0");
    out.extend_from_slice(tiff);
    out.extend_from_slice(&[0xFF, 0xD9]);
    out
}

/// Write `contents` to `root/relative`, creating parents
pub fn put(root: &Path, relative: &str, contents: &[u8]) -> PathBuf {
    let path = root.join(relative);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(&path, contents).unwrap();
    path
}

/// A RAW source that is a bare TIFF with the given capture time
pub fn raw_taken_at(root: &Path, relative: &str, original: &str) -> PathBuf {
    put(root, relative, &tiff_with_capture_time(original))
}

/// A JPEG derivative with the given capture time
pub fn jpeg_taken_at(root: &Path, relative: &str, original: &str) -> PathBuf {
    put(root, relative, &jpeg_with_exif(&tiff_with_capture_time(original)))
}

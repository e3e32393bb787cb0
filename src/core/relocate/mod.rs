//! # Relocate Module
//!
//! Moves matched derivatives into an output tree that mirrors the source
//! layout. A derivative of `<source_root>/A/B/IMG_1.CR2` named
//! `IMG_1_edit.jpg` lands at `<output_root>/A/B/IMG_1_edit.jpg`; it keeps
//! its own file name.
//!
//! Failures are per file: they are logged and counted, and the batch
//! carries on. Existing targets are never overwritten.

use crate::core::matcher::MatchResult;
use crate::error::RelocateError;
use crate::events::{EventSender, PipelinePhase};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Aggregate outcome of a relocation batch
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelocationReport {
    /// Files moved in this batch
    pub moved: usize,
    /// Files that could not be moved
    pub failed: usize,
    /// Unmatched derivatives plus ones already sitting at their target
    pub skipped: usize,
    /// Directories created under the output root
    pub folders_created: usize,
    /// One message per failure
    pub errors: Vec<String>,
}

/// What happened to one match
#[derive(Debug)]
pub enum RelocationOutcome {
    Moved { to: PathBuf },
    /// The derivative is gone and its target exists: an earlier run moved it
    AlreadyRelocated { to: PathBuf },
    Unmatched,
}

/// Target path for a derivative of `source`
pub fn destination_for(
    source: &Path,
    derivative_name: &str,
    source_root: &Path,
    output_root: &Path,
) -> Result<PathBuf, RelocateError> {
    let relative = source
        .strip_prefix(source_root)
        .map_err(|_| RelocateError::OutsideRoot {
            path: source.to_path_buf(),
        })?;
    let relative_dir = relative.parent().unwrap_or_else(|| Path::new(""));
    Ok(output_root.join(relative_dir).join(derivative_name))
}

/// Moves matched derivatives, one at a time
pub struct Relocator<'a> {
    source_root: &'a Path,
    output_root: &'a Path,
    dry_run: bool,
    created_dirs: HashSet<PathBuf>,
}

impl<'a> Relocator<'a> {
    pub fn new(source_root: &'a Path, output_root: &'a Path) -> Self {
        Self {
            source_root,
            output_root,
            dry_run: false,
            created_dirs: HashSet::new(),
        }
    }

    /// Compute targets and counts without touching the filesystem
    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Relocate every matched result, reporting progress per file
    pub fn relocate(&mut self, results: &[MatchResult], events: &EventSender) -> RelocationReport {
        let mut report = RelocationReport::default();
        let total = results.len();

        for (i, result) in results.iter().enumerate() {
            match self.relocate_one(result) {
                Ok(RelocationOutcome::Moved { to }) => {
                    report.moved += 1;
                    tracing::debug!("moved {} -> {}", result.derivative.path.display(), to.display());
                }
                Ok(RelocationOutcome::AlreadyRelocated { to }) => {
                    report.skipped += 1;
                    tracing::debug!("{} already at {}", result.derivative.file_name, to.display());
                }
                Ok(RelocationOutcome::Unmatched) => report.skipped += 1,
                Err(e) => {
                    report.failed += 1;
                    events.warn(e.to_string());
                    report.errors.push(e.to_string());
                }
            }
            events.progress(PipelinePhase::Relocating, i + 1, total);
        }

        report.folders_created = self.created_dirs.len();
        report
    }

    /// Relocate a single result
    pub fn relocate_one(&mut self, result: &MatchResult) -> Result<RelocationOutcome, RelocateError> {
        let Some(source) = result.matched_source.as_ref() else {
            return Ok(RelocationOutcome::Unmatched);
        };

        let from = &result.derivative.path;
        let to = destination_for(
            &source.path,
            &result.derivative.file_name,
            self.source_root,
            self.output_root,
        )?;

        if *from == to {
            return Ok(RelocationOutcome::AlreadyRelocated { to });
        }

        if !from.exists() {
            return if to.exists() {
                Ok(RelocationOutcome::AlreadyRelocated { to })
            } else {
                Err(RelocateError::SourceMissing { path: from.clone() })
            };
        }

        if to.exists() {
            return Err(RelocateError::TargetExists { path: to });
        }

        if self.dry_run {
            return Ok(RelocationOutcome::Moved { to });
        }

        if let Some(parent) = to.parent() {
            if !parent.is_dir() {
                fs::create_dir_all(parent).map_err(|source| RelocateError::CreateDir {
                    path: parent.to_path_buf(),
                    source,
                })?;
                self.created_dirs.insert(parent.to_path_buf());
            }
        }

        move_file(from, &to).map_err(|source| RelocateError::Move {
            from: from.clone(),
            to: to.clone(),
            source,
        })?;

        Ok(RelocationOutcome::Moved { to })
    }
}

/// Rename, falling back to copy + verify + delete across filesystems.
///
/// Either the file ends up at `to` only, or it stays at `from` only.
fn move_file(from: &Path, to: &Path) -> io::Result<()> {
    match fs::rename(from, to) {
        Ok(()) => Ok(()),
        Err(e) if is_cross_device(&e) => copy_then_remove(from, to),
        Err(e) => Err(e),
    }
}

/// `EXDEV`: rename cannot cross mount points
fn is_cross_device(error: &io::Error) -> bool {
    const EXDEV: i32 = 18;
    error.kind() == io::ErrorKind::CrossesDevices || error.raw_os_error() == Some(EXDEV)
}

fn copy_then_remove(from: &Path, to: &Path) -> io::Result<()> {
    let source_size = fs::metadata(from)?.len();
    fs::copy(from, to)?;

    let dest_size = fs::metadata(to)?.len();
    if dest_size != source_size {
        // Incomplete copy: keep the original
        let _ = fs::remove_file(to);
        return Err(io::Error::other(format!(
            "copy verification failed: source {} bytes, dest {} bytes",
            source_size, dest_size
        )));
    }

    fs::remove_file(from).inspect_err(|_| {
        // The original could not go, so the copy must not stay
        let _ = fs::remove_file(to);
    })
}

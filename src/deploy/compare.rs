//! New/updated/unchanged classification by size and modification time.

use chrono::{DateTime, Local, TimeDelta, Utc};
use std::fs;
use std::io;
use std::path::Path;

use crate::deploy::error::DeployError;

/// Modification times this close are treated as equal.
pub const MTIME_TOLERANCE_SECS: i64 = 2;

/// Classification of a source file against its destination.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileStatus {
    New,
    Updated,
    Unchanged,
}

impl FileStatus {
    pub fn needs_copy(&self) -> bool {
        !matches!(self, FileStatus::Unchanged)
    }
}

/// Size and mtime of one file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileStamp {
    pub size: u64,
    pub modified: DateTime<Utc>,
}

impl FileStamp {
    pub fn new(size: u64, modified: DateTime<Utc>) -> Self {
        Self { size, modified }
    }

    pub fn from_metadata(metadata: &fs::Metadata) -> io::Result<Self> {
        Ok(Self {
            size: metadata.len(),
            modified: DateTime::<Utc>::from(metadata.modified()?),
        })
    }

    /// Read the stamp of `path`, following symlinks.
    pub fn read(path: &Path) -> Result<Self, DeployError> {
        fs::metadata(path)
            .and_then(|m| Self::from_metadata(&m))
            .map_err(|e| DeployError::metadata(path, e))
    }

    /// Human-readable size and local mtime, used as record detail.
    pub fn describe(&self) -> String {
        format!(
            "{}, modified {}",
            humansize::format_size(self.size, humansize::BINARY),
            self.modified.with_timezone(&Local).format("%Y-%m-%d %H:%M:%S")
        )
    }
}

/// Decides whether a source file has to be transferred.
#[derive(Debug, Clone, Copy)]
pub struct FileComparator {
    tolerance: TimeDelta,
}

impl Default for FileComparator {
    fn default() -> Self {
        Self::new()
    }
}

impl FileComparator {
    pub fn new() -> Self {
        Self {
            tolerance: TimeDelta::seconds(MTIME_TOLERANCE_SECS),
        }
    }

    /// Pure classification of two stamps.
    pub fn classify_stamps(&self, source: &FileStamp, dest: Option<&FileStamp>) -> FileStatus {
        let Some(dest) = dest else {
            return FileStatus::New;
        };

        let drift = if source.modified >= dest.modified {
            source.modified - dest.modified
        } else {
            dest.modified - source.modified
        };

        if source.size == dest.size && drift <= self.tolerance {
            FileStatus::Unchanged
        } else {
            FileStatus::Updated
        }
    }

    /// Classify `source` against `dest` on disk.
    ///
    /// A missing destination is `New`; any other metadata failure on either
    /// side is returned as [`DeployError::Metadata`].
    pub fn classify(&self, source: &Path, dest: &Path) -> Result<(FileStatus, FileStamp), DeployError> {
        let source_stamp = FileStamp::read(source)?;

        let dest_stamp = match fs::metadata(dest) {
            Ok(metadata) => {
                Some(FileStamp::from_metadata(&metadata).map_err(|e| DeployError::metadata(dest, e))?)
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => None,
            Err(e) => return Err(DeployError::metadata(dest, e)),
        };

        Ok((self.classify_stamps(&source_stamp, dest_stamp.as_ref()), source_stamp))
    }
}

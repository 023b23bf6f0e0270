//! Recursive merge of a source tree into a destination tree.
//!
//! Files are copied when new or changed, left alone when identical, and
//! deny-listed entries are never read, copied or recursed into. Nothing is
//! removed from the destination.

use filetime::FileTime;
use std::fs::{self, File};
use std::io;
use std::path::Path;
use std::time::SystemTime;

use crate::deploy::compare::{FileComparator, FileStamp, FileStatus};
use crate::deploy::context::TraversalContext;
use crate::deploy::error::DeployError;
use crate::deploy::exclude::ExclusionFilter;
use crate::deploy::report::OperationKind;

/// Detail attached to records of deny-listed entries.
pub const EXCLUDED_DETAIL: &str = "skipped — excluded by deny-list";

/// Detail attached to records of unchanged files.
pub const IDENTICAL_DETAIL: &str = "identical";

/// Merges source trees into destination trees, one record per entry.
#[derive(Debug, Clone)]
pub struct TreeMerger<'f> {
    comparator: FileComparator,
    filter: &'f ExclusionFilter,
    dry_run: bool,
    verify: bool,
}

impl<'f> TreeMerger<'f> {
    pub fn new(filter: &'f ExclusionFilter) -> Self {
        Self {
            comparator: FileComparator::new(),
            filter,
            dry_run: false,
            verify: false,
        }
    }

    /// Classify and record without writing anything.
    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Hash-check every copied file against its source.
    pub fn with_verify(mut self, verify: bool) -> Self {
        self.verify = verify;
        self
    }

    pub fn filter(&self) -> &ExclusionFilter {
        self.filter
    }

    /// Merge `source_dir` into `dest_dir`.
    ///
    /// `relative` is the path of `source_dir` inside its project and prefixes
    /// every record path. The first failure aborts the merge.
    pub fn merge(
        &self,
        source_dir: &Path,
        dest_dir: &Path,
        relative: &str,
        ctx: &mut TraversalContext<'_>,
    ) -> Result<(), DeployError> {
        self.ensure_dir(dest_dir)?;

        let read_dir =
            fs::read_dir(source_dir).map_err(|e| DeployError::scan(source_dir, "read directory", e))?;

        for entry in read_dir {
            let entry = entry.map_err(|e| DeployError::scan(source_dir, "read directory", e))?;
            let name = entry.file_name();
            let rel = join_relative(relative, &name.to_string_lossy());

            if self.filter.is_excluded_os(&name) {
                ctx.record(&rel, OperationKind::Deleted, EXCLUDED_DETAIL);
                continue;
            }

            let source_path = entry.path();
            let dest_path = dest_dir.join(&name);
            let metadata = fs::metadata(&source_path).map_err(|e| DeployError::metadata(&source_path, e))?;

            if metadata.is_dir() {
                self.merge(&source_path, &dest_path, &rel, ctx)?;
            } else {
                self.sync_file(&source_path, &dest_path, &rel, ctx)?;
            }
        }

        Ok(())
    }

    /// Compare one file, copy it if needed, record the decision and tick.
    pub fn sync_file(
        &self,
        source: &Path,
        dest: &Path,
        relative: &str,
        ctx: &mut TraversalContext<'_>,
    ) -> Result<FileStatus, DeployError> {
        let (status, stamp) = self.comparator.classify(source, dest)?;

        let kind = match status {
            FileStatus::New => OperationKind::New,
            FileStatus::Updated => OperationKind::Updated,
            FileStatus::Unchanged => OperationKind::Skipped,
        };

        if status.needs_copy() {
            if !self.dry_run {
                self.copy_file(source, dest, &stamp)?;
            }
            let mut detail = stamp.describe();
            if self.dry_run {
                detail.push_str(" (dry run)");
            }
            ctx.record(relative, kind, detail);
        } else {
            ctx.record(relative, kind, IDENTICAL_DETAIL);
        }

        ctx.tick();
        Ok(status)
    }

    /// Create `dir` and its parents unless this is a dry run.
    pub fn ensure_dir(&self, dir: &Path) -> Result<(), DeployError> {
        if self.dry_run {
            return Ok(());
        }
        fs::create_dir_all(dir).map_err(|e| DeployError::scan(dir, "create directory", e))
    }

    /// Copy bytes, then carry the source mtime over so the next run sees the
    /// pair as unchanged.
    fn copy_file(&self, source: &Path, dest: &Path, stamp: &FileStamp) -> Result<(), DeployError> {
        fs::copy(source, dest).map_err(|e| DeployError::copy(source, dest, e))?;

        let mtime = FileTime::from_system_time(SystemTime::from(stamp.modified));
        filetime::set_file_mtime(dest, mtime).map_err(|e| DeployError::copy(source, dest, e))?;

        if self.verify {
            verify_copy(source, dest)?;
        }

        Ok(())
    }
}

/// Compare the BLAKE3 digests of a copied pair. Read failures on either
/// side belong to the copy step.
fn verify_copy(source: &Path, dest: &Path) -> Result<(), DeployError> {
    let expected = hash_file(source).map_err(|e| DeployError::copy(source, dest, e))?;
    let actual = hash_file(dest).map_err(|e| DeployError::copy(source, dest, e))?;
    if expected != actual {
        return Err(DeployError::Verification {
            path: dest.to_path_buf(),
            expected,
            actual,
        });
    }
    Ok(())
}

/// `parent/name`, or just `name` at the project root.
pub(crate) fn join_relative(parent: &str, name: &str) -> String {
    if parent.is_empty() {
        name.to_string()
    } else {
        format!("{}/{}", parent, name)
    }
}

fn hash_file(path: &Path) -> io::Result<String> {
    let mut file = File::open(path)?;
    let mut hasher = blake3::Hasher::new();
    io::copy(&mut file, &mut hasher)?;
    Ok(hasher.finalize().to_hex().to_string())
}

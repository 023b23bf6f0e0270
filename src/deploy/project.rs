//! Source entries and per-project synchronization.
//!
//! Every configured source (file or directory) is an independent project
//! published into `<target root>/<project name>`.

use log::Level;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::deploy::context::TraversalContext;
use crate::deploy::error::DeployError;
use crate::deploy::merge::{TreeMerger, EXCLUDED_DETAIL};
use crate::deploy::report::{OperationKind, StatsCounter};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    File,
    Directory,
}

/// One configured publish unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceEntry {
    pub path: PathBuf,
    pub kind: SourceKind,
}

impl SourceEntry {
    pub fn new(path: impl Into<PathBuf>, kind: SourceKind) -> Self {
        Self { path: path.into(), kind }
    }

    pub fn file(path: impl Into<PathBuf>) -> Self {
        Self::new(path, SourceKind::File)
    }

    pub fn directory(path: impl Into<PathBuf>) -> Self {
        Self::new(path, SourceKind::Directory)
    }

    /// Stat `path` to find out whether it is a file or a directory.
    pub fn resolve(path: impl Into<PathBuf>) -> Result<Self, DeployError> {
        let path = path.into();
        let metadata = fs::metadata(&path).map_err(|e| DeployError::metadata(&path, e))?;

        if metadata.is_dir() {
            Ok(Self::directory(path))
        } else if metadata.is_file() {
            Ok(Self::file(path))
        } else {
            Err(DeployError::InvalidSource {
                path,
                reason: "neither a regular file nor a directory".to_string(),
            })
        }
    }

    /// Base name without extension for files, base name for directories.
    pub fn project_name(&self) -> Result<String, DeployError> {
        let name = match self.kind {
            SourceKind::File => self.path.file_stem(),
            SourceKind::Directory => self.path.file_name(),
        };

        name.map(|n| n.to_string_lossy().into_owned())
            .filter(|n| !n.is_empty())
            .ok_or_else(|| DeployError::InvalidSource {
                path: self.path.clone(),
                reason: "no base name to derive a project name from".to_string(),
            })
    }

    pub fn file_name(&self) -> Option<String> {
        self.path.file_name().map(|n| n.to_string_lossy().into_owned())
    }
}

/// Publishes one source entry as a project under a target root.
pub struct ProjectSynchronizer<'m> {
    merger: &'m TreeMerger<'m>,
}

impl<'m> ProjectSynchronizer<'m> {
    pub fn new(merger: &'m TreeMerger<'m>) -> Self {
        Self { merger }
    }

    /// Sync `entry` into `target_root/<project>`.
    ///
    /// Records land in the context's report as they are made; the returned
    /// counter covers only the records produced by this call.
    pub fn sync(
        &self,
        entry: &SourceEntry,
        target_root: &Path,
        ctx: &mut TraversalContext<'_>,
    ) -> Result<StatsCounter, DeployError> {
        let project = entry.project_name()?;
        ctx.enter_project(&project);
        let before = ctx.project_report().map(|p| p.stats).unwrap_or_default();

        let project_root = target_root.join(&project);
        self.merger.ensure_dir(&project_root)?;

        ctx.log(
            Level::Info,
            &format!("Syncing project {} from {}", project, entry.path.display()),
        );

        match entry.kind {
            SourceKind::File => {
                let file_name = entry.file_name().ok_or_else(|| DeployError::InvalidSource {
                    path: entry.path.clone(),
                    reason: "file source has no file name".to_string(),
                })?;

                if self.merger.filter().is_excluded(&file_name) {
                    ctx.record(&file_name, OperationKind::Deleted, EXCLUDED_DETAIL);
                } else {
                    self.merger
                        .sync_file(&entry.path, &project_root.join(&file_name), &file_name, ctx)?;
                }
            }
            SourceKind::Directory => {
                self.merger.merge(&entry.path, &project_root, "", ctx)?;
            }
        }

        let after = ctx.project_report().map(|p| p.stats).unwrap_or_default();
        let delta = StatsCounter {
            new: after.new - before.new,
            updated: after.updated - before.updated,
            skipped: after.skipped - before.skipped,
            deleted: after.deleted - before.deleted,
        };

        ctx.log(Level::Info, &format!("Project {} done ({})", project, delta));
        Ok(delta)
    }
}

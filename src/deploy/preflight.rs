//! Read-only check for deny-listed entries present in the sources.
//!
//! Lists what a deployment will keep off the targets, so operators can see
//! ahead of time that e.g. a local `web.config` is never going to be
//! published over the server's copy.

use std::fs;
use std::path::{Path, PathBuf};

use crate::deploy::error::DeployError;
use crate::deploy::exclude::ExclusionFilter;
use crate::deploy::merge::join_relative;
use crate::deploy::project::{SourceEntry, SourceKind};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HitKind {
    File { size: u64 },
    Directory,
}

/// One deny-listed entry found in a source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExclusionHit {
    /// Base name that matched.
    pub name: String,
    /// Configured source the entry lives in.
    pub source: PathBuf,
    /// Path inside the source, `/`-separated.
    pub relative_path: String,
    pub kind: HitKind,
}

/// Find every deny-listed entry in `sources`, without descending into them.
pub fn scan(sources: &[SourceEntry], filter: &ExclusionFilter) -> Result<Vec<ExclusionHit>, DeployError> {
    let mut hits = Vec::new();

    for source in sources {
        match source.kind {
            SourceKind::File => {
                let Some(name) = source.file_name() else { continue };
                if filter.is_excluded(&name) {
                    let size = fs::metadata(&source.path)
                        .map_err(|e| DeployError::metadata(&source.path, e))?
                        .len();
                    hits.push(ExclusionHit {
                        relative_path: name.clone(),
                        name,
                        source: source.path.clone(),
                        kind: HitKind::File { size },
                    });
                }
            }
            SourceKind::Directory => scan_dir(&source.path, &source.path, "", filter, &mut hits)?,
        }
    }

    Ok(hits)
}

fn scan_dir(
    source: &Path,
    dir: &Path,
    relative: &str,
    filter: &ExclusionFilter,
    hits: &mut Vec<ExclusionHit>,
) -> Result<(), DeployError> {
    let read_dir = fs::read_dir(dir).map_err(|e| DeployError::scan(dir, "read directory", e))?;

    for entry in read_dir {
        let entry = entry.map_err(|e| DeployError::scan(dir, "read directory", e))?;
        let name = entry.file_name().to_string_lossy().into_owned();
        let rel = join_relative(relative, &name);
        let path = entry.path();
        let metadata = fs::metadata(&path).map_err(|e| DeployError::metadata(&path, e))?;

        if filter.is_excluded(&name) {
            let kind = if metadata.is_dir() {
                HitKind::Directory
            } else {
                HitKind::File { size: metadata.len() }
            };
            hits.push(ExclusionHit {
                name,
                source: source.to_path_buf(),
                relative_path: rel,
                kind,
            });
        } else if metadata.is_dir() {
            scan_dir(source, &path, &rel, filter, hits)?;
        }
    }

    Ok(())
}

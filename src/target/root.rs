//! Remote root descriptors.
//!
//! A target's remote root is one of `/srv/www/site` (POSIX),
//! `\\host\share\sub\dir` (UNC share) or `C:\inetpub\wwwroot` (drive path).
//! Parsing splits it into a mountable root and the subpath beneath it.

use std::fmt;
use std::path::PathBuf;

use crate::deploy::error::DeployError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoteRoot {
    Posix { segments: Vec<String> },
    Unc { host: String, share: String, subpath: Vec<String> },
    Drive { letter: char, subpath: Vec<String> },
}

impl RemoteRoot {
    pub fn parse(raw: &str) -> Result<Self, DeployError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(DeployError::path_format(raw, "empty path"));
        }

        if trimmed.starts_with("\\\\") || trimmed.starts_with("//") {
            let mut parts = split_segments(raw, &trimmed[2..])?.into_iter();
            let host = parts
                .next()
                .ok_or_else(|| DeployError::path_format(raw, "UNC path is missing a host"))?;
            let share = parts
                .next()
                .ok_or_else(|| DeployError::path_format(raw, "UNC path is missing a share name"))?;
            return Ok(RemoteRoot::Unc {
                host,
                share,
                subpath: parts.collect(),
            });
        }

        let mut chars = trimmed.chars();
        if let (Some(letter), Some(':')) = (chars.next(), chars.next()) {
            if !letter.is_ascii_alphabetic() {
                return Err(DeployError::path_format(raw, "invalid drive letter"));
            }
            let rest = &trimmed[2..];
            if !rest.is_empty() && !rest.starts_with(['\\', '/']) {
                return Err(DeployError::path_format(raw, "drive-relative paths are not supported"));
            }
            return Ok(RemoteRoot::Drive {
                letter: letter.to_ascii_uppercase(),
                subpath: split_segments(raw, rest)?,
            });
        }

        if trimmed.starts_with('/') {
            return Ok(RemoteRoot::Posix {
                segments: split_segments(raw, trimmed)?,
            });
        }

        Err(DeployError::path_format(raw, "path must be absolute"))
    }

    /// Segments below the mountable root.
    pub fn subpath(&self) -> &[String] {
        match self {
            RemoteRoot::Posix { segments } => segments,
            RemoteRoot::Unc { subpath, .. } | RemoteRoot::Drive { subpath, .. } => subpath,
        }
    }

    /// Whether the root only makes sense through a local mount point.
    pub fn requires_mount(&self) -> bool {
        !matches!(self, RemoteRoot::Posix { .. })
    }

    /// Join the subpath onto a local base directory.
    pub fn resolve_under(&self, base: impl Into<PathBuf>) -> PathBuf {
        let mut path = base.into();
        for segment in self.subpath() {
            path.push(segment);
        }
        path
    }

    /// The POSIX path itself, if this is a POSIX root.
    pub fn as_posix_path(&self) -> Option<PathBuf> {
        match self {
            RemoteRoot::Posix { .. } => Some(self.resolve_under("/")),
            _ => None,
        }
    }
}

impl fmt::Display for RemoteRoot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RemoteRoot::Posix { segments } => write!(f, "/{}", segments.join("/")),
            RemoteRoot::Unc { host, share, subpath } => {
                write!(f, "\\\\{}\\{}", host, share)?;
                for segment in subpath {
                    write!(f, "\\{}", segment)?;
                }
                Ok(())
            }
            RemoteRoot::Drive { letter, subpath } => write!(f, "{}:\\{}", letter, subpath.join("\\")),
        }
    }
}

/// Split on either separator, dropping empty and `.` segments.
fn split_segments(raw: &str, path: &str) -> Result<Vec<String>, DeployError> {
    let mut segments = Vec::new();
    for segment in path.split(['\\', '/']) {
        match segment.trim() {
            "" | "." => continue,
            ".." => return Err(DeployError::path_format(raw, "parent directory segments are not allowed")),
            s => segments.push(s.to_string()),
        }
    }
    Ok(segments)
}

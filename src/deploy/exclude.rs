//! Deny-list filtering for deployments.
//!
//! An entry is excluded when its base name is in the deny-list, or when it
//! matches one of the optional glob patterns. Exclusion applies at every
//! depth, to files and directories alike.

use anyhow::Result;
use globset::{Glob, GlobSet, GlobSetBuilder};
use std::collections::BTreeSet;
use std::ffi::OsStr;
use std::path::Path;

/// Immutable deny-list for one deployment run.
#[derive(Debug, Clone)]
pub struct ExclusionFilter {
    /// Exact base names.
    names: BTreeSet<String>,
    /// Compiled glob set matched against base names.
    glob_set: GlobSet,
    /// Raw pattern strings (for display).
    patterns: Vec<String>,
}

impl Default for ExclusionFilter {
    fn default() -> Self {
        Self::new()
    }
}

impl ExclusionFilter {
    /// Create a filter that excludes nothing.
    pub fn new() -> Self {
        Self {
            names: BTreeSet::new(),
            glob_set: GlobSet::empty(),
            patterns: Vec::new(),
        }
    }

    /// Create from exact base names.
    pub fn from_names<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            names: names
                .into_iter()
                .map(Into::<String>::into)
                .filter(|n| !n.trim().is_empty())
                .collect(),
            ..Self::new()
        }
    }

    /// Extend the filter with glob patterns matched against base names.
    pub fn with_patterns<S: AsRef<str>>(mut self, patterns: &[S]) -> Result<Self> {
        let mut builder = GlobSetBuilder::new();
        let mut pattern_list = Vec::new();

        for pattern in patterns {
            let pattern = pattern.as_ref();
            builder.add(Glob::new(pattern)?);
            pattern_list.push(pattern.to_string());
        }

        self.glob_set = builder.build()?;
        self.patterns = pattern_list;
        Ok(self)
    }

    /// Check whether an entry with this base name must be skipped.
    pub fn is_excluded(&self, base_name: &str) -> bool {
        if self.names.contains(base_name) {
            return true;
        }
        !self.patterns.is_empty() && self.glob_set.is_match(base_name)
    }

    /// Check an OS-level file name, e.g. from `DirEntry::file_name`.
    pub fn is_excluded_os(&self, base_name: &OsStr) -> bool {
        self.is_excluded(base_name.to_string_lossy().as_ref())
    }

    /// Check the last component of `path`.
    pub fn is_excluded_path(&self, path: &Path) -> bool {
        path.file_name().is_some_and(|name| self.is_excluded_os(name))
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.names.iter().map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty() && self.patterns.is_empty()
    }
}

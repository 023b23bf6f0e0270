//! Progress accounting for deployment runs.

use std::fs;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::deploy::error::DeployError;
use crate::deploy::exclude::ExclusionFilter;
use crate::deploy::project::{SourceEntry, SourceKind};
use crate::deploy::sink::{NullSink, ProgressSink};

/// Point-in-time view of a tracker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProgressSnapshot {
    pub completed: u64,
    pub total: u64,
}

impl ProgressSnapshot {
    /// Progress as a ratio (0.0 - 1.0).
    pub fn ratio(&self) -> f32 {
        if self.total == 0 {
            return 0.0;
        }
        (self.completed as f32 / self.total as f32).min(1.0)
    }
}

/// Counts completed file decisions against an up-front total.
///
/// Written from the worker, read from any thread.
pub struct ProgressTracker {
    completed: AtomicU64,
    total: AtomicU64,
    sink: Arc<dyn ProgressSink>,
}

impl Default for ProgressTracker {
    fn default() -> Self {
        Self::new(Arc::new(NullSink))
    }
}

impl ProgressTracker {
    pub fn new(sink: Arc<dyn ProgressSink>) -> Self {
        Self {
            completed: AtomicU64::new(0),
            total: AtomicU64::new(0),
            sink,
        }
    }

    /// Reset the counter and publish `0 / total`.
    pub fn start(&self, total: u64) {
        self.total.store(total, Ordering::SeqCst);
        self.completed.store(0, Ordering::SeqCst);
        self.sink.on_progress(0, total);
    }

    /// Record one finished file and publish the new count.
    pub fn tick(&self) -> u64 {
        let completed = self.completed.fetch_add(1, Ordering::SeqCst) + 1;
        self.sink.on_progress(completed, self.total.load(Ordering::SeqCst));
        completed
    }

    pub fn snapshot(&self) -> ProgressSnapshot {
        ProgressSnapshot {
            completed: self.completed.load(Ordering::SeqCst),
            total: self.total.load(Ordering::SeqCst),
        }
    }
}

/// Number of files one target will see for `sources`, excluded entries
/// (and everything beneath excluded directories) not counted.
pub fn count_expected(sources: &[SourceEntry], filter: &ExclusionFilter) -> Result<u64, DeployError> {
    let mut total = 0;
    for source in sources {
        total += match source.kind {
            SourceKind::File => u64::from(!filter.is_excluded_path(&source.path)),
            SourceKind::Directory => count_dir(&source.path, filter)?,
        };
    }
    Ok(total)
}

fn count_dir(dir: &Path, filter: &ExclusionFilter) -> Result<u64, DeployError> {
    let read_dir = fs::read_dir(dir).map_err(|e| DeployError::scan(dir, "read directory", e))?;

    let mut count = 0;
    for entry in read_dir {
        let entry = entry.map_err(|e| DeployError::scan(dir, "read directory", e))?;
        if filter.is_excluded_os(&entry.file_name()) {
            continue;
        }

        let path = entry.path();
        let metadata = fs::metadata(&path).map_err(|e| DeployError::metadata(&path, e))?;
        if metadata.is_dir() {
            count += count_dir(&path, filter)?;
        } else {
            count += 1;
        }
    }
    Ok(count)
}

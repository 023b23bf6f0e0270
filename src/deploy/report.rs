//! Deployment report model.
//!
//! Records are appended through [`DeploymentReport::record`], which bumps the
//! project, target and global counters in the same step so the counters
//! always equal the per-kind record counts.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Outcome of one file-level decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OperationKind {
    New,
    Updated,
    Skipped,
    /// Also used for deny-listed entries that never reach the target.
    Deleted,
}

impl OperationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            OperationKind::New => "new",
            OperationKind::Updated => "updated",
            OperationKind::Skipped => "skipped",
            OperationKind::Deleted => "deleted",
        }
    }
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One immutable record per encountered entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileOperationRecord {
    /// Path relative to the project root, `/`-separated.
    pub path: String,
    pub kind: OperationKind,
    pub detail: String,
    pub timestamp: DateTime<Utc>,
}

impl FileOperationRecord {
    pub fn new(path: impl Into<String>, kind: OperationKind, detail: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            kind,
            detail: detail.into(),
            timestamp: Utc::now(),
        }
    }
}

/// Per-kind counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatsCounter {
    pub new: u64,
    pub updated: u64,
    pub skipped: u64,
    pub deleted: u64,
}

impl StatsCounter {
    pub fn add(&mut self, kind: OperationKind) {
        match kind {
            OperationKind::New => self.new += 1,
            OperationKind::Updated => self.updated += 1,
            OperationKind::Skipped => self.skipped += 1,
            OperationKind::Deleted => self.deleted += 1,
        }
    }

    pub fn merge(&mut self, other: &StatsCounter) {
        self.new += other.new;
        self.updated += other.updated;
        self.skipped += other.skipped;
        self.deleted += other.deleted;
    }

    pub fn total(&self) -> u64 {
        self.new + self.updated + self.skipped + self.deleted
    }

    pub fn count_of(&self, kind: OperationKind) -> u64 {
        match kind {
            OperationKind::New => self.new,
            OperationKind::Updated => self.updated,
            OperationKind::Skipped => self.skipped,
            OperationKind::Deleted => self.deleted,
        }
    }

    fn from_records<'a>(records: impl IntoIterator<Item = &'a FileOperationRecord>) -> Self {
        let mut stats = StatsCounter::default();
        for record in records {
            stats.add(record.kind);
        }
        stats
    }
}

impl fmt::Display for StatsCounter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "new: {}, updated: {}, skipped: {}, deleted: {}",
            self.new, self.updated, self.skipped, self.deleted
        )
    }
}

/// Records of one project in traversal order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectReport {
    pub records: Vec<FileOperationRecord>,
    pub stats: StatsCounter,
}

impl ProjectReport {
    fn push(&mut self, record: FileOperationRecord) {
        self.stats.add(record.kind);
        self.records.push(record);
    }

    /// Records of the given kind, in traversal order.
    pub fn records_of(&self, kind: OperationKind) -> impl Iterator<Item = &FileOperationRecord> {
        self.records.iter().filter(move |r| r.kind == kind)
    }

    pub fn find(&self, path: &str) -> Option<&FileOperationRecord> {
        self.records.iter().find(|r| r.path == path)
    }
}

/// Per-target report keyed by project name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetReport {
    pub projects: BTreeMap<String, ProjectReport>,
    pub stats: StatsCounter,
    /// Set when the target failed under the continue-on-error policy.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl TargetReport {
    pub fn project(&self, name: &str) -> Option<&ProjectReport> {
        self.projects.get(name)
    }

    pub fn record_count(&self) -> usize {
        self.projects.values().map(|p| p.records.len()).sum()
    }
}

/// Root aggregate of one deployment run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeploymentReport {
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
    pub targets: BTreeMap<String, TargetReport>,
    pub stats: StatsCounter,
}

impl DeploymentReport {
    /// Create an empty report stamped with the current time.
    pub fn start() -> Self {
        Self {
            start_time: Utc::now(),
            end_time: None,
            targets: BTreeMap::new(),
            stats: StatsCounter::default(),
        }
    }

    pub fn finish(&mut self) {
        self.end_time = Some(Utc::now());
    }

    pub fn begin_target(&mut self, target: &str) -> &mut TargetReport {
        self.targets.entry(target.to_string()).or_default()
    }

    pub fn begin_project(&mut self, target: &str, project: &str) {
        self.begin_target(target)
            .projects
            .entry(project.to_string())
            .or_default();
    }

    /// Append a record and update all three counter levels.
    pub fn record(&mut self, target: &str, project: &str, record: FileOperationRecord) {
        let kind = record.kind;
        let target_report = self.begin_target(target);
        target_report
            .projects
            .entry(project.to_string())
            .or_default()
            .push(record);
        target_report.stats.add(kind);
        self.stats.add(kind);
    }

    pub fn mark_target_failed(&mut self, target: &str, message: impl Into<String>) {
        self.begin_target(target).error = Some(message.into());
    }

    pub fn target(&self, target: &str) -> Option<&TargetReport> {
        self.targets.get(target)
    }

    pub fn record_count(&self) -> usize {
        self.targets.values().map(TargetReport::record_count).sum()
    }

    pub fn duration(&self) -> Option<chrono::Duration> {
        self.end_time.map(|end| end - self.start_time)
    }

    /// Every counter equals the record count by kind beneath it.
    pub fn is_consistent(&self) -> bool {
        let mut global = StatsCounter::default();
        for target in self.targets.values() {
            let mut target_sum = StatsCounter::default();
            for project in target.projects.values() {
                if project.stats != StatsCounter::from_records(&project.records) {
                    return false;
                }
                target_sum.merge(&project.stats);
            }
            if target_sum != target.stats {
                return false;
            }
            global.merge(&target.stats);
        }
        global == self.stats
    }
}

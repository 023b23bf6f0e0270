//! Deployment history: one pretty-printed JSON file per run.

use anyhow::{Context, Result};
use chrono::{DateTime, Local, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::deploy::{DeploymentReport, RunOutcome, StatsCounter};

const FILE_PREFIX: &str = "deploy_";

/// What gets persisted for one run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub status: RunOutcome,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub report: DeploymentReport,
}

/// Listing row for one stored run.
#[derive(Debug, Clone)]
pub struct HistorySummary {
    pub path: PathBuf,
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
    pub status: RunOutcome,
    pub stats: StatsCounter,
    pub targets: usize,
}

pub struct HistoryStore {
    dir: PathBuf,
}

impl HistoryStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Persist a finished (or failed) run; returns the file written.
    pub fn save(&self, report: &DeploymentReport, status: RunOutcome, error: Option<&str>) -> Result<PathBuf> {
        fs::create_dir_all(&self.dir)
            .with_context(|| format!("Failed to create history directory: {}", self.dir.display()))?;

        let stem = format!(
            "{}{}",
            FILE_PREFIX,
            report.start_time.with_timezone(&Local).format("%Y%m%d_%H%M%S")
        );
        let mut path = self.dir.join(format!("{}.json", stem));
        let mut n = 1;
        while path.exists() {
            path = self.dir.join(format!("{}_{}.json", stem, n));
            n += 1;
        }

        let entry = HistoryEntry {
            status,
            error: error.map(str::to_string),
            report: report.clone(),
        };
        let json = serde_json::to_string_pretty(&entry)?;
        fs::write(&path, json).with_context(|| format!("Failed to write history: {}", path.display()))?;
        Ok(path)
    }

    pub fn load(&self, path: &Path) -> Result<HistoryEntry> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read history: {}", path.display()))?;
        serde_json::from_str(&content).with_context(|| format!("Failed to parse history: {}", path.display()))
    }

    /// All stored runs, newest first. Unreadable files are skipped.
    pub fn list(&self) -> Result<Vec<HistorySummary>> {
        if !self.dir.exists() {
            return Ok(Vec::new());
        }

        let mut summaries = Vec::new();
        for entry in fs::read_dir(&self.dir)
            .with_context(|| format!("Failed to read history directory: {}", self.dir.display()))?
        {
            let path = entry?.path();
            let is_history = path.extension().is_some_and(|e| e == "json")
                && path
                    .file_name()
                    .is_some_and(|n| n.to_string_lossy().starts_with(FILE_PREFIX));
            if !is_history {
                continue;
            }

            match self.load(&path) {
                Ok(entry) => summaries.push(HistorySummary {
                    start_time: entry.report.start_time,
                    end_time: entry.report.end_time,
                    status: entry.status,
                    stats: entry.report.stats,
                    targets: entry.report.targets.len(),
                    path,
                }),
                Err(e) => log::warn!("Ignoring history file: {:#}", e),
            }
        }

        summaries.sort_by(|a, b| b.start_time.cmp(&a.start_time));
        Ok(summaries)
    }
}

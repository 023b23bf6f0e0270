//! Error taxonomy for deployment runs.
//!
//! Every per-file and per-target failure propagates up to the orchestrator,
//! which hands it back together with the partial report.

use serde::{Deserialize, Serialize};
use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::deploy::report::DeploymentReport;

/// Errors raised by the deployment engine.
#[derive(Debug, Error)]
pub enum DeployError {
    /// Size/mtime could not be read for a source or destination file.
    #[error("failed to read metadata of {}: {source}", .path.display())]
    Metadata {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Directory enumeration or creation failed.
    #[error("failed to {operation} {}: {source}", .path.display())]
    Scan {
        path: PathBuf,
        operation: &'static str,
        #[source]
        source: io::Error,
    },

    /// Byte copy (or mtime transfer) failed.
    #[error("failed to copy {} to {}: {source}", .from.display(), .to.display())]
    Copy {
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Copied content does not hash to the source content.
    #[error("verification failed for {}: source {expected}, destination {actual}", .path.display())]
    Verification {
        path: PathBuf,
        expected: String,
        actual: String,
    },

    /// The connection provider could not open the target.
    #[error("connection to {target} failed: {reason}")]
    Connection { target: String, reason: String },

    /// A remote root descriptor that cannot be split into root and subpath.
    #[error("malformed remote root {root:?}: {reason}")]
    PathFormat { root: String, reason: String },

    /// A source path no project name can be derived from.
    #[error("invalid source {}: {reason}", .path.display())]
    InvalidSource { path: PathBuf, reason: String },
}

impl DeployError {
    pub fn metadata(path: impl Into<PathBuf>, source: io::Error) -> Self {
        DeployError::Metadata { path: path.into(), source }
    }

    pub fn scan(path: impl Into<PathBuf>, operation: &'static str, source: io::Error) -> Self {
        DeployError::Scan { path: path.into(), operation, source }
    }

    pub fn copy(from: impl Into<PathBuf>, to: impl Into<PathBuf>, source: io::Error) -> Self {
        DeployError::Copy { from: from.into(), to: to.into(), source }
    }

    pub fn connection(target: impl Into<String>, reason: impl Into<String>) -> Self {
        DeployError::Connection { target: target.into(), reason: reason.into() }
    }

    pub fn path_format(root: impl Into<String>, reason: impl Into<String>) -> Self {
        DeployError::PathFormat { root: root.into(), reason: reason.into() }
    }
}

/// How far a run got, for operators assessing blast radius.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunOutcome {
    Succeeded,
    FailedWithPartialReport,
    FailedBeforeAnyFile,
}

impl RunOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            RunOutcome::Succeeded => "succeeded",
            RunOutcome::FailedWithPartialReport => "failed_with_partial_report",
            RunOutcome::FailedBeforeAnyFile => "failed_before_any_file",
        }
    }
}

/// A failed run: the first fatal error plus everything recorded before it.
#[derive(Debug, Error)]
#[error("deployment failed: {error}")]
pub struct DeployFailure {
    #[source]
    pub error: DeployError,
    pub report: DeploymentReport,
}

impl DeployFailure {
    pub fn new(error: DeployError, report: DeploymentReport) -> Self {
        Self { error, report }
    }

    pub fn outcome(&self) -> RunOutcome {
        if self.report.record_count() == 0 {
            RunOutcome::FailedBeforeAnyFile
        } else {
            RunOutcome::FailedWithPartialReport
        }
    }
}

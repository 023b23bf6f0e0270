//! Per-target traversal state threaded through project and tree syncs.

use log::Level;

use crate::deploy::progress::ProgressTracker;
use crate::deploy::report::{DeploymentReport, FileOperationRecord, OperationKind, ProjectReport};
use crate::deploy::sink::LogSink;

/// Active target/project plus the report and observers records flow into.
pub struct TraversalContext<'a> {
    report: &'a mut DeploymentReport,
    target: &'a str,
    project: String,
    progress: &'a ProgressTracker,
    log: &'a dyn LogSink,
}

impl<'a> TraversalContext<'a> {
    pub fn new(
        report: &'a mut DeploymentReport,
        target: &'a str,
        progress: &'a ProgressTracker,
        log: &'a dyn LogSink,
    ) -> Self {
        report.begin_target(target);
        Self {
            report,
            target,
            project: String::new(),
            progress,
            log,
        }
    }

    /// Switch to `project`, creating its report if this is the first visit.
    pub fn enter_project(&mut self, project: &str) {
        self.project = project.to_string();
        self.report.begin_project(self.target, project);
    }

    pub fn project_report(&self) -> Option<&ProjectReport> {
        self.report.target(self.target)?.project(&self.project)
    }

    /// Append one record to the active project.
    pub fn record(&mut self, path: &str, kind: OperationKind, detail: impl Into<String>) {
        let record = FileOperationRecord::new(path, kind, detail);
        self.log.log(
            Level::Debug,
            &format!("[{}] {} {}: {}", self.project, record.kind, record.path, record.detail),
        );
        self.report.record(self.target, &self.project, record);
    }

    pub fn tick(&self) {
        self.progress.tick();
    }

    pub fn log(&self, level: Level, message: &str) {
        self.log.log(level, message);
    }
}

//! Runs a deployment across all configured targets.
//!
//! Targets are processed one after another in configured order, projects in
//! source order. Each target's connection is held by a [`ConnectionGuard`]
//! for exactly the time its projects are synced.

use log::Level;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;

use crate::deploy::context::TraversalContext;
use crate::deploy::error::{DeployError, DeployFailure};
use crate::deploy::exclude::ExclusionFilter;
use crate::deploy::merge::TreeMerger;
use crate::deploy::progress::{count_expected, ProgressTracker};
use crate::deploy::project::{ProjectSynchronizer, SourceEntry};
use crate::deploy::report::{DeploymentReport, StatsCounter};
use crate::deploy::sink::{LogCrateSink, LogSink, NullSink, ProgressSink};
use crate::target::{AccessMode, ConnectionGuard, ConnectionProvider, TargetDescriptor};

/// What to do with the remaining targets once one fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailurePolicy {
    /// Stop at the first failing target.
    #[default]
    FailFast,
    /// Record the failure on the target and carry on with the next one.
    Continue,
}

/// Run-wide switches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DeployOptions {
    pub dry_run: bool,
    pub verify: bool,
    pub failure_policy: FailurePolicy,
}

/// Drives one deployment run.
pub struct DeploymentOrchestrator {
    sources: Vec<SourceEntry>,
    filter: ExclusionFilter,
    provider: Arc<dyn ConnectionProvider>,
    progress: Arc<dyn ProgressSink>,
    log: Arc<dyn LogSink>,
    options: DeployOptions,
}

impl DeploymentOrchestrator {
    pub fn new(
        sources: Vec<SourceEntry>,
        filter: ExclusionFilter,
        provider: Arc<dyn ConnectionProvider>,
    ) -> Self {
        Self {
            sources,
            filter,
            provider,
            progress: Arc::new(NullSink),
            log: Arc::new(LogCrateSink),
            options: DeployOptions::default(),
        }
    }

    pub fn with_progress(mut self, sink: Arc<dyn ProgressSink>) -> Self {
        self.progress = sink;
        self
    }

    pub fn with_log(mut self, sink: Arc<dyn LogSink>) -> Self {
        self.log = sink;
        self
    }

    pub fn with_options(mut self, options: DeployOptions) -> Self {
        self.options = options;
        self
    }

    /// Deploy every source to every target.
    ///
    /// On failure the error comes back with the report accumulated so far,
    /// end time set.
    pub fn run(&self, targets: &[TargetDescriptor]) -> Result<DeploymentReport, DeployFailure> {
        let started = Instant::now();
        let mut report = DeploymentReport::start();
        let log = self.log.as_ref();

        log.log(
            Level::Info,
            &format!(
                "Starting deployment: {} source(s), {} target(s){}",
                self.sources.len(),
                targets.len(),
                if self.options.dry_run { " [dry run]" } else { "" }
            ),
        );

        if let Err(e) = self.validate(targets) {
            return Err(self.fail(e, report));
        }

        let per_target = match count_expected(&self.sources, &self.filter) {
            Ok(count) => count,
            Err(e) => return Err(self.fail(e, report)),
        };
        let tracker = ProgressTracker::new(Arc::clone(&self.progress));
        tracker.start(per_target * targets.len() as u64);

        let mut first_error = None;
        for (index, target) in targets.iter().enumerate() {
            let id = target.display_id();
            log.log(
                Level::Info,
                &format!("Deploying to {} ({}/{})", id, index + 1, targets.len()),
            );

            let target_started = Instant::now();
            match self.deploy_target(target, &id, &mut report, &tracker) {
                Ok(stats) => log.log(
                    Level::Info,
                    &format!(
                        "Target {} done in {:.2}s ({})",
                        id,
                        target_started.elapsed().as_secs_f64(),
                        stats
                    ),
                ),
                Err(e) => {
                    log.log(Level::Error, &format!("Target {} failed: {}", id, e));
                    match self.options.failure_policy {
                        FailurePolicy::FailFast => return Err(self.fail(e, report)),
                        FailurePolicy::Continue => {
                            report.mark_target_failed(&id, e.to_string());
                            first_error.get_or_insert(e);
                        }
                    }
                }
            }
        }

        if let Some(e) = first_error {
            return Err(self.fail(e, report));
        }

        report.finish();
        log.log(
            Level::Info,
            &format!(
                "Deployment finished in {:.2}s ({})",
                started.elapsed().as_secs_f64(),
                report.stats
            ),
        );
        Ok(report)
    }

    /// Every remote root must parse before any connection is attempted.
    fn validate(&self, targets: &[TargetDescriptor]) -> Result<(), DeployError> {
        for target in targets {
            target.root()?;
        }
        Ok(())
    }

    fn deploy_target(
        &self,
        target: &TargetDescriptor,
        id: &str,
        report: &mut DeploymentReport,
        tracker: &ProgressTracker,
    ) -> Result<StatsCounter, DeployError> {
        let log = self.log.as_ref();
        let mut ctx = TraversalContext::new(report, id, tracker, log);

        let mode = if self.options.dry_run {
            AccessMode::ReadOnly
        } else {
            AccessMode::Write
        };
        let guard = ConnectionGuard::acquire(self.provider.as_ref(), target, mode, log)?;

        let merger = TreeMerger::new(&self.filter)
            .with_dry_run(self.options.dry_run)
            .with_verify(self.options.verify);
        let synchronizer = ProjectSynchronizer::new(&merger);

        let mut stats = StatsCounter::default();
        for source in &self.sources {
            let project_stats = synchronizer.sync(source, guard.root(), &mut ctx)?;
            stats.merge(&project_stats);
        }

        drop(guard);
        Ok(stats)
    }

    fn fail(&self, error: DeployError, mut report: DeploymentReport) -> DeployFailure {
        report.finish();
        self.log
            .log(Level::Error, &format!("Deployment failed: {}", error));
        DeployFailure::new(error, report)
    }
}

//! Runs a deployment off the caller's thread.
//!
//! The orchestrator blocks on filesystem and connection calls, so it runs on
//! tokio's blocking pool; progress ticks and log lines arrive on
//! [`DeploymentHandle::events`] while it works.

use std::sync::Arc;
use tokio::sync::mpsc::{self, UnboundedReceiver};
use tokio::task::{JoinError, JoinHandle};

use crate::deploy::error::DeployFailure;
use crate::deploy::exclude::ExclusionFilter;
use crate::deploy::orchestrator::{DeployOptions, DeploymentOrchestrator};
use crate::deploy::project::SourceEntry;
use crate::deploy::report::DeploymentReport;
use crate::deploy::sink::{ChannelSink, DeployEvent};
use crate::target::{ConnectionProvider, TargetDescriptor};

/// Everything one run needs.
pub struct DeploymentJob {
    pub sources: Vec<SourceEntry>,
    pub filter: ExclusionFilter,
    pub targets: Vec<TargetDescriptor>,
    pub provider: Arc<dyn ConnectionProvider>,
    pub options: DeployOptions,
}

/// A running deployment.
pub struct DeploymentHandle {
    /// Closes once the run has finished.
    pub events: UnboundedReceiver<DeployEvent>,
    task: JoinHandle<Result<DeploymentReport, DeployFailure>>,
}

impl DeploymentHandle {
    /// Wait for the run to finish. `Err` only if the worker panicked.
    pub async fn wait(self) -> Result<Result<DeploymentReport, DeployFailure>, JoinError> {
        self.task.await
    }
}

/// Start `job` on the blocking pool. Must be called inside a tokio runtime.
pub fn spawn(job: DeploymentJob) -> DeploymentHandle {
    let (tx, rx) = mpsc::unbounded_channel();
    let sink = Arc::new(ChannelSink::new(tx));

    let task = tokio::task::spawn_blocking(move || {
        let orchestrator = DeploymentOrchestrator::new(job.sources, job.filter, job.provider)
            .with_progress(sink.clone())
            .with_log(sink)
            .with_options(job.options);
        orchestrator.run(&job.targets)
    });

    DeploymentHandle { events: rx, task }
}

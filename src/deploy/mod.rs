//! Merge-deploy engine.
//!
//! Publishes a set of local source trees into one or more targets, copying
//! new and changed files, skipping unchanged ones and keeping deny-listed
//! entries out, while recording every decision in a [`DeploymentReport`].

pub mod compare;
pub mod context;
pub mod error;
pub mod exclude;
pub mod merge;
pub mod orchestrator;
pub mod preflight;
pub mod progress;
pub mod project;
pub mod report;
pub mod sink;
pub mod worker;

pub use compare::{FileComparator, FileStamp, FileStatus, MTIME_TOLERANCE_SECS};
pub use context::TraversalContext;
pub use error::{DeployError, DeployFailure, RunOutcome};
pub use exclude::ExclusionFilter;
pub use merge::{TreeMerger, EXCLUDED_DETAIL, IDENTICAL_DETAIL};
pub use orchestrator::{DeployOptions, DeploymentOrchestrator, FailurePolicy};
pub use preflight::{ExclusionHit, HitKind};
pub use progress::{count_expected, ProgressSnapshot, ProgressTracker};
pub use project::{ProjectSynchronizer, SourceEntry, SourceKind};
pub use report::{
    DeploymentReport, FileOperationRecord, OperationKind, ProjectReport, StatsCounter, TargetReport,
};
pub use sink::{ChannelSink, DeployEvent, LogCrateSink, LogSink, NullSink, ProgressSink};
pub use worker::{DeploymentHandle, DeploymentJob};

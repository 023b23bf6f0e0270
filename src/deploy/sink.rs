//! Observer capabilities handed to the engine.
//!
//! The engine never prints. It reports progress ticks and log lines through
//! these traits, which are called from the deployment worker thread.

use log::Level;
use tokio::sync::mpsc::UnboundedSender;

/// Receives `(completed, total)` after every file-level decision.
pub trait ProgressSink: Send + Sync {
    fn on_progress(&self, completed: u64, total: u64);
}

/// Receives one line per significant step of a run.
pub trait LogSink: Send + Sync {
    fn log(&self, level: Level, message: &str);
}

impl<F> ProgressSink for F
where
    F: Fn(u64, u64) + Send + Sync,
{
    fn on_progress(&self, completed: u64, total: u64) {
        self(completed, total)
    }
}

impl<F> LogSink for F
where
    F: Fn(Level, &str) + Send + Sync,
{
    fn log(&self, level: Level, message: &str) {
        self(level, message)
    }
}

/// Discards everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSink;

impl ProgressSink for NullSink {
    fn on_progress(&self, _completed: u64, _total: u64) {}
}

impl LogSink for NullSink {
    fn log(&self, _level: Level, _message: &str) {}
}

/// Forwards log lines to the `log` facade.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogCrateSink;

impl LogSink for LogCrateSink {
    fn log(&self, level: Level, message: &str) {
        log::log!(target: "sitepub::deploy", level, "{}", message);
    }
}

/// Event delivered to a front-end watching a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeployEvent {
    Progress { completed: u64, total: u64 },
    Log { level: Level, message: String },
}

/// Sink that marshals events onto a tokio channel.
///
/// Sends never block; events are dropped once the receiver is gone.
#[derive(Debug, Clone)]
pub struct ChannelSink {
    tx: UnboundedSender<DeployEvent>,
}

impl ChannelSink {
    pub fn new(tx: UnboundedSender<DeployEvent>) -> Self {
        Self { tx }
    }
}

impl ProgressSink for ChannelSink {
    fn on_progress(&self, completed: u64, total: u64) {
        let _ = self.tx.send(DeployEvent::Progress { completed, total });
    }
}

impl LogSink for ChannelSink {
    fn log(&self, level: Level, message: &str) {
        let _ = self.tx.send(DeployEvent::Log {
            level,
            message: message.to_string(),
        });
    }
}

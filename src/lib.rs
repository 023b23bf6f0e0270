// Library module for sitepub
// Re-exports modules for use in integration tests and external crates

pub mod config;
pub mod deploy;
pub mod history;
pub mod logfile;
pub mod target;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Merge-deploy local builds to one or more servers.
#[derive(Debug, Parser)]
#[command(name = "sitepub", version, about)]
pub struct Cli {
    /// Configuration file (TOML or JSON)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// More log output (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Publish every source to every target
    Deploy {
        /// Classify and report without writing anything
        #[arg(long)]
        dry_run: bool,
        /// Hash-check every copied file
        #[arg(long)]
        verify: bool,
        /// Keep going with the next target when one fails
        #[arg(long)]
        continue_on_error: bool,
    },
    /// List deny-listed entries present in the sources
    Check,
    /// Test the connection to one target, or all of them
    TestTarget {
        /// Target index as listed in the config (1-based)
        index: Option<usize>,
    },
    /// Browse past deployments
    History {
        /// Show the records of the N-th most recent run (1-based)
        #[arg(long)]
        show: Option<usize>,
        /// Number of runs to list
        #[arg(long, default_value_t = 20)]
        limit: usize,
    },
    /// Write a starter configuration file
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

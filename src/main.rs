mod cli;
mod commands;

use anyhow::Result;
use clap::Parser;
use env_logger::{Env, Target};
use std::io;
use std::path::Path;

use cli::{Cli, Command};
use sitepub::config::Config;
use sitepub::logfile::{DailyLogFile, Tee};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config_path = commands::config_path(cli.config)?;
    let loaded = commands::try_load_config(&config_path);

    let log_dir = match &loaded {
        Some(Ok(config)) => config.log_dir(),
        _ => Config::default_log_dir(),
    };
    init_logging(cli.verbose, &log_dir);

    match cli.command {
        Command::Init { force } => commands::init(&config_path, force),
        Command::Deploy {
            dry_run,
            verify,
            continue_on_error,
        } => {
            let config = commands::require_config(loaded, &config_path)?;
            commands::deploy(config, dry_run, verify, continue_on_error).await
        }
        Command::Check => commands::check(commands::require_config(loaded, &config_path)?),
        Command::TestTarget { index } => {
            commands::test_target(commands::require_config(loaded, &config_path)?, index)
        }
        Command::History { show, limit } => {
            commands::history(commands::require_config(loaded, &config_path)?, show, limit)
        }
    }
}

/// Console logging, mirrored into the day's log file when it can be opened.
fn init_logging(verbose: u8, log_dir: &Path) {
    let level = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let mut builder = env_logger::Builder::from_env(Env::default().default_filter_or(level));
    builder.format_timestamp_secs();

    let file = DailyLogFile::open(log_dir);
    if let Ok(file) = &file {
        builder.target(Target::Pipe(Box::new(Tee::new(io::stderr(), file.clone()))));
    }
    builder.init();

    if let Err(e) = file {
        log::warn!("Logging to the console only: {:#}", e);
    }
}

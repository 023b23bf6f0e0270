//! Command handlers for the CLI.

use anyhow::{anyhow, bail, Context, Result};
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use sitepub::config::Config;
use sitepub::deploy::{
    self, preflight, DeployEvent, DeploymentJob, DeploymentReport, HitKind, LogCrateSink, OperationKind,
    RunOutcome, StatsCounter,
};
use sitepub::history::HistoryStore;
use sitepub::target::{self, MountedProvider};

/// Explicit `--config`, else the per-user default location.
pub fn config_path(explicit: Option<PathBuf>) -> Result<PathBuf> {
    explicit
        .or_else(Config::default_path)
        .ok_or_else(|| anyhow!("No config directory on this platform; pass --config"))
}

/// Load the config if the file exists; a missing file is not an error yet.
pub fn try_load_config(path: &Path) -> Option<Result<Config>> {
    path.exists().then(|| Config::load(path))
}

/// The config a command needs, or why it is unavailable.
pub fn require_config(loaded: Option<Result<Config>>, path: &Path) -> Result<Config> {
    loaded.unwrap_or_else(|| {
        Err(anyhow!(
            "Config file {} not found; run `sitepub init` to create one",
            path.display()
        ))
    })
}

pub async fn deploy(config: Config, dry_run: bool, verify: bool, continue_on_error: bool) -> Result<()> {
    config.ensure_deployable()?;

    let mut options = config.options;
    options.dry_run |= dry_run;
    options.verify |= verify;
    if continue_on_error {
        options.failure_policy = deploy::FailurePolicy::Continue;
    }

    let sources = config.resolve_sources();
    if sources.is_empty() {
        bail!("None of the configured sources exist");
    }

    let job = DeploymentJob {
        sources,
        filter: config.exclusion_filter()?,
        targets: config.targets.clone(),
        provider: Arc::new(MountedProvider::new()),
        options,
    };

    let mut handle = deploy::worker::spawn(job);

    let pb = ProgressBar::new(0);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("[{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} files ({percent}%)")?
            .progress_chars("=>-"),
    );

    while let Some(event) = handle.events.recv().await {
        match event {
            DeployEvent::Progress { completed, total } => {
                pb.set_length(total);
                pb.set_position(completed);
            }
            DeployEvent::Log { level, message } => {
                pb.suspend(|| log::log!(target: "sitepub::deploy", level, "{}", message));
            }
        }
    }
    pb.finish_and_clear();

    let result = handle.wait().await.context("Deployment worker stopped unexpectedly")?;
    let store = HistoryStore::new(config.history_dir());

    match result {
        Ok(report) => {
            print_summary(&report);
            save_history(&store, &report, RunOutcome::Succeeded, None);
            println!("{}", "All targets published".green().bold());
            Ok(())
        }
        Err(failure) => {
            print_summary(&failure.report);
            let message = failure.error.to_string();
            save_history(&store, &failure.report, failure.outcome(), Some(&message));
            let outcome = match failure.outcome() {
                RunOutcome::FailedBeforeAnyFile => "before any file was touched",
                _ => "with a partial deployment",
            };
            Err(anyhow::Error::new(failure.error).context(format!("Deployment failed {}", outcome)))
        }
    }
}

fn save_history(store: &HistoryStore, report: &DeploymentReport, status: RunOutcome, error: Option<&str>) {
    match store.save(report, status, error) {
        Ok(path) => log::info!("Report saved to {}", path.display()),
        Err(e) => log::error!("Could not save report: {:#}", e),
    }
}

pub fn check(config: Config) -> Result<()> {
    let filter = config.exclusion_filter()?;
    if filter.is_empty() {
        println!("No deny-list configured");
        return Ok(());
    }

    let hits = preflight::scan(&config.resolve_sources(), &filter)?;

    if hits.is_empty() {
        println!("{}", "No deny-listed entries in the sources".green());
    } else {
        println!("{}", "Kept off the targets (the servers' copies stay as they are):".bold());
        for hit in &hits {
            let what = match hit.kind {
                HitKind::File { size } => humansize::format_size(size, humansize::BINARY),
                HitKind::Directory => "directory".to_string(),
            };
            println!(
                "  {} {}/{}  ({})",
                "!!".yellow(),
                hit.source.display(),
                hit.relative_path,
                what
            );
        }
    }

    let unused: Vec<_> = filter.names().filter(|name| !hits.iter().any(|h| h.name == *name)).collect();
    if !unused.is_empty() {
        println!("Not present locally: {}", unused.join(", ").dimmed());
    }
    Ok(())
}

pub fn test_target(config: Config, index: Option<usize>) -> Result<()> {
    if config.targets.is_empty() {
        bail!("No targets configured");
    }

    let selected: Vec<_> = match index {
        Some(i) => vec![config
            .targets
            .get(i.wrapping_sub(1))
            .ok_or_else(|| anyhow!("No target #{}; {} configured", i, config.targets.len()))?],
        None => config.targets.iter().collect(),
    };

    let provider = MountedProvider::new();
    let mut failures = 0;
    for descriptor in selected {
        match target::probe(&provider, descriptor, &LogCrateSink) {
            Ok(report) => println!(
                "{} {} -> {}",
                "ok".green().bold(),
                report.target,
                report.root.display()
            ),
            Err(e) => {
                failures += 1;
                println!("{} {}: {}", "failed".red().bold(), descriptor.display_id(), e);
            }
        }
    }

    if failures > 0 {
        bail!("{} target(s) unreachable", failures);
    }
    Ok(())
}

pub fn history(config: Config, show: Option<usize>, limit: usize) -> Result<()> {
    let store = HistoryStore::new(config.history_dir());
    let runs = store.list()?;

    if let Some(n) = show {
        let summary = runs
            .get(n.wrapping_sub(1))
            .ok_or_else(|| anyhow!("No run #{}; {} stored", n, runs.len()))?;
        let entry = store.load(&summary.path)?;
        if let Some(error) = &entry.error {
            println!("{} {}", "error:".red().bold(), error);
        }
        print_records(&entry.report);
        print_summary(&entry.report);
        return Ok(());
    }

    if runs.is_empty() {
        println!("No deployments recorded in {}", store.dir().display());
        return Ok(());
    }

    for (i, run) in runs.iter().take(limit).enumerate() {
        let status = match run.status {
            RunOutcome::Succeeded => run.status.as_str().green(),
            RunOutcome::FailedWithPartialReport => run.status.as_str().yellow(),
            RunOutcome::FailedBeforeAnyFile => run.status.as_str().red(),
        };
        println!(
            "{:>3}. {}  {:<28} {} target(s)  {}",
            i + 1,
            run.start_time.with_timezone(&chrono::Local).format("%Y-%m-%d %H:%M:%S"),
            status,
            run.targets,
            format_stats(&run.stats)
        );
    }
    Ok(())
}

pub fn init(path: &Path, force: bool) -> Result<()> {
    if path.exists() && !force {
        bail!("{} already exists; use --force to overwrite", path.display());
    }
    Config::example().save(path)?;
    println!("Wrote {}", path.display());
    Ok(())
}

fn print_summary(report: &DeploymentReport) {
    for (id, target) in &report.targets {
        println!("{}  {}", id.bold(), format_stats(&target.stats));
        if let Some(error) = &target.error {
            println!("    {} {}", "error:".red(), error);
        }
        for (name, project) in &target.projects {
            println!("    {:<24} {}", name, format_stats(&project.stats));
        }
    }

    let elapsed = report
        .duration()
        .map(|d| format!("{:.2}s", d.num_milliseconds() as f64 / 1000.0))
        .unwrap_or_else(|| "-".to_string());
    println!("{}  {}  ({})", "total".bold(), format_stats(&report.stats), elapsed);
}

fn print_records(report: &DeploymentReport) {
    for (id, target) in &report.targets {
        println!("{}", id.bold());
        for (name, project) in &target.projects {
            println!("  {}", name.underline());
            let mut records: Vec<_> = project.records.iter().collect();
            records.sort_by(|a, b| a.path.cmp(&b.path));
            for record in records {
                let kind = match record.kind {
                    OperationKind::New => record.kind.as_str().green(),
                    OperationKind::Updated => record.kind.as_str().yellow(),
                    OperationKind::Skipped => record.kind.as_str().dimmed(),
                    OperationKind::Deleted => record.kind.as_str().red(),
                };
                println!("    {:<8} {}  {}", kind, record.path, record.detail.dimmed());
            }
        }
    }
}

fn format_stats(stats: &StatsCounter) -> String {
    format!(
        "{} new, {} updated, {} skipped, {} deleted",
        stats.new.to_string().green(),
        stats.updated.to_string().yellow(),
        stats.skipped,
        stats.deleted.to_string().red()
    )
}

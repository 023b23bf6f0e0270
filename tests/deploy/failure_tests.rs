// Tests for failure handling: fail-fast, continue, partial reports

use std::fs;
use std::sync::Arc;

use sitepub::deploy::{DeployError, DeployOptions, FailurePolicy, RunOutcome, SourceEntry};
use sitepub::target::{MountedProvider, TargetDescriptor};

use super::common::*;

fn three_targets(base: &std::path::Path) -> Vec<TargetDescriptor> {
    ["web1", "web2", "web3"]
        .iter()
        .map(|name| local_target(name, &base.join(name)))
        .collect()
}

#[test]
fn test_fail_fast_stops_at_failing_target() {
    let dir = tempfile::tempdir().unwrap();
    let site = site_fixture(dir.path());
    let targets = three_targets(dir.path());
    let provider = Arc::new(ScriptedProvider::failing(&["web2"]));

    let failure = orchestrator_with(
        vec![SourceEntry::directory(&site)],
        &["excluded.tmp"],
        provider.clone(),
        DeployOptions::default(),
    )
    .run(&targets)
    .unwrap_err();

    assert!(matches!(failure.error, DeployError::Connection { .. }));
    assert_eq!(failure.outcome(), RunOutcome::FailedWithPartialReport);

    // First target complete, third never touched
    let first = failure.report.target(&targets[0].display_id()).unwrap();
    assert_eq!(first.stats.new, 3);
    assert!(failure.report.target(&targets[2].display_id()).is_none());
    assert!(!dir.path().join("web3").exists());

    assert_eq!(provider.acquired(), vec!["web1", "web2"]);
    // Only the successful connection is released
    assert_eq!(provider.released(), vec!["web1"]);

    assert!(failure.report.end_time.is_some());
    assert!(failure.report.is_consistent());
}

#[test]
fn test_continue_runs_remaining_targets() {
    let dir = tempfile::tempdir().unwrap();
    let site = site_fixture(dir.path());
    let targets = three_targets(dir.path());
    let provider = Arc::new(ScriptedProvider::failing(&["web2"]));
    let options = DeployOptions {
        failure_policy: FailurePolicy::Continue,
        ..DeployOptions::default()
    };

    let failure = orchestrator_with(vec![SourceEntry::directory(&site)], &[], provider.clone(), options)
        .run(&targets)
        .unwrap_err();

    assert!(matches!(failure.error, DeployError::Connection { .. }));
    assert_eq!(provider.acquired(), vec!["web1", "web2", "web3"]);

    let failed = failure.report.target(&targets[1].display_id()).unwrap();
    assert!(failed.error.as_deref().unwrap().contains("host unreachable"));
    assert!(failed.projects.is_empty());

    let last = failure.report.target(&targets[2].display_id()).unwrap();
    assert_eq!(last.stats.new, 4);
    assert!(last.error.is_none());
    assert_eq!(read(&dir.path().join("web3/site/index.html")), "<h1>hello</h1>");
}

#[test]
fn test_failure_before_any_file() {
    let dir = tempfile::tempdir().unwrap();
    let site = site_fixture(dir.path());
    let targets = three_targets(dir.path());
    let provider = Arc::new(ScriptedProvider::failing(&["web1"]));

    let failure = orchestrator_with(
        vec![SourceEntry::directory(&site)],
        &[],
        provider,
        DeployOptions::default(),
    )
    .run(&targets)
    .unwrap_err();

    assert_eq!(failure.report.record_count(), 0);
    assert_eq!(failure.outcome(), RunOutcome::FailedBeforeAnyFile);
}

#[test]
fn test_malformed_root_rejected_before_connecting() {
    let dir = tempfile::tempdir().unwrap();
    let site = site_fixture(dir.path());
    let targets = vec![
        local_target("web1", &dir.path().join("web1")),
        TargetDescriptor::new("web2", "relative/www"),
    ];
    let provider = Arc::new(ScriptedProvider::failing(&[]));

    let failure = orchestrator_with(
        vec![SourceEntry::directory(&site)],
        &[],
        provider.clone(),
        DeployOptions::default(),
    )
    .run(&targets)
    .unwrap_err();

    assert!(matches!(failure.error, DeployError::PathFormat { .. }));
    assert!(provider.acquired().is_empty());
    assert!(failure.report.targets.is_empty());
    assert!(!dir.path().join("web1").exists());
}

#[test]
fn test_copy_failure_aborts_with_partial_report() {
    let dir = tempfile::tempdir().unwrap();
    let site = dir.path().join("site");
    write_file(&site.join("a.txt"), "a");
    write_file(&site.join("b.txt"), "b");
    set_mtime(&site.join("b.txt"), 1_600_000_000);

    // A directory where the file should go
    let server = dir.path().join("server");
    fs::create_dir_all(server.join("site/b.txt")).unwrap();

    let target = local_target("web1", &server);
    let failure = orchestrator(vec![SourceEntry::directory(&site)], &[])
        .run(&[target.clone()])
        .unwrap_err();

    assert!(matches!(failure.error, DeployError::Copy { .. }));
    assert!(failure.report.is_consistent());
    let entry = failure.report.target(&target.display_id()).unwrap();
    assert!(entry.project("site").is_some());
    assert!(failure.report.end_time.is_some());
}

#[test]
fn test_unmounted_share_is_a_connection_error() {
    let dir = tempfile::tempdir().unwrap();
    let site = site_fixture(dir.path());
    let target = TargetDescriptor::new("fileserver", r"\\fileserver\www\site");

    let failure = orchestrator_with(
        vec![SourceEntry::directory(&site)],
        &[],
        Arc::new(MountedProvider::new()),
        DeployOptions::default(),
    )
    .run(&[target])
    .unwrap_err();

    assert!(matches!(failure.error, DeployError::Connection { .. }));
    assert_eq!(failure.outcome(), RunOutcome::FailedBeforeAnyFile);
}

#[test]
fn test_share_resolved_under_mount_point() {
    let dir = tempfile::tempdir().unwrap();
    let site = site_fixture(dir.path());
    let mount = dir.path().join("mnt");
    fs::create_dir_all(&mount).unwrap();
    let target = TargetDescriptor::new("fileserver", r"\\fileserver\www\public").with_mount(&mount);

    orchestrator(vec![SourceEntry::directory(&site)], &[])
        .run(&[target])
        .unwrap();

    assert_eq!(read(&mount.join("public/site/index.html")), "<h1>hello</h1>");
}

// Tests for merge behavior end to end: classification, exclusion, idempotence

use std::fs;

use sitepub::deploy::{DeployOptions, OperationKind, SourceEntry, EXCLUDED_DETAIL, IDENTICAL_DETAIL};
use sitepub::target::MountedProvider;
use std::sync::Arc;

use super::common::*;

#[test]
fn test_first_run_publishes_and_keeps_excluded_off() {
    let dir = tempfile::tempdir().unwrap();
    let site = site_fixture(dir.path());
    let server = dir.path().join("server");
    let target = local_target("web1", &server);

    let report = orchestrator(vec![SourceEntry::directory(&site)], &["excluded.tmp", "web.config"])
        .run(&[target.clone()])
        .unwrap();

    assert_eq!(read(&server.join("site/index.html")), "<h1>hello</h1>");
    assert_eq!(read(&server.join("site/css/app.css")), "body {}");
    assert!(!server.join("site/excluded.tmp").exists());
    assert!(!server.join("site/config/web.config").exists());

    let project = report.target(&target.display_id()).unwrap().project("site").unwrap();
    assert_eq!(project.find("index.html").unwrap().kind, OperationKind::New);
    assert_eq!(project.find("css/app.css").unwrap().kind, OperationKind::New);

    let excluded = project.find("excluded.tmp").unwrap();
    assert_eq!(excluded.kind, OperationKind::Deleted);
    assert_eq!(excluded.detail, EXCLUDED_DETAIL);
    assert_eq!(project.find("config/web.config").unwrap().kind, OperationKind::Deleted);

    assert_eq!(report.stats.new, 2);
    assert_eq!(report.stats.deleted, 2);
    assert_eq!(report.stats.updated, 0);
    assert_eq!(report.stats.skipped, 0);
    assert!(report.end_time.is_some());
}

#[test]
fn test_second_run_skips_everything() {
    let dir = tempfile::tempdir().unwrap();
    let site = site_fixture(dir.path());
    let target = local_target("web1", &dir.path().join("server"));
    let deploy = orchestrator(vec![SourceEntry::directory(&site)], &["excluded.tmp"]);

    deploy.run(&[target.clone()]).unwrap();
    let second = deploy.run(&[target.clone()]).unwrap();

    assert_eq!(second.stats.new, 0);
    assert_eq!(second.stats.updated, 0);
    assert_eq!(second.stats.skipped, 3);
    assert_eq!(second.stats.deleted, 1);

    let project = second.target(&target.display_id()).unwrap().project("site").unwrap();
    assert!(project
        .records_of(OperationKind::Skipped)
        .all(|r| r.detail == IDENTICAL_DETAIL));
}

#[test]
fn test_changed_files_are_updated() {
    let dir = tempfile::tempdir().unwrap();
    let site = site_fixture(dir.path());
    let server = dir.path().join("server");
    let target = local_target("web1", &server);
    let deploy = orchestrator(vec![SourceEntry::directory(&site)], &[]);
    deploy.run(&[target.clone()]).unwrap();

    // Size change
    write_file(&site.join("index.html"), "<h1>hello, world</h1>");
    // Same size, mtime well past the tolerance
    let css = site.join("css/app.css");
    write_file(&css, "body{x}");
    set_mtime(&css, 1_700_000_000);
    set_mtime(&server.join("site/css/app.css"), 1_700_000_010);

    let report = deploy.run(&[target.clone()]).unwrap();
    let project = report.target(&target.display_id()).unwrap().project("site").unwrap();

    assert_eq!(project.find("index.html").unwrap().kind, OperationKind::Updated);
    assert_eq!(project.find("css/app.css").unwrap().kind, OperationKind::Updated);
    assert_eq!(read(&server.join("site/index.html")), "<h1>hello, world</h1>");
    assert_eq!(read(&server.join("site/css/app.css")), "body{x}");
}

#[test]
fn test_mtime_drift_within_tolerance_is_skipped() {
    let dir = tempfile::tempdir().unwrap();
    let site = dir.path().join("site");
    let server = dir.path().join("server");
    write_file(&site.join("a.txt"), "same");
    write_file(&server.join("site/a.txt"), "SAME");
    set_mtime(&site.join("a.txt"), 1_700_000_000);
    set_mtime(&server.join("site/a.txt"), 1_700_000_002);

    let report = orchestrator(vec![SourceEntry::directory(&site)], &[])
        .run(&[local_target("web1", &server)])
        .unwrap();

    assert_eq!(report.stats.skipped, 1);
    // Not rewritten
    assert_eq!(read(&server.join("site/a.txt")), "SAME");
}

#[test]
fn test_excluded_names_at_any_depth() {
    let dir = tempfile::tempdir().unwrap();
    let site = dir.path().join("site");
    write_file(&site.join("a/b/c/web.config"), "<deep/>");
    write_file(&site.join("a/b/c/page.html"), "page");
    write_file(&site.join("node_modules/lib/index.js"), "js");
    write_file(&site.join("node_modules/package.json"), "{}");
    let server = dir.path().join("server");
    let target = local_target("web1", &server);

    let report = orchestrator(vec![SourceEntry::directory(&site)], &["web.config", "node_modules"])
        .run(&[target.clone()])
        .unwrap();

    assert!(server.join("site/a/b/c/page.html").exists());
    assert!(!server.join("site/a/b/c/web.config").exists());
    assert!(!server.join("site/node_modules").exists());

    let project = report.target(&target.display_id()).unwrap().project("site").unwrap();
    assert_eq!(project.find("a/b/c/web.config").unwrap().kind, OperationKind::Deleted);
    assert_eq!(project.find("node_modules").unwrap().kind, OperationKind::Deleted);
    // Excluded directories are not entered
    assert!(project.records.iter().all(|r| !r.path.starts_with("node_modules/")));
    assert_eq!(report.stats.deleted, 2);
}

#[test]
fn test_server_copy_of_excluded_file_is_untouched() {
    let dir = tempfile::tempdir().unwrap();
    let site = site_fixture(dir.path());
    let server = dir.path().join("server");
    write_file(&server.join("site/config/web.config"), "<production/>");
    write_file(&server.join("site/legacy.html"), "old");

    orchestrator(vec![SourceEntry::directory(&site)], &["web.config"])
        .run(&[local_target("web1", &server)])
        .unwrap();

    assert_eq!(read(&server.join("site/config/web.config")), "<production/>");
    // Merge never removes destination-only files
    assert_eq!(read(&server.join("site/legacy.html")), "old");
}

#[test]
fn test_single_file_source_lands_in_its_own_project() {
    let dir = tempfile::tempdir().unwrap();
    let archive = dir.path().join("dist/api.zip");
    write_file(&archive, "PK");
    let server = dir.path().join("server");
    let target = local_target("web1", &server);

    let report = orchestrator(vec![SourceEntry::file(&archive)], &[])
        .run(&[target.clone()])
        .unwrap();

    assert_eq!(read(&server.join("api/api.zip")), "PK");
    let project = report.target(&target.display_id()).unwrap().project("api").unwrap();
    assert_eq!(project.find("api.zip").unwrap().kind, OperationKind::New);
}

#[test]
fn test_excluded_single_file_source() {
    let dir = tempfile::tempdir().unwrap();
    let source = dir.path().join("web.config");
    write_file(&source, "<local/>");
    let server = dir.path().join("server");

    let report = orchestrator(vec![SourceEntry::file(&source)], &["web.config"])
        .run(&[local_target("web1", &server)])
        .unwrap();

    assert_eq!(report.stats.deleted, 1);
    assert_eq!(report.stats.total(), 1);
    assert!(!server.join("web/web.config").exists());
}

#[test]
fn test_copied_files_keep_source_mtime() {
    let dir = tempfile::tempdir().unwrap();
    let site = dir.path().join("site");
    write_file(&site.join("a.txt"), "a");
    set_mtime(&site.join("a.txt"), 1_600_000_000);
    let server = dir.path().join("server");

    orchestrator(vec![SourceEntry::directory(&site)], &[])
        .run(&[local_target("web1", &server)])
        .unwrap();

    let copied = fs::metadata(server.join("site/a.txt")).unwrap();
    let mtime = filetime::FileTime::from_last_modification_time(&copied);
    assert_eq!(mtime.unix_seconds(), 1_600_000_000);
}

#[test]
fn test_dry_run_writes_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let site = site_fixture(dir.path());
    let server = dir.path().join("server");
    let target = local_target("web1", &server.join("www"));
    let options = DeployOptions {
        dry_run: true,
        ..DeployOptions::default()
    };

    let report = orchestrator_with(
        vec![SourceEntry::directory(&site)],
        &["excluded.tmp"],
        Arc::new(MountedProvider::new()),
        options,
    )
    .run(&[target.clone()])
    .unwrap();

    // Not even the remote root is created
    assert!(!server.exists());
    assert_eq!(report.stats.new, 3);
    assert_eq!(report.stats.deleted, 1);
    let project = report.target(&target.display_id()).unwrap().project("site").unwrap();
    assert!(project.find("index.html").unwrap().detail.ends_with("(dry run)"));
}

#[test]
fn test_dry_run_against_existing_target() {
    let dir = tempfile::tempdir().unwrap();
    let site = site_fixture(dir.path());
    let server = dir.path().join("server");
    let target = local_target("web1", &server);
    orchestrator(vec![SourceEntry::directory(&site)], &[])
        .run(&[target.clone()])
        .unwrap();
    write_file(&site.join("index.html"), "<h1>changed!</h1>");

    let options = DeployOptions {
        dry_run: true,
        ..DeployOptions::default()
    };
    let report = orchestrator_with(
        vec![SourceEntry::directory(&site)],
        &[],
        Arc::new(MountedProvider::new()),
        options,
    )
    .run(&[target])
    .unwrap();

    assert_eq!(report.stats.updated, 1);
    assert_eq!(report.stats.skipped, 3);
    assert_eq!(read(&server.join("site/index.html")), "<h1>hello</h1>");
}

#[test]
fn test_verify_accepts_faithful_copies() {
    let dir = tempfile::tempdir().unwrap();
    let site = site_fixture(dir.path());
    let server = dir.path().join("server");
    let options = DeployOptions {
        verify: true,
        ..DeployOptions::default()
    };

    let report = orchestrator_with(
        vec![SourceEntry::directory(&site)],
        &[],
        Arc::new(MountedProvider::new()),
        options,
    )
    .run(&[local_target("web1", &server)])
    .unwrap();

    assert_eq!(report.stats.new, 4);
    assert_eq!(read(&server.join("site/config/web.config")), "<local/>");
}

#[test]
fn test_every_target_gets_the_same_projects() {
    let dir = tempfile::tempdir().unwrap();
    let site = site_fixture(dir.path());
    let targets = [
        local_target("web1", &dir.path().join("s1")),
        local_target("web2", &dir.path().join("s2")),
    ];

    let report = orchestrator(vec![SourceEntry::directory(&site)], &["excluded.tmp"])
        .run(&targets)
        .unwrap();

    for target in &targets {
        let entry = report.target(&target.display_id()).unwrap();
        assert_eq!(entry.stats.new, 3);
        assert_eq!(entry.stats.deleted, 1);
    }
    assert_eq!(report.stats.new, 6);
    assert!(dir.path().join("s2/site/css/app.css").exists());
}

#[test]
fn test_sources_with_same_name_share_a_project() {
    let dir = tempfile::tempdir().unwrap();
    let first = dir.path().join("a/site");
    let second = dir.path().join("b/site");
    write_file(&first.join("one.html"), "1");
    write_file(&second.join("two.html"), "2");
    let server = dir.path().join("server");
    let target = local_target("web1", &server);

    let report = orchestrator(
        vec![SourceEntry::directory(&first), SourceEntry::directory(&second)],
        &[],
    )
    .run(&[target.clone()])
    .unwrap();

    let entry = report.target(&target.display_id()).unwrap();
    assert_eq!(entry.projects.len(), 1);
    let project = entry.project("site").unwrap();
    assert_eq!(project.records.len(), 2);
    assert_eq!(project.stats.new, 2);
    assert!(server.join("site/one.html").exists());
    assert!(server.join("site/two.html").exists());
}

// Shared fixtures for deploy tests

use filetime::FileTime;
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use sitepub::deploy::{
    DeployError, DeployOptions, DeploymentOrchestrator, ExclusionFilter, NullSink, SourceEntry,
};
use sitepub::target::{AccessMode, ConnectionProvider, MountedProvider, TargetDescriptor};

pub fn write_file(path: &Path, contents: &str) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(path, contents).unwrap();
}

pub fn set_mtime(path: &Path, unix_secs: i64) {
    filetime::set_file_mtime(path, FileTime::from_unix_time(unix_secs, 0)).unwrap();
}

pub fn read(path: &Path) -> String {
    fs::read_to_string(path).unwrap()
}

/// Target served straight from a local directory.
pub fn local_target(name: &str, root: &Path) -> TargetDescriptor {
    TargetDescriptor::new(name, root.to_str().unwrap())
}

pub fn filter(names: &[&str]) -> ExclusionFilter {
    ExclusionFilter::from_names(names.iter().map(|n| n.to_string()))
}

pub fn orchestrator(sources: Vec<SourceEntry>, exclude: &[&str]) -> DeploymentOrchestrator {
    orchestrator_with(sources, exclude, Arc::new(MountedProvider::new()), DeployOptions::default())
}

pub fn orchestrator_with(
    sources: Vec<SourceEntry>,
    exclude: &[&str],
    provider: Arc<dyn ConnectionProvider>,
    options: DeployOptions,
) -> DeploymentOrchestrator {
    DeploymentOrchestrator::new(sources, filter(exclude), provider)
        .with_log(Arc::new(NullSink))
        .with_options(options)
}

/// Source tree used by most tests:
///
/// ```text
/// site/index.html
/// site/excluded.tmp
/// site/css/app.css
/// site/config/web.config
/// ```
pub fn site_fixture(base: &Path) -> PathBuf {
    let site = base.join("site");
    write_file(&site.join("index.html"), "<h1>hello</h1>");
    write_file(&site.join("excluded.tmp"), "scratch");
    write_file(&site.join("css").join("app.css"), "body {}");
    write_file(&site.join("config").join("web.config"), "<local/>");
    site
}

/// Mounted provider that refuses chosen addresses and logs every call.
pub struct ScriptedProvider {
    inner: MountedProvider,
    failing: HashSet<String>,
    pub acquired: Mutex<Vec<String>>,
    pub released: Mutex<Vec<String>>,
}

impl ScriptedProvider {
    pub fn failing(addresses: &[&str]) -> Self {
        Self {
            inner: MountedProvider::new(),
            failing: addresses.iter().map(|a| a.to_string()).collect(),
            acquired: Mutex::new(Vec::new()),
            released: Mutex::new(Vec::new()),
        }
    }

    pub fn acquired(&self) -> Vec<String> {
        self.acquired.lock().unwrap().clone()
    }

    pub fn released(&self) -> Vec<String> {
        self.released.lock().unwrap().clone()
    }
}

impl ConnectionProvider for ScriptedProvider {
    fn acquire(&self, target: &TargetDescriptor, mode: AccessMode) -> Result<PathBuf, DeployError> {
        self.acquired.lock().unwrap().push(target.address.clone());
        if self.failing.contains(&target.address) {
            return Err(DeployError::connection(target.display_id(), "host unreachable"));
        }
        self.inner.acquire(target, mode)
    }

    fn release(&self, target: &TargetDescriptor) {
        self.released.lock().unwrap().push(target.address.clone());
    }
}

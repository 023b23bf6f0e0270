//! Connection providers.
//!
//! The engine only ever sees a local directory: a provider turns a target
//! descriptor into that directory and tears the connection down afterwards.

use log::Level;
use std::fs;
use std::path::{Path, PathBuf};

use crate::deploy::error::DeployError;
use crate::deploy::sink::LogSink;
use crate::target::root::RemoteRoot;
use crate::target::TargetDescriptor;

/// How the engine will use an acquired root.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AccessMode {
    /// Files will be written; a missing root may be created.
    #[default]
    Write,
    /// Dry run: nothing is written, a missing root is reported as-is.
    ReadOnly,
}

/// Opens and closes targets.
pub trait ConnectionProvider: Send + Sync {
    /// Make the target's remote root reachable and return its local path.
    ///
    /// Under [`AccessMode::ReadOnly`] nothing may be created on the target.
    fn acquire(&self, target: &TargetDescriptor, mode: AccessMode) -> Result<PathBuf, DeployError>;

    /// Close the target. Idempotent and infallible.
    fn release(&self, target: &TargetDescriptor);
}

/// Scoped connection: released when dropped, including on error paths.
pub struct ConnectionGuard<'a> {
    provider: &'a dyn ConnectionProvider,
    target: &'a TargetDescriptor,
    root: PathBuf,
    log: &'a dyn LogSink,
}

impl<'a> ConnectionGuard<'a> {
    pub fn acquire(
        provider: &'a dyn ConnectionProvider,
        target: &'a TargetDescriptor,
        mode: AccessMode,
        log: &'a dyn LogSink,
    ) -> Result<Self, DeployError> {
        log.log(Level::Info, &format!("Connecting to {}", target.display_id()));
        let root = provider.acquire(target, mode)?;
        log.log(
            Level::Info,
            &format!("Connected to {} at {}", target.display_id(), root.display()),
        );
        Ok(Self {
            provider,
            target,
            root,
            log,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl Drop for ConnectionGuard<'_> {
    fn drop(&mut self) {
        self.provider.release(self.target);
        self.log
            .log(Level::Info, &format!("Closed connection to {}", self.target.display_id()));
    }
}

/// Targets whose remote roots are already mounted into the local filesystem.
///
/// POSIX roots resolve to the path itself, or below `mount` when one is set.
/// Share and drive roots need `mount`, the local mount point of the share or
/// volume, and resolve to their subpath below it.
#[derive(Debug, Clone)]
pub struct MountedProvider {
    create_missing: bool,
}

impl Default for MountedProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl MountedProvider {
    pub fn new() -> Self {
        Self { create_missing: true }
    }

    /// Fail instead of creating a missing remote root.
    pub fn without_create(mut self) -> Self {
        self.create_missing = false;
        self
    }

    /// Local directory for `target`, without touching the filesystem.
    pub fn resolve(&self, target: &TargetDescriptor) -> Result<PathBuf, DeployError> {
        let root = target.root()?;

        match (&root, &target.mount) {
            (_, Some(mount)) => Ok(root.resolve_under(mount)),
            (RemoteRoot::Posix { .. }, None) => Ok(root.resolve_under("/")),
            (_, None) => Err(DeployError::connection(
                target.display_id(),
                format!("{} is not mounted locally; set a mount point for this target", root),
            )),
        }
    }
}

impl ConnectionProvider for MountedProvider {
    fn acquire(&self, target: &TargetDescriptor, mode: AccessMode) -> Result<PathBuf, DeployError> {
        let root = self.resolve(target)?;

        if let Some(mount) = &target.mount {
            if !mount.is_dir() {
                return Err(DeployError::connection(
                    target.display_id(),
                    format!("mount point {} is not available", mount.display()),
                ));
            }
        }

        if !root.exists() && mode == AccessMode::ReadOnly {
            return Ok(root);
        }

        if !root.exists() && self.create_missing {
            fs::create_dir_all(&root).map_err(|e| {
                DeployError::connection(
                    target.display_id(),
                    format!("cannot create remote root {}: {}", root.display(), e),
                )
            })?;
        }

        if !root.is_dir() {
            return Err(DeployError::connection(
                target.display_id(),
                format!("remote root {} is not a directory", root.display()),
            ));
        }

        Ok(root)
    }

    fn release(&self, _target: &TargetDescriptor) {}
}

/// Result of a successful connection test.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeReport {
    pub target: String,
    pub root: PathBuf,
}

/// Connect, write and remove a probe file, disconnect.
pub fn probe(
    provider: &dyn ConnectionProvider,
    target: &TargetDescriptor,
    log: &dyn LogSink,
) -> Result<ProbeReport, DeployError> {
    target.root()?;
    let guard = ConnectionGuard::acquire(provider, target, AccessMode::Write, log)?;

    let probe_file = guard.root().join(format!(".sitepub-probe-{}", std::process::id()));
    fs::write(&probe_file, b"probe")
        .and_then(|_| fs::remove_file(&probe_file))
        .map_err(|e| {
            DeployError::connection(
                target.display_id(),
                format!("remote root {} is not writable: {}", guard.root().display(), e),
            )
        })?;

    Ok(ProbeReport {
        target: target.display_id(),
        root: guard.root().to_path_buf(),
    })
}

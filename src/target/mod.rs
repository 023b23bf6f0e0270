//! Deployment targets and how the engine reaches them.

pub mod provider;
pub mod root;

pub use provider::{probe, AccessMode, ConnectionGuard, ConnectionProvider, MountedProvider, ProbeReport};
pub use root::RemoteRoot;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

use crate::deploy::error::DeployError;

/// One configured remote target.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetDescriptor {
    /// Host name or address.
    #[serde(alias = "ip")]
    pub address: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    /// Root directory on the target that projects are published into.
    #[serde(alias = "path")]
    pub remote_root: String,
    /// Local mount point of the remote root's share or volume.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mount: Option<PathBuf>,
}

impl TargetDescriptor {
    pub fn new(address: impl Into<String>, remote_root: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            username: None,
            password: None,
            remote_root: remote_root.into(),
            mount: None,
        }
    }

    pub fn with_mount(mut self, mount: impl Into<PathBuf>) -> Self {
        self.mount = Some(mount.into());
        self
    }

    /// Report key, `"address (remote_root)"`.
    pub fn display_id(&self) -> String {
        format!("{} ({})", self.address, self.remote_root)
    }

    pub fn root(&self) -> Result<RemoteRoot, DeployError> {
        RemoteRoot::parse(&self.remote_root)
    }
}

impl fmt::Debug for TargetDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TargetDescriptor")
            .field("address", &self.address)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "***"))
            .field("remote_root", &self.remote_root)
            .field("mount", &self.mount)
            .finish()
    }
}

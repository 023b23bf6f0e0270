//! Publisher configuration.
//!
//! Stored as TOML by default; JSON files are accepted too, including the
//! legacy `config.json` layout (`source_files`, `delete_files`, `servers`).

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::deploy::{DeployOptions, ExclusionFilter, SourceEntry};
use crate::target::TargetDescriptor;

const APP_DIR: &str = "sitepub";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Files and directories to publish, one project each.
    #[serde(default, alias = "source_files")]
    pub sources: Vec<PathBuf>,
    /// Base names that are never written to a target.
    #[serde(default, alias = "delete_files")]
    pub exclude: Vec<String>,
    /// Glob patterns matched against base names.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub exclude_patterns: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub history_dir: Option<PathBuf>,
    /// Where the daily `publish_<YYYYmmdd>.log` files go.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_dir: Option<PathBuf>,
    #[serde(default)]
    pub options: DeployOptions,
    /// Kept last so TOML output has every plain value ahead of the tables.
    #[serde(default, alias = "servers")]
    pub targets: Vec<TargetDescriptor>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Format {
    Toml,
    Json,
}

impl Format {
    fn of(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("json") => Format::Json,
            _ => Format::Toml,
        }
    }
}

impl Config {
    /// `<config dir>/sitepub/config.toml`.
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join(APP_DIR).join("config.toml"))
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config: {}", path.display()))?;
        Self::parse(&content, Format::of(path))
            .with_context(|| format!("Failed to parse config: {}", path.display()))
    }

    fn parse(content: &str, format: Format) -> Result<Self> {
        let config = match format {
            Format::Json => serde_json::from_str(content)?,
            Format::Toml => toml::from_str(content)?,
        };
        Ok(config)
    }

    /// Write atomically: temp file next to `path`, then rename.
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = match Format::of(path) {
            Format::Json => serde_json::to_string_pretty(self)?,
            Format::Toml => toml::to_string_pretty(self)?,
        };

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
        }

        let tmp = path.with_extension("tmp");
        fs::write(&tmp, content).with_context(|| format!("Failed to write {}", tmp.display()))?;
        fs::rename(&tmp, path).with_context(|| format!("Failed to replace {}", path.display()))?;
        Ok(())
    }

    /// Starter configuration written by `sitepub init`.
    pub fn example() -> Self {
        let mut target = TargetDescriptor::new("web1.example.com", "/var/www");
        target.username = Some("deploy".to_string());
        Self {
            sources: vec![PathBuf::from("./dist/site"), PathBuf::from("./dist/api.zip")],
            exclude: vec!["web.config".to_string(), "appsettings.json".to_string()],
            exclude_patterns: Vec::new(),
            history_dir: None,
            log_dir: None,
            options: DeployOptions::default(),
            targets: vec![target],
        }
    }

    pub fn exclusion_filter(&self) -> Result<ExclusionFilter> {
        ExclusionFilter::from_names(self.exclude.iter().cloned())
            .with_patterns(&self.exclude_patterns)
            .context("Invalid exclude pattern")
    }

    /// Stat every configured source. Missing ones are skipped with a warning.
    pub fn resolve_sources(&self) -> Vec<SourceEntry> {
        self.sources
            .iter()
            .filter_map(|path| match SourceEntry::resolve(path) {
                Ok(entry) => Some(entry),
                Err(e) => {
                    log::warn!("Skipping source: {}", e);
                    None
                }
            })
            .collect()
    }

    pub fn history_dir(&self) -> PathBuf {
        self.history_dir.clone().unwrap_or_else(|| {
            dirs::data_local_dir()
                .map(|dir| dir.join(APP_DIR).join("history"))
                .unwrap_or_else(|| PathBuf::from("history"))
        })
    }

    pub fn log_dir(&self) -> PathBuf {
        self.log_dir.clone().unwrap_or_else(Self::default_log_dir)
    }

    /// `<local data dir>/sitepub/logs`.
    pub fn default_log_dir() -> PathBuf {
        dirs::data_local_dir()
            .map(|dir| dir.join(APP_DIR).join("logs"))
            .unwrap_or_else(|| PathBuf::from("logs"))
    }

    /// Refuse to run without anything to publish or anywhere to publish to.
    pub fn ensure_deployable(&self) -> Result<()> {
        if self.sources.is_empty() {
            bail!("No sources configured");
        }
        if self.targets.is_empty() {
            bail!("No targets configured");
        }
        Ok(())
    }
}

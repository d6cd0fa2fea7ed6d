//! Loader configuration.
//!
//! Values come from an optional JSON config file, then `TGLOAD_*`
//! environment variables, then CLI flags, each layer overriding the last.
use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use crate::cmd::{DEFAULT_BINARY, DEFAULT_CLOUD_HOST};
use crate::error::Version;
use crate::version::{parse_min_version, MIN_TERRAGRUNT_VERSION};

pub const CONFIG_FILE_NAME: &str = "config.json";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct ProjectConfig {
    /// Root directory containing the Terragrunt modules.
    pub path: PathBuf,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub binary: Option<String>,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub terragrunt_flags: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub plan_flags: String,
    pub use_state: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub workspace: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cloud_token: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cloud_host: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_version: Option<String>,
    pub enable_dashboard: bool,
}

impl ProjectConfig {
    pub fn binary(&self) -> &str {
        self.binary
            .as_deref()
            .filter(|binary| !binary.trim().is_empty())
            .unwrap_or(DEFAULT_BINARY)
    }

    pub fn cloud_host(&self) -> &str {
        self.cloud_host
            .as_deref()
            .filter(|host| !host.trim().is_empty())
            .unwrap_or(DEFAULT_CLOUD_HOST)
    }

    /// Minimum binary version; validated in `validate_config`.
    pub fn min_version(&self) -> Version {
        self.min_version
            .as_deref()
            .and_then(parse_min_version)
            .unwrap_or(MIN_TERRAGRUNT_VERSION)
    }

    /// Apply `TGLOAD_*` environment overrides.
    pub fn apply_env(&mut self) {
        self.apply_vars(|key| env::var(key).ok());
    }

    fn apply_vars(&mut self, var: impl Fn(&str) -> Option<String>) {
        if let Some(binary) = var("TGLOAD_BINARY") {
            self.binary = Some(binary);
        }
        if let Some(flags) = var("TGLOAD_TERRAGRUNT_FLAGS") {
            self.terragrunt_flags = flags;
        }
        if let Some(token) = var("TGLOAD_CLOUD_TOKEN") {
            self.cloud_token = Some(token);
        }
        if let Some(host) = var("TGLOAD_CLOUD_HOST") {
            self.cloud_host = Some(host);
        }
    }
}

/// Default config location: `<config dir>/tgload/config.json`.
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("tgload").join(CONFIG_FILE_NAME))
}

pub fn load_config(path: &Path) -> Result<ProjectConfig> {
    let bytes = fs::read(path).with_context(|| format!("read config {}", path.display()))?;
    let config: ProjectConfig =
        serde_json::from_slice(&bytes).with_context(|| format!("parse config {}", path.display()))?;
    validate_config(&config)?;
    Ok(config)
}

/// Load an explicit config file, else the default one if it exists, else
/// defaults.
pub fn resolve_config(explicit: Option<&Path>) -> Result<ProjectConfig> {
    if let Some(path) = explicit {
        return load_config(path);
    }
    match default_config_path() {
        Some(path) if path.is_file() => load_config(&path),
        _ => Ok(ProjectConfig::default()),
    }
}

pub fn validate_config(config: &ProjectConfig) -> Result<()> {
    if let Some(raw) = config.min_version.as_deref() {
        if parse_min_version(raw).is_none() {
            return Err(anyhow!("min_version must look like v0.28.1 (got {raw:?})"));
        }
    }
    if config.cloud_host.is_some() && config.cloud_token.is_none() {
        return Err(anyhow!("cloud_host is set but cloud_token is missing"));
    }
    shell_words::split(&config.terragrunt_flags).context("parse terragrunt_flags")?;
    shell_words::split(&config.plan_flags).context("parse plan_flags")?;
    Ok(())
}

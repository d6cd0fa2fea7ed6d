//! Usage file loading.
//!
//! The usage file is JSON of the form
//! `{"version": "0.1", "resource_usage": {"<address>": {"<key>": <value>}}}`.
use anyhow::{anyhow, Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::Path;

use crate::project::UsageMap;

pub const USAGE_FILE_VERSION: &str = "0.1";

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct UsageFile {
    version: String,
    #[serde(default)]
    resource_usage: UsageMap,
}

pub fn load_usage_file(path: &Path) -> Result<UsageMap> {
    let bytes = fs::read(path).with_context(|| format!("read usage file {}", path.display()))?;
    parse_usage(&bytes).with_context(|| format!("parse usage file {}", path.display()))
}

fn parse_usage(bytes: &[u8]) -> Result<UsageMap> {
    let file: UsageFile = serde_json::from_slice(bytes)?;
    if file.version != USAGE_FILE_VERSION {
        return Err(anyhow!(
            "unsupported usage file version {:?} (expected {USAGE_FILE_VERSION:?})",
            file.version
        ));
    }
    Ok(file.resource_usage)
}

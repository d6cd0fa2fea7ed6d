//! Assembled project model handed to downstream consumers.
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::PathBuf;

/// Usage values for a resource, keyed by attribute name.
pub type UsageData = BTreeMap<String, Value>;

/// Usage data keyed by resource address.
pub type UsageMap = BTreeMap<String, UsageData>;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProjectMetadata {
    pub path: PathBuf,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vcs_repo_root: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vcs_sub_path: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Resource {
    pub address: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub name: String,
    #[serde(default)]
    pub values: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usage: Option<UsageData>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Project {
    pub name: String,
    pub metadata: ProjectMetadata,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub past_resources: Vec<Resource>,
    pub resources: Vec<Resource>,
    pub has_diff: bool,
}

impl Project {
    pub fn new(name: impl Into<String>, metadata: ProjectMetadata) -> Self {
        Self {
            name: name.into(),
            metadata,
            past_resources: Vec::new(),
            resources: Vec::new(),
            has_diff: false,
        }
    }
}

/// Display name for a project. With the dashboard enabled and a VCS checkout
/// detected, the name is `<repo>/<sub path>`; otherwise it is the path.
pub fn project_name(metadata: &ProjectMetadata, enable_dashboard: bool) -> String {
    if enable_dashboard {
        if let Some(root) = metadata.vcs_repo_root.as_ref() {
            let repo = root
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_else(|| root.display().to_string());
            return match metadata.vcs_sub_path.as_ref() {
                Some(sub) if !sub.as_os_str().is_empty() => format!("{repo}/{}", sub.display()),
                _ => repo,
            };
        }
    }
    metadata.path.display().to_string()
}

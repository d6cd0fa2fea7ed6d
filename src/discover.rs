//! Project discovery through one aggregate `terragrunt-info` run.
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::cmd::{CmdError, CmdOptions, CommandRunner};
use crate::error::{Error, Result, Stage};
use crate::progress::{ProgressSink, Spinner};
use crate::records::split_records;

pub const INFO_ARGS: [&str; 3] = [
    "run-all",
    "--terragrunt-ignore-external-dependencies",
    "terragrunt-info",
];

/// One `terragrunt-info` record. Other fields the binary prints are ignored.
#[derive(Debug, Deserialize)]
pub struct TerragruntInfo {
    #[serde(rename = "ConfigPath")]
    pub config_path: PathBuf,
    #[serde(rename = "WorkingDir")]
    pub working_dir: PathBuf,
}

/// A module Terragrunt plans independently. Commands run from `config_dir`;
/// Terraform itself runs in `working_dir`, which is where plan files land.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct ProjectDirs {
    pub config_dir: PathBuf,
    pub working_dir: PathBuf,
}

impl From<TerragruntInfo> for ProjectDirs {
    fn from(info: TerragruntInfo) -> Self {
        let config_dir = info
            .config_path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default();
        Self {
            config_dir,
            working_dir: info.working_dir,
        }
    }
}

/// Split a user-supplied flag string with shell quoting rules.
pub fn split_flags(raw: &str) -> Result<Vec<String>> {
    Ok(shell_words::split(raw)?)
}

pub(crate) fn subprocess_error(
    err: CmdError,
    binary: &str,
    stage: Stage,
    dir: &Path,
) -> Error {
    match err {
        CmdError::NotFound(source) => Error::Spawn {
            binary: binary.to_string(),
            stage,
            dir: dir.to_path_buf(),
            source,
        },
        CmdError::Failed { status, stderr, .. } => Error::Subprocess {
            stage,
            dir: dir.to_path_buf(),
            status,
            stderr: String::from_utf8_lossy(&stderr).into_owned(),
        },
    }
}

/// Parse `terragrunt-info` output into project dirs sorted by config dir.
///
/// Any malformed record fails the whole batch: without every record the
/// directory correlation used later cannot be trusted.
pub fn parse_info_output(out: &[u8]) -> Result<Vec<ProjectDirs>> {
    let mut dirs = Vec::new();
    for record in split_records(out) {
        let info: TerragruntInfo = serde_json::from_slice(record)?;
        dirs.push(ProjectDirs::from(info));
    }
    dirs.sort_by(|a, b| a.config_dir.as_os_str().cmp(b.config_dir.as_os_str()));
    Ok(dirs)
}

pub fn discover_project_dirs(
    runner: &dyn CommandRunner,
    sink: &dyn ProgressSink,
    binary: &str,
    root: &Path,
    terragrunt_flags: &str,
) -> Result<Vec<ProjectDirs>> {
    let spinner = Spinner::start(sink, "Running terragrunt run-all terragrunt-info");

    let flags = split_flags(terragrunt_flags)?;
    let opts = CmdOptions::new(binary, root).with_flags(flags);
    let out = runner
        .run(&opts, &INFO_ARGS)
        .map_err(|err| subprocess_error(err, binary, Stage::Info, root))?;

    let dirs = parse_info_output(&out)?;
    tracing::debug!(count = dirs.len(), root = %root.display(), "discovered terragrunt projects");
    spinner.success();
    Ok(dirs)
}

#[cfg(test)]
#[path = "discover_tests.rs"]
mod tests;

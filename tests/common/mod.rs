//! Shared test infrastructure for integration tests.
//!
//! Builds a directory tree of modules plus a fake `terragrunt` shell script
//! that answers the subcommands the loader runs.

use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

use tgload::config::ProjectConfig;

/// How the fake binary answers `run-all plan`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlanMode {
    /// Write a plan file into every working dir and print progress only.
    PerModule,
    /// Print one plan JSON covering every module.
    Combined,
    /// Write plan files, then exit non-zero.
    Fail,
}

pub struct FakeRepo {
    pub root: TempDir,
    pub modules: Vec<String>,
    pub binary: PathBuf,
}

impl FakeRepo {
    pub fn new(modules: &[&str], mode: PlanMode) -> Self {
        let root = TempDir::new().expect("tempdir");
        for name in modules {
            fs::create_dir_all(working_dir(root.path(), name)).expect("create module");
            fs::write(root.path().join(name).join("terragrunt.hcl"), "").expect("write hcl");
        }
        let binary = root.path().join("bin").join("terragrunt");
        fs::create_dir_all(binary.parent().expect("bin dir")).expect("create bin");
        fs::write(&binary, script(root.path(), modules, mode)).expect("write script");
        fs::set_permissions(&binary, fs::Permissions::from_mode(0o755)).expect("chmod");

        Self {
            root,
            modules: modules.iter().map(|name| name.to_string()).collect(),
            binary,
        }
    }

    pub fn path(&self) -> &Path {
        self.root.path()
    }

    pub fn working_dir(&self, name: &str) -> PathBuf {
        working_dir(self.path(), name)
    }

    pub fn config(&self, use_state: bool) -> ProjectConfig {
        ProjectConfig {
            path: self.path().to_path_buf(),
            binary: Some(self.binary.to_string_lossy().into_owned()),
            use_state,
            ..ProjectConfig::default()
        }
    }

    /// Files left in any working dir whose name starts with `.tfplan-`.
    pub fn leftover_plan_files(&self) -> Vec<PathBuf> {
        let mut found = Vec::new();
        for name in &self.modules {
            let entries = fs::read_dir(self.working_dir(name)).expect("read working dir");
            for entry in entries {
                let path = entry.expect("entry").path();
                let is_plan = path
                    .file_name()
                    .map(|file| file.to_string_lossy().starts_with(".tfplan-"))
                    .unwrap_or(false);
                if is_plan {
                    found.push(path);
                }
            }
        }
        found
    }
}

fn working_dir(root: &Path, name: &str) -> PathBuf {
    root.join(name).join(".terragrunt-cache")
}

fn info_lines(root: &Path, modules: &[&str]) -> String {
    let mut lines = String::new();
    for name in modules {
        let record = serde_json::json!({
            "ConfigPath": root.join(name).join("terragrunt.hcl"),
            "WorkingDir": working_dir(root, name),
        });
        lines.push_str(&serde_json::to_string_pretty(&record).expect("record"));
        lines.push('\n');
    }
    lines
}

fn script(root: &Path, modules: &[&str], mode: PlanMode) -> String {
    let working_dirs = modules
        .iter()
        .map(|name| shell_words::quote(&working_dir(root, name).to_string_lossy()).into_owned())
        .collect::<Vec<_>>()
        .join(" ");
    let plan = match mode {
        PlanMode::PerModule => "echo 'Plan: 1 to add, 0 to change, 0 to destroy.'",
        PlanMode::Combined => {
            r#"echo '{"planned_values":{"root_module":{"resources":[{"address":"aws_instance.web","mode":"managed","type":"aws_instance","name":"web"}]}},"prior_state":{"values":{"root_module":{}}}}'"#
        }
        PlanMode::Fail => "echo 'Error: provider crashed' >&2; exit 1",
    };

    format!(
        r#"#!/bin/sh
case "$1" in
  --version)
    echo "terragrunt version v0.45.2"
    exit 0
    ;;
  show)
    name=$(basename "$PWD")
    echo "Switching to terraform 1.5.0" >&2
    if [ -n "$4" ]; then
      echo '{{"prior_state":{{"values":{{"root_module":{{}}}}}},"planned_values":{{"root_module":{{"resources":[{{"address":"aws_s3_bucket.'"$name"'","mode":"managed","type":"aws_s3_bucket","name":"'"$name"'"}}]}}}}}}'
    else
      echo '{{"values":{{"root_module":{{"resources":[{{"address":"aws_s3_bucket.'"$name"'","mode":"managed","type":"aws_s3_bucket","name":"'"$name"'"}}]}}}}}}'
    fi
    exit 0
    ;;
esac

case "$*" in
  *terragrunt-info*)
    echo 'time=2024-01-01T00:00:00Z level=info msg=Discovering modules'
    cat <<'INFO'
{info}INFO
    ;;
  *" plan "*)
    for arg in "$@"; do
      case "$arg" in
        -out=*) plan="${{arg#-out=}}" ;;
      esac
    done
    for dir in {working_dirs}; do
      touch "$dir/$plan"
    done
    {plan}
    ;;
  *)
    echo "unexpected arguments: $*" >&2
    exit 2
    ;;
esac
"#,
        info = info_lines(root, modules),
    )
}

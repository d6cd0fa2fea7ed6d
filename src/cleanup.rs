//! Removal of generated plan files from each module's working dir.
use std::fs;
use std::io;
use std::path::PathBuf;

use crate::discover::ProjectDirs;

/// Remove `plan_file` from every working dir, in order. The first failure,
/// including a file that was never written, stops the loop and is returned;
/// later dirs are left untouched.
pub fn cleanup_plan_files(dirs: &[ProjectDirs], plan_file: &str) -> io::Result<()> {
    if plan_file.is_empty() {
        return Ok(());
    }
    for dir in dirs {
        let path = dir.working_dir.join(plan_file);
        match fs::remove_file(&path) {
            Ok(()) => tracing::debug!(path = %path.display(), "removed plan file"),
            Err(err) => {
                return Err(io::Error::new(
                    err.kind(),
                    format!("remove {}: {err}", path.display()),
                ))
            }
        }
    }
    Ok(())
}

/// Runs `cleanup_plan_files` once when dropped. Armed with the plan file
/// name before the plan command runs, so removal is attempted even when
/// generation fails part way.
pub struct PlanFileGuard<'a> {
    dirs: &'a [ProjectDirs],
    plan_file: String,
}

impl<'a> PlanFileGuard<'a> {
    pub fn new(dirs: &'a [ProjectDirs], plan_file: impl Into<String>) -> Self {
        Self {
            dirs,
            plan_file: plan_file.into(),
        }
    }

    pub fn plan_file(&self) -> &str {
        &self.plan_file
    }

    pub fn plan_path(&self, dir: &ProjectDirs) -> PathBuf {
        dir.working_dir.join(&self.plan_file)
    }
}

impl Drop for PlanFileGuard<'_> {
    fn drop(&mut self) {
        if let Err(err) = cleanup_plan_files(self.dirs, &self.plan_file) {
            tracing::warn!("Error cleaning up plan files: {err}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn project_dirs(root: &TempDir, names: &[&str]) -> Vec<ProjectDirs> {
        names
            .iter()
            .map(|name| {
                let working_dir = root.path().join(name).join(".terragrunt-cache");
                fs::create_dir_all(&working_dir).expect("create working dir");
                ProjectDirs {
                    config_dir: root.path().join(name),
                    working_dir,
                }
            })
            .collect()
    }

    #[test]
    fn empty_plan_file_is_noop() {
        let root = TempDir::new().expect("tempdir");
        let dirs = project_dirs(&root, &["a", "b"]);
        let keep = dirs[0].working_dir.join("keep.txt");
        fs::write(&keep, "x").expect("write");
        cleanup_plan_files(&dirs, "").expect("noop");
        assert!(keep.exists());
    }

    #[test]
    fn removes_plan_file_everywhere() {
        let root = TempDir::new().expect("tempdir");
        let dirs = project_dirs(&root, &["a", "b", "c"]);
        for dir in &dirs {
            fs::write(dir.working_dir.join(".tfplan-1"), "plan").expect("write plan");
        }
        cleanup_plan_files(&dirs, ".tfplan-1").expect("cleanup");
        assert!(dirs.iter().all(|d| !d.working_dir.join(".tfplan-1").exists()));
    }

    #[test]
    fn missing_file_stops_the_loop() {
        let root = TempDir::new().expect("tempdir");
        let dirs = project_dirs(&root, &["a", "b"]);
        fs::write(dirs[1].working_dir.join(".tfplan-2"), "plan").expect("write plan");

        let err = cleanup_plan_files(&dirs, ".tfplan-2").expect_err("missing in a");
        assert_eq!(err.kind(), io::ErrorKind::NotFound);
        assert!(dirs[1].working_dir.join(".tfplan-2").exists());
    }

    #[test]
    fn first_failure_stops_the_loop() {
        let root = TempDir::new().expect("tempdir");
        let dirs = project_dirs(&root, &["a", "b", "c"]);
        fs::write(dirs[0].working_dir.join("plan"), "plan").expect("write plan");
        // A directory in place of the plan file cannot be removed as a file.
        fs::create_dir_all(dirs[1].working_dir.join("plan")).expect("create blocker");
        fs::write(dirs[2].working_dir.join("plan"), "plan").expect("write plan");

        let err = cleanup_plan_files(&dirs, "plan").expect_err("blocked");
        assert!(err.to_string().contains("remove"));
        assert!(!dirs[0].working_dir.join("plan").exists());
        assert!(dirs[1].working_dir.join("plan").is_dir());
        assert!(dirs[2].working_dir.join("plan").exists());
    }

    #[test]
    fn guard_cleans_up_on_drop() {
        let root = TempDir::new().expect("tempdir");
        let dirs = project_dirs(&root, &["a", "b"]);
        {
            let guard = PlanFileGuard::new(&dirs, ".tfplan-3");
            for dir in &dirs {
                fs::write(guard.plan_path(dir), "plan").expect("write plan");
            }
        }
        assert!(dirs.iter().all(|d| !d.working_dir.join(".tfplan-3").exists()));
    }
}

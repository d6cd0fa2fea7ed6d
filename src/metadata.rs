//! Project metadata detection from the module directory on disk.
use std::path::Path;

use crate::project::ProjectMetadata;

/// Derives project metadata from a module directory.
pub trait MetadataDetector {
    fn detect(&self, dir: &Path) -> ProjectMetadata;
}

/// Records the path and the enclosing git checkout, if any.
#[derive(Debug, Default, Clone, Copy)]
pub struct FsMetadataDetector;

impl MetadataDetector for FsMetadataDetector {
    fn detect(&self, dir: &Path) -> ProjectMetadata {
        let repo_root = dir
            .ancestors()
            .find(|ancestor| ancestor.join(".git").exists())
            .map(Path::to_path_buf);
        let sub_path = repo_root
            .as_deref()
            .and_then(|root| dir.strip_prefix(root).ok())
            .map(Path::to_path_buf);
        ProjectMetadata {
            path: dir.to_path_buf(),
            kind: String::new(),
            vcs_repo_root: repo_root,
            vcs_sub_path: sub_path,
        }
    }
}

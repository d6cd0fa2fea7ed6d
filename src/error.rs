//! Error taxonomy for the loader core.
//!
//! Configuration and compatibility errors are raised before any generation
//! subprocess runs. Subprocess errors carry the stage and directory so a
//! failure can be diagnosed without re-running. Cleanup problems are never
//! represented here; they are logged as warnings.
use std::fmt;
use std::path::PathBuf;
use std::process::ExitStatus;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Error parsing terragrunt flags: {0}")]
    FlagParse(#[from] shell_words::ParseError),

    #[error("{binary} not found: {reason}")]
    BinaryNotFound { binary: String, reason: String },

    #[error("{binary} {found} is not supported, please upgrade to {minimum} or later")]
    Incompatible {
        binary: String,
        found: Version,
        minimum: Version,
    },

    #[error("could not determine {binary} version from output: {output:?}")]
    VersionUnknown { binary: String, output: String },

    #[error("failed to run {binary} ({stage}) in {}: {source}", dir.display())]
    Spawn {
        binary: String,
        stage: Stage,
        dir: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{stage} failed in {} with status {status}{}", dir.display(), stderr_suffix(stderr))]
    Subprocess {
        stage: Stage,
        dir: PathBuf,
        status: ExitStatus,
        stderr: String,
    },

    #[error("Error parsing terragrunt-info output: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Error parsing Terraform JSON for {}: {source}", dir.display())]
    Parse {
        dir: PathBuf,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("expected {expected} payloads, got {actual}")]
    PayloadMismatch { expected: usize, actual: usize },

    #[error("{context}: {source}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },
}

pub type Result<T> = std::result::Result<T, Error>;

fn stderr_suffix(stderr: &str) -> String {
    let trimmed = stderr.trim();
    if trimmed.is_empty() {
        String::new()
    } else {
        format!(": {trimmed}")
    }
}

/// The orchestration step a subprocess belonged to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Info,
    Init,
    Plan,
    Show,
    Version,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Stage::Info => "terragrunt run-all terragrunt-info",
            Stage::Init => "terragrunt run-all init",
            Stage::Plan => "terragrunt run-all plan",
            Stage::Show => "terragrunt show",
            Stage::Version => "terragrunt --version",
        };
        f.write_str(label)
    }
}

/// A `major.minor.patch` binary version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Version {
    pub major: u64,
    pub minor: u64,
    pub patch: u64,
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "v{}.{}.{}", self.major, self.minor, self.patch)
    }
}

/// Results collected before a batch failed, returned next to the error.
#[derive(Debug)]
pub struct Partial<T> {
    pub items: Vec<T>,
    pub error: Error,
}

impl<T> fmt::Display for Partial<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.error, f)
    }
}

impl<T: fmt::Debug> std::error::Error for Partial<T> {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.error)
    }
}

impl<T> Partial<T> {
    pub fn new(items: Vec<T>, error: Error) -> Self {
        Self { items, error }
    }

    /// Drop the partial items and keep only the error.
    pub fn into_error(self) -> Error {
        self.error
    }
}

impl<T> From<Error> for Partial<T> {
    fn from(error: Error) -> Self {
        Self {
            items: Vec::new(),
            error,
        }
    }
}

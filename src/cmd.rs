//! Subprocess invocation for the orchestration binary.
use std::fmt;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus, Stdio};
use std::time::Instant;

use tempfile::NamedTempFile;

pub const DEFAULT_BINARY: &str = "terragrunt";
pub const DEFAULT_CLOUD_HOST: &str = "app.terraform.io";

/// Options for a single invocation. Dropping the options removes any
/// generated CLI config file.
#[derive(Debug, Default)]
pub struct CmdOptions {
    pub binary: String,
    pub dir: PathBuf,
    pub flags: Vec<String>,
    pub config_file: Option<GeneratedConfig>,
    pub workspace: Option<String>,
}

impl CmdOptions {
    pub fn new(binary: impl Into<String>, dir: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
            dir: dir.into(),
            ..Self::default()
        }
    }

    pub fn with_flags(mut self, flags: Vec<String>) -> Self {
        self.flags = flags;
        self
    }

    pub fn config_file_path(&self) -> Option<&Path> {
        self.config_file.as_ref().map(GeneratedConfig::path)
    }
}

/// A CLI config file written for one invocation scope.
pub struct GeneratedConfig {
    file: NamedTempFile,
}

impl GeneratedConfig {
    /// Write a credentials block for `host` so the binary can reach a
    /// Terraform Cloud backend without interactive login.
    pub fn credentials(host: &str, token: &str) -> std::io::Result<Self> {
        let mut file = tempfile::Builder::new()
            .prefix(".tgload-")
            .suffix(".tfrc")
            .tempfile()?;
        writeln!(file, "credentials \"{}\" {{", hcl_escape(host))?;
        writeln!(file, "  token = \"{}\"", hcl_escape(token))?;
        writeln!(file, "}}")?;
        file.flush()?;
        Ok(Self { file })
    }

    pub fn path(&self) -> &Path {
        self.file.path()
    }
}

/// Escape `raw` for use inside a quoted HCL string, including template
/// sequences.
fn hcl_escape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            '$' | '%' if chars.peek() == Some(&'{') => {
                out.push(c);
                out.push(c);
            }
            c => out.push(c),
        }
    }
    out
}

impl fmt::Debug for GeneratedConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GeneratedConfig")
            .field("path", &self.path())
            .finish()
    }
}

#[derive(Debug)]
pub enum CmdError {
    /// The binary could not be started at all.
    NotFound(std::io::Error),
    /// The binary ran and exited non-zero.
    Failed {
        status: ExitStatus,
        stdout: Vec<u8>,
        stderr: Vec<u8>,
    },
}

impl CmdError {
    pub fn stderr_text(&self) -> String {
        match self {
            CmdError::NotFound(err) => err.to_string(),
            CmdError::Failed { stderr, .. } => String::from_utf8_lossy(stderr).into_owned(),
        }
    }
}

impl fmt::Display for CmdError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CmdError::NotFound(err) => write!(f, "spawn failed: {err}"),
            CmdError::Failed { status, stderr, .. } => {
                let stderr = String::from_utf8_lossy(stderr);
                write!(f, "exited with status {status}: {}", stderr.trim())
            }
        }
    }
}

impl std::error::Error for CmdError {}

/// Runs the orchestration binary. The process implementation is
/// `SystemRunner`; tests substitute scripted runners.
pub trait CommandRunner {
    fn run(&self, opts: &CmdOptions, args: &[&str]) -> Result<Vec<u8>, CmdError>;

    /// Resolve `binary` to an executable, either an existing path or a name
    /// on `PATH`.
    fn locate(&self, binary: &str) -> Result<PathBuf, String> {
        let path = Path::new(binary);
        if path.components().count() > 1 && path.is_file() {
            return Ok(path.to_path_buf());
        }
        which::which(binary).map_err(|err| err.to_string())
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemRunner;

impl CommandRunner for SystemRunner {
    fn run(&self, opts: &CmdOptions, args: &[&str]) -> Result<Vec<u8>, CmdError> {
        let mut command = Command::new(&opts.binary);
        command
            .args(args)
            .args(&opts.flags)
            .current_dir(&opts.dir)
            .env("TF_IN_AUTOMATION", "true")
            .env("TF_INPUT", "0")
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        if let Some(path) = opts.config_file_path() {
            command.env("TF_CLI_CONFIG_FILE", path);
        }
        if let Some(workspace) = opts.workspace.as_deref() {
            command.env("TF_WORKSPACE", workspace);
        }

        tracing::debug!(
            dir = %opts.dir.display(),
            command = %format_command_line(&opts.binary, args, &opts.flags),
            "running command"
        );
        let start = Instant::now();
        let output = command.output().map_err(CmdError::NotFound)?;
        let elapsed_ms = start.elapsed().as_millis();

        tracing::info!(
            elapsed_ms,
            stdout_bytes = output.stdout.len(),
            stderr_bytes = output.stderr.len(),
            status = %output.status,
            "{} {} complete",
            opts.binary,
            args.first().copied().unwrap_or_default()
        );
        for line in String::from_utf8_lossy(&output.stderr).lines() {
            if !line.trim().is_empty() {
                tracing::debug!(target: "tgload::stderr", "{line}");
            }
        }

        if !output.status.success() {
            return Err(CmdError::Failed {
                status: output.status,
                stdout: output.stdout,
                stderr: output.stderr,
            });
        }
        Ok(output.stdout)
    }
}

pub fn format_command_line(binary: &str, args: &[&str], flags: &[String]) -> String {
    let mut words = Vec::with_capacity(args.len() + flags.len() + 1);
    words.push(binary);
    words.extend(args.iter().copied());
    words.extend(flags.iter().map(String::as_str));
    shell_words::join(words)
}

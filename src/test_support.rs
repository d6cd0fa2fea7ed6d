use std::cell::RefCell;
use std::path::PathBuf;
use std::process::ExitStatus;

use crate::cmd::{CmdError, CmdOptions, CommandRunner};

#[derive(Debug, Clone)]
pub(crate) struct RecordedCall {
    pub(crate) args: Vec<String>,
    pub(crate) dir: PathBuf,
    pub(crate) flags: Vec<String>,
    pub(crate) config_file: Option<PathBuf>,
}

impl RecordedCall {
    pub(crate) fn starts_with(&self, prefix: &[&str]) -> bool {
        self.args.len() >= prefix.len()
            && self.args.iter().zip(prefix).all(|(arg, want)| arg == want)
    }
}

type Responder = Box<dyn Fn(&CmdOptions, &[&str]) -> Result<Vec<u8>, CmdError>>;

/// Answers every invocation through `respond` and records what was asked.
pub(crate) struct ScriptedRunner {
    respond: Responder,
    calls: RefCell<Vec<RecordedCall>>,
}

impl ScriptedRunner {
    pub(crate) fn new(
        respond: impl Fn(&CmdOptions, &[&str]) -> Result<Vec<u8>, CmdError> + 'static,
    ) -> Self {
        Self {
            respond: Box::new(respond),
            calls: RefCell::new(Vec::new()),
        }
    }

    pub(crate) fn calls(&self) -> Vec<RecordedCall> {
        self.calls.borrow().clone()
    }

    pub(crate) fn count(&self, prefix: &[&str]) -> usize {
        self.calls
            .borrow()
            .iter()
            .filter(|call| call.starts_with(prefix))
            .count()
    }
}

impl CommandRunner for ScriptedRunner {
    fn run(&self, opts: &CmdOptions, args: &[&str]) -> Result<Vec<u8>, CmdError> {
        self.calls.borrow_mut().push(RecordedCall {
            args: args.iter().map(|arg| arg.to_string()).collect(),
            dir: opts.dir.clone(),
            flags: opts.flags.clone(),
            config_file: opts.config_file_path().map(|path| path.to_path_buf()),
        });
        (self.respond)(opts, args)
    }

    fn locate(&self, binary: &str) -> Result<PathBuf, String> {
        Ok(PathBuf::from(binary))
    }
}

#[cfg(unix)]
pub(crate) fn exit_status(code: i32) -> ExitStatus {
    use std::os::unix::process::ExitStatusExt;
    ExitStatus::from_raw(code << 8)
}

#[cfg(windows)]
pub(crate) fn exit_status(code: i32) -> ExitStatus {
    use std::os::windows::process::ExitStatusExt;
    ExitStatus::from_raw(code as u32)
}

pub(crate) fn failed(code: i32, stderr: &str) -> CmdError {
    CmdError::Failed {
        status: exit_status(code),
        stdout: Vec::new(),
        stderr: stderr.as_bytes().to_vec(),
    }
}

/// Answers `--version` with a supported release and everything else through
/// `respond`.
pub(crate) fn terragrunt(
    respond: impl Fn(&CmdOptions, &[&str]) -> Result<Vec<u8>, CmdError> + 'static,
) -> ScriptedRunner {
    ScriptedRunner::new(move |opts, args| {
        if args == ["--version"] {
            return Ok(b"terragrunt version v0.45.0\n".to_vec());
        }
        respond(opts, args)
    })
}

pub(crate) fn info_record(config_path: &str, working_dir: &str) -> String {
    format!(
        "{}\n",
        serde_json::json!({
            "ConfigPath": config_path,
            "DownloadDir": "/tmp/.terragrunt-cache",
            "IamRole": "",
            "TerraformBinary": "terraform",
            "TerraformCommand": "terragrunt-info",
            "WorkingDir": working_dir,
        })
    )
}

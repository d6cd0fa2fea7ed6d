//! Plan and state JSON generation across discovered modules.
//!
//! Every subprocess call is sequential: Terragrunt and Terraform take
//! module-local lock files, so the per-module `show` pass runs one module at
//! a time.
use std::path::Path;

use uuid::Uuid;

use crate::cleanup::PlanFileGuard;
use crate::cmd::{CmdError, CmdOptions, CommandRunner, GeneratedConfig};
use crate::config::ProjectConfig;
use crate::discover::{split_flags, subprocess_error, ProjectDirs};
use crate::error::{Error, Partial, Result, Stage};
use crate::progress::{ProgressSink, Spinner};
use crate::records::{is_json_object, strip_leading_noise};
use crate::version::check_binary;

pub type Payload = Vec<u8>;

const RUN_ALL: [&str; 2] = ["run-all", "--terragrunt-ignore-external-dependencies"];
const INIT_HINTS: [&str; 3] = ["terragrunt init", "terraform init", "tf init"];

/// Output of the aggregate plan run.
#[derive(Debug, Default)]
pub struct PlanOutput {
    /// Plan JSON the binary printed directly, covering every module.
    pub combined_json: Option<Payload>,
}

/// Generated payloads: one covering every module, or one per module in
/// discovery order.
#[derive(Debug, PartialEq, Eq)]
pub enum Payloads {
    Combined(Payload),
    PerProject(Vec<Payload>),
}

impl Payloads {
    pub fn into_vec(self) -> Vec<Payload> {
        match self {
            Payloads::Combined(json) => vec![json],
            Payloads::PerProject(outs) => outs,
        }
    }
}

pub struct Generator<'a> {
    runner: &'a dyn CommandRunner,
    sink: &'a dyn ProgressSink,
    config: &'a ProjectConfig,
}

impl<'a> Generator<'a> {
    pub fn new(
        runner: &'a dyn CommandRunner,
        sink: &'a dyn ProgressSink,
        config: &'a ProjectConfig,
    ) -> Self {
        Self {
            runner,
            sink,
            config,
        }
    }

    fn binary(&self) -> &str {
        self.config.binary()
    }

    /// Binary presence and minimum version.
    pub fn checks(&self) -> Result<()> {
        let found = check_binary(
            self.runner,
            self.binary(),
            &self.config.path,
            self.config.min_version(),
        )?;
        tracing::debug!(%found, "binary checks passed");
        Ok(())
    }

    /// Options rooted at `dir` with the shared flags, plus a generated CLI
    /// config file when cloud credentials are configured.
    pub fn build_cmd_opts(&self, dir: &Path) -> Result<CmdOptions> {
        let flags = split_flags(&self.config.terragrunt_flags)?;
        Ok(self.build_bare_opts(dir)?.with_flags(flags))
    }

    /// Like `build_cmd_opts` without the shared flags. Used for `show`
    /// against a plan file, which the flags do not apply to.
    fn build_bare_opts(&self, dir: &Path) -> Result<CmdOptions> {
        let mut opts = CmdOptions::new(self.binary(), dir);
        opts.workspace = self.config.workspace.clone();
        if let Some(token) = self.config.cloud_token.as_deref() {
            let host = self.config.cloud_host();
            let file = GeneratedConfig::credentials(host, token).map_err(|source| Error::Io {
                context: format!("write CLI config for {host}"),
                source,
            })?;
            tracing::debug!(path = %file.path().display(), "generated CLI config file");
            opts.config_file = Some(file);
        }
        Ok(opts)
    }

    /// One `show -json` per module, in discovery order. Stops at the first
    /// failure and returns the payloads gathered so far with the error.
    pub fn generate_state_jsons(
        &self,
        dirs: &[ProjectDirs],
    ) -> std::result::Result<Vec<Payload>, Partial<Payload>> {
        self.checks()?;

        let spinner = Spinner::start(self.sink, show_message(dirs.len()));
        let outs = self.show_each(dirs, None)?;
        spinner.success();
        Ok(outs)
    }

    /// Aggregate plan for all modules, then either the combined JSON it
    /// printed or one payload per module from `show`.
    pub fn generate_plan_jsons(
        &self,
        root: &Path,
        dirs: &[ProjectDirs],
    ) -> std::result::Result<Vec<Payload>, Partial<Payload>> {
        self.generate_plan(root, dirs).map(Payloads::into_vec)
    }

    /// Like `generate_plan_jsons`, keeping track of whether the payload is
    /// the combined one. Plan files are removed from every working dir on all
    /// exit paths.
    pub fn generate_plan(
        &self,
        root: &Path,
        dirs: &[ProjectDirs],
    ) -> std::result::Result<Payloads, Partial<Payload>> {
        self.checks()?;

        let opts = self.build_cmd_opts(root)?;
        let guard = PlanFileGuard::new(dirs, format!(".tfplan-{}", Uuid::new_v4()));

        let spinner = Spinner::start(self.sink, "Running terragrunt run-all plan");
        let plan = self.run_plan(&opts, guard.plan_file(), true)?;
        spinner.success();
        drop(opts);

        if let Some(json) = plan.combined_json {
            tracing::debug!(bytes = json.len(), "using combined plan JSON");
            return Ok(Payloads::Combined(json));
        }

        let spinner = Spinner::start(self.sink, show_message(dirs.len()));
        let outs = self.show_each(dirs, Some(&guard))?;
        spinner.success();
        Ok(Payloads::PerProject(outs))
    }

    fn show_each(
        &self,
        dirs: &[ProjectDirs],
        plan: Option<&PlanFileGuard<'_>>,
    ) -> std::result::Result<Vec<Payload>, Partial<Payload>> {
        let mut outs = Vec::with_capacity(dirs.len());
        for dir in dirs {
            let plan_path = plan.map(|guard| guard.plan_path(dir));
            match self.show_one(dir, plan_path.as_deref()) {
                Ok(out) => outs.push(out),
                Err(err) => return Err(Partial::new(outs, err)),
            }
        }
        Ok(outs)
    }

    fn show_one(&self, dir: &ProjectDirs, plan_path: Option<&Path>) -> Result<Payload> {
        let opts = match plan_path {
            Some(_) => self.build_bare_opts(&dir.config_dir)?,
            None => self.build_cmd_opts(&dir.config_dir)?,
        };
        let out = self.run_show(&opts, plan_path)?;
        Ok(strip_leading_noise(&out).to_vec())
    }

    pub fn run_plan(
        &self,
        opts: &CmdOptions,
        plan_file: &str,
        init_on_fail: bool,
    ) -> Result<PlanOutput> {
        let out_flag = format!("-out={plan_file}");
        let plan_flags = split_flags(&self.config.plan_flags)?;
        let mut args: Vec<&str> = RUN_ALL.to_vec();
        args.extend(["plan", "-input=false", "-lock=false", "-no-color", out_flag.as_str()]);
        args.extend(plan_flags.iter().map(String::as_str));

        let out = match self.runner.run(opts, &args) {
            Ok(out) => out,
            Err(err @ CmdError::Failed { .. })
                if init_on_fail && needs_init(&err.stderr_text()) =>
            {
                tracing::info!(dir = %opts.dir.display(), "plan requires init, running init first");
                self.run_init(opts)?;
                return self.run_plan(opts, plan_file, false);
            }
            Err(err) => return Err(subprocess_error(err, self.binary(), Stage::Plan, &opts.dir)),
        };

        let json = strip_leading_noise(&out);
        let combined_json = is_json_object(json).then(|| json.to_vec());
        Ok(PlanOutput { combined_json })
    }

    pub fn run_init(&self, opts: &CmdOptions) -> Result<()> {
        let mut args: Vec<&str> = RUN_ALL.to_vec();
        args.extend(["init", "-input=false", "-no-color"]);
        let spinner = Spinner::start(self.sink, "Running terragrunt run-all init");
        self.runner
            .run(opts, &args)
            .map_err(|err| subprocess_error(err, self.binary(), Stage::Init, &opts.dir))?;
        spinner.success();
        Ok(())
    }

    pub fn run_show(&self, opts: &CmdOptions, plan_path: Option<&Path>) -> Result<Payload> {
        let plan_arg = plan_path.map(|path| path.to_string_lossy().into_owned());
        let mut args = vec!["show", "-no-color", "-json"];
        if let Some(plan_arg) = plan_arg.as_deref() {
            args.push(plan_arg);
        }
        self.runner
            .run(opts, &args)
            .map_err(|err| subprocess_error(err, self.binary(), Stage::Show, &opts.dir))
    }
}

fn show_message(count: usize) -> String {
    if count > 1 {
        "Running terragrunt show for each project".to_string()
    } else {
        "Running terragrunt show".to_string()
    }
}

fn needs_init(stderr: &str) -> bool {
    INIT_HINTS.iter().any(|hint| stderr.contains(hint))
}

/// The root module stands in for every project when the plan produced one
/// combined payload.
pub fn combined_pseudo_dirs(root: &Path) -> ProjectDirs {
    ProjectDirs {
        config_dir: root.to_path_buf(),
        working_dir: root.to_path_buf(),
    }
}

#[cfg(test)]
#[path = "generate_tests.rs"]
mod tests;

//! CLI argument parsing for the loader.
//!
//! Flags given here override the config file and `TGLOAD_*` environment
//! variables.
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use crate::config::ProjectConfig;

/// Root CLI entrypoint.
#[derive(Parser, Debug)]
#[command(
    name = "tgload",
    version,
    about = "Load plan or state JSON for every module of a Terragrunt repo",
    after_help = "Examples:\n  tgload projects --path infra/live\n  tgload breakdown --path infra/live --out projects.json\n  tgload breakdown --path infra/live --use-state --usage-file usage.json\n  tgload breakdown --path infra/live --terragrunt-flags \"--terragrunt-log-level error\"",
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct RootArgs {
    /// Log at debug level (RUST_LOG overrides)
    #[arg(long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    Projects(ProjectsArgs),
    Breakdown(BreakdownArgs),
}

/// Inputs shared by every command that talks to Terragrunt.
#[derive(Args, Debug, Clone, Default)]
pub struct SourceArgs {
    /// Root directory containing the Terragrunt modules
    #[arg(long, value_name = "DIR")]
    pub path: Option<PathBuf>,

    /// Terragrunt binary name or path
    #[arg(long, value_name = "BIN")]
    pub binary: Option<String>,

    /// Extra flags passed to every terragrunt invocation
    #[arg(long, value_name = "FLAGS", allow_hyphen_values = true)]
    pub terragrunt_flags: Option<String>,

    /// Config file (defaults to <config dir>/tgload/config.json)
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,
}

impl SourceArgs {
    pub fn apply(&self, config: &mut ProjectConfig) {
        if let Some(path) = &self.path {
            config.path = path.clone();
        }
        if let Some(binary) = &self.binary {
            config.binary = Some(binary.clone());
        }
        if let Some(flags) = &self.terragrunt_flags {
            config.terragrunt_flags = flags.clone();
        }
    }
}

/// List discovered module directories.
#[derive(Parser, Debug)]
#[command(about = "List the Terragrunt modules under a directory")]
pub struct ProjectsArgs {
    #[command(flatten)]
    pub source: SourceArgs,

    /// Emit machine-readable JSON output
    #[arg(long)]
    pub json: bool,
}

/// Generate and assemble every module's resources.
#[derive(Parser, Debug)]
#[command(about = "Generate plan or state JSON for each module and assemble projects")]
pub struct BreakdownArgs {
    #[command(flatten)]
    pub source: SourceArgs,

    /// Read existing state instead of planning
    #[arg(long)]
    pub use_state: bool,

    /// Extra flags passed to the aggregate plan
    #[arg(long, value_name = "FLAGS", allow_hyphen_values = true, conflicts_with = "use_state")]
    pub plan_flags: Option<String>,

    /// Usage file with per-resource usage values
    #[arg(long, value_name = "PATH")]
    pub usage_file: Option<PathBuf>,

    /// Write projects JSON here instead of stdout
    #[arg(long, value_name = "PATH")]
    pub out: Option<PathBuf>,
}

impl BreakdownArgs {
    pub fn apply(&self, config: &mut ProjectConfig) {
        self.source.apply(config);
        if self.use_state {
            config.use_state = true;
        }
        if let Some(flags) = &self.plan_flags {
            config.plan_flags = flags.clone();
        }
    }
}

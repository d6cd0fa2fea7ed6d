use anyhow::{anyhow, Context, Result};
use clap::Parser;
use std::path::Path;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use tgload::cli::{BreakdownArgs, Command, ProjectsArgs, RootArgs, SourceArgs};
use tgload::cmd::SystemRunner;
use tgload::config::{resolve_config, validate_config, ProjectConfig};
use tgload::metadata::FsMetadataDetector;
use tgload::parser::TerraformJsonParser;
use tgload::progress::TracingSink;
use tgload::project::UsageMap;
use tgload::usage::load_usage_file;
use tgload::TerragruntProvider;

fn main() -> Result<()> {
    let args = RootArgs::parse();
    init_tracing(args.verbose);

    match args.command {
        Command::Projects(args) => cmd_projects(&args),
        Command::Breakdown(args) => cmd_breakdown(&args),
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "tgload=debug" } else { "tgload=info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false),
        )
        .init();
}

fn build_config(
    source: &SourceArgs,
    apply: impl FnOnce(&mut ProjectConfig),
) -> Result<ProjectConfig> {
    let mut config = resolve_config(source.config.as_deref())?;
    config.apply_env();
    apply(&mut config);
    if config.path.as_os_str().is_empty() {
        config.path = std::env::current_dir().context("resolve current dir")?;
    }
    if !config.path.is_dir() {
        return Err(anyhow!("path {} is not a directory", config.path.display()));
    }
    validate_config(&config)?;
    Ok(config)
}

fn cmd_projects(args: &ProjectsArgs) -> Result<()> {
    let config = build_config(&args.source, |config| args.source.apply(config))?;
    let provider = TerragruntProvider::new(
        &config,
        &SystemRunner,
        &TracingSink,
        &TerraformJsonParser,
        &FsMetadataDetector,
    );
    let dirs = provider.project_dirs()?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&dirs)?);
        return Ok(());
    }
    if dirs.is_empty() {
        println!(
            "No modules found in {} {}",
            provider.display_type(),
            config.path.display()
        );
        return Ok(());
    }
    for dir in &dirs {
        println!("{}\t{}", dir.config_dir.display(), dir.working_dir.display());
    }
    Ok(())
}

fn cmd_breakdown(args: &BreakdownArgs) -> Result<()> {
    let config = build_config(&args.source, |config| args.apply(config))?;
    let usage = match args.usage_file.as_deref() {
        Some(path) => load_usage_file(path)?,
        None => UsageMap::new(),
    };

    let provider = TerragruntProvider::new(
        &config,
        &SystemRunner,
        &TracingSink,
        &TerraformJsonParser,
        &FsMetadataDetector,
    );
    let projects = match provider.load_resources(&usage) {
        Ok(projects) => projects,
        Err(partial) => {
            if !partial.items.is_empty() {
                tracing::warn!(
                    assembled = partial.items.len(),
                    "discarding partially assembled projects"
                );
            }
            return Err(partial.into_error().into());
        }
    };

    let text = serde_json::to_string_pretty(&projects).context("serialize projects")?;
    match args.out.as_deref() {
        Some(out) => write_output(out, &text)?,
        None => println!("{text}"),
    }
    Ok(())
}

fn write_output(path: &Path, text: &str) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).with_context(|| format!("create {}", parent.display()))?;
    }
    std::fs::write(path, text.as_bytes()).with_context(|| format!("write {}", path.display()))?;
    tracing::info!(path = %path.display(), "wrote projects");
    Ok(())
}

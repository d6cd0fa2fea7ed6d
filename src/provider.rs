//! Terragrunt provider: discovery, generation and assembly.
use std::path::Path;

use crate::cmd::CommandRunner;
use crate::config::ProjectConfig;
use crate::discover::{discover_project_dirs, ProjectDirs};
use crate::error::{Error, Partial};
use crate::generate::{combined_pseudo_dirs, Generator, Payload, Payloads};
use crate::metadata::MetadataDetector;
use crate::parser::ResourceParser;
use crate::progress::ProgressSink;
use crate::project::{project_name, Project, UsageMap};

pub const PROVIDER_TYPE: &str = "terragrunt";

pub struct TerragruntProvider<'a> {
    config: &'a ProjectConfig,
    runner: &'a dyn CommandRunner,
    sink: &'a dyn ProgressSink,
    parser: &'a dyn ResourceParser,
    detector: &'a dyn MetadataDetector,
}

impl<'a> TerragruntProvider<'a> {
    pub fn new(
        config: &'a ProjectConfig,
        runner: &'a dyn CommandRunner,
        sink: &'a dyn ProgressSink,
        parser: &'a dyn ResourceParser,
        detector: &'a dyn MetadataDetector,
    ) -> Self {
        Self {
            config,
            runner,
            sink,
            parser,
            detector,
        }
    }

    pub fn display_type(&self) -> &'static str {
        "Terragrunt directory"
    }

    fn root(&self) -> &Path {
        &self.config.path
    }

    /// Project dirs under the configured root, sorted by config dir.
    pub fn project_dirs(&self) -> Result<Vec<ProjectDirs>, Error> {
        discover_project_dirs(
            self.runner,
            self.sink,
            self.config.binary(),
            self.root(),
            &self.config.terragrunt_flags,
        )
    }

    /// Discover, generate and assemble every project. On a parse failure the
    /// projects assembled so far come back with the error.
    pub fn load_resources(&self, usage: &UsageMap) -> Result<Vec<Project>, Partial<Project>> {
        // Commands run from the config dirs; Terraform runs in the working
        // dirs, which is where plan files are written and removed.
        let dirs = self.project_dirs()?;
        tracing::info!(
            count = dirs.len(),
            root = %self.root().display(),
            use_state = self.config.use_state,
            "loading terragrunt projects"
        );

        let generator = Generator::new(self.runner, self.sink, self.config);
        if self.config.use_state {
            let outs = generator
                .generate_state_jsons(&dirs)
                .map_err(Partial::into_error)?;
            return self.assemble(&dirs, outs, usage);
        }

        match generator
            .generate_plan(self.root(), &dirs)
            .map_err(Partial::into_error)?
        {
            Payloads::Combined(json) => {
                self.assemble(&[combined_pseudo_dirs(self.root())], vec![json], usage)
            }
            Payloads::PerProject(outs) => self.assemble(&dirs, outs, usage),
        }
    }

    /// Pair payloads with their project dirs and parse each one.
    pub fn assemble(
        &self,
        dirs: &[ProjectDirs],
        outs: Vec<Payload>,
        usage: &UsageMap,
    ) -> Result<Vec<Project>, Partial<Project>> {
        if outs.len() != dirs.len() {
            return Err(Error::PayloadMismatch {
                expected: dirs.len(),
                actual: outs.len(),
            }
            .into());
        }

        let mut projects = Vec::with_capacity(dirs.len());
        for (dir, out) in dirs.iter().zip(outs) {
            let mut metadata = self.detector.detect(&dir.config_dir);
            metadata.kind = PROVIDER_TYPE.to_string();
            let name = project_name(&metadata, self.config.enable_dashboard);
            let mut project = Project::new(name, metadata);

            let (past_resources, resources) = match self.parser.parse_json(&out, usage) {
                Ok(parsed) => parsed,
                Err(err) => {
                    let error = Error::Parse {
                        dir: dir.config_dir.clone(),
                        source: err.into(),
                    };
                    return Err(Partial::new(projects, error));
                }
            };

            project.has_diff = !self.config.use_state;
            if project.has_diff {
                project.past_resources = past_resources;
            }
            project.resources = resources;
            tracing::debug!(
                project = %project.name,
                resources = project.resources.len(),
                "assembled project"
            );
            projects.push(project);
        }
        Ok(projects)
    }
}

//! Release workflow orchestration
//!
//! Wires the real collaborators (git, terminal prompt, GitHub API, changelog
//! generator) into the pipeline. Kept apart from `main` so the workflow can
//! be called without clap.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::changelog::ConventionalChangelog;
use crate::config::{load_config, write_default_config, CONFIG_FILE_NAME};
use crate::git::SystemGit;
use crate::github::GitHubApi;
use crate::options::ReleaseOptions;
use crate::pipeline::{Pipeline, PipelineOutcome};
use crate::ui::{self, TerminalPrompt};

/// Arguments for the release workflow, independent of the CLI parser
#[derive(Debug, Clone, PartialEq)]
pub struct ReleaseWorkflowArgs {
    pub options: ReleaseOptions,
    pub config_path: Option<PathBuf>,
    pub workdir: PathBuf,
}

/// Run a release in `args.workdir`
pub fn run_release_workflow(args: ReleaseWorkflowArgs) -> Result<PipelineOutcome> {
    let loaded = load_config(args.config_path.as_deref()).context("Failed to load configuration")?;

    let git = SystemGit::new(&args.workdir).dry_run(args.options.dry_run);
    let prompt = TerminalPrompt;
    let host = GitHubApi::new();
    let changelog = ConventionalChangelog::new();
    let pipeline = Pipeline::new(&git, &prompt, &host, &changelog);

    let dry_run = args.options.dry_run;
    let outcome = pipeline.run(args.options, loaded, &args.workdir)?;

    let version = outcome.context.version();
    if dry_run {
        ui::display_success(&format!("Dry run complete, would release {}", version));
    } else {
        ui::display_success(&format!("Released {} {}", outcome.context.name, version));
    }
    Ok(outcome)
}

/// Write the default configuration into `dir`
pub fn run_init(dir: &Path, force: bool) -> Result<PathBuf> {
    let path = dir.join(CONFIG_FILE_NAME);
    write_default_config(&path, force)?;
    ui::display_success(&format!("Wrote {}", path.display()));
    Ok(path)
}

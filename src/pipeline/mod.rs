//! Pipeline driver.
//!
//! A run is a fixed sequence:
//!
//! `context → preflight → version → bump → changelog → commit → tag → push → release`
//!
//! Every side-effecting stage that succeeds registers its compensation on a
//! [RollbackStack]. When a stage fails the stack is unwound against the last
//! good context and the original error is returned.

pub mod preflight;
pub mod rollback;
pub mod stages;

pub use rollback::{BranchState, Compensation, RollbackReport, RollbackStack};
pub use stages::StageOutput;

use std::fmt;
use std::path::Path;

use tracing::{error, info};

use crate::boundary::BoundaryWarning;
use crate::changelog::ChangelogGenerator;
use crate::config::LoadedConfig;
use crate::context::ReleaseContext;
use crate::error::{KiaraError, Result};
use crate::git::Git;
use crate::github::ReleaseHost;
use crate::options::ReleaseOptions;
use crate::resolver::VersionResolver;
use crate::ui::{self, Prompt};

/// Named steps of a release run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    BuildContext,
    VerifyPreconditions,
    ResolveVersion,
    Bump,
    Changelog,
    Commit,
    Tag,
    Push,
    Release,
}

impl Stage {
    /// Stages that change files or remote state, in execution order
    pub const MUTATING: [Stage; 6] = [
        Stage::Bump,
        Stage::Changelog,
        Stage::Commit,
        Stage::Tag,
        Stage::Push,
        Stage::Release,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Stage::BuildContext => "context",
            Stage::VerifyPreconditions => "preflight",
            Stage::ResolveVersion => "version",
            Stage::Bump => "bump",
            Stage::Changelog => "changelog",
            Stage::Commit => "commit",
            Stage::Tag => "tag",
            Stage::Push => "push",
            Stage::Release => "release",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A finished run
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineOutcome {
    pub context: ReleaseContext,
    pub warnings: Vec<BoundaryWarning>,
}

/// The release pipeline with its collaborators
pub struct Pipeline<'a> {
    git: &'a dyn Git,
    prompt: &'a dyn Prompt,
    host: &'a dyn ReleaseHost,
    changelog: &'a dyn ChangelogGenerator,
}

impl<'a> Pipeline<'a> {
    pub fn new(
        git: &'a dyn Git,
        prompt: &'a dyn Prompt,
        host: &'a dyn ReleaseHost,
        changelog: &'a dyn ChangelogGenerator,
    ) -> Self {
        Pipeline {
            git,
            prompt,
            host,
            changelog,
        }
    }

    /// Execute a full release run
    pub fn run(
        &self,
        options: ReleaseOptions,
        loaded: LoadedConfig,
        workdir: &Path,
    ) -> Result<PipelineOutcome> {
        options.validate()?;

        let ctx = ReleaseContext::build(options, loaded, workdir, self.git)
            .map_err(|e| e.in_stage(Stage::BuildContext.name()))?;

        let mut warnings = preflight::verify(&ctx, self.git, self.host)
            .map_err(|e| e.in_stage(Stage::VerifyPreconditions.name()))?;
        report(&warnings);

        let ctx = self
            .resolve(ctx, &mut warnings)
            .map_err(|e| e.in_stage(Stage::ResolveVersion.name()))?;

        let context = self.execute(ctx)?;
        Ok(PipelineOutcome { context, warnings })
    }

    fn resolve(
        &self,
        ctx: ReleaseContext,
        warnings: &mut Vec<BoundaryWarning>,
    ) -> Result<ReleaseContext> {
        if ctx.new_version.is_some() {
            ui::display_skip(
                &format!("Keeping version {}", ctx.current_version),
                "--skip-bump",
            );
            return Ok(ctx);
        }

        let resolution = VersionResolver::new(self.git, self.prompt).resolve(&ctx)?;
        report(&resolution.warnings);
        warnings.extend(resolution.warnings);
        ui::display_version_plan(
            &ctx.current_version,
            &resolution.version,
            resolution.reason.as_deref(),
        );

        ctx.with_new_version(resolution.version, Some(resolution.release_type))
    }

    fn run_stage(&self, stage: Stage, ctx: &ReleaseContext) -> Result<StageOutput> {
        match stage {
            Stage::Bump => stages::bump(ctx),
            Stage::Changelog => stages::changelog(ctx, self.changelog, self.git),
            Stage::Commit => stages::commit(ctx, self.git),
            Stage::Tag => stages::tag(ctx, self.git),
            Stage::Push => stages::push(ctx, self.git),
            Stage::Release => stages::release(ctx, self.host),
            other => Err(KiaraError::validation(format!(
                "'{}' is not a side-effecting stage",
                other
            ))),
        }
    }

    /// Run the side-effecting stages, unwinding on the first failure
    pub fn execute(&self, mut ctx: ReleaseContext) -> Result<ReleaseContext> {
        let mut stack = RollbackStack::new();

        for stage in Stage::MUTATING {
            info!(stage = %stage, "running stage");
            match self.run_stage(stage, &ctx) {
                Ok(StageOutput {
                    context,
                    compensation,
                }) => {
                    if let Some(compensation) = compensation {
                        let description = format!("{}: {}", stage, compensation.describe());
                        stack.push(compensation, description);
                    }
                    ctx = context;
                }
                Err(e) => {
                    error!(stage = %stage, error = %e, "stage failed, rolling back");
                    let rollback = stack.unwind(&ctx, self.git);
                    ui::display_rollback(&rollback.completed);
                    report(&rollback.failures);
                    return Err(e.in_stage(stage.name()));
                }
            }
        }

        Ok(ctx)
    }
}

fn report(warnings: &[BoundaryWarning]) {
    for warning in warnings {
        ui::display_boundary_warning(warning);
    }
}

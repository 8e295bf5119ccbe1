//! Environment and repository checks run before anything is changed.
//!
//! Each check can be switched off in `[preflight]` or `[git]`. During a dry
//! run a failing check becomes a warning so the preview still completes.

use tracing::debug;

use crate::boundary::BoundaryWarning;
use crate::context::ReleaseContext;
use crate::error::{KiaraError, Result};
use crate::git::Git;
use crate::github::ReleaseHost;

fn config_file(ctx: &ReleaseContext) -> Result<()> {
    if ctx.configuration.preflight.require_config_file && ctx.config_source.is_none() {
        return Err(KiaraError::precondition(format!(
            "No {} configuration file found",
            crate::config::CONFIG_FILE_NAME
        )));
    }
    Ok(())
}

fn manifest(ctx: &ReleaseContext) -> Result<()> {
    let manifest = ctx.manifest();
    if ctx.configuration.preflight.require_manifest && !manifest.exists() {
        return Err(KiaraError::precondition(format!(
            "Manifest {} not found",
            manifest.path().display()
        )));
    }
    Ok(())
}

fn work_tree(git: &dyn Git) -> Result<()> {
    if !git.is_inside_work_tree()? {
        return Err(KiaraError::precondition(
            "Could not find a git repository in the current working directory",
        ));
    }
    Ok(())
}

fn clean_working_dir(ctx: &ReleaseContext, git: &dyn Git) -> Result<()> {
    if ctx.configuration.git.require_clean_working_dir && !git.is_clean()? {
        return Err(KiaraError::precondition(
            "There are uncommitted changes in the working directory",
        ));
    }
    Ok(())
}

fn release_branch(ctx: &ReleaseContext, git: &dyn Git) -> Result<()> {
    let git_config = &ctx.configuration.git;
    if !git_config.require_branch {
        return Ok(());
    }

    match git.current_branch()? {
        Some(branch) if git_config.branches.iter().any(|b| b == &branch) => Ok(()),
        Some(branch) => Err(KiaraError::precondition(format!(
            "Branch '{}' is not a release branch (expected one of: {})",
            branch,
            git_config.branches.join(", ")
        ))),
        None => Err(KiaraError::precondition("HEAD is detached; check out a release branch")),
    }
}

fn upstream(ctx: &ReleaseContext, git: &dyn Git) -> Result<()> {
    if ctx.configuration.git.require_upstream && git.upstream()?.is_none() {
        return Err(KiaraError::precondition(
            "The current branch has no upstream; push it with --set-upstream first",
        ));
    }
    Ok(())
}

fn token(ctx: &ReleaseContext, host: &dyn ReleaseHost) -> Result<()> {
    if !ctx.will_release() || !ctx.configuration.preflight.verify_token {
        return Ok(());
    }
    let token = ctx
        .token
        .as_deref()
        .ok_or_else(|| KiaraError::precondition("No authentication token provided"))?;
    host.verify_token(token)
}

/// Run every enabled check.
///
/// Returns the checks that failed during a dry run; outside a dry run the
/// first failure is returned as the error.
pub fn verify(
    ctx: &ReleaseContext,
    git: &dyn Git,
    host: &dyn ReleaseHost,
) -> Result<Vec<BoundaryWarning>> {
    let mut warnings = Vec::new();
    let mut record = |name: &str, outcome: Result<()>| -> Result<()> {
        match outcome {
            Ok(()) => {
                debug!(check = name, "preflight passed");
                Ok(())
            }
            Err(e) if ctx.options.dry_run => {
                warnings.push(BoundaryWarning::PreflightFailedInDryRun {
                    check: name.to_string(),
                    reason: e.to_string(),
                });
                Ok(())
            }
            Err(e) => Err(e),
        }
    };

    record("config-file", config_file(ctx))?;
    record("manifest", manifest(ctx))?;
    record("git-repository", work_tree(git))?;
    record("clean-working-dir", clean_working_dir(ctx, git))?;
    record("release-branch", release_branch(ctx, git))?;
    record("upstream", upstream(ctx, git))?;
    record("token", token(ctx, host))?;

    Ok(warnings)
}

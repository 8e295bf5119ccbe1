//! The six side-effecting stages.
//!
//! Each stage reads the context it is given and returns a new one, together
//! with the compensation that undoes whatever it changed. In dry-run mode
//! stages only report what they would do and register nothing.

use tracing::{debug, info};

use crate::boundary::BoundaryWarning;
use crate::changelog::{self, ChangelogGenerator};
use crate::context::ReleaseContext;
use crate::error::{KiaraError, Result};
use crate::git::{expect_silent, Git};
use crate::github::{ReleaseHost, ReleaseRequest};
use crate::pipeline::rollback::{BranchState, Compensation};
use crate::ui;

/// Result of a stage: the next context and how to undo the stage
#[derive(Debug, Clone, PartialEq)]
pub struct StageOutput {
    pub context: ReleaseContext,
    pub compensation: Option<Compensation>,
}

impl StageOutput {
    fn unchanged(ctx: &ReleaseContext) -> Self {
        StageOutput {
            context: ctx.clone(),
            compensation: None,
        }
    }

    fn skipped(ctx: &ReleaseContext, message: &str, reason: &str) -> Self {
        ui::display_skip(message, reason);
        Self::unchanged(ctx)
    }
}

pub fn bump_skip_reason(ctx: &ReleaseContext) -> Option<&'static str> {
    if ctx.options.skip_bump {
        Some("--skip-bump")
    } else if ctx.is_version_unchanged() {
        Some("no bump needed")
    } else {
        None
    }
}

pub fn changelog_skip_reason(ctx: &ReleaseContext) -> Option<&'static str> {
    if ctx.options.skip_changelog {
        Some("--skip-changelog")
    } else if ctx.options.bump_only {
        Some("--bump-only")
    } else if !ctx.configuration.changelog.enabled {
        Some("disabled in configuration")
    } else {
        None
    }
}

pub fn commit_skip_reason(ctx: &ReleaseContext) -> Option<&'static str> {
    if let Some(flag) = ctx.options.bump_only_flag() {
        Some(flag)
    } else if ctx.options.skip_commit {
        Some("--skip-commit")
    } else if ctx.is_version_unchanged() && ctx.changelog_content.is_empty() {
        Some("nothing to commit")
    } else {
        None
    }
}

pub fn tag_skip_reason(ctx: &ReleaseContext) -> Option<&'static str> {
    if let Some(flag) = ctx.options.bump_only_flag() {
        Some(flag)
    } else if ctx.options.skip_tag {
        Some("--skip-tag")
    } else {
        None
    }
}

pub fn release_skip_reason(ctx: &ReleaseContext) -> Option<&'static str> {
    if ctx.options.skip_release {
        Some("--skip-release")
    } else if let Some(flag) = ctx.options.bump_only_flag() {
        Some(flag)
    } else if !ctx.configuration.github.release.enabled {
        Some("disabled in configuration")
    } else {
        None
    }
}

/// Rewrite the manifest version
pub fn bump(ctx: &ReleaseContext) -> Result<StageOutput> {
    if let Some(reason) = bump_skip_reason(ctx) {
        return Ok(StageOutput::skipped(ctx, "Skipping version bump", reason));
    }

    let manifest = ctx.manifest();
    let path = ctx.configuration.manifest.path.clone();
    if ctx.options.dry_run {
        ui::display_dry_run(&format!("Would update {} to version {}", path, ctx.version()));
        return Ok(StageOutput::unchanged(ctx));
    }

    let previous = manifest.version()?;
    manifest.set_version(&ctx.version().to_string())?;
    ui::display_success(&format!("Updated {} to {}", path, ctx.version()));

    Ok(StageOutput {
        context: ctx.clone(),
        compensation: Some(Compensation::RestoreManifest { path, previous }),
    })
}

/// Render the changelog section and prepend it to the changelog file
pub fn changelog(
    ctx: &ReleaseContext,
    generator: &dyn ChangelogGenerator,
    git: &dyn Git,
) -> Result<StageOutput> {
    if let Some(reason) = changelog_skip_reason(ctx) {
        return Ok(StageOutput::skipped(ctx, "Skipping changelog", reason));
    }

    let header = &ctx.configuration.changelog.header;
    let section = generator.generate(ctx, git)?;
    if section.trim().is_empty() {
        return Ok(StageOutput::skipped(ctx, "Skipping changelog", "no changes to record"));
    }
    let content = changelog::compose(header, &section);
    let path = ctx.configuration.changelog.path.clone();

    if ctx.options.dry_run {
        ui::display_dry_run(&format!("Would prepend the {} section to {}", ctx.tag_name(), path));
        debug!(changelog = %section, "changelog preview");
        return Ok(StageOutput {
            context: ctx.clone().with_changelog(content),
            compensation: None,
        });
    }

    let created = changelog::prepend(&ctx.changelog_path(), header, &section)?;
    ui::display_success(&format!("Updated {}", path));

    Ok(StageOutput {
        context: ctx.clone().with_changelog(content),
        compensation: Some(Compensation::RestoreChangelog { path, created }),
    })
}

/// Files the release commit should contain
fn release_files(ctx: &ReleaseContext) -> Vec<String> {
    let mut files = Vec::new();
    if bump_skip_reason(ctx).is_none() {
        files.push(ctx.configuration.manifest.path.clone());
    }
    if !ctx.changelog_content.is_empty() && ctx.changelog_path().exists() {
        files.push(ctx.configuration.changelog.path.clone());
    }
    files
}

/// Stage the manifest and changelog and create the release commit
pub fn commit(ctx: &ReleaseContext, git: &dyn Git) -> Result<StageOutput> {
    if let Some(reason) = commit_skip_reason(ctx) {
        return Ok(StageOutput::skipped(ctx, "Skipping commit", reason));
    }

    let message = ctx.commit_message();
    if ctx.options.dry_run {
        ui::display_dry_run(&format!("Would commit \"{}\"", message));
        return Ok(StageOutput::unchanged(ctx));
    }

    let files = release_files(ctx);
    if files.is_empty() {
        return Ok(StageOutput::skipped(ctx, "Skipping commit", "nothing to commit"));
    }

    let previous_sha = git.head_sha()?;
    let paths: Vec<&str> = files.iter().map(String::as_str).collect();
    expect_silent("git add", &git.add(&paths)?)?;
    if let Err(e) = git.commit(&message) {
        if let Err(undo) = git.unstage(&paths) {
            debug!(error = %undo, "could not unstage release files");
        }
        return Err(e);
    }
    ui::display_success(&format!("Committed \"{}\"", message));

    Ok(StageOutput {
        context: ctx.clone(),
        compensation: Some(Compensation::ResetCommit {
            previous_sha,
            paths: files,
        }),
    })
}

/// Create the annotated release tag, signed when a signing key is configured
pub fn tag(ctx: &ReleaseContext, git: &dyn Git) -> Result<StageOutput> {
    if let Some(reason) = tag_skip_reason(ctx) {
        return Ok(StageOutput::skipped(ctx, "Skipping tag", reason));
    }

    let tag = ctx.tag_name();
    let annotation = ctx.tag_annotation();
    let sign = git.signing_key()?.is_some();

    if ctx.options.dry_run {
        let kind = if sign { "signed tag" } else { "tag" };
        ui::display_dry_run(&format!("Would create {} {}", kind, tag));
        return Ok(StageOutput::unchanged(ctx));
    }

    git.create_tag(&tag, &annotation, sign)?;
    ui::display_success(&format!("Created tag {}", tag));

    Ok(StageOutput {
        context: ctx.clone(),
        compensation: Some(Compensation::DeleteTag { tag }),
    })
}

/// Remote and branch the release commit goes to
fn push_target(ctx: &ReleaseContext, git: &dyn Git) -> Result<(String, String)> {
    if let Some(upstream) = git.upstream()? {
        return Ok((upstream.remote, upstream.branch));
    }
    let branch = git.current_branch()?.ok_or_else(|| {
        KiaraError::git("Cannot push from a detached HEAD; check out a branch first")
    })?;
    Ok((ctx.configuration.git.remote.clone(), branch))
}

/// Push the release commit, then the tag, as separate operations
pub fn push(ctx: &ReleaseContext, git: &dyn Git) -> Result<StageOutput> {
    if let Some(flag) = ctx.options.bump_only_flag() {
        return Ok(StageOutput::skipped(ctx, "Skipping push", flag));
    }

    let push_commit = !ctx.options.skip_push && commit_skip_reason(ctx).is_none();
    let push_tag = !ctx.options.skip_push_tag && tag_skip_reason(ctx).is_none();
    if !push_commit && !push_tag {
        let reason = if ctx.options.skip_push && ctx.options.skip_push_tag {
            "--skip-push --skip-push-tag"
        } else {
            "nothing to push"
        };
        return Ok(StageOutput::skipped(ctx, "Skipping push", reason));
    }

    let (remote, branch) = push_target(ctx, git)?;
    let tag = ctx.tag_name();

    if ctx.options.dry_run {
        if push_commit {
            ui::display_dry_run(&format!("Would push {} to {}", branch, remote));
        }
        if push_tag {
            ui::display_dry_run(&format!("Would push tag {} to {}", tag, remote));
        }
        return Ok(StageOutput::unchanged(ctx));
    }

    let mut pushed_branch = None;
    if push_commit {
        let previous_sha = git.remote_branch_sha(&remote, &branch)?;
        expect_silent("git push", &git.push_branch(&remote, &branch)?)?;
        ui::display_success(&format!("Pushed {} to {}", branch, remote));
        pushed_branch = Some(BranchState {
            name: branch,
            previous_sha,
        });
    } else {
        ui::display_skip("Skipping commit push", "--skip-push");
    }

    let mut pushed_tag = None;
    if push_tag {
        let pushed = git
            .push_tag(&remote, &tag)
            .and_then(|output| expect_silent("git push", &output));
        if let Err(e) = pushed {
            if pushed_branch.is_some() {
                let partial = Compensation::RevertPush {
                    remote: remote.clone(),
                    tag: None,
                    branch: pushed_branch,
                };
                info!(action = %partial.describe(), "undoing partial push");
                if let Err(undo) = partial.apply(ctx, git) {
                    ui::display_boundary_warning(&BoundaryWarning::RollbackFailed {
                        action: partial.describe(),
                        reason: undo.to_string(),
                    });
                }
            }
            return Err(e);
        }
        ui::display_success(&format!("Pushed tag {} to {}", tag, remote));
        pushed_tag = Some(tag);
    } else {
        ui::display_skip("Skipping tag push", "--skip-push-tag");
    }

    Ok(StageOutput {
        context: ctx.clone(),
        compensation: Some(Compensation::RevertPush {
            remote,
            tag: pushed_tag,
            branch: pushed_branch,
        }),
    })
}

/// Publish the release on GitHub
pub fn release(ctx: &ReleaseContext, host: &dyn ReleaseHost) -> Result<StageOutput> {
    if let Some(reason) = release_skip_reason(ctx) {
        return Ok(StageOutput::skipped(ctx, "Skipping GitHub release", reason));
    }

    let body = changelog::strip_header(&ctx.changelog_content, &ctx.configuration.changelog.header);
    if ctx.options.dry_run {
        ui::display_dry_run(&format!(
            "Would create GitHub release \"{}\" for {}",
            ctx.release_title(),
            ctx.tag_name()
        ));
        return Ok(StageOutput::unchanged(ctx));
    }

    let token = ctx.require_token()?;
    let request = ReleaseRequest::from_context(ctx, body)?;
    debug!(
        tag = %request.tag_name,
        draft = request.draft,
        prerelease = request.prerelease,
        make_latest = %request.make_latest,
        generate_release_notes = request.generate_release_notes,
        "release request"
    );
    let published = host.create_release(token, &request)?;
    ui::display_success(&format!("Created GitHub release {}", published.html_url));

    Ok(StageOutput::unchanged(ctx))
}

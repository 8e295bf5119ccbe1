use tracing::debug;

use crate::analyzer::VersionAnalyzer;
use crate::boundary::BoundaryWarning;
use crate::context::ReleaseContext;
use crate::domain::{increment, ParsedCommit};
use crate::error::Result;
use crate::git::Git;
use crate::resolver::Resolution;

/// Derive the bump from the conventional commits since the latest tag.
///
/// An empty range still yields a patch bump, with a warning.
pub fn resolve(ctx: &ReleaseContext, git: &dyn Git) -> Result<Resolution> {
    let latest_tag = git.latest_tag()?;
    let commits = git.commits_since(latest_tag.as_deref())?;
    debug!(latest_tag = ?latest_tag, commits = commits.len(), "analyzing commits");

    let mut warnings = Vec::new();
    if commits.is_empty() {
        warnings.push(BoundaryWarning::NoCommitsSinceTag {
            latest_tag: latest_tag.clone(),
        });
    }

    let parsed: Vec<ParsedCommit> = commits
        .iter()
        .map(|commit| ParsedCommit::parse(&commit.message))
        .collect();
    let analysis = VersionAnalyzer::new().analyze_commits(&parsed);
    let release_type = analysis.level().release_type();
    let pre = ctx.options.pre_release();
    let version = increment(&ctx.current_version, release_type, &pre)?;

    Ok(Resolution {
        version,
        release_type,
        reason: Some(analysis.reason()),
        warnings,
    })
}

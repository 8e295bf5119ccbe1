use std::fmt;

/// Non-fatal conditions met while releasing.
/// These never stop the pipeline but are always reported to the user.
#[derive(Debug, Clone, PartialEq)]
pub enum BoundaryWarning {
    /// Nothing was committed since the latest tag
    NoCommitsSinceTag { latest_tag: Option<String> },
    /// The resolved version equals the current one
    VersionUnchanged { version: String },
    /// A preflight check failed while running with `--dry-run`
    PreflightFailedInDryRun { check: String, reason: String },
    /// A compensating action could not undo its stage
    RollbackFailed { action: String, reason: String },
}

impl fmt::Display for BoundaryWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BoundaryWarning::NoCommitsSinceTag { latest_tag } => match latest_tag {
                Some(tag) => write!(f, "No commits since tag '{}'", tag),
                None => write!(f, "No commits found in the repository history"),
            },
            BoundaryWarning::VersionUnchanged { version } => {
                write!(f, "Version {} is unchanged, no bump needed", version)
            }
            BoundaryWarning::PreflightFailedInDryRun { check, reason } => {
                write!(
                    f,
                    "Preflight check '{}' failed (ignored in dry run): {}",
                    check, reason
                )
            }
            BoundaryWarning::RollbackFailed { action, reason } => {
                write!(f, "Rollback of '{}' failed: {}", action, reason)
            }
        }
    }
}

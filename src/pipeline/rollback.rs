//! Compensating actions for completed stages.
//!
//! Every stage that changed something registers one [Compensation] carrying
//! exactly the data needed to undo it. On failure the stack is unwound in
//! reverse order against the final context; a failing compensation is
//! reported and the unwind moves on.

use std::fs;

use tracing::{info, warn};

use crate::boundary::BoundaryWarning;
use crate::context::ReleaseContext;
use crate::error::Result;
use crate::git::Git;
use crate::manifest::Manifest;

/// Remote branch head before the push stage moved it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BranchState {
    pub name: String,
    /// `None` when the branch did not exist on the remote
    pub previous_sha: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Compensation {
    /// Write the previous version back into the manifest
    RestoreManifest { path: String, previous: String },
    /// Delete the changelog if the run created it, else restore it from HEAD
    RestoreChangelog { path: String, created: bool },
    /// Move HEAD back to before the release commit and unstage its files
    ResetCommit {
        previous_sha: String,
        paths: Vec<String>,
    },
    DeleteTag { tag: String },
    /// Remove the pushed tag and put the remote branch back where it was
    RevertPush {
        remote: String,
        tag: Option<String>,
        branch: Option<BranchState>,
    },
}

impl Compensation {
    pub fn describe(&self) -> String {
        match self {
            Compensation::RestoreManifest { path, previous } => {
                format!("restore version {} in {}", previous, path)
            }
            Compensation::RestoreChangelog { path, created } => {
                if *created {
                    format!("remove {}", path)
                } else {
                    format!("restore {}", path)
                }
            }
            Compensation::ResetCommit { previous_sha, .. } => {
                let short = previous_sha.get(..7).unwrap_or(previous_sha);
                format!("reset release commit to {}", short)
            }
            Compensation::DeleteTag { tag } => format!("delete tag {}", tag),
            Compensation::RevertPush {
                remote,
                tag,
                branch,
            } => {
                let mut parts = Vec::new();
                if let Some(tag) = tag {
                    parts.push(format!("delete {}/{}", remote, tag));
                }
                if let Some(branch) = branch {
                    parts.push(match &branch.previous_sha {
                        Some(_) => format!("rewind {}/{}", remote, branch.name),
                        None => format!("delete {}/{}", remote, branch.name),
                    });
                }
                parts.join(", ")
            }
        }
    }

    /// Undo the stage this compensation was registered for
    pub fn apply(&self, ctx: &ReleaseContext, git: &dyn Git) -> Result<()> {
        match self {
            Compensation::RestoreManifest { path, previous } => {
                Manifest::new(ctx.workdir.join(path)).set_version(previous)
            }
            Compensation::RestoreChangelog { path, created } => {
                if *created {
                    let absolute = ctx.workdir.join(path);
                    if absolute.exists() {
                        fs::remove_file(absolute)?;
                    }
                } else {
                    git.restore(path)?;
                }
                Ok(())
            }
            Compensation::ResetCommit {
                previous_sha,
                paths,
            } => {
                git.reset_soft(previous_sha)?;
                if !paths.is_empty() {
                    let paths: Vec<&str> = paths.iter().map(String::as_str).collect();
                    git.unstage(&paths)?;
                }
                Ok(())
            }
            Compensation::DeleteTag { tag } => git.delete_tag(tag).map(|_| ()),
            Compensation::RevertPush {
                remote,
                tag,
                branch,
            } => {
                let tag_result = match tag {
                    Some(tag) => git.delete_remote_tag(remote, tag).map(|_| ()),
                    None => Ok(()),
                };
                let branch_result = match branch {
                    Some(BranchState {
                        name,
                        previous_sha: Some(sha),
                    }) => git.force_push_branch(remote, sha, name).map(|_| ()),
                    Some(BranchState {
                        name,
                        previous_sha: None,
                    }) => git.delete_remote_branch(remote, name).map(|_| ()),
                    None => Ok(()),
                };
                tag_result.and(branch_result)
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RollbackOperation {
    pub compensation: Compensation,
    pub description: String,
}

/// What an unwind did
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RollbackReport {
    pub completed: Vec<String>,
    pub failures: Vec<BoundaryWarning>,
}

impl RollbackReport {
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Compensations of one pipeline run, most recent last
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RollbackStack {
    operations: Vec<RollbackOperation>,
}

impl RollbackStack {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, compensation: Compensation, description: impl Into<String>) {
        self.operations.push(RollbackOperation {
            compensation,
            description: description.into(),
        });
    }

    pub fn len(&self) -> usize {
        self.operations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }

    pub fn operations(&self) -> &[RollbackOperation] {
        &self.operations
    }

    /// Run every compensation, newest first, each against the same `ctx`
    pub fn unwind(self, ctx: &ReleaseContext, git: &dyn Git) -> RollbackReport {
        let mut report = RollbackReport::default();

        for operation in self.operations.into_iter().rev() {
            match operation.compensation.apply(ctx, git) {
                Ok(()) => {
                    info!(action = %operation.description, "rolled back");
                    report.completed.push(operation.description);
                }
                Err(e) => {
                    warn!(action = %operation.description, error = %e, "rollback step failed");
                    report.failures.push(BoundaryWarning::RollbackFailed {
                        action: operation.description,
                        reason: e.to_string(),
                    });
                }
            }
        }

        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::git::MockGit;
    use crate::options::ReleaseOptions;
    use semver::Version;
    use tempfile::TempDir;

    fn context(dir: &TempDir) -> ReleaseContext {
        ReleaseContext::new(
            ReleaseOptions::default(),
            Config::default(),
            dir.path(),
            "widget",
            Version::new(1, 2, 3),
        )
    }

    fn delete_tag(tag: &str) -> Compensation {
        Compensation::DeleteTag {
            tag: tag.to_string(),
        }
    }

    #[test]
    fn test_unwind_runs_in_reverse_order() {
        let dir = TempDir::new().unwrap();
        let git = MockGit::new();
        git.commit("release").unwrap();
        git.create_tag("v1.3.0", "Release 1.3.0", false).unwrap();

        let mut stack = RollbackStack::new();
        stack.push(
            Compensation::ResetCommit {
                previous_sha: "base".to_string(),
                paths: vec!["package.json".to_string()],
            },
            "commit",
        );
        stack.push(delete_tag("v1.3.0"), "tag");

        let report = stack.unwind(&context(&dir), &git);
        assert_eq!(report.completed, vec!["tag", "commit"]);
        assert!(report.is_clean());
        assert!(git.tags().is_empty());
        assert_eq!(git.history(), vec!["base"]);

        let calls = git.calls();
        assert_eq!(calls[2], ["tag", "-d", "v1.3.0"]);
        assert_eq!(calls[3], ["reset", "--soft", "base"]);
        assert_eq!(calls[4], ["restore", "--staged", "--", "package.json"]);
    }

    #[test]
    fn test_unwind_continues_past_failures() {
        let dir = TempDir::new().unwrap();
        let git = MockGit::new().fail_on("tag -d");
        git.commit("release").unwrap();

        let mut stack = RollbackStack::new();
        stack.push(
            Compensation::ResetCommit {
                previous_sha: "base".to_string(),
                paths: Vec::new(),
            },
            "commit",
        );
        stack.push(delete_tag("v1.3.0"), "tag");

        let report = stack.unwind(&context(&dir), &git);
        assert_eq!(report.completed, vec!["commit"]);
        assert_eq!(report.failures.len(), 1);
        assert!(matches!(
            &report.failures[0],
            BoundaryWarning::RollbackFailed { action, .. } if action == "tag"
        ));
        assert_eq!(git.history(), vec!["base"]);
    }

    #[test]
    fn test_restore_manifest_and_created_changelog() {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join("package.json"),
            "{\n  \"version\": \"1.3.0\"\n}\n",
        )
        .unwrap();
        fs::write(dir.path().join("CHANGELOG.md"), "## v1.3.0\n").unwrap();
        let git = MockGit::new();
        let ctx = context(&dir);

        Compensation::RestoreChangelog {
            path: "CHANGELOG.md".to_string(),
            created: true,
        }
        .apply(&ctx, &git)
        .unwrap();
        Compensation::RestoreManifest {
            path: "package.json".to_string(),
            previous: "1.2.3".to_string(),
        }
        .apply(&ctx, &git)
        .unwrap();

        assert!(!dir.path().join("CHANGELOG.md").exists());
        assert_eq!(
            fs::read_to_string(dir.path().join("package.json")).unwrap(),
            "{\n  \"version\": \"1.2.3\"\n}\n"
        );
        assert!(git.calls().is_empty());
    }

    #[test]
    fn test_existing_changelog_is_restored_from_git() {
        let dir = TempDir::new().unwrap();
        let git = MockGit::new();
        Compensation::RestoreChangelog {
            path: "CHANGELOG.md".to_string(),
            created: false,
        }
        .apply(&context(&dir), &git)
        .unwrap();
        assert_eq!(
            git.calls()[0],
            [
                "restore",
                "--source=HEAD",
                "--staged",
                "--worktree",
                "--",
                "CHANGELOG.md",
            ]
        );
    }

    #[test]
    fn test_revert_push() {
        let dir = TempDir::new().unwrap();
        let git = MockGit::new();
        git.commit("release").unwrap();
        git.push_branch("origin", "main").unwrap();
        git.push_tag("origin", "v1.3.0").unwrap();

        let compensation = Compensation::RevertPush {
            remote: "origin".to_string(),
            tag: Some("v1.3.0".to_string()),
            branch: Some(BranchState {
                name: "main".to_string(),
                previous_sha: Some("base".to_string()),
            }),
        };
        assert_eq!(
            compensation.describe(),
            "delete origin/v1.3.0, rewind origin/main"
        );
        compensation.apply(&context(&dir), &git).unwrap();

        assert!(git.remote_tags().is_empty());
        assert_eq!(git.remote_branch().as_deref(), Some("base"));
    }
}

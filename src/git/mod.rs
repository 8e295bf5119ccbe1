//! Git operations abstraction layer
//!
//! The pipeline talks to version control through the [Git] trait:
//!
//! - [system::SystemGit]: reads through `git2`, mutations through the `git` binary
//! - [mock::MockGit]: in-memory implementation for testing
//!
//! Read-only queries always run for real. Mutations go through [Git::run],
//! which a dry-run runner turns into a logged no-op.

pub mod mock;
pub mod system;

pub use mock::MockGit;
pub use system::SystemGit;

use crate::error::{KiaraError, Result};

/// Commit information for analysis and changelog rendering
#[derive(Debug, Clone, PartialEq)]
pub struct CommitInfo {
    /// Full commit hash
    pub hash: String,
    /// Full commit message, header first
    pub message: String,
}

impl CommitInfo {
    pub fn new(hash: impl Into<String>, message: impl Into<String>) -> Self {
        CommitInfo {
            hash: hash.into(),
            message: message.into(),
        }
    }

    pub fn short_hash(&self) -> &str {
        self.hash.get(..7).unwrap_or(&self.hash)
    }
}

/// Remote-tracking branch configured for the current branch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Upstream {
    pub remote: String,
    pub branch: String,
}

/// Version-control capabilities consumed by the release pipeline
pub trait Git: Send + Sync {
    /// Execute a mutating git invocation and return its standard output
    fn run(&self, args: &[&str]) -> Result<String>;

    fn is_inside_work_tree(&self) -> Result<bool>;

    /// Checked-out branch name, `None` on a detached HEAD
    fn current_branch(&self) -> Result<Option<String>>;

    /// True when `git status --porcelain` would print nothing
    fn is_clean(&self) -> Result<bool>;

    fn upstream(&self) -> Result<Option<Upstream>>;

    fn remote_url(&self, remote: &str) -> Result<String>;

    fn head_sha(&self) -> Result<String>;

    /// Commit the remote currently has for `branch`, if the branch exists there
    fn remote_branch_sha(&self, remote: &str, branch: &str) -> Result<Option<String>>;

    /// Configured `user.signingkey`, if any
    fn signing_key(&self) -> Result<Option<String>>;

    /// Most recent tag reachable from HEAD
    fn latest_tag(&self) -> Result<Option<String>>;

    /// Commits after `tag` (or the whole history), oldest first
    fn commits_since(&self, tag: Option<&str>) -> Result<Vec<CommitInfo>>;

    fn add(&self, paths: &[&str]) -> Result<String> {
        let mut args = vec!["add", "--"];
        args.extend_from_slice(paths);
        self.run(&args)
    }

    fn commit(&self, message: &str) -> Result<String> {
        self.run(&["commit", "-m", message])
    }

    fn create_tag(&self, name: &str, annotation: &str, sign: bool) -> Result<String> {
        let mut args = vec!["tag", "-a", name, "-m", annotation];
        if sign {
            args.push("-s");
        }
        self.run(&args)
    }

    fn delete_tag(&self, name: &str) -> Result<String> {
        self.run(&["tag", "-d", name])
    }

    fn push_branch(&self, remote: &str, branch: &str) -> Result<String> {
        self.run(&["push", remote, &format!("HEAD:refs/heads/{}", branch)])
    }

    fn push_tag(&self, remote: &str, tag: &str) -> Result<String> {
        self.run(&["push", remote, &format!("refs/tags/{}", tag)])
    }

    fn delete_remote_tag(&self, remote: &str, tag: &str) -> Result<String> {
        self.run(&["push", remote, &format!(":refs/tags/{}", tag)])
    }

    fn force_push_branch(&self, remote: &str, sha: &str, branch: &str) -> Result<String> {
        self.run(&["push", "--force", remote, &format!("{}:refs/heads/{}", sha, branch)])
    }

    fn delete_remote_branch(&self, remote: &str, branch: &str) -> Result<String> {
        self.run(&["push", remote, &format!(":refs/heads/{}", branch)])
    }

    fn reset_soft(&self, sha: &str) -> Result<String> {
        self.run(&["reset", "--soft", sha])
    }

    fn unstage(&self, paths: &[&str]) -> Result<String> {
        let mut args = vec!["restore", "--staged", "--"];
        args.extend_from_slice(paths);
        self.run(&args)
    }

    /// Discard index and worktree changes to `path`
    fn restore(&self, path: &str) -> Result<String> {
        self.run(&["restore", "--source=HEAD", "--staged", "--worktree", "--", path])
    }
}

/// Reject output from commands that are expected to print nothing
pub fn expect_silent(operation: &str, output: &str) -> Result<()> {
    let trimmed = output.trim();
    if trimmed.is_empty() {
        Ok(())
    } else {
        Err(KiaraError::git(format!("{} reported unexpected output: {}", operation, trimmed)))
    }
}

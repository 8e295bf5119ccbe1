use crate::error::{KiaraError, Result};
use crate::git::{CommitInfo, Git, Upstream};
use std::collections::BTreeSet;
use std::sync::{Mutex, MutexGuard};

#[derive(Debug, Clone)]
struct MockState {
    inside_work_tree: bool,
    branch: Option<String>,
    clean: bool,
    upstream: Option<Upstream>,
    remote_url: String,
    signing_key: Option<String>,
    latest_tag: Option<String>,
    commits: Vec<CommitInfo>,
    history: Vec<String>,
    tags: BTreeSet<String>,
    remote_tags: BTreeSet<String>,
    remote_branch: Option<String>,
    fail_on: Vec<String>,
    calls: Vec<Vec<String>>,
}

/// In-memory repository for testing without actual git operations.
///
/// Mutations passed to [Git::run] are recorded and applied to a small model
/// of local history, local tags, remote tags and the remote branch head, so
/// rollback behaviour can be asserted on.
pub struct MockGit {
    state: Mutex<MockState>,
}

impl MockGit {
    /// A clean `main` checkout tracking `origin/main`, with one base commit.
    pub fn new() -> Self {
        MockGit {
            state: Mutex::new(MockState {
                inside_work_tree: true,
                branch: Some("main".to_string()),
                clean: true,
                upstream: Some(Upstream {
                    remote: "origin".to_string(),
                    branch: "main".to_string(),
                }),
                remote_url: "git@github.com:acme/widget.git".to_string(),
                signing_key: None,
                latest_tag: None,
                commits: Vec::new(),
                history: vec!["base".to_string()],
                tags: BTreeSet::new(),
                remote_tags: BTreeSet::new(),
                remote_branch: Some("base".to_string()),
                fail_on: Vec::new(),
                calls: Vec::new(),
            }),
        }
    }

    fn state(&self) -> MutexGuard<'_, MockState> {
        self.state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn with_commits<S: AsRef<str>>(self, messages: &[S]) -> Self {
        {
            let mut state = self.state();
            state.commits = messages
                .iter()
                .enumerate()
                .map(|(i, m)| CommitInfo::new(format!("{:040x}", i + 1), m.as_ref()))
                .collect();
        }
        self
    }

    pub fn with_latest_tag(self, tag: &str) -> Self {
        {
            let mut state = self.state();
            state.latest_tag = Some(tag.to_string());
            state.tags.insert(tag.to_string());
        }
        self
    }

    pub fn with_branch(self, branch: Option<&str>) -> Self {
        self.state().branch = branch.map(str::to_string);
        self
    }

    pub fn with_dirty_worktree(self) -> Self {
        self.state().clean = false;
        self
    }

    pub fn with_upstream(self, upstream: Option<Upstream>) -> Self {
        self.state().upstream = upstream;
        self
    }

    pub fn with_remote_url(self, url: &str) -> Self {
        self.state().remote_url = url.to_string();
        self
    }

    pub fn with_signing_key(self, key: &str) -> Self {
        self.state().signing_key = Some(key.to_string());
        self
    }

    pub fn outside_work_tree(self) -> Self {
        self.state().inside_work_tree = false;
        self
    }

    /// Make every invocation whose joined arguments start with `prefix` fail
    pub fn fail_on(self, prefix: &str) -> Self {
        self.state().fail_on.push(prefix.to_string());
        self
    }

    pub fn calls(&self) -> Vec<Vec<String>> {
        self.state().calls.clone()
    }

    pub fn history(&self) -> Vec<String> {
        self.state().history.clone()
    }

    pub fn tags(&self) -> BTreeSet<String> {
        self.state().tags.clone()
    }

    pub fn remote_tags(&self) -> BTreeSet<String> {
        self.state().remote_tags.clone()
    }

    pub fn remote_branch(&self) -> Option<String> {
        self.state().remote_branch.clone()
    }
}

impl Default for MockGit {
    fn default() -> Self {
        Self::new()
    }
}

fn apply(state: &mut MockState, args: &[&str]) -> Result<()> {
    match args {
        ["commit", ..] => {
            let sha = format!("commit-{}", state.history.len());
            state.history.push(sha);
        }
        ["reset", "--soft", sha] => {
            let idx = state
                .history
                .iter()
                .position(|h| h == sha)
                .ok_or_else(|| KiaraError::git(format!("unknown revision {}", sha)))?;
            state.history.truncate(idx + 1);
        }
        ["tag", "-d", name] => {
            if !state.tags.remove(*name) {
                return Err(KiaraError::git(format!("tag '{}' not found", name)));
            }
        }
        ["tag", "-a", name, ..] => {
            if !state.tags.insert(name.to_string()) {
                return Err(KiaraError::git(format!("tag '{}' already exists", name)));
            }
        }
        ["push", .., refspec] => {
            if let Some(tag) = refspec.strip_prefix(":refs/tags/") {
                state.remote_tags.remove(tag);
            } else if let Some(tag) = refspec.strip_prefix("refs/tags/") {
                state.remote_tags.insert(tag.to_string());
            } else if refspec.starts_with(":refs/heads/") {
                state.remote_branch = None;
            } else if let Some((source, _)) = refspec.split_once(":refs/heads/") {
                let sha = if source == "HEAD" {
                    state.history.last().cloned().unwrap_or_default()
                } else {
                    source.to_string()
                };
                state.remote_branch = Some(sha);
            }
        }
        _ => {}
    }
    Ok(())
}

impl Git for MockGit {
    fn run(&self, args: &[&str]) -> Result<String> {
        let mut state = self.state();
        let call: Vec<String> = args.iter().map(|a| a.to_string()).collect();
        state.calls.push(call);

        let joined = args.join(" ");
        if state.fail_on.iter().any(|p| joined.starts_with(p.as_str())) {
            return Err(KiaraError::git(format!("git {} failed", joined)));
        }

        apply(&mut state, args)?;
        Ok(String::new())
    }

    fn is_inside_work_tree(&self) -> Result<bool> {
        Ok(self.state().inside_work_tree)
    }

    fn current_branch(&self) -> Result<Option<String>> {
        Ok(self.state().branch.clone())
    }

    fn is_clean(&self) -> Result<bool> {
        Ok(self.state().clean)
    }

    fn upstream(&self) -> Result<Option<Upstream>> {
        Ok(self.state().upstream.clone())
    }

    fn remote_url(&self, _remote: &str) -> Result<String> {
        Ok(self.state().remote_url.clone())
    }

    fn head_sha(&self) -> Result<String> {
        self.state()
            .history
            .last()
            .cloned()
            .ok_or_else(|| KiaraError::git("HEAD does not point to a commit"))
    }

    fn remote_branch_sha(&self, _remote: &str, _branch: &str) -> Result<Option<String>> {
        Ok(self.state().remote_branch.clone())
    }

    fn signing_key(&self) -> Result<Option<String>> {
        Ok(self.state().signing_key.clone())
    }

    fn latest_tag(&self) -> Result<Option<String>> {
        Ok(self.state().latest_tag.clone())
    }

    fn commits_since(&self, _tag: Option<&str>) -> Result<Vec<CommitInfo>> {
        Ok(self.state().commits.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mock_defaults() {
        let git = MockGit::new();
        assert!(git.is_inside_work_tree().unwrap());
        assert_eq!(git.current_branch().unwrap().as_deref(), Some("main"));
        assert!(git.is_clean().unwrap());
        assert_eq!(git.head_sha().unwrap(), "base");
        assert!(git.calls().is_empty());
    }

    #[test]
    fn test_commit_and_soft_reset() {
        let git = MockGit::new();
        git.commit("chore(release): widget@1.0.0").unwrap();
        assert_eq!(git.history().len(), 2);

        git.reset_soft("base").unwrap();
        assert_eq!(git.history(), vec!["base"]);
    }

    #[test]
    fn test_tags_and_remote_refs() {
        let git = MockGit::new();
        git.create_tag("v1.0.0", "Release 1.0.0", false).unwrap();
        assert!(git.create_tag("v1.0.0", "again", false).is_err());

        git.commit("release").unwrap();
        git.push_branch("origin", "main").unwrap();
        git.push_tag("origin", "v1.0.0").unwrap();
        assert_eq!(git.remote_branch().as_deref(), Some("commit-1"));
        assert!(git.remote_tags().contains("v1.0.0"));

        git.delete_remote_tag("origin", "v1.0.0").unwrap();
        git.force_push_branch("origin", "base", "main").unwrap();
        git.delete_tag("v1.0.0").unwrap();
        assert!(git.remote_tags().is_empty());
        assert!(git.tags().is_empty());
        assert_eq!(git.remote_branch().as_deref(), Some("base"));
    }

    #[test]
    fn test_fail_on_prefix() {
        let git = MockGit::new().fail_on("tag -a");
        assert!(git.create_tag("v1.0.0", "Release", false).is_err());
        assert!(git.tags().is_empty());
        assert_eq!(git.calls().len(), 1);
    }

    #[test]
    fn test_commits_fixture() {
        let git = MockGit::new().with_commits(&["feat: a", "fix: b"]);
        let commits = git.commits_since(None).unwrap();
        assert_eq!(commits.len(), 2);
        assert_eq!(commits[1].message, "fix: b");
    }
}

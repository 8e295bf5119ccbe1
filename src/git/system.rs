use crate::error::{KiaraError, Result};
use crate::git::{CommitInfo, Git, Upstream};
use git2::{ErrorCode, Oid, Repository, Sort, StatusOptions};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::process::Command;
use tracing::{debug, info};

/// Git access for a working directory.
///
/// Queries go through `git2`. Mutations shell out to the `git` binary so that
/// hooks, signing and credential helpers behave exactly as they do for the user.
#[derive(Debug, Clone)]
pub struct SystemGit {
    workdir: PathBuf,
    dry_run: bool,
}

impl SystemGit {
    pub fn new<P: AsRef<Path>>(workdir: P) -> Self {
        SystemGit {
            workdir: workdir.as_ref().to_path_buf(),
            dry_run: false,
        }
    }

    /// In dry-run mode [Git::run] logs the command and returns empty output
    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    pub fn workdir(&self) -> &Path {
        &self.workdir
    }

    fn repo(&self) -> Result<Repository> {
        Ok(Repository::discover(&self.workdir)?)
    }

    fn exec(&self, args: &[&str]) -> Result<String> {
        let joined = args.join(" ");
        debug!(command = %joined, "git");

        let output = Command::new("git")
            .args(args)
            .current_dir(&self.workdir)
            .output()
            .map_err(|e| KiaraError::git(format!("failed to spawn git {}: {}", joined, e)))?;

        let stdout = String::from_utf8_lossy(&output.stdout).to_string();
        let stderr = String::from_utf8_lossy(&output.stderr).to_string();
        if !stdout.trim().is_empty() {
            debug!(stdout = %stdout.trim(), "git output");
        }
        if !stderr.trim().is_empty() {
            debug!(stderr = %stderr.trim(), "git output");
        }

        if !output.status.success() {
            let detail = if stderr.trim().is_empty() {
                stdout.trim().to_string()
            } else {
                stderr.trim().to_string()
            };
            return Err(KiaraError::git(format!("git {}: {}", joined, detail)));
        }

        Ok(stdout)
    }
}

fn head_commit(repo: &Repository) -> Result<git2::Commit<'_>> {
    match repo.head() {
        Ok(head) => Ok(head.peel_to_commit()?),
        Err(e) if e.code() == ErrorCode::UnbornBranch => Err(KiaraError::git(
            "HEAD does not point to a commit; the repository has no commits yet",
        )),
        Err(e) => Err(e.into()),
    }
}

/// Map each tagged commit to the names of the tags pointing at it
fn tags_by_commit(repo: &Repository) -> Result<HashMap<Oid, Vec<String>>> {
    let mut tagged: HashMap<Oid, Vec<String>> = HashMap::new();
    let names = repo.tag_names(None)?;

    for name in names.iter().flatten() {
        let commit = repo
            .revparse_single(&format!("refs/tags/{}", name))
            .and_then(|object| object.peel_to_commit());
        if let Ok(commit) = commit {
            tagged
                .entry(commit.id())
                .or_default()
                .push(name.to_string());
        }
    }

    Ok(tagged)
}

impl Git for SystemGit {
    fn run(&self, args: &[&str]) -> Result<String> {
        if self.dry_run {
            info!("Would execute: git {}", args.join(" "));
            return Ok(String::new());
        }
        self.exec(args)
    }

    fn is_inside_work_tree(&self) -> Result<bool> {
        match Repository::discover(&self.workdir) {
            Ok(repo) => Ok(!repo.is_bare()),
            Err(e) if e.code() == ErrorCode::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    fn current_branch(&self) -> Result<Option<String>> {
        let repo = self.repo()?;
        let branch = match repo.head() {
            Ok(head) if head.is_branch() => head.shorthand().map(str::to_string),
            Ok(_) => None,
            Err(e) if e.code() == ErrorCode::UnbornBranch => repo
                .find_reference("HEAD")?
                .symbolic_target()
                .and_then(|target| target.strip_prefix("refs/heads/"))
                .map(str::to_string),
            Err(e) => return Err(e.into()),
        };
        Ok(branch)
    }

    fn is_clean(&self) -> Result<bool> {
        let repo = self.repo()?;
        let mut options = StatusOptions::new();
        options
            .include_untracked(true)
            .recurse_untracked_dirs(false)
            .include_ignored(false);
        let statuses = repo.statuses(Some(&mut options))?;
        Ok(statuses.is_empty())
    }

    fn upstream(&self) -> Result<Option<Upstream>> {
        let Some(branch) = self.current_branch()? else {
            return Ok(None);
        };

        let config = self.repo()?.config()?;
        let remote = config.get_string(&format!("branch.{}.remote", branch));
        let merge = config.get_string(&format!("branch.{}.merge", branch));

        match (remote, merge) {
            (Ok(remote), Ok(merge)) => Ok(Some(Upstream {
                remote,
                branch: merge
                    .strip_prefix("refs/heads/")
                    .unwrap_or(&merge)
                    .to_string(),
            })),
            _ => Ok(None),
        }
    }

    fn remote_url(&self, remote: &str) -> Result<String> {
        let repo = self.repo()?;
        let found = repo
            .find_remote(remote)
            .map_err(|_| KiaraError::git(format!("No remote named '{}'", remote)))?;
        found
            .url()
            .map(str::to_string)
            .ok_or_else(|| KiaraError::git(format!("Remote '{}' has no URL", remote)))
    }

    fn head_sha(&self) -> Result<String> {
        let repo = self.repo()?;
        let commit = head_commit(&repo)?;
        Ok(commit.id().to_string())
    }

    fn remote_branch_sha(&self, remote: &str, branch: &str) -> Result<Option<String>> {
        let output = self.exec(&["ls-remote", remote, &format!("refs/heads/{}", branch)])?;
        Ok(output
            .lines()
            .next()
            .and_then(|line| line.split_whitespace().next())
            .map(str::to_string))
    }

    fn signing_key(&self) -> Result<Option<String>> {
        let config = self.repo()?.config()?;
        match config.get_string("user.signingkey") {
            Ok(key) if !key.trim().is_empty() => Ok(Some(key)),
            Ok(_) => Ok(None),
            Err(e) if e.code() == ErrorCode::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn latest_tag(&self) -> Result<Option<String>> {
        let repo = self.repo()?;
        let head = head_commit(&repo)?;
        let tagged = tags_by_commit(&repo)?;
        if tagged.is_empty() {
            return Ok(None);
        }

        let mut revwalk = repo.revwalk()?;
        revwalk.set_sorting(Sort::TOPOLOGICAL | Sort::TIME)?;
        revwalk.push(head.id())?;

        for oid in revwalk {
            if let Some(names) = tagged.get(&oid?) {
                return Ok(names.iter().max().cloned());
            }
        }

        Ok(None)
    }

    fn commits_since(&self, tag: Option<&str>) -> Result<Vec<CommitInfo>> {
        let repo = self.repo()?;
        let head = head_commit(&repo)?;

        let mut revwalk = repo.revwalk()?;
        revwalk.set_sorting(Sort::TOPOLOGICAL | Sort::TIME)?;
        revwalk.push(head.id())?;

        if let Some(tag) = tag {
            let since = repo
                .revparse_single(&format!("refs/tags/{}", tag))
                .and_then(|object| object.peel_to_commit())
                .map_err(|e| KiaraError::git(format!("Cannot resolve tag '{}': {}", tag, e)))?;
            revwalk.hide(since.id())?;
        }

        let mut commits = Vec::new();
        for oid_result in revwalk {
            let oid = oid_result?;
            let commit = repo.find_commit(oid)?;
            commits.push(CommitInfo {
                hash: oid.to_string(),
                message: commit.message().unwrap_or_default().to_string(),
            });
        }

        commits.reverse();
        Ok(commits)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use git2::Signature;
    use std::fs;
    use tempfile::TempDir;

    fn commit_file(repo: &Repository, name: &str, message: &str) -> Oid {
        let workdir = repo.workdir().unwrap().to_path_buf();
        fs::write(workdir.join(name), message).unwrap();

        let mut index = repo.index().unwrap();
        index.add_path(Path::new(name)).unwrap();
        index.write().unwrap();
        let tree_id = index.write_tree().unwrap();
        let tree = repo.find_tree(tree_id).unwrap();
        let sig = Signature::now("Test", "test@example.com").unwrap();

        let parents: Vec<git2::Commit> = repo
            .head()
            .ok()
            .and_then(|h| h.peel_to_commit().ok())
            .into_iter()
            .collect();
        let parent_refs: Vec<&git2::Commit> = parents.iter().collect();

        repo.commit(Some("HEAD"), &sig, &sig, message, &tree, &parent_refs)
            .unwrap()
    }

    fn setup() -> (TempDir, Repository) {
        let dir = TempDir::new().unwrap();
        let repo = Repository::init(dir.path()).unwrap();
        (dir, repo)
    }

    #[test]
    fn test_outside_work_tree() {
        let dir = TempDir::new().unwrap();
        let git = SystemGit::new(dir.path());
        assert!(!git.is_inside_work_tree().unwrap());
    }

    #[test]
    fn test_unborn_repository() {
        let (dir, _repo) = setup();
        let git = SystemGit::new(dir.path());

        assert!(git.is_inside_work_tree().unwrap());
        assert!(git.current_branch().unwrap().is_some());
        assert!(git.head_sha().is_err());
        assert!(git.commits_since(None).is_err());
    }

    #[test]
    fn test_commits_since_tag() {
        let (dir, repo) = setup();
        let first = commit_file(&repo, "a.txt", "chore: initial");
        let sig = Signature::now("Test", "test@example.com").unwrap();
        let target = repo.find_object(first, None).unwrap();
        repo.tag("v1.0.0", &target, &sig, "Release 1.0.0", false)
            .unwrap();
        commit_file(&repo, "b.txt", "feat: add b");
        commit_file(&repo, "c.txt", "fix: repair c");

        let git = SystemGit::new(dir.path());
        assert_eq!(git.latest_tag().unwrap().as_deref(), Some("v1.0.0"));

        let commits = git.commits_since(Some("v1.0.0")).unwrap();
        let messages: Vec<&str> = commits.iter().map(|c| c.message.as_str()).collect();
        assert_eq!(messages, vec!["feat: add b", "fix: repair c"]);

        assert_eq!(git.commits_since(None).unwrap().len(), 3);
    }

    #[test]
    fn test_latest_tag_none_without_tags() {
        let (dir, repo) = setup();
        commit_file(&repo, "a.txt", "chore: initial");
        assert_eq!(SystemGit::new(dir.path()).latest_tag().unwrap(), None);
    }

    #[test]
    fn test_cleanliness_and_remote() {
        let (dir, repo) = setup();
        commit_file(&repo, "a.txt", "chore: initial");
        let url = "git@github.com:acme/widget.git";
        repo.remote("origin", url).unwrap();

        let git = SystemGit::new(dir.path());
        assert!(git.is_clean().unwrap());
        assert_eq!(
            git.remote_url("origin").unwrap(),
            "git@github.com:acme/widget.git"
        );
        assert!(git.remote_url("upstream").is_err());
        assert_eq!(git.upstream().unwrap(), None);

        fs::write(dir.path().join("untracked.txt"), "x").unwrap();
        assert!(!git.is_clean().unwrap());
    }

    #[test]
    fn test_dry_run_does_not_execute() {
        let dir = TempDir::new().unwrap();
        let git = SystemGit::new(dir.path()).dry_run(true);
        assert_eq!(git.run(&["tag", "-a", "v1.0.0", "-m", "x"]).unwrap(), "");
    }
}

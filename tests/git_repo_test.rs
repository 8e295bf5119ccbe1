use std::fs;
use std::path::Path;

use git2::{Oid, Repository, Signature};
use kiara::changelog::ConventionalChangelog;
use kiara::config::{Config, LoadedConfig};
use kiara::git::{Git, SystemGit};
use kiara::github::MockReleaseHost;
use kiara::resolver::BumpStrategy;
use kiara::ui::ScriptedPrompt;
use kiara::{KiaraError, Pipeline, ReleaseOptions};
use tempfile::TempDir;

const PACKAGE: &str = "{\n  \"name\": \"widget\",\n  \"version\": \"1.2.3\"\n}\n";

struct Fixture {
    work: TempDir,
    remote: TempDir,
    base: Oid,
}

fn commit_file(repo: &Repository, name: &str, contents: &str, message: &str) -> Oid {
    let workdir = repo.workdir().unwrap().to_path_buf();
    fs::write(workdir.join(name), contents).unwrap();

    let mut index = repo.index().unwrap();
    index.add_path(Path::new(name)).unwrap();
    index.write().unwrap();
    let tree = repo.find_tree(index.write_tree().unwrap()).unwrap();
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

/// A `main` checkout pushed to a bare `origin`, plus one unpushed feature commit
fn fixture() -> Fixture {
    let remote = TempDir::new().unwrap();
    Repository::init_bare(remote.path()).unwrap();

    let work = TempDir::new().unwrap();
    let repo = Repository::init(work.path()).unwrap();
    repo.set_head("refs/heads/main").unwrap();
    {
        let mut config = repo.config().unwrap();
        config.set_str("user.name", "Test").unwrap();
        config.set_str("user.email", "test@example.com").unwrap();
        config.set_bool("commit.gpgsign", false).unwrap();
        config.set_bool("tag.gpgsign", false).unwrap();
        config.set_str("branch.main.remote", "origin").unwrap();
        let merge = "refs/heads/main";
        config.set_str("branch.main.merge", merge).unwrap();
    }
    let url = remote.path().to_str().unwrap();
    repo.remote("origin", url).unwrap();

    let base = commit_file(&repo, "package.json", PACKAGE, "chore: initial");
    SystemGit::new(work.path())
        .push_branch("origin", "main")
        .unwrap();
    commit_file(&repo, "lib.txt", "thing", "feat: add thing");

    Fixture { work, remote, base }
}

fn loaded() -> LoadedConfig {
    let mut config = Config::default();
    config.git.repository = "acme/widget".to_string();
    LoadedConfig {
        config,
        source: None,
    }
}

fn options() -> ReleaseOptions {
    ReleaseOptions {
        token: Some("t0ken".to_string()),
        bump_strategy: Some(BumpStrategy::Automatic),
        ..Default::default()
    }
}

#[test]
fn test_release_against_real_repository() {
    let fx = fixture();
    let git = SystemGit::new(fx.work.path());
    let host = MockReleaseHost::new();
    let changelog = ConventionalChangelog::new();

    Pipeline::new(&git, &ScriptedPrompt::silent(), &host, &changelog)
        .run(options(), loaded(), fx.work.path())
        .unwrap();

    let manifest = fs::read_to_string(fx.work.path().join("package.json")).unwrap();
    assert!(manifest.contains("\"version\": \"1.3.0\""));
    assert!(git.is_clean().unwrap());
    assert_eq!(git.latest_tag().unwrap().as_deref(), Some("v1.3.0"));

    let head = git.head_sha().unwrap();
    let remote = Repository::open_bare(fx.remote.path()).unwrap();
    assert_eq!(
        remote.refname_to_id("refs/heads/main").unwrap().to_string(),
        head
    );
    assert!(remote.find_reference("refs/tags/v1.3.0").is_ok());

    let local = Repository::open(fx.work.path()).unwrap();
    let message = local
        .head()
        .unwrap()
        .peel_to_commit()
        .unwrap()
        .message()
        .unwrap()
        .to_string();
    assert_eq!(message.trim(), "chore(release): widget@1.3.0");
    assert_eq!(host.releases()[0].tag_name, "v1.3.0");
}

#[test]
fn test_failed_release_unwinds_everything() {
    let fx = fixture();
    let git = SystemGit::new(fx.work.path());
    let head_before = git.head_sha().unwrap();
    let host = MockReleaseHost::new().failing_release(500);
    let changelog = ConventionalChangelog::new();

    let err = Pipeline::new(&git, &ScriptedPrompt::silent(), &host, &changelog)
        .run(options(), loaded(), fx.work.path())
        .unwrap_err();
    assert!(matches!(err, KiaraError::Stage { .. }));
    assert!(err.to_string().starts_with("release stage failed"));

    assert_eq!(git.head_sha().unwrap(), head_before);
    assert_eq!(git.latest_tag().unwrap(), None);
    assert_eq!(
        fs::read_to_string(fx.work.path().join("package.json")).unwrap(),
        PACKAGE
    );
    assert!(!fx.work.path().join("CHANGELOG.md").exists());
    assert!(git.is_clean().unwrap());

    let remote = Repository::open_bare(fx.remote.path()).unwrap();
    assert_eq!(remote.refname_to_id("refs/heads/main").unwrap(), fx.base);
    assert!(remote.find_reference("refs/tags/v1.3.0").is_err());
}

#[test]
fn test_dry_run_leaves_repository_untouched() {
    let fx = fixture();
    let git = SystemGit::new(fx.work.path()).dry_run(true);
    let head_before = git.head_sha().unwrap();
    let changelog = ConventionalChangelog::new();
    let options = ReleaseOptions {
        dry_run: true,
        ..options()
    };

    let host = MockReleaseHost::new();
    let outcome = Pipeline::new(&git, &ScriptedPrompt::silent(), &host, &changelog)
        .run(options, loaded(), fx.work.path())
        .unwrap();

    assert_eq!(outcome.context.version().to_string(), "1.3.0");
    assert_eq!(git.head_sha().unwrap(), head_before);
    assert_eq!(git.latest_tag().unwrap(), None);
    assert!(git.is_clean().unwrap());

    let remote = Repository::open_bare(fx.remote.path()).unwrap();
    assert_eq!(remote.refname_to_id("refs/heads/main").unwrap(), fx.base);
}

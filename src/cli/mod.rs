//! Command-line surface

pub mod orchestration;

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::domain::ReleaseType;
use crate::options::ReleaseOptions;
use crate::resolver::BumpStrategy;

#[derive(Debug, Parser)]
#[command(
    name = "kiara",
    version,
    about = "Bump, changelog, commit, tag, push and publish a release"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run the release pipeline
    Release(ReleaseArgs),
    /// Write a default kiara.toml in the current directory
    Init {
        #[arg(short, long, help = "Overwrite an existing kiara.toml")]
        force: bool,
    },
}

#[derive(Debug, Clone, Args)]
pub struct ReleaseArgs {
    #[arg(short, long, help = "Show git commands, their output and debug logs")]
    pub verbose: bool,

    #[arg(long, help = "Preview the release without changing anything")]
    pub dry_run: bool,

    #[arg(long, help = "Never prompt; default to the automatic bump strategy")]
    pub ci: bool,

    #[arg(short, long, help = "Custom configuration file path")]
    pub config: Option<PathBuf>,

    #[arg(long, help = "Project name, overriding the manifest")]
    pub name: Option<String>,

    #[arg(long, help = "GitHub token (defaults to GITHUB_TOKEN or GH_TOKEN)")]
    pub token: Option<String>,

    #[arg(long, value_enum, help = "How to determine the next version")]
    pub bump_strategy: Option<BumpStrategy>,

    #[arg(long, value_enum, help = "Increment to apply without prompting")]
    pub release_type: Option<ReleaseType>,

    #[arg(long, help = "Pre-release identifier, e.g. alpha or beta")]
    pub pre_release_id: Option<String>,

    #[arg(long, help = "First number of a new pre-release series")]
    pub pre_release_base: Option<u64>,

    #[arg(long)]
    pub skip_bump: bool,
    #[arg(long)]
    pub skip_changelog: bool,
    #[arg(long)]
    pub skip_commit: bool,
    #[arg(long)]
    pub skip_tag: bool,
    #[arg(long, help = "Do not push the release commit")]
    pub skip_push: bool,
    #[arg(long, help = "Do not push the release tag")]
    pub skip_push_tag: bool,
    #[arg(long)]
    pub skip_release: bool,

    #[arg(long, help = "Only bump the manifest version")]
    pub bump_only: bool,

    #[arg(long, help = "Only bump the manifest version and write the changelog")]
    pub bump_only_with_changelog: bool,

    #[arg(long, help = "Create the GitHub release as a draft")]
    pub github_draft: bool,

    #[arg(long, help = "Mark the GitHub release as a prerelease")]
    pub github_prerelease: bool,

    #[arg(
        long,
        default_value_t = true,
        action = clap::ArgAction::Set,
        help = "Mark the GitHub release as the latest release"
    )]
    pub github_latest: bool,
}

impl ReleaseArgs {
    pub fn options(&self) -> ReleaseOptions {
        ReleaseOptions {
            verbose: self.verbose,
            dry_run: self.dry_run,
            ci: self.ci,
            name: self.name.clone(),
            token: self.token.clone(),
            bump_strategy: self.bump_strategy,
            release_type: self.release_type,
            pre_release_id: self.pre_release_id.clone(),
            pre_release_base: self.pre_release_base,
            skip_bump: self.skip_bump,
            skip_changelog: self.skip_changelog,
            skip_commit: self.skip_commit,
            skip_tag: self.skip_tag,
            skip_push: self.skip_push,
            skip_push_tag: self.skip_push_tag,
            skip_release: self.skip_release,
            bump_only: self.bump_only,
            bump_only_with_changelog: self.bump_only_with_changelog,
            github_draft: self.github_draft,
            github_prerelease: self.github_prerelease,
            github_latest: self.github_latest,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn release_args(args: &[&str]) -> ReleaseArgs {
        let mut argv = vec!["kiara", "release"];
        argv.extend_from_slice(args);
        match Cli::parse_from(argv).command {
            Command::Release(args) => args,
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_cli_definition() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn test_defaults() {
        let options = release_args(&[]).options();
        assert_eq!(options, ReleaseOptions::default());
    }

    #[test]
    fn test_flags_map_to_options() {
        let options = release_args(&[
            "--dry-run",
            "--bump-strategy",
            "manual",
            "--release-type",
            "preminor",
            "--pre-release-id",
            "beta",
            "--skip-push-tag",
            "--github-prerelease",
            "--github-latest",
            "false",
        ])
        .options();

        assert!(options.dry_run);
        assert_eq!(options.bump_strategy, Some(BumpStrategy::Manual));
        assert_eq!(options.release_type, Some(ReleaseType::Preminor));
        assert_eq!(options.pre_release_id.as_deref(), Some("beta"));
        assert!(options.skip_push_tag && !options.skip_push);
        assert!(!options.github_latest);
        assert!(options.validate().is_ok());
    }

    #[test]
    fn test_init_force() {
        let cli = Cli::parse_from(["kiara", "init", "--force"]);
        assert!(matches!(cli.command, Command::Init { force: true }));
    }
}

//! Per-run options, one field per `kiara release` flag

use crate::domain::{PreReleaseSpec, ReleaseType};
use crate::error::{KiaraError, Result};
use crate::resolver::BumpStrategy;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReleaseOptions {
    pub verbose: bool,
    pub dry_run: bool,
    pub ci: bool,

    /// Overrides the manifest name when non-empty
    pub name: Option<String>,
    pub token: Option<String>,

    pub bump_strategy: Option<BumpStrategy>,
    pub release_type: Option<ReleaseType>,
    pub pre_release_id: Option<String>,
    pub pre_release_base: Option<u64>,

    pub skip_bump: bool,
    pub skip_changelog: bool,
    pub skip_commit: bool,
    pub skip_tag: bool,
    pub skip_push: bool,
    pub skip_push_tag: bool,
    pub skip_release: bool,

    /// Only bump the manifest
    pub bump_only: bool,
    /// Only bump the manifest and write the changelog
    pub bump_only_with_changelog: bool,

    pub github_draft: bool,
    pub github_prerelease: bool,
    pub github_latest: bool,
}

impl Default for ReleaseOptions {
    fn default() -> Self {
        ReleaseOptions {
            verbose: false,
            dry_run: false,
            ci: false,
            name: None,
            token: None,
            bump_strategy: None,
            release_type: None,
            pre_release_id: None,
            pre_release_base: None,
            skip_bump: false,
            skip_changelog: false,
            skip_commit: false,
            skip_tag: false,
            skip_push: false,
            skip_push_tag: false,
            skip_release: false,
            bump_only: false,
            bump_only_with_changelog: false,
            github_draft: false,
            github_prerelease: false,
            github_latest: true,
        }
    }
}

impl ReleaseOptions {
    /// Reject contradictory release flags before anything runs
    pub fn validate(&self) -> Result<()> {
        if self.github_draft && !self.github_prerelease {
            return Err(KiaraError::validation(
                "A draft release must be a prerelease (--github-draft needs --github-prerelease)",
            ));
        }

        if self.github_latest && (self.github_draft || self.github_prerelease) {
            return Err(KiaraError::validation(
                "A latest release cannot be a draft or a prerelease (pass --github-latest false)",
            ));
        }

        if self.bump_only && self.bump_only_with_changelog {
            return Err(KiaraError::validation(
                "--bump-only and --bump-only-with-changelog cannot be combined",
            ));
        }

        Ok(())
    }

    /// The bump-only shortcut in effect, as its flag name
    pub fn bump_only_flag(&self) -> Option<&'static str> {
        if self.bump_only {
            Some("--bump-only")
        } else if self.bump_only_with_changelog {
            Some("--bump-only-with-changelog")
        } else {
            None
        }
    }

    pub fn is_bump_only(&self) -> bool {
        self.bump_only_flag().is_some()
    }

    pub fn pre_release(&self) -> PreReleaseSpec {
        PreReleaseSpec::new(self.pre_release_id.as_deref(), self.pre_release_base)
    }

    /// True when the run explicitly asked for a pre-release flow
    pub fn wants_pre_release(&self) -> bool {
        self.pre_release_id
            .as_deref()
            .is_some_and(|id| !id.trim().is_empty())
    }

    /// Trimmed, non-empty name override
    pub fn name_override(&self) -> Option<&str> {
        self.name
            .as_deref()
            .map(str::trim)
            .filter(|name| !name.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let options = ReleaseOptions::default();
        assert!(options.github_latest);
        assert!(options.validate().is_ok());
    }

    #[test]
    fn test_draft_requires_prerelease() {
        let options = ReleaseOptions {
            github_draft: true,
            github_latest: false,
            ..Default::default()
        };
        let err = options.validate().unwrap_err();
        assert!(matches!(err, KiaraError::Validation(_)));
    }

    #[test]
    fn test_draft_prerelease_not_latest_is_valid() {
        let options = ReleaseOptions {
            github_draft: true,
            github_prerelease: true,
            github_latest: false,
            ..Default::default()
        };
        assert!(options.validate().is_ok());
    }

    #[test]
    fn test_latest_cannot_be_prerelease() {
        let options = ReleaseOptions {
            github_prerelease: true,
            ..Default::default()
        };
        assert!(options.validate().is_err());
    }

    #[test]
    fn test_bump_only_flags() {
        let options = ReleaseOptions {
            bump_only_with_changelog: true,
            ..Default::default()
        };
        assert_eq!(options.bump_only_flag(), Some("--bump-only-with-changelog"));
        assert!(options.is_bump_only());

        let both = ReleaseOptions {
            bump_only: true,
            bump_only_with_changelog: true,
            ..Default::default()
        };
        assert!(both.validate().is_err());
    }

    #[test]
    fn test_name_override_ignores_blank() {
        let options = ReleaseOptions {
            name: Some("   ".to_string()),
            ..Default::default()
        };
        assert_eq!(options.name_override(), None);
    }

    #[test]
    fn test_pre_release_spec() {
        let options = ReleaseOptions {
            pre_release_id: Some("beta".to_string()),
            pre_release_base: Some(1),
            ..Default::default()
        };
        assert!(options.wants_pre_release());
        assert_eq!(
            options.pre_release(),
            PreReleaseSpec::new(Some("beta"), Some(1))
        );
        assert!(!ReleaseOptions::default().wants_pre_release());
    }
}

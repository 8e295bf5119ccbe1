//! The release state threaded through every pipeline stage.
//!
//! A [ReleaseContext] is never mutated in place by a stage: each stage takes
//! one by value and returns a new one built with the `with_*` methods.

use std::path::{Path, PathBuf};

use semver::Version;
use tracing::debug;

use crate::changelog;
use crate::config::{Config, LoadedConfig, AUTO_REPOSITORY};
use crate::domain::{parse_version, ReleaseType, RepositorySlug, Template};
use crate::error::{KiaraError, Result};
use crate::git::Git;
use crate::manifest::Manifest;
use crate::options::ReleaseOptions;

/// Environment variables consulted for a token, in order
pub const TOKEN_ENV_VARS: [&str; 2] = ["GITHUB_TOKEN", "GH_TOKEN"];

#[derive(Debug, Clone, PartialEq)]
pub struct ReleaseContext {
    pub options: ReleaseOptions,
    pub configuration: Config,
    /// Configuration file the policy was read from, if any
    pub config_source: Option<PathBuf>,
    /// Directory manifest and changelog paths are relative to
    pub workdir: PathBuf,
    pub name: String,
    pub current_version: Version,
    pub new_version: Option<Version>,
    pub release_type: Option<ReleaseType>,
    pub changelog_content: String,
    pub repository: Option<RepositorySlug>,
    pub token: Option<String>,
}

impl ReleaseContext {
    /// A context with no version resolved and nothing generated yet
    pub fn new(
        options: ReleaseOptions,
        configuration: Config,
        workdir: impl Into<PathBuf>,
        name: impl Into<String>,
        current_version: Version,
    ) -> Self {
        let new_version = options.skip_bump.then(|| current_version.clone());
        ReleaseContext {
            options,
            configuration,
            config_source: None,
            workdir: workdir.into(),
            name: name.into(),
            current_version,
            new_version,
            release_type: None,
            changelog_content: String::new(),
            repository: None,
            token: None,
        }
    }

    pub fn with_repository(self, repository: Option<RepositorySlug>) -> Self {
        ReleaseContext { repository, ..self }
    }

    pub fn with_token(self, token: Option<String>) -> Self {
        ReleaseContext { token, ..self }
    }

    /// Build the initial context from options, configuration and the working tree.
    ///
    /// Reads the manifest for name and version, resolves the repository slug
    /// and looks up the token. Nothing is written.
    pub fn build(
        options: ReleaseOptions,
        loaded: LoadedConfig,
        workdir: &Path,
        git: &dyn Git,
    ) -> Result<Self> {
        let LoadedConfig { mut config, source } = loaded;
        if !config.changelog.cliff_config.is_empty() {
            let cliff = workdir.join(&config.changelog.cliff_config);
            if let Some(header) = changelog::cliff_header(&cliff)? {
                debug!(
                    path = %cliff.display(),
                    "using changelog header from git-cliff configuration"
                );
                config.changelog.header = header;
            }
        }
        let manifest = Manifest::new(workdir.join(&config.manifest.path));

        let fields = manifest.fields()?;
        let name = match options.name_override() {
            Some(name) => name.to_string(),
            None => fields.name.clone().ok_or_else(|| {
                KiaraError::manifest(format!(
                    "No project name: pass --name or set the name field in {}",
                    manifest.path().display()
                ))
            })?,
        };

        let version_text = fields.version.ok_or_else(|| {
            KiaraError::manifest(format!(
                "Version field not found in {}",
                manifest.path().display()
            ))
        })?;
        let current_version = parse_version(&version_text)?;

        let releasing = will_release(&options, &config);
        let repository = resolve_repository(&config, git, releasing)?;

        let token = options
            .token
            .clone()
            .filter(|t| !t.trim().is_empty())
            .or_else(token_from_env);
        if token.is_none() && releasing && !options.dry_run {
            return Err(KiaraError::config(format!(
                "No authentication token provided. Set {} or pass --token",
                TOKEN_ENV_VARS[0]
            )));
        }

        debug!(
            name = %name,
            current_version = %current_version,
            repository = ?repository.as_ref().map(|r| r.to_string()),
            "context built"
        );

        let ctx = ReleaseContext::new(options, config, workdir, name, current_version)
            .with_repository(repository)
            .with_token(token);
        Ok(ReleaseContext {
            config_source: source,
            ..ctx
        })
    }

    /// Record the resolved version.
    ///
    /// A version equal to the current one means "no bump needed"; a lower one
    /// is rejected, as is resolving twice.
    pub fn with_new_version(
        self,
        version: Version,
        release_type: Option<ReleaseType>,
    ) -> Result<Self> {
        if let Some(existing) = &self.new_version {
            return Err(KiaraError::version(format!(
                "New version already resolved as {}",
                existing
            )));
        }
        if version < self.current_version {
            return Err(KiaraError::version(format!(
                "New version {} is lower than current version {}",
                version, self.current_version
            )));
        }

        Ok(ReleaseContext {
            new_version: Some(version),
            release_type,
            ..self
        })
    }

    pub fn with_changelog(self, content: String) -> Self {
        ReleaseContext {
            changelog_content: content,
            ..self
        }
    }

    /// The version being released, falling back to the current one
    pub fn version(&self) -> &Version {
        self.new_version.as_ref().unwrap_or(&self.current_version)
    }

    pub fn is_version_unchanged(&self) -> bool {
        self.version() == &self.current_version
    }

    fn render(&self, template: &str) -> String {
        Template::new(template).render(&self.name, &self.version().to_string())
    }

    pub fn tag_name(&self) -> String {
        self.render(&self.configuration.git.tag_name)
    }

    pub fn tag_annotation(&self) -> String {
        self.render(&self.configuration.git.tag_annotation)
    }

    pub fn commit_message(&self) -> String {
        self.render(&self.configuration.git.commit_message)
    }

    pub fn release_title(&self) -> String {
        self.render(&self.configuration.github.release.title)
    }

    pub fn manifest(&self) -> Manifest {
        Manifest::new(self.workdir.join(&self.configuration.manifest.path))
    }

    pub fn changelog_path(&self) -> PathBuf {
        self.workdir.join(&self.configuration.changelog.path)
    }

    pub fn will_release(&self) -> bool {
        will_release(&self.options, &self.configuration)
    }

    pub fn require_token(&self) -> Result<&str> {
        self.token.as_deref().ok_or_else(|| {
            KiaraError::config(format!(
                "No authentication token provided. Set {} or pass --token",
                TOKEN_ENV_VARS[0]
            ))
        })
    }

    pub fn require_repository(&self) -> Result<&RepositorySlug> {
        self.repository.as_ref().ok_or_else(|| {
            KiaraError::config(
                "Repository could not be determined; set git.repository to 'owner/name'",
            )
        })
    }
}

/// True when the release stage is going to talk to the hosting API
pub fn will_release(options: &ReleaseOptions, config: &Config) -> bool {
    !options.skip_release && !options.is_bump_only() && config.github.release.enabled
}

fn token_from_env() -> Option<String> {
    TOKEN_ENV_VARS
        .iter()
        .filter_map(|key| std::env::var(key).ok())
        .find(|value| !value.trim().is_empty())
}

fn resolve_repository(
    config: &Config,
    git: &dyn Git,
    required: bool,
) -> Result<Option<RepositorySlug>> {
    if config.git.repository.trim() != AUTO_REPOSITORY {
        return RepositorySlug::parse(&config.git.repository).map(Some);
    }

    let detected = git
        .remote_url(&config.git.remote)
        .and_then(|url| RepositorySlug::from_remote_url(&url));

    match detected {
        Ok(slug) => Ok(Some(slug)),
        Err(e) if required => Err(e),
        Err(e) => {
            debug!(error = %e, "repository not detected");
            Ok(None)
        }
    }
}

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{KiaraError, Result};
use crate::resolver::BumpStrategy;

/// File name looked up in the working directory and the user config directory.
pub const CONFIG_FILE_NAME: &str = "kiara.toml";

/// Repository value that asks for detection from the `origin` remote.
pub const AUTO_REPOSITORY: &str = "auto";

/// Project-level release policy.
///
/// Every field carries a default, so an on-disk file only needs the keys it overrides.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Default)]
pub struct Config {
    #[serde(default)]
    pub changelog: ChangelogConfig,

    #[serde(default)]
    pub git: GitConfig,

    #[serde(default)]
    pub github: GitHubConfig,

    #[serde(default)]
    pub preflight: PreflightConfig,

    #[serde(default)]
    pub manifest: ManifestConfig,

    #[serde(default)]
    pub bump: BumpConfig,
}

fn default_true() -> bool {
    true
}

fn default_changelog_path() -> String {
    "CHANGELOG.md".to_string()
}

fn default_changelog_header() -> String {
    "# Changelog\n\nAll notable changes to this project will be documented in this file.\n"
        .to_string()
}

fn default_cliff_config() -> String {
    "cliff.toml".to_string()
}

/// Changelog file settings.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct ChangelogConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    #[serde(default = "default_changelog_path")]
    pub path: String,

    /// Header block written at the top of the changelog and stripped from release bodies.
    #[serde(default = "default_changelog_header")]
    pub header: String,

    /// git-cliff configuration whose `[changelog] header` replaces `header` when set.
    /// Empty disables the lookup.
    #[serde(default = "default_cliff_config")]
    pub cliff_config: String,
}

impl Default for ChangelogConfig {
    fn default() -> Self {
        ChangelogConfig {
            enabled: true,
            path: default_changelog_path(),
            header: default_changelog_header(),
            cliff_config: default_cliff_config(),
        }
    }
}

fn default_repository() -> String {
    AUTO_REPOSITORY.to_string()
}

fn default_branches() -> Vec<String> {
    vec!["main".to_string(), "master".to_string()]
}

fn default_commit_message() -> String {
    "chore(release): {{name}}@{{version}}".to_string()
}

fn default_tag_name() -> String {
    "v{{version}}".to_string()
}

fn default_tag_annotation() -> String {
    "Release {{version}}".to_string()
}

fn default_remote() -> String {
    "origin".to_string()
}

/// Git behaviour and message templates.
///
/// Templates understand the `{{name}}` and `{{version}}` placeholders.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct GitConfig {
    /// `owner/name`, or `auto` to detect it from the remote URL
    #[serde(default = "default_repository")]
    pub repository: String,

    #[serde(default)]
    pub require_branch: bool,

    #[serde(default = "default_branches")]
    pub branches: Vec<String>,

    #[serde(default = "default_true")]
    pub require_clean_working_dir: bool,

    #[serde(default)]
    pub require_upstream: bool,

    #[serde(default = "default_commit_message")]
    pub commit_message: String,

    #[serde(default = "default_tag_name")]
    pub tag_name: String,

    #[serde(default = "default_tag_annotation")]
    pub tag_annotation: String,

    /// Remote used for repository detection and as the push fallback
    #[serde(default = "default_remote")]
    pub remote: String,
}

impl Default for GitConfig {
    fn default() -> Self {
        GitConfig {
            repository: default_repository(),
            require_branch: false,
            branches: default_branches(),
            require_clean_working_dir: true,
            require_upstream: false,
            commit_message: default_commit_message(),
            tag_name: default_tag_name(),
            tag_annotation: default_tag_annotation(),
            remote: default_remote(),
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Default)]
pub struct GitHubConfig {
    #[serde(default)]
    pub release: GitHubReleaseConfig,
}

fn default_release_title() -> String {
    "Release v{{version}}".to_string()
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct GitHubReleaseConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    #[serde(default = "default_release_title")]
    pub title: String,
}

impl Default for GitHubReleaseConfig {
    fn default() -> Self {
        GitHubReleaseConfig {
            enabled: true,
            title: default_release_title(),
        }
    }
}

/// Environment checks run before any stage mutates state.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct PreflightConfig {
    #[serde(default)]
    pub require_config_file: bool,

    #[serde(default = "default_true")]
    pub require_manifest: bool,

    #[serde(default = "default_true")]
    pub verify_token: bool,
}

impl Default for PreflightConfig {
    fn default() -> Self {
        PreflightConfig {
            require_config_file: false,
            require_manifest: true,
            verify_token: true,
        }
    }
}

fn default_manifest_path() -> String {
    "package.json".to_string()
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct ManifestConfig {
    #[serde(default = "default_manifest_path")]
    pub path: String,
}

impl Default for ManifestConfig {
    fn default() -> Self {
        ManifestConfig {
            path: default_manifest_path(),
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Default)]
pub struct BumpConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub strategy: Option<BumpStrategy>,
}

/// A configuration together with the file it was read from, if any.
#[derive(Debug, Clone, PartialEq)]
pub struct LoadedConfig {
    pub config: Config,
    pub source: Option<PathBuf>,
}

/// Loads configuration from file or returns defaults.
///
/// Lookup order:
/// 1. Custom path provided as parameter (must exist)
/// 2. `kiara.toml` in the current directory
/// 3. `<config dir>/kiara/kiara.toml`
/// 4. Default configuration if no file found
pub fn load_config(config_path: Option<&Path>) -> Result<LoadedConfig> {
    let source = match config_path {
        Some(path) => {
            if !path.exists() {
                return Err(KiaraError::config(format!(
                    "Configuration file not found: {}",
                    path.display()
                )));
            }
            Some(path.to_path_buf())
        }
        None => discover_config_file(),
    };

    let config = match &source {
        Some(path) => parse_config_file(path)?,
        None => Config::default(),
    };

    Ok(LoadedConfig { config, source })
}

fn discover_config_file() -> Option<PathBuf> {
    let local = PathBuf::from(CONFIG_FILE_NAME);
    if local.exists() {
        return Some(local);
    }

    let user = dirs::config_dir()?.join("kiara").join(CONFIG_FILE_NAME);
    user.exists().then_some(user)
}

fn parse_config_file(path: &Path) -> Result<Config> {
    let contents = fs::read_to_string(path)?;
    parse_config(&contents).map_err(|e| KiaraError::config(format!("{}: {}", path.display(), e)))
}

/// Parse TOML configuration text, filling missing keys with defaults.
pub fn parse_config(contents: &str) -> Result<Config> {
    toml::from_str(contents).map_err(|e| KiaraError::config(e.to_string()))
}

/// Write the default configuration to `path`.
pub fn write_default_config(path: &Path, force: bool) -> Result<()> {
    if path.exists() && !force {
        return Err(KiaraError::config(format!(
            "{} already exists. Use --force to overwrite.",
            path.display()
        )));
    }

    let rendered = toml::to_string_pretty(&Config::default())
        .map_err(|e| KiaraError::config(format!("Failed to render configuration: {}", e)))?;
    fs::write(path, rendered)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert!(config.changelog.enabled);
        assert_eq!(config.changelog.path, "CHANGELOG.md");
        assert_eq!(config.changelog.cliff_config, "cliff.toml");
        assert_eq!(config.git.repository, "auto");
        assert_eq!(config.git.branches, vec!["main", "master"]);
        assert!(config.git.require_clean_working_dir);
        assert!(!config.git.require_upstream);
        assert_eq!(config.git.tag_name, "v{{version}}");
        assert_eq!(config.github.release.title, "Release v{{version}}");
        assert_eq!(config.manifest.path, "package.json");
        assert!(config.bump.strategy.is_none());
    }

    #[test]
    fn test_partial_override_keeps_other_defaults() {
        let config = parse_config(
            r#"
[git]
repository = "acme/widget"
require_branch = true

[github.release]
enabled = false
"#,
        )
        .unwrap();

        assert_eq!(config.git.repository, "acme/widget");
        assert!(config.git.require_branch);
        assert_eq!(
            config.git.commit_message,
            "chore(release): {{name}}@{{version}}"
        );
        assert!(!config.github.release.enabled);
        assert_eq!(config.github.release.title, "Release v{{version}}");
        assert!(config.changelog.enabled);
    }

    #[test]
    fn test_bump_strategy_from_file() {
        let config = parse_config("[bump]\nstrategy = \"auto\"\n").unwrap();
        assert_eq!(config.bump.strategy, Some(BumpStrategy::Automatic));
    }

    #[test]
    fn test_invalid_toml_is_config_error() {
        let err = parse_config("[git\nrepository = 1").unwrap_err();
        assert!(matches!(err, KiaraError::Config(_)));
    }

    #[test]
    fn test_missing_explicit_path_fails() {
        let err = load_config(Some(Path::new("/nonexistent/kiara.toml"))).unwrap_err();
        assert!(err.to_string().contains("not found"));
    }

    #[test]
    fn test_default_config_round_trips_through_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE_NAME);

        write_default_config(&path, false).unwrap();
        let loaded = load_config(Some(&path)).unwrap();

        assert_eq!(loaded.config, Config::default());
        assert_eq!(loaded.source.as_deref(), Some(path.as_path()));
    }

    #[test]
    fn test_write_default_refuses_overwrite() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE_NAME);
        fs::write(&path, "# custom\n").unwrap();

        assert!(write_default_config(&path, false).is_err());
        assert!(write_default_config(&path, true).is_ok());
    }
}

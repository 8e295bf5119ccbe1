//! Next-version computation.
//!
//! The strategy comes from `--bump-strategy`, then `[bump] strategy`, then an
//! interactive choice (automatic in CI). Both strategies produce a
//! [Resolution] that the pipeline records on the context.

pub mod automatic;
pub mod manual;

use semver::Version;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{debug, info};

use crate::boundary::BoundaryWarning;
use crate::context::ReleaseContext;
use crate::domain::ReleaseType;
use crate::error::{KiaraError, Result};
use crate::git::Git;
use crate::ui::{Choice, Prompt};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
pub enum BumpStrategy {
    /// Derive the bump from conventional commits
    #[serde(rename = "auto", alias = "automatic")]
    #[value(name = "auto", alias = "automatic")]
    Automatic,
    /// Pick the increment interactively or via `--release-type`
    #[serde(rename = "manual")]
    #[value(name = "manual")]
    Manual,
}

impl BumpStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            BumpStrategy::Automatic => "auto",
            BumpStrategy::Manual => "manual",
        }
    }
}

impl fmt::Display for BumpStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of a strategy run
#[derive(Debug, Clone, PartialEq)]
pub struct Resolution {
    pub version: Version,
    pub release_type: ReleaseType,
    /// Human-readable explanation, shown with the release plan
    pub reason: Option<String>,
    pub warnings: Vec<BoundaryWarning>,
}

/// Computes the next version with the collaborators it needs
pub struct VersionResolver<'a> {
    git: &'a dyn Git,
    prompt: &'a dyn Prompt,
}

impl<'a> VersionResolver<'a> {
    pub fn new(git: &'a dyn Git, prompt: &'a dyn Prompt) -> Self {
        VersionResolver { git, prompt }
    }

    /// Pick the strategy: option, then configuration, then CI default, then prompt.
    pub fn select_strategy(&self, ctx: &ReleaseContext) -> Result<BumpStrategy> {
        let configured = ctx.configuration.bump.strategy;
        if let Some(strategy) = ctx.options.bump_strategy.or(configured) {
            return Ok(strategy);
        }
        if ctx.options.ci {
            debug!("no bump strategy configured, using automatic in CI");
            return Ok(BumpStrategy::Automatic);
        }

        let choices = [
            Choice::new("Automatic Bump", BumpStrategy::Automatic.as_str())
                .with_hint("Automatically determine the version bump using conventional commits"),
            Choice::new("Manual Bump", BumpStrategy::Manual.as_str())
                .with_hint("Manually select the version bump"),
        ];
        let picked = self.prompt.select("Pick a version strategy", &choices)?;
        match picked.as_str() {
            "auto" => Ok(BumpStrategy::Automatic),
            "manual" => Ok(BumpStrategy::Manual),
            other => Err(KiaraError::validation(format!("Unknown bump strategy '{}'", other))),
        }
    }

    /// Run the selected strategy and check the result moves forward
    pub fn resolve(&self, ctx: &ReleaseContext) -> Result<Resolution> {
        let strategy = self.select_strategy(ctx)?;
        info!(strategy = %strategy, "resolving next version");

        let mut resolution = match strategy {
            BumpStrategy::Automatic => automatic::resolve(ctx, self.git)?,
            BumpStrategy::Manual => manual::resolve(ctx, self.prompt)?,
        };

        if resolution.version < ctx.current_version {
            return Err(KiaraError::version(format!(
                "Resolved version {} is lower than current version {}",
                resolution.version, ctx.current_version
            )));
        }
        if resolution.version == ctx.current_version {
            resolution.warnings.push(BoundaryWarning::VersionUnchanged {
                version: resolution.version.to_string(),
            });
        }

        debug!(
            current = %ctx.current_version,
            next = %resolution.version,
            release_type = %resolution.release_type,
            "version resolved"
        );
        Ok(resolution)
    }
}

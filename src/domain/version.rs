use crate::error::{KiaraError, Result};
use semver::{BuildMetadata, Prerelease, Version};
use std::fmt;
use std::str::FromStr;

pub const DEFAULT_PRE_RELEASE_ID: &str = "alpha";
pub const DEFAULT_PRE_RELEASE_BASE: u64 = 0;

/// Increment class applied to the current version
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, clap::ValueEnum)]
pub enum ReleaseType {
    Major,
    Minor,
    Patch,
    Premajor,
    Preminor,
    Prepatch,
    Prerelease,
}

impl ReleaseType {
    pub const STABLE: [ReleaseType; 3] = [
        ReleaseType::Patch,
        ReleaseType::Minor,
        ReleaseType::Major,
    ];
    pub const PRE: [ReleaseType; 3] = [
        ReleaseType::Prepatch,
        ReleaseType::Preminor,
        ReleaseType::Premajor,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ReleaseType::Major => "major",
            ReleaseType::Minor => "minor",
            ReleaseType::Patch => "patch",
            ReleaseType::Premajor => "premajor",
            ReleaseType::Preminor => "preminor",
            ReleaseType::Prepatch => "prepatch",
            ReleaseType::Prerelease => "prerelease",
        }
    }

    /// True for the types that produce a pre-release version
    pub fn is_pre(&self) -> bool {
        matches!(
            self,
            ReleaseType::Premajor
                | ReleaseType::Preminor
                | ReleaseType::Prepatch
                | ReleaseType::Prerelease
        )
    }
}

impl fmt::Display for ReleaseType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ReleaseType {
    type Err = KiaraError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "major" => Ok(ReleaseType::Major),
            "minor" => Ok(ReleaseType::Minor),
            "patch" => Ok(ReleaseType::Patch),
            "premajor" => Ok(ReleaseType::Premajor),
            "preminor" => Ok(ReleaseType::Preminor),
            "prepatch" => Ok(ReleaseType::Prepatch),
            "prerelease" | "pre" => Ok(ReleaseType::Prerelease),
            other => Err(KiaraError::validation(format!("Unknown release type '{}'", other))),
        }
    }
}

/// Identifier and numeric base used when a pre-release component is created
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreReleaseSpec {
    pub id: String,
    pub base: u64,
}

impl Default for PreReleaseSpec {
    fn default() -> Self {
        PreReleaseSpec {
            id: DEFAULT_PRE_RELEASE_ID.to_string(),
            base: DEFAULT_PRE_RELEASE_BASE,
        }
    }
}

impl PreReleaseSpec {
    pub fn new(id: Option<&str>, base: Option<u64>) -> Self {
        PreReleaseSpec {
            id: id
                .filter(|id| !id.trim().is_empty())
                .unwrap_or(DEFAULT_PRE_RELEASE_ID)
                .to_string(),
            base: base.unwrap_or(DEFAULT_PRE_RELEASE_BASE),
        }
    }

    fn fresh(&self) -> Result<Prerelease> {
        prerelease(&format!("{}.{}", self.id, self.base))
    }
}

fn prerelease(text: &str) -> Result<Prerelease> {
    Prerelease::new(text)
        .map_err(|e| KiaraError::version(format!("Invalid pre-release '{}': {}", text, e)))
}

/// Parse a manifest version string, tolerating a leading `v`.
pub fn parse_version(text: &str) -> Result<Version> {
    let clean = text.trim().trim_start_matches('v').trim_start_matches('V');
    Version::parse(clean)
        .map_err(|e| KiaraError::version(format!("Invalid version '{}': {}", text, e)))
}

/// Apply an increment to `current`.
///
/// Stable increments on a pre-release graduate it first: `1.0.0-alpha.1`
/// bumped by `major` becomes `1.0.0`. Pre-release increments attach
/// `<id>.<base>`, and `prerelease` continues an existing series with the same
/// identifier.
pub fn increment(
    current: &Version,
    release_type: ReleaseType,
    pre: &PreReleaseSpec,
) -> Result<Version> {
    let mut next = current.clone();
    next.build = BuildMetadata::EMPTY;
    let was_pre = !current.pre.is_empty();

    match release_type {
        ReleaseType::Major => {
            if !(was_pre && current.minor == 0 && current.patch == 0) {
                next.major += 1;
            }
            next.minor = 0;
            next.patch = 0;
            next.pre = Prerelease::EMPTY;
        }
        ReleaseType::Minor => {
            if !(was_pre && current.patch == 0) {
                next.minor += 1;
            }
            next.patch = 0;
            next.pre = Prerelease::EMPTY;
        }
        ReleaseType::Patch => {
            if !was_pre {
                next.patch += 1;
            }
            next.pre = Prerelease::EMPTY;
        }
        ReleaseType::Premajor => {
            next.major += 1;
            next.minor = 0;
            next.patch = 0;
            next.pre = pre.fresh()?;
        }
        ReleaseType::Preminor => {
            next.minor += 1;
            next.patch = 0;
            next.pre = pre.fresh()?;
        }
        ReleaseType::Prepatch => {
            next.patch += 1;
            next.pre = pre.fresh()?;
        }
        ReleaseType::Prerelease => {
            if was_pre {
                next.pre = continue_prerelease(&current.pre, pre)?;
            } else {
                next.patch += 1;
                next.pre = pre.fresh()?;
            }
        }
    }

    Ok(next)
}

fn continue_prerelease(current: &Prerelease, pre: &PreReleaseSpec) -> Result<Prerelease> {
    let mut parts: Vec<String> = current.as_str().split('.').map(str::to_string).collect();

    if parts.first().map(String::as_str) != Some(pre.id.as_str()) {
        return pre.fresh();
    }

    match parts.iter().rposition(|p| p.parse::<u64>().is_ok()) {
        Some(idx) => {
            let n: u64 = parts[idx].parse().unwrap_or(0);
            parts[idx] = (n + 1).to_string();
        }
        None => parts.push(pre.base.to_string()),
    }

    prerelease(&parts.join("."))
}

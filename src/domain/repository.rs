use crate::error::{KiaraError, Result};
use regex::Regex;
use std::fmt;

/// Hosting repository coordinates, e.g. `acme/widget`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepositorySlug {
    pub owner: String,
    pub name: String,
}

impl RepositorySlug {
    pub fn new(owner: impl Into<String>, name: impl Into<String>) -> Self {
        RepositorySlug {
            owner: owner.into(),
            name: name.into(),
        }
    }

    /// Parse an explicit `owner/name` string
    pub fn parse(value: &str) -> Result<Self> {
        let value = value.trim();
        match value.split_once('/') {
            Some((owner, name)) if !owner.is_empty() && !name.is_empty() && !name.contains('/') => {
                Ok(RepositorySlug::new(owner, name))
            }
            _ => Err(KiaraError::validation(format!(
                "Invalid repository format '{}'. Expected 'owner/name'",
                value
            ))),
        }
    }

    /// Derive the slug from a remote URL.
    ///
    /// Accepts `git@host:owner/repo(.git)`, `ssh://git@host/owner/repo(.git)` and
    /// `https://host/owner/repo(.git)`.
    pub fn from_remote_url(url: &str) -> Result<Self> {
        let clean = url.trim().trim_end_matches('/');
        let clean = clean.strip_suffix(".git").unwrap_or(clean);

        let patterns = [
            r"^[\w.-]+@[^:/]+:([^/]+)/([^/]+)$",
            r"^ssh://(?:[^@/]+@)?[^/]+/([^/]+)/([^/]+)$",
            r"^https?://(?:[^@/]+@)?[^/]+/([^/]+)/([^/]+)$",
        ];

        for pattern in patterns {
            let captures = Regex::new(pattern).ok().and_then(|re| re.captures(clean));
            if let Some(captures) = captures {
                let owner = captures.get(1).map(|m| m.as_str()).unwrap_or_default();
                let name = captures.get(2).map(|m| m.as_str()).unwrap_or_default();
                return Ok(RepositorySlug::new(owner, name));
            }
        }

        Err(KiaraError::validation(format!(
            "Invalid repository URL '{}'. Expected git@host:owner/repo or https://host/owner/repo",
            url.trim()
        )))
    }

    pub fn url(&self) -> String {
        format!("https://github.com/{}/{}", self.owner, self.name)
    }
}

impl fmt::Display for RepositorySlug {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner, self.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ssh_url() {
        let slug = RepositorySlug::from_remote_url("git@github.com:acme/widget.git").unwrap();
        assert_eq!(slug, RepositorySlug::new("acme", "widget"));
    }

    #[test]
    fn test_https_url() {
        let slug = RepositorySlug::from_remote_url("https://github.com/acme/widget").unwrap();
        assert_eq!(slug.owner, "acme");
        assert_eq!(slug.name, "widget");
    }

    #[test]
    fn test_https_url_with_credentials_and_suffix() {
        let url = "https://x-access-token@github.com/acme/widget.git\n";
        let slug = RepositorySlug::from_remote_url(url).unwrap();
        assert_eq!(slug.to_string(), "acme/widget");
    }

    #[test]
    fn test_ssh_scheme_url() {
        let url = "ssh://git@example.org/acme/widget.git";
        let slug = RepositorySlug::from_remote_url(url).unwrap();
        assert_eq!(slug.to_string(), "acme/widget");
    }

    #[test]
    fn test_unrecognised_url() {
        assert!(RepositorySlug::from_remote_url("/srv/git/widget.git").is_err());
    }

    #[test]
    fn test_explicit_slug() {
        assert_eq!(
            RepositorySlug::parse("acme/widget").unwrap(),
            RepositorySlug::new("acme", "widget")
        );
    }

    #[test]
    fn test_explicit_slug_without_separator() {
        let err = RepositorySlug::parse("acme").unwrap_err();
        assert!(err.to_string().contains("Invalid repository format"));
    }

    #[test]
    fn test_explicit_slug_with_empty_side() {
        assert!(RepositorySlug::parse("/widget").is_err());
        assert!(RepositorySlug::parse("acme/").is_err());
    }
}

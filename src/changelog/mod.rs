//! Changelog generation and the changelog file.
//!
//! A generator renders the section for the release being made; the header
//! block from `[changelog] header` (or from an existing `cliff.toml`) sits
//! above every section in the file and is stripped again before the text is
//! reused as a release body.

pub mod conventional;

pub use conventional::ConventionalChangelog;

use std::fs;
use std::path::Path;

use crate::context::ReleaseContext;
use crate::error::{KiaraError, Result};
use crate::git::Git;

/// Produces the changelog section for the version in `ctx`
pub trait ChangelogGenerator: Send + Sync {
    fn generate(&self, ctx: &ReleaseContext, git: &dyn Git) -> Result<String>;
}

/// Header followed by one section, as stored in the context
pub fn compose(header: &str, section: &str) -> String {
    let header = header.trim_end();
    if header.is_empty() {
        section.to_string()
    } else {
        format!("{}\n\n{}", header, section)
    }
}

/// Everything after the header block, or the whole text when the header is absent
pub fn strip_header<'a>(content: &'a str, header: &str) -> &'a str {
    let header = header.trim_end();
    if header.is_empty() {
        return content;
    }
    match content.find(header) {
        Some(idx) => content[idx + header.len()..].trim_start(),
        None => content,
    }
}

/// The `[changelog] header` of the git-cliff configuration at `path`.
///
/// `None` when the file is absent or sets no header.
pub fn cliff_header(path: &Path) -> Result<Option<String>> {
    if !path.is_file() {
        return Ok(None);
    }

    let contents = fs::read_to_string(path)?;
    let table = contents
        .parse::<toml::Table>()
        .map_err(|e| KiaraError::changelog(format!("Failed to parse {}: {}", path.display(), e)))?;

    Ok(table
        .get("changelog")
        .and_then(|changelog| changelog.get("header"))
        .and_then(|header| header.as_str())
        .filter(|header| !header.trim().is_empty())
        .map(str::to_string))
}

/// Insert `section` below the header of the changelog at `path`.
///
/// Returns `true` when the file did not exist and was created.
pub fn prepend(path: &Path, header: &str, section: &str) -> Result<bool> {
    if !path.exists() {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, compose(header, section))?;
        return Ok(true);
    }

    let existing = fs::read_to_string(path)
        .map_err(|e| KiaraError::changelog(format!("Cannot read {}: {}", path.display(), e)))?;
    let section = section.trim_end();
    let trimmed_header = header.trim_end();

    let found = existing
        .find(trimmed_header)
        .filter(|_| !trimmed_header.is_empty());
    let updated = match found {
        Some(idx) => {
            let (head, rest) = existing.split_at(idx + trimmed_header.len());
            let rest = rest.trim_start();
            if rest.is_empty() {
                format!("{}\n\n{}\n", head, section)
            } else {
                format!("{}\n\n{}\n\n{}", head, section, rest)
            }
        }
        None => format!("{}\n\n{}", section, existing),
    };

    fs::write(path, updated)?;
    Ok(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const HEADER: &str = "# Changelog\n\nAll notable changes.\n";

    #[test]
    fn test_strip_header() {
        let content = compose(HEADER, "## v1.0.0 (2026-01-01)\n\n- first\n");
        assert_eq!(
            strip_header(&content, HEADER),
            "## v1.0.0 (2026-01-01)\n\n- first\n"
        );
        assert_eq!(strip_header("no header here", HEADER), "no header here");
        assert_eq!(strip_header("text", ""), "text");
    }

    #[test]
    fn test_cliff_header() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("cliff.toml");
        assert_eq!(cliff_header(&path).unwrap(), None);

        fs::write(
            &path,
            r#"[changelog]
header = """
# Release notes
"""
trim = true

[git]
conventional_commits = true
"#,
        )
        .unwrap();
        assert_eq!(
            cliff_header(&path).unwrap().as_deref(),
            Some("# Release notes\n")
        );

        fs::write(&path, "[git]\nconventional_commits = true\n").unwrap();
        assert_eq!(cliff_header(&path).unwrap(), None);
    }

    #[test]
    fn test_cliff_header_rejects_invalid_toml() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("cliff.toml");
        fs::write(&path, "[changelog\nheader = ").unwrap();

        let err = cliff_header(&path).unwrap_err();
        assert!(matches!(err, KiaraError::Changelog(_)));
    }

    #[test]
    fn test_prepend_creates_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("CHANGELOG.md");

        assert!(prepend(&path, HEADER, "## v1.0.0\n\n- first\n").unwrap());
        assert_eq!(
            fs::read_to_string(&path).unwrap(),
            "# Changelog\n\nAll notable changes.\n\n## v1.0.0\n\n- first\n"
        );
    }

    #[test]
    fn test_prepend_inserts_below_header() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("CHANGELOG.md");
        fs::write(
            &path,
            "# Changelog\n\nAll notable changes.\n\n## v1.0.0\n\n- first\n",
        )
        .unwrap();

        assert!(!prepend(&path, HEADER, "## v1.1.0\n\n- second\n").unwrap());
        assert_eq!(
            fs::read_to_string(&path).unwrap(),
            "# Changelog\n\nAll notable changes.\n\n## v1.1.0\n\n- second\n\n## v1.0.0\n\n- first\n"
        );
    }

    #[test]
    fn test_prepend_without_header_goes_first() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("CHANGELOG.md");
        fs::write(&path, "## v1.0.0\n").unwrap();

        prepend(&path, HEADER, "## v1.1.0\n").unwrap();
        assert_eq!(
            fs::read_to_string(&path).unwrap(),
            "## v1.1.0\n\n## v1.0.0\n"
        );
    }
}

//! Markdown changelog built from conventional commits

use chrono::{Local, NaiveDate};
use tracing::debug;

use crate::changelog::ChangelogGenerator;
use crate::context::ReleaseContext;
use crate::domain::{ParsedCommit, RepositorySlug};
use crate::error::Result;
use crate::git::{CommitInfo, Git};

/// Section titles in rendering order, with the commit types they collect
const GROUPS: [(&str, &[&str]); 6] = [
    ("Features", &["feat"]),
    ("Bug Fixes", &["fix"]),
    ("Performance", &["perf"]),
    ("Refactoring", &["refactor"]),
    ("Documentation", &["docs"]),
    ("Miscellaneous", &[]),
];

struct Entry {
    scope: Option<String>,
    text: String,
    hash: String,
}

/// Groups the commits since the latest tag by type
#[derive(Debug, Default, Clone)]
pub struct ConventionalChangelog {
    date: Option<NaiveDate>,
}

impl ConventionalChangelog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fix the section date instead of using today
    pub fn with_date(mut self, date: NaiveDate) -> Self {
        self.date = Some(date);
        self
    }

    /// Render one release section.
    ///
    /// Empty when no commit in the range is worth listing.
    pub fn render(
        &self,
        tag: &str,
        commits: &[CommitInfo],
        repository: Option<&RepositorySlug>,
    ) -> String {
        let mut breaking: Vec<Entry> = Vec::new();
        let mut groups: Vec<Vec<Entry>> = GROUPS.iter().map(|_| Vec::new()).collect();

        for commit in commits {
            let parsed = ParsedCommit::parse(&commit.message);
            if is_release_commit(&parsed) {
                continue;
            }

            for note in &parsed.notes {
                breaking.push(Entry {
                    scope: parsed.scope.clone(),
                    text: note.text.clone(),
                    hash: commit.hash.clone(),
                });
            }

            let subject = if parsed.r#type.is_some() {
                parsed.subject.clone()
            } else {
                parsed.header.clone()
            };
            let index = GROUPS
                .iter()
                .position(|(_, types)| parsed.r#type.as_deref().is_some_and(|t| types.contains(&t)))
                .unwrap_or(GROUPS.len() - 1);
            groups[index].push(Entry {
                scope: parsed.scope.clone(),
                text: subject,
                hash: commit.hash.clone(),
            });
        }

        if breaking.is_empty() && groups.iter().all(Vec::is_empty) {
            return String::new();
        }

        let date = self.date.unwrap_or_else(|| Local::now().date_naive());
        let mut output = format!("## {} ({})\n", tag, date.format("%Y-%m-%d"));
        if !breaking.is_empty() {
            push_group(&mut output, "Breaking Changes", &breaking, repository);
        }
        for ((title, _), entries) in GROUPS.iter().zip(&groups) {
            if !entries.is_empty() {
                push_group(&mut output, title, entries, repository);
            }
        }

        output
    }
}

fn is_release_commit(parsed: &ParsedCommit) -> bool {
    parsed.is_type("chore") && parsed.scope.as_deref() == Some("release")
}

fn push_group(
    output: &mut String,
    title: &str,
    entries: &[Entry],
    repository: Option<&RepositorySlug>,
) {
    output.push_str(&format!("\n### {}\n\n", title));
    for entry in entries {
        output.push_str("- ");
        if let Some(scope) = entry.scope.as_deref().filter(|s| !s.is_empty()) {
            output.push_str(&format!("**{}:** ", scope));
        }
        output.push_str(&entry.text);

        let short = entry.hash.get(..7).unwrap_or(&entry.hash);
        match repository {
            Some(repo) => output.push_str(&format!(
                " ([{}]({}/commit/{}))",
                short,
                repo.url(),
                entry.hash
            )),
            None => output.push_str(&format!(" ({})", short)),
        }
        output.push('\n');
    }
}

impl ChangelogGenerator for ConventionalChangelog {
    fn generate(&self, ctx: &ReleaseContext, git: &dyn Git) -> Result<String> {
        let latest_tag = git.latest_tag()?;
        let commits = git.commits_since(latest_tag.as_deref())?;
        let tag = ctx.tag_name();
        debug!(tag = %tag, since = ?latest_tag, commits = commits.len(), "rendering changelog");
        Ok(self.render(&tag, &commits, ctx.repository.as_ref()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn generator() -> ConventionalChangelog {
        ConventionalChangelog::new().with_date(NaiveDate::from_ymd_opt(2026, 3, 14).unwrap())
    }

    fn commit(n: u8, message: &str) -> CommitInfo {
        CommitInfo::new(format!("{:02x}{}", n, "a".repeat(38)), message)
    }

    #[test]
    fn test_groups_by_type() {
        let commits = vec![
            commit(1, "feat(cli): add --json"),
            commit(2, "fix: handle empty input"),
            commit(3, "update readme"),
            commit(4, "feat: second feature"),
        ];
        let section = generator().render("v1.3.0", &commits, None);

        assert!(section.starts_with("## v1.3.0 (2026-03-14)\n"));
        let features = section.find("### Features").unwrap();
        let fixes = section.find("### Bug Fixes").unwrap();
        let misc = section.find("### Miscellaneous").unwrap();
        assert!(features < fixes && fixes < misc);
        assert!(section.contains("- **cli:** add --json (01aaaaa)"));
        assert!(section.contains("- update readme (03aaaaa)"));
    }

    #[test]
    fn test_breaking_notes_listed_first() {
        let commits = vec![commit(1, "fix: bug\n\nBREAKING CHANGE: config moved")];
        let section = generator().render("v2.0.0", &commits, None);

        let breaking = section.find("### Breaking Changes").unwrap();
        assert!(breaking < section.find("### Bug Fixes").unwrap());
        assert!(section.contains("- config moved"));
    }

    #[test]
    fn test_links_to_repository() {
        let repo = RepositorySlug::new("acme", "widget");
        let hash = format!("{:02x}{}", 1, "a".repeat(38));
        let section = generator().render("v1.0.1", &[commit(1, "fix: x")], Some(&repo));
        assert!(section.contains(&format!(
            "([01aaaaa](https://github.com/acme/widget/commit/{}))",
            hash
        )));
    }

    #[test]
    fn test_skips_previous_release_commits() {
        let commits = vec![
            commit(1, "chore(release): widget@1.0.0"),
            commit(2, "fix: after release"),
        ];
        let section = generator().render("v1.0.1", &commits, None);
        assert!(!section.contains("widget@1.0.0"));
        assert!(section.contains("- after release (02aaaaa)"));
    }

    #[test]
    fn test_empty_range_renders_nothing() {
        assert_eq!(generator().render("v1.0.1", &[], None), "");

        let only_release = vec![commit(1, "chore(release): widget@1.0.0")];
        assert_eq!(generator().render("v1.0.1", &only_release, None), "");
    }
}

use crate::domain::{ParsedCommit, ReleaseType};
use std::fmt;

/// Bump level reduced from a commit range
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum BumpLevel {
    Patch,
    Minor,
    Major,
}

impl BumpLevel {
    pub fn release_type(&self) -> ReleaseType {
        match self {
            BumpLevel::Major => ReleaseType::Major,
            BumpLevel::Minor => ReleaseType::Minor,
            BumpLevel::Patch => ReleaseType::Patch,
        }
    }
}

impl fmt::Display for BumpLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.release_type().fmt(f)
    }
}

/// Counts gathered over the commits since the last release
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CommitAnalysis {
    pub breaking_notes: usize,
    pub features: usize,
    pub commits: usize,
}

impl CommitAnalysis {
    /// Any breaking note wins; features never escalate beyond minor.
    pub fn level(&self) -> BumpLevel {
        if self.breaking_notes > 0 {
            BumpLevel::Major
        } else if self.features > 0 {
            BumpLevel::Minor
        } else {
            BumpLevel::Patch
        }
    }

    pub fn reason(&self) -> String {
        let (verb, suffix) = if self.breaking_notes == 1 {
            ("is", "")
        } else {
            ("are", "S")
        };
        format!(
            "There {} {} BREAKING CHANGE{} and {} features",
            verb, self.breaking_notes, suffix, self.features
        )
    }
}

/// Reduces commit messages to a [`CommitAnalysis`]
#[derive(Debug, Default, Clone, Copy)]
pub struct VersionAnalyzer;

impl VersionAnalyzer {
    pub fn new() -> Self {
        VersionAnalyzer
    }

    pub fn analyze_commits(&self, commits: &[ParsedCommit]) -> CommitAnalysis {
        commits
            .iter()
            .fold(CommitAnalysis::default(), |acc, commit| CommitAnalysis {
                breaking_notes: acc.breaking_notes + commit.notes.len(),
                features: acc.features + usize::from(commit.is_type("feat")),
                commits: acc.commits + 1,
            })
    }

    pub fn analyze_messages<S: AsRef<str>>(&self, messages: &[S]) -> CommitAnalysis {
        let parsed: Vec<ParsedCommit> = messages
            .iter()
            .map(|m| ParsedCommit::parse(m.as_ref()))
            .collect();
        self.analyze_commits(&parsed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn level<S: AsRef<str>>(messages: &[S]) -> BumpLevel {
        VersionAnalyzer::new().analyze_messages(messages).level()
    }

    #[test]
    fn test_analyze_major_from_breaking_header() {
        assert_eq!(
            level(&["feat: new feature", "fix(api)!: breaking change"]),
            BumpLevel::Major
        );
    }

    #[test]
    fn test_breaking_note_beats_any_feature_count() {
        let messages = [
            "feat: a",
            "feat: b",
            "feat: c",
            "fix: bug\n\nBREAKING CHANGE: removes flag",
        ];
        assert_eq!(level(&messages), BumpLevel::Major);
    }

    #[test]
    fn test_analyze_minor() {
        assert_eq!(
            level(&["feat: new feature", "fix: bug fix"]),
            BumpLevel::Minor
        );
    }

    #[test]
    fn test_feature_count_does_not_escalate() {
        let messages: Vec<String> = (0..25).map(|i| format!("feat: feature {}", i)).collect();
        assert_eq!(level(messages.as_slice()), BumpLevel::Minor);
    }

    #[test]
    fn test_analyze_patch() {
        assert_eq!(
            level(&["fix: bug fix", "refactor: code cleanup"]),
            BumpLevel::Patch
        );
    }

    #[test]
    fn test_non_conventional_defaults_to_patch() {
        assert_eq!(level(&["Random commit", "Update README"]), BumpLevel::Patch);
        assert_eq!(level::<&str>(&[]), BumpLevel::Patch);
    }

    #[test]
    fn test_counts_and_reason() {
        let analysis =
            VersionAnalyzer::new().analyze_messages(&["feat: one", "feat!: two", "chore: three"]);
        assert_eq!(analysis.breaking_notes, 1);
        assert_eq!(analysis.features, 2);
        assert_eq!(analysis.commits, 3);
        assert_eq!(
            analysis.reason(),
            "There is 1 BREAKING CHANGE and 2 features"
        );
    }
}

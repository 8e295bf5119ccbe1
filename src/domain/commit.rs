use regex::Regex;
use std::sync::OnceLock;

/// Keyword that opens a breaking-change note in a commit body
pub const BREAKING_CHANGE_KEYWORD: &str = "BREAKING CHANGE";

fn header_pattern() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN
        .get_or_init(|| Regex::new(r"^(\w*)(?:\((.*)\))?: (.*)$").ok())
        .as_ref()
}

fn breaking_header_pattern() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN
        .get_or_init(|| Regex::new(r"^(\w*)(?:\((.*)\))?!: (.*)$").ok())
        .as_ref()
}

/// A note block found in a commit body, e.g. `BREAKING CHANGE: drops v1 API`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitNote {
    pub title: String,
    pub text: String,
}

/// Parsed representation of a conventional commit message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedCommit {
    /// `None` when the header does not follow the conventional grammar
    pub r#type: Option<String>,
    pub scope: Option<String>,
    pub subject: String,
    pub header: String,
    pub notes: Vec<CommitNote>,
}

impl ParsedCommit {
    /// Parse a full commit message.
    ///
    /// Supported headers:
    /// - `type(scope): subject`
    /// - `type: subject`
    /// - `type(scope)!: subject` and `type!: subject`, which count as a breaking note
    ///
    /// Body lines starting with `BREAKING CHANGE:` open a note that runs until
    /// the next blank line.
    pub fn parse(message: &str) -> Self {
        let mut lines = message.lines();
        let header = lines.next().unwrap_or_default().trim_end().to_string();

        let breaking = breaking_header_pattern().and_then(|re| re.captures(&header));
        let breaking_header = breaking.is_some();
        let captures = breaking.or_else(|| header_pattern().and_then(|re| re.captures(&header)));
        let group = |index: usize| {
            captures
                .as_ref()
                .and_then(|c| c.get(index))
                .map(|m| m.as_str().to_string())
        };

        let (r#type, scope) = (group(1), group(2));
        let subject = match &captures {
            Some(_) => group(3).unwrap_or_default(),
            None => header.clone(),
        };

        let mut notes = parse_notes(lines);
        if breaking_header && notes.is_empty() {
            notes.push(CommitNote {
                title: BREAKING_CHANGE_KEYWORD.to_string(),
                text: subject.clone(),
            });
        }

        ParsedCommit {
            r#type: r#type.filter(|t| !t.is_empty()),
            scope: scope.filter(|s| !s.is_empty()),
            subject,
            header,
            notes,
        }
    }

    pub fn is_breaking(&self) -> bool {
        !self.notes.is_empty()
    }

    pub fn is_type(&self, kind: &str) -> bool {
        self.r#type.as_deref() == Some(kind)
    }
}

fn parse_notes<'a>(lines: impl Iterator<Item = &'a str>) -> Vec<CommitNote> {
    let prefix = format!("{}:", BREAKING_CHANGE_KEYWORD);
    let mut notes: Vec<CommitNote> = Vec::new();
    let mut open = false;

    for line in lines {
        if let Some(rest) = line.strip_prefix(&prefix) {
            notes.push(CommitNote {
                title: BREAKING_CHANGE_KEYWORD.to_string(),
                text: rest.trim().to_string(),
            });
            open = true;
        } else if line.trim().is_empty() {
            open = false;
        } else if open {
            if let Some(note) = notes.last_mut() {
                if !note.text.is_empty() {
                    note.text.push('\n');
                }
                note.text.push_str(line.trim());
            }
        }
    }

    notes
}

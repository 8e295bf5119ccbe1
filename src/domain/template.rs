/// Placeholder replaced by the project name
pub const NAME_PLACEHOLDER: &str = "{{name}}";

/// Placeholder replaced by the new version
pub const VERSION_PLACEHOLDER: &str = "{{version}}";

/// A message template such as `chore(release): {{name}}@{{version}}`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Template<'a> {
    pattern: &'a str,
}

impl<'a> Template<'a> {
    pub fn new(pattern: &'a str) -> Self {
        Template { pattern }
    }

    /// Substitute every occurrence of both placeholders
    pub fn render(&self, name: &str, version: &str) -> String {
        self.pattern
            .replace(NAME_PLACEHOLDER, name)
            .replace(VERSION_PLACEHOLDER, version)
    }
}

//! User interface module - interaction (prompts) and formatting.
//!
//! Separates concerns:
//! - `formatter` - Output formatting functions
//! - This module - Interactive prompts behind the [Prompt] trait

use std::collections::VecDeque;
use std::sync::Mutex;

use dialoguer::theme::ColorfulTheme;
use dialoguer::Select;

use crate::error::{KiaraError, Result};

pub mod formatter;

// Re-export formatter functions for convenience
pub use formatter::{
    display_boundary_warning, display_dry_run, display_error, display_rollback, display_skip,
    display_status, display_success, display_version_plan,
};

/// One entry of a single-select prompt
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Choice {
    pub label: String,
    pub value: String,
    pub hint: Option<String>,
}

impl Choice {
    pub fn new(label: impl Into<String>, value: impl Into<String>) -> Self {
        Choice {
            label: label.into(),
            value: value.into(),
            hint: None,
        }
    }

    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }

    fn display(&self) -> String {
        match &self.hint {
            Some(hint) => format!("{} - {}", self.label, hint),
            None => self.label.clone(),
        }
    }
}

/// Interactive single-select.
///
/// Implementations return the chosen [Choice::value]; cancelling the prompt
/// is an error, never a silent default.
pub trait Prompt: Send + Sync {
    fn select(&self, message: &str, choices: &[Choice]) -> Result<String>;
}

/// Terminal prompt backed by `dialoguer`
#[derive(Debug, Default, Clone, Copy)]
pub struct TerminalPrompt;

impl Prompt for TerminalPrompt {
    fn select(&self, message: &str, choices: &[Choice]) -> Result<String> {
        if choices.is_empty() {
            return Err(KiaraError::validation(format!("No choices for '{}'", message)));
        }

        let items: Vec<String> = choices.iter().map(Choice::display).collect();
        let selection = Select::with_theme(&ColorfulTheme::default())
            .with_prompt(message)
            .items(&items)
            .default(0)
            .interact_opt()
            .map_err(|e| KiaraError::cancelled(format!("{}: {}", message, e)))?;

        selection
            .and_then(|index| choices.get(index))
            .map(|choice| choice.value.clone())
            .ok_or_else(|| KiaraError::cancelled(message.to_string()))
    }
}

/// Prompt that replays prepared answers, for tests and non-interactive runs.
///
/// `None` in the script answers the next prompt with a cancellation.
#[derive(Debug, Default)]
pub struct ScriptedPrompt {
    answers: Mutex<VecDeque<Option<String>>>,
    asked: Mutex<Vec<(String, Vec<Choice>)>>,
}

impl ScriptedPrompt {
    pub fn new<I, S>(answers: I) -> Self
    where
        I: IntoIterator<Item = Option<S>>,
        S: Into<String>,
    {
        ScriptedPrompt {
            answers: Mutex::new(answers.into_iter().map(|a| a.map(Into::into)).collect()),
            asked: Mutex::new(Vec::new()),
        }
    }

    /// A prompt that must never be shown
    pub fn silent() -> Self {
        Self::default()
    }

    /// Every prompt shown so far, with its choices
    pub fn asked(&self) -> Vec<(String, Vec<Choice>)> {
        self.asked
            .lock()
            .map(|asked| asked.clone())
            .unwrap_or_default()
    }
}

impl Prompt for ScriptedPrompt {
    fn select(&self, message: &str, choices: &[Choice]) -> Result<String> {
        if let Ok(mut asked) = self.asked.lock() {
            asked.push((message.to_string(), choices.to_vec()));
        }

        let answer = self
            .answers
            .lock()
            .map_err(|_| KiaraError::cancelled(message.to_string()))?
            .pop_front()
            .ok_or_else(|| {
                KiaraError::validation(format!(
                    "Unexpected prompt '{}' in non-interactive mode",
                    message
                ))
            })?;

        let value = answer.ok_or_else(|| KiaraError::cancelled(message.to_string()))?;
        if choices.iter().any(|c| c.value == value) {
            Ok(value)
        } else {
            Err(KiaraError::validation(format!(
                "'{}' is not a valid answer for '{}'",
                value, message
            )))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn choices() -> Vec<Choice> {
        vec![
            Choice::new("Automatic Bump", "auto").with_hint("conventional commits"),
            Choice::new("Manual Bump", "manual"),
        ]
    }

    #[test]
    fn test_choice_display() {
        assert_eq!(
            choices()[0].display(),
            "Automatic Bump - conventional commits"
        );
        assert_eq!(choices()[1].display(), "Manual Bump");
    }

    #[test]
    fn test_scripted_answers_in_order() {
        let prompt = ScriptedPrompt::new([Some("manual"), Some("auto")]);
        assert_eq!(prompt.select("first", &choices()).unwrap(), "manual");
        assert_eq!(prompt.select("second", &choices()).unwrap(), "auto");
        assert_eq!(prompt.asked().len(), 2);
    }

    #[test]
    fn test_scripted_cancel() {
        let prompt = ScriptedPrompt::new([None::<&str>]);
        let err = prompt.select("pick", &choices()).unwrap_err();
        assert!(matches!(err, KiaraError::Cancelled(_)));
    }

    #[test]
    fn test_silent_prompt_rejects_prompting() {
        let prompt = ScriptedPrompt::silent();
        assert!(prompt.select("pick", &choices()).is_err());
        assert_eq!(prompt.asked()[0].0, "pick");
    }

    #[test]
    fn test_scripted_rejects_unknown_value() {
        let prompt = ScriptedPrompt::new([Some("sideways")]);
        assert!(prompt.select("pick", &choices()).is_err());
    }
}

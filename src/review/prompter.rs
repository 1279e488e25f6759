//! Interactive review prompts.

use colored::Colorize;
use dialoguer::{Editor, Select};

use crate::error::ReviewError;

use super::ReviewDecision;

/// Asks the user what to do with a generated result.
pub trait ReviewPrompter {
    /// Show `text` and return the user's decision. `prompt` is the template
    /// currently in use, offered for editing before a regeneration.
    fn review(&mut self, label: &str, text: &str, prompt: &str)
    -> Result<ReviewDecision, ReviewError>;

    /// Let the user edit `text`. `None` means the edit was cancelled.
    fn edit(&mut self, text: &str) -> Result<Option<String>, ReviewError>;
}

const CHOICES: [&str; 5] = [
    "Looks good",
    "Edit",
    "Regenerate",
    "Modify prompt and regenerate",
    "Cancel",
];

/// Terminal prompter built on `dialoguer`.
#[derive(Debug, Default)]
pub struct DialoguerPrompter;

impl DialoguerPrompter {
    fn separator() -> colored::ColoredString {
        "----------------".blue()
    }
}

impl ReviewPrompter for DialoguerPrompter {
    fn review(
        &mut self,
        label: &str,
        text: &str,
        prompt: &str,
    ) -> Result<ReviewDecision, ReviewError> {
        eprintln!("\n{}\n{}\n{}\n", label.bold(), Self::separator(), text);
        eprintln!("{}", Self::separator());

        let choice = Select::new()
            .with_prompt(format!("What would you like to do with this {}?", label.to_lowercase()))
            .items(&CHOICES)
            .default(0)
            .interact_opt()?;

        let decision = match choice {
            Some(0) => ReviewDecision::Accept,
            Some(1) => ReviewDecision::Edit,
            Some(2) => ReviewDecision::Regenerate(None),
            Some(3) => {
                let edited = Editor::new().extension(".txt").edit(prompt)?;
                match edited {
                    Some(p) if !p.trim().is_empty() => ReviewDecision::Regenerate(Some(p)),
                    _ => ReviewDecision::Regenerate(None),
                }
            }
            _ => ReviewDecision::Abort,
        };
        Ok(decision)
    }

    fn edit(&mut self, text: &str) -> Result<Option<String>, ReviewError> {
        Ok(Editor::new().extension(".md").edit(text)?)
    }
}

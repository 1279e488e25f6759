//! Generate/review loop shared by the commit and changelog commands.
//!
//! A [`ReviewStrategy`] supplies the context, reduces it to a summary and turns
//! the summary into text. The loop drives it and, in interactive mode, lets a
//! [`ReviewPrompter`] accept, edit, regenerate or abort.

pub mod present;
pub mod prompter;

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::error::ReviewError;

pub use prompter::{DialoguerPrompter, ReviewPrompter};

/// Output of a generation step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReviewResult {
    Plain(String),
    Structured { header: String, content: String },
}

impl ReviewResult {
    /// Single string form: `header\n\ncontent`, or `header` when content is blank.
    pub fn normalize(&self) -> String {
        match self {
            ReviewResult::Plain(text) => text.trim().to_string(),
            ReviewResult::Structured { header, content } => {
                let header = header.trim();
                let content = content.trim();
                if content.is_empty() {
                    header.to_string()
                } else {
                    format!("{header}\n\n{content}")
                }
            }
        }
    }
}

/// What the user chose after seeing a result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReviewDecision {
    Accept,
    Edit,
    /// Generate again, optionally with a replacement prompt.
    Regenerate(Option<String>),
    Abort,
}

/// How the loop ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReviewOutcome {
    Accepted(String),
    /// The strategy found nothing to work on.
    NoInput,
    Aborted,
}

#[derive(Debug, Clone, Default)]
pub struct ReviewOptions {
    pub interactive: bool,
    /// User prompt template, passed to every generation.
    pub prompt: Option<String>,
}

/// The pluggable steps of the loop.
#[async_trait]
pub trait ReviewStrategy: Send + Sync {
    type Context: Send + Sync;

    /// Name shown to the user, e.g. "Commit message".
    fn label(&self) -> &str;

    /// Built-in prompt template, shown when the user edits the prompt.
    fn default_prompt(&self) -> &str;

    /// Gather input. `None` means there is nothing to generate from.
    async fn build_context(&self) -> Result<Option<Self::Context>, ReviewError>;

    async fn reduce(&self, context: &Self::Context) -> Result<String, ReviewError>;

    async fn generate(&self, summary: &str, prompt: Option<&str>)
    -> Result<ReviewResult, ReviewError>;

    /// Called when [`build_context`](Self::build_context) found nothing.
    fn no_result(&self) {}
}

/// Run collect, reduce, generate and review until the result is accepted or
/// the user aborts.
pub async fn generate_and_review<S, P>(
    strategy: &S,
    prompter: &mut P,
    options: &ReviewOptions,
) -> Result<ReviewOutcome, ReviewError>
where
    S: ReviewStrategy + ?Sized,
    P: ReviewPrompter + ?Sized,
{
    let Some(context) = strategy.build_context().await? else {
        debug!("{}: nothing to generate from", strategy.label());
        strategy.no_result();
        return Ok(ReviewOutcome::NoInput);
    };

    let summary = strategy.reduce(&context).await?;
    debug!("{}: summary is {} chars", strategy.label(), summary.len());

    let mut prompt = options.prompt.clone();

    loop {
        let mut text = strategy
            .generate(&summary, prompt.as_deref())
            .await?
            .normalize();
        if text.is_empty() {
            return Err(ReviewError::EmptyResult);
        }

        if !options.interactive {
            return Ok(ReviewOutcome::Accepted(text));
        }

        loop {
            let current_prompt = prompt.as_deref().unwrap_or(strategy.default_prompt());
            match prompter.review(strategy.label(), &text, current_prompt)? {
                ReviewDecision::Accept => return Ok(ReviewOutcome::Accepted(text)),
                ReviewDecision::Abort => return Ok(ReviewOutcome::Aborted),
                ReviewDecision::Edit => match prompter.edit(&text)? {
                    Some(edited) if !edited.trim().is_empty() => {
                        text = edited.trim().to_string();
                    }
                    Some(_) => warn!("Edited {} is empty, keeping the previous one", strategy.label()),
                    None => debug!("Edit cancelled"),
                },
                ReviewDecision::Regenerate(new_prompt) => {
                    if new_prompt.is_some() {
                        prompt = new_prompt;
                    }
                    break;
                }
            }
        }
    }
}

//! Commit message generation from staged changes.

use std::path::PathBuf;

use async_trait::async_trait;
use colored::Colorize;
use git2::{ErrorCode, Oid, Repository};
use serde::Deserialize;
use tracing::debug;

use crate::error::{GitError, PresentError, ReviewError};
use crate::git::diff::{CommitRef, DiffResolver, FileDiff};
use crate::git::{ChangeSet, IgnoreRules, StatusProvider, Vcs, collect_from_provider};
use crate::llm::prompt::COMMIT_TEMPLATE;
use crate::llm::{Agent, COMMIT_PROMPT, PromptTemplate, SUMMARIZE_PROMPT, parse_json};
use crate::review::present::InteractiveHandler;
use crate::review::{ReviewResult, ReviewStrategy};

/// Rough characters-per-token ratio used to size prompts.
pub const CHARS_PER_TOKEN: usize = 4;

pub fn estimate_tokens(text: &str) -> usize {
    text.chars().count().div_ceil(CHARS_PER_TOKEN)
}

/// Longest prefix of `text` within `tokens`, cut on a char boundary.
pub fn truncate_to_tokens(text: &str, tokens: usize) -> &str {
    let max_chars = tokens.saturating_mul(CHARS_PER_TOKEN);
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

/// The model's commit message.
#[derive(Debug, Clone, Deserialize)]
pub struct CommitMessage {
    pub title: String,
    #[serde(default)]
    pub body: Option<String>,
}

impl From<CommitMessage> for ReviewResult {
    fn from(message: CommitMessage) -> Self {
        ReviewResult::Structured {
            header: message.title,
            content: message.body.unwrap_or_default(),
        }
    }
}

/// Staged changes and their diffs.
#[derive(Debug, Clone)]
pub struct CommitContext {
    pub changes: ChangeSet,
    pub diffs: Vec<FileDiff>,
}

pub struct CommitStrategy<'a> {
    pub status: &'a dyn StatusProvider,
    pub vcs: &'a dyn Vcs,
    pub agent: &'a dyn Agent,
    pub root: PathBuf,
    pub rules: IgnoreRules,
    pub token_limit: usize,
    pub summarize_prompt: Option<String>,
}

fn section(diff: &FileDiff, body: &str) -> String {
    let heading = diff
        .change
        .summary
        .as_deref()
        .unwrap_or(diff.change.file_path.as_str());
    format!("{heading}\n{}\n", body.trim_end())
}

impl CommitStrategy<'_> {
    async fn summarize_diff(&self, diff: &str) -> Result<String, ReviewError> {
        let template = PromptTemplate::resolve(self.summarize_prompt.as_deref(), &SUMMARIZE_PROMPT);
        let summary = self.agent.complete(&template.render(&[("diff", diff)])).await?;
        Ok(summary.trim().to_string())
    }
}

#[async_trait]
impl ReviewStrategy for CommitStrategy<'_> {
    type Context = CommitContext;

    fn label(&self) -> &str {
        "Commit message"
    }

    fn default_prompt(&self) -> &str {
        COMMIT_TEMPLATE
    }

    async fn build_context(&self) -> Result<Option<CommitContext>, ReviewError> {
        let changes = collect_from_provider(self.status, &self.rules)?;
        if changes.staged.is_empty() {
            debug!(
                "No staged changes ({} unstaged, {} untracked)",
                changes.unstaged.len(),
                changes.untracked.len()
            );
            return Ok(None);
        }

        let resolver = DiffResolver::new(self.vcs, &self.root);
        let diffs = resolver
            .resolve_all(&changes.staged, &CommitRef::Staged)
            .await?;
        Ok(Some(CommitContext { changes, diffs }))
    }

    async fn reduce(&self, context: &CommitContext) -> Result<String, ReviewError> {
        let full = context
            .diffs
            .iter()
            .map(|d| section(d, &d.diff))
            .collect::<Vec<_>>()
            .join("\n");

        if estimate_tokens(&full) <= self.token_limit {
            return Ok(full);
        }

        let share = (self.token_limit / context.diffs.len().max(1)).max(1);
        debug!(
            "Summary is ~{} tokens (limit {}), summarizing diffs over {} tokens",
            estimate_tokens(&full),
            self.token_limit,
            share
        );

        let mut sections = Vec::with_capacity(context.diffs.len());
        for diff in &context.diffs {
            if estimate_tokens(&diff.diff) > share {
                let summary = self.summarize_diff(&diff.diff).await?;
                sections.push(section(diff, &summary));
            } else {
                sections.push(section(diff, &diff.diff));
            }
        }

        let reduced = sections.join("\n");
        Ok(truncate_to_tokens(&reduced, self.token_limit).to_string())
    }

    async fn generate(
        &self,
        summary: &str,
        prompt: Option<&str>,
    ) -> Result<ReviewResult, ReviewError> {
        let template = PromptTemplate::resolve(prompt, &COMMIT_PROMPT);
        let response = self
            .agent
            .complete(&template.render(&[("summary", summary)]))
            .await?;

        match parse_json::<CommitMessage>(&response) {
            Some(message) => Ok(message.into()),
            None => {
                debug!("Response is not a JSON commit message, using it verbatim");
                Ok(ReviewResult::Plain(response))
            }
        }
    }

    fn no_result(&self) {
        eprintln!("{}", "No staged changes found.".red());
    }
}

/// Create a commit from the current index on HEAD.
///
/// Works on an unborn branch, producing a root commit.
pub fn commit_staged(repo: &Repository, message: &str) -> Result<Oid, GitError> {
    if repo.is_bare() {
        return Err(GitError::BareRepository);
    }

    let mut index = repo.index().map_err(GitError::CommitFailed)?;
    let tree_id = index.write_tree().map_err(GitError::CommitFailed)?;
    let tree = repo.find_tree(tree_id).map_err(GitError::CommitFailed)?;

    let sig = repo.signature().map_err(GitError::SignatureMissing)?;

    let parent = match repo.head() {
        Ok(head) => Some(head.peel_to_commit().map_err(GitError::CommitFailed)?),
        Err(e) if e.code() == ErrorCode::UnbornBranch || e.code() == ErrorCode::NotFound => None,
        Err(e) => return Err(GitError::CommitFailed(e)),
    };
    let parents: Vec<&git2::Commit<'_>> = parent.iter().collect();

    repo.commit(Some("HEAD"), &sig, &sig, message, &tree, &parents)
        .map_err(GitError::CommitFailed)
}

/// Commits the staged index with the accepted message.
pub struct CommitHandler {
    root: PathBuf,
}

impl CommitHandler {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

impl InteractiveHandler for CommitHandler {
    fn handle(&self, result: &str) -> Result<(), PresentError> {
        let repo = Repository::open(&self.root).map_err(GitError::OpenRepository)?;
        let oid = commit_staged(&repo, result)?;
        let short = oid.to_string().chars().take(7).collect::<String>();
        eprintln!("{} {}", "Committed".green(), short.bold());
        Ok(())
    }
}

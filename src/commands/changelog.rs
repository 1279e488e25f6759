//! Changelog generation from commit messages.

use std::path::PathBuf;

use async_trait::async_trait;
use colored::Colorize;
use git2::Repository;
use tracing::debug;

use crate::error::{GitError, ReviewError};
use crate::git::{CommitRange, commit_log_current_branch, commit_log_range};
use crate::llm::prompt::CHANGELOG_TEMPLATE;
use crate::llm::{Agent, CHANGELOG_PROMPT, PromptTemplate};
use crate::review::{ReviewResult, ReviewStrategy};

/// Which commits the changelog covers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChangelogSource {
    Range(CommitRange),
    /// Commits on the current branch that are not on the target branch.
    Branch(String),
}

pub struct ChangelogStrategy<'a> {
    pub root: PathBuf,
    pub source: ChangelogSource,
    pub agent: &'a dyn Agent,
}

impl ChangelogStrategy<'_> {
    fn commit_messages(&self) -> Result<Vec<String>, GitError> {
        let repo = Repository::open(&self.root).map_err(GitError::OpenRepository)?;
        match &self.source {
            ChangelogSource::Range(range) => commit_log_range(&repo, range, true),
            ChangelogSource::Branch(target) => {
                debug!("No range provided, comparing current branch with {}", target);
                commit_log_current_branch(&repo, target)
            }
        }
    }
}

#[async_trait]
impl ReviewStrategy for ChangelogStrategy<'_> {
    type Context = Vec<String>;

    fn label(&self) -> &str {
        "Changelog"
    }

    fn default_prompt(&self) -> &str {
        CHANGELOG_TEMPLATE
    }

    async fn build_context(&self) -> Result<Option<Vec<String>>, ReviewError> {
        let messages = self.commit_messages()?;
        debug!("Found {} commits", messages.len());
        Ok((!messages.is_empty()).then_some(messages))
    }

    async fn reduce(&self, context: &Vec<String>) -> Result<String, ReviewError> {
        Ok(context.join("\n"))
    }

    async fn generate(
        &self,
        summary: &str,
        prompt: Option<&str>,
    ) -> Result<ReviewResult, ReviewError> {
        let template = PromptTemplate::resolve(prompt, &CHANGELOG_PROMPT);
        let text = self
            .agent
            .complete(&template.render(&[("summary", summary)]))
            .await?;
        Ok(ReviewResult::Plain(text))
    }

    fn no_result(&self) {
        let message = match self.source {
            ChangelogSource::Range(_) => "No commits found in the provided range.",
            ChangelogSource::Branch(_) => "No commits found in the current branch.",
        };
        eprintln!("{}", message.red());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::client::MockAgent;

    #[tokio::test]
    async fn test_reduce_joins_messages() {
        let agent = MockAgent::new();
        let strategy = ChangelogStrategy {
            root: PathBuf::from("."),
            source: ChangelogSource::Branch("main".into()),
            agent: &agent,
        };
        let summary = strategy
            .reduce(&vec!["feat: a".to_string(), "fix: b".to_string()])
            .await
            .unwrap();
        assert_eq!(summary, "feat: a\nfix: b");
    }

    #[tokio::test]
    async fn test_generate_renders_summary_into_prompt() {
        let mut agent = MockAgent::new();
        agent
            .expect_complete()
            .withf(|prompt: &str| prompt.contains("feat: a\nfix: b") && prompt.contains("### Added"))
            .returning(|_| Ok("### Added\n- a\n".to_string()));
        let strategy = ChangelogStrategy {
            root: PathBuf::from("."),
            source: ChangelogSource::Branch("main".into()),
            agent: &agent,
        };

        let result = strategy.generate("feat: a\nfix: b", None).await.unwrap();
        assert_eq!(result.normalize(), "### Added\n- a");
    }

    #[tokio::test]
    async fn test_build_context_outside_repository_fails() {
        let dir = tempfile::tempdir().unwrap();
        let agent = MockAgent::new();
        let strategy = ChangelogStrategy {
            root: dir.path().to_path_buf(),
            source: ChangelogSource::Branch("main".into()),
            agent: &agent,
        };

        let result = strategy.build_context().await;
        assert!(matches!(
            result,
            Err(ReviewError::Git(GitError::OpenRepository(_)))
        ));
    }
}

//! Async wrapper around the system `git` binary for diff, show and rev-parse.
//!
//! Shelling out keeps the user's git config (diff drivers, textconv, attributes)
//! in effect for the text that ends up in prompts.

use std::path::{Path, PathBuf};
use std::process::Stdio;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::debug;

use crate::error::GitError;

/// Version-control operations the diff resolver depends on.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Vcs: Send + Sync {
    /// `git diff <args>`.
    async fn diff(&self, args: Vec<String>) -> Result<String, GitError>;

    /// `git show <object>`, e.g. `HEAD:src/lib.rs` or `:src/lib.rs` for the index.
    async fn show(&self, object: &str) -> Result<String, GitError>;

    /// `git rev-parse <rev>`, trimmed.
    async fn rev_parse(&self, rev: &str) -> Result<String, GitError>;
}

/// [`Vcs`] implementation running `git` inside a working directory.
#[derive(Debug, Clone)]
pub struct GitCli {
    root: PathBuf,
}

impl GitCli {
    /// Create a client for `root`, failing if `git` is not on PATH.
    pub fn new(root: impl Into<PathBuf>) -> Result<Self, GitError> {
        which::which("git").map_err(|_| GitError::NotInstalled)?;
        Ok(Self { root: root.into() })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    async fn run(&self, args: &[&str]) -> Result<String, GitError> {
        debug!("git {}", args.join(" "));

        let output = Command::new("git")
            .args(args)
            .current_dir(&self.root)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await
            .map_err(GitError::SpawnFailed)?;

        if !output.status.success() {
            return Err(GitError::CommandFailed {
                command: args.first().copied().unwrap_or_default().to_string(),
                code: output.status.code().unwrap_or(-1),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        Ok(String::from_utf8_lossy(&output.stdout).to_string())
    }
}

#[async_trait]
impl Vcs for GitCli {
    async fn diff(&self, args: Vec<String>) -> Result<String, GitError> {
        let mut full = vec!["diff", "--no-color"];
        full.extend(args.iter().map(String::as_str));
        self.run(&full).await
    }

    async fn show(&self, object: &str) -> Result<String, GitError> {
        self.run(&["show", "--no-color", object]).await
    }

    async fn rev_parse(&self, rev: &str) -> Result<String, GitError> {
        let out = self.run(&["rev-parse", "--verify", rev]).await?;
        Ok(out.trim().to_string())
    }
}

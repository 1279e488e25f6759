//! coco - commit messages and changelogs from git diffs, written by an LLM.
//!
//! # Overview
//!
//! coco collects staged changes (or commit messages, for changelogs), filters
//! them with the configured ignore rules, resolves per-file diffs and asks an
//! LLM to summarize them. The result goes through a review loop where it can
//! be accepted, edited or regenerated before it is printed, copied or committed.

pub mod commands;
pub mod config;
pub mod error;
pub mod git;
pub mod llm;
pub mod review;

// Re-export commonly used types
pub use config::{Config, LlmService, Provider};
pub use error::{
    ConfigError, DiffError, FilterError, GitError, LlmError, PresentError, ReviewError,
};
pub use git::{ChangeSet, CommitRef, FileChange, FileStatus, IgnoreRules};
pub use review::{ReviewOutcome, ReviewResult, ReviewStrategy, generate_and_review};

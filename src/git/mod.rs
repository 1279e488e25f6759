//! Git operations: status, ignore filtering, change collection, diffs and history.

pub mod changes;
pub mod cli;
pub mod diff;
pub mod filter;
pub mod log;
pub mod status;

pub use changes::{ChangeSet, FileChange, FileStatus, collect_changes, collect_from_provider};
pub use cli::{GitCli, Vcs};
pub use diff::{CommitRef, DiffResolver, FileDiff};
pub use filter::IgnoreRules;
pub use log::{CommitRange, commit_log_current_branch, commit_log_range};
pub use status::{RepoStatus, StatusEntry, StatusProvider, StatusSnapshot};

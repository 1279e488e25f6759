//! Partitioning of status entries into staged, unstaged and untracked changes.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::GitError;

use super::filter::{IgnoreRules, filter_entries};
use super::status::{CODE_UNTRACKED, StatusEntry, StatusProvider, StatusSnapshot, is_active};

/// Status of a changed file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileStatus {
    Added,
    Modified,
    Deleted,
    Renamed,
}

impl FileStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            FileStatus::Added => "added",
            FileStatus::Modified => "modified",
            FileStatus::Deleted => "deleted",
            FileStatus::Renamed => "renamed",
        }
    }

    /// Infer a status from a single porcelain code.
    pub fn from_code(code: char) -> Self {
        match code {
            'A' | CODE_UNTRACKED => FileStatus::Added,
            'D' => FileStatus::Deleted,
            'R' => FileStatus::Renamed,
            _ => FileStatus::Modified,
        }
    }
}

impl fmt::Display for FileStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A file that changed, as seen from one partition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileChange {
    pub file_path: String,
    /// Previous path for renamed files (None otherwise).
    pub old_file_path: Option<String>,
    pub status: FileStatus,
    pub summary: Option<String>,
}

/// Changes grouped by where they live.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeSet {
    pub staged: Vec<FileChange>,
    pub unstaged: Vec<FileChange>,
    pub untracked: Vec<FileChange>,
}

impl ChangeSet {
    pub fn is_empty(&self) -> bool {
        self.staged.is_empty() && self.unstaged.is_empty() && self.untracked.is_empty()
    }
}

/// Which partition a change is being built for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Partition {
    Staged,
    Unstaged,
}

/// Decides the status label of a tracked change.
pub trait StatusResolver {
    fn resolve(&self, entry: &StatusEntry, partition: Partition) -> FileStatus;
}

/// Produces the one-line, commit-style description of a change.
pub trait SummaryResolver {
    fn summarize(&self, file_path: &str, old_file_path: Option<&str>, status: FileStatus) -> String;
}

/// Reads the status from the code of the partition being built.
#[derive(Debug, Clone, Copy, Default)]
pub struct CodeStatusResolver;

impl StatusResolver for CodeStatusResolver {
    fn resolve(&self, entry: &StatusEntry, partition: Partition) -> FileStatus {
        match partition {
            Partition::Staged => FileStatus::from_code(entry.index),
            Partition::Unstaged => FileStatus::from_code(entry.working_dir),
        }
    }
}

/// `"<status>: <path>"`, or `"renamed: <old> -> <new>"`.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultSummaryResolver;

impl SummaryResolver for DefaultSummaryResolver {
    fn summarize(&self, file_path: &str, old_file_path: Option<&str>, status: FileStatus) -> String {
        match (status, old_file_path) {
            (FileStatus::Renamed, Some(old)) => format!("renamed: {old} -> {file_path}"),
            _ => format!("{status}: {file_path}"),
        }
    }
}

/// Partition a status snapshot into a [`ChangeSet`].
///
/// Ignored paths are dropped before partitioning. A partially staged file
/// appears in both `staged` and `unstaged`.
pub fn collect_changes(
    snapshot: StatusSnapshot,
    rules: &IgnoreRules,
    status_resolver: &dyn StatusResolver,
    summary_resolver: &dyn SummaryResolver,
) -> ChangeSet {
    let StatusSnapshot { files, renamed } = snapshot;
    let mut changes = ChangeSet::default();

    for entry in filter_entries(files, rules) {
        if entry.index == CODE_UNTRACKED && entry.working_dir == CODE_UNTRACKED {
            let status = FileStatus::Added;
            let summary = summary_resolver.summarize(&entry.path, None, status);
            changes.untracked.push(FileChange {
                file_path: entry.path,
                old_file_path: None,
                status,
                summary: Some(summary),
            });
            continue;
        }

        let old_file_path = renamed
            .iter()
            .find(|r| r.to == entry.path)
            .map(|r| r.from.clone());

        let build = |partition: Partition| {
            let status = status_resolver.resolve(&entry, partition);
            let summary =
                summary_resolver.summarize(&entry.path, old_file_path.as_deref(), status);
            FileChange {
                file_path: entry.path.clone(),
                old_file_path: old_file_path.clone(),
                status,
                summary: Some(summary),
            }
        };

        if is_active(entry.index) {
            changes.staged.push(build(Partition::Staged));
        }
        if is_active(entry.working_dir) {
            changes.unstaged.push(build(Partition::Unstaged));
        }
    }

    changes
}

/// Query `provider` and partition the result with the default resolvers.
///
/// A failed status query is returned unchanged.
pub fn collect_from_provider(
    provider: &dyn StatusProvider,
    rules: &IgnoreRules,
) -> Result<ChangeSet, GitError> {
    let snapshot = provider.status()?;
    Ok(collect_changes(
        snapshot,
        rules,
        &CodeStatusResolver,
        &DefaultSummaryResolver,
    ))
}

//! Porcelain-style status snapshots read through git2.

use std::path::{Path, PathBuf};

use git2::{Repository, Status, StatusOptions};
use serde::{Deserialize, Serialize};

use crate::error::GitError;

/// Status code for "no change".
pub const CODE_NONE: char = ' ';

/// Status code for untracked paths.
pub const CODE_UNTRACKED: char = '?';

/// One file from a status query, with separate index and working-tree codes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusEntry {
    pub path: String,
    pub working_dir: char,
    pub index: char,
}

impl StatusEntry {
    pub fn new(path: impl Into<String>, working_dir: char, index: char) -> Self {
        Self {
            path: path.into(),
            working_dir,
            index,
        }
    }
}

/// A rename recorded by the status query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rename {
    pub from: String,
    pub to: String,
}

/// Everything the change collector needs from one status query.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusSnapshot {
    pub files: Vec<StatusEntry>,
    pub renamed: Vec<Rename>,
}

/// Whether a porcelain code marks an actual change (not blank, not untracked).
pub fn is_active(code: char) -> bool {
    code != CODE_NONE && code != CODE_UNTRACKED
}

/// Source of status snapshots.
pub trait StatusProvider: Send + Sync {
    fn status(&self) -> Result<StatusSnapshot, GitError>;
}

/// Status provider backed by a repository on disk.
pub struct RepoStatus {
    root: PathBuf,
}

impl RepoStatus {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl StatusProvider for RepoStatus {
    fn status(&self) -> Result<StatusSnapshot, GitError> {
        let repo = Repository::open(&self.root).map_err(GitError::OpenRepository)?;
        read_status(&repo)
    }
}

/// Read the status of `repo` as porcelain codes.
///
/// Renames are detected between HEAD and the index only, matching what
/// `git status --porcelain` reports.
pub fn read_status(repo: &Repository) -> Result<StatusSnapshot, GitError> {
    let mut opts = StatusOptions::new();
    opts.include_untracked(true)
        .recurse_untracked_dirs(true)
        .include_ignored(false)
        .renames_head_to_index(true);

    let statuses = repo.statuses(Some(&mut opts)).map_err(GitError::Status)?;

    let mut snapshot = StatusSnapshot::default();
    for entry in statuses.iter() {
        let status = entry.status();
        if status.is_ignored() {
            continue;
        }

        let Some(path) = entry_path(&entry) else {
            continue;
        };

        if status.is_index_renamed()
            && let Some(from) = entry
                .head_to_index()
                .and_then(|d| d.old_file().path().map(|p| p.to_string_lossy().to_string()))
        {
            snapshot.renamed.push(Rename {
                from,
                to: path.clone(),
            });
        }

        let (working_dir, index) = codes(status);
        if working_dir == CODE_NONE && index == CODE_NONE {
            continue;
        }
        snapshot.files.push(StatusEntry {
            path,
            working_dir,
            index,
        });
    }

    Ok(snapshot)
}

/// Path of an entry, preferring the post-rename path.
fn entry_path(entry: &git2::StatusEntry<'_>) -> Option<String> {
    new_path(entry.head_to_index())
        .or_else(|| new_path(entry.index_to_workdir()))
        .or_else(|| entry.path().map(str::to_string))
}

fn new_path(delta: Option<git2::DiffDelta<'_>>) -> Option<String> {
    delta.and_then(|d| d.new_file().path().map(|p| p.to_string_lossy().to_string()))
}

/// Translate git2 status flags into (working_dir, index) porcelain codes.
fn codes(status: Status) -> (char, char) {
    if status.is_wt_new() {
        return (CODE_UNTRACKED, CODE_UNTRACKED);
    }

    let index = if status.is_index_new() {
        'A'
    } else if status.is_index_renamed() {
        'R'
    } else if status.is_index_deleted() {
        'D'
    } else if status.is_index_modified() {
        'M'
    } else if status.is_index_typechange() {
        'T'
    } else {
        CODE_NONE
    };

    let working_dir = if status.is_wt_deleted() {
        'D'
    } else if status.is_wt_modified() {
        'M'
    } else if status.is_wt_renamed() {
        'R'
    } else if status.is_wt_typechange() {
        'T'
    } else if status.is_conflicted() {
        'U'
    } else {
        CODE_NONE
    };

    (working_dir, index)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_active() {
        assert!(is_active('M'));
        assert!(is_active('R'));
        assert!(!is_active(' '));
        assert!(!is_active('?'));
    }

    #[test]
    fn test_codes_untracked() {
        assert_eq!(codes(Status::WT_NEW), ('?', '?'));
    }

    #[test]
    fn test_codes_partially_staged() {
        assert_eq!(
            codes(Status::INDEX_MODIFIED | Status::WT_MODIFIED),
            ('M', 'M')
        );
    }

    #[test]
    fn test_codes_staged_rename() {
        assert_eq!(codes(Status::INDEX_RENAMED), (' ', 'R'));
    }

    #[test]
    fn test_read_status_on_fresh_repo() {
        let dir = tempfile::tempdir().unwrap();
        let repo = Repository::init(dir.path()).unwrap();
        std::fs::write(dir.path().join("new.txt"), "hello\n").unwrap();

        let snapshot = read_status(&repo).unwrap();
        assert_eq!(snapshot.files, vec![StatusEntry::new("new.txt", '?', '?')]);
        assert!(snapshot.renamed.is_empty());
    }
}

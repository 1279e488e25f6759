//! Per-file diff resolution, including the renamed-file patch.

use std::fmt;
use std::path::{Path, PathBuf};

use similar::TextDiff;
use tracing::{debug, warn};

use crate::error::DiffError;

use super::changes::{FileChange, FileStatus};
use super::cli::Vcs;

pub const DELETED_MARKER: &str = "This file has been deleted.";
pub const UNCHANGED_MARKER: &str = "File contents are unchanged.";
pub const COMPARE_FAILED_MARKER: &str = "Error comparing file contents.";

/// Lines of context around each hunk of a renamed-file patch.
const CONTEXT_LINES: usize = 3;

/// Lines before the first hunk of a two-file patch (`Index:`, separator, `---`, `+++`).
const PATCH_PREAMBLE_LINES: usize = 4;

/// What a diff is taken against.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommitRef {
    /// Index against HEAD.
    Staged,
    /// Working tree against the index.
    Unstaged,
    /// Raw file content; there is no previous version.
    Untracked,
    /// Any revision understood by git.
    Commit(String),
}

impl CommitRef {
    pub fn parse(value: &str) -> Self {
        match value {
            "--staged" => CommitRef::Staged,
            "--unstaged" => CommitRef::Unstaged,
            "--untracked" => CommitRef::Untracked,
            other => CommitRef::Commit(other.to_string()),
        }
    }
}

impl From<&str> for CommitRef {
    fn from(value: &str) -> Self {
        CommitRef::parse(value)
    }
}

impl fmt::Display for CommitRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CommitRef::Staged => f.write_str("--staged"),
            CommitRef::Unstaged => f.write_str("--unstaged"),
            CommitRef::Untracked => f.write_str("--untracked"),
            CommitRef::Commit(rev) => f.write_str(rev),
        }
    }
}

/// A change together with its resolved diff text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileDiff {
    pub change: FileChange,
    pub diff: String,
}

/// Where one side of a renamed-file comparison is read from.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Side {
    /// A revision; the empty string is the index.
    Revision(String),
    WorkTree,
}

/// Resolves diffs for changes in one repository.
pub struct DiffResolver<'a> {
    vcs: &'a dyn Vcs,
    root: PathBuf,
}

impl<'a> DiffResolver<'a> {
    /// `root` is the working directory that untracked paths are relative to.
    pub fn new(vcs: &'a dyn Vcs, root: impl Into<PathBuf>) -> Self {
        Self {
            vcs,
            root: root.into(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolve the diff text for `change` against `commit_ref`.
    pub async fn resolve(&self, change: &FileChange, commit_ref: &CommitRef) -> Result<String, DiffError> {
        if change.status == FileStatus::Deleted {
            return Ok(DELETED_MARKER.to_string());
        }

        if change.status == FileStatus::Renamed
            && let Some(old_path) = change.old_file_path.as_deref()
        {
            return Ok(self.renamed_diff(change, old_path, commit_ref).await);
        }

        self.default_diff(change, commit_ref).await
    }

    /// Resolve every change in order, stopping at the first error.
    pub async fn resolve_all(
        &self,
        changes: &[FileChange],
        commit_ref: &CommitRef,
    ) -> Result<Vec<FileDiff>, DiffError> {
        let mut diffs = Vec::with_capacity(changes.len());
        for change in changes {
            let diff = self.resolve(change, commit_ref).await?;
            diffs.push(FileDiff {
                change: change.clone(),
                diff,
            });
        }
        Ok(diffs)
    }

    async fn default_diff(&self, change: &FileChange, commit_ref: &CommitRef) -> Result<String, DiffError> {
        let path = change.file_path.clone();
        let args = match commit_ref {
            CommitRef::Staged => vec!["--staged".to_string(), "--".to_string(), path],
            CommitRef::Unstaged => vec!["--".to_string(), path],
            CommitRef::Untracked => return self.read_untracked(&change.file_path).await,
            CommitRef::Commit(rev) => vec![rev.clone(), "--".to_string(), path],
        };
        Ok(self.vcs.diff(args).await?)
    }

    async fn read_untracked(&self, path: &str) -> Result<String, DiffError> {
        tokio::fs::read_to_string(self.root.join(path))
            .await
            .map_err(|source| DiffError::UntrackedRead {
                path: path.to_string(),
                source,
            })
    }

    /// Patch between the old path at the previous revision and the new path
    /// at the current one. Never fails: problems yield a placeholder.
    ///
    /// `Unstaged` and `Untracked` have no revision to take a parent of, so
    /// they compare the index copy of the old path with the working-tree copy
    /// of the new path instead of resolving `<ref>~1`.
    async fn renamed_diff(&self, change: &FileChange, old_path: &str, commit_ref: &CommitRef) -> String {
        let (previous, current) = match commit_ref {
            CommitRef::Staged => (Side::Revision("HEAD".to_string()), Side::Revision(String::new())),
            CommitRef::Commit(rev) => {
                let parent = match self.vcs.rev_parse(&format!("{rev}~1")).await {
                    Ok(hash) => hash,
                    Err(e) => {
                        warn!(
                            "Error getting previous commit hash for {}: {}. Falling back to HEAD",
                            change.file_path, e
                        );
                        "HEAD".to_string()
                    }
                };
                (Side::Revision(parent), Side::Revision(rev.clone()))
            }
            CommitRef::Unstaged | CommitRef::Untracked => {
                (Side::Revision(String::new()), Side::WorkTree)
            }
        };

        let (old_content, new_content) = tokio::join!(
            self.read_side(&previous, old_path),
            self.read_side(&current, &change.file_path)
        );

        match (old_content, new_content) {
            (Ok(old), Ok(new)) if old == new => UNCHANGED_MARKER.to_string(),
            (Ok(old), Ok(new)) => {
                let patch = two_file_patch(old_path, &change.file_path, &old, &new);
                strip_patch_preamble(&patch)
            }
            (Err(e), _) | (_, Err(e)) => {
                warn!("Error comparing file contents for {}: {}", change.file_path, e);
                COMPARE_FAILED_MARKER.to_string()
            }
        }
    }

    async fn read_side(&self, side: &Side, path: &str) -> Result<String, DiffError> {
        match side {
            Side::Revision(rev) => {
                debug!("Reading {}:{}", rev, path);
                Ok(self.vcs.show(&format!("{rev}:{path}")).await?)
            }
            Side::WorkTree => tokio::fs::read_to_string(self.root.join(path))
                .await
                .map_err(|source| DiffError::UntrackedRead {
                    path: path.to_string(),
                    source,
                }),
        }
    }
}

/// Unified patch between two named files, including its 4-line preamble.
pub fn two_file_patch(old_name: &str, new_name: &str, old: &str, new: &str) -> String {
    let diff = TextDiff::from_lines(old, new);
    let mut patch = format!("Index: {new_name}\n{}\n", "=".repeat(67));
    patch.push_str(
        &diff
            .unified_diff()
            .context_radius(CONTEXT_LINES)
            .header(old_name, new_name)
            .to_string(),
    );
    patch
}

/// Drop the file-header preamble, keeping only the hunks.
pub fn strip_patch_preamble(patch: &str) -> String {
    patch
        .split('\n')
        .skip(PATCH_PREAMBLE_LINES)
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::GitError;
    use crate::git::cli::MockVcs;

    fn change(path: &str, old: Option<&str>, status: FileStatus) -> FileChange {
        FileChange {
            file_path: path.to_string(),
            old_file_path: old.map(str::to_string),
            status,
            summary: None,
        }
    }

    fn git_failure() -> GitError {
        GitError::CommandFailed {
            command: "show".into(),
            code: 128,
            stderr: "fatal: path does not exist".into(),
        }
    }

    #[test]
    fn test_commit_ref_parse() {
        assert_eq!(CommitRef::parse("--staged"), CommitRef::Staged);
        assert_eq!(CommitRef::parse("--unstaged"), CommitRef::Unstaged);
        assert_eq!(CommitRef::parse("--untracked"), CommitRef::Untracked);
        assert_eq!(CommitRef::parse("abc123"), CommitRef::Commit("abc123".into()));
        assert_eq!(CommitRef::parse("abc123").to_string(), "abc123");
    }

    #[tokio::test]
    async fn test_deleted_marker_for_every_ref() {
        let vcs = MockVcs::new();
        let resolver = DiffResolver::new(&vcs, "/nonexistent");
        let c = change("gone.rs", None, FileStatus::Deleted);

        for r in ["--staged", "--unstaged", "--untracked", "HEAD~3"] {
            let diff = resolver.resolve(&c, &CommitRef::parse(r)).await.unwrap();
            assert_eq!(diff, "This file has been deleted.");
        }
    }

    #[tokio::test]
    async fn test_staged_diff_args() {
        let mut vcs = MockVcs::new();
        vcs.expect_diff()
            .withf(|args| args == &["--staged", "--", "src/lib.rs"])
            .times(1)
            .returning(|_| Ok("+added\n".to_string()));

        let resolver = DiffResolver::new(&vcs, "/repo");
        let c = change("src/lib.rs", None, FileStatus::Modified);
        let diff = resolver.resolve(&c, &CommitRef::Staged).await.unwrap();
        assert_eq!(diff, "+added\n");
    }

    #[tokio::test]
    async fn test_unstaged_and_commit_diff_args() {
        let mut vcs = MockVcs::new();
        vcs.expect_diff()
            .withf(|args| args == &["--", "a.rs"])
            .times(1)
            .returning(|_| Ok("unstaged".to_string()));
        vcs.expect_diff()
            .withf(|args| args == &["abc123", "--", "a.rs"])
            .times(1)
            .returning(|_| Ok("commit".to_string()));

        let resolver = DiffResolver::new(&vcs, "/repo");
        let c = change("a.rs", None, FileStatus::Modified);
        assert_eq!(resolver.resolve(&c, &CommitRef::Unstaged).await.unwrap(), "unstaged");
        assert_eq!(
            resolver.resolve(&c, &CommitRef::parse("abc123")).await.unwrap(),
            "commit"
        );
    }

    #[tokio::test]
    async fn test_untracked_reads_file_content() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("new.txt"), "fresh content\n").unwrap();

        let vcs = MockVcs::new();
        let resolver = DiffResolver::new(&vcs, dir.path());
        let c = change("new.txt", None, FileStatus::Added);
        let diff = resolver.resolve(&c, &CommitRef::Untracked).await.unwrap();
        assert_eq!(diff, "fresh content\n");
    }

    #[tokio::test]
    async fn test_untracked_missing_file_errors_with_io_text() {
        let dir = tempfile::tempdir().unwrap();
        let vcs = MockVcs::new();
        let resolver = DiffResolver::new(&vcs, dir.path());
        let c = change("missing.txt", None, FileStatus::Added);

        let err = resolver.resolve(&c, &CommitRef::Untracked).await.unwrap_err();
        let io_text = std::fs::read_to_string(dir.path().join("missing.txt"))
            .unwrap_err()
            .to_string();
        assert!(matches!(err, DiffError::UntrackedRead { ref path, .. } if path == "missing.txt"));
        assert_eq!(err.to_string(), format!("Error reading untracked file: {io_text}"));
    }

    #[tokio::test]
    async fn test_default_diff_propagates_git_error() {
        let mut vcs = MockVcs::new();
        vcs.expect_diff().returning(|_| Err(git_failure()));
        let resolver = DiffResolver::new(&vcs, "/repo");
        let c = change("a.rs", None, FileStatus::Modified);
        let result = resolver.resolve(&c, &CommitRef::Staged).await;
        assert!(matches!(result, Err(DiffError::Git(GitError::CommandFailed { .. }))));
    }

    #[tokio::test]
    async fn test_renamed_without_old_path_uses_default_diff() {
        let mut vcs = MockVcs::new();
        vcs.expect_diff().times(1).returning(|_| Ok("default".to_string()));
        let resolver = DiffResolver::new(&vcs, "/repo");
        let c = change("new.rs", None, FileStatus::Renamed);
        assert_eq!(resolver.resolve(&c, &CommitRef::Staged).await.unwrap(), "default");
    }

    #[tokio::test]
    async fn test_renamed_identical_contents() {
        let mut vcs = MockVcs::new();
        vcs.expect_show().times(2).returning(|_| Ok("same\n".to_string()));
        let resolver = DiffResolver::new(&vcs, "/repo");
        let c = change("new.rs", Some("old.rs"), FileStatus::Renamed);
        let diff = resolver.resolve(&c, &CommitRef::Staged).await.unwrap();
        assert_eq!(diff, "File contents are unchanged.");
    }

    #[tokio::test]
    async fn test_renamed_staged_reads_head_and_index() {
        let mut vcs = MockVcs::new();
        vcs.expect_show()
            .withf(|object| object == "HEAD:old.rs")
            .times(1)
            .returning(|_| Ok("a\nb\nc\n".to_string()));
        vcs.expect_show()
            .withf(|object| object == ":new.rs")
            .times(1)
            .returning(|_| Ok("a\nB\nc\n".to_string()));

        let resolver = DiffResolver::new(&vcs, "/repo");
        let c = change("new.rs", Some("old.rs"), FileStatus::Renamed);
        let diff = resolver.resolve(&c, &CommitRef::Staged).await.unwrap();

        assert!(diff.starts_with("@@ -1,3 +1,3 @@"), "got: {diff}");
        assert!(diff.contains("-b\n"));
        assert!(diff.contains("+B\n"));
        assert!(!diff.contains("--- old.rs"));
        assert!(!diff.contains("+++ new.rs"));
    }

    #[tokio::test]
    async fn test_renamed_commit_uses_parent_revision() {
        let mut vcs = MockVcs::new();
        vcs.expect_rev_parse()
            .withf(|rev| rev == "abc~1")
            .times(1)
            .returning(|_| Ok("parent".to_string()));
        vcs.expect_show()
            .withf(|object| object == "parent:old.rs")
            .returning(|_| Ok("one\n".to_string()));
        vcs.expect_show()
            .withf(|object| object == "abc:new.rs")
            .returning(|_| Ok("two\n".to_string()));

        let resolver = DiffResolver::new(&vcs, "/repo");
        let c = change("new.rs", Some("old.rs"), FileStatus::Renamed);
        let diff = resolver.resolve(&c, &CommitRef::parse("abc")).await.unwrap();
        assert!(diff.contains("-one"));
        assert!(diff.contains("+two"));
    }

    #[tokio::test]
    async fn test_renamed_parent_failure_falls_back_to_head() {
        let mut vcs = MockVcs::new();
        vcs.expect_rev_parse().returning(|_| Err(git_failure()));
        vcs.expect_show()
            .withf(|object| object == "HEAD:old.rs")
            .times(1)
            .returning(|_| Ok("x\n".to_string()));
        vcs.expect_show()
            .withf(|object| object == "root:new.rs")
            .times(1)
            .returning(|_| Ok("x\n".to_string()));

        let resolver = DiffResolver::new(&vcs, "/repo");
        let c = change("new.rs", Some("old.rs"), FileStatus::Renamed);
        let diff = resolver.resolve(&c, &CommitRef::parse("root")).await.unwrap();
        assert_eq!(diff, UNCHANGED_MARKER);
    }

    #[tokio::test]
    async fn test_renamed_fetch_failure_returns_placeholder() {
        let mut vcs = MockVcs::new();
        vcs.expect_show()
            .withf(|object| object == "HEAD:old.rs")
            .returning(|_| Err(git_failure()));
        vcs.expect_show()
            .withf(|object| object == ":new.rs")
            .returning(|_| Ok("content\n".to_string()));

        let resolver = DiffResolver::new(&vcs, "/repo");
        let c = change("new.rs", Some("old.rs"), FileStatus::Renamed);
        let diff = resolver.resolve(&c, &CommitRef::Staged).await.unwrap();
        assert_eq!(diff, "Error comparing file contents.");
    }

    #[tokio::test]
    async fn test_renamed_unstaged_reads_working_tree() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("new.rs"), "edited\n").unwrap();

        let mut vcs = MockVcs::new();
        vcs.expect_show()
            .withf(|object| object == ":old.rs")
            .returning(|_| Ok("original\n".to_string()));
        vcs.expect_rev_parse().never();

        let resolver = DiffResolver::new(&vcs, dir.path());
        let c = change("new.rs", Some("old.rs"), FileStatus::Renamed);
        let diff = resolver.resolve(&c, &CommitRef::Unstaged).await.unwrap();
        assert!(diff.contains("-original"));
        assert!(diff.contains("+edited"));
    }

    #[test]
    fn test_two_file_patch_preamble_is_four_lines() {
        let patch = two_file_patch("old.txt", "new.txt", "a\n", "b\n");
        let lines: Vec<&str> = patch.lines().collect();
        assert_eq!(lines[0], "Index: new.txt");
        assert!(lines[1].chars().all(|c| c == '='));
        assert!(lines[2].starts_with("--- old.txt"));
        assert!(lines[3].starts_with("+++ new.txt"));
        assert!(lines[4].starts_with("@@"));

        let body = strip_patch_preamble(&patch);
        assert!(body.starts_with("@@ -1 +1 @@"));
    }

    #[tokio::test]
    async fn test_resolve_all_keeps_order() {
        let mut vcs = MockVcs::new();
        vcs.expect_diff()
            .returning(|args| Ok(format!("diff of {}", args.last().unwrap())));
        let resolver = DiffResolver::new(&vcs, "/repo");
        let changes = vec![
            change("b.rs", None, FileStatus::Modified),
            change("a.rs", None, FileStatus::Added),
        ];

        let diffs = resolver.resolve_all(&changes, &CommitRef::Staged).await.unwrap();
        assert_eq!(diffs.len(), 2);
        assert_eq!(diffs[0].diff, "diff of b.rs");
        assert_eq!(diffs[1].change.file_path, "a.rs");
    }
}

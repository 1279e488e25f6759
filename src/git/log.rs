//! Commit messages for a range or for the current branch.

use git2::{Oid, Repository, Sort};
use tracing::{debug, warn};

use crate::error::GitError;

/// A `<from>:<to>` range as given on the command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitRange {
    pub from: String,
    pub to: String,
}

impl CommitRange {
    /// Parse `from:to`. Both sides must be non-empty.
    pub fn parse(range: &str) -> Result<Self, GitError> {
        match range.split_once(':') {
            Some((from, to)) if !from.trim().is_empty() && !to.trim().is_empty() => Ok(Self {
                from: from.trim().to_string(),
                to: to.trim().to_string(),
            }),
            _ => Err(GitError::InvalidRange(range.to_string())),
        }
    }
}

/// Resolve a reference (tag, branch, commit hash) to a commit OID.
pub fn resolve_reference(repo: &Repository, reference: &str) -> Result<Oid, GitError> {
    if let Ok(oid) = Oid::from_str(reference)
        && repo.find_commit(oid).is_ok()
    {
        return Ok(oid);
    }

    let obj = repo
        .revparse_single(reference)
        .map_err(|e| GitError::ReferenceNotFound(reference.to_string(), e))?;
    let commit = obj
        .peel_to_commit()
        .map_err(|e| GitError::ReferenceNotFound(reference.to_string(), e))?;
    Ok(commit.id())
}

/// Messages of commits reachable from `to` but not from `from`, newest first.
pub fn commit_log_range(
    repo: &Repository,
    range: &CommitRange,
    no_merges: bool,
) -> Result<Vec<String>, GitError> {
    let from = resolve_reference(repo, &range.from)?;
    let to = resolve_reference(repo, &range.to)?;
    walk(repo, to, Some(from), no_merges)
}

/// Messages of commits on the current branch that are not on `target`.
///
/// `target` is looked up as given, then as `origin/<target>`.
pub fn commit_log_current_branch(
    repo: &Repository,
    target: &str,
) -> Result<Vec<String>, GitError> {
    let head = repo
        .head()
        .and_then(|h| h.peel_to_commit())
        .map_err(|e| GitError::ReferenceNotFound("HEAD".to_string(), e))?;

    let base = match resolve_reference(repo, target) {
        Ok(oid) => oid,
        Err(first) => {
            debug!("Branch {} not found locally, trying origin/{}", target, target);
            resolve_reference(repo, &format!("origin/{target}")).map_err(|_| first)?
        }
    };

    walk(repo, head.id(), Some(base), true)
}

fn walk(
    repo: &Repository,
    tip: Oid,
    hide: Option<Oid>,
    no_merges: bool,
) -> Result<Vec<String>, GitError> {
    let mut revwalk = repo.revwalk().map_err(GitError::RevwalkError)?;
    revwalk
        .set_sorting(Sort::TOPOLOGICAL | Sort::TIME)
        .map_err(GitError::RevwalkError)?;
    revwalk.push(tip).map_err(GitError::RevwalkError)?;
    if let Some(hide) = hide {
        revwalk.hide(hide).map_err(GitError::RevwalkError)?;
    }

    let mut messages = Vec::new();
    for oid_result in revwalk {
        let oid = match oid_result {
            Ok(oid) => oid,
            Err(e) => {
                warn!("Error during revwalk traversal: {}. Skipping commit.", e);
                continue;
            }
        };
        let commit = repo.find_commit(oid).map_err(GitError::RevwalkError)?;
        if no_merges && commit.parent_count() > 1 {
            continue;
        }
        let message = commit.message().unwrap_or("").trim().to_string();
        if !message.is_empty() {
            messages.push(message);
        }
    }

    Ok(messages)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_range() {
        let range = CommitRange::parse("HEAD~2:HEAD").unwrap();
        assert_eq!(range.from, "HEAD~2");
        assert_eq!(range.to, "HEAD");
    }

    #[test]
    fn test_parse_range_rejects_missing_side() {
        for bad in ["HEAD~2", ":HEAD", "HEAD:", ""] {
            assert!(
                matches!(CommitRange::parse(bad), Err(GitError::InvalidRange(_))),
                "accepted {bad:?}"
            );
        }
    }
}

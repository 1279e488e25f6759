//! Integration tests for committing the accepted message.

mod common;

use common::TestRepo;
use coco::commands::{CommitHandler, commit_staged};
use coco::review::present::InteractiveHandler;

#[test]
fn test_root_commit_on_unborn_branch() {
    let repo = TestRepo::new();
    repo.write("a.txt", "one\n");
    repo.stage("a.txt");

    let oid = commit_staged(&repo.repo, "feat: initial commit").unwrap();

    let commit = repo.repo.find_commit(oid).unwrap();
    assert_eq!(commit.parent_count(), 0);
    assert_eq!(commit.message(), Some("feat: initial commit"));
    assert_eq!(commit.author().name(), Some("Test User"));
    assert!(commit.tree().unwrap().get_name("a.txt").is_some());
}

#[test]
fn test_commit_uses_index_not_working_tree() {
    let repo = TestRepo::new();
    let first = repo.commit_file("a.txt", "one\n", "feat: initial");
    repo.write("a.txt", "two\n");
    repo.stage("a.txt");
    repo.write("a.txt", "three\n");

    let oid = commit_staged(&repo.repo, "fix: update a\n\nUse two.").unwrap();

    let commit = repo.repo.find_commit(oid).unwrap();
    assert_eq!(commit.parent_id(0).unwrap(), first);
    let entry = commit.tree().unwrap().get_name("a.txt").unwrap().id();
    let blob = repo.repo.find_blob(entry).unwrap();
    assert_eq!(blob.content(), b"two\n");
    assert_eq!(repo.repo.head().unwrap().target(), Some(oid));
}

#[test]
fn test_commit_handler_commits_result() {
    let repo = TestRepo::new();
    repo.commit_file("a.txt", "one\n", "feat: initial");
    repo.write("b.txt", "two\n");
    repo.stage("b.txt");

    CommitHandler::new(repo.path())
        .handle("feat: add b")
        .unwrap();

    let head = repo.repo.head().unwrap().peel_to_commit().unwrap();
    assert_eq!(head.message(), Some("feat: add b"));
}

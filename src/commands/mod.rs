//! The `commit` and `changelog` review strategies.

pub mod changelog;
pub mod commit;

pub use changelog::{ChangelogSource, ChangelogStrategy};
pub use commit::{CommitHandler, CommitStrategy, commit_staged};

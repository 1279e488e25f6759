//! Ignore rules applied to status entries before they are partitioned.

use std::path::{Path, PathBuf};

use globset::{GlobBuilder, GlobSet, GlobSetBuilder};
use ignore::Match;
use ignore::gitignore::{Gitignore, GitignoreBuilder};
use tracing::debug;

use crate::error::FilterError;

use super::status::StatusEntry;

/// Configured globs and extensions, plus the repository's ignore files.
#[derive(Debug, Clone)]
pub struct IgnoreRules {
    globs: GlobSet,
    extensions: Vec<String>,
    ignore_files: Gitignore,
}

impl IgnoreRules {
    /// Compile the given patterns.
    ///
    /// `*` does not cross `/`; use `**` to match any depth.
    pub fn new<P, E>(ignored_files: &[P], ignored_extensions: &[E]) -> Result<Self, FilterError>
    where
        P: AsRef<str>,
        E: AsRef<str>,
    {
        let mut builder = GlobSetBuilder::new();
        for pattern in ignored_files {
            let pattern = pattern.as_ref();
            let glob = GlobBuilder::new(pattern)
                .literal_separator(true)
                .build()
                .map_err(|source| FilterError::InvalidPattern {
                    pattern: pattern.to_string(),
                    source,
                })?;
            builder.add(glob);
        }
        let globs = builder.build().map_err(|source| FilterError::InvalidPattern {
            pattern: ignored_files
                .iter()
                .map(|p| p.as_ref())
                .collect::<Vec<_>>()
                .join(", "),
            source,
        })?;

        Ok(Self {
            globs,
            extensions: ignored_extensions
                .iter()
                .map(|e| e.as_ref().to_string())
                .filter(|e| !e.is_empty())
                .collect(),
            ignore_files: Gitignore::empty(),
        })
    }

    /// Also honour gitignore-style `files` (`.gitignore`, `.ignore`) whose
    /// patterns are relative to `root`. Later files take precedence, and `!`
    /// lines re-include paths excluded by earlier lines.
    pub fn with_ignore_files(mut self, root: &Path, files: &[PathBuf]) -> Result<Self, FilterError> {
        let mut builder = GitignoreBuilder::new(root);
        for file in files {
            if let Some(source) = builder.add(file) {
                return Err(FilterError::IgnoreFile {
                    path: file.display().to_string(),
                    source,
                });
            }
        }
        self.ignore_files = builder.build().map_err(|source| FilterError::IgnoreFile {
            path: root.display().to_string(),
            source,
        })?;
        debug!("Loaded {} ignore-file patterns", self.ignore_files.num_ignores());
        Ok(self)
    }

    /// Rules that ignore nothing.
    pub fn none() -> Self {
        Self {
            globs: GlobSet::empty(),
            extensions: Vec::new(),
            ignore_files: Gitignore::empty(),
        }
    }

    pub fn is_ignored(&self, path: &str) -> bool {
        match self.ignore_files.matched_path_or_any_parents(path, false) {
            Match::Ignore(_) => return true,
            Match::Whitelist(glob) => {
                debug!("{} re-included by {}", path, glob.original());
            }
            Match::None => {}
        }

        if self.globs.is_match(path) {
            return true;
        }

        let file_name = path.rsplit('/').next().unwrap_or(path);
        self.extensions.iter().any(|ext| file_name.ends_with(ext.as_str()))
    }
}

impl Default for IgnoreRules {
    fn default() -> Self {
        Self::none()
    }
}

/// Drop every entry whose path is matched by `rules`.
pub fn filter_entries(entries: Vec<StatusEntry>, rules: &IgnoreRules) -> Vec<StatusEntry> {
    entries
        .into_iter()
        .filter(|entry| !rules.is_ignored(&entry.path))
        .collect()
}

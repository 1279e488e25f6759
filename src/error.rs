//! Error types for coco modules using thiserror.

use thiserror::Error;

/// Errors from git repository operations (status, history, commits).
#[derive(Error, Debug)]
pub enum GitError {
    #[error("Failed to open repository: {0}")]
    OpenRepository(#[source] git2::Error),

    #[error("Failed to read repository status: {0}")]
    Status(#[source] git2::Error),

    #[error("Failed to find reference '{0}': {1}")]
    ReferenceNotFound(String, #[source] git2::Error),

    #[error("Failed to walk commit history: {0}")]
    RevwalkError(#[source] git2::Error),

    #[error("Invalid range '{0}'. Expected format is <from>:<to>")]
    InvalidRange(String),

    #[error("Git executable not found in PATH")]
    NotInstalled,

    #[error("Failed to spawn git: {0}")]
    SpawnFailed(#[source] std::io::Error),

    #[error("git {command} exited with code {code}: {stderr}")]
    CommandFailed {
        command: String,
        code: i32,
        stderr: String,
    },

    #[error("Bare repositories are not supported")]
    BareRepository,

    #[error("Failed to create commit: {0}")]
    CommitFailed(#[source] git2::Error),

    #[error("Git config error (missing user.name or user.email): {0}")]
    SignatureMissing(#[source] git2::Error),
}

/// Errors from compiling ignore rules.
#[derive(Error, Debug)]
pub enum FilterError {
    #[error("Invalid ignore pattern '{pattern}': {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: globset::Error,
    },

    #[error("Invalid ignore file {path}: {source}")]
    IgnoreFile {
        path: String,
        #[source]
        source: ignore::Error,
    },
}

/// Errors from resolving a single file diff.
#[derive(Error, Debug)]
pub enum DiffError {
    #[error("Error reading untracked file: {source}")]
    UntrackedRead {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Git(#[from] GitError),
}

/// Errors from configuration loading.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    ReadFailed {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file {path}: {source}")]
    ParseFailed {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Failed to read git config: {0}")]
    GitConfig(#[source] git2::Error),

    #[error("Invalid value '{value}' for {key}")]
    InvalidValue { key: String, value: String },

    #[error("No API key found for {0}. Set it in your config or via {1}")]
    MissingApiKey(String, &'static str),
}

/// Errors from LLM provider calls.
#[derive(Error, Debug)]
pub enum LlmError {
    #[error("Request to {provider} failed: {source}")]
    Request {
        provider: &'static str,
        #[source]
        source: reqwest::Error,
    },

    #[error("{provider} returned HTTP {status}: {body}")]
    Api {
        provider: &'static str,
        status: u16,
        body: String,
    },

    #[error("Failed to build HTTP client: {0}")]
    ClientBuild(#[source] reqwest::Error),

    #[error("{0} returned an empty completion")]
    EmptyCompletion(&'static str),

    #[error("All {attempts} attempts failed. Last error: {last}")]
    RetriesExhausted {
        attempts: u32,
        #[source]
        last: Box<LlmError>,
    },
}

impl LlmError {
    /// Whether a retry has a chance of succeeding.
    pub fn is_transient(&self) -> bool {
        match self {
            LlmError::Request { source, .. } => {
                source.is_timeout() || source.is_connect() || source.is_request()
            }
            LlmError::Api { status, .. } => *status == 429 || *status >= 500,
            LlmError::ClientBuild(_)
            | LlmError::EmptyCompletion(_)
            | LlmError::RetriesExhausted { .. } => false,
        }
    }
}

/// Errors surfaced by the review loop.
#[derive(Error, Debug)]
pub enum ReviewError {
    #[error(transparent)]
    Git(#[from] GitError),

    #[error(transparent)]
    Diff(#[from] DiffError),

    #[error("LLM generation failed: {0}")]
    Llm(#[from] LlmError),

    #[error("Prompt failed: {0}")]
    Prompt(#[from] dialoguer::Error),

    #[error("Editor failed: {0}")]
    Editor(#[from] std::io::Error),

    #[error("The model returned an empty result")]
    EmptyResult,
}

/// Errors from presenting the final result.
#[derive(Error, Debug)]
pub enum PresentError {
    #[error("No clipboard command found (tried pbcopy, clip, wl-copy, xclip, xsel)")]
    ClipboardUnavailable,

    #[error("Clipboard command {command} failed: {source}")]
    ClipboardFailed {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write output: {0}")]
    Output(#[from] std::io::Error),

    #[error(transparent)]
    Git(#[from] GitError),
}

//! Layered configuration.
//!
//! Layers, lowest to highest precedence: defaults, `.gitignore`, `.ignore`,
//! XDG `coco/config.json`, the `[coco]` git config section, the project's
//! `.coco.config.json`, `COCO_*` environment variables, command-line flags.

pub mod partial;
pub mod sources;

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::ConfigError;
use crate::llm::SUMMARIZE_PROMPT;
use crate::review::present::OutputMode;

pub use partial::{PartialConfig, PartialService};

pub const DEFAULT_TEMPERATURE: f32 = 0.4;
pub const DEFAULT_TOKEN_LIMIT: usize = 1024;
pub const DEFAULT_MAX_RETRIES: u32 = 3;
pub const DEFAULT_TIMEOUT_SECS: u64 = 60;
pub const DEFAULT_BRANCH: &str = "main";

pub const OPENAI_ENDPOINT: &str = "https://api.openai.com/v1";
pub const ANTHROPIC_ENDPOINT: &str = "https://api.anthropic.com";
pub const OLLAMA_ENDPOINT: &str = "http://localhost:11434";

/// Supported LLM providers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    #[value(name = "openai")]
    OpenAi,
    Ollama,
    Anthropic,
}

impl Provider {
    pub fn as_str(&self) -> &'static str {
        match self {
            Provider::OpenAi => "openai",
            Provider::Ollama => "ollama",
            Provider::Anthropic => "anthropic",
        }
    }

    pub fn default_model(&self) -> &'static str {
        match self {
            Provider::OpenAi => "gpt-4o-mini",
            Provider::Ollama => "llama3.1",
            Provider::Anthropic => "claude-3-5-sonnet-latest",
        }
    }

    /// Environment variable holding the API key, if the provider needs one.
    pub fn api_key_env(&self) -> Option<&'static str> {
        match self {
            Provider::OpenAi => Some("OPENAI_API_KEY"),
            Provider::Anthropic => Some("ANTHROPIC_API_KEY"),
            Provider::Ollama => None,
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Provider {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "openai" => Ok(Provider::OpenAi),
            "ollama" => Ok(Provider::Ollama),
            "anthropic" => Ok(Provider::Anthropic),
            _ => Err(ConfigError::InvalidValue {
                key: "provider".to_string(),
                value: s.to_string(),
            }),
        }
    }
}

/// The LLM service, tagged by `provider`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "provider", rename_all = "lowercase")]
pub enum LlmService {
    OpenAi {
        model: String,
        api_key: Option<String>,
        endpoint: Option<String>,
    },
    Ollama {
        model: String,
        endpoint: Option<String>,
    },
    Anthropic {
        model: String,
        api_key: Option<String>,
        endpoint: Option<String>,
    },
}

impl LlmService {
    pub fn provider(&self) -> &'static str {
        self.kind().as_str()
    }

    pub fn kind(&self) -> Provider {
        match self {
            LlmService::OpenAi { .. } => Provider::OpenAi,
            LlmService::Ollama { .. } => Provider::Ollama,
            LlmService::Anthropic { .. } => Provider::Anthropic,
        }
    }

    pub fn model(&self) -> &str {
        match self {
            LlmService::OpenAi { model, .. }
            | LlmService::Ollama { model, .. }
            | LlmService::Anthropic { model, .. } => model,
        }
    }

    /// Configured endpoint or the provider's public default.
    pub fn endpoint(&self) -> &str {
        match self {
            LlmService::OpenAi { endpoint, .. } => endpoint.as_deref().unwrap_or(OPENAI_ENDPOINT),
            LlmService::Ollama { endpoint, .. } => endpoint.as_deref().unwrap_or(OLLAMA_ENDPOINT),
            LlmService::Anthropic { endpoint, .. } => {
                endpoint.as_deref().unwrap_or(ANTHROPIC_ENDPOINT)
            }
        }
    }

    fn from_partial(partial: PartialService) -> Self {
        let provider = partial.provider.unwrap_or(Provider::OpenAi);
        let model = partial
            .model
            .unwrap_or_else(|| provider.default_model().to_string());
        match provider {
            Provider::OpenAi => LlmService::OpenAi {
                model,
                api_key: partial.api_key,
                endpoint: partial.endpoint,
            },
            Provider::Ollama => LlmService::Ollama {
                model,
                endpoint: partial.endpoint,
            },
            Provider::Anthropic => LlmService::Anthropic {
                model,
                api_key: partial.api_key,
                endpoint: partial.endpoint,
            },
        }
    }
}

/// Resolved configuration, immutable once loaded.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub service: LlmService,
    pub temperature: f32,
    pub token_limit: usize,
    pub max_retries: u32,
    pub timeout_secs: u64,
    pub mode: OutputMode,
    pub prompt: Option<String>,
    pub summarize_prompt: String,
    pub ignored_files: Vec<String>,
    pub ignored_extensions: Vec<String>,
    /// Existing `.gitignore` / `.ignore` files at the project root.
    pub ignore_files: Vec<PathBuf>,
    pub default_branch: String,
    pub verbose: bool,
}

impl Default for Config {
    fn default() -> Self {
        Config::from_partial(Config::defaults())
    }
}

impl Config {
    /// Built-in values for every setting.
    pub fn defaults() -> PartialConfig {
        PartialConfig {
            ignored_files: vec!["package-lock.json".to_string()],
            ignored_extensions: vec![".map".to_string(), ".lock".to_string()],
            ..Default::default()
        }
    }

    /// Fill unset fields of a fully merged layer with defaults.
    pub fn from_partial(partial: PartialConfig) -> Self {
        Config {
            service: LlmService::from_partial(partial.service),
            temperature: partial.temperature.unwrap_or(DEFAULT_TEMPERATURE),
            token_limit: partial.token_limit.unwrap_or(DEFAULT_TOKEN_LIMIT),
            max_retries: partial.max_retries.unwrap_or(DEFAULT_MAX_RETRIES),
            timeout_secs: partial.timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS),
            mode: partial.mode.unwrap_or_default(),
            prompt: partial.prompt,
            summarize_prompt: partial
                .summarize_prompt
                .unwrap_or_else(|| SUMMARIZE_PROMPT.template.to_string()),
            ignored_files: partial.ignored_files,
            ignored_extensions: partial.ignored_extensions,
            ignore_files: partial.ignore_files,
            default_branch: partial
                .default_branch
                .unwrap_or_else(|| DEFAULT_BRANCH.to_string()),
            verbose: partial.verbose.unwrap_or(false),
        }
    }

    /// The API key for the configured provider.
    ///
    /// An explicit key wins over the provider's environment variable.
    /// Ollama needs none.
    pub fn api_key(&self) -> Result<Option<String>, ConfigError> {
        let explicit = match &self.service {
            LlmService::Ollama { .. } => return Ok(None),
            LlmService::OpenAi { api_key, .. } | LlmService::Anthropic { api_key, .. } => {
                api_key.clone()
            }
        };
        let kind = self.service.kind();
        let Some(env_var) = kind.api_key_env() else {
            return Ok(None);
        };

        explicit
            .filter(|k| !k.trim().is_empty())
            .or_else(|| std::env::var(env_var).ok().filter(|k| !k.trim().is_empty()))
            .map(Some)
            .ok_or_else(|| ConfigError::MissingApiKey(kind.to_string(), env_var))
    }
}

/// Where each file-backed layer is read from.
#[derive(Debug, Clone)]
pub struct ConfigSources {
    pub root: PathBuf,
    pub xdg_file: Option<PathBuf>,
    /// Git config file to read `[coco]` from; `None` uses the global config.
    pub git_config: Option<PathBuf>,
}

impl ConfigSources {
    /// Standard locations for a repository rooted at `root`.
    pub fn discover(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            xdg_file: sources::xdg_config_path(),
            git_config: None,
        }
    }

    fn git_config_layer(&self) -> Result<PartialConfig, ConfigError> {
        match &self.git_config {
            Some(path) if path.exists() => {
                let config = git2::Config::open(path).map_err(ConfigError::GitConfig)?;
                sources::git_config_layer(&config)
            }
            Some(_) => Ok(PartialConfig::default()),
            None => sources::global_git_config_layer(),
        }
    }

    fn root_file(&self, name: &str) -> PathBuf {
        self.root.join(name)
    }
}

/// Load the configuration by merging every layer over the defaults.
pub fn load_config(sources: &ConfigSources, flags: PartialConfig) -> Result<Config, ConfigError> {
    let xdg = match &sources.xdg_file {
        Some(path) => sources::json_file_layer(path)?,
        None => PartialConfig::default(),
    };

    let layers = [
        ("gitignore", sources::ignore_file_layer(&sources.root_file(".gitignore"))),
        ("ignore", sources::ignore_file_layer(&sources.root_file(".ignore"))),
        ("xdg", xdg),
        ("git config", sources.git_config_layer()?),
        (
            "project",
            sources::json_file_layer(&sources.root_file(sources::PROJECT_CONFIG_FILE))?,
        ),
        ("environment", sources::env_layer()?),
        ("flags", flags),
    ];

    let merged = layers
        .into_iter()
        .fold(Config::defaults(), |acc, (name, layer)| {
            if layer != PartialConfig::default() {
                debug!("Applying {} config layer", name);
            }
            acc.merge(layer)
        });

    Ok(Config::from_partial(merged))
}

/// Repository root used for project-level layers.
pub fn project_root(start: &Path) -> PathBuf {
    git2::Repository::discover(start)
        .ok()
        .and_then(|repo| repo.workdir().map(Path::to_path_buf))
        .unwrap_or_else(|| start.to_path_buf())
}

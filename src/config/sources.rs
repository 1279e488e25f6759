//! Readers for each configuration layer.

use std::path::{Path, PathBuf};
use std::str::FromStr;

use tracing::debug;

use crate::error::ConfigError;

use super::partial::{PartialConfig, PartialService};

pub const PROJECT_CONFIG_FILE: &str = ".coco.config.json";
const GIT_CONFIG_SECTION: &str = "coco";
const ENV_PREFIX: &str = "COCO_";

/// Layer naming an ignore file (`.gitignore`, `.ignore`) when it exists.
///
/// The file is parsed later by the change filter, with full gitignore
/// semantics.
pub fn ignore_file_layer(path: &Path) -> PartialConfig {
    if !path.is_file() {
        return PartialConfig::default();
    }
    debug!("Found ignore file {}", path.display());
    PartialConfig {
        ignore_files: vec![path.to_path_buf()],
        ..Default::default()
    }
}

/// Layer built from a JSON config file. Missing is empty.
pub fn json_file_layer(path: &Path) -> Result<PartialConfig, ConfigError> {
    let Some(content) = read_optional(path)? else {
        return Ok(PartialConfig::default());
    };
    serde_json::from_str(&content).map_err(|source| ConfigError::ParseFailed {
        path: path.display().to_string(),
        source,
    })
}

/// `$XDG_CONFIG_HOME/coco/config.json`, falling back to the platform config dir.
pub fn xdg_config_path() -> Option<PathBuf> {
    let base = std::env::var_os("XDG_CONFIG_HOME")
        .filter(|v| !v.is_empty())
        .map(PathBuf::from)
        .or_else(dirs::config_dir)?;
    Some(base.join("coco").join("config.json"))
}

/// Layer read from the `[coco]` section of a git config.
pub fn git_config_layer(config: &git2::Config) -> Result<PartialConfig, ConfigError> {
    let get = |name: &str| -> Option<String> {
        config
            .get_string(&format!("{GIT_CONFIG_SECTION}.{name}"))
            .ok()
            .filter(|v| !v.is_empty())
    };

    let mut layer = PartialConfig {
        service: PartialService {
            provider: get("provider").map(|v| parse("coco.provider", &v)).transpose()?,
            model: get("model"),
            api_key: get("apiKey").or_else(|| get("openAIApiKey")),
            endpoint: get("endpoint"),
        },
        prompt: get("prompt"),
        summarize_prompt: get("summarizePrompt"),
        default_branch: get("defaultBranch"),
        ..Default::default()
    };

    layer.temperature = get("temperature")
        .map(|v| parse("coco.temperature", &v))
        .transpose()?;
    layer.token_limit = get("tokenLimit")
        .map(|v| parse("coco.tokenLimit", &v))
        .transpose()?;
    layer.mode = get("mode").map(|v| parse("coco.mode", &v)).transpose()?;
    layer.ignored_files = get("ignoredFiles").map(|v| split_list(&v)).unwrap_or_default();
    layer.ignored_extensions = get("ignoredExtensions")
        .map(|v| split_list(&v))
        .unwrap_or_default();
    if let Ok(verbose) = config.get_bool(&format!("{GIT_CONFIG_SECTION}.verbose")) {
        layer.verbose = Some(verbose);
    }

    Ok(layer)
}

/// Layer read from the user's global git config, empty if there is none.
pub fn global_git_config_layer() -> Result<PartialConfig, ConfigError> {
    match git2::Config::open_default() {
        Ok(config) => git_config_layer(&config),
        Err(e) => {
            debug!("No global git config available: {}", e);
            Ok(PartialConfig::default())
        }
    }
}

/// Layer read from `COCO_*` environment variables.
pub fn env_layer() -> Result<PartialConfig, ConfigError> {
    let get = |name: &str| -> Option<String> {
        std::env::var(format!("{ENV_PREFIX}{name}"))
            .ok()
            .filter(|v| !v.is_empty())
    };

    Ok(PartialConfig {
        service: PartialService {
            provider: get("PROVIDER")
                .map(|v| parse("COCO_PROVIDER", &v))
                .transpose()?,
            model: get("MODEL"),
            api_key: get("API_KEY"),
            endpoint: get("ENDPOINT"),
        },
        temperature: get("TEMPERATURE")
            .map(|v| parse("COCO_TEMPERATURE", &v))
            .transpose()?,
        token_limit: get("TOKEN_LIMIT")
            .map(|v| parse("COCO_TOKEN_LIMIT", &v))
            .transpose()?,
        max_retries: get("MAX_RETRIES")
            .map(|v| parse("COCO_MAX_RETRIES", &v))
            .transpose()?,
        timeout_secs: get("TIMEOUT_SECS")
            .map(|v| parse("COCO_TIMEOUT_SECS", &v))
            .transpose()?,
        mode: get("MODE").map(|v| parse("COCO_MODE", &v)).transpose()?,
        prompt: get("PROMPT"),
        summarize_prompt: get("SUMMARIZE_PROMPT"),
        ignored_files: get("IGNORED_FILES")
            .map(|v| split_list(&v))
            .unwrap_or_default(),
        ignored_extensions: get("IGNORED_EXTENSIONS")
            .map(|v| split_list(&v))
            .unwrap_or_default(),
        default_branch: get("DEFAULT_BRANCH"),
        verbose: get("VERBOSE")
            .map(|v| parse("COCO_VERBOSE", &v))
            .transpose()?,
        ..Default::default()
    })
}

fn read_optional(path: &Path) -> Result<Option<String>, ConfigError> {
    match std::fs::read_to_string(path) {
        Ok(content) => {
            debug!("Loaded config layer from {}", path.display());
            Ok(Some(content))
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(source) => Err(ConfigError::ReadFailed {
            path: path.display().to_string(),
            source,
        }),
    }
}

fn parse<T: FromStr>(key: &str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::InvalidValue {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

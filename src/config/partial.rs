//! A configuration layer with every field optional.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::review::present::OutputMode;

use super::Provider;

/// Provider settings as they appear in one layer.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PartialService {
    pub provider: Option<Provider>,
    pub model: Option<String>,
    pub api_key: Option<String>,
    pub endpoint: Option<String>,
}

/// One configuration layer. `None` means "not set here".
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PartialConfig {
    pub service: PartialService,
    pub temperature: Option<f32>,
    pub token_limit: Option<usize>,
    pub max_retries: Option<u32>,
    pub timeout_secs: Option<u64>,
    pub mode: Option<OutputMode>,
    pub prompt: Option<String>,
    pub summarize_prompt: Option<String>,
    pub ignored_files: Vec<String>,
    pub ignored_extensions: Vec<String>,
    /// Gitignore-style files found in the project, lowest precedence first.
    #[serde(skip)]
    pub ignore_files: Vec<PathBuf>,
    pub default_branch: Option<String>,
    pub verbose: Option<bool>,
}

fn pick<T>(lower: Option<T>, higher: Option<T>) -> Option<T> {
    higher.or(lower)
}

fn extend_unique<T: PartialEq>(into: &mut Vec<T>, from: Vec<T>) {
    for item in from {
        if !into.contains(&item) {
            into.push(item);
        }
    }
}

impl PartialConfig {
    /// Layer `higher` over `self`. Scalars from `higher` win when set;
    /// ignore lists are extended, keeping first-seen order.
    pub fn merge(self, higher: PartialConfig) -> PartialConfig {
        let mut ignored_files = self.ignored_files;
        extend_unique(&mut ignored_files, higher.ignored_files);
        let mut ignored_extensions = self.ignored_extensions;
        extend_unique(&mut ignored_extensions, higher.ignored_extensions);
        let mut ignore_files = self.ignore_files;
        extend_unique(&mut ignore_files, higher.ignore_files);

        // A provider switch invalidates provider-specific settings from below.
        let provider_changed = matches!(
            (self.service.provider, higher.service.provider),
            (Some(a), Some(b)) if a != b
        );
        let lower_service = if provider_changed {
            PartialService {
                provider: self.service.provider,
                ..Default::default()
            }
        } else {
            self.service
        };

        PartialConfig {
            service: PartialService {
                provider: pick(lower_service.provider, higher.service.provider),
                model: pick(lower_service.model, higher.service.model),
                api_key: pick(lower_service.api_key, higher.service.api_key),
                endpoint: pick(lower_service.endpoint, higher.service.endpoint),
            },
            temperature: pick(self.temperature, higher.temperature),
            token_limit: pick(self.token_limit, higher.token_limit),
            max_retries: pick(self.max_retries, higher.max_retries),
            timeout_secs: pick(self.timeout_secs, higher.timeout_secs),
            mode: pick(self.mode, higher.mode),
            prompt: pick(self.prompt, higher.prompt),
            summarize_prompt: pick(self.summarize_prompt, higher.summarize_prompt),
            ignored_files,
            ignored_extensions,
            ignore_files,
            default_branch: pick(self.default_branch, higher.default_branch),
            verbose: pick(self.verbose, higher.verbose),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_higher_scalar_wins() {
        let low = PartialConfig {
            temperature: Some(0.1),
            token_limit: Some(100),
            ..Default::default()
        };
        let high = PartialConfig {
            temperature: Some(0.9),
            ..Default::default()
        };
        let merged = low.merge(high);
        assert_eq!(merged.temperature, Some(0.9));
        assert_eq!(merged.token_limit, Some(100));
    }

    #[test]
    fn test_ignore_lists_extend_without_duplicates() {
        let low = PartialConfig {
            ignored_files: vec!["a".into(), "b".into()],
            ..Default::default()
        };
        let high = PartialConfig {
            ignored_files: vec!["b".into(), "c".into()],
            ignored_extensions: vec![".map".into()],
            ..Default::default()
        };
        let merged = low.merge(high);
        assert_eq!(merged.ignored_files, vec!["a", "b", "c"]);
        assert_eq!(merged.ignored_extensions, vec![".map"]);
    }

    #[test]
    fn test_provider_switch_drops_lower_model() {
        let low = PartialConfig {
            service: PartialService {
                provider: Some(Provider::OpenAi),
                model: Some("gpt-4o".into()),
                api_key: Some("sk".into()),
                endpoint: None,
            },
            ..Default::default()
        };
        let high = PartialConfig {
            service: PartialService {
                provider: Some(Provider::Ollama),
                ..Default::default()
            },
            ..Default::default()
        };
        let merged = low.merge(high);
        assert_eq!(merged.service.provider, Some(Provider::Ollama));
        assert_eq!(merged.service.model, None);
        assert_eq!(merged.service.api_key, None);
    }

    #[test]
    fn test_json_layer_uses_camel_case() {
        let json = r#"{
            "service": {"provider": "anthropic", "model": "claude-x", "apiKey": "k"},
            "tokenLimit": 2048,
            "ignoredExtensions": [".snap"],
            "mode": "interactive"
        }"#;
        let layer: PartialConfig = serde_json::from_str(json).unwrap();
        assert_eq!(layer.service.provider, Some(Provider::Anthropic));
        assert_eq!(layer.service.api_key.as_deref(), Some("k"));
        assert_eq!(layer.token_limit, Some(2048));
        assert_eq!(layer.ignored_extensions, vec![".snap"]);
        assert_eq!(layer.mode, Some(OutputMode::Interactive));
    }
}

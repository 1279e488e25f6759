//! Prompt templates with `{name}` placeholders.

use std::borrow::Cow;
use std::collections::BTreeSet;
use std::sync::LazyLock;

use regex_lite::Regex;
use tracing::warn;

static PLACEHOLDER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{([A-Za-z_][A-Za-z0-9_]*)\}").expect("Invalid regex"));

/// A prompt template and the variables it must contain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptTemplate {
    pub template: Cow<'static, str>,
    pub variables: &'static [&'static str],
}

pub const COMMIT_TEMPLATE: &str = r#"You are an expert software engineer writing a git commit message.

Below is a summary of the staged changes. Each file starts with its status line,
followed by its diff or a summary of the diff.

{summary}

Write a commit message following the Conventional Commits style:
- the title is a single imperative line of at most 72 characters, e.g. "fix(parser): handle empty input"
- the body explains what changed and why, wrapped at 72 characters; leave it empty for trivial changes
- do not invent changes that are not in the summary

Respond ONLY with a JSON object: {"title": "<title>", "body": "<body>"}"#;

pub const COMMIT_PROMPT: PromptTemplate = PromptTemplate {
    template: Cow::Borrowed(COMMIT_TEMPLATE),
    variables: &["summary"],
};

pub const CHANGELOG_TEMPLATE: &str = r#"You are writing a changelog for a software project.

These are the commit messages included in the release, newest first:

{summary}

Group the changes under markdown headings (### Added, ### Changed, ### Fixed, ### Removed),
omitting empty groups. Write one concise bullet per user-visible change, merge duplicates,
and skip commits that only touch tests, CI, or formatting. Output only the markdown."#;

pub const CHANGELOG_PROMPT: PromptTemplate = PromptTemplate {
    template: Cow::Borrowed(CHANGELOG_TEMPLATE),
    variables: &["summary"],
};

pub const SUMMARIZE_TEMPLATE: &str = r#"Summarize the following diff in a few sentences. Mention the functions, types,
and behaviour that changed. Do not include code.

{diff}"#;

pub const SUMMARIZE_PROMPT: PromptTemplate = PromptTemplate {
    template: Cow::Borrowed(SUMMARIZE_TEMPLATE),
    variables: &["diff"],
};

impl PromptTemplate {
    /// Placeholder names used by `template`, in sorted order.
    pub fn placeholders(template: &str) -> BTreeSet<&str> {
        PLACEHOLDER
            .captures_iter(template)
            .filter_map(|c| c.get(1).map(|m| m.as_str()))
            .collect()
    }

    /// Use `user` when it contains every variable of `fallback`, else `fallback`.
    pub fn resolve(user: Option<&str>, fallback: &PromptTemplate) -> PromptTemplate {
        let Some(user) = user.filter(|t| !t.trim().is_empty()) else {
            return fallback.clone();
        };

        let found = Self::placeholders(user);
        let missing: Vec<&str> = fallback
            .variables
            .iter()
            .copied()
            .filter(|v| !found.contains(v))
            .collect();

        if missing.is_empty() {
            PromptTemplate {
                template: Cow::Owned(user.to_string()),
                variables: fallback.variables,
            }
        } else {
            warn!(
                "Custom prompt is missing {}; using the built-in prompt",
                missing
                    .iter()
                    .map(|v| format!("{{{v}}}"))
                    .collect::<Vec<_>>()
                    .join(", ")
            );
            fallback.clone()
        }
    }

    /// Substitute `{name}` placeholders. Unknown placeholders are left as-is.
    pub fn render(&self, values: &[(&str, &str)]) -> String {
        PLACEHOLDER
            .replace_all(&self.template, |caps: &regex_lite::Captures<'_>| {
                let name = &caps[1];
                values
                    .iter()
                    .find(|(k, _)| *k == name)
                    .map(|(_, v)| (*v).to_string())
                    .unwrap_or_else(|| caps[0].to_string())
            })
            .into_owned()
    }
}

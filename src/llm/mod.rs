//! LLM completion: provider client, retry, prompt templates and JSON extraction.

pub mod client;
pub mod json;
pub mod prompt;
pub mod retry;

pub use client::{Agent, LlmClient};
pub use json::{extract_json, parse_json};
pub use prompt::{CHANGELOG_PROMPT, COMMIT_PROMPT, PromptTemplate, SUMMARIZE_PROMPT};

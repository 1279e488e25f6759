//! Pulling a JSON object out of model output.
//!
//! Models wrap JSON in markdown fences or chatty preambles. The extractor
//! looks for a fenced block first, then the first `{` that starts a valid
//! object.

use serde::de::DeserializeOwned;

/// Extract the most likely JSON object from `response`.
///
/// Returns the trimmed input when nothing object-like is found.
pub fn extract_json(response: &str) -> String {
    let trimmed = response.trim();

    if let Some(inner) = fenced_block(trimmed)
        && inner.starts_with('{')
    {
        return inner.to_string();
    }

    trimmed
        .match_indices('{')
        .find_map(|(idx, _)| balanced_object(&trimmed[idx..]))
        .unwrap_or(trimmed)
        .to_string()
}

/// Extract and deserialize a JSON object, `None` if it does not parse as `T`.
pub fn parse_json<T: DeserializeOwned>(response: &str) -> Option<T> {
    serde_json::from_str(&extract_json(response)).ok()
}

/// Contents of the first ``` fence, with an optional language tag removed.
fn fenced_block(text: &str) -> Option<&str> {
    let start = text.find("```")? + 3;
    let rest = &text[start..];
    let end = rest.find("```")?;
    let block = &rest[..end];
    let block = match block.find('\n') {
        Some(nl) if !block[..nl].trim_start().starts_with('{') => &block[nl + 1..],
        _ => block,
    };
    Some(block.trim())
}

/// The shortest prefix of `text` that is a balanced, valid JSON object.
fn balanced_object(text: &str) -> Option<&str> {
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (idx, ch) in text.char_indices() {
        if in_string {
            match ch {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }

        match ch {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth = depth.checked_sub(1)?;
                if depth == 0 {
                    let candidate = &text[..=idx];
                    return serde_json::from_str::<serde_json::Value>(candidate)
                        .is_ok()
                        .then_some(candidate);
                }
            }
            _ => {}
        }
    }

    None
}

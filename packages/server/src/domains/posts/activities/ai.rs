//! Prompt construction and reply parsing for post summaries and tags.
//!
//! Provider replies are inconsistent (code fences, JSON inside a JSON string,
//! prose around a list). Parsing is bounded: strip fences, unwrap
//! a JSON string at most once, then fall back to plain-text splitting.

use serde_json::Value;

use crate::common::utils::truncate_summary;
use crate::domains::posts::models::Post;
use crate::kernel::jobs::TaskError;
use crate::kernel::{ChatMessage, ServerDeps};

/// Longest summary kept from a reply.
pub const MAX_SUMMARY_CHARS: usize = 300;

/// Most tags kept from a reply.
pub const MAX_TAGS: usize = 8;

/// Post body sent to the provider is cut to this many characters.
const MAX_PROMPT_BODY_CHARS: usize = 6000;

const SUMMARY_SYSTEM_PROMPT: &str = "You write SEO meta descriptions for blog posts. \
Reply with a single plain-text description of at most 160 characters. \
No quotes, no markdown, no preamble.";

const TAGS_SYSTEM_PROMPT: &str = "You tag blog posts. \
Reply with a JSON array of 3 to 5 short, lower-case topic tags, e.g. [\"rust\", \"databases\"]. \
Return ONLY the JSON array.";

fn post_prompt(post: &Post) -> String {
    let body = if post.has_markdown() {
        &post.content_markdown
    } else {
        &post.content_html
    };
    let body: String = body.chars().take(MAX_PROMPT_BODY_CHARS).collect();
    format!("Title: {}\n\n{}", post.title, body)
}

async fn call_provider(messages: Vec<ChatMessage>, deps: &ServerDeps) -> Result<String, TaskError> {
    let timeout = deps.config.ai_timeout;
    match tokio::time::timeout(timeout, deps.ai.generate(&messages)).await {
        Ok(Ok(reply)) => Ok(reply),
        Ok(Err(e)) => Err(TaskError::Provider(e.to_string())),
        Err(_) => Err(TaskError::Provider(format!(
            "text generation timed out after {}s",
            timeout.as_secs()
        ))),
    }
}

/// Ask the provider for an SEO summary of `post`.
pub async fn request_summary(post: &Post, deps: &ServerDeps) -> Result<String, TaskError> {
    let reply = call_provider(
        vec![
            ChatMessage::system(SUMMARY_SYSTEM_PROMPT),
            ChatMessage::user(post_prompt(post)),
        ],
        deps,
    )
    .await?;

    parse_summary(&reply)
        .ok_or_else(|| TaskError::Provider("provider returned an empty description".to_string()))
}

/// Ask the provider for a tag set for `post`.
pub async fn request_tags(post: &Post, deps: &ServerDeps) -> Result<Vec<String>, TaskError> {
    let reply = call_provider(
        vec![
            ChatMessage::system(TAGS_SYSTEM_PROMPT),
            ChatMessage::user(post_prompt(post)),
        ],
        deps,
    )
    .await?;

    let tags = parse_tags(&reply);
    if tags.is_empty() {
        return Err(TaskError::Provider(
            "provider returned no usable tags".to_string(),
        ));
    }
    Ok(tags)
}

// =============================================================================
// Reply parsing
// =============================================================================

fn strip_code_fences(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    // Drop the info string (```json) up to the first newline.
    let rest = match rest.find('\n') {
        Some(idx) => &rest[idx + 1..],
        None => rest,
    };
    rest.trim_end().trim_end_matches("```").trim()
}

/// Extract a summary from a provider reply.
pub fn parse_summary(reply: &str) -> Option<String> {
    let cleaned = strip_code_fences(reply);

    let text = match serde_json::from_str::<Value>(cleaned) {
        Ok(Value::String(inner)) => inner,
        Ok(Value::Object(map)) => ["description", "summary"]
            .iter()
            .find_map(|key| map.get(*key).and_then(Value::as_str))
            .map(str::to_string)?,
        _ => cleaned.to_string(),
    };

    let collapsed = text
        .trim()
        .trim_matches(|c| c == '"' || c == '\'')
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ");

    if collapsed.is_empty() {
        None
    } else {
        Some(truncate_summary(&collapsed, MAX_SUMMARY_CHARS))
    }
}

fn tags_from_json(value: &Value) -> Option<Vec<String>> {
    match value {
        Value::Array(items) => Some(
            items
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect(),
        ),
        Value::Object(map) => match map.get("tags") {
            Some(Value::Array(_)) => map.get("tags").and_then(tags_from_json),
            _ => None,
        },
        _ => None,
    }
}

/// Find a JSON array embedded in surrounding prose.
fn embedded_array(text: &str) -> Option<Vec<String>> {
    let start = text.find('[')?;
    let end = text.rfind(']')?;
    if end <= start {
        return None;
    }
    serde_json::from_str::<Value>(&text[start..=end])
        .ok()
        .as_ref()
        .and_then(tags_from_json)
}

fn split_tags(text: &str) -> Vec<String> {
    text.split([',', '\n'])
        .map(|t| t.trim().trim_start_matches(['-', '*']).trim())
        .map(str::to_string)
        .collect()
}

fn tags_from_text(text: &str) -> Vec<String> {
    let cleaned = strip_code_fences(text);
    match serde_json::from_str::<Value>(cleaned) {
        Ok(value) => tags_from_json(&value).unwrap_or_default(),
        Err(_) => embedded_array(cleaned).unwrap_or_else(|| split_tags(cleaned)),
    }
}

/// Extract tags from a provider reply.
pub fn parse_tags(reply: &str) -> Vec<String> {
    let cleaned = strip_code_fences(reply);

    let raw = match serde_json::from_str::<Value>(cleaned) {
        // JSON text wrapped in a JSON string: unwrap exactly once.
        Ok(Value::String(inner)) => tags_from_text(&inner),
        Ok(value) => tags_from_json(&value).unwrap_or_default(),
        Err(_) => embedded_array(cleaned).unwrap_or_else(|| split_tags(cleaned)),
    };

    let mut seen = std::collections::HashSet::new();
    raw.into_iter()
        .map(|t| {
            t.trim()
                .trim_start_matches('#')
                .trim_matches(|c| c == '"' || c == '\'')
                .trim()
                .to_string()
        })
        .filter(|t| !t.is_empty())
        .filter(|t| seen.insert(t.to_lowercase()))
        .take(MAX_TAGS)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_summary_plain() {
        assert_eq!(
            parse_summary("  \"A short   description.\"  "),
            Some("A short description.".to_string())
        );
    }

    #[test]
    fn test_parse_summary_json_object() {
        assert_eq!(
            parse_summary("```json\n{\"description\": \"From JSON\"}\n```"),
            Some("From JSON".to_string())
        );
    }

    #[test]
    fn test_parse_summary_empty() {
        assert_eq!(parse_summary("   "), None);
        assert_eq!(parse_summary("\"\""), None);
    }

    #[test]
    fn test_parse_summary_truncates() {
        let long = "word ".repeat(200);
        let summary = parse_summary(&long).unwrap();
        assert!(summary.chars().count() <= MAX_SUMMARY_CHARS);
        assert!(summary.ends_with("..."));
    }

    #[test]
    fn test_parse_tags_json_array() {
        assert_eq!(parse_tags(r#"["rust", "async"]"#), vec!["rust", "async"]);
    }

    #[test]
    fn test_parse_tags_fenced() {
        assert_eq!(
            parse_tags("```json\n[\"rust\", \"Rust\", \"#web\"]\n```"),
            vec!["rust", "web"]
        );
    }

    #[test]
    fn test_parse_tags_json_in_json_string() {
        assert_eq!(
            parse_tags(r#""[\"rust\", \"cli\"]""#),
            vec!["rust", "cli"]
        );
    }

    #[test]
    fn test_parse_tags_object() {
        assert_eq!(parse_tags(r#"{"tags": ["a", "b"]}"#), vec!["a", "b"]);
    }

    #[test]
    fn test_parse_tags_embedded_in_prose() {
        assert_eq!(
            parse_tags("Sure! Here you go: [\"travel\", \"food\"] Enjoy."),
            vec!["travel", "food"]
        );
    }

    #[test]
    fn test_parse_tags_comma_separated() {
        assert_eq!(parse_tags("travel, food,\n- photos"), vec!["travel", "food", "photos"]);
    }

    #[test]
    fn test_parse_tags_caps_count() {
        let reply = (0..20).map(|i| format!("tag{}", i)).collect::<Vec<_>>().join(",");
        assert_eq!(parse_tags(&reply).len(), MAX_TAGS);
    }
}

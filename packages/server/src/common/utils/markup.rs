/// Pure utility functions for converting between HTML and the markdown source
/// stored alongside each post.
///
/// These functions contain NO side effects - they take inputs and return outputs
/// without touching stores or the network.
use anyhow::{Context, Result};

/// Convert an HTML fragment to markdown.
pub fn html_to_markdown(html: &str) -> Result<String> {
    htmd::convert(html).context("HTML to markdown conversion failed")
}

/// Convert HTML to markdown, keeping the HTML unchanged if conversion fails.
pub fn html_to_markdown_or_raw(html: &str) -> String {
    match html_to_markdown(html) {
        Ok(markdown) => markdown,
        Err(e) => {
            tracing::warn!(error = %e, "falling back to raw HTML");
            html.to_string()
        }
    }
}

/// Render markdown to HTML.
pub fn markdown_to_html(markdown: &str) -> String {
    let parser = pulldown_cmark::Parser::new(markdown);
    let mut html = String::with_capacity(markdown.len() * 3 / 2);
    pulldown_cmark::html::push_html(&mut html, parser);
    html
}

/// Truncate text to at most `max_chars` characters, appending "..." when cut.
///
/// Counts characters rather than bytes so multi-byte text is never split.
pub fn truncate_summary(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let keep = max_chars.saturating_sub(3);
    let truncated: String = text.chars().take(keep).collect();
    format!("{}...", truncated.trim_end())
}

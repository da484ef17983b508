//! Image reference extraction from post content
//!
//! Post bodies mix raw HTML and markdown, so three overlapping patterns are run
//! over each field:
//! - bare absolute URLs ending in an image extension
//! - HTML `src="..."` attributes
//! - markdown image links `![alt](url "title")`
//!
//! Every raw match is resolved against the origin and kept only when it points at
//! an image on the origin host. Different raw spellings of the same image (a
//! relative and an absolute form, say) are grouped under one resolved URL.

use std::collections::{BTreeMap, BTreeSet};

use lazy_static::lazy_static;
use regex::Regex;
use url::Url;

/// Path extensions treated as images.
pub const IMAGE_EXTENSIONS: &[&str] = &[
    "jpg", "jpeg", "png", "gif", "webp", "svg", "bmp", "avif",
];

lazy_static! {
    // Absolute http(s) URL ending in an image extension, optional query string
    static ref BARE_IMAGE_URL: Regex = Regex::new(
        r#"(?i)https?://[^\s"'<>()\[\]]+\.(?:jpe?g|png|gif|webp|svg|bmp|avif)(?:\?[^\s"'<>()\[\]]*)?"#
    ).unwrap();

    // src attribute of any HTML tag
    static ref SRC_ATTRIBUTE: Regex = Regex::new(
        r#"(?i)\bsrc\s*=\s*["']([^"']+)["']"#
    ).unwrap();

    // Markdown image: ![alt](url) or ![alt](<url> "title")
    static ref MARKDOWN_IMAGE: Regex = Regex::new(
        r#"!\[[^\]]*\]\(\s*<?([^)\s>]+)>?(?:\s+["'][^"']*["'])?\s*\)"#
    ).unwrap();
}

/// Characters that trail a URL in prose or markup but are never part of it.
const TRAILING_PUNCTUATION: &[char] = &['.', ',', ';', ':', '!', '?', ')', ']', '}', '\'', '"'];

/// Raw image references found in content, in order of appearance.
pub fn find_raw_references(text: &str) -> Vec<String> {
    let bare = BARE_IMAGE_URL.find_iter(text).map(|m| m.as_str());
    let src = SRC_ATTRIBUTE
        .captures_iter(text)
        .filter_map(|c| c.get(1))
        .map(|m| m.as_str());
    let markdown = MARKDOWN_IMAGE
        .captures_iter(text)
        .filter_map(|c| c.get(1))
        .map(|m| m.as_str());

    bare.chain(src)
        .chain(markdown)
        .map(|raw| raw.trim().trim_end_matches(TRAILING_PUNCTUATION))
        .filter(|raw| !raw.is_empty())
        .map(str::to_string)
        .collect()
}

fn has_image_extension(url: &Url) -> bool {
    let path = url.path().to_ascii_lowercase();
    path.rsplit_once('.')
        .map(|(_, ext)| IMAGE_EXTENSIONS.contains(&ext))
        .unwrap_or(false)
}

/// Resolve `raw` against `origin`, keeping it only if it is an image on the origin host.
pub fn resolve_reference(raw: &str, origin: &Url) -> Option<Url> {
    let mut url = origin.join(raw).ok()?;
    if !matches!(url.scheme(), "http" | "https") {
        return None;
    }
    if url.host_str() != origin.host_str() || !has_image_extension(&url) {
        return None;
    }
    url.set_fragment(None);
    Some(url)
}

/// Image references grouped by resolved URL.
///
/// Each entry maps the canonical (resolved) URL to every raw spelling seen for it.
#[derive(Debug, Default, Clone)]
pub struct ImageReferences {
    by_url: BTreeMap<String, BTreeSet<String>>,
}

impl ImageReferences {
    pub fn new() -> Self {
        Self::default()
    }

    /// Scan one content field and record every origin-hosted image in it.
    pub fn scan(&mut self, text: &str, origin: &Url) {
        for raw in find_raw_references(text) {
            if let Some(resolved) = resolve_reference(&raw, origin) {
                self.by_url
                    .entry(resolved.to_string())
                    .or_default()
                    .insert(raw);
            }
        }
    }

    /// Number of distinct resolved URLs.
    pub fn len(&self) -> usize {
        self.by_url.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_url.is_empty()
    }

    /// Resolved URLs with their raw aliases, in sorted order.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &BTreeSet<String>)> {
        self.by_url.iter()
    }
}

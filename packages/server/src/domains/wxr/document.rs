//! In-memory form of a WXR (WordPress eXtended RSS) document.
//!
//! Fields hold the raw interchange strings; interpretation (status mapping, date
//! parsing, slug derivation) happens in the import and export activities.

use chrono::{DateTime, NaiveDateTime, Utc};

/// Interchange timestamp format for `wp:post_date` and `wp:comment_date`.
pub const WXR_DATE_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

pub const WXR_VERSION: &str = "1.2";

/// Category domains carried over as post tags.
pub const TAG_DOMAINS: &[&str] = &["category", "post_tag", "tag"];

#[derive(Debug, Clone, Default, PartialEq)]
pub struct WxrDocument {
    pub channel: WxrChannel,
    pub items: Vec<WxrItem>,
}

impl WxrDocument {
    /// Origin the content was exported from: `wp:base_site_url`, else the channel link.
    pub fn origin_url(&self) -> Option<&str> {
        [&self.channel.base_site_url, &self.channel.link]
            .into_iter()
            .map(|s| s.trim())
            .find(|s| !s.is_empty())
    }

    pub fn comment_count(&self) -> usize {
        self.items.iter().map(|i| i.comments.len()).sum()
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct WxrChannel {
    pub title: String,
    pub link: String,
    pub description: String,
    pub language: String,
    pub wxr_version: String,
    pub base_site_url: String,
    pub base_blog_url: String,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct WxrItem {
    pub title: String,
    pub link: String,
    pub pub_date: String,
    pub guid: String,
    pub description: String,
    /// `content:encoded` - the post body as HTML
    pub content: String,
    /// `excerpt:encoded`
    pub excerpt: String,
    pub post_id: String,
    pub post_date: String,
    pub post_date_gmt: String,
    /// `wp:post_name` - the item's explicit slug
    pub post_name: String,
    pub status: String,
    pub post_type: String,
    pub categories: Vec<WxrCategory>,
    pub comments: Vec<WxrComment>,
}

impl WxrItem {
    pub fn is_attachment(&self) -> bool {
        self.post_type.trim().eq_ignore_ascii_case("attachment")
    }

    /// Names of categories whose domain maps to tags, exact duplicates removed.
    pub fn tag_names(&self) -> Vec<String> {
        let mut names: Vec<String> = Vec::new();
        for category in &self.categories {
            let name = category.name.trim();
            if name.is_empty() || !category.is_tag() {
                continue;
            }
            if !names.iter().any(|n| n == name) {
                names.push(name.to_string());
            }
        }
        names
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct WxrCategory {
    pub domain: String,
    pub nicename: String,
    pub name: String,
}

impl WxrCategory {
    pub fn is_tag(&self) -> bool {
        let domain = self.domain.trim();
        TAG_DOMAINS.iter().any(|d| d.eq_ignore_ascii_case(domain))
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct WxrComment {
    pub id: String,
    pub author: String,
    pub author_email: String,
    pub author_url: String,
    pub date: String,
    pub date_gmt: String,
    /// Comment body as HTML
    pub content: String,
    pub approved: String,
    pub parent: String,
}

impl WxrComment {
    /// True when the comment has no parent reference (empty or `0`).
    pub fn is_top_level(&self) -> bool {
        let parent = self.parent.trim();
        parent.is_empty() || parent == "0"
    }
}

/// Parse an interchange timestamp (`YYYY-MM-DD HH:MM:SS`), treating it as UTC.
pub fn parse_wxr_date(value: &str) -> Option<DateTime<Utc>> {
    let value = value.trim();
    if value.is_empty() || value.starts_with("0000-00-00") {
        return None;
    }
    NaiveDateTime::parse_from_str(value, WXR_DATE_FORMAT)
        .ok()
        .map(|naive| naive.and_utc())
}

pub fn format_wxr_date(value: DateTime<Utc>) -> String {
    value.format(WXR_DATE_FORMAT).to_string()
}

/// First parseable timestamp among `candidates`.
pub fn first_wxr_date(candidates: &[&str]) -> Option<DateTime<Utc>> {
    candidates.iter().find_map(|c| parse_wxr_date(c))
}

use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use typed_builder::TypedBuilder;

use crate::common::PostId;

/// Blog post owned by the content store.
///
/// `slug` is globally unique and doubles as the interchange import dedup key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TypedBuilder)]
#[builder(field_defaults(setter(into)))]
pub struct Post {
    #[builder(default = PostId::new())]
    pub id: PostId,
    pub slug: String,
    pub title: String,

    // Content
    #[builder(default)]
    pub content_html: String,
    #[builder(default)]
    pub content_markdown: String,
    /// SEO summary; blank means "needs a description backfill".
    #[builder(default)]
    pub summary: String,

    #[builder(default)]
    pub status: PostStatus,
    #[builder(default, setter(strip_option))]
    pub published_at: Option<DateTime<Utc>>,

    /// Tag names as attached to the post (original casing).
    #[builder(default)]
    pub tags: Vec<String>,

    #[builder(default = Utc::now())]
    pub created_at: DateTime<Utc>,
    #[builder(default = Utc::now())]
    pub updated_at: DateTime<Utc>,
}

impl Post {
    pub fn has_summary(&self) -> bool {
        !self.summary.trim().is_empty()
    }

    pub fn has_tags(&self) -> bool {
        self.tags.iter().any(|t| !t.trim().is_empty())
    }

    pub fn has_markdown(&self) -> bool {
        !self.content_markdown.trim().is_empty()
    }

    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PostStatus {
    Published,
    #[default]
    Draft,
}

impl std::fmt::Display for PostStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PostStatus::Published => write!(f, "published"),
            PostStatus::Draft => write!(f, "draft"),
        }
    }
}

impl std::str::FromStr for PostStatus {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "published" => Ok(PostStatus::Published),
            "draft" => Ok(PostStatus::Draft),
            _ => Err(anyhow::anyhow!("Invalid post status: {}", s)),
        }
    }
}

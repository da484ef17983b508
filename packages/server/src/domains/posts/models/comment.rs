use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use typed_builder::TypedBuilder;

use crate::common::utils::normalize_comment_content;
use crate::common::{CommentId, PostId};

/// Reader comment attached to a post. At most one level of nesting is used:
/// replies point at a top-level comment through `parent_id`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TypedBuilder)]
#[builder(field_defaults(setter(into)))]
pub struct Comment {
    #[builder(default = CommentId::new())]
    pub id: CommentId,
    pub post_id: PostId,
    #[builder(default, setter(strip_option))]
    pub parent_id: Option<CommentId>,

    pub author_name: String,
    #[builder(default)]
    pub author_email: String,
    #[builder(default)]
    pub author_url: String,

    /// Markdown source of the comment body.
    pub content: String,
    #[builder(default)]
    pub status: CommentStatus,

    #[builder(default = Utc::now())]
    pub created_at: DateTime<Utc>,
}

impl Comment {
    /// Composite identity used to recognise an already-imported comment.
    pub fn dedup_key(&self) -> CommentKey {
        CommentKey::new(&self.author_name, &self.content, self.created_at)
    }
}

/// (lower-cased author, trimmed content, UTC timestamp)
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CommentKey {
    author: String,
    content: String,
    timestamp: i64,
}

impl CommentKey {
    pub fn new(author: &str, content: &str, created_at: DateTime<Utc>) -> Self {
        Self {
            author: author.trim().to_lowercase(),
            content: normalize_comment_content(content),
            timestamp: created_at.timestamp(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CommentStatus {
    Approved,
    Rejected,
    #[default]
    Pending,
}

impl CommentStatus {
    /// Normalize an interchange approval string.
    ///
    /// Anything unrecognised is treated as pending.
    pub fn from_interchange(value: &str) -> Self {
        match value.trim().to_lowercase().as_str() {
            "1" | "approved" => CommentStatus::Approved,
            "spam" | "trash" | "rejected" => CommentStatus::Rejected,
            _ => CommentStatus::Pending,
        }
    }

    /// Approval flag written on export.
    pub fn as_interchange(&self) -> &'static str {
        match self {
            CommentStatus::Approved => "1",
            CommentStatus::Rejected | CommentStatus::Pending => "0",
        }
    }
}

impl std::fmt::Display for CommentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CommentStatus::Approved => write!(f, "approved"),
            CommentStatus::Rejected => write!(f, "rejected"),
            CommentStatus::Pending => write!(f, "pending"),
        }
    }
}

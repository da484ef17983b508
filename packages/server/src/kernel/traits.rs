// Trait definitions for dependency injection
//
// These are INFRASTRUCTURE traits only - no business logic.
// Business logic (backfill, import, rehosting) lives in domain activities that use these traits.
//
// Naming convention: Base* for trait names (e.g., BaseAI, BaseImageStore)

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::common::{PostId, TaskId};
use crate::domains::posts::models::{Comment, Post};
use crate::domains::tag::Tag;
use crate::kernel::jobs::{Task, TaskStatus};

// =============================================================================
// AI Trait (Infrastructure - text generation provider)
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    System,
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            content: content.into(),
        }
    }
}

#[async_trait]
pub trait BaseAI: Send + Sync {
    /// Send a conversation to the provider and return the reply text.
    async fn generate(&self, messages: &[ChatMessage]) -> Result<String>;
}

// =============================================================================
// Content Store Trait (Infrastructure - posts, comments, tags)
// =============================================================================

/// Narrow view of the content store consumed by the job engine and importer.
///
/// Implementations are responsible for their own consistency under concurrent
/// access; callers hold no locks across calls.
#[async_trait]
pub trait BaseContentStore: Send + Sync {
    async fn list_posts(&self) -> Result<Vec<Post>>;

    async fn get_post(&self, id: PostId) -> Result<Option<Post>>;

    async fn create_post(&self, post: &Post) -> Result<()>;

    async fn update_post(&self, post: &Post) -> Result<()>;

    async fn delete_post(&self, id: PostId) -> Result<()>;

    /// Comments of a post, oldest first.
    async fn list_comments(&self, post_id: PostId) -> Result<Vec<Comment>>;

    async fn create_comment(&self, comment: &Comment) -> Result<()>;

    /// Create any missing tags (names are already normalized) and return all of them.
    async fn ensure_tags(&self, names: &[String]) -> Result<Vec<Tag>>;
}

// =============================================================================
// Task Repository Trait (Infrastructure - task persistence)
// =============================================================================

#[async_trait]
pub trait BaseTaskRepository: Send + Sync {
    async fn create_task(&self, task: &Task) -> Result<()>;

    async fn get_task(&self, id: TaskId) -> Result<Option<Task>>;

    /// Tasks in `status`, oldest first, at most `limit`.
    async fn list_tasks_by_status(&self, status: TaskStatus, limit: usize) -> Result<Vec<Task>>;

    /// Most recently created tasks, newest first.
    async fn list_recent_tasks(&self, limit: usize) -> Result<Vec<Task>>;

    async fn update_task(&self, task: &Task) -> Result<()>;

    /// Move every `running` task back to `pending`. Returns how many were reset.
    async fn reset_running_tasks(&self) -> Result<u64>;
}

// =============================================================================
// Image Store Trait (Infrastructure - blob storage)
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredImage {
    pub content_type: String,
    pub bytes: Vec<u8>,
}

#[async_trait]
pub trait BaseImageStore: Send + Sync {
    /// Store an image under `id` and return the URL it is served from.
    ///
    /// Saving the same id twice overwrites the blob rather than duplicating it.
    async fn save(
        &self,
        id: &str,
        filename: &str,
        content_type: &str,
        bytes: Vec<u8>,
    ) -> Result<String>;

    async fn get(&self, id: &str) -> Result<Option<StoredImage>>;

    async fn delete(&self, id: &str) -> Result<()>;

    /// URL an image stored under `id` is served from.
    fn url_for(&self, id: &str) -> String;
}

// =============================================================================
// Image Fetcher Trait (Infrastructure - remote downloads)
// =============================================================================

#[derive(Debug, Clone)]
pub struct FetchedImage {
    pub bytes: Vec<u8>,
    /// Raw `Content-Type` header, if the server sent one.
    pub content_type: Option<String>,
}

#[async_trait]
pub trait BaseImageFetcher: Send + Sync {
    /// Download one image. Implementations enforce their own size cap and timeout.
    async fn fetch(&self, url: &str) -> Result<FetchedImage>;
}

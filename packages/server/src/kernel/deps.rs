//! Server dependencies for task handlers and import/export (using traits for testability)
//!
//! One `ServerDeps` is built per server and shared by reference with the task
//! runner and the HTTP layer. All external services sit behind `Base*` traits.

use anyhow::Result;
use async_trait::async_trait;
use std::sync::Arc;

use crate::config::Config;
use crate::kernel::jobs::TaskQueue;
use crate::kernel::{BaseAI, BaseContentStore, BaseImageFetcher, BaseImageStore, ChatMessage};

// =============================================================================
// DisabledAI (used when no text-generation provider is configured)
// =============================================================================

/// Text-generation stand-in that refuses every request.
pub struct DisabledAI;

#[async_trait]
impl BaseAI for DisabledAI {
    async fn generate(&self, _messages: &[ChatMessage]) -> Result<String> {
        anyhow::bail!("text generation is not configured")
    }
}

// =============================================================================
// ServerDeps
// =============================================================================

#[derive(Clone)]
pub struct ServerDeps {
    pub content: Arc<dyn BaseContentStore>,
    pub ai: Arc<dyn BaseAI>,
    /// Rehosting target; image import is skipped when absent.
    pub image_store: Option<Arc<dyn BaseImageStore>>,
    pub image_fetcher: Arc<dyn BaseImageFetcher>,
    /// Producer handle for follow-on tasks.
    pub tasks: TaskQueue,
    pub config: Config,
}

impl ServerDeps {
    pub fn new(
        content: Arc<dyn BaseContentStore>,
        ai: Arc<dyn BaseAI>,
        image_store: Option<Arc<dyn BaseImageStore>>,
        image_fetcher: Arc<dyn BaseImageFetcher>,
        tasks: TaskQueue,
        config: Config,
    ) -> Self {
        Self {
            content,
            ai,
            image_store,
            image_fetcher,
            tasks,
            config,
        }
    }
}

// TestDependencies - mock implementations for testing
//
// Provides mock services that can be injected into ServerDeps for tests.

use anyhow::Result;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use super::jobs::{task_channel, WakeReceiver};
use super::memory_store::MemoryStore;
use super::{
    BaseAI, BaseImageFetcher, BaseImageStore, ChatMessage, ChatRole, FetchedImage, ServerDeps,
    StoredImage,
};
use crate::config::Config;

// =============================================================================
// Mock AI (Generic text generation)
// =============================================================================

pub struct MockAI {
    responses: Arc<Mutex<Vec<String>>>,
    calls: Arc<Mutex<Vec<String>>>,
    failure: Arc<Mutex<Option<String>>>,
}

impl MockAI {
    pub fn new() -> Self {
        Self {
            responses: Arc::new(Mutex::new(Vec::new())),
            calls: Arc::new(Mutex::new(Vec::new())),
            failure: Arc::new(Mutex::new(None)),
        }
    }

    /// Add a text response to the queue
    pub fn with_response(self, response: impl Into<String>) -> Self {
        self.responses.lock().unwrap().push(response.into());
        self
    }

    /// Add a JSON response to the queue (will be serialized)
    pub fn with_json_response<T: serde::Serialize>(self, data: &T) -> Self {
        let json = serde_json::to_string(data).expect("Failed to serialize mock response");
        self.responses.lock().unwrap().push(json);
        self
    }

    /// Make every call fail with `message`
    pub fn failing(self, message: impl Into<String>) -> Self {
        *self.failure.lock().unwrap() = Some(message.into());
        self
    }

    /// Get the user prompts that were sent to the AI
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    /// Get the last prompt sent to the AI
    pub fn last_prompt(&self) -> Option<String> {
        self.calls.lock().unwrap().last().cloned()
    }

    /// Check if a prompt containing the given text was sent
    pub fn was_called_with(&self, text: &str) -> bool {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .any(|p| p.contains(text))
    }

    /// Get the number of times the AI was called
    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

impl Default for MockAI {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl BaseAI for MockAI {
    async fn generate(&self, messages: &[ChatMessage]) -> Result<String> {
        // Record the user turn
        let prompt = messages
            .iter()
            .filter(|m| m.role == ChatRole::User)
            .map(|m| m.content.as_str())
            .collect::<Vec<_>>()
            .join("\n");
        self.calls.lock().unwrap().push(prompt);

        if let Some(message) = self.failure.lock().unwrap().clone() {
            anyhow::bail!(message);
        }

        let mut responses = self.responses.lock().unwrap();
        if !responses.is_empty() {
            Ok(responses.remove(0))
        } else {
            // Return default mock response
            Ok("Mock AI response".to_string())
        }
    }
}

// =============================================================================
// Mock Image Store
// =============================================================================

/// Arguments captured from a save call
#[derive(Debug, Clone)]
pub struct SaveCallArgs {
    pub id: String,
    pub filename: String,
    pub content_type: String,
    pub size: usize,
}

pub struct MockImageStore {
    base_url: String,
    images: Arc<Mutex<HashMap<String, StoredImage>>>,
    saves: Arc<Mutex<Vec<SaveCallArgs>>>,
}

impl MockImageStore {
    pub fn new() -> Self {
        Self {
            base_url: "/images".to_string(),
            images: Arc::new(Mutex::new(HashMap::new())),
            saves: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Serve stored images under a different URL prefix
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// URL an image with `id` is served from
    pub fn url_for(&self, id: &str) -> String {
        format!("{}/{}", self.base_url.trim_end_matches('/'), id)
    }

    /// Get all save calls
    pub fn saves(&self) -> Vec<SaveCallArgs> {
        self.saves.lock().unwrap().clone()
    }

    /// Number of images currently stored
    pub fn image_count(&self) -> usize {
        self.images.lock().unwrap().len()
    }
}

impl Default for MockImageStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl BaseImageStore for MockImageStore {
    async fn save(
        &self,
        id: &str,
        filename: &str,
        content_type: &str,
        bytes: Vec<u8>,
    ) -> Result<String> {
        self.saves.lock().unwrap().push(SaveCallArgs {
            id: id.to_string(),
            filename: filename.to_string(),
            content_type: content_type.to_string(),
            size: bytes.len(),
        });
        self.images.lock().unwrap().insert(
            id.to_string(),
            StoredImage {
                content_type: content_type.to_string(),
                bytes,
            },
        );
        Ok(self.url_for(id))
    }

    async fn get(&self, id: &str) -> Result<Option<StoredImage>> {
        Ok(self.images.lock().unwrap().get(id).cloned())
    }

    async fn delete(&self, id: &str) -> Result<()> {
        self.images.lock().unwrap().remove(id);
        Ok(())
    }

    fn url_for(&self, id: &str) -> String {
        MockImageStore::url_for(self, id)
    }
}

// =============================================================================
// Mock Image Fetcher
// =============================================================================

#[derive(Clone)]
enum MockFetch {
    Image(FetchedImage),
    Failure(String),
}

pub struct MockImageFetcher {
    responses: Arc<Mutex<HashMap<String, MockFetch>>>,
    calls: Arc<Mutex<Vec<String>>>,
}

impl MockImageFetcher {
    pub fn new() -> Self {
        Self {
            responses: Arc::new(Mutex::new(HashMap::new())),
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Serve `bytes` for `url`
    pub fn with_image(self, url: &str, bytes: &[u8], content_type: Option<&str>) -> Self {
        self.responses.lock().unwrap().insert(
            url.to_string(),
            MockFetch::Image(FetchedImage {
                bytes: bytes.to_vec(),
                content_type: content_type.map(str::to_string),
            }),
        );
        self
    }

    /// Fail every download of `url` with `message`
    pub fn with_failure(self, url: &str, message: impl Into<String>) -> Self {
        self.responses
            .lock()
            .unwrap()
            .insert(url.to_string(), MockFetch::Failure(message.into()));
        self
    }

    /// Get all URLs that were fetched
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    /// Check if a URL was fetched
    pub fn was_fetched(&self, url: &str) -> bool {
        self.calls.lock().unwrap().iter().any(|u| u == url)
    }
}

impl Default for MockImageFetcher {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl BaseImageFetcher for MockImageFetcher {
    async fn fetch(&self, url: &str) -> Result<FetchedImage> {
        // Record the call
        self.calls.lock().unwrap().push(url.to_string());

        match self.responses.lock().unwrap().get(url).cloned() {
            Some(MockFetch::Image(image)) => Ok(image),
            Some(MockFetch::Failure(message)) => anyhow::bail!(message),
            // Unknown URLs download as a tiny untyped blob
            None => Ok(FetchedImage {
                bytes: b"mock-image".to_vec(),
                content_type: None,
            }),
        }
    }
}

// =============================================================================
// TestDependencies - Builder for test dependencies
// =============================================================================

#[derive(Clone)]
pub struct TestDependencies {
    pub store: Arc<MemoryStore>,
    pub ai: Arc<MockAI>,
    pub image_store: Option<Arc<MockImageStore>>,
    pub image_fetcher: Arc<MockImageFetcher>,
    pub config: Config,
}

impl TestDependencies {
    pub fn new() -> Self {
        Self {
            store: Arc::new(MemoryStore::new()),
            ai: Arc::new(MockAI::new()),
            image_store: Some(Arc::new(MockImageStore::new())),
            image_fetcher: Arc::new(MockImageFetcher::new()),
            config: Config::default(),
        }
    }

    /// Set a mock AI
    pub fn mock_ai(mut self, ai: MockAI) -> Self {
        self.ai = Arc::new(ai);
        self
    }

    /// Set a mock image store
    pub fn mock_image_store(mut self, store: MockImageStore) -> Self {
        self.image_store = Some(Arc::new(store));
        self
    }

    /// Run without an image store
    pub fn without_image_store(mut self) -> Self {
        self.image_store = None;
        self
    }

    /// Set a mock image fetcher
    pub fn mock_fetcher(mut self, fetcher: MockImageFetcher) -> Self {
        self.image_fetcher = Arc::new(fetcher);
        self
    }

    /// Share an existing store (e.g. to simulate a restart)
    pub fn with_store(mut self, store: Arc<MemoryStore>) -> Self {
        self.store = store;
        self
    }

    pub fn with_config(mut self, config: Config) -> Self {
        self.config = config;
        self
    }

    /// Convert into ServerDeps plus the wake receiver for a TaskRunner
    pub fn into_deps(self) -> (Arc<ServerDeps>, WakeReceiver) {
        let (tasks, wake) = task_channel(self.store.clone());
        let image_store = self
            .image_store
            .map(|s| s as Arc<dyn BaseImageStore>);
        let deps = ServerDeps::new(
            self.store,
            self.ai,
            image_store,
            self.image_fetcher,
            tasks,
            self.config,
        );
        (Arc::new(deps), wake)
    }
}

impl Default for TestDependencies {
    fn default() -> Self {
        Self::new()
    }
}

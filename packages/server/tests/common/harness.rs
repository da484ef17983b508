//! Test harness wiring in-memory collaborators into a task runner.
//!
//! Every harness gets its own `MemoryStore`, so tests never share state.

use std::sync::Arc;

use anyhow::Result;
use press_core::kernel::jobs::{Task, TaskRunner, TaskStatus};
use press_core::kernel::{
    MemoryStore, MockAI, MockImageFetcher, MockImageStore, ServerDeps, TestDependencies,
};
use test_context::AsyncTestContext;

/// Route `tracing` output through the test writer.
/// Run tests with: RUST_LOG=debug cargo test -- --nocapture
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Test harness holding the dependencies and the runner for one test.
///
/// # Example using test-context
///
/// ```ignore
/// use test_context::test_context;
///
/// #[test_context(TestHarness)]
/// #[tokio::test]
/// async fn my_test(ctx: &TestHarness) {
///     ctx.deps.tasks.enqueue_backfill().await.unwrap();
///     ctx.drain().await;
/// }
/// ```
pub struct TestHarness {
    pub deps: Arc<ServerDeps>,
    pub store: Arc<MemoryStore>,
    pub ai: Arc<MockAI>,
    pub image_store: Option<Arc<MockImageStore>>,
    pub fetcher: Arc<MockImageFetcher>,
    pub runner: TaskRunner,
}

impl AsyncTestContext for TestHarness {
    async fn setup() -> Self {
        Self::new()
    }

    async fn teardown(self) {
        // In-memory collaborators are dropped with the harness
    }
}

impl TestHarness {
    pub fn new() -> Self {
        Self::with_dependencies(TestDependencies::new())
    }

    pub fn with_dependencies(test_deps: TestDependencies) -> Self {
        init_tracing();

        let store = test_deps.store.clone();
        let ai = test_deps.ai.clone();
        let image_store = test_deps.image_store.clone();
        let fetcher = test_deps.image_fetcher.clone();

        let (deps, wake) = test_deps.into_deps();
        let runner = TaskRunner::new(wake, deps.clone());

        Self {
            deps,
            store,
            ai,
            image_store,
            fetcher,
            runner,
        }
    }

    /// Execute every pending task, returning how many ran.
    pub async fn drain(&self) -> usize {
        self.runner.drain().await.expect("Failed to drain task queue")
    }

    /// All tasks, oldest first.
    pub async fn tasks(&self) -> Vec<Task> {
        let mut tasks = self
            .deps
            .tasks
            .list_recent(usize::MAX)
            .await
            .expect("Failed to list tasks");
        tasks.reverse();
        tasks
    }

    pub async fn tasks_with_status(&self, status: TaskStatus) -> Vec<Task> {
        self.tasks()
            .await
            .into_iter()
            .filter(|t| t.status == status)
            .collect()
    }

    pub fn image_store(&self) -> &MockImageStore {
        self.image_store
            .as_deref()
            .expect("harness was built without an image store")
    }
}

/// Poll `check` until it returns true or the timeout passes.
pub async fn wait_until<F, Fut>(mut check: F) -> Result<()>
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = bool>,
{
    let deadline = tokio::time::Instant::now() + tokio::time::Duration::from_secs(5);
    while tokio::time::Instant::now() < deadline {
        if check().await {
            return Ok(());
        }
        tokio::time::sleep(tokio::time::Duration::from_millis(10)).await;
    }
    anyhow::bail!("condition not met within 5s")
}

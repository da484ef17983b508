//! Task runner service for processing queued tasks.
//!
//! The `TaskRunner` is the single active worker:
//! - On start, resets tasks left `running` by a crashed process back to `pending`
//! - Sleeps until woken by a [`TaskQueue`] signal
//! - Drains pending tasks oldest-first, one at a time
//! - Persists running/completed/failed status around each handler call
//!
//! # Architecture
//!
//! ```text
//! TaskQueue.queue()  ──► repo.create_task() ──► try_send(wake)   (never blocks)
//!
//! TaskRunner
//!     │
//!     ├─► wake.recv()                      (coalesced, capacity one)
//!     ├─► repo.list_tasks_by_status(Pending)
//!     ├─► mark running + persist
//!     ├─► handlers::dispatch(task)         (decode TaskCommand once)
//!     └─► mark completed/failed + persist  (no retries)
//! ```
//!
//! # Example
//!
//! ```ignore
//! let (queue, wake) = task_channel(repo.clone());
//! let deps = Arc::new(ServerDeps::new(content, ai, image_store, fetcher, queue, config));
//! let handle = TaskRunner::new(wake, deps).start().await?;
//! ```

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::Result;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use super::handlers;
use super::queue::TaskQueue;
use super::task::{Task, TaskStatus};
use crate::kernel::{BaseTaskRepository, ServerDeps};

/// Receiving half of the worker wake-up signal.
pub struct WakeReceiver(mpsc::Receiver<()>);

/// Create a producer handle and the matching wake receiver for one runner.
pub fn task_channel(repo: Arc<dyn BaseTaskRepository>) -> (TaskQueue, WakeReceiver) {
    let (tx, rx) = mpsc::channel(1);
    (TaskQueue::new(repo, tx), WakeReceiver(rx))
}

/// Configuration for the task runner.
#[derive(Debug, Clone)]
pub struct TaskRunnerConfig {
    /// Maximum number of pending tasks fetched per batch
    pub batch_size: usize,
}

impl Default for TaskRunnerConfig {
    fn default() -> Self {
        Self { batch_size: 10 }
    }
}

pub struct TaskRunner {
    repo: Arc<dyn BaseTaskRepository>,
    deps: Arc<ServerDeps>,
    wake: WakeReceiver,
    config: TaskRunnerConfig,
    shutdown: Arc<AtomicBool>,
}

impl TaskRunner {
    pub fn new(wake: WakeReceiver, deps: Arc<ServerDeps>) -> Self {
        let config = TaskRunnerConfig {
            batch_size: deps.config.task_batch_size,
        };
        Self::with_config(wake, deps, config)
    }

    pub fn with_config(wake: WakeReceiver, deps: Arc<ServerDeps>, config: TaskRunnerConfig) -> Self {
        Self {
            repo: Arc::clone(deps.tasks.repository()),
            deps,
            wake,
            config,
            shutdown: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Handle for stopping the loop from elsewhere.
    ///
    /// Shutdown is checked between tasks; a task that has started always runs to
    /// completion.
    pub fn shutdown_handle(&self) -> Arc<AtomicBool> {
        self.shutdown.clone()
    }

    pub fn request_shutdown(&self) {
        self.shutdown.store(true, Ordering::SeqCst);
        self.deps.tasks.notify();
    }

    fn is_shutdown_requested(&self) -> bool {
        self.shutdown.load(Ordering::SeqCst)
    }

    /// Startup sweep: anything still `running` was interrupted by a crash.
    pub async fn recover(&self) -> Result<u64> {
        let reset = self.repo.reset_running_tasks().await?;
        if reset > 0 {
            warn!(count = reset, "reset interrupted tasks to pending");
        }
        Ok(reset)
    }

    /// Run the startup sweep, then spawn the processing loop.
    ///
    /// When this returns no task is in `running` state, and one wake-up has been
    /// signalled so work left over from a previous process gets picked up.
    pub async fn start(self) -> Result<JoinHandle<()>> {
        self.recover().await?;
        self.deps.tasks.notify();
        Ok(tokio::spawn(self.run()))
    }

    /// Wait for wake-ups and drain the queue until shutdown.
    pub async fn run(mut self) {
        info!(batch_size = self.config.batch_size, "task runner starting");

        loop {
            if self.is_shutdown_requested() {
                break;
            }

            if self.wake.0.recv().await.is_none() {
                debug!("all task queue handles dropped");
                break;
            }

            if self.is_shutdown_requested() {
                break;
            }

            if let Err(e) = self.drain().await {
                error!(error = %e, "failed to drain pending tasks");
            }
        }

        info!("task runner stopped");
    }

    /// Execute pending tasks, oldest first, until none remain.
    ///
    /// Returns the number of tasks executed.
    pub async fn drain(&self) -> Result<usize> {
        let mut executed = 0;

        loop {
            if self.is_shutdown_requested() {
                break;
            }

            let batch = self
                .repo
                .list_tasks_by_status(TaskStatus::Pending, self.config.batch_size)
                .await?;

            if batch.is_empty() {
                break;
            }

            debug!(count = batch.len(), "fetched pending tasks");

            for mut task in batch {
                if self.is_shutdown_requested() {
                    break;
                }
                self.execute(&mut task).await?;
                executed += 1;
            }
        }

        Ok(executed)
    }

    /// Execute one task and persist its outcome.
    ///
    /// Only repository failures are returned; handler failures end up in the
    /// task record.
    pub async fn execute(&self, task: &mut Task) -> Result<()> {
        task.mark_running();
        self.repo.update_task(task).await?;

        debug!(task_id = %task.id, task_type = %task.task_type, "executing task");

        match handlers::dispatch(task, &self.deps).await {
            Ok(result) => {
                // Pick up checkpoints the handler persisted while running.
                if let Some(latest) = self.repo.get_task(task.id).await? {
                    task.result = latest.result;
                }
                task.mark_completed(result);
                info!(task_id = %task.id, task_type = %task.task_type, "task completed");
            }
            Err(e) => {
                warn!(task_id = %task.id, task_type = %task.task_type, error = %e, "task failed");
                if let Some(latest) = self.repo.get_task(task.id).await? {
                    task.result = latest.result;
                }
                task.mark_failed(e.to_string());
            }
        }

        self.repo.update_task(task).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_defaults() {
        let config = TaskRunnerConfig::default();
        assert_eq!(config.batch_size, 10);
    }
}

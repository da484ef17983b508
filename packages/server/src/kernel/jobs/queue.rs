//! Producer side of the task engine.
//!
//! [`TaskQueue`] persists new tasks and pokes the worker through a single-slot
//! channel. Queueing never waits on the worker: if a wake-up is already pending the
//! extra signal is dropped, since the worker drains everything pending once woken.

use std::sync::Arc;

use anyhow::Result;
use tokio::sync::mpsc;
use tracing::{debug, info};

use super::task::{
    BackfillPayload, ImportImagesPayload, PostTaskPayload, Task, TaskCommand, TaskStatus,
};
use crate::common::{PostId, TaskId};
use crate::kernel::BaseTaskRepository;

/// Cheap, cloneable handle for enqueueing and listing tasks.
#[derive(Clone)]
pub struct TaskQueue {
    repo: Arc<dyn BaseTaskRepository>,
    wake: mpsc::Sender<()>,
}

impl TaskQueue {
    pub(crate) fn new(repo: Arc<dyn BaseTaskRepository>, wake: mpsc::Sender<()>) -> Self {
        Self { repo, wake }
    }

    pub fn repository(&self) -> &Arc<dyn BaseTaskRepository> {
        &self.repo
    }

    /// Persist a typed command as a pending task and wake the worker.
    pub async fn queue(&self, command: TaskCommand) -> Result<Task> {
        let payload = command.payload()?;
        self.queue_raw(command.kind().as_str(), payload).await
    }

    /// Persist a task with an arbitrary type string.
    ///
    /// The type is not validated here; an unknown type fails when the worker
    /// picks the task up.
    pub async fn queue_raw(&self, task_type: &str, payload: serde_json::Value) -> Result<Task> {
        let task = Task::new(task_type, payload);
        self.repo.create_task(&task).await?;
        info!(task_id = %task.id, task_type = %task.task_type, "task queued");
        self.notify();
        Ok(task)
    }

    /// Non-blocking wake-up. Coalesces with any signal already waiting.
    pub fn notify(&self) {
        match self.wake.try_send(()) {
            Ok(()) => {}
            Err(mpsc::error::TrySendError::Full(())) => {
                debug!("worker wake already pending");
            }
            Err(mpsc::error::TrySendError::Closed(())) => {
                debug!("worker not running, task stays pending");
            }
        }
    }

    pub async fn enqueue_description(&self, post_id: PostId) -> Result<Task> {
        self.queue(TaskCommand::GenerateDescription(PostTaskPayload { post_id }))
            .await
    }

    pub async fn enqueue_tags(&self, post_id: PostId) -> Result<Task> {
        self.queue(TaskCommand::GenerateTags(PostTaskPayload { post_id }))
            .await
    }

    pub async fn enqueue_backfill(&self) -> Result<Task> {
        self.queue(TaskCommand::PostProcessing(BackfillPayload::default()))
            .await
    }

    pub async fn enqueue_image_import(
        &self,
        origin_url: impl Into<String>,
        post_ids: Vec<PostId>,
    ) -> Result<Task> {
        self.queue(TaskCommand::ImportImages(ImportImagesPayload {
            origin_url: origin_url.into(),
            post_ids,
        }))
        .await
    }

    pub async fn list_pending(&self, limit: usize) -> Result<Vec<Task>> {
        self.repo
            .list_tasks_by_status(TaskStatus::Pending, limit)
            .await
    }

    pub async fn list_recent(&self, limit: usize) -> Result<Vec<Task>> {
        self.repo.list_recent_tasks(limit).await
    }

    pub async fn get(&self, id: TaskId) -> Result<Option<Task>> {
        self.repo.get_task(id).await
    }
}

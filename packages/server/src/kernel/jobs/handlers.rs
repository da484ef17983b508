//! Dispatch from a persisted task to its typed handler.
//!
//! The task's type string and JSON payload are decoded into a [`TaskCommand`]
//! exactly once here; handlers receive strongly typed payloads and return typed
//! results, which are serialized back into the task record.

use std::sync::Arc;

use anyhow::Context;
use async_trait::async_trait;
use serde::Serialize;

use super::task::{ImportImagesResult, Task, TaskCommand, TaskError};
use crate::common::TaskId;
use crate::domains::media::activities::{import_images, CheckpointSink};
use crate::domains::posts::activities::{backfill_posts, generate_description, generate_tags};
use crate::kernel::{BaseTaskRepository, ServerDeps};

/// Run the handler for `task`, returning the value to store as its result.
pub async fn dispatch(
    task: &Task,
    deps: &ServerDeps,
) -> Result<Option<serde_json::Value>, TaskError> {
    let command = TaskCommand::decode(&task.task_type, &task.payload)?;

    match command {
        TaskCommand::GenerateDescription(payload) => {
            to_result(generate_description(payload.post_id, deps).await?)
        }
        TaskCommand::GenerateTags(payload) => {
            to_result(generate_tags(payload.post_id, deps).await?)
        }
        TaskCommand::PostProcessing(_) => to_result(backfill_posts(deps).await?),
        TaskCommand::ImportImages(payload) => {
            let checkpoint: ImportImagesResult = task.result_as().unwrap_or_default();
            let sink = TaskCheckpointSink {
                repo: Arc::clone(deps.tasks.repository()),
                task_id: task.id,
            };
            to_result(import_images(&payload, checkpoint, &sink, deps).await?)
        }
    }
}

fn to_result<T: Serialize>(value: T) -> Result<Option<serde_json::Value>, TaskError> {
    serde_json::to_value(value)
        .map(Some)
        .context("failed to serialize task result")
        .map_err(TaskError::from)
}

/// Persists intermediate results into the running task's record.
struct TaskCheckpointSink {
    repo: Arc<dyn BaseTaskRepository>,
    task_id: TaskId,
}

#[async_trait]
impl CheckpointSink for TaskCheckpointSink {
    async fn save(&self, checkpoint: &ImportImagesResult) -> anyhow::Result<()> {
        let mut task = self
            .repo
            .get_task(self.task_id)
            .await?
            .with_context(|| format!("task {} vanished while running", self.task_id))?;
        task.result = Some(serde_json::to_value(checkpoint)?);
        task.updated_at = chrono::Utc::now();
        self.repo.update_task(&task).await
    }
}

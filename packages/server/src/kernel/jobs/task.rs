//! Task model for deferred work.
//!
//! A [`Task`] is what the repository persists: a type discriminator string plus an
//! opaque JSON payload/result. The runner decodes it exactly once into a
//! [`TaskCommand`] at dispatch time, so handlers only ever see typed payloads.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::common::{PostId, TaskId};

// ============================================================================
// Enums
// ============================================================================

/// Lifecycle: pending -> running -> completed | failed.
///
/// The only backwards move is the startup sweep, which turns interrupted
/// `running` tasks back into `pending`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    #[default]
    Pending,
    Running,
    Completed,
    Failed,
}

impl TaskStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, TaskStatus::Completed | TaskStatus::Failed)
    }
}

impl std::fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TaskStatus::Pending => write!(f, "pending"),
            TaskStatus::Running => write!(f, "running"),
            TaskStatus::Completed => write!(f, "completed"),
            TaskStatus::Failed => write!(f, "failed"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskKind {
    GenerateDescription,
    GenerateTags,
    PostProcessing,
    ImportImages,
}

impl TaskKind {
    pub const ALL: [TaskKind; 4] = [
        TaskKind::GenerateDescription,
        TaskKind::GenerateTags,
        TaskKind::PostProcessing,
        TaskKind::ImportImages,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TaskKind::GenerateDescription => "generate_description",
            TaskKind::GenerateTags => "generate_tags",
            TaskKind::PostProcessing => "post_processing",
            TaskKind::ImportImages => "import_images",
        }
    }
}

impl std::fmt::Display for TaskKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for TaskKind {
    type Err = TaskError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        TaskKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| TaskError::UnknownType(s.to_string()))
    }
}

// ============================================================================
// Errors
// ============================================================================

/// Why a task ended up `failed`. None of these are retried automatically.
#[derive(Debug, Error)]
pub enum TaskError {
    #[error("unknown task type: {0}")]
    UnknownType(String),

    #[error("invalid payload: {0}")]
    Payload(String),

    #[error("provider error: {0}")]
    Provider(String),

    #[error("storage error: {0}")]
    Storage(#[from] anyhow::Error),
}

// ============================================================================
// Task record
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: TaskId,
    pub task_type: String,
    pub status: TaskStatus,
    pub payload: serde_json::Value,
    /// Final output, or the latest checkpoint while the task is still running.
    pub result: Option<serde_json::Value>,
    /// Set only when `status` is `failed`.
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Task {
    pub fn new(task_type: impl Into<String>, payload: serde_json::Value) -> Self {
        let now = Utc::now();
        Self {
            id: TaskId::new(),
            task_type: task_type.into(),
            status: TaskStatus::Pending,
            payload,
            result: None,
            error: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn mark_running(&mut self) {
        self.status = TaskStatus::Running;
        self.error = None;
        self.updated_at = Utc::now();
    }

    pub fn mark_completed(&mut self, result: Option<serde_json::Value>) {
        self.status = TaskStatus::Completed;
        if result.is_some() {
            self.result = result;
        }
        self.error = None;
        self.updated_at = Utc::now();
    }

    pub fn mark_failed(&mut self, error: impl Into<String>) {
        self.status = TaskStatus::Failed;
        self.error = Some(error.into());
        self.updated_at = Utc::now();
    }

    /// Decode the stored result as a typed value, if present and well-formed.
    pub fn result_as<T: DeserializeOwned>(&self) -> Option<T> {
        self.result
            .as_ref()
            .and_then(|value| serde_json::from_value(value.clone()).ok())
    }
}

// ============================================================================
// Typed payloads
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PostTaskPayload {
    pub post_id: PostId,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BackfillPayload {}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImportImagesPayload {
    pub origin_url: String,
    pub post_ids: Vec<PostId>,
}

/// Closed set of work the runner knows how to execute.
#[derive(Debug, Clone, PartialEq)]
pub enum TaskCommand {
    GenerateDescription(PostTaskPayload),
    GenerateTags(PostTaskPayload),
    PostProcessing(BackfillPayload),
    ImportImages(ImportImagesPayload),
}

impl TaskCommand {
    pub fn kind(&self) -> TaskKind {
        match self {
            TaskCommand::GenerateDescription(_) => TaskKind::GenerateDescription,
            TaskCommand::GenerateTags(_) => TaskKind::GenerateTags,
            TaskCommand::PostProcessing(_) => TaskKind::PostProcessing,
            TaskCommand::ImportImages(_) => TaskKind::ImportImages,
        }
    }

    /// Serialize the payload half of the command.
    pub fn payload(&self) -> Result<serde_json::Value, TaskError> {
        let value = match self {
            TaskCommand::GenerateDescription(p) | TaskCommand::GenerateTags(p) => {
                serde_json::to_value(p)
            }
            TaskCommand::PostProcessing(p) => serde_json::to_value(p),
            TaskCommand::ImportImages(p) => serde_json::to_value(p),
        };
        value.map_err(|e| TaskError::Payload(e.to_string()))
    }

    /// Decode a persisted task into a typed command.
    pub fn decode(task_type: &str, payload: &serde_json::Value) -> Result<Self, TaskError> {
        let kind: TaskKind = task_type.parse()?;
        Ok(match kind {
            TaskKind::GenerateDescription => {
                TaskCommand::GenerateDescription(decode_payload(kind, payload)?)
            }
            TaskKind::GenerateTags => TaskCommand::GenerateTags(decode_payload(kind, payload)?),
            TaskKind::PostProcessing => {
                let payload = if payload.is_null() {
                    BackfillPayload::default()
                } else {
                    decode_payload(kind, payload)?
                };
                TaskCommand::PostProcessing(payload)
            }
            TaskKind::ImportImages => TaskCommand::ImportImages(decode_payload(kind, payload)?),
        })
    }
}

fn decode_payload<T: DeserializeOwned>(
    kind: TaskKind,
    payload: &serde_json::Value,
) -> Result<T, TaskError> {
    serde_json::from_value(payload.clone())
        .map_err(|e| TaskError::Payload(format!("{}: {}", kind, e)))
}

// ============================================================================
// Typed results
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DescriptionResult {
    pub post_id: PostId,
    pub summary: Option<String>,
    /// True when the post no longer existed at execution time.
    #[serde(default)]
    pub skipped: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TagsResult {
    pub post_id: PostId,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub skipped: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BackfillResult {
    pub posts_scanned: usize,
    pub descriptions_generated: usize,
    pub tags_generated: usize,
    #[serde(default)]
    pub errors: Vec<String>,
}

/// Result and resumability checkpoint of an image import.
///
/// `url_map` holds every resolved URL *and* raw alias already rehosted; on
/// restart anything present here is not downloaded again.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ImportImagesResult {
    #[serde(default)]
    pub url_map: BTreeMap<String, String>,
    #[serde(default)]
    pub processed: usize,
    #[serde(default)]
    pub total: usize,
    #[serde(default)]
    pub errors: Vec<String>,
    #[serde(default)]
    pub replaced_posts: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_roundtrip() {
        for kind in TaskKind::ALL {
            assert_eq!(kind.as_str().parse::<TaskKind>().unwrap(), kind);
        }
    }

    #[test]
    fn test_unknown_kind_names_type() {
        let err = "resize_video".parse::<TaskKind>().unwrap_err();
        assert_eq!(err.to_string(), "unknown task type: resize_video");
    }

    #[test]
    fn test_decode_typed_payload() {
        let post_id = PostId::new();
        let cmd = TaskCommand::decode(
            "generate_tags",
            &serde_json::json!({ "post_id": post_id }),
        )
        .unwrap();
        assert_eq!(cmd, TaskCommand::GenerateTags(PostTaskPayload { post_id }));
    }

    #[test]
    fn test_decode_malformed_payload() {
        let err = TaskCommand::decode("import_images", &serde_json::json!({ "origin": 1 }))
            .unwrap_err();
        assert!(matches!(err, TaskError::Payload(_)));
    }

    #[test]
    fn test_decode_backfill_without_payload() {
        let cmd = TaskCommand::decode("post_processing", &serde_json::Value::Null).unwrap();
        assert_eq!(cmd, TaskCommand::PostProcessing(BackfillPayload::default()));
    }

    #[test]
    fn test_status_transitions() {
        let mut task = Task::new("post_processing", serde_json::json!({}));
        assert_eq!(task.status, TaskStatus::Pending);

        task.mark_running();
        assert_eq!(task.status, TaskStatus::Running);
        assert!(!task.status.is_terminal());

        task.mark_failed("boom");
        assert_eq!(task.status, TaskStatus::Failed);
        assert_eq!(task.error.as_deref(), Some("boom"));
        assert!(task.status.is_terminal());
    }

    #[test]
    fn test_completion_keeps_checkpoint_when_no_result() {
        let mut task = Task::new("import_images", serde_json::json!({}));
        task.result = Some(serde_json::json!({ "processed": 2 }));
        task.mark_completed(None);
        assert_eq!(task.result, Some(serde_json::json!({ "processed": 2 })));
    }
}

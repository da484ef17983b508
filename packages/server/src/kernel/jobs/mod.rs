//! Task engine for deferred content work.
//!
//! - [`TaskQueue`] - producer handle: persist a pending task, signal the worker
//! - [`TaskRunner`] - the single active worker: recover, wait, drain, persist outcome
//! - [`Task`] / [`TaskCommand`] - persisted record and its typed, decoded form
//!
//! # Architecture
//!
//! ```text
//! HTTP layer / WXR importer
//!     │
//!     └─► TaskQueue.enqueue_*()  ──► BaseTaskRepository.create_task()
//!                                └─► wake (capacity one, coalescing)
//!
//! TaskRunner
//!     ├─► reset running → pending (startup only)
//!     ├─► list pending (oldest first)
//!     ├─► dispatch: generate_description | generate_tags
//!     │             | post_processing | import_images
//!     └─► completed / failed (terminal, never retried)
//! ```
//!
//! Execution is at-least-once: a crash mid-task re-queues it, so every handler is
//! written to be safe to run again.

pub mod handlers;
mod queue;
mod runner;
mod task;

pub use queue::TaskQueue;
pub use runner::{task_channel, TaskRunner, TaskRunnerConfig, WakeReceiver};
pub use task::{
    BackfillPayload, BackfillResult, DescriptionResult, ImportImagesPayload, ImportImagesResult,
    PostTaskPayload, TagsResult, Task, TaskCommand, TaskError, TaskKind, TaskStatus,
};

//! In-process content store and task repository.
//!
//! Backs the `wxr_tool` binary and the integration tests. Everything lives behind
//! one async `RwLock` per collection; no call holds a lock across an await point
//! of another collaborator.

use std::collections::{BTreeMap, HashMap};

use anyhow::{bail, Result};
use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;

use super::jobs::{Task, TaskStatus};
use super::traits::{BaseContentStore, BaseTaskRepository};
use crate::common::{PostId, TaskId};
use crate::domains::posts::models::{Comment, Post};
use crate::domains::tag::Tag;

#[derive(Default)]
pub struct MemoryStore {
    posts: RwLock<HashMap<PostId, Post>>,
    comments: RwLock<Vec<Comment>>,
    tags: RwLock<BTreeMap<String, Tag>>,
    /// Insertion order is creation order.
    tasks: RwLock<Vec<Task>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// All tags, sorted by name.
    pub async fn list_tags(&self) -> Vec<Tag> {
        self.tags.read().await.values().cloned().collect()
    }

    /// Every comment across all posts, oldest first.
    pub async fn all_comments(&self) -> Vec<Comment> {
        let mut comments = self.comments.read().await.clone();
        comments.sort_by_key(|c| c.created_at);
        comments
    }

    pub async fn task_count(&self) -> usize {
        self.tasks.read().await.len()
    }
}

#[async_trait]
impl BaseContentStore for MemoryStore {
    async fn list_posts(&self) -> Result<Vec<Post>> {
        let mut posts: Vec<Post> = self.posts.read().await.values().cloned().collect();
        posts.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.slug.cmp(&b.slug)));
        Ok(posts)
    }

    async fn get_post(&self, id: PostId) -> Result<Option<Post>> {
        Ok(self.posts.read().await.get(&id).cloned())
    }

    async fn create_post(&self, post: &Post) -> Result<()> {
        let mut posts = self.posts.write().await;
        if posts
            .values()
            .any(|p| p.slug.eq_ignore_ascii_case(&post.slug))
        {
            bail!("a post with slug {:?} already exists", post.slug);
        }
        posts.insert(post.id, post.clone());
        Ok(())
    }

    async fn update_post(&self, post: &Post) -> Result<()> {
        let mut posts = self.posts.write().await;
        match posts.get_mut(&post.id) {
            Some(existing) => {
                *existing = post.clone();
                Ok(())
            }
            None => bail!("post {} not found", post.id),
        }
    }

    async fn delete_post(&self, id: PostId) -> Result<()> {
        self.posts.write().await.remove(&id);
        self.comments.write().await.retain(|c| c.post_id != id);
        Ok(())
    }

    async fn list_comments(&self, post_id: PostId) -> Result<Vec<Comment>> {
        let mut comments: Vec<Comment> = self
            .comments
            .read()
            .await
            .iter()
            .filter(|c| c.post_id == post_id)
            .cloned()
            .collect();
        comments.sort_by_key(|c| c.created_at);
        Ok(comments)
    }

    async fn create_comment(&self, comment: &Comment) -> Result<()> {
        if !self.posts.read().await.contains_key(&comment.post_id) {
            bail!("post {} not found", comment.post_id);
        }
        self.comments.write().await.push(comment.clone());
        Ok(())
    }

    async fn ensure_tags(&self, names: &[String]) -> Result<Vec<Tag>> {
        let mut tags = self.tags.write().await;
        Ok(names
            .iter()
            .map(|name| {
                tags.entry(name.clone())
                    .or_insert_with(|| Tag::new(name))
                    .clone()
            })
            .collect())
    }
}

#[async_trait]
impl BaseTaskRepository for MemoryStore {
    async fn create_task(&self, task: &Task) -> Result<()> {
        self.tasks.write().await.push(task.clone());
        Ok(())
    }

    async fn get_task(&self, id: TaskId) -> Result<Option<Task>> {
        Ok(self.tasks.read().await.iter().find(|t| t.id == id).cloned())
    }

    async fn list_tasks_by_status(&self, status: TaskStatus, limit: usize) -> Result<Vec<Task>> {
        Ok(self
            .tasks
            .read()
            .await
            .iter()
            .filter(|t| t.status == status)
            .take(limit)
            .cloned()
            .collect())
    }

    async fn list_recent_tasks(&self, limit: usize) -> Result<Vec<Task>> {
        Ok(self
            .tasks
            .read()
            .await
            .iter()
            .rev()
            .take(limit)
            .cloned()
            .collect())
    }

    async fn update_task(&self, task: &Task) -> Result<()> {
        let mut tasks = self.tasks.write().await;
        match tasks.iter_mut().find(|t| t.id == task.id) {
            Some(existing) => {
                *existing = task.clone();
                Ok(())
            }
            None => bail!("task {} not found", task.id),
        }
    }

    async fn reset_running_tasks(&self) -> Result<u64> {
        let mut tasks = self.tasks.write().await;
        let now = Utc::now();
        let mut reset = 0;
        for task in tasks.iter_mut().filter(|t| t.status == TaskStatus::Running) {
            task.status = TaskStatus::Pending;
            task.updated_at = now;
            reset += 1;
        }
        Ok(reset)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_duplicate_slug_rejected() {
        let store = MemoryStore::new();
        let post = Post::builder().slug("hello").title("Hello").build();
        store.create_post(&post).await.unwrap();

        let dup = Post::builder().slug("HELLO").title("Again").build();
        assert!(store.create_post(&dup).await.is_err());
    }

    #[tokio::test]
    async fn test_reset_running_tasks() {
        let store = MemoryStore::new();
        let mut running = Task::new("post_processing", serde_json::json!({}));
        running.mark_running();
        store.create_task(&running).await.unwrap();
        store
            .create_task(&Task::new("post_processing", serde_json::json!({})))
            .await
            .unwrap();

        assert_eq!(store.reset_running_tasks().await.unwrap(), 1);
        let pending = store
            .list_tasks_by_status(TaskStatus::Pending, 10)
            .await
            .unwrap();
        assert_eq!(pending.len(), 2);
        assert_eq!(pending[0].id, running.id);
    }

    #[tokio::test]
    async fn test_ensure_tags_is_idempotent() {
        let store = MemoryStore::new();
        let first = store.ensure_tags(&["rust".to_string()]).await.unwrap();
        let second = store
            .ensure_tags(&["rust".to_string(), "web".to_string()])
            .await
            .unwrap();
        assert_eq!(first[0].id, second[0].id);
        assert_eq!(store.list_tags().await.len(), 2);
    }
}

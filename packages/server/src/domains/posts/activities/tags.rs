//! Post tag activities - generated tag sets for a single post
//!
//! Entry point for the `generate_tags` task. A post deleted between enqueue and
//! execution is not an error: the task completes with `skipped = true`.

use anyhow::Result;
use tracing::info;

use super::ai::request_tags;
use crate::common::PostId;
use crate::domains::posts::models::Post;
use crate::domains::tag::normalize_tag_names;
use crate::kernel::jobs::{TagsResult, TaskError};
use crate::kernel::{BaseContentStore, ServerDeps};

/// Attach `tags` to the post and make sure matching site-wide tags exist.
///
/// The post keeps the names as given; tag records are created lower-cased.
pub async fn apply_post_tags(
    post: &mut Post,
    tags: Vec<String>,
    store: &dyn BaseContentStore,
) -> Result<()> {
    store.ensure_tags(&normalize_tag_names(&tags)).await?;
    post.tags = tags;
    Ok(())
}

/// Generate and store tags for one post, replacing any it already has.
pub async fn generate_tags(post_id: PostId, deps: &ServerDeps) -> Result<TagsResult, TaskError> {
    let Some(post) = deps.content.get_post(post_id).await? else {
        return Ok(skipped(post_id));
    };

    let tags = request_tags(&post, deps).await?;

    // Re-read so edits made during the provider call are kept.
    let Some(mut post) = deps.content.get_post(post_id).await? else {
        return Ok(skipped(post_id));
    };
    apply_post_tags(&mut post, tags.clone(), deps.content.as_ref()).await?;
    post.touch();
    deps.content.update_post(&post).await?;

    info!(post_id = %post_id, tag_count = tags.len(), "generated post tags");

    Ok(TagsResult {
        post_id,
        tags,
        skipped: false,
    })
}

fn skipped(post_id: PostId) -> TagsResult {
    info!(post_id = %post_id, "post no longer exists, skipping tag generation");
    TagsResult {
        post_id,
        tags: Vec::new(),
        skipped: true,
    }
}

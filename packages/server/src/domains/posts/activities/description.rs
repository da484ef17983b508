//! Post description activity - generated SEO summary for a single post

use tracing::info;

use super::ai::request_summary;
use crate::common::PostId;
use crate::kernel::jobs::{DescriptionResult, TaskError};
use crate::kernel::ServerDeps;

/// Generate and store an SEO summary for one post, replacing any existing one.
pub async fn generate_description(
    post_id: PostId,
    deps: &ServerDeps,
) -> Result<DescriptionResult, TaskError> {
    let Some(post) = deps.content.get_post(post_id).await? else {
        return Ok(skipped(post_id));
    };

    let summary = request_summary(&post, deps).await?;

    // Re-read so edits made during the provider call are kept.
    let Some(mut post) = deps.content.get_post(post_id).await? else {
        return Ok(skipped(post_id));
    };
    post.summary = summary.clone();
    post.touch();
    deps.content.update_post(&post).await?;

    info!(post_id = %post_id, "generated post description");

    Ok(DescriptionResult {
        post_id,
        summary: Some(summary),
        skipped: false,
    })
}

fn skipped(post_id: PostId) -> DescriptionResult {
    info!(post_id = %post_id, "post no longer exists, skipping description");
    DescriptionResult {
        post_id,
        summary: None,
        skipped: true,
    }
}

//! Backfill activity for posts - the `post_processing` sweep
//!
//! Walks every post and fills in what is missing: a blank summary gets a generated
//! description, an empty tag list gets a generated tag set. Populated fields are
//! never overwritten, so running the sweep again only costs provider calls for
//! posts that are still incomplete. Generated values are written into a fresh read
//! of the post, so edits made while the provider was working survive.

use tracing::{debug, info, warn};

use super::ai::{request_summary, request_tags};
use super::tags::apply_post_tags;
use crate::kernel::jobs::{BackfillResult, TaskError};
use crate::kernel::ServerDeps;

pub async fn backfill_posts(deps: &ServerDeps) -> Result<BackfillResult, TaskError> {
    let posts = deps.content.list_posts().await?;

    info!(count = posts.len(), "Backfilling post summaries and tags");

    let mut result = BackfillResult {
        posts_scanned: posts.len(),
        ..Default::default()
    };

    for post in posts {
        if !post.has_markdown() {
            continue;
        }

        // Summary and tags are independent: one failing never blocks the other.
        let summary = if post.has_summary() {
            None
        } else {
            match request_summary(&post, deps).await {
                Ok(summary) => Some(summary),
                Err(e) => {
                    warn!(post_id = %post.id, error = %e, "Failed to generate description");
                    result.errors.push(format!("{}: description: {}", post.slug, e));
                    None
                }
            }
        };

        let tags = if post.has_tags() {
            None
        } else {
            match request_tags(&post, deps).await {
                Ok(tags) => Some(tags),
                Err(e) => {
                    warn!(post_id = %post.id, error = %e, "Failed to generate tags");
                    result.errors.push(format!("{}: tags: {}", post.slug, e));
                    None
                }
            }
        };

        if summary.is_none() && tags.is_none() {
            continue;
        }

        // Provider calls are slow; write into the post as it is now, not the snapshot.
        let mut current = match deps.content.get_post(post.id).await {
            Ok(Some(current)) => current,
            Ok(None) => {
                debug!(post_id = %post.id, "post vanished during backfill");
                continue;
            }
            Err(e) => {
                warn!(post_id = %post.id, error = %e, "Failed to reload post");
                result.errors.push(format!("{}: save: {}", post.slug, e));
                continue;
            }
        };

        let mut changed = false;

        if let Some(summary) = summary {
            if !current.has_summary() {
                current.summary = summary;
                result.descriptions_generated += 1;
                changed = true;
            }
        }

        if let Some(tags) = tags {
            if !current.has_tags() {
                match apply_post_tags(&mut current, tags, deps.content.as_ref()).await {
                    Ok(()) => {
                        result.tags_generated += 1;
                        changed = true;
                    }
                    Err(e) => {
                        warn!(post_id = %post.id, error = %e, "Failed to store tags");
                        result.errors.push(format!("{}: tags: {}", post.slug, e));
                    }
                }
            }
        }

        if changed {
            current.touch();
            if let Err(e) = deps.content.update_post(&current).await {
                warn!(post_id = %post.id, error = %e, "Failed to save backfilled post");
                result.errors.push(format!("{}: save: {}", post.slug, e));
            }
        }
    }

    info!(
        scanned = result.posts_scanned,
        descriptions = result.descriptions_generated,
        tags = result.tags_generated,
        failed = result.errors.len(),
        "Backfill completed"
    );

    Ok(result)
}

//! Integration tests for WXR export.

mod common;

use crate::common::*;
use press_core::domains::posts::models::{Comment, CommentStatus, PostStatus};
use press_core::domains::wxr::{export_wxr, import_wxr, parse_wxr};
use press_core::kernel::BaseContentStore;
use test_context::test_context;

async fn seed_thread(ctx: &TestHarness) {
    let post_id = create_test_post(ctx.store.as_ref(), "hello", "Hello *there*", "Intro", &["Rust"])
        .await
        .unwrap();

    let mut post = get_post(ctx.store.as_ref(), post_id).await;
    post.status = PostStatus::Published;
    ctx.store.update_post(&post).await.unwrap();

    let parent = Comment::builder()
        .post_id(post_id)
        .author_name("Ann")
        .content("Great post")
        .status(CommentStatus::Approved)
        .build();
    let mut reply = Comment::builder()
        .post_id(post_id)
        .author_name("Bob")
        .content("Agreed")
        .build();
    reply.parent_id = Some(parent.id);
    reply.created_at = parent.created_at + chrono::Duration::seconds(5);

    ctx.store.create_comment(&parent).await.unwrap();
    ctx.store.create_comment(&reply).await.unwrap();
}

#[test_context(TestHarness)]
#[tokio::test]
async fn export_writes_posts_tags_and_threaded_comments(ctx: &TestHarness) {
    seed_thread(ctx).await;

    let bytes = export_wxr(&ctx.deps).await.unwrap();
    let document = parse_wxr(&bytes).unwrap();

    assert_eq!(document.channel.title, ctx.deps.config.site_title);
    assert_eq!(document.channel.wxr_version, "1.2");
    assert_eq!(document.items.len(), 1);

    let item = &document.items[0];
    assert_eq!(item.post_name, "hello");
    assert_eq!(item.status, "publish");
    assert_eq!(item.post_type, "post");
    assert_eq!(item.excerpt, "Intro");
    assert!(item.content.contains("<em>there</em>"));
    assert_eq!(item.categories.len(), 1);
    assert_eq!(item.categories[0].domain, "post_tag");
    assert_eq!(item.categories[0].nicename, "rust");

    assert_eq!(item.comments.len(), 2);
    let ann = &item.comments[0];
    let bob = &item.comments[1];
    assert_eq!(ann.id, "1");
    assert_eq!(ann.parent, "0");
    assert_eq!(ann.approved, "1");
    assert_eq!(bob.id, "2");
    assert_eq!(bob.parent, "1");
    assert_eq!(bob.approved, "0");
}

#[test_context(TestHarness)]
#[tokio::test]
async fn export_includes_drafts(ctx: &TestHarness) {
    create_test_post(ctx.store.as_ref(), "draft-post", "Not yet", "", &[])
        .await
        .unwrap();

    let document = parse_wxr(&export_wxr(&ctx.deps).await.unwrap()).unwrap();

    assert_eq!(document.items.len(), 1);
    assert_eq!(document.items[0].status, "draft");
}

#[test_context(TestHarness)]
#[tokio::test]
async fn exported_document_reimports_into_fresh_store(ctx: &TestHarness) {
    seed_thread(ctx).await;
    let bytes = export_wxr(&ctx.deps).await.unwrap();

    let fresh = TestHarness::new();
    let result = import_wxr(&bytes, &fresh.deps).await.unwrap();

    assert_eq!(result.posts_added, 1);
    assert_eq!(result.comments_added, 2);

    let posts = fresh.store.list_posts().await.unwrap();
    assert_eq!(posts[0].slug, "hello");
    assert_eq!(posts[0].status, PostStatus::Published);
    assert_eq!(posts[0].summary, "Intro");
    assert_eq!(posts[0].tags, vec!["Rust"]);

    let comments = fresh.store.list_comments(posts[0].id).await.unwrap();
    let ann = comments.iter().find(|c| c.author_name == "Ann").unwrap();
    let bob = comments.iter().find(|c| c.author_name == "Bob").unwrap();
    assert_eq!(ann.content, "Great post");
    assert_eq!(ann.status, CommentStatus::Approved);
    assert_eq!(bob.parent_id, Some(ann.id));
}

#[test_context(TestHarness)]
#[tokio::test]
async fn exported_document_reimports_into_same_store_as_noop(ctx: &TestHarness) {
    seed_thread(ctx).await;
    let bytes = export_wxr(&ctx.deps).await.unwrap();

    let result = import_wxr(&bytes, &ctx.deps).await.unwrap();

    assert_eq!(result.posts_added, 0);
    assert_eq!(result.posts_skipped, 1);
    assert_eq!(result.comments_added, 0);
    assert_eq!(ctx.store.all_comments().await.len(), 2);
}

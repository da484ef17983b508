//! Integration tests for WXR import.
//!
//! Covers slug-gated post creation, comment threading and dedup, and the
//! follow-up tasks an import queues.

mod common;

use crate::common::*;
use press_core::domains::posts::models::{CommentStatus, PostStatus};
use press_core::domains::wxr::import_wxr;
use press_core::kernel::jobs::{ImportImagesPayload, TaskKind};
use press_core::kernel::{BaseContentStore, TestDependencies};
use test_context::test_context;

fn blog_with_comments() -> String {
    let comments = [
        wxr_comment(1, 0, "Ann", "<p>First comment</p>", "1"),
        wxr_comment(2, 1, "Bob", "<p>Reply to Ann</p>", "approved"),
        wxr_comment(3, 0, "Spammer", "<p>Buy now</p>", "spam"),
        wxr_comment(4, 0, "Cat", "<p>Waiting</p>", "hold"),
    ]
    .join("\n");
    let extra = format!("{}\n{}", wxr_tag("Rust", "rust"), comments);

    wxr_document(&[
        wxr_post("hello", "Hello", "<p>Hello <strong>world</strong></p>", &extra),
        wxr_post("second", "Second", "<p>Another post</p>", ""),
    ])
}

#[test_context(TestHarness)]
#[tokio::test]
async fn import_creates_posts_comments_and_tags(ctx: &TestHarness) {
    let result = import_wxr(blog_with_comments().as_bytes(), &ctx.deps)
        .await
        .unwrap();

    assert_eq!(result.posts_added, 2);
    assert_eq!(result.posts_skipped, 0);
    assert_eq!(result.comments_added, 4);
    assert_eq!(result.comments_skipped, 0);

    let posts = ctx.store.list_posts().await.unwrap();
    let hello = posts.iter().find(|p| p.slug == "hello").unwrap();
    assert_eq!(hello.title, "Hello");
    assert_eq!(hello.status, PostStatus::Published);
    assert!(hello.published_at.is_some());
    assert_eq!(hello.content_html, "<p>Hello <strong>world</strong></p>");
    assert!(hello.content_markdown.contains("**world**"));
    assert!(!hello.content_markdown.contains("<p>"));
    assert_eq!(hello.tags, vec!["Rust"]);

    let tags = ctx.store.list_tags().await;
    assert_eq!(tags.len(), 1);
    assert_eq!(tags[0].name, "rust");

    let comments = ctx.store.list_comments(hello.id).await.unwrap();
    let by_author = |name: &str| comments.iter().find(|c| c.author_name == name).unwrap();
    assert_eq!(by_author("Ann").status, CommentStatus::Approved);
    assert_eq!(by_author("Ann").content, "First comment");
    assert_eq!(by_author("Bob").parent_id, Some(by_author("Ann").id));
    assert_eq!(by_author("Spammer").status, CommentStatus::Rejected);
    assert_eq!(by_author("Cat").status, CommentStatus::Pending);
}

#[test_context(TestHarness)]
#[tokio::test]
async fn reimport_adds_nothing(ctx: &TestHarness) {
    let document = blog_with_comments();

    import_wxr(document.as_bytes(), &ctx.deps).await.unwrap();
    let second = import_wxr(document.as_bytes(), &ctx.deps).await.unwrap();

    assert_eq!(second.posts_added, 0);
    assert_eq!(second.posts_skipped, 2);
    assert_eq!(second.comments_added, 0);
    assert_eq!(second.comments_skipped, 4);
    assert_eq!(ctx.store.list_posts().await.unwrap().len(), 2);
    assert_eq!(ctx.store.all_comments().await.len(), 4);
}

#[test_context(TestHarness)]
#[tokio::test]
async fn duplicate_slug_in_one_document_is_skipped(ctx: &TestHarness) {
    let document = wxr_document(&[
        wxr_post("hello", "Hello", "<p>one</p>", ""),
        wxr_post("hello", "Hello again", "<p>two</p>", ""),
    ]);

    let result = import_wxr(document.as_bytes(), &ctx.deps).await.unwrap();

    assert_eq!(result.posts_added, 1);
    assert_eq!(result.posts_skipped, 1);
    let posts = ctx.store.list_posts().await.unwrap();
    assert_eq!(posts.len(), 1);
    assert_eq!(posts[0].content_html, "<p>one</p>");
}

#[test_context(TestHarness)]
#[tokio::test]
async fn comments_on_existing_post_are_still_imported(ctx: &TestHarness) {
    import_wxr(
        wxr_document(&[wxr_post("hello", "Hello", "<p>hi</p>", "")]).as_bytes(),
        &ctx.deps,
    )
    .await
    .unwrap();

    let with_comment = wxr_document(&[wxr_post(
        "hello",
        "Hello",
        "<p>hi</p>",
        &wxr_comment(9, 0, "Dee", "<p>Late comment</p>", "1"),
    )]);
    let result = import_wxr(with_comment.as_bytes(), &ctx.deps).await.unwrap();

    assert_eq!(result.posts_skipped, 1);
    assert_eq!(result.comments_added, 1);
}

#[test_context(TestHarness)]
#[tokio::test]
async fn reply_to_unknown_parent_is_dropped(ctx: &TestHarness) {
    let comments = [
        wxr_comment(1, 0, "Ann", "<p>Top</p>", "1"),
        wxr_comment(2, 77, "Orphan", "<p>Reply to nothing</p>", "1"),
    ]
    .join("\n");
    let document = wxr_document(&[wxr_post("hello", "Hello", "<p>hi</p>", &comments)]);

    let result = import_wxr(document.as_bytes(), &ctx.deps).await.unwrap();

    assert_eq!(result.comments_added, 1);
    assert_eq!(result.comments_skipped, 1);
    let stored = ctx.store.all_comments().await;
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].author_name, "Ann");
    assert!(stored[0].parent_id.is_none());
}

#[test_context(TestHarness)]
#[tokio::test]
async fn attachments_and_drafts(ctx: &TestHarness) {
    let attachment = r#"    <item>
        <title>photo.jpg</title>
        <wp:post_name>photo</wp:post_name>
        <wp:post_type>attachment</wp:post_type>
    </item>"#
        .to_string();
    let draft = r#"    <item>
        <title>Work In Progress</title>
        <content:encoded><![CDATA[<p>todo</p>]]></content:encoded>
        <excerpt:encoded><![CDATA[A short excerpt]]></excerpt:encoded>
        <wp:status>private</wp:status>
        <wp:post_type>post</wp:post_type>
    </item>"#
        .to_string();

    let result = import_wxr(wxr_document(&[attachment, draft]).as_bytes(), &ctx.deps)
        .await
        .unwrap();

    assert_eq!(result.posts_added, 1);
    let posts = ctx.store.list_posts().await.unwrap();
    assert_eq!(posts[0].slug, "work-in-progress");
    assert_eq!(posts[0].status, PostStatus::Draft);
    assert!(posts[0].published_at.is_none());
    assert_eq!(posts[0].summary, "A short excerpt");
}

#[test_context(TestHarness)]
#[tokio::test]
async fn import_queues_backfill_and_image_import(ctx: &TestHarness) {
    let result = import_wxr(blog_with_comments().as_bytes(), &ctx.deps)
        .await
        .unwrap();

    let tasks = ctx.tasks().await;
    let kinds: Vec<&str> = tasks.iter().map(|t| t.task_type.as_str()).collect();
    assert_eq!(
        kinds,
        vec![
            TaskKind::PostProcessing.as_str(),
            TaskKind::ImportImages.as_str()
        ]
    );

    let payload: ImportImagesPayload = serde_json::from_value(tasks[1].payload.clone()).unwrap();
    assert_eq!(payload.origin_url, ORIGIN);
    assert_eq!(payload.post_ids, result.new_post_ids);

    // Neither post arrived with a summary; only "second" lacks tags.
    assert_eq!(result.needs_description.len(), 2);
    assert_eq!(result.needs_tags.len(), 1);
}

#[tokio::test]
async fn import_without_image_store_queues_only_backfill() {
    let ctx = TestHarness::with_dependencies(TestDependencies::new().without_image_store());

    import_wxr(blog_with_comments().as_bytes(), &ctx.deps)
        .await
        .unwrap();

    let tasks = ctx.tasks().await;
    assert_eq!(tasks.len(), 1);
    assert_eq!(tasks[0].task_type, TaskKind::PostProcessing.as_str());
}

#[test_context(TestHarness)]
#[tokio::test]
async fn reimport_queues_nothing(ctx: &TestHarness) {
    let document = blog_with_comments();
    import_wxr(document.as_bytes(), &ctx.deps).await.unwrap();
    let before = ctx.tasks().await.len();

    import_wxr(document.as_bytes(), &ctx.deps).await.unwrap();

    assert_eq!(ctx.tasks().await.len(), before);
}

#[test_context(TestHarness)]
#[tokio::test]
async fn malformed_document_is_rejected(ctx: &TestHarness) {
    let result = import_wxr(b"<rss><channel><item></rss>", &ctx.deps).await;

    assert!(result.is_err());
    assert!(ctx.store.list_posts().await.unwrap().is_empty());
}

#[test_context(TestHarness)]
#[tokio::test]
async fn undated_comments_are_not_duplicated_on_reimport(ctx: &TestHarness) {
    let item = r#"    <item>
        <title>No Dates</title>
        <content:encoded><![CDATA[<p>body</p>]]></content:encoded>
        <wp:post_name>no-dates</wp:post_name>
        <wp:status>publish</wp:status>
        <wp:post_type>post</wp:post_type>
        <wp:comment>
            <wp:comment_id>1</wp:comment_id>
            <wp:comment_author><![CDATA[Ann]]></wp:comment_author>
            <wp:comment_content><![CDATA[Timeless]]></wp:comment_content>
            <wp:comment_approved>1</wp:comment_approved>
            <wp:comment_parent>0</wp:comment_parent>
        </wp:comment>
        <wp:comment>
            <wp:comment_id>2</wp:comment_id>
            <wp:comment_author><![CDATA[Bob]]></wp:comment_author>
            <wp:comment_content><![CDATA[Also timeless]]></wp:comment_content>
            <wp:comment_approved>1</wp:comment_approved>
            <wp:comment_parent>1</wp:comment_parent>
        </wp:comment>
    </item>"#
        .to_string();
    let document = wxr_document(&[item]);

    let first = import_wxr(document.as_bytes(), &ctx.deps).await.unwrap();
    // Cross a second boundary so a wall-clock fallback would change the key.
    tokio::time::sleep(std::time::Duration::from_millis(1100)).await;
    let second = import_wxr(document.as_bytes(), &ctx.deps).await.unwrap();

    assert_eq!(first.comments_added, 2);
    assert_eq!(second.comments_added, 0);
    assert_eq!(second.comments_skipped, 2);
    assert_eq!(ctx.store.all_comments().await.len(), 2);

    let post = &ctx.store.list_posts().await.unwrap()[0];
    let comments = ctx.store.list_comments(post.id).await.unwrap();
    assert!(comments.iter().all(|c| c.created_at == post.created_at));
}

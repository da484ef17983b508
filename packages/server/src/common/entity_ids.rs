//! Typed ID definitions for content and task entities.

pub use super::id::Id;

/// Marker type for Post entities.
pub struct Post;

/// Marker type for Comment entities.
pub struct Comment;

/// Marker type for Tag entities.
pub struct Tag;

/// Marker type for background Task records.
pub struct Task;

pub type PostId = Id<Post>;

pub type CommentId = Id<Comment>;

pub type TagId = Id<Tag>;

pub type TaskId = Id<Task>;

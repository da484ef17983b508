pub mod activities;
pub mod models;

pub use models::{Comment, CommentKey, CommentStatus, Post, PostStatus};

pub mod models;

pub use models::tag::{normalize_tag_names, Tag};

pub mod ai;
pub mod backfill;
pub mod description;
pub mod tags;

pub use backfill::backfill_posts;
pub use description::generate_description;
pub use tags::{apply_post_tags, generate_tags};

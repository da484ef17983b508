// Business domains
pub mod media;
pub mod posts;
pub mod tag;
pub mod wxr;

//! Kernel module - server infrastructure and dependencies.

pub mod deps;
pub mod image_fetcher;
pub mod jobs;
pub mod memory_store;
pub mod test_dependencies;
pub mod traits;

pub use deps::{DisabledAI, ServerDeps};
pub use image_fetcher::HttpImageFetcher;
pub use memory_store::MemoryStore;
pub use test_dependencies::{MockAI, MockImageFetcher, MockImageStore, TestDependencies};
pub use traits::*;

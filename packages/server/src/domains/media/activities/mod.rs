pub mod extract;
pub mod rehost;

pub use extract::{find_raw_references, resolve_reference, ImageReferences, IMAGE_EXTENSIONS};
pub use rehost::{import_images, CheckpointSink};

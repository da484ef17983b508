//! Media domain - rehosting of images referenced by imported content.

pub mod activities;

pub use activities::{import_images, CheckpointSink, ImageReferences};

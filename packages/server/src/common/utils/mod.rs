pub mod content_hash;
pub mod markup;
pub mod slug;

pub use content_hash::*;
pub use markup::*;
pub use slug::*;

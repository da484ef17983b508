//! WXR (WordPress eXtended RSS) interchange: document model, reader, writer, and
//! the import/export entry points.

pub mod activities;
pub mod document;
pub mod parser;
pub mod writer;

pub use activities::{export_wxr, import_wxr, WxrImportResult};
pub use document::WxrDocument;
pub use parser::parse_wxr;
pub use writer::write_wxr;

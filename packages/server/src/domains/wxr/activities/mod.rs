pub mod export;
pub mod import;

pub use export::{build_export_document, export_wxr};
pub use import::{import_wxr, WxrImportResult};

//! Record files: writing them during a crawl and reading them back.

pub mod reader;
mod writer;

pub use reader::{parse_records, ParsedRecord};
pub use writer::{code_destination, format_record, RecordWriter};

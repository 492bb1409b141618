//! I/O layer: fetching encoded image bytes from where they live.

mod byte_source;
mod file_source;
mod http_source;

pub use byte_source::ByteSource;
pub use file_source::FileSource;
pub use http_source::{parse_http_url, HttpSource};
